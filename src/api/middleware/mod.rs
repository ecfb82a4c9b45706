//! Middleware stack for authenticated routes.
//!
//! Execution order (outermost → innermost):
//! 1. Auth validator — bearer token lookup, injects `AuthUser`
//! 2. Role gate — admin route table only
//! 3. Audit logger — logs after auth, has the user id

pub mod audit;
pub mod auth;
