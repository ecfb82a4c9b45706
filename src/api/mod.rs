//! REST API for the dashboard.
//!
//! Every route sits at the root. Public routes cover health, login and
//! password reset; everything else needs a bearer access token, and the
//! admin table additionally needs the admin role.
//! Middleware stack: CORS → Auth → Role gate → Audit → Handler.

pub mod endpoints;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{serve, start_server, ApiServer, ServerError};
pub use types::ApiContext;
