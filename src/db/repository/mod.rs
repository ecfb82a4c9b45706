//! Repository layer: entity-scoped database operations.
//!
//! Every function takes a borrowed `Connection` so callers decide whether
//! it runs standalone or inside a transaction.

mod appointment;
mod consultation;
mod dialysis;
mod patient;
mod protocol;
mod stats;
mod task;
mod token;
mod user;

pub use appointment::*;
pub use consultation::*;
pub use dialysis::*;
pub use patient::*;
pub use protocol::*;
pub use stats::*;
pub use task::*;
pub use token::*;
pub use user::*;
