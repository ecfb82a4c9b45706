pub mod appointment;
pub mod consultation;
pub mod dialysis;
pub mod enums;
pub mod patient;
pub mod protocol;
pub mod user;

pub use appointment::*;
pub use consultation::*;
pub use dialysis::*;
pub use patient::*;
pub use protocol::*;
pub use user::*;
