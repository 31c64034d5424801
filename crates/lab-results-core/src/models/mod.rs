//! Domain models for the lab results system.

mod catalog;
mod patient;
mod result;
mod user;

pub use catalog::*;
pub use patient::*;
pub use result::*;
pub use user::*;
