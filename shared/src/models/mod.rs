//! Domain models for the Stockroom inventory platform

mod alert;
mod catalog;
mod ledger;
mod order;
mod user;

pub use alert::*;
pub use catalog::*;
pub use ledger::*;
pub use order::*;
pub use user::*;
