//! HTTP request handlers

pub mod alert;
pub mod health;
pub mod inventory;
pub mod order;
pub mod product;
pub mod supplier;
pub mod warehouse;

pub use alert::*;
pub use health::*;
pub use inventory::*;
pub use order::*;
pub use product::*;
pub use supplier::*;
pub use warehouse::*;
