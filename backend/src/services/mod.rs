//! Business logic services for the Stockroom inventory backend

pub mod alert;
pub mod inventory;
pub mod notification;
pub mod order;
pub mod product;
pub mod supplier;
pub mod warehouse;

pub use alert::{AlertReconciler, AlertService};
pub use inventory::InventoryService;
pub use notification::NotificationService;
pub use order::OrderService;
pub use product::ProductService;
pub use supplier::SupplierService;
pub use warehouse::WarehouseService;
