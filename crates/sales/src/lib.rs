//! Sale orders (event-sourced).
//!
//! Business rules for sale orders and their lines, implemented purely as
//! deterministic domain logic (no IO, no storage). Links to purchases and invoices
//! are held by those documents; this crate only defines how they address a sale
//! line ([`SaleLineRef`]) and how a line's purchase coverage is classified.

pub mod line;
pub mod order;

pub use line::{PurchaseStatus, SaleLine, SaleLineRef};
pub use order::{
    AddLine, CancelOrder, ConfirmOrder, CreateSalesOrder, LineAdded, LineQuantityUpdated,
    LineRemoved, MarkSent, OrderCancelled, OrderConfirmed, OrderSent, RemoveLine, SaleState,
    SalesOrder, SalesOrderCommand, SalesOrderCreated, SalesOrderEvent, SalesOrderId,
    UpdateLineQuantity, UpdateVehicle, VehicleUpdated,
};
