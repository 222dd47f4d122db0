//! Purchase orders (event-sourced).
//!
//! Business rules for purchase orders, implemented purely as deterministic domain
//! logic (no IO, no storage). A purchase order may point at the sale order it was
//! bought for, and each of its lines may point at the sale line it covers.

pub mod deadline;
pub mod line;
pub mod order;

pub use deadline::add_business_days;
pub use line::{PurchaseLine, PurchaseLineRef};
pub use order::{
    AddLine, CancelOrder, ClearSaleLineReference, ConfirmOrder, CreatePurchaseOrder, LineAdded,
    LineQuantityUpdated, LockOrder, MarkSent, OrderCancelled, OrderConfirmed, OrderLocked,
    OrderSent, PurchaseOrder, PurchaseOrderCommand, PurchaseOrderCreated, PurchaseOrderEvent,
    PurchaseOrderId, PurchaseState, RequestApproval, ApprovalRequested, SaleLineReferenceCleared,
    SaleOrderLinkChanged, SetSaleOrder, UpdateLineQuantity, UpdateVehicle, VehicleUpdated,
};
