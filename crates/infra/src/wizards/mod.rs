//! Multi-step user actions on a sale order.
//!
//! A wizard holds its form state; `confirm` validates everything before the
//! first write, so a rejected wizard leaves the book untouched.

mod create_purchase;
mod link_purchase;

pub use create_purchase::{CreatePurchasePreview, CreatePurchaseWizard, PlannedLine};
pub use link_purchase::{LinkPurchaseWizard, PurchaseCandidate};
