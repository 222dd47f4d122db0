//! Application layer: the document book, cross-document linking, wizards,
//! reports and configuration.

pub mod command_dispatcher;
pub mod config;
pub mod error;
pub mod linking;
pub mod navigation;
pub mod order_book;
pub mod read_model;
pub mod reports;
pub mod search;
pub mod wizards;

#[cfg(test)]
mod test_support;

pub use config::LinkConfig;
pub use error::ServiceError;
pub use navigation::{Action, Notification, NotificationKind, PurchaseDefaults};
pub use order_book::{LinkedDocuments, OrderBook, SaleOrderOverview};
pub use reports::{ExportAction, LiquidationReport, Renderer, ReportError};
pub use search::{HasVehicle, VehicleFilter, VehicleGroup};
pub use wizards::{CreatePurchaseWizard, LinkPurchaseWizard};
