//! Cross-document derivations: invoice sources, purchase coverage of sale lines
//! and the multi-currency liquidation of a sale order.
//!
//! Everything here is a pure function of the documents passed in. The order book
//! gathers those documents and decides when to rerun them.

pub mod invoice_sources;
pub mod liquidation;
pub mod purchase_status;

pub use invoice_sources::{ResolvedSources, SourceLookup, resolve_sources};
pub use liquidation::{Liquidation, amount_in_currency, compute_liquidation, convert_or_original};
pub use purchase_status::{PurchaseStatistics, SaleLineStatus, line_statuses, purchased_quantity, statistics};
