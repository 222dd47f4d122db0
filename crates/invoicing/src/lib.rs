//! Invoices: customer invoices, vendor bills and their credit notes (event-sourced).
//!
//! Pure domain logic. Which sale/purchase order an invoice came from is decided
//! outside the aggregate (it needs other documents) and handed in through
//! [`ResolveSources`].

pub mod invoice;
pub mod prepare;

pub use invoice::{
    AddLine, CancelInvoice, CreateInvoice, Invoice, InvoiceCancelled, InvoiceCommand,
    InvoiceCreated, InvoiceEvent, InvoiceId, InvoiceLine, InvoiceLineInput, InvoicePosted,
    InvoiceState, LineAdded, MoveType, OriginChanged, PostInvoice, ResolveSources, SetOrigin,
    SourcesResolved, UpdateVehicle, VehicleUpdated,
};
pub use prepare::{bill_from_purchase_order, invoice_from_sale_order};
