//! Which sale order and purchase order an invoice came from.

use serde::{Deserialize, Serialize};

use orderlink_core::CompanyId;
use orderlink_invoicing::Invoice;
use orderlink_purchasing::PurchaseOrderId;
use orderlink_sales::SalesOrderId;

/// Name lookups used when line links are missing.
pub trait SourceLookup {
    fn sale_order_by_name(&self, company_id: CompanyId, name: &str) -> Option<SalesOrderId>;
    fn purchase_order_by_name(&self, company_id: CompanyId, name: &str) -> Option<PurchaseOrderId>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSources {
    pub sale_order_id: Option<SalesOrderId>,
    pub purchase_order_id: Option<PurchaseOrderId>,
}

impl ResolvedSources {
    pub fn is_complete(&self) -> bool {
        self.sale_order_id.is_some() && self.purchase_order_id.is_some()
    }
}

/// Resolve the invoice's source orders.
///
/// Line links win: the first line with a sale-line link decides the sale order,
/// the first line with a purchase-line link decides the purchase order. A side
/// still unresolved afterwards falls back to an exact name match of the recorded
/// origin within the invoice's company. No match leaves that side empty.
pub fn resolve_sources(invoice: &Invoice, lookup: &dyn SourceLookup) -> ResolvedSources {
    let mut resolved = ResolvedSources::default();

    for line in invoice.lines() {
        if resolved.sale_order_id.is_none() {
            resolved.sale_order_id = line.sale_lines.first().map(|r| r.order_id);
        }
        if resolved.purchase_order_id.is_none() {
            resolved.purchase_order_id = line.purchase_line.map(|r| r.order_id);
        }
        if resolved.is_complete() {
            break;
        }
    }

    let (Some(company_id), Some(origin)) = (invoice.company_id(), invoice.invoice_origin()) else {
        return resolved;
    };

    if resolved.sale_order_id.is_none() {
        resolved.sale_order_id = lookup.sale_order_by_name(company_id, origin);
    }
    if resolved.purchase_order_id.is_none() {
        resolved.purchase_order_id = lookup.purchase_order_by_name(company_id, origin);
    }

    resolved
}
