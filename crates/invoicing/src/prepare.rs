//! Draft invoices prepared from orders.
//!
//! Both helpers copy the order's vehicle fields onto the invoice and link every
//! invoice line back to the order line it bills.

use chrono::{DateTime, NaiveDate, Utc};

use orderlink_core::DomainError;
use orderlink_purchasing::PurchaseOrder;
use orderlink_sales::SalesOrder;

use crate::invoice::{CreateInvoice, InvoiceId, InvoiceLineInput, MoveType};

/// Customer invoice for every line of a sale order.
pub fn invoice_from_sale_order(
    order: &SalesOrder,
    invoice_id: InvoiceId,
    date: NaiveDate,
    occurred_at: DateTime<Utc>,
) -> Result<CreateInvoice, DomainError> {
    let (Some(company_id), Some(customer), Some(currency)) =
        (order.company_id(), order.customer(), order.currency())
    else {
        return Err(DomainError::not_found());
    };

    if order.lines().is_empty() {
        return Err(DomainError::validation("sale order has no lines to invoice"));
    }

    let lines = order
        .lines()
        .iter()
        .map(|l| InvoiceLineInput {
            product_id: Some(l.product_id),
            description: l.description.clone(),
            quantity: l.quantity,
            unit_price: l.unit_price,
            sale_lines: vec![order.line_ref(l.line_no)],
            purchase_line: None,
        })
        .collect();

    Ok(CreateInvoice {
        company_id,
        invoice_id,
        move_type: MoveType::OutInvoice,
        partner: customer,
        currency: currency.clone(),
        invoice_date: Some(date),
        date,
        invoice_origin: Some(order.name().to_string()),
        lines,
        vehicle: order.vehicle().clone(),
        occurred_at,
    })
}

/// Vendor bill for every line of a purchase order.
pub fn bill_from_purchase_order(
    order: &PurchaseOrder,
    invoice_id: InvoiceId,
    date: NaiveDate,
    occurred_at: DateTime<Utc>,
) -> Result<CreateInvoice, DomainError> {
    let (Some(company_id), Some(vendor), Some(currency)) =
        (order.company_id(), order.vendor(), order.currency())
    else {
        return Err(DomainError::not_found());
    };

    if order.lines().is_empty() {
        return Err(DomainError::validation("purchase order has no lines to bill"));
    }

    let lines = order
        .lines()
        .iter()
        .map(|l| InvoiceLineInput {
            product_id: Some(l.product_id),
            description: l.description.clone(),
            quantity: l.quantity,
            unit_price: l.unit_price,
            sale_lines: vec![],
            purchase_line: Some(order.line_ref(l.line_no)),
        })
        .collect();

    Ok(CreateInvoice {
        company_id,
        invoice_id,
        move_type: MoveType::InInvoice,
        partner: vendor,
        currency: currency.clone(),
        invoice_date: Some(date),
        date,
        invoice_origin: Some(order.name().to_string()),
        lines,
        vehicle: order.vehicle().clone(),
        occurred_at,
    })
}
