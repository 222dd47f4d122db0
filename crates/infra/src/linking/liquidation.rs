//! Profit liquidation of a sale order in the sale order's currency.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use orderlink_core::{CompanyId, DomainError};
use orderlink_currency::{CurrencyCode, ExchangeRates, convert};
use orderlink_invoicing::{Invoice, MoveType};
use orderlink_purchasing::PurchaseOrder;
use orderlink_sales::SalesOrder;

/// Liquidation figures, all in `currency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Liquidation {
    pub currency: CurrencyCode,
    /// Posted customer invoices.
    pub gross_invoiced: Decimal,
    /// Posted customer credit notes.
    pub credit_notes: Decimal,
    pub net_invoiced: Decimal,
    /// Confirmed or locked purchase orders.
    pub total_purchased: Decimal,
    pub profit_margin: Decimal,
    /// `profit_margin / net_invoiced`, or zero when nothing was invoiced.
    pub completion: Decimal,
}

impl Liquidation {
    pub fn zero(currency: CurrencyCode) -> Self {
        Self::from_totals(currency, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
    }

    pub fn from_totals(
        currency: CurrencyCode,
        gross_invoiced: Decimal,
        credit_notes: Decimal,
        total_purchased: Decimal,
    ) -> Self {
        let net_invoiced = gross_invoiced - credit_notes;
        let profit_margin = net_invoiced - total_purchased;
        let completion = if net_invoiced > Decimal::ZERO {
            profit_margin / net_invoiced
        } else {
            Decimal::ZERO
        };

        Self {
            currency,
            gross_invoiced,
            credit_notes,
            net_invoiced,
            total_purchased,
            profit_margin,
            completion,
        }
    }

    /// Completion as a percentage with two decimals, for display.
    pub fn completion_percent(&self) -> Decimal {
        (self.completion * Decimal::ONE_HUNDRED).round_dp(2)
    }
}

/// Convert `amount`, falling back to the unconverted amount when no rate is
/// available. The failure is logged, never returned.
pub fn convert_or_original(
    rates: &dyn ExchangeRates,
    company_id: CompanyId,
    amount: Decimal,
    from: &CurrencyCode,
    to: &CurrencyCode,
    date: NaiveDate,
) -> Decimal {
    match convert(rates, company_id, amount, from, to, date) {
        Ok(converted) => converted,
        Err(err) => {
            warn!(
                company_id = %company_id,
                %amount,
                from = %from,
                to = %to,
                %date,
                error = %err,
                "currency conversion failed, using original amount"
            );
            amount
        }
    }
}

/// Amount of a document in `to`. A document without a currency counts
/// unconverted, like a failed conversion.
pub fn amount_in_currency(
    rates: &dyn ExchangeRates,
    company_id: CompanyId,
    amount: Decimal,
    from: Option<&CurrencyCode>,
    to: &CurrencyCode,
    date: NaiveDate,
) -> Decimal {
    match from {
        Some(from) => convert_or_original(rates, company_id, amount, from, to, date),
        None => amount,
    }
}

/// Liquidation of `order` from its linked documents.
///
/// Only posted customer invoices and credit notes count, each converted at its
/// invoice date (accounting date when unset). Only confirmed or locked purchase
/// orders count, converted at their order date. `today` is the date used for a
/// document that has none.
pub fn compute_liquidation(
    order: &SalesOrder,
    invoices: &[Invoice],
    purchases: &[PurchaseOrder],
    rates: &dyn ExchangeRates,
    today: NaiveDate,
) -> Result<Liquidation, DomainError> {
    let (Some(company_id), Some(target)) = (order.company_id(), order.currency()) else {
        return Err(DomainError::not_found());
    };

    let mut gross = Decimal::ZERO;
    let mut credit_notes = Decimal::ZERO;
    for invoice in invoices.iter().filter(|i| i.is_posted()) {
        let date = invoice.conversion_date().unwrap_or(today);
        let amount = amount_in_currency(
            rates,
            company_id,
            invoice.amount_total(),
            invoice.currency(),
            target,
            date,
        );
        match invoice.move_type() {
            MoveType::OutInvoice => gross += amount,
            MoveType::OutRefund => credit_notes += amount,
            MoveType::InInvoice | MoveType::InRefund => {}
        }
    }

    let mut purchased = Decimal::ZERO;
    for po in purchases.iter().filter(|p| p.is_confirmed()) {
        let date = po.date_order().map(|d| d.date_naive()).unwrap_or(today);
        purchased += amount_in_currency(rates, company_id, po.amount_total(), po.currency(), target, date);
    }

    Ok(Liquidation::from_totals(target.clone(), gross, credit_notes, purchased))
}
