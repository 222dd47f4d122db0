use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use orderlink_core::CompanyId;
use orderlink_currency::{CurrencyCode, ExchangeRates, Money};
use orderlink_purchasing::{PurchaseOrder, PurchaseState};
use orderlink_sales::{SalesOrder, SalesOrderId};

use crate::error::ServiceError;
use crate::linking::convert_or_original;
use crate::order_book::OrderBook;

/// Bootstrap badge colour of a purchase state.
pub fn badge_class(state: PurchaseState) -> &'static str {
    match state {
        PurchaseState::Draft => "secondary",
        PurchaseState::Sent => "info",
        PurchaseState::ToApprove => "warning",
        PurchaseState::Purchase => "success",
        PurchaseState::Done => "primary",
        PurchaseState::Cancel => "danger",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseSummaryRow {
    pub name: String,
    pub vendor: String,
    pub state: PurchaseState,
    pub state_label: String,
    pub badge: String,
    /// `dd/mm/YYYY`, or `-` without an order date.
    pub date: String,
    pub original: String,
    /// Amount in the sale currency; empty when conversion is not shown.
    pub converted: String,
    /// The order is in another currency than the sale.
    pub highlight: bool,
}

/// Purchase orders linked to a sale order, as shown on the sale order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseSummary {
    pub sale_currency: String,
    pub rows: Vec<PurchaseSummaryRow>,
    /// Set when the linked orders use several currencies or none of them is the
    /// sale currency.
    pub show_conversion: bool,
    /// Confirmed totals per original currency, by currency code.
    pub totals_by_currency: Vec<String>,
    /// Confirmed total in the sale currency.
    pub total_converted: String,
    pub total_converted_amount: Decimal,
}

impl PurchaseSummary {
    /// Build the summary of `order` from its linked purchase orders.
    ///
    /// Every row is listed; only confirmed or locked orders count towards the
    /// totals.
    pub fn build(
        order: &SalesOrder,
        purchases: &[PurchaseOrder],
        vendor_name: impl Fn(&PurchaseOrder) -> String,
        rates: &dyn ExchangeRates,
        today: NaiveDate,
    ) -> Result<Self, ServiceError> {
        let (Some(company_id), Some(sale_currency)) = (order.company_id(), order.currency()) else {
            return Err(ServiceError::not_found("sale order"));
        };

        let mut used: Vec<&CurrencyCode> = purchases.iter().filter_map(|p| p.currency()).collect();
        used.sort();
        used.dedup();
        let show_conversion = used.len() > 1 || !used.contains(&sale_currency);

        let mut rows = Vec::with_capacity(purchases.len());
        let mut totals: BTreeMap<CurrencyCode, Decimal> = BTreeMap::new();
        let mut total_converted = Decimal::ZERO;

        for po in purchases {
            let Some(currency) = po.currency() else {
                continue;
            };
            let amount = po.amount_total();
            let converted = converted_amount(company_id, po, currency, sale_currency, rates, today);

            if po.state().is_confirmed() {
                *totals.entry(currency.clone()).or_default() += amount;
                total_converted += if show_conversion { converted } else { amount };
            }

            rows.push(PurchaseSummaryRow {
                name: po.name().to_string(),
                vendor: vendor_name(po),
                state: po.state(),
                state_label: po.state().label().to_string(),
                badge: badge_class(po.state()).to_string(),
                date: po
                    .date_order()
                    .map(|d| d.format("%d/%m/%Y").to_string())
                    .unwrap_or_else(|| "-".to_string()),
                original: Money::new(amount, currency.clone()).display(),
                converted: if show_conversion {
                    Money::new(converted, sale_currency.clone()).display()
                } else {
                    String::new()
                },
                highlight: currency != sale_currency,
            });
        }

        Ok(Self {
            sale_currency: sale_currency.as_str().to_string(),
            rows,
            show_conversion,
            totals_by_currency: totals
                .into_iter()
                .map(|(currency, amount)| Money::new(amount, currency).display())
                .collect(),
            total_converted: Money::new(total_converted, sale_currency.clone()).display(),
            total_converted_amount: total_converted,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn converted_amount(
    company_id: CompanyId,
    po: &PurchaseOrder,
    from: &CurrencyCode,
    to: &CurrencyCode,
    rates: &dyn ExchangeRates,
    today: NaiveDate,
) -> Decimal {
    let date = po.date_order().map(|d| d.date_naive()).unwrap_or(today);
    convert_or_original(rates, company_id, po.amount_total(), from, to, date)
}

impl OrderBook {
    /// Purchase-order summary of a sale order, computed from the current documents.
    pub fn purchase_summary(
        &self,
        company_id: CompanyId,
        sale_order_id: SalesOrderId,
    ) -> Result<PurchaseSummary, ServiceError> {
        let order = self
            .sale_order(company_id, sale_order_id)
            .ok_or_else(|| ServiceError::not_found("sale order"))?;
        let purchases = self.linked_purchase_orders(company_id, sale_order_id);
        PurchaseSummary::build(
            &order,
            &purchases,
            |po| {
                po.vendor()
                    .map(|v| self.party_name(company_id, v))
                    .unwrap_or_else(|| "-".to_string())
            },
            self.rates(),
            Utc::now().date_naive(),
        )
    }
}
