//! Liquidation export payloads.
//!
//! The spreadsheet and PDF pipelines live outside this crate; they receive
//! either a download URL or the full [`LiquidationReport`].

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use orderlink_core::{CompanyId, VehicleInfo};
use orderlink_currency::CurrencyCode;
use orderlink_invoicing::{InvoiceId, MoveType};
use orderlink_purchasing::PurchaseState;
use orderlink_sales::SalesOrderId;

use crate::error::ServiceError;
use crate::linking::{Liquidation, PurchaseStatistics, SaleLineStatus, compute_liquidation, convert_or_original, line_statuses, statistics};
use crate::order_book::OrderBook;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPurchase {
    pub name: String,
    pub vendor: String,
    pub state: PurchaseState,
    pub date_order: Option<NaiveDate>,
    pub currency: CurrencyCode,
    pub amount_total: Decimal,
    /// In the sale currency.
    pub converted: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportInvoice {
    pub invoice_id: InvoiceId,
    pub move_type: MoveType,
    pub posted: bool,
    pub date: Option<NaiveDate>,
    pub currency: CurrencyCode,
    pub amount_total: Decimal,
    pub converted: Decimal,
}

/// Everything the liquidation exports print for one sale order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationReport {
    pub sale_order_id: SalesOrderId,
    pub sale_order: String,
    pub customer: String,
    pub currency: CurrencyCode,
    pub vehicle: VehicleInfo,
    pub lines: Vec<SaleLineStatus>,
    pub statistics: PurchaseStatistics,
    pub purchases: Vec<ReportPurchase>,
    pub invoices: Vec<ReportInvoice>,
    pub liquidation: Liquidation,
    pub generated_on: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExportAction {
    /// Download the spreadsheet from `url`.
    Excel { url: String },
    /// Print the report.
    Pdf { report: Box<LiquidationReport> },
}

impl OrderBook {
    pub fn liquidation_report(
        &self,
        company_id: CompanyId,
        sale_order_id: SalesOrderId,
    ) -> Result<LiquidationReport, ServiceError> {
        let order = self
            .sale_order(company_id, sale_order_id)
            .ok_or_else(|| ServiceError::not_found("sale order"))?;
        let currency = order
            .currency()
            .cloned()
            .ok_or_else(|| ServiceError::not_found("sale order currency"))?;
        let today = Utc::now().date_naive();

        let linked = self.linked_purchase_orders(company_id, sale_order_id);
        let covering = self.covering_purchase_orders(company_id, sale_order_id);
        let invoices = self.linked_invoices(company_id, sale_order_id);

        let lines = line_statuses(&order, &covering);
        let statistics = statistics(&lines, &linked);
        let liquidation = compute_liquidation(&order, &invoices, &linked, self.rates(), today)?;

        let purchases = linked
            .iter()
            .filter_map(|po| {
                let po_currency = po.currency()?.clone();
                let date_order = po.date_order().map(|d| d.date_naive());
                let converted = convert_or_original(
                    self.rates(),
                    company_id,
                    po.amount_total(),
                    &po_currency,
                    &currency,
                    date_order.unwrap_or(today),
                );
                Some(ReportPurchase {
                    name: po.name().to_string(),
                    vendor: po
                        .vendor()
                        .map(|v| self.party_name(company_id, v))
                        .unwrap_or_else(|| "-".to_string()),
                    state: po.state(),
                    date_order,
                    currency: po_currency,
                    amount_total: po.amount_total(),
                    converted,
                })
            })
            .collect();

        let invoices = invoices
            .iter()
            .filter_map(|invoice| {
                let invoice_currency = invoice.currency()?.clone();
                let date = invoice.conversion_date();
                let converted = convert_or_original(
                    self.rates(),
                    company_id,
                    invoice.amount_total(),
                    &invoice_currency,
                    &currency,
                    date.unwrap_or(today),
                );
                Some(ReportInvoice {
                    invoice_id: invoice.id_typed(),
                    move_type: invoice.move_type(),
                    posted: invoice.is_posted(),
                    date,
                    currency: invoice_currency,
                    amount_total: invoice.amount_total(),
                    converted,
                })
            })
            .collect();

        Ok(LiquidationReport {
            sale_order_id,
            sale_order: order.name().to_string(),
            customer: order
                .customer()
                .map(|c| self.party_name(company_id, c))
                .unwrap_or_else(|| "-".to_string()),
            currency,
            vehicle: order.vehicle().clone(),
            lines,
            statistics,
            purchases,
            invoices,
            liquidation,
            generated_on: today,
        })
    }

    /// Spreadsheet export of a sale order's liquidation.
    pub fn export_excel(&self, company_id: CompanyId, sale_order_id: SalesOrderId) -> Result<ExportAction, ServiceError> {
        let order = self
            .sale_order(company_id, sale_order_id)
            .ok_or_else(|| ServiceError::not_found("sale order"))?;
        let url = format!("{}/{}/excel", self.config().export_url_base, sale_order_id);
        info!(company_id = %company_id, sale_order = order.name(), %url, "liquidation excel export requested");
        Ok(ExportAction::Excel { url })
    }

    /// Printable export of a sale order's liquidation.
    pub fn export_pdf(&self, company_id: CompanyId, sale_order_id: SalesOrderId) -> Result<ExportAction, ServiceError> {
        let report = self.liquidation_report(company_id, sale_order_id)?;
        info!(company_id = %company_id, sale_order = report.sale_order.as_str(), "liquidation pdf export requested");
        Ok(ExportAction::Pdf { report: Box::new(report) })
    }
}
