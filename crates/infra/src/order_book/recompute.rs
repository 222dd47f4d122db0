use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use orderlink_core::{CompanyId, VehicleInfo};
use orderlink_currency::CurrencyCode;
use orderlink_sales::SalesOrderId;

use super::OrderBook;
use crate::error::ServiceError;
use crate::linking::{Liquidation, PurchaseStatistics, SaleLineStatus, compute_liquidation, line_statuses, statistics};
use crate::read_model::TenantStore;

/// Derived figures of one sale order, refreshed after every write that can
/// change them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleOrderOverview {
    pub sale_order_id: SalesOrderId,
    pub name: String,
    pub currency: CurrencyCode,
    pub vehicle: VehicleInfo,
    pub lines: Vec<SaleLineStatus>,
    pub statistics: PurchaseStatistics,
    pub liquidation: Liquidation,
    pub invoice_count: usize,
}

impl SaleOrderOverview {
    pub fn line(&self, line_no: u32) -> Option<&SaleLineStatus> {
        self.lines.iter().find(|l| l.line_no == line_no)
    }
}

impl OrderBook {
    /// Recompute and store the overview of a sale order.
    pub fn recompute_sale_order(
        &self,
        company_id: CompanyId,
        sale_order_id: SalesOrderId,
    ) -> Result<SaleOrderOverview, ServiceError> {
        let order = self
            .sale_order(company_id, sale_order_id)
            .ok_or_else(|| ServiceError::not_found("sale order"))?;
        let currency = order
            .currency()
            .cloned()
            .ok_or_else(|| ServiceError::not_found("sale order currency"))?;

        let linked = self.linked_purchase_orders(company_id, sale_order_id);
        let covering = self.covering_purchase_orders(company_id, sale_order_id);
        let invoices = self.linked_invoices(company_id, sale_order_id);

        let lines = line_statuses(&order, &covering);
        let statistics = statistics(&lines, &linked);
        let liquidation = compute_liquidation(
            &order,
            &invoices,
            &linked,
            self.rates.as_ref(),
            Utc::now().date_naive(),
        )?;

        let overview = SaleOrderOverview {
            sale_order_id,
            name: order.name().to_string(),
            currency,
            vehicle: order.vehicle().clone(),
            lines,
            statistics,
            liquidation,
            invoice_count: invoices.len(),
        };

        debug!(
            company_id = %company_id,
            sale_order = overview.name.as_str(),
            purchase_orders = overview.statistics.purchase_order_count,
            invoices = overview.invoice_count,
            margin = %overview.liquidation.profit_margin,
            "sale order recomputed"
        );

        self.overviews.upsert(company_id, sale_order_id, overview.clone());
        Ok(overview)
    }

    /// Last computed overview of a sale order.
    pub fn overview(&self, company_id: CompanyId, sale_order_id: SalesOrderId) -> Option<SaleOrderOverview> {
        self.overviews.get(company_id, &sale_order_id)
    }

    /// Recompute every listed sale order that exists.
    pub(crate) fn refresh(
        &self,
        company_id: CompanyId,
        sale_order_ids: impl IntoIterator<Item = SalesOrderId>,
    ) -> Result<(), ServiceError> {
        for sale_order_id in sale_order_ids {
            if self.sale_order(company_id, sale_order_id).is_some() {
                self.recompute_sale_order(company_id, sale_order_id)?;
            }
        }
        Ok(())
    }
}
