use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::info;

use orderlink_core::{CompanyId, ExpectedVersion};
use orderlink_purchasing::{ConfirmOrder, PurchaseOrder, PurchaseOrderCommand, PurchaseOrderId, SetSaleOrder};
use orderlink_sales::SalesOrderId;

use super::OrderBook;
use crate::error::ServiceError;

impl OrderBook {
    /// Apply a purchase order command.
    ///
    /// Sale order and sale line references must exist in the company. Every sale
    /// order the purchase relates to, before or after the command, is refreshed.
    pub fn execute_purchase(&self, command: PurchaseOrderCommand) -> Result<PurchaseOrder, ServiceError> {
        let company_id = command.company_id();
        let order_id = command.order_id();
        self.check_sale_references(company_id, &command)?;

        let before = self.purchases.load(company_id, &order_id);
        let out = self.purchases.dispatch(
            company_id,
            order_id,
            ExpectedVersion::Any,
            command,
            PurchaseOrder::empty,
        )?;

        if out.changed() {
            self.reindex_purchase(company_id, before.as_ref(), &out.aggregate);
        }

        let mut affected = before.as_ref().map(related_sales).unwrap_or_default();
        affected.extend(related_sales(&out.aggregate));
        self.refresh(company_id, affected)?;

        Ok(out.aggregate)
    }

    /// Confirm a purchase order with the configured deadline.
    pub fn confirm_purchase(
        &self,
        company_id: CompanyId,
        order_id: PurchaseOrderId,
        occurred_at: DateTime<Utc>,
    ) -> Result<PurchaseOrder, ServiceError> {
        self.execute_purchase(PurchaseOrderCommand::ConfirmOrder(ConfirmOrder {
            company_id,
            order_id,
            deadline_business_days: self.config.deadline_business_days,
            occurred_at,
        }))
    }

    /// Set or clear the sale order a purchase order belongs to.
    ///
    /// A real change posts a note on the sale order that lost the purchase and
    /// on the one that gained it.
    pub fn set_purchase_sale_link(
        &self,
        company_id: CompanyId,
        order_id: PurchaseOrderId,
        sale_order_id: Option<SalesOrderId>,
        occurred_at: DateTime<Utc>,
    ) -> Result<PurchaseOrder, ServiceError> {
        let previous = self
            .purchase_order(company_id, order_id)
            .ok_or_else(|| ServiceError::not_found("purchase order"))?
            .sale_order_id();

        let po = self.link_purchase(company_id, order_id, sale_order_id, occurred_at)?;
        if previous == sale_order_id {
            return Ok(po);
        }

        let entry = self.purchase_entry(company_id, &po);
        if let Some(previous) = previous {
            self.post_note(company_id, previous, "Purchase order unlinked", vec![entry.clone()], occurred_at);
        }
        if let Some(current) = sale_order_id {
            self.post_note(company_id, current, "Purchase order linked", vec![entry], occurred_at);
        }

        info!(
            company_id = %company_id,
            purchase_order = po.name(),
            previous = ?previous,
            current = ?sale_order_id,
            "purchase sale link changed"
        );
        Ok(po)
    }

    /// Link without posting notes; callers that batch links post their own.
    pub(crate) fn link_purchase(
        &self,
        company_id: CompanyId,
        order_id: PurchaseOrderId,
        sale_order_id: Option<SalesOrderId>,
        occurred_at: DateTime<Utc>,
    ) -> Result<PurchaseOrder, ServiceError> {
        self.execute_purchase(PurchaseOrderCommand::SetSaleOrder(SetSaleOrder {
            company_id,
            order_id,
            sale_order_id,
            occurred_at,
        }))
    }

    /// `"P00003 - Acme Parts"`.
    pub(crate) fn purchase_entry(&self, company_id: CompanyId, po: &PurchaseOrder) -> String {
        let vendor = po
            .vendor()
            .map(|v| self.party_name(company_id, v))
            .unwrap_or_else(|| "-".to_string());
        format!("{} - {}", po.name(), vendor)
    }

    fn check_sale_references(
        &self,
        company_id: CompanyId,
        command: &PurchaseOrderCommand,
    ) -> Result<(), ServiceError> {
        let sale_order_id = match command {
            PurchaseOrderCommand::CreatePurchaseOrder(c) => c.sale_order_id,
            PurchaseOrderCommand::SetSaleOrder(c) => c.sale_order_id,
            _ => None,
        };
        if let Some(id) = sale_order_id {
            if self.sale_order(company_id, id).is_none() {
                return Err(ServiceError::not_found("sale order"));
            }
        }

        if let PurchaseOrderCommand::AddLine(c) = command {
            if let Some(sale_line) = c.sale_line {
                let exists = self
                    .sale_order(company_id, sale_line.order_id)
                    .is_some_and(|o| o.line(sale_line.line_no).is_some());
                if !exists {
                    return Err(ServiceError::not_found("sale line"));
                }
            }
        }
        Ok(())
    }

    fn reindex_purchase(&self, company_id: CompanyId, before: Option<&PurchaseOrder>, after: &PurchaseOrder) {
        let id = after.id_typed();

        let header_before = before.and_then(|p| p.sale_order_id());
        let header_after = after.sale_order_id();
        if let Some(previous) = header_before.filter(|s| Some(*s) != header_after) {
            self.update_links(company_id, previous, |l| {
                l.purchase_orders.remove(&id);
            });
        }
        if let Some(current) = header_after {
            self.update_links(company_id, current, |l| {
                l.purchase_orders.insert(id);
            });
        }

        let covered_before = before.map(covered_sales).unwrap_or_default();
        let covered_after = covered_sales(after);
        for sale in covered_before.difference(&covered_after) {
            self.update_links(company_id, *sale, |l| {
                l.covering_purchase_orders.remove(&id);
            });
        }
        for sale in &covered_after {
            self.update_links(company_id, *sale, |l| {
                l.covering_purchase_orders.insert(id);
            });
        }
    }
}

/// Sale orders whose lines the purchase order covers.
fn covered_sales(po: &PurchaseOrder) -> BTreeSet<SalesOrderId> {
    po.lines()
        .iter()
        .filter_map(|l| l.sale_line.map(|r| r.order_id))
        .collect()
}

/// Sale orders whose figures depend on the purchase order.
fn related_sales(po: &PurchaseOrder) -> BTreeSet<SalesOrderId> {
    let mut sales = covered_sales(po);
    sales.extend(po.sale_order_id());
    sales
}
