use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use orderlink_core::CompanyId;
use orderlink_sales::{PurchaseStatus, SalesOrderId};

use crate::error::ServiceError;
use crate::linking::{SaleLineStatus, line_statuses};
use crate::order_book::OrderBook;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductControlRow {
    pub product: String,
    pub sold: String,
    pub purchased: String,
    /// Never below zero.
    pub pending: String,
    pub status: PurchaseStatus,
    pub status_label: String,
    pub badge: String,
    pub row_class: String,
}

/// Per-line purchase coverage of a sale order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductControl {
    pub lines: Vec<ProductControlRow>,
}

impl ProductControl {
    pub fn build(lines: &[SaleLineStatus], product_name: impl Fn(&SaleLineStatus) -> String) -> Self {
        let lines = lines
            .iter()
            .map(|line| {
                let (badge, row_class, status_label) = match line.status {
                    PurchaseStatus::Purchased => ("success", "table-success", "✓ Complete"),
                    PurchaseStatus::Partial => ("warning", "table-warning", "⚠ Partial"),
                    PurchaseStatus::NotPurchased => ("danger", "table-danger", "✗ Not ordered"),
                };
                ProductControlRow {
                    product: product_name(line),
                    sold: quantity(line.ordered),
                    purchased: quantity(line.purchased),
                    pending: quantity(line.pending_display()),
                    status: line.status,
                    status_label: status_label.to_string(),
                    badge: badge.to_string(),
                    row_class: row_class.to_string(),
                }
            })
            .collect();
        Self { lines }
    }
}

fn quantity(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

impl OrderBook {
    /// Product control summary of a sale order, computed from the current documents.
    pub fn product_control(
        &self,
        company_id: CompanyId,
        sale_order_id: SalesOrderId,
    ) -> Result<ProductControl, ServiceError> {
        let order = self
            .sale_order(company_id, sale_order_id)
            .ok_or_else(|| ServiceError::not_found("sale order"))?;
        let covering = self.covering_purchase_orders(company_id, sale_order_id);
        let statuses = line_statuses(&order, &covering);
        Ok(ProductControl::build(&statuses, |line| {
            self.product(company_id, line.product_id)
                .map(|p| p.name().to_string())
                .unwrap_or_else(|| line.description.clone())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::Renderer;
    use orderlink_core::AggregateId;
    use orderlink_products::ProductId;
    use rust_decimal_macros::dec;

    fn status(line_no: u32, ordered: Decimal, purchased: Decimal) -> SaleLineStatus {
        SaleLineStatus {
            line_no,
            product_id: ProductId::new(AggregateId::new()),
            description: format!("Part {line_no}"),
            ordered,
            purchased,
            pending: ordered - purchased,
            status: PurchaseStatus::classify(purchased, ordered),
        }
    }

    #[test]
    fn rows_show_clipped_pending_and_status_badges() {
        let control = ProductControl::build(
            &[
                status(1, dec!(2), dec!(3)),
                status(2, dec!(4), dec!(1.5)),
                status(3, dec!(1), dec!(0)),
            ],
            |l| l.description.clone(),
        );

        assert_eq!(control.lines[0].pending, "0.00");
        assert_eq!(control.lines[0].purchased, "3.00");
        assert_eq!(control.lines[0].row_class, "table-success");
        assert_eq!(control.lines[1].pending, "2.50");
        assert_eq!(control.lines[1].badge, "warning");
        assert_eq!(control.lines[2].status_label, "✗ Not ordered");

        let html = Renderer::new().unwrap().product_control(&control).unwrap();
        assert!(html.contains(r#"<tr class="table-warning"><td><strong>Part 2</strong></td>"#));
        assert!(html.contains("✓ Complete"));
    }

    #[test]
    fn sale_order_without_lines_renders_empty_paragraph() {
        let control = ProductControl::build(&[], |l| l.description.clone());
        let html = Renderer::new().unwrap().product_control(&control).unwrap();
        assert_eq!(html.trim(), "<p><em>No sale lines</em></p>");
    }
}
