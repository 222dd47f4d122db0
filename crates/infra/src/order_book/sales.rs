use chrono::{DateTime, Utc};
use tracing::info;

use orderlink_core::{CompanyId, ExpectedVersion};
use orderlink_purchasing::{ClearSaleLineReference, PurchaseOrderCommand};
use orderlink_sales::{SaleLineRef, SalesOrder, SalesOrderCommand, SalesOrderEvent};

use super::OrderBook;
use crate::error::ServiceError;

impl OrderBook {
    /// Apply a sale order command, then refresh the order's derived figures.
    ///
    /// Removing a sale line clears every purchase line reference to it; the
    /// purchase lines themselves stay.
    pub fn execute_sale(&self, command: SalesOrderCommand) -> Result<SalesOrder, ServiceError> {
        let company_id = command.company_id();
        let order_id = command.order_id();

        let out = self
            .sales
            .dispatch(company_id, order_id, ExpectedVersion::Any, command, SalesOrder::empty)?;

        for event in &out.events {
            if let SalesOrderEvent::LineRemoved(e) = event {
                self.clear_sale_line_references(
                    company_id,
                    SaleLineRef::new(e.order_id, e.line_no),
                    e.occurred_at,
                )?;
            }
        }

        self.refresh(company_id, [order_id])?;
        Ok(out.aggregate)
    }

    fn clear_sale_line_references(
        &self,
        company_id: CompanyId,
        sale_line: SaleLineRef,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let covering = self.covering_purchase_orders(company_id, sale_line.order_id);
        for po in covering
            .iter()
            .filter(|po| po.lines().iter().any(|l| l.sale_line == Some(sale_line)))
        {
            self.execute_purchase(PurchaseOrderCommand::ClearSaleLineReference(
                ClearSaleLineReference {
                    company_id,
                    order_id: po.id_typed(),
                    sale_line,
                    occurred_at,
                },
            ))?;
            info!(
                company_id = %company_id,
                purchase_order = po.name(),
                sale_line = sale_line.line_no,
                "purchase line reference cleared after sale line removal"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::order_book::testing::fixture;
    use crate::test_support::{at, code, party};
    use orderlink_core::{AggregateId, VehicleInfo};
    use orderlink_products::ProductId;
    use orderlink_purchasing::{self as purchasing, PurchaseOrderCommand, PurchaseOrderId};
    use orderlink_sales::{self as sales, SalesOrderCommand, SalesOrderId};
    use rust_decimal_macros::dec;

    #[test]
    fn removing_a_sale_line_clears_purchase_references() {
        let f = fixture();
        let company_id = f.company_id;
        let sale_id = SalesOrderId::new(AggregateId::new());
        f.book
            .execute_sale(SalesOrderCommand::CreateSalesOrder(sales::CreateSalesOrder {
                company_id,
                order_id: sale_id,
                name: "S00001".to_string(),
                customer: party(),
                currency: code("USD"),
                vehicle: VehicleInfo::new(),
                occurred_at: at(2024, 1, 2),
            }))
            .unwrap();
        let sale = f
            .book
            .execute_sale(SalesOrderCommand::AddLine(sales::AddLine {
                company_id,
                order_id: sale_id,
                product_id: ProductId::new(AggregateId::new()),
                description: "Oil filter".to_string(),
                quantity: dec!(2),
                unit_price: dec!(10),
                occurred_at: at(2024, 1, 2),
            }))
            .unwrap();

        let po_id = PurchaseOrderId::new(AggregateId::new());
        f.book
            .execute_purchase(PurchaseOrderCommand::CreatePurchaseOrder(purchasing::CreatePurchaseOrder {
                company_id,
                order_id: po_id,
                name: "P00001".to_string(),
                vendor: party(),
                partner_ref: None,
                currency: code("USD"),
                date_order: at(2024, 1, 3),
                sale_order_id: None,
                vehicle: VehicleInfo::new(),
                occurred_at: at(2024, 1, 3),
            }))
            .unwrap();
        f.book
            .execute_purchase(PurchaseOrderCommand::AddLine(purchasing::AddLine {
                company_id,
                order_id: po_id,
                product_id: sale.lines()[0].product_id,
                description: "Oil filter".to_string(),
                quantity: dec!(2),
                unit_price: dec!(6),
                sale_line: Some(sale.line_ref(1)),
                occurred_at: at(2024, 1, 3),
            }))
            .unwrap();
        assert_eq!(f.book.overview(company_id, sale_id).unwrap().lines[0].purchased, dec!(2));

        f.book
            .execute_sale(SalesOrderCommand::RemoveLine(sales::RemoveLine {
                company_id,
                order_id: sale_id,
                line_no: 1,
                occurred_at: at(2024, 1, 4),
            }))
            .unwrap();

        let po = f.book.purchase_order(company_id, po_id).unwrap();
        assert_eq!(po.lines().len(), 1);
        assert_eq!(po.lines()[0].sale_line, None);
        assert!(f.book.linked_documents(company_id, sale_id).covering_purchase_orders.is_empty());
        assert!(f.book.overview(company_id, sale_id).unwrap().lines.is_empty());
    }
}
