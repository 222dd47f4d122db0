use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use orderlink_core::{AggregateId, CompanyId, ExpectedVersion, VehicleInfo};
use orderlink_events::Event;
use orderlink_invoicing::{
    Invoice, InvoiceCommand, InvoiceId, ResolveSources, bill_from_purchase_order, invoice_from_sale_order,
};
use orderlink_purchasing::PurchaseOrderId;
use orderlink_sales::SalesOrderId;

use super::OrderBook;
use crate::error::ServiceError;
use crate::linking::{ResolvedSources, resolve_sources};

impl OrderBook {
    /// Apply an invoice command.
    ///
    /// When the command can change where the invoice comes from (creation, new
    /// lines, new origin) its sources are resolved again and unset vehicle fields
    /// are filled from the source order, the sale order first.
    pub fn execute_invoice(&self, command: InvoiceCommand) -> Result<Invoice, ServiceError> {
        let company_id = command.company_id();
        let invoice_id = command.invoice_id();
        let affects_sources = command.affects_sources();

        let before_sale = self.invoice(company_id, invoice_id).and_then(|i| i.sale_order_id());
        let out = self
            .invoices
            .dispatch(company_id, invoice_id, ExpectedVersion::Any, command, Invoice::empty)?;

        let mut invoice = out.aggregate;
        if affects_sources {
            if let Some(occurred_at) = out.events.last().map(Event::occurred_at) {
                invoice = self.link_invoice_sources(invoice, occurred_at)?;
            }
        }

        let after_sale = invoice.sale_order_id();
        if before_sale != after_sale {
            if let Some(previous) = before_sale {
                self.update_links(company_id, previous, |l| {
                    l.invoices.remove(&invoice_id);
                });
            }
        }
        if let Some(current) = after_sale {
            self.update_links(company_id, current, |l| {
                l.invoices.insert(invoice_id);
            });
        }

        self.refresh(company_id, before_sale.into_iter().chain(after_sale))?;
        Ok(invoice)
    }

    /// Draft customer invoice billing every line of a sale order.
    pub fn invoice_sale_order(
        &self,
        company_id: CompanyId,
        sale_order_id: SalesOrderId,
        date: NaiveDate,
        occurred_at: DateTime<Utc>,
    ) -> Result<Invoice, ServiceError> {
        let order = self
            .sale_order(company_id, sale_order_id)
            .ok_or_else(|| ServiceError::not_found("sale order"))?;
        let create = invoice_from_sale_order(&order, InvoiceId::new(AggregateId::new()), date, occurred_at)?;
        self.execute_invoice(InvoiceCommand::CreateInvoice(create))
    }

    /// Draft vendor bill for every line of a purchase order.
    pub fn bill_purchase_order(
        &self,
        company_id: CompanyId,
        purchase_order_id: PurchaseOrderId,
        date: NaiveDate,
        occurred_at: DateTime<Utc>,
    ) -> Result<Invoice, ServiceError> {
        let order = self
            .purchase_order(company_id, purchase_order_id)
            .ok_or_else(|| ServiceError::not_found("purchase order"))?;
        let create = bill_from_purchase_order(&order, InvoiceId::new(AggregateId::new()), date, occurred_at)?;
        self.execute_invoice(InvoiceCommand::CreateInvoice(create))
    }

    fn link_invoice_sources(&self, invoice: Invoice, occurred_at: DateTime<Utc>) -> Result<Invoice, ServiceError> {
        let Some(company_id) = invoice.company_id() else {
            return Ok(invoice);
        };

        let resolved = resolve_sources(&invoice, self);
        let source_vehicle = self.source_vehicle(company_id, resolved);
        debug!(
            company_id = %company_id,
            invoice_id = %invoice.id_typed(),
            sale_order_id = ?resolved.sale_order_id,
            purchase_order_id = ?resolved.purchase_order_id,
            "invoice sources resolved"
        );

        let out = self.invoices.dispatch(
            company_id,
            invoice.id_typed(),
            ExpectedVersion::Any,
            InvoiceCommand::ResolveSources(ResolveSources {
                company_id,
                invoice_id: invoice.id_typed(),
                sale_order_id: resolved.sale_order_id,
                purchase_order_id: resolved.purchase_order_id,
                source_vehicle,
                occurred_at,
            }),
            Invoice::empty,
        )?;
        Ok(out.aggregate)
    }

    fn source_vehicle(&self, company_id: CompanyId, resolved: ResolvedSources) -> Option<VehicleInfo> {
        let from_sale = resolved
            .sale_order_id
            .and_then(|id| self.sale_order(company_id, id))
            .map(|o| o.vehicle().clone())
            .filter(VehicleInfo::has_any);
        from_sale.or_else(|| {
            resolved
                .purchase_order_id
                .and_then(|id| self.purchase_order(company_id, id))
                .map(|o| o.vehicle().clone())
                .filter(VehicleInfo::has_any)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::order_book::testing::{Fixture, fixture};
    use crate::test_support::{at, code, date, party};
    use orderlink_core::{AggregateId, VehicleInfo};
    use orderlink_invoicing::{
        CreateInvoice, InvoiceCommand, InvoiceId, InvoiceLineInput, MoveType, PostInvoice, SetOrigin,
    };
    use orderlink_products::ProductId;
    use orderlink_purchasing::{self as purchasing, PurchaseOrderCommand, PurchaseOrderId};
    use orderlink_sales::{self as sales, SalesOrderCommand, SalesOrderId};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn create_sale(f: &Fixture, vehicle: VehicleInfo) -> SalesOrderId {
        let order_id = SalesOrderId::new(AggregateId::new());
        f.book
            .execute_sale(SalesOrderCommand::CreateSalesOrder(sales::CreateSalesOrder {
                company_id: f.company_id,
                order_id,
                name: "S00001".to_string(),
                customer: party(),
                currency: code("USD"),
                vehicle,
                occurred_at: at(2024, 1, 2),
            }))
            .unwrap();
        f.book
            .execute_sale(SalesOrderCommand::AddLine(sales::AddLine {
                company_id: f.company_id,
                order_id,
                product_id: ProductId::new(AggregateId::new()),
                description: "Brake service".to_string(),
                quantity: dec!(1),
                unit_price: dec!(1000),
                occurred_at: at(2024, 1, 2),
            }))
            .unwrap();
        order_id
    }

    fn manual_invoice(f: &Fixture, origin: Option<&str>, vehicle: VehicleInfo) -> InvoiceId {
        let invoice_id = InvoiceId::new(AggregateId::new());
        f.book
            .execute_invoice(InvoiceCommand::CreateInvoice(CreateInvoice {
                company_id: f.company_id,
                invoice_id,
                move_type: MoveType::OutInvoice,
                partner: party(),
                currency: code("USD"),
                invoice_date: Some(date(2024, 1, 10)),
                date: date(2024, 1, 10),
                invoice_origin: origin.map(str::to_string),
                lines: vec![InvoiceLineInput {
                    product_id: None,
                    description: "Labour".to_string(),
                    quantity: Decimal::ONE,
                    unit_price: dec!(250),
                    sale_lines: vec![],
                    purchase_line: None,
                }],
                vehicle,
                occurred_at: at(2024, 1, 10),
            }))
            .unwrap();
        invoice_id
    }

    #[test]
    fn invoice_from_sale_order_links_back_and_counts_once_posted() {
        let f = fixture();
        let sale = create_sale(&f, VehicleInfo::new().with_plate("abc-123"));

        let invoice = f.book.invoice_sale_order(f.company_id, sale, date(2024, 1, 10), at(2024, 1, 10)).unwrap();
        assert_eq!(invoice.sale_order_id(), Some(sale));
        assert_eq!(invoice.vehicle().plate(), Some("ABC-123"));
        assert_eq!(f.book.overview(f.company_id, sale).unwrap().liquidation.gross_invoiced, dec!(0));

        f.book
            .execute_invoice(InvoiceCommand::PostInvoice(PostInvoice {
                company_id: f.company_id,
                invoice_id: invoice.id_typed(),
                occurred_at: at(2024, 1, 11),
            }))
            .unwrap();

        let overview = f.book.overview(f.company_id, sale).unwrap();
        assert_eq!(overview.invoice_count, 1);
        assert_eq!(overview.liquidation.gross_invoiced, dec!(1000));
        assert_eq!(overview.liquidation.completion, dec!(1));
    }

    #[test]
    fn origin_fallback_fills_only_unset_vehicle_fields() {
        let f = fixture();
        let sale = create_sale(&f, VehicleInfo::new().with_plate("abc-123").with_brand("mazda"));

        let invoice_id = manual_invoice(&f, Some("S00001"), VehicleInfo::new().with_plate("manual-9"));

        let invoice = f.book.invoice(f.company_id, invoice_id).unwrap();
        assert_eq!(invoice.sale_order_id(), Some(sale));
        assert_eq!(invoice.vehicle().plate(), Some("MANUAL-9"));
        assert_eq!(invoice.vehicle().brand(), Some("MAZDA"));
        assert_eq!(f.book.linked_invoices(f.company_id, sale).len(), 1);
    }

    #[test]
    fn changing_the_origin_moves_the_invoice_between_sale_orders() {
        let f = fixture();
        let sale = create_sale(&f, VehicleInfo::new());
        let invoice_id = manual_invoice(&f, Some("S00001"), VehicleInfo::new());

        f.book
            .execute_invoice(InvoiceCommand::SetOrigin(SetOrigin {
                company_id: f.company_id,
                invoice_id,
                invoice_origin: Some("UNKNOWN".to_string()),
                occurred_at: at(2024, 1, 12),
            }))
            .unwrap();

        assert_eq!(f.book.invoice(f.company_id, invoice_id).unwrap().sale_order_id(), None);
        assert!(f.book.linked_invoices(f.company_id, sale).is_empty());
        assert_eq!(f.book.overview(f.company_id, sale).unwrap().invoice_count, 0);
    }

    #[test]
    fn vendor_bill_takes_purchase_vehicle() {
        let f = fixture();
        let order_id = PurchaseOrderId::new(AggregateId::new());
        f.book
            .execute_purchase(PurchaseOrderCommand::CreatePurchaseOrder(purchasing::CreatePurchaseOrder {
                company_id: f.company_id,
                order_id,
                name: "P00001".to_string(),
                vendor: party(),
                partner_ref: None,
                currency: code("USD"),
                date_order: at(2024, 1, 3),
                sale_order_id: None,
                vehicle: VehicleInfo::new().with_vin("vin-42"),
                occurred_at: at(2024, 1, 3),
            }))
            .unwrap();
        f.book
            .execute_purchase(PurchaseOrderCommand::AddLine(purchasing::AddLine {
                company_id: f.company_id,
                order_id,
                product_id: ProductId::new(AggregateId::new()),
                description: "Filter".to_string(),
                quantity: dec!(3),
                unit_price: dec!(10),
                sale_line: None,
                occurred_at: at(2024, 1, 3),
            }))
            .unwrap();

        let bill = f.book.bill_purchase_order(f.company_id, order_id, date(2024, 1, 5), at(2024, 1, 5)).unwrap();

        assert_eq!(bill.move_type(), MoveType::InInvoice);
        assert_eq!(bill.purchase_order_id(), Some(order_id));
        assert_eq!(bill.sale_order_id(), None);
        assert_eq!(bill.vehicle().vin(), Some("VIN-42"));
    }
}
