use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use orderlink_core::{AggregateId, CompanyId};
use orderlink_parties::PartyId;
use orderlink_products::ProductId;
use orderlink_purchasing::{self as purchasing, PurchaseOrderCommand, PurchaseOrderId};
use orderlink_sales::{SaleLineRef, SalesOrder, SalesOrderId};

use crate::error::ServiceError;
use crate::linking::line_statuses;
use crate::navigation::Action;
use crate::order_book::OrderBook;

/// Purchase data shown before confirming.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePurchasePreview {
    /// Names of sale line products that have no supplier configured.
    pub products_without_supplier: Vec<String>,
    /// At least one sale line already has purchased quantity.
    pub has_purchased_lines: bool,
}

impl CreatePurchasePreview {
    pub fn products_without_supplier_count(&self) -> usize {
        self.products_without_supplier.len()
    }
}

/// One purchase line to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedLine {
    pub sale_line: SaleLineRef,
    pub product_id: ProductId,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Preferred supplier, or `None` for the generic vendor.
    pub vendor: Option<PartyId>,
}

/// Creates purchase orders for the lines of a sale order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePurchaseWizard {
    pub company_id: CompanyId,
    pub sale_order_id: SalesOrderId,
    /// One purchase order per vendor; otherwise a single order for every line.
    pub group_by_vendor: bool,
    /// Buy only what is still pending instead of the full sold quantity.
    pub only_missing: bool,
}

impl CreatePurchaseWizard {
    /// Wizard with the configured default toggles.
    pub fn new(book: &OrderBook, company_id: CompanyId, sale_order_id: SalesOrderId) -> Self {
        Self {
            company_id,
            sale_order_id,
            group_by_vendor: book.config().group_by_vendor,
            only_missing: book.config().only_missing,
        }
    }

    pub fn with_group_by_vendor(mut self, group_by_vendor: bool) -> Self {
        self.group_by_vendor = group_by_vendor;
        self
    }

    pub fn with_only_missing(mut self, only_missing: bool) -> Self {
        self.only_missing = only_missing;
        self
    }

    pub fn preview(&self, book: &OrderBook) -> Result<CreatePurchasePreview, ServiceError> {
        let order = self.sale_order(book)?;
        let covering = book.covering_purchase_orders(self.company_id, self.sale_order_id);

        let products_without_supplier = order
            .lines()
            .iter()
            .filter_map(|line| match book.product(self.company_id, line.product_id) {
                Some(product) if !product.suppliers().is_empty() => None,
                Some(product) => Some(product.name().to_string()),
                None => Some(line.description.clone()),
            })
            .collect();
        let has_purchased_lines = line_statuses(&order, &covering)
            .iter()
            .any(|s| s.purchased > Decimal::ZERO);

        Ok(CreatePurchasePreview {
            products_without_supplier,
            has_purchased_lines,
        })
    }

    /// Lines that confirming would create, in sale line order.
    pub fn plan(&self, book: &OrderBook) -> Result<Vec<PlannedLine>, ServiceError> {
        let order = self.sale_order(book)?;
        if order.lines().is_empty() {
            return Err(ServiceError::validation("the sale order has no lines"));
        }

        let covering = book.covering_purchase_orders(self.company_id, self.sale_order_id);
        let mut planned = Vec::new();
        for status in line_statuses(&order, &covering) {
            let quantity = if self.only_missing {
                status.pending.max(Decimal::ZERO)
            } else {
                status.ordered
            };
            if quantity <= Decimal::ZERO {
                info!(
                    sale_order = order.name(),
                    line_no = status.line_no,
                    only_missing = self.only_missing,
                    "sale line skipped, nothing to purchase"
                );
                continue;
            }

            let Some(line) = order.line(status.line_no) else {
                continue;
            };
            let product = book.product(self.company_id, line.product_id);
            let (vendor, unit_price) = match product.as_ref().and_then(|p| p.preferred_supplier()) {
                Some(supplier) => (Some(supplier.vendor), supplier.price),
                None => (None, line.unit_price),
            };

            planned.push(PlannedLine {
                sale_line: order.line_ref(line.line_no),
                product_id: line.product_id,
                description: product
                    .as_ref()
                    .map(|p| p.name().to_string())
                    .unwrap_or_else(|| line.description.clone()),
                quantity,
                unit_price,
                vendor,
            });
        }

        if planned.is_empty() {
            return Err(ServiceError::validation(
                "no purchase orders were created: every product is already purchased or has nothing to buy",
            ));
        }
        Ok(planned)
    }

    /// Create the purchase orders and return the action showing them.
    pub fn confirm(&self, book: &OrderBook, occurred_at: DateTime<Utc>) -> Result<Action, ServiceError> {
        let order = self.sale_order(book)?;
        let planned = self.plan(book)?;

        let generic_lines = planned.iter().filter(|l| l.vendor.is_none()).count();
        let generic_vendor = if generic_lines > 0 {
            Some(book.ensure_generic_vendor(self.company_id, occurred_at)?.id_typed())
        } else {
            None
        };
        let resolve = |vendor: Option<PartyId>| vendor.or(generic_vendor);

        let mut groups: Vec<(PartyId, Vec<PlannedLine>)> = Vec::new();
        for line in planned {
            let Some(vendor) = resolve(line.vendor) else {
                continue;
            };
            let position = if self.group_by_vendor {
                groups.iter().position(|(v, _)| *v == vendor)
            } else if groups.is_empty() {
                None
            } else {
                Some(0)
            };
            match position {
                Some(i) => groups[i].1.push(line),
                None => groups.push((vendor, vec![line])),
            }
        }

        let mut created = Vec::with_capacity(groups.len());
        for (vendor, lines) in groups {
            created.push(self.create_order(book, &order, vendor, lines, occurred_at)?);
        }

        if generic_lines > 0 {
            let vendor_name = book.config().generic_vendor_name.clone();
            book.post_note(
                self.company_id,
                self.sale_order_id,
                "Purchase orders created",
                vec![
                    format!(
                        "{generic_lines} products assigned to {vendor_name} because they had no supplier configured."
                    ),
                    "The vendor can be changed by editing the created purchase orders.".to_string(),
                ],
                occurred_at,
            );
        }

        info!(
            company_id = %self.company_id,
            sale_order = order.name(),
            purchase_orders = created.len(),
            generic_lines,
            group_by_vendor = self.group_by_vendor,
            "purchase orders created from sale order"
        );

        Ok(Action::for_purchase_orders(
            created,
            "Purchase order created",
            "Purchase orders created",
            None,
        ))
    }

    fn create_order(
        &self,
        book: &OrderBook,
        order: &SalesOrder,
        vendor: PartyId,
        lines: Vec<PlannedLine>,
        occurred_at: DateTime<Utc>,
    ) -> Result<PurchaseOrderId, ServiceError> {
        let order_id = PurchaseOrderId::new(AggregateId::new());
        let currency = order
            .currency()
            .cloned()
            .ok_or_else(|| ServiceError::not_found("sale order currency"))?;

        book.execute_purchase(PurchaseOrderCommand::CreatePurchaseOrder(purchasing::CreatePurchaseOrder {
            company_id: self.company_id,
            order_id,
            name: book.next_purchase_reference(self.company_id)?,
            vendor,
            partner_ref: None,
            currency,
            date_order: occurred_at,
            sale_order_id: Some(self.sale_order_id),
            vehicle: order.vehicle().clone(),
            occurred_at,
        }))?;

        for line in lines {
            book.execute_purchase(PurchaseOrderCommand::AddLine(purchasing::AddLine {
                company_id: self.company_id,
                order_id,
                product_id: line.product_id,
                description: line.description,
                quantity: line.quantity,
                unit_price: line.unit_price,
                sale_line: Some(line.sale_line),
                occurred_at,
            }))?;
        }
        Ok(order_id)
    }

    fn sale_order(&self, book: &OrderBook) -> Result<SalesOrder, ServiceError> {
        book.sale_order(self.company_id, self.sale_order_id)
            .ok_or_else(|| ServiceError::not_found("sale order"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order_book::testing::{Fixture, fixture};
    use crate::test_support::{at, code, party};
    use orderlink_core::VehicleInfo;
    use orderlink_events::{DocumentKind, DocumentRef};
    use orderlink_parties::{PartyCommand, PartyKind, RegisterParty};
    use orderlink_products::{AddSupplier, CreateProduct, ProductCommand};
    use orderlink_sales::{self as sales, PurchaseStatus, SalesOrderCommand};
    use rust_decimal_macros::dec;

    fn vendor(f: &Fixture, name: &str) -> PartyId {
        let party_id = PartyId::new(AggregateId::new());
        f.book
            .execute_party(PartyCommand::RegisterParty(RegisterParty {
                company_id: f.company_id,
                party_id,
                kind: PartyKind::Supplier,
                name: name.to_string(),
                key: None,
                occurred_at: at(2024, 1, 1),
            }))
            .unwrap();
        party_id
    }

    fn product(f: &Fixture, name: &str, supplier: Option<(PartyId, Decimal)>) -> ProductId {
        let product_id = ProductId::new(AggregateId::new());
        f.book
            .execute_product(ProductCommand::CreateProduct(CreateProduct {
                company_id: f.company_id,
                product_id,
                sku: name.to_uppercase(),
                name: name.to_string(),
                occurred_at: at(2024, 1, 1),
            }))
            .unwrap();
        if let Some((vendor, price)) = supplier {
            f.book
                .execute_product(ProductCommand::AddSupplier(AddSupplier {
                    company_id: f.company_id,
                    product_id,
                    vendor,
                    price,
                    occurred_at: at(2024, 1, 1),
                }))
                .unwrap();
        }
        product_id
    }

    fn sale(f: &Fixture, lines: &[(ProductId, Decimal, Decimal)]) -> SalesOrderId {
        let order_id = SalesOrderId::new(AggregateId::new());
        f.book
            .execute_sale(SalesOrderCommand::CreateSalesOrder(sales::CreateSalesOrder {
                company_id: f.company_id,
                order_id,
                name: "S00001".to_string(),
                customer: party(),
                currency: code("USD"),
                vehicle: VehicleInfo::new().with_plate("abc-123").with_brand("kia"),
                occurred_at: at(2024, 1, 2),
            }))
            .unwrap();
        for (product_id, quantity, unit_price) in lines {
            f.book
                .execute_sale(SalesOrderCommand::AddLine(sales::AddLine {
                    company_id: f.company_id,
                    order_id,
                    product_id: *product_id,
                    description: "Sold part".to_string(),
                    quantity: *quantity,
                    unit_price: *unit_price,
                    occurred_at: at(2024, 1, 2),
                }))
                .unwrap();
        }
        order_id
    }

    #[test]
    fn groups_lines_per_vendor_and_falls_back_to_generic_vendor() {
        let f = fixture();
        let acme = vendor(&f, "Acme Parts");
        let pads = product(&f, "Brake pads", Some((acme, dec!(30))));
        let discs = product(&f, "Brake discs", Some((acme, dec!(55))));
        let wipers = product(&f, "Wipers", None);
        let sale_order_id = sale(&f, &[(pads, dec!(2), dec!(50)), (discs, dec!(1), dec!(90)), (wipers, dec!(3), dec!(12))]);

        let wizard = CreatePurchaseWizard::new(&f.book, f.company_id, sale_order_id);
        let preview = wizard.preview(&f.book).unwrap();
        assert_eq!(preview.products_without_supplier, vec!["Wipers".to_string()]);
        assert!(!preview.has_purchased_lines);

        let action = wizard.confirm(&f.book, at(2024, 1, 4)).unwrap();

        let Action::ListPurchaseOrders { title, purchase_order_ids, .. } = action else {
            panic!("expected a list action");
        };
        assert_eq!(title, "Purchase orders created");
        assert_eq!(purchase_order_ids.len(), 2);

        let acme_order = f.book.purchase_order(f.company_id, purchase_order_ids[0]).unwrap();
        assert_eq!(acme_order.vendor(), Some(acme));
        assert_eq!(acme_order.lines().len(), 2);
        assert_eq!(acme_order.lines()[0].unit_price, dec!(30));
        assert_eq!(acme_order.lines()[0].description, "Brake pads");
        assert_eq!(acme_order.sale_order_id(), Some(sale_order_id));
        assert_eq!(acme_order.vehicle().brand(), Some("KIA"));

        let generic = f.book.generic_vendor(f.company_id).unwrap();
        let generic_order = f.book.purchase_order(f.company_id, purchase_order_ids[1]).unwrap();
        assert_eq!(generic_order.vendor(), Some(generic.id_typed()));
        assert_eq!(generic_order.lines()[0].unit_price, dec!(12));

        let notes = f.audit.notes_for(DocumentRef::new(DocumentKind::SaleOrder, sale_order_id.0));
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].subject, "Purchase orders created");
        assert!(notes[0].lines[0].starts_with("1 products assigned to GENERIC VENDOR"));

        let overview = f.book.overview(f.company_id, sale_order_id).unwrap();
        assert!(overview.lines.iter().all(|l| l.status == PurchaseStatus::Purchased));
    }

    #[test]
    fn batch_mode_uses_first_line_vendor() {
        let f = fixture();
        let acme = vendor(&f, "Acme Parts");
        let bolt = vendor(&f, "Bolt & Co");
        let pads = product(&f, "Brake pads", Some((acme, dec!(30))));
        let bolts = product(&f, "Bolts", Some((bolt, dec!(1))));
        let sale_order_id = sale(&f, &[(pads, dec!(1), dec!(50)), (bolts, dec!(10), dec!(2))]);

        let action = CreatePurchaseWizard::new(&f.book, f.company_id, sale_order_id)
            .with_group_by_vendor(false)
            .confirm(&f.book, at(2024, 1, 4))
            .unwrap();

        let Action::OpenPurchaseOrder { title, purchase_order_id, .. } = action else {
            panic!("expected a form action");
        };
        assert_eq!(title, "Purchase order created");
        let po = f.book.purchase_order(f.company_id, purchase_order_id).unwrap();
        assert_eq!(po.vendor(), Some(acme));
        assert_eq!(po.lines().len(), 2);
        assert!(f.audit.all().is_empty());
        assert!(f.book.generic_vendor(f.company_id).is_none());
    }

    #[test]
    fn only_missing_buys_pending_quantity() {
        let f = fixture();
        let acme = vendor(&f, "Acme Parts");
        let pads = product(&f, "Brake pads", Some((acme, dec!(30))));
        let sale_order_id = sale(&f, &[(pads, dec!(5), dec!(50))]);
        let first = CreatePurchaseWizard::new(&f.book, f.company_id, sale_order_id);
        first.confirm(&f.book, at(2024, 1, 4)).unwrap();

        // Sold quantity goes up after the first purchase.
        f.book
            .execute_sale(SalesOrderCommand::UpdateLineQuantity(sales::UpdateLineQuantity {
                company_id: f.company_id,
                order_id: sale_order_id,
                line_no: 1,
                quantity: dec!(8),
                occurred_at: at(2024, 1, 5),
            }))
            .unwrap();

        let wizard = CreatePurchaseWizard::new(&f.book, f.company_id, sale_order_id);
        assert!(wizard.preview(&f.book).unwrap().has_purchased_lines);
        let planned = wizard.plan(&f.book).unwrap();
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].quantity, dec!(3));

        let full = wizard.clone().with_only_missing(false).plan(&f.book).unwrap();
        assert_eq!(full[0].quantity, dec!(8));
    }

    #[test]
    fn nothing_left_to_purchase_is_rejected_without_writes() {
        let f = fixture();
        let wipers = product(&f, "Wipers", None);
        let sale_order_id = sale(&f, &[(wipers, dec!(0), dec!(12))]);

        let err = CreatePurchaseWizard::new(&f.book, f.company_id, sale_order_id)
            .confirm(&f.book, at(2024, 1, 4))
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(f.book.purchase_orders(f.company_id).is_empty());
        assert!(f.book.generic_vendor(f.company_id).is_none());
    }

    #[test]
    fn sale_order_without_lines_is_rejected() {
        let f = fixture();
        let sale_order_id = sale(&f, &[]);

        let err = CreatePurchaseWizard::new(&f.book, f.company_id, sale_order_id)
            .confirm(&f.book, at(2024, 1, 4))
            .unwrap_err();

        assert_eq!(err, ServiceError::Validation("the sale order has no lines".to_string()));
    }
}
