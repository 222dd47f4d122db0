use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use orderlink_core::CompanyId;
use orderlink_currency::Money;
use orderlink_parties::PartyId;
use orderlink_purchasing::{PurchaseOrder, PurchaseOrderCommand, PurchaseOrderId, PurchaseState, UpdateVehicle};
use orderlink_sales::{SalesOrder, SalesOrderId};

use crate::error::ServiceError;
use crate::navigation::Action;
use crate::order_book::OrderBook;
use crate::reports::VehiclePanel;

/// A purchase order the wizard can link, as listed to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseCandidate {
    pub purchase_order_id: PurchaseOrderId,
    pub name: String,
    pub vendor: String,
    pub partner_ref: Option<String>,
    pub date_order: Option<NaiveDate>,
    pub state: PurchaseState,
    pub amount: String,
    pub selected: bool,
}

/// Links existing, unlinked purchase orders to a sale order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPurchaseWizard {
    pub company_id: CompanyId,
    pub sale_order_id: SalesOrderId,
    pub vendor: Option<PartyId>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Case-insensitive match on the order reference or the vendor reference.
    pub text: Option<String>,
    /// `None` lists orders in any state.
    pub state: Option<PurchaseState>,
    /// Overwrite the purchase orders' vehicle fields with the ones set on the sale.
    pub copy_vehicle: bool,
    pub selected: BTreeSet<PurchaseOrderId>,
}

impl LinkPurchaseWizard {
    pub fn new(book: &OrderBook, company_id: CompanyId, sale_order_id: SalesOrderId) -> Self {
        Self {
            company_id,
            sale_order_id,
            vendor: None,
            date_from: None,
            date_to: None,
            text: None,
            state: book.config().link_state_filter,
            copy_vehicle: true,
            selected: BTreeSet::new(),
        }
    }

    pub fn with_vendor(mut self, vendor: PartyId) -> Self {
        self.vendor = Some(vendor);
        self
    }

    pub fn with_date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_state(mut self, state: Option<PurchaseState>) -> Self {
        self.state = state;
        self
    }

    pub fn with_copy_vehicle(mut self, copy_vehicle: bool) -> Self {
        self.copy_vehicle = copy_vehicle;
        self
    }

    /// Unlinked purchase orders matching the filters, newest order date first.
    pub fn available(&self, book: &OrderBook) -> Vec<PurchaseOrder> {
        let mut orders: Vec<PurchaseOrder> = book
            .purchase_orders(self.company_id)
            .into_iter()
            .filter(|po| self.matches(po))
            .collect();
        orders.sort_by(|a, b| b.date_order().cmp(&a.date_order()));
        orders
    }

    pub fn candidates(&self, book: &OrderBook) -> Vec<PurchaseCandidate> {
        self.available(book)
            .iter()
            .map(|po| PurchaseCandidate {
                purchase_order_id: po.id_typed(),
                name: po.name().to_string(),
                vendor: po
                    .vendor()
                    .map(|v| book.party_name(self.company_id, v))
                    .unwrap_or_else(|| "-".to_string()),
                partner_ref: po.partner_ref().map(str::to_string),
                date_order: po.date_order().map(|d| d.date_naive()),
                state: po.state(),
                amount: po
                    .currency()
                    .map(|c| Money::new(po.amount_total(), c.clone()).display())
                    .unwrap_or_default(),
                selected: self.selected.contains(&po.id_typed()),
            })
            .collect()
    }

    pub fn select(&mut self, purchase_order_id: PurchaseOrderId) {
        self.selected.insert(purchase_order_id);
    }

    pub fn deselect(&mut self, purchase_order_id: PurchaseOrderId) {
        self.selected.remove(&purchase_order_id);
    }

    /// Select every currently available order.
    pub fn select_all(&mut self, book: &OrderBook) {
        self.selected = self.available(book).iter().map(|po| po.id_typed()).collect();
    }

    pub fn deselect_all(&mut self) {
        self.selected.clear();
    }

    pub fn vehicle_panel(&self, book: &OrderBook) -> Result<VehiclePanel, ServiceError> {
        book.vehicle_panel(self.company_id, self.sale_order_id)
    }

    /// Link the selected orders and return a success notification.
    pub fn confirm(&self, book: &OrderBook, occurred_at: DateTime<Utc>) -> Result<Action, ServiceError> {
        if self.selected.is_empty() {
            return Err(ServiceError::validation(
                "select at least one purchase order to link",
            ));
        }
        let sale = book
            .sale_order(self.company_id, self.sale_order_id)
            .ok_or_else(|| ServiceError::not_found("sale order"))?;
        let mut selected = self
            .selected
            .iter()
            .map(|id| {
                book.purchase_order(self.company_id, *id)
                    .ok_or_else(|| ServiceError::not_found("purchase order"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(taken) = selected.iter().find(|po| po.sale_order_id().is_some()) {
            return Err(ServiceError::validation(format!(
                "purchase order {} is already linked to a sale order",
                taken.name()
            )));
        }
        selected.sort_by(|a, b| a.name().cmp(b.name()));

        let mut entries = Vec::with_capacity(selected.len());
        for po in &selected {
            let linked = book.link_purchase(self.company_id, po.id_typed(), Some(self.sale_order_id), occurred_at)?;
            if self.copy_vehicle {
                self.copy_sale_vehicle(book, &sale, &linked, occurred_at)?;
            }
            entries.push(book.purchase_entry(self.company_id, &linked));
        }

        let mut lines = vec![format!("Linked {} existing purchase orders:", entries.len())];
        lines.extend(entries);
        book.post_note(
            self.company_id,
            self.sale_order_id,
            "Purchase orders linked manually",
            lines,
            occurred_at,
        );
        book.recompute_sale_order(self.company_id, self.sale_order_id)?;

        info!(
            company_id = %self.company_id,
            sale_order = sale.name(),
            linked = selected.len(),
            copy_vehicle = self.copy_vehicle,
            "purchase orders linked to sale order"
        );

        Ok(Action::success(
            "Link successful",
            format!("Linked {} purchase orders to {}", selected.len(), sale.name()),
            Action::Close,
        ))
    }

    fn copy_sale_vehicle(
        &self,
        book: &OrderBook,
        sale: &SalesOrder,
        po: &PurchaseOrder,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let mut vehicle = po.vehicle().clone();
        if !vehicle.overwrite_present(sale.vehicle()) {
            return Ok(());
        }
        book.execute_purchase(PurchaseOrderCommand::UpdateVehicle(UpdateVehicle {
            company_id: self.company_id,
            order_id: po.id_typed(),
            vehicle,
            occurred_at,
        }))?;
        Ok(())
    }

    fn matches(&self, po: &PurchaseOrder) -> bool {
        if po.sale_order_id().is_some() {
            return false;
        }
        if self.vendor.is_some_and(|v| po.vendor() != Some(v)) {
            return false;
        }
        if self.state.is_some_and(|s| po.state() != s) {
            return false;
        }

        let date = po.date_order().map(|d| d.date_naive());
        if let Some(from) = self.date_from {
            if date.is_none_or(|d| d < from) {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if date.is_none_or(|d| d > to) {
                return false;
            }
        }

        match self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(text) => {
                let needle = text.to_lowercase();
                po.name().to_lowercase().contains(&needle)
                    || po
                        .partner_ref()
                        .is_some_and(|r| r.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkConfig;
    use crate::order_book::testing::{Fixture, fixture, fixture_with};
    use crate::test_support::{at, code, date, party};
    use orderlink_core::{AggregateId, VehicleInfo};
    use orderlink_events::{DocumentKind, DocumentRef};
    use orderlink_parties::{PartyCommand, PartyKind, RegisterParty};
    use orderlink_products::ProductId;
    use orderlink_purchasing as purchasing;
    use orderlink_sales::{self as sales, SalesOrderCommand};
    use rust_decimal_macros::dec;

    fn sale(f: &Fixture) -> SalesOrderId {
        sale_named(f, "S00007")
    }

    fn sale_named(f: &Fixture, name: &str) -> SalesOrderId {
        let order_id = SalesOrderId::new(AggregateId::new());
        f.book
            .execute_sale(SalesOrderCommand::CreateSalesOrder(sales::CreateSalesOrder {
                company_id: f.company_id,
                order_id,
                name: name.to_string(),
                customer: party(),
                currency: code("USD"),
                vehicle: VehicleInfo::new().with_plate("abc-123").with_year("2019"),
                occurred_at: at(2024, 1, 2),
            }))
            .unwrap();
        order_id
    }

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

    fn purchase(
        f: &Fixture,
        vendor: PartyId,
        partner_ref: Option<&str>,
        date_order: DateTime<Utc>,
        confirm: bool,
    ) -> PurchaseOrderId {
        let order_id = PurchaseOrderId::new(AggregateId::new());
        f.book
            .execute_purchase(PurchaseOrderCommand::CreatePurchaseOrder(purchasing::CreatePurchaseOrder {
                company_id: f.company_id,
                order_id,
                name: f.book.next_purchase_reference(f.company_id).unwrap(),
                vendor,
                partner_ref: partner_ref.map(str::to_string),
                currency: code("USD"),
                date_order,
                sale_order_id: None,
                vehicle: VehicleInfo::new().with_plate("old-1").with_vin("keep-vin"),
                occurred_at: date_order,
            }))
            .unwrap();
        f.book
            .execute_purchase(PurchaseOrderCommand::AddLine(purchasing::AddLine {
                company_id: f.company_id,
                order_id,
                product_id: ProductId::new(AggregateId::new()),
                description: "Alternator".to_string(),
                quantity: dec!(1),
                unit_price: dec!(400),
                sale_line: None,
                occurred_at: date_order,
            }))
            .unwrap();
        if confirm {
            f.book.confirm_purchase(f.company_id, order_id, date_order).unwrap();
        }
        order_id
    }

    #[test]
    fn filters_and_sorts_available_orders() {
        let f = fixture();
        let sale_order_id = sale(&f);
        let acme = vendor(&f, "Acme Parts");
        let other = vendor(&f, "Other Supply");
        let old = purchase(&f, acme, Some("INV-77"), at(2024, 1, 5), true);
        let new = purchase(&f, acme, None, at(2024, 2, 5), true);
        let _draft = purchase(&f, acme, None, at(2024, 2, 6), false);
        let _other_vendor = purchase(&f, other, None, at(2024, 2, 7), true);

        let wizard = LinkPurchaseWizard::new(&f.book, f.company_id, sale_order_id).with_vendor(acme);
        let ids: Vec<_> = wizard.available(&f.book).iter().map(|p| p.id_typed()).collect();
        assert_eq!(ids, vec![new, old]);

        let by_ref = wizard.clone().with_text("inv-7");
        assert_eq!(by_ref.available(&f.book)[0].id_typed(), old);

        let by_date = wizard.clone().with_date_range(Some(date(2024, 2, 5)), Some(date(2024, 2, 5)));
        assert_eq!(by_date.available(&f.book).len(), 1);

        let any_state = wizard.with_state(None);
        assert_eq!(any_state.available(&f.book).len(), 3);
    }

    #[test]
    fn confirm_links_copies_vehicle_and_notifies() {
        let f = fixture();
        let sale_order_id = sale(&f);
        let acme = vendor(&f, "Acme Parts");
        let first = purchase(&f, acme, None, at(2024, 1, 5), true);
        let second = purchase(&f, acme, None, at(2024, 1, 6), true);

        let mut wizard = LinkPurchaseWizard::new(&f.book, f.company_id, sale_order_id);
        wizard.select_all(&f.book);
        assert_eq!(wizard.selected.len(), 2);

        let action = wizard.confirm(&f.book, at(2024, 1, 8)).unwrap();

        assert_eq!(
            action,
            Action::success("Link successful", "Linked 2 purchase orders to S00007", Action::Close)
        );
        for id in [first, second] {
            let po = f.book.purchase_order(f.company_id, id).unwrap();
            assert_eq!(po.sale_order_id(), Some(sale_order_id));
            assert_eq!(po.vehicle().plate(), Some("ABC-123"));
            assert_eq!(po.vehicle().year(), Some("2019"));
            assert_eq!(po.vehicle().vin(), Some("KEEP-VIN"));
        }

        let notes = f.audit.notes_for(DocumentRef::new(DocumentKind::SaleOrder, sale_order_id.0));
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].subject, "Purchase orders linked manually");
        assert_eq!(
            notes[0].lines,
            vec![
                "Linked 2 existing purchase orders:".to_string(),
                "P00001 - Acme Parts".to_string(),
                "P00002 - Acme Parts".to_string(),
            ]
        );

        let overview = f.book.overview(f.company_id, sale_order_id).unwrap();
        assert_eq!(overview.statistics.purchase_order_count, 2);
        assert_eq!(overview.liquidation.total_purchased, dec!(800));
        assert!(wizard.available(&f.book).is_empty());
    }

    #[test]
    fn vehicle_is_left_alone_when_copy_is_off() {
        let f = fixture();
        let sale_order_id = sale(&f);
        let po = purchase(&f, vendor(&f, "Acme Parts"), None, at(2024, 1, 5), true);

        let mut wizard = LinkPurchaseWizard::new(&f.book, f.company_id, sale_order_id).with_copy_vehicle(false);
        wizard.select(po);
        wizard.confirm(&f.book, at(2024, 1, 8)).unwrap();

        let po = f.book.purchase_order(f.company_id, po).unwrap();
        assert_eq!(po.vehicle().plate(), Some("OLD-1"));
    }

    #[test]
    fn empty_selection_is_rejected_without_writes() {
        let f = fixture_with(LinkConfig::default().with_link_state_filter(None));
        let sale_order_id = sale(&f);
        let po = purchase(&f, vendor(&f, "Acme Parts"), None, at(2024, 1, 5), false);

        let mut wizard = LinkPurchaseWizard::new(&f.book, f.company_id, sale_order_id);
        wizard.select(po);
        wizard.deselect_all();
        let err = wizard.confirm(&f.book, at(2024, 1, 8)).unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(f.book.purchase_order(f.company_id, po).unwrap().sale_order_id(), None);
        assert!(f.audit.all().is_empty());
    }

    #[test]
    fn orders_linked_elsewhere_are_not_taken_over() {
        let f = fixture();
        let first_sale = sale_named(&f, "S00007");
        let second_sale = sale_named(&f, "S00008");
        let po = purchase(&f, vendor(&f, "Acme Parts"), None, at(2024, 1, 5), true);
        f.book
            .set_purchase_sale_link(f.company_id, po, Some(first_sale), at(2024, 1, 6))
            .unwrap();
        let notes_before = f.audit.all().len();

        let mut wizard = LinkPurchaseWizard::new(&f.book, f.company_id, second_sale);
        assert!(wizard.available(&f.book).is_empty());
        wizard.select(po);
        let err = wizard.confirm(&f.book, at(2024, 1, 8)).unwrap_err();

        assert!(matches!(err, ServiceError::Validation(ref msg) if msg.contains("P00001")));
        let po = f.book.purchase_order(f.company_id, po).unwrap();
        assert_eq!(po.sale_order_id(), Some(first_sale));
        assert_eq!(f.audit.all().len(), notes_before);
        let first = f.book.overview(f.company_id, first_sale).unwrap();
        assert_eq!(first.liquidation.total_purchased, dec!(400));
        let second = f.book.overview(f.company_id, second_sale).unwrap();
        assert_eq!(second.statistics.purchase_order_count, 0);
    }
}
