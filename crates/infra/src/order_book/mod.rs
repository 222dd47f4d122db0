//! The document book: every write to sale orders, purchase orders and invoices
//! goes through here.
//!
//! After applying a command the book updates its sale-order link index and
//! recomputes every sale order whose derived figures may have changed, so reads
//! always see figures consistent with the current documents.

mod invoices;
mod purchases;
mod recompute;
mod sales;

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use orderlink_core::{AggregateId, CompanyId, ExpectedVersion};
use orderlink_currency::ExchangeRates;
use orderlink_events::{AuditNote, AuditSink, DocumentKind, DocumentRef, post_best_effort};
use orderlink_invoicing::{Invoice, InvoiceId};
use orderlink_parties::{Party, PartyCommand, PartyId, PartyKind, RegisterParty};
use orderlink_products::{Product, ProductCommand, ProductId};
use orderlink_purchasing::{PurchaseOrder, PurchaseOrderId};
use orderlink_sales::{SalesOrder, SalesOrderId};

use crate::command_dispatcher::CommandDispatcher;
use crate::config::LinkConfig;
use crate::error::ServiceError;
use crate::linking::SourceLookup;
use crate::read_model::{InMemoryTenantStore, TenantStore};

pub use recompute::SaleOrderOverview;

/// Documents linked to one sale order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedDocuments {
    /// Purchase orders whose header points at the sale order.
    pub purchase_orders: BTreeSet<PurchaseOrderId>,
    /// Purchase orders with at least one line covering a line of the sale order.
    pub covering_purchase_orders: BTreeSet<PurchaseOrderId>,
    /// Invoices whose resolved source sale order is this one.
    pub invoices: BTreeSet<InvoiceId>,
}

impl LinkedDocuments {
    pub fn is_empty(&self) -> bool {
        self.purchase_orders.is_empty()
            && self.covering_purchase_orders.is_empty()
            && self.invoices.is_empty()
    }
}

/// In-process document book for all companies.
pub struct OrderBook {
    config: LinkConfig,
    rates: Arc<dyn ExchangeRates>,
    audit: Arc<dyn AuditSink>,
    parties: CommandDispatcher<PartyId, Party>,
    products: CommandDispatcher<ProductId, Product>,
    sales: CommandDispatcher<SalesOrderId, SalesOrder>,
    purchases: CommandDispatcher<PurchaseOrderId, PurchaseOrder>,
    invoices: CommandDispatcher<InvoiceId, Invoice>,
    links: InMemoryTenantStore<SalesOrderId, LinkedDocuments>,
    overviews: InMemoryTenantStore<SalesOrderId, SaleOrderOverview>,
    sequences: Mutex<HashMap<(CompanyId, &'static str), u32>>,
    /// Held across the key lookup and the registration of keyed parties.
    party_keys: Mutex<()>,
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OrderBook {
    pub fn new(config: LinkConfig, rates: Arc<dyn ExchangeRates>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            config,
            rates,
            audit,
            parties: CommandDispatcher::in_memory("parties.party"),
            products: CommandDispatcher::in_memory("products.product"),
            sales: CommandDispatcher::in_memory("sales.order"),
            purchases: CommandDispatcher::in_memory("purchasing.order"),
            invoices: CommandDispatcher::in_memory("invoicing.invoice"),
            links: InMemoryTenantStore::new(),
            overviews: InMemoryTenantStore::new(),
            sequences: Mutex::new(HashMap::new()),
            party_keys: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn rates(&self) -> &dyn ExchangeRates {
        self.rates.as_ref()
    }

    // ----- references -----

    /// Next free sale order reference (`S00001`, `S00002`, ...).
    pub fn next_sale_reference(&self, company_id: CompanyId) -> Result<String, ServiceError> {
        self.next_reference(company_id, "S", |name| self.sale_order_by_name(company_id, name).is_some())
    }

    /// Next free purchase order reference (`P00001`, `P00002`, ...).
    pub fn next_purchase_reference(&self, company_id: CompanyId) -> Result<String, ServiceError> {
        self.next_reference(company_id, "P", |name| {
            self.purchase_order_by_name(company_id, name).is_some()
        })
    }

    fn next_reference(
        &self,
        company_id: CompanyId,
        prefix: &'static str,
        taken: impl Fn(&str) -> bool,
    ) -> Result<String, ServiceError> {
        let mut sequences = self
            .sequences
            .lock()
            .map_err(|_| ServiceError::InvariantViolation("reference sequence is poisoned".to_string()))?;
        let counter = sequences.entry((company_id, prefix)).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{prefix}{:05}", *counter);
            if !taken(&candidate) {
                return Ok(candidate);
            }
        }
    }

    // ----- parties -----

    /// Register or rename a party. Party keys are unique per company.
    pub fn execute_party(&self, command: PartyCommand) -> Result<Party, ServiceError> {
        let keyed = matches!(&command, PartyCommand::RegisterParty(RegisterParty { key: Some(_), .. }));
        let _guard = if keyed { Some(self.lock_party_keys()?) } else { None };
        self.dispatch_party(command)
    }

    fn lock_party_keys(&self) -> Result<MutexGuard<'_, ()>, ServiceError> {
        self.party_keys
            .lock()
            .map_err(|_| ServiceError::InvariantViolation("party key lock is poisoned".to_string()))
    }

    /// Callers registering a keyed party must hold `party_keys`.
    fn dispatch_party(&self, command: PartyCommand) -> Result<Party, ServiceError> {
        let (company_id, party_id) = match &command {
            PartyCommand::RegisterParty(c) => (c.company_id, c.party_id),
            PartyCommand::RenameParty(c) => (c.company_id, c.party_id),
        };

        if let PartyCommand::RegisterParty(RegisterParty { key: Some(key), .. }) = &command {
            if self.party_by_key(company_id, key).is_some() {
                return Err(ServiceError::Conflict(format!("party key {key} is already used")));
            }
        }

        let out = self
            .parties
            .dispatch(company_id, party_id, ExpectedVersion::Any, command, Party::empty)?;
        Ok(out.aggregate)
    }

    pub fn party(&self, company_id: CompanyId, party_id: PartyId) -> Option<Party> {
        self.parties.load(company_id, &party_id)
    }

    pub fn party_by_key(&self, company_id: CompanyId, key: &str) -> Option<Party> {
        self.parties
            .list(company_id)
            .into_iter()
            .find(|p| p.key() == Some(key))
    }

    /// Display name of a party, `"-"` when unknown.
    pub fn party_name(&self, company_id: CompanyId, party_id: PartyId) -> String {
        self.party(company_id, party_id)
            .map(|p| p.name().to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    /// The catch-all vendor, if it was ever created.
    pub fn generic_vendor(&self, company_id: CompanyId) -> Option<Party> {
        self.party_by_key(company_id, &self.config.generic_vendor_key)
    }

    /// Find the catch-all vendor by its key, creating it on first use.
    pub fn ensure_generic_vendor(
        &self,
        company_id: CompanyId,
        occurred_at: DateTime<Utc>,
    ) -> Result<Party, ServiceError> {
        let _guard = self.lock_party_keys()?;
        if let Some(vendor) = self.generic_vendor(company_id) {
            return Ok(vendor);
        }

        let party_id = PartyId::new(AggregateId::new());
        let vendor = self.dispatch_party(PartyCommand::RegisterParty(RegisterParty {
            company_id,
            party_id,
            kind: PartyKind::Supplier,
            name: self.config.generic_vendor_name.clone(),
            key: Some(self.config.generic_vendor_key.clone()),
            occurred_at,
        }))?;

        info!(company_id = %company_id, party_id = %party_id, "generic vendor created");
        Ok(vendor)
    }

    // ----- products -----

    pub fn execute_product(&self, command: ProductCommand) -> Result<Product, ServiceError> {
        let (company_id, product_id) = match &command {
            ProductCommand::CreateProduct(c) => (c.company_id, c.product_id),
            ProductCommand::AddSupplier(c) => (c.company_id, c.product_id),
            ProductCommand::RemoveSupplier(c) => (c.company_id, c.product_id),
        };

        let out = self
            .products
            .dispatch(company_id, product_id, ExpectedVersion::Any, command, Product::empty)?;
        Ok(out.aggregate)
    }

    pub fn product(&self, company_id: CompanyId, product_id: ProductId) -> Option<Product> {
        self.products.load(company_id, &product_id)
    }

    // ----- reads -----

    pub fn sale_order(&self, company_id: CompanyId, order_id: SalesOrderId) -> Option<SalesOrder> {
        self.sales.load(company_id, &order_id)
    }

    /// All sale orders of the company, by reference.
    pub fn sale_orders(&self, company_id: CompanyId) -> Vec<SalesOrder> {
        let mut orders = self.sales.list(company_id);
        orders.sort_by(|a, b| a.name().cmp(b.name()));
        orders
    }

    pub fn purchase_order(&self, company_id: CompanyId, order_id: PurchaseOrderId) -> Option<PurchaseOrder> {
        self.purchases.load(company_id, &order_id)
    }

    /// All purchase orders of the company, by reference.
    pub fn purchase_orders(&self, company_id: CompanyId) -> Vec<PurchaseOrder> {
        let mut orders = self.purchases.list(company_id);
        orders.sort_by(|a, b| a.name().cmp(b.name()));
        orders
    }

    pub fn invoice(&self, company_id: CompanyId, invoice_id: InvoiceId) -> Option<Invoice> {
        self.invoices.load(company_id, &invoice_id)
    }

    pub fn invoices(&self, company_id: CompanyId) -> Vec<Invoice> {
        let mut invoices = self.invoices.list(company_id);
        invoices.sort_by_key(|i| i.id_typed());
        invoices
    }

    /// Sale order with exactly this reference; the oldest one if several match.
    pub fn sale_order_by_name(&self, company_id: CompanyId, name: &str) -> Option<SalesOrder> {
        self.sales
            .list(company_id)
            .into_iter()
            .filter(|o| o.name() == name)
            .min_by_key(|o| o.id_typed())
    }

    /// Purchase order with exactly this reference; the oldest one if several match.
    pub fn purchase_order_by_name(&self, company_id: CompanyId, name: &str) -> Option<PurchaseOrder> {
        self.purchases
            .list(company_id)
            .into_iter()
            .filter(|o| o.name() == name)
            .min_by_key(|o| o.id_typed())
    }

    pub fn linked_documents(&self, company_id: CompanyId, sale_order_id: SalesOrderId) -> LinkedDocuments {
        self.links.get(company_id, &sale_order_id).unwrap_or_default()
    }

    /// Purchase orders linked to the sale order through their header, by reference.
    pub fn linked_purchase_orders(
        &self,
        company_id: CompanyId,
        sale_order_id: SalesOrderId,
    ) -> Vec<PurchaseOrder> {
        let ids = self.linked_documents(company_id, sale_order_id).purchase_orders;
        self.load_purchases(company_id, &ids)
    }

    /// Purchase orders with lines covering the sale order's lines, by reference.
    pub fn covering_purchase_orders(
        &self,
        company_id: CompanyId,
        sale_order_id: SalesOrderId,
    ) -> Vec<PurchaseOrder> {
        let ids = self.linked_documents(company_id, sale_order_id).covering_purchase_orders;
        self.load_purchases(company_id, &ids)
    }

    pub fn linked_invoices(&self, company_id: CompanyId, sale_order_id: SalesOrderId) -> Vec<Invoice> {
        self.linked_documents(company_id, sale_order_id)
            .invoices
            .iter()
            .filter_map(|id| self.invoice(company_id, *id))
            .collect()
    }

    /// Sale order a purchase order is linked to.
    pub fn linked_sale_order(
        &self,
        company_id: CompanyId,
        purchase_order_id: PurchaseOrderId,
    ) -> Option<SalesOrder> {
        let sale_order_id = self.purchase_order(company_id, purchase_order_id)?.sale_order_id()?;
        self.sale_order(company_id, sale_order_id)
    }

    fn load_purchases(&self, company_id: CompanyId, ids: &BTreeSet<PurchaseOrderId>) -> Vec<PurchaseOrder> {
        let mut orders: Vec<PurchaseOrder> = ids
            .iter()
            .filter_map(|id| self.purchase_order(company_id, *id))
            .collect();
        orders.sort_by(|a, b| a.name().cmp(b.name()));
        orders
    }

    fn update_links(
        &self,
        company_id: CompanyId,
        sale_order_id: SalesOrderId,
        change: impl FnOnce(&mut LinkedDocuments),
    ) {
        let mut links = self.linked_documents(company_id, sale_order_id);
        change(&mut links);
        self.links.upsert(company_id, sale_order_id, links);
    }

    pub(crate) fn post_note(
        &self,
        company_id: CompanyId,
        sale_order_id: SalesOrderId,
        subject: impl Into<String>,
        lines: Vec<String>,
        posted_at: DateTime<Utc>,
    ) {
        let document = DocumentRef::new(DocumentKind::SaleOrder, sale_order_id.0);
        post_best_effort(
            self.audit.as_ref(),
            AuditNote::new(company_id, document, subject, lines, posted_at),
        );
    }
}

impl SourceLookup for OrderBook {
    fn sale_order_by_name(&self, company_id: CompanyId, name: &str) -> Option<SalesOrderId> {
        OrderBook::sale_order_by_name(self, company_id, name).map(|o| o.id_typed())
    }

    fn purchase_order_by_name(&self, company_id: CompanyId, name: &str) -> Option<PurchaseOrderId> {
        OrderBook::purchase_order_by_name(self, company_id, name).map(|o| o.id_typed())
    }
}
