use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use orderlink_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError};
use orderlink_events::Event;
use orderlink_parties::PartyId;

/// Product identifier (company-scoped via `company_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A vendor the product can be bought from, at a price in the vendor's terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierInfo {
    pub vendor: PartyId,
    pub price: Decimal,
}

/// Aggregate root: Product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    company_id: Option<CompanyId>,
    sku: String,
    name: String,
    suppliers: Vec<SupplierInfo>,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            company_id: None,
            sku: String::new(),
            name: String::new(),
            suppliers: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn suppliers(&self) -> &[SupplierInfo] {
        &self.suppliers
    }

    /// The first supplier in the list, if any.
    pub fn preferred_supplier(&self) -> Option<&SupplierInfo> {
        self.suppliers.first()
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddSupplier. Appended suppliers rank after existing ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddSupplier {
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub vendor: PartyId,
    pub price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveSupplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveSupplier {
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub vendor: PartyId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    AddSupplier(AddSupplier),
    RemoveSupplier(RemoveSupplier),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SupplierAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierAdded {
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub supplier: SupplierInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SupplierRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierRemoved {
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub vendor: PartyId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    SupplierAdded(SupplierAdded),
    SupplierRemoved(SupplierRemoved),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "products.product.created",
            ProductEvent::SupplierAdded(_) => "products.product.supplier_added",
            ProductEvent::SupplierRemoved(_) => "products.product.supplier_removed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::SupplierAdded(e) => e.occurred_at,
            ProductEvent::SupplierRemoved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.company_id = Some(e.company_id);
                self.sku = e.sku.clone();
                self.name = e.name.clone();
                self.suppliers.clear();
                self.created = true;
            }
            ProductEvent::SupplierAdded(e) => {
                self.suppliers.push(e.supplier.clone());
            }
            ProductEvent::SupplierRemoved(e) => {
                self.suppliers.retain(|s| s.vendor != e.vendor);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::AddSupplier(cmd) => self.handle_add_supplier(cmd),
            ProductCommand::RemoveSupplier(cmd) => self.handle_remove_supplier(cmd),
        }
    }
}

impl Product {
    fn ensure_company(&self, company_id: CompanyId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.company_id != Some(company_id) {
            return Err(DomainError::invariant("company mismatch"));
        }
        Ok(())
    }

    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn ensure_existing(&self, company_id: CompanyId, product_id: ProductId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_company(company_id)?;
        self.ensure_product_id(product_id)
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            company_id: cmd.company_id,
            product_id: cmd.product_id,
            sku: cmd.sku.trim().to_string(),
            name: cmd.name.trim().to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_supplier(&self, cmd: &AddSupplier) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.product_id)?;

        if cmd.price.is_sign_negative() {
            return Err(DomainError::validation("supplier price cannot be negative"));
        }

        if self.suppliers.iter().any(|s| s.vendor == cmd.vendor) {
            return Err(DomainError::conflict("vendor is already a supplier of this product"));
        }

        Ok(vec![ProductEvent::SupplierAdded(SupplierAdded {
            company_id: cmd.company_id,
            product_id: cmd.product_id,
            supplier: SupplierInfo {
                vendor: cmd.vendor,
                price: cmd.price,
            },
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_supplier(
        &self,
        cmd: &RemoveSupplier,
    ) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.product_id)?;

        if !self.suppliers.iter().any(|s| s.vendor == cmd.vendor) {
            return Err(DomainError::not_found());
        }

        Ok(vec![ProductEvent::SupplierRemoved(SupplierRemoved {
            company_id: cmd.company_id,
            product_id: cmd.product_id,
            vendor: cmd.vendor,
            occurred_at: cmd.occurred_at,
        })])
    }
}
