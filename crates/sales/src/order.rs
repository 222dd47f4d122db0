use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use orderlink_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, VehicleInfo};
use orderlink_currency::CurrencyCode;
use orderlink_events::Event;
use orderlink_parties::PartyId;
use orderlink_products::ProductId;

use crate::line::{SaleLine, SaleLineRef};

/// Sale order identifier (company-scoped via `company_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SalesOrderId(pub AggregateId);

impl SalesOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SalesOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Sale order lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleState {
    Draft,
    Sent,
    Sale,
    Cancel,
}

/// Aggregate root: SalesOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesOrder {
    id: SalesOrderId,
    company_id: Option<CompanyId>,
    name: String,
    customer: Option<PartyId>,
    currency: Option<CurrencyCode>,
    vehicle: VehicleInfo,
    state: SaleState,
    lines: Vec<SaleLine>,
    next_line_no: u32,
    version: u64,
    created: bool,
}

impl SalesOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: SalesOrderId) -> Self {
        Self {
            id,
            company_id: None,
            name: String::new(),
            customer: None,
            currency: None,
            vehicle: VehicleInfo::default(),
            state: SaleState::Draft,
            lines: Vec::new(),
            next_line_no: 1,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> SalesOrderId {
        self.id
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    /// Order reference, e.g. `S00012`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn customer(&self) -> Option<PartyId> {
        self.customer
    }

    pub fn currency(&self) -> Option<&CurrencyCode> {
        self.currency.as_ref()
    }

    pub fn vehicle(&self) -> &VehicleInfo {
        &self.vehicle
    }

    pub fn state(&self) -> SaleState {
        self.state
    }

    pub fn lines(&self) -> &[SaleLine] {
        &self.lines
    }

    pub fn line(&self, line_no: u32) -> Option<&SaleLine> {
        self.lines.iter().find(|l| l.line_no == line_no)
    }

    pub fn line_ref(&self, line_no: u32) -> SaleLineRef {
        SaleLineRef::new(self.id, line_no)
    }

    pub fn amount_total(&self) -> Decimal {
        self.lines.iter().map(SaleLine::subtotal).sum()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_modifiable(&self) -> bool {
        self.state != SaleState::Cancel
    }
}

impl AggregateRoot for SalesOrder {
    type Id = SalesOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateSalesOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSalesOrder {
    pub company_id: CompanyId,
    pub order_id: SalesOrderId,
    pub name: String,
    pub customer: PartyId,
    pub currency: CurrencyCode,
    #[serde(default)]
    pub vehicle: VehicleInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLine {
    pub company_id: CompanyId,
    pub order_id: SalesOrderId,
    pub product_id: ProductId,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateLineQuantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLineQuantity {
    pub company_id: CompanyId,
    pub order_id: SalesOrderId,
    pub line_no: u32,
    pub quantity: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveLine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLine {
    pub company_id: CompanyId,
    pub order_id: SalesOrderId,
    pub line_no: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateVehicle. Replaces all four fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateVehicle {
    pub company_id: CompanyId,
    pub order_id: SalesOrderId,
    pub vehicle: VehicleInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkSent {
    pub company_id: CompanyId,
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmOrder {
    pub company_id: CompanyId,
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub company_id: CompanyId,
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesOrderCommand {
    CreateSalesOrder(CreateSalesOrder),
    AddLine(AddLine),
    UpdateLineQuantity(UpdateLineQuantity),
    RemoveLine(RemoveLine),
    UpdateVehicle(UpdateVehicle),
    MarkSent(MarkSent),
    ConfirmOrder(ConfirmOrder),
    CancelOrder(CancelOrder),
}

impl SalesOrderCommand {
    pub fn order_id(&self) -> SalesOrderId {
        match self {
            SalesOrderCommand::CreateSalesOrder(c) => c.order_id,
            SalesOrderCommand::AddLine(c) => c.order_id,
            SalesOrderCommand::UpdateLineQuantity(c) => c.order_id,
            SalesOrderCommand::RemoveLine(c) => c.order_id,
            SalesOrderCommand::UpdateVehicle(c) => c.order_id,
            SalesOrderCommand::MarkSent(c) => c.order_id,
            SalesOrderCommand::ConfirmOrder(c) => c.order_id,
            SalesOrderCommand::CancelOrder(c) => c.order_id,
        }
    }

    pub fn company_id(&self) -> CompanyId {
        match self {
            SalesOrderCommand::CreateSalesOrder(c) => c.company_id,
            SalesOrderCommand::AddLine(c) => c.company_id,
            SalesOrderCommand::UpdateLineQuantity(c) => c.company_id,
            SalesOrderCommand::RemoveLine(c) => c.company_id,
            SalesOrderCommand::UpdateVehicle(c) => c.company_id,
            SalesOrderCommand::MarkSent(c) => c.company_id,
            SalesOrderCommand::ConfirmOrder(c) => c.company_id,
            SalesOrderCommand::CancelOrder(c) => c.company_id,
        }
    }
}

/// Event: SalesOrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrderCreated {
    pub company_id: CompanyId,
    pub order_id: SalesOrderId,
    pub name: String,
    pub customer: PartyId,
    pub currency: CurrencyCode,
    pub vehicle: VehicleInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAdded {
    pub company_id: CompanyId,
    pub order_id: SalesOrderId,
    pub line: SaleLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineQuantityUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineQuantityUpdated {
    pub company_id: CompanyId,
    pub order_id: SalesOrderId,
    pub line_no: u32,
    pub quantity: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRemoved {
    pub company_id: CompanyId,
    pub order_id: SalesOrderId,
    pub line_no: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: VehicleUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleUpdated {
    pub company_id: CompanyId,
    pub order_id: SalesOrderId,
    pub vehicle: VehicleInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSent {
    pub company_id: CompanyId,
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderConfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmed {
    pub company_id: CompanyId,
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub company_id: CompanyId,
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesOrderEvent {
    SalesOrderCreated(SalesOrderCreated),
    LineAdded(LineAdded),
    LineQuantityUpdated(LineQuantityUpdated),
    LineRemoved(LineRemoved),
    VehicleUpdated(VehicleUpdated),
    OrderSent(OrderSent),
    OrderConfirmed(OrderConfirmed),
    OrderCancelled(OrderCancelled),
}

impl Event for SalesOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SalesOrderEvent::SalesOrderCreated(_) => "sales.order.created",
            SalesOrderEvent::LineAdded(_) => "sales.order.line_added",
            SalesOrderEvent::LineQuantityUpdated(_) => "sales.order.line_quantity_updated",
            SalesOrderEvent::LineRemoved(_) => "sales.order.line_removed",
            SalesOrderEvent::VehicleUpdated(_) => "sales.order.vehicle_updated",
            SalesOrderEvent::OrderSent(_) => "sales.order.sent",
            SalesOrderEvent::OrderConfirmed(_) => "sales.order.confirmed",
            SalesOrderEvent::OrderCancelled(_) => "sales.order.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SalesOrderEvent::SalesOrderCreated(e) => e.occurred_at,
            SalesOrderEvent::LineAdded(e) => e.occurred_at,
            SalesOrderEvent::LineQuantityUpdated(e) => e.occurred_at,
            SalesOrderEvent::LineRemoved(e) => e.occurred_at,
            SalesOrderEvent::VehicleUpdated(e) => e.occurred_at,
            SalesOrderEvent::OrderSent(e) => e.occurred_at,
            SalesOrderEvent::OrderConfirmed(e) => e.occurred_at,
            SalesOrderEvent::OrderCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for SalesOrder {
    type Command = SalesOrderCommand;
    type Event = SalesOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SalesOrderEvent::SalesOrderCreated(e) => {
                self.id = e.order_id;
                self.company_id = Some(e.company_id);
                self.name = e.name.clone();
                self.customer = Some(e.customer);
                self.currency = Some(e.currency.clone());
                self.vehicle = e.vehicle.clone();
                self.state = SaleState::Draft;
                self.lines.clear();
                self.next_line_no = 1;
                self.created = true;
            }
            SalesOrderEvent::LineAdded(e) => {
                self.next_line_no = self.next_line_no.max(e.line.line_no + 1);
                self.lines.push(e.line.clone());
            }
            SalesOrderEvent::LineQuantityUpdated(e) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.line_no == e.line_no) {
                    line.quantity = e.quantity;
                }
            }
            SalesOrderEvent::LineRemoved(e) => {
                self.lines.retain(|l| l.line_no != e.line_no);
            }
            SalesOrderEvent::VehicleUpdated(e) => {
                self.vehicle = e.vehicle.clone();
            }
            SalesOrderEvent::OrderSent(_) => {
                self.state = SaleState::Sent;
            }
            SalesOrderEvent::OrderConfirmed(_) => {
                self.state = SaleState::Sale;
            }
            SalesOrderEvent::OrderCancelled(_) => {
                self.state = SaleState::Cancel;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SalesOrderCommand::CreateSalesOrder(cmd) => self.handle_create(cmd),
            SalesOrderCommand::AddLine(cmd) => self.handle_add_line(cmd),
            SalesOrderCommand::UpdateLineQuantity(cmd) => self.handle_update_quantity(cmd),
            SalesOrderCommand::RemoveLine(cmd) => self.handle_remove_line(cmd),
            SalesOrderCommand::UpdateVehicle(cmd) => self.handle_update_vehicle(cmd),
            SalesOrderCommand::MarkSent(cmd) => self.handle_mark_sent(cmd),
            SalesOrderCommand::ConfirmOrder(cmd) => self.handle_confirm(cmd),
            SalesOrderCommand::CancelOrder(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl SalesOrder {
    fn ensure_company(&self, company_id: CompanyId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.company_id != Some(company_id) {
            return Err(DomainError::invariant("company mismatch"));
        }
        Ok(())
    }

    fn ensure_order_id(&self, order_id: SalesOrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_existing(
        &self,
        company_id: CompanyId,
        order_id: SalesOrderId,
    ) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_company(company_id)?;
        self.ensure_order_id(order_id)
    }

    fn ensure_modifiable(&self) -> Result<(), DomainError> {
        if !self.is_modifiable() {
            return Err(DomainError::invariant("cannot modify a cancelled order"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateSalesOrder) -> Result<Vec<SalesOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("sales order already exists"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("order reference cannot be empty"));
        }

        Ok(vec![SalesOrderEvent::SalesOrderCreated(SalesOrderCreated {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            name: cmd.name.trim().to_string(),
            customer: cmd.customer,
            currency: cmd.currency.clone(),
            vehicle: cmd.vehicle.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.order_id)?;
        self.ensure_modifiable()?;

        if cmd.quantity.is_sign_negative() {
            return Err(DomainError::validation("quantity cannot be negative"));
        }

        if cmd.unit_price.is_sign_negative() {
            return Err(DomainError::validation("unit_price cannot be negative"));
        }

        Ok(vec![SalesOrderEvent::LineAdded(LineAdded {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            line: SaleLine {
                line_no: self.next_line_no,
                product_id: cmd.product_id,
                description: cmd.description.clone(),
                quantity: cmd.quantity,
                unit_price: cmd.unit_price,
            },
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_quantity(
        &self,
        cmd: &UpdateLineQuantity,
    ) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.order_id)?;
        self.ensure_modifiable()?;

        if self.line(cmd.line_no).is_none() {
            return Err(DomainError::not_found());
        }

        if cmd.quantity.is_sign_negative() {
            return Err(DomainError::validation("quantity cannot be negative"));
        }

        Ok(vec![SalesOrderEvent::LineQuantityUpdated(LineQuantityUpdated {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            line_no: cmd.line_no,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_line(&self, cmd: &RemoveLine) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.order_id)?;

        if !matches!(self.state, SaleState::Draft | SaleState::Sent) {
            return Err(DomainError::invariant(
                "lines can only be removed from draft or sent orders",
            ));
        }

        if self.line(cmd.line_no).is_none() {
            return Err(DomainError::not_found());
        }

        Ok(vec![SalesOrderEvent::LineRemoved(LineRemoved {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            line_no: cmd.line_no,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_vehicle(
        &self,
        cmd: &UpdateVehicle,
    ) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.order_id)?;

        if cmd.vehicle == self.vehicle {
            return Ok(vec![]);
        }

        Ok(vec![SalesOrderEvent::VehicleUpdated(VehicleUpdated {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            vehicle: cmd.vehicle.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_sent(&self, cmd: &MarkSent) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.order_id)?;

        if self.state != SaleState::Draft {
            return Err(DomainError::invariant("only draft orders can be sent"));
        }

        Ok(vec![SalesOrderEvent::OrderSent(OrderSent {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm(&self, cmd: &ConfirmOrder) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.order_id)?;

        if !matches!(self.state, SaleState::Draft | SaleState::Sent) {
            return Err(DomainError::invariant(
                "only draft or sent orders can be confirmed",
            ));
        }

        if self.lines.is_empty() {
            return Err(DomainError::validation("cannot confirm order without lines"));
        }

        Ok(vec![SalesOrderEvent::OrderConfirmed(OrderConfirmed {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelOrder) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.order_id)?;

        if self.state == SaleState::Cancel {
            return Err(DomainError::conflict("order is already cancelled"));
        }

        Ok(vec![SalesOrderEvent::OrderCancelled(OrderCancelled {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
