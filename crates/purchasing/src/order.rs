use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use orderlink_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, VehicleInfo};
use orderlink_currency::CurrencyCode;
use orderlink_events::Event;
use orderlink_parties::PartyId;
use orderlink_products::ProductId;
use orderlink_sales::{SaleLineRef, SalesOrderId};

use crate::deadline::add_business_days;
use crate::line::{PurchaseLine, PurchaseLineRef};

/// Purchase order identifier (company-scoped via `company_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseOrderId(pub AggregateId);

impl PurchaseOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PurchaseOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Purchase order lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseState {
    Draft,
    Sent,
    ToApprove,
    Purchase,
    Done,
    Cancel,
}

impl PurchaseState {
    pub fn as_str(self) -> &'static str {
        match self {
            PurchaseState::Draft => "draft",
            PurchaseState::Sent => "sent",
            PurchaseState::ToApprove => "to_approve",
            PurchaseState::Purchase => "purchase",
            PurchaseState::Done => "done",
            PurchaseState::Cancel => "cancel",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PurchaseState::Draft => "RFQ",
            PurchaseState::Sent => "RFQ Sent",
            PurchaseState::ToApprove => "To Approve",
            PurchaseState::Purchase => "Purchase Order",
            PurchaseState::Done => "Locked",
            PurchaseState::Cancel => "Cancelled",
        }
    }

    /// `purchase` or `done`: the order counts towards purchased totals.
    pub fn is_confirmed(self) -> bool {
        matches!(self, PurchaseState::Purchase | PurchaseState::Done)
    }
}

/// Aggregate root: PurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    company_id: Option<CompanyId>,
    name: String,
    vendor: Option<PartyId>,
    partner_ref: Option<String>,
    currency: Option<CurrencyCode>,
    date_order: Option<DateTime<Utc>>,
    state: PurchaseState,
    vehicle: VehicleInfo,
    sale_order_id: Option<SalesOrderId>,
    lines: Vec<PurchaseLine>,
    next_line_no: u32,
    deadline: Option<NaiveDate>,
    version: u64,
    created: bool,
}

impl PurchaseOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PurchaseOrderId) -> Self {
        Self {
            id,
            company_id: None,
            name: String::new(),
            vendor: None,
            partner_ref: None,
            currency: None,
            date_order: None,
            state: PurchaseState::Draft,
            vehicle: VehicleInfo::default(),
            sale_order_id: None,
            lines: Vec::new(),
            next_line_no: 1,
            deadline: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    /// Order reference, e.g. `P00007`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vendor(&self) -> Option<PartyId> {
        self.vendor
    }

    /// Vendor's own reference for the order.
    pub fn partner_ref(&self) -> Option<&str> {
        self.partner_ref.as_deref()
    }

    pub fn currency(&self) -> Option<&CurrencyCode> {
        self.currency.as_ref()
    }

    pub fn date_order(&self) -> Option<DateTime<Utc>> {
        self.date_order
    }

    pub fn state(&self) -> PurchaseState {
        self.state
    }

    pub fn vehicle(&self) -> &VehicleInfo {
        &self.vehicle
    }

    pub fn sale_order_id(&self) -> Option<SalesOrderId> {
        self.sale_order_id
    }

    pub fn lines(&self) -> &[PurchaseLine] {
        &self.lines
    }

    pub fn line(&self, line_no: u32) -> Option<&PurchaseLine> {
        self.lines.iter().find(|l| l.line_no == line_no)
    }

    pub fn line_ref(&self, line_no: u32) -> PurchaseLineRef {
        PurchaseLineRef::new(self.id, line_no)
    }

    /// Planned receipt deadline, set on confirmation.
    pub fn deadline(&self) -> Option<NaiveDate> {
        self.deadline
    }

    pub fn amount_total(&self) -> Decimal {
        self.lines.iter().map(PurchaseLine::subtotal).sum()
    }

    pub fn is_confirmed(&self) -> bool {
        self.state.is_confirmed()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    fn lines_editable(&self) -> bool {
        !matches!(self.state, PurchaseState::Done | PurchaseState::Cancel)
    }
}

impl AggregateRoot for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreatePurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePurchaseOrder {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    pub name: String,
    pub vendor: PartyId,
    pub partner_ref: Option<String>,
    pub currency: CurrencyCode,
    pub date_order: DateTime<Utc>,
    pub sale_order_id: Option<SalesOrderId>,
    #[serde(default)]
    pub vehicle: VehicleInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLine {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    pub product_id: ProductId,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub sale_line: Option<SaleLineRef>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateLineQuantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLineQuantity {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    pub line_no: u32,
    pub quantity: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetSaleOrder. `None` unlinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetSaleOrder {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    pub sale_order_id: Option<SalesOrderId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateVehicle. Replaces all four fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateVehicle {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    pub vehicle: VehicleInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ClearSaleLineReference. Issued when the sale line is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearSaleLineReference {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    pub sale_line: SaleLineRef,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkSent {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RequestApproval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestApproval {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmOrder {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    /// Working days between confirmation and the receipt deadline.
    pub deadline_business_days: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: LockOrder (`purchase` to `done`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockOrder {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderCommand {
    CreatePurchaseOrder(CreatePurchaseOrder),
    AddLine(AddLine),
    UpdateLineQuantity(UpdateLineQuantity),
    SetSaleOrder(SetSaleOrder),
    UpdateVehicle(UpdateVehicle),
    ClearSaleLineReference(ClearSaleLineReference),
    MarkSent(MarkSent),
    RequestApproval(RequestApproval),
    ConfirmOrder(ConfirmOrder),
    LockOrder(LockOrder),
    CancelOrder(CancelOrder),
}

impl PurchaseOrderCommand {
    pub fn order_id(&self) -> PurchaseOrderId {
        match self {
            PurchaseOrderCommand::CreatePurchaseOrder(c) => c.order_id,
            PurchaseOrderCommand::AddLine(c) => c.order_id,
            PurchaseOrderCommand::UpdateLineQuantity(c) => c.order_id,
            PurchaseOrderCommand::SetSaleOrder(c) => c.order_id,
            PurchaseOrderCommand::UpdateVehicle(c) => c.order_id,
            PurchaseOrderCommand::ClearSaleLineReference(c) => c.order_id,
            PurchaseOrderCommand::MarkSent(c) => c.order_id,
            PurchaseOrderCommand::RequestApproval(c) => c.order_id,
            PurchaseOrderCommand::ConfirmOrder(c) => c.order_id,
            PurchaseOrderCommand::LockOrder(c) => c.order_id,
            PurchaseOrderCommand::CancelOrder(c) => c.order_id,
        }
    }

    pub fn company_id(&self) -> CompanyId {
        match self {
            PurchaseOrderCommand::CreatePurchaseOrder(c) => c.company_id,
            PurchaseOrderCommand::AddLine(c) => c.company_id,
            PurchaseOrderCommand::UpdateLineQuantity(c) => c.company_id,
            PurchaseOrderCommand::SetSaleOrder(c) => c.company_id,
            PurchaseOrderCommand::UpdateVehicle(c) => c.company_id,
            PurchaseOrderCommand::ClearSaleLineReference(c) => c.company_id,
            PurchaseOrderCommand::MarkSent(c) => c.company_id,
            PurchaseOrderCommand::RequestApproval(c) => c.company_id,
            PurchaseOrderCommand::ConfirmOrder(c) => c.company_id,
            PurchaseOrderCommand::LockOrder(c) => c.company_id,
            PurchaseOrderCommand::CancelOrder(c) => c.company_id,
        }
    }
}

/// Event: PurchaseOrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderCreated {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    pub name: String,
    pub vendor: PartyId,
    pub partner_ref: Option<String>,
    pub currency: CurrencyCode,
    pub date_order: DateTime<Utc>,
    pub sale_order_id: Option<SalesOrderId>,
    pub vehicle: VehicleInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAdded {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    pub line: PurchaseLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineQuantityUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineQuantityUpdated {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    pub line_no: u32,
    pub quantity: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SaleOrderLinkChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleOrderLinkChanged {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    pub previous: Option<SalesOrderId>,
    pub current: Option<SalesOrderId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: VehicleUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleUpdated {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    pub vehicle: VehicleInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SaleLineReferenceCleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLineReferenceCleared {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    pub sale_line: SaleLineRef,
    pub line_nos: Vec<u32>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSent {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ApprovalRequested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequested {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderConfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmed {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    pub deadline: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderLocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLocked {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub company_id: CompanyId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderEvent {
    PurchaseOrderCreated(PurchaseOrderCreated),
    LineAdded(LineAdded),
    LineQuantityUpdated(LineQuantityUpdated),
    SaleOrderLinkChanged(SaleOrderLinkChanged),
    VehicleUpdated(VehicleUpdated),
    SaleLineReferenceCleared(SaleLineReferenceCleared),
    OrderSent(OrderSent),
    ApprovalRequested(ApprovalRequested),
    OrderConfirmed(OrderConfirmed),
    OrderLocked(OrderLocked),
    OrderCancelled(OrderCancelled),
}

impl Event for PurchaseOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(_) => "purchasing.order.created",
            PurchaseOrderEvent::LineAdded(_) => "purchasing.order.line_added",
            PurchaseOrderEvent::LineQuantityUpdated(_) => "purchasing.order.line_quantity_updated",
            PurchaseOrderEvent::SaleOrderLinkChanged(_) => "purchasing.order.sale_link_changed",
            PurchaseOrderEvent::VehicleUpdated(_) => "purchasing.order.vehicle_updated",
            PurchaseOrderEvent::SaleLineReferenceCleared(_) => {
                "purchasing.order.sale_line_reference_cleared"
            }
            PurchaseOrderEvent::OrderSent(_) => "purchasing.order.sent",
            PurchaseOrderEvent::ApprovalRequested(_) => "purchasing.order.approval_requested",
            PurchaseOrderEvent::OrderConfirmed(_) => "purchasing.order.confirmed",
            PurchaseOrderEvent::OrderLocked(_) => "purchasing.order.locked",
            PurchaseOrderEvent::OrderCancelled(_) => "purchasing.order.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => e.occurred_at,
            PurchaseOrderEvent::LineAdded(e) => e.occurred_at,
            PurchaseOrderEvent::LineQuantityUpdated(e) => e.occurred_at,
            PurchaseOrderEvent::SaleOrderLinkChanged(e) => e.occurred_at,
            PurchaseOrderEvent::VehicleUpdated(e) => e.occurred_at,
            PurchaseOrderEvent::SaleLineReferenceCleared(e) => e.occurred_at,
            PurchaseOrderEvent::OrderSent(e) => e.occurred_at,
            PurchaseOrderEvent::ApprovalRequested(e) => e.occurred_at,
            PurchaseOrderEvent::OrderConfirmed(e) => e.occurred_at,
            PurchaseOrderEvent::OrderLocked(e) => e.occurred_at,
            PurchaseOrderEvent::OrderCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PurchaseOrder {
    type Command = PurchaseOrderCommand;
    type Event = PurchaseOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => {
                self.id = e.order_id;
                self.company_id = Some(e.company_id);
                self.name = e.name.clone();
                self.vendor = Some(e.vendor);
                self.partner_ref = e.partner_ref.clone();
                self.currency = Some(e.currency.clone());
                self.date_order = Some(e.date_order);
                self.sale_order_id = e.sale_order_id;
                self.vehicle = e.vehicle.clone();
                self.state = PurchaseState::Draft;
                self.lines.clear();
                self.next_line_no = 1;
                self.created = true;
            }
            PurchaseOrderEvent::LineAdded(e) => {
                self.next_line_no = self.next_line_no.max(e.line.line_no + 1);
                self.lines.push(e.line.clone());
            }
            PurchaseOrderEvent::LineQuantityUpdated(e) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.line_no == e.line_no) {
                    line.quantity = e.quantity;
                }
            }
            PurchaseOrderEvent::SaleOrderLinkChanged(e) => {
                self.sale_order_id = e.current;
            }
            PurchaseOrderEvent::VehicleUpdated(e) => {
                self.vehicle = e.vehicle.clone();
            }
            PurchaseOrderEvent::SaleLineReferenceCleared(e) => {
                for line in &mut self.lines {
                    if e.line_nos.contains(&line.line_no) {
                        line.sale_line = None;
                    }
                }
            }
            PurchaseOrderEvent::OrderSent(_) => {
                self.state = PurchaseState::Sent;
            }
            PurchaseOrderEvent::ApprovalRequested(_) => {
                self.state = PurchaseState::ToApprove;
            }
            PurchaseOrderEvent::OrderConfirmed(e) => {
                self.state = PurchaseState::Purchase;
                self.deadline = Some(e.deadline);
            }
            PurchaseOrderEvent::OrderLocked(_) => {
                self.state = PurchaseState::Done;
            }
            PurchaseOrderEvent::OrderCancelled(_) => {
                self.state = PurchaseState::Cancel;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PurchaseOrderCommand::CreatePurchaseOrder(cmd) => self.handle_create(cmd),
            PurchaseOrderCommand::AddLine(cmd) => self.handle_add_line(cmd),
            PurchaseOrderCommand::UpdateLineQuantity(cmd) => self.handle_update_quantity(cmd),
            PurchaseOrderCommand::SetSaleOrder(cmd) => self.handle_set_sale_order(cmd),
            PurchaseOrderCommand::UpdateVehicle(cmd) => self.handle_update_vehicle(cmd),
            PurchaseOrderCommand::ClearSaleLineReference(cmd) => self.handle_clear_sale_line(cmd),
            PurchaseOrderCommand::MarkSent(cmd) => self.handle_mark_sent(cmd),
            PurchaseOrderCommand::RequestApproval(cmd) => self.handle_request_approval(cmd),
            PurchaseOrderCommand::ConfirmOrder(cmd) => self.handle_confirm(cmd),
            PurchaseOrderCommand::LockOrder(cmd) => self.handle_lock(cmd),
            PurchaseOrderCommand::CancelOrder(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl PurchaseOrder {
    fn ensure_company(&self, company_id: CompanyId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.company_id != Some(company_id) {
            return Err(DomainError::invariant("company mismatch"));
        }
        Ok(())
    }

    fn ensure_order_id(&self, order_id: PurchaseOrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_existing(
        &self,
        company_id: CompanyId,
        order_id: PurchaseOrderId,
    ) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_company(company_id)?;
        self.ensure_order_id(order_id)
    }

    fn handle_create(
        &self,
        cmd: &CreatePurchaseOrder,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("purchase order already exists"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("order reference cannot be empty"));
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderCreated(PurchaseOrderCreated {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            name: cmd.name.trim().to_string(),
            vendor: cmd.vendor,
            partner_ref: cmd
                .partner_ref
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
            currency: cmd.currency.clone(),
            date_order: cmd.date_order,
            sale_order_id: cmd.sale_order_id,
            vehicle: cmd.vehicle.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.order_id)?;

        if !self.lines_editable() {
            return Err(DomainError::invariant(
                "cannot modify a locked or cancelled purchase order",
            ));
        }

        if cmd.quantity.is_sign_negative() {
            return Err(DomainError::validation("quantity cannot be negative"));
        }

        if cmd.unit_price.is_sign_negative() {
            return Err(DomainError::validation("unit_price cannot be negative"));
        }

        Ok(vec![PurchaseOrderEvent::LineAdded(LineAdded {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            line: PurchaseLine {
                line_no: self.next_line_no,
                product_id: cmd.product_id,
                description: cmd.description.clone(),
                quantity: cmd.quantity,
                unit_price: cmd.unit_price,
                sale_line: cmd.sale_line,
            },
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_quantity(
        &self,
        cmd: &UpdateLineQuantity,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.order_id)?;

        if !self.lines_editable() {
            return Err(DomainError::invariant(
                "cannot modify a locked or cancelled purchase order",
            ));
        }

        if self.line(cmd.line_no).is_none() {
            return Err(DomainError::not_found());
        }

        if cmd.quantity.is_sign_negative() {
            return Err(DomainError::validation("quantity cannot be negative"));
        }

        Ok(vec![PurchaseOrderEvent::LineQuantityUpdated(LineQuantityUpdated {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            line_no: cmd.line_no,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_sale_order(
        &self,
        cmd: &SetSaleOrder,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.order_id)?;

        if self.sale_order_id == cmd.sale_order_id {
            return Ok(vec![]);
        }

        Ok(vec![PurchaseOrderEvent::SaleOrderLinkChanged(SaleOrderLinkChanged {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            previous: self.sale_order_id,
            current: cmd.sale_order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_vehicle(
        &self,
        cmd: &UpdateVehicle,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.order_id)?;

        if cmd.vehicle == self.vehicle {
            return Ok(vec![]);
        }

        Ok(vec![PurchaseOrderEvent::VehicleUpdated(VehicleUpdated {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            vehicle: cmd.vehicle.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_clear_sale_line(
        &self,
        cmd: &ClearSaleLineReference,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.order_id)?;

        let line_nos: Vec<u32> = self
            .lines
            .iter()
            .filter(|l| l.sale_line == Some(cmd.sale_line))
            .map(|l| l.line_no)
            .collect();

        if line_nos.is_empty() {
            return Ok(vec![]);
        }

        Ok(vec![PurchaseOrderEvent::SaleLineReferenceCleared(
            SaleLineReferenceCleared {
                company_id: cmd.company_id,
                order_id: cmd.order_id,
                sale_line: cmd.sale_line,
                line_nos,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_mark_sent(&self, cmd: &MarkSent) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.order_id)?;

        if self.state != PurchaseState::Draft {
            return Err(DomainError::invariant("only draft requests can be sent"));
        }

        Ok(vec![PurchaseOrderEvent::OrderSent(OrderSent {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_request_approval(
        &self,
        cmd: &RequestApproval,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.order_id)?;

        if !matches!(self.state, PurchaseState::Draft | PurchaseState::Sent) {
            return Err(DomainError::invariant(
                "only draft or sent requests can be submitted for approval",
            ));
        }

        Ok(vec![PurchaseOrderEvent::ApprovalRequested(ApprovalRequested {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm(&self, cmd: &ConfirmOrder) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.order_id)?;

        if !matches!(
            self.state,
            PurchaseState::Draft | PurchaseState::Sent | PurchaseState::ToApprove
        ) {
            return Err(DomainError::invariant(
                "only requests for quotation can be confirmed",
            ));
        }

        if self.lines.is_empty() {
            return Err(DomainError::validation(
                "cannot confirm purchase order without lines",
            ));
        }

        Ok(vec![PurchaseOrderEvent::OrderConfirmed(OrderConfirmed {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            deadline: add_business_days(
                cmd.occurred_at.date_naive(),
                cmd.deadline_business_days,
            ),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_lock(&self, cmd: &LockOrder) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.order_id)?;

        if self.state != PurchaseState::Purchase {
            return Err(DomainError::invariant("only confirmed orders can be locked"));
        }

        Ok(vec![PurchaseOrderEvent::OrderLocked(OrderLocked {
            company_id: cmd.company_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelOrder) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.order_id)?;

        match self.state {
            PurchaseState::Cancel => Err(DomainError::conflict("order is already cancelled")),
            PurchaseState::Done => Err(DomainError::invariant(
                "locked orders cannot be cancelled",
            )),
            _ => Ok(vec![PurchaseOrderEvent::OrderCancelled(OrderCancelled {
                company_id: cmd.company_id,
                order_id: cmd.order_id,
                occurred_at: cmd.occurred_at,
            })]),
        }
    }
}
