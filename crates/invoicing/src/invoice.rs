use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use orderlink_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, VehicleInfo};
use orderlink_currency::CurrencyCode;
use orderlink_events::Event;
use orderlink_parties::PartyId;
use orderlink_products::ProductId;
use orderlink_purchasing::{PurchaseLineRef, PurchaseOrderId};
use orderlink_sales::{SaleLineRef, SalesOrderId};

/// Invoice identifier (company-scoped via `company_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub AggregateId);

impl InvoiceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Kind of accounting move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveType {
    /// Customer invoice.
    OutInvoice,
    /// Customer credit note.
    OutRefund,
    /// Vendor bill.
    InInvoice,
    /// Vendor credit note.
    InRefund,
}

impl MoveType {
    pub fn is_customer(self) -> bool {
        matches!(self, MoveType::OutInvoice | MoveType::OutRefund)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceState {
    Draft,
    Posted,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub line_no: u32,
    pub product_id: Option<ProductId>,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Sale lines this line invoices (customer invoices).
    #[serde(default)]
    pub sale_lines: Vec<SaleLineRef>,
    /// Purchase line this line bills (vendor bills).
    pub purchase_line: Option<PurchaseLineRef>,
}

impl InvoiceLine {
    pub fn subtotal(&self) -> Decimal {
        self.quantity * self.unit_price
    }
}

/// Line data supplied by commands; the aggregate assigns line numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLineInput {
    pub product_id: Option<ProductId>,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[serde(default)]
    pub sale_lines: Vec<SaleLineRef>,
    pub purchase_line: Option<PurchaseLineRef>,
}

/// Aggregate root: Invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    id: InvoiceId,
    company_id: Option<CompanyId>,
    move_type: MoveType,
    partner: Option<PartyId>,
    currency: Option<CurrencyCode>,
    invoice_date: Option<NaiveDate>,
    date: Option<NaiveDate>,
    invoice_origin: Option<String>,
    state: InvoiceState,
    lines: Vec<InvoiceLine>,
    vehicle: VehicleInfo,
    sale_order_id: Option<SalesOrderId>,
    purchase_order_id: Option<PurchaseOrderId>,
    version: u64,
    created: bool,
}

impl Invoice {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InvoiceId) -> Self {
        Self {
            id,
            company_id: None,
            move_type: MoveType::OutInvoice,
            partner: None,
            currency: None,
            invoice_date: None,
            date: None,
            invoice_origin: None,
            state: InvoiceState::Draft,
            lines: Vec::new(),
            vehicle: VehicleInfo::default(),
            sale_order_id: None,
            purchase_order_id: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn move_type(&self) -> MoveType {
        self.move_type
    }

    pub fn partner(&self) -> Option<PartyId> {
        self.partner
    }

    pub fn currency(&self) -> Option<&CurrencyCode> {
        self.currency.as_ref()
    }

    pub fn invoice_date(&self) -> Option<NaiveDate> {
        self.invoice_date
    }

    /// Accounting date.
    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// Date used for currency conversion: invoice date, else accounting date.
    pub fn conversion_date(&self) -> Option<NaiveDate> {
        self.invoice_date.or(self.date)
    }

    /// Free-text origin recorded on the invoice (usually an order reference).
    pub fn invoice_origin(&self) -> Option<&str> {
        self.invoice_origin.as_deref()
    }

    pub fn state(&self) -> InvoiceState {
        self.state
    }

    pub fn is_posted(&self) -> bool {
        self.state == InvoiceState::Posted
    }

    pub fn lines(&self) -> &[InvoiceLine] {
        &self.lines
    }

    pub fn vehicle(&self) -> &VehicleInfo {
        &self.vehicle
    }

    pub fn sale_order_id(&self) -> Option<SalesOrderId> {
        self.sale_order_id
    }

    pub fn purchase_order_id(&self) -> Option<PurchaseOrderId> {
        self.purchase_order_id
    }

    pub fn amount_total(&self) -> Decimal {
        self.lines.iter().map(InvoiceLine::subtotal).sum()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInvoice {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub move_type: MoveType,
    pub partner: PartyId,
    pub currency: CurrencyCode,
    pub invoice_date: Option<NaiveDate>,
    pub date: NaiveDate,
    pub invoice_origin: Option<String>,
    pub lines: Vec<InvoiceLineInput>,
    #[serde(default)]
    pub vehicle: VehicleInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLine {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub line: InvoiceLineInput,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetOrigin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetOrigin {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub invoice_origin: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateVehicle (manual override).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateVehicle {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub vehicle: VehicleInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ResolveSources.
///
/// Carries the orders found by the linker and the vehicle data of the preferred
/// source. Vehicle fields already set on the invoice are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveSources {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub sale_order_id: Option<SalesOrderId>,
    pub purchase_order_id: Option<PurchaseOrderId>,
    pub source_vehicle: Option<VehicleInfo>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PostInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostInvoice {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelInvoice {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceCommand {
    CreateInvoice(CreateInvoice),
    AddLine(AddLine),
    SetOrigin(SetOrigin),
    UpdateVehicle(UpdateVehicle),
    ResolveSources(ResolveSources),
    PostInvoice(PostInvoice),
    CancelInvoice(CancelInvoice),
}

impl InvoiceCommand {
    pub fn invoice_id(&self) -> InvoiceId {
        match self {
            InvoiceCommand::CreateInvoice(c) => c.invoice_id,
            InvoiceCommand::AddLine(c) => c.invoice_id,
            InvoiceCommand::SetOrigin(c) => c.invoice_id,
            InvoiceCommand::UpdateVehicle(c) => c.invoice_id,
            InvoiceCommand::ResolveSources(c) => c.invoice_id,
            InvoiceCommand::PostInvoice(c) => c.invoice_id,
            InvoiceCommand::CancelInvoice(c) => c.invoice_id,
        }
    }

    pub fn company_id(&self) -> CompanyId {
        match self {
            InvoiceCommand::CreateInvoice(c) => c.company_id,
            InvoiceCommand::AddLine(c) => c.company_id,
            InvoiceCommand::SetOrigin(c) => c.company_id,
            InvoiceCommand::UpdateVehicle(c) => c.company_id,
            InvoiceCommand::ResolveSources(c) => c.company_id,
            InvoiceCommand::PostInvoice(c) => c.company_id,
            InvoiceCommand::CancelInvoice(c) => c.company_id,
        }
    }

    /// Whether the command can change what the invoice's sources resolve to.
    pub fn affects_sources(&self) -> bool {
        matches!(
            self,
            InvoiceCommand::CreateInvoice(_) | InvoiceCommand::AddLine(_) | InvoiceCommand::SetOrigin(_)
        )
    }
}

/// Event: InvoiceCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCreated {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub move_type: MoveType,
    pub partner: PartyId,
    pub currency: CurrencyCode,
    pub invoice_date: Option<NaiveDate>,
    pub date: NaiveDate,
    pub invoice_origin: Option<String>,
    pub lines: Vec<InvoiceLine>,
    pub vehicle: VehicleInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAdded {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub line: InvoiceLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OriginChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginChanged {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub invoice_origin: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: VehicleUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleUpdated {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub vehicle: VehicleInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SourcesResolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesResolved {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub sale_order_id: Option<SalesOrderId>,
    pub purchase_order_id: Option<PurchaseOrderId>,
    /// Vehicle after auto-fill.
    pub vehicle: VehicleInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoicePosted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePosted {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCancelled {
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    InvoiceCreated(InvoiceCreated),
    LineAdded(LineAdded),
    OriginChanged(OriginChanged),
    VehicleUpdated(VehicleUpdated),
    SourcesResolved(SourcesResolved),
    InvoicePosted(InvoicePosted),
    InvoiceCancelled(InvoiceCancelled),
}

impl Event for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceCreated(_) => "invoicing.invoice.created",
            InvoiceEvent::LineAdded(_) => "invoicing.invoice.line_added",
            InvoiceEvent::OriginChanged(_) => "invoicing.invoice.origin_changed",
            InvoiceEvent::VehicleUpdated(_) => "invoicing.invoice.vehicle_updated",
            InvoiceEvent::SourcesResolved(_) => "invoicing.invoice.sources_resolved",
            InvoiceEvent::InvoicePosted(_) => "invoicing.invoice.posted",
            InvoiceEvent::InvoiceCancelled(_) => "invoicing.invoice.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::InvoiceCreated(e) => e.occurred_at,
            InvoiceEvent::LineAdded(e) => e.occurred_at,
            InvoiceEvent::OriginChanged(e) => e.occurred_at,
            InvoiceEvent::VehicleUpdated(e) => e.occurred_at,
            InvoiceEvent::SourcesResolved(e) => e.occurred_at,
            InvoiceEvent::InvoicePosted(e) => e.occurred_at,
            InvoiceEvent::InvoiceCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Invoice {
    type Command = InvoiceCommand;
    type Event = InvoiceEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InvoiceEvent::InvoiceCreated(e) => {
                self.id = e.invoice_id;
                self.company_id = Some(e.company_id);
                self.move_type = e.move_type;
                self.partner = Some(e.partner);
                self.currency = Some(e.currency.clone());
                self.invoice_date = e.invoice_date;
                self.date = Some(e.date);
                self.invoice_origin = e.invoice_origin.clone();
                self.lines = e.lines.clone();
                self.vehicle = e.vehicle.clone();
                self.state = InvoiceState::Draft;
                self.created = true;
            }
            InvoiceEvent::LineAdded(e) => {
                self.lines.push(e.line.clone());
            }
            InvoiceEvent::OriginChanged(e) => {
                self.invoice_origin = e.invoice_origin.clone();
            }
            InvoiceEvent::VehicleUpdated(e) => {
                self.vehicle = e.vehicle.clone();
            }
            InvoiceEvent::SourcesResolved(e) => {
                self.sale_order_id = e.sale_order_id;
                self.purchase_order_id = e.purchase_order_id;
                self.vehicle = e.vehicle.clone();
            }
            InvoiceEvent::InvoicePosted(_) => {
                self.state = InvoiceState::Posted;
            }
            InvoiceEvent::InvoiceCancelled(_) => {
                self.state = InvoiceState::Cancel;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InvoiceCommand::CreateInvoice(cmd) => self.handle_create(cmd),
            InvoiceCommand::AddLine(cmd) => self.handle_add_line(cmd),
            InvoiceCommand::SetOrigin(cmd) => self.handle_set_origin(cmd),
            InvoiceCommand::UpdateVehicle(cmd) => self.handle_update_vehicle(cmd),
            InvoiceCommand::ResolveSources(cmd) => self.handle_resolve_sources(cmd),
            InvoiceCommand::PostInvoice(cmd) => self.handle_post(cmd),
            InvoiceCommand::CancelInvoice(cmd) => self.handle_cancel(cmd),
        }
    }
}

fn number_line(line_no: u32, input: &InvoiceLineInput) -> InvoiceLine {
    InvoiceLine {
        line_no,
        product_id: input.product_id,
        description: input.description.clone(),
        quantity: input.quantity,
        unit_price: input.unit_price,
        sale_lines: input.sale_lines.clone(),
        purchase_line: input.purchase_line,
    }
}

fn validate_line(line: &InvoiceLineInput) -> Result<(), DomainError> {
    if line.quantity.is_sign_negative() {
        return Err(DomainError::validation("quantity cannot be negative"));
    }
    if line.unit_price.is_sign_negative() {
        return Err(DomainError::validation("unit_price cannot be negative"));
    }
    Ok(())
}

impl Invoice {
    fn ensure_company(&self, company_id: CompanyId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.company_id != Some(company_id) {
            return Err(DomainError::invariant("company mismatch"));
        }
        Ok(())
    }

    fn ensure_invoice_id(&self, invoice_id: InvoiceId) -> Result<(), DomainError> {
        if self.id != invoice_id {
            return Err(DomainError::invariant("invoice_id mismatch"));
        }
        Ok(())
    }

    fn ensure_existing(&self, company_id: CompanyId, invoice_id: InvoiceId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_company(company_id)?;
        self.ensure_invoice_id(invoice_id)
    }

    fn ensure_draft(&self) -> Result<(), DomainError> {
        if self.state != InvoiceState::Draft {
            return Err(DomainError::invariant("only draft invoices can be modified"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("invoice already exists"));
        }

        for line in &cmd.lines {
            validate_line(line)?;
        }

        Ok(vec![InvoiceEvent::InvoiceCreated(InvoiceCreated {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            move_type: cmd.move_type,
            partner: cmd.partner,
            currency: cmd.currency.clone(),
            invoice_date: cmd.invoice_date,
            date: cmd.date,
            invoice_origin: cmd.invoice_origin.clone(),
            lines: cmd
                .lines
                .iter()
                .zip(1u32..)
                .map(|(input, line_no)| number_line(line_no, input))
                .collect(),
            vehicle: cmd.vehicle.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.invoice_id)?;
        self.ensure_draft()?;
        validate_line(&cmd.line)?;

        let next_line_no = self.lines.iter().map(|l| l.line_no).max().unwrap_or(0) + 1;

        Ok(vec![InvoiceEvent::LineAdded(LineAdded {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            line: number_line(next_line_no, &cmd.line),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_origin(&self, cmd: &SetOrigin) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.invoice_id)?;
        self.ensure_draft()?;

        if self.invoice_origin == cmd.invoice_origin {
            return Ok(vec![]);
        }

        Ok(vec![InvoiceEvent::OriginChanged(OriginChanged {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            invoice_origin: cmd.invoice_origin.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_vehicle(&self, cmd: &UpdateVehicle) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.invoice_id)?;

        if cmd.vehicle == self.vehicle {
            return Ok(vec![]);
        }

        Ok(vec![InvoiceEvent::VehicleUpdated(VehicleUpdated {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            vehicle: cmd.vehicle.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_resolve_sources(
        &self,
        cmd: &ResolveSources,
    ) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.invoice_id)?;

        let mut vehicle = self.vehicle.clone();
        if let Some(source) = &cmd.source_vehicle {
            vehicle.merge_missing(source);
        }

        if self.sale_order_id == cmd.sale_order_id
            && self.purchase_order_id == cmd.purchase_order_id
            && self.vehicle == vehicle
        {
            return Ok(vec![]);
        }

        Ok(vec![InvoiceEvent::SourcesResolved(SourcesResolved {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            sale_order_id: cmd.sale_order_id,
            purchase_order_id: cmd.purchase_order_id,
            vehicle,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_post(&self, cmd: &PostInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.invoice_id)?;

        if self.state != InvoiceState::Draft {
            return Err(DomainError::invariant("only draft invoices can be posted"));
        }

        if self.lines.is_empty() {
            return Err(DomainError::validation("cannot post an invoice without lines"));
        }

        Ok(vec![InvoiceEvent::InvoicePosted(InvoicePosted {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_existing(cmd.company_id, cmd.invoice_id)?;

        if self.state == InvoiceState::Cancel {
            return Err(DomainError::conflict("invoice is already cancelled"));
        }

        Ok(vec![InvoiceEvent::InvoiceCancelled(InvoiceCancelled {
            company_id: cmd.company_id,
            invoice_id: cmd.invoice_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_company_id() -> CompanyId {
        CompanyId::new()
    }

    fn test_invoice_id() -> InvoiceId {
        InvoiceId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
    }

    fn line(qty: Decimal, price: Decimal) -> InvoiceLineInput {
        InvoiceLineInput {
            product_id: None,
            description: "Service".to_string(),
            quantity: qty,
            unit_price: price,
            sale_lines: vec![],
            purchase_line: None,
        }
    }

    fn execute(invoice: &mut Invoice, cmd: InvoiceCommand) {
        let events = invoice.handle(&cmd).unwrap();
        for e in &events {
            invoice.apply(e);
        }
    }

    fn created(company_id: CompanyId, vehicle: VehicleInfo, invoice_date: Option<NaiveDate>) -> Invoice {
        let invoice_id = test_invoice_id();
        let mut invoice = Invoice::empty(invoice_id);
        execute(
            &mut invoice,
            InvoiceCommand::CreateInvoice(CreateInvoice {
                company_id,
                invoice_id,
                move_type: MoveType::OutInvoice,
                partner: PartyId::new(AggregateId::new()),
                currency: CurrencyCode::new("USD").unwrap(),
                invoice_date,
                date: day(20),
                invoice_origin: Some("S00001".to_string()),
                lines: vec![line(dec!(2), dec!(300)), line(dec!(1), dec!(400))],
                vehicle,
                occurred_at: test_time(),
            }),
        );
        invoice
    }

    fn resolve(invoice: &mut Invoice, company_id: CompanyId, source: VehicleInfo) {
        execute(
            invoice,
            InvoiceCommand::ResolveSources(ResolveSources {
                company_id,
                invoice_id: invoice.id_typed(),
                sale_order_id: Some(SalesOrderId::new(AggregateId::new())),
                purchase_order_id: None,
                source_vehicle: Some(source),
                occurred_at: test_time(),
            }),
        );
    }

    #[test]
    fn lines_are_numbered_and_totalled() {
        let invoice = created(test_company_id(), VehicleInfo::default(), None);
        let numbers: Vec<u32> = invoice.lines().iter().map(|l| l.line_no).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(invoice.amount_total(), dec!(1000));
    }

    #[test]
    fn conversion_date_prefers_invoice_date() {
        let with_date = created(test_company_id(), VehicleInfo::default(), Some(day(3)));
        assert_eq!(with_date.conversion_date(), Some(day(3)));

        let without = created(test_company_id(), VehicleInfo::default(), None);
        assert_eq!(without.conversion_date(), Some(day(20)));
    }

    #[test]
    fn resolving_sources_fills_only_unset_vehicle_fields() {
        let company_id = test_company_id();
        let mut invoice = created(company_id, VehicleInfo::new().with_plate("manual-1"), None);

        resolve(
            &mut invoice,
            company_id,
            VehicleInfo::new().with_plate("src-1").with_brand("nissan"),
        );

        assert_eq!(invoice.vehicle().plate(), Some("MANUAL-1"));
        assert_eq!(invoice.vehicle().brand(), Some("NISSAN"));
        assert!(invoice.sale_order_id().is_some());
    }

    #[test]
    fn manual_vehicle_edit_survives_later_resolution() {
        let company_id = test_company_id();
        let mut invoice = created(company_id, VehicleInfo::default(), None);
        resolve(&mut invoice, company_id, VehicleInfo::new().with_plate("src-1"));

        let invoice_id = invoice.id_typed();
        execute(
            &mut invoice,
            InvoiceCommand::UpdateVehicle(UpdateVehicle {
                company_id,
                invoice_id,
                vehicle: VehicleInfo::new().with_plate("edited"),
                occurred_at: test_time(),
            }),
        );
        resolve(&mut invoice, company_id, VehicleInfo::new().with_plate("src-2"));

        assert_eq!(invoice.vehicle().plate(), Some("EDITED"));
    }

    #[test]
    fn posted_invoice_rejects_new_lines() {
        let company_id = test_company_id();
        let mut invoice = created(company_id, VehicleInfo::default(), None);
        let invoice_id = invoice.id_typed();
        execute(
            &mut invoice,
            InvoiceCommand::PostInvoice(PostInvoice {
                company_id,
                invoice_id,
                occurred_at: test_time(),
            }),
        );
        assert!(invoice.is_posted());

        let err = invoice
            .handle(&InvoiceCommand::AddLine(AddLine {
                company_id,
                invoice_id: invoice.id_typed(),
                line: line(dec!(1), dec!(1)),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn add_line_continues_numbering() {
        let company_id = test_company_id();
        let mut invoice = created(company_id, VehicleInfo::default(), None);
        let invoice_id = invoice.id_typed();
        execute(
            &mut invoice,
            InvoiceCommand::AddLine(AddLine {
                company_id,
                invoice_id,
                line: line(dec!(1), dec!(5)),
                occurred_at: test_time(),
            }),
        );
        assert_eq!(invoice.lines().last().map(|l| l.line_no), Some(3));
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let invoice = Invoice::empty(test_invoice_id());
        let err = invoice
            .handle(&InvoiceCommand::CreateInvoice(CreateInvoice {
                company_id: test_company_id(),
                invoice_id: test_invoice_id(),
                move_type: MoveType::OutRefund,
                partner: PartyId::new(AggregateId::new()),
                currency: CurrencyCode::new("USD").unwrap(),
                invoice_date: None,
                date: day(1),
                invoice_origin: None,
                lines: vec![line(dec!(-1), dec!(10))],
                vehicle: VehicleInfo::default(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
