//! Document fixtures for unit tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use orderlink_core::{Aggregate, AggregateId, CompanyId, VehicleInfo};
use orderlink_currency::CurrencyCode;
use orderlink_invoicing::{
    CreateInvoice, Invoice, InvoiceCommand, InvoiceId, InvoiceLineInput, MoveType, PostInvoice,
};
use orderlink_parties::PartyId;
use orderlink_products::ProductId;
use orderlink_purchasing as purchasing;
use orderlink_purchasing::{PurchaseOrder, PurchaseOrderCommand, PurchaseOrderId, PurchaseState};
use orderlink_sales as sales;
use orderlink_sales::{SaleLineRef, SalesOrder, SalesOrderCommand, SalesOrderId};

pub fn run<A>(aggregate: &mut A, command: A::Command)
where
    A: Aggregate,
{
    for event in aggregate.handle(&command).unwrap() {
        aggregate.apply(&event);
    }
}

pub fn code(c: &str) -> CurrencyCode {
    CurrencyCode::new(c).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

pub fn party() -> PartyId {
    PartyId::new(AggregateId::new())
}

/// Sale order with one line per `(quantity, unit_price)`.
pub fn sale_order(
    company_id: CompanyId,
    name: &str,
    currency: &str,
    lines: &[(Decimal, Decimal)],
) -> SalesOrder {
    let order_id = SalesOrderId::new(AggregateId::new());
    let mut order = SalesOrder::empty(order_id);
    run(
        &mut order,
        SalesOrderCommand::CreateSalesOrder(sales::CreateSalesOrder {
            company_id,
            order_id,
            name: name.to_string(),
            customer: party(),
            currency: code(currency),
            vehicle: VehicleInfo::new().with_plate("abc-123"),
            occurred_at: at(2024, 1, 2),
        }),
    );
    for (quantity, unit_price) in lines {
        run(
            &mut order,
            SalesOrderCommand::AddLine(sales::AddLine {
                company_id,
                order_id,
                product_id: ProductId::new(AggregateId::new()),
                description: "Brake pads".to_string(),
                quantity: *quantity,
                unit_price: *unit_price,
                occurred_at: at(2024, 1, 2),
            }),
        );
    }
    order
}

/// Purchase order driven to `state`; one line per `(quantity, unit_price, sale_line)`.
pub fn purchase_order(
    company_id: CompanyId,
    name: &str,
    currency: &str,
    date_order: DateTime<Utc>,
    sale_order_id: Option<SalesOrderId>,
    lines: &[(Decimal, Decimal, Option<SaleLineRef>)],
    state: PurchaseState,
) -> PurchaseOrder {
    let order_id = PurchaseOrderId::new(AggregateId::new());
    let mut order = PurchaseOrder::empty(order_id);
    run(
        &mut order,
        PurchaseOrderCommand::CreatePurchaseOrder(purchasing::CreatePurchaseOrder {
            company_id,
            order_id,
            name: name.to_string(),
            vendor: party(),
            partner_ref: None,
            currency: code(currency),
            date_order,
            sale_order_id,
            vehicle: VehicleInfo::new(),
            occurred_at: date_order,
        }),
    );
    for (quantity, unit_price, sale_line) in lines {
        run(
            &mut order,
            PurchaseOrderCommand::AddLine(purchasing::AddLine {
                company_id,
                order_id,
                product_id: ProductId::new(AggregateId::new()),
                description: "Brake pads".to_string(),
                quantity: *quantity,
                unit_price: *unit_price,
                sale_line: *sale_line,
                occurred_at: date_order,
            }),
        );
    }

    let confirm = PurchaseOrderCommand::ConfirmOrder(purchasing::ConfirmOrder {
        company_id,
        order_id,
        deadline_business_days: 10,
        occurred_at: date_order,
    });
    match state {
        PurchaseState::Draft => {}
        PurchaseState::Sent => run(
            &mut order,
            PurchaseOrderCommand::MarkSent(purchasing::MarkSent { company_id, order_id, occurred_at: date_order }),
        ),
        PurchaseState::ToApprove => run(
            &mut order,
            PurchaseOrderCommand::RequestApproval(purchasing::RequestApproval {
                company_id,
                order_id,
                occurred_at: date_order,
            }),
        ),
        PurchaseState::Purchase => run(&mut order, confirm),
        PurchaseState::Done => {
            run(&mut order, confirm);
            run(
                &mut order,
                PurchaseOrderCommand::LockOrder(purchasing::LockOrder { company_id, order_id, occurred_at: date_order }),
            );
        }
        PurchaseState::Cancel => run(
            &mut order,
            PurchaseOrderCommand::CancelOrder(purchasing::CancelOrder { company_id, order_id, occurred_at: date_order }),
        ),
    }
    order
}

/// Single-line invoice of `amount`, optionally linked to a sale line and posted.
pub fn invoice(
    company_id: CompanyId,
    move_type: MoveType,
    currency: &str,
    invoice_date: Option<NaiveDate>,
    accounting_date: NaiveDate,
    amount: Decimal,
    sale_line: Option<SaleLineRef>,
    posted: bool,
) -> Invoice {
    let invoice_id = InvoiceId::new(AggregateId::new());
    let mut invoice = Invoice::empty(invoice_id);
    run(
        &mut invoice,
        InvoiceCommand::CreateInvoice(CreateInvoice {
            company_id,
            invoice_id,
            move_type,
            partner: party(),
            currency: code(currency),
            invoice_date,
            date: accounting_date,
            invoice_origin: None,
            lines: vec![InvoiceLineInput {
                product_id: None,
                description: "Service".to_string(),
                quantity: Decimal::ONE,
                unit_price: amount,
                sale_lines: sale_line.into_iter().collect(),
                purchase_line: None,
            }],
            vehicle: VehicleInfo::new(),
            occurred_at: at(2024, 1, 2),
        }),
    );
    if posted {
        run(
            &mut invoice,
            InvoiceCommand::PostInvoice(PostInvoice { company_id, invoice_id, occurred_at: at(2024, 1, 2) }),
        );
    }
    invoice
}
