use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use orderlink_core::{AggregateId, CompanyId, VehicleInfo};
use orderlink_currency::{CurrencyCode, RateTable};
use orderlink_events::InMemoryAuditLog;
use orderlink_infra::{LinkConfig, OrderBook};
use orderlink_parties::PartyId;
use orderlink_products::ProductId;
use orderlink_purchasing::{self as purchasing, PurchaseOrderCommand, PurchaseOrderId};
use orderlink_sales::{self as sales, SaleLineRef, SalesOrderCommand, SalesOrderId};

fn code(c: &str) -> CurrencyCode {
    CurrencyCode::new(c).unwrap()
}

/// Book with one sale order (`lines` lines) and `purchases` confirmed purchase
/// orders linked to it, half of them in a foreign currency.
fn setup(lines: u32, purchases: usize) -> (OrderBook, CompanyId, SalesOrderId) {
    let company_id = CompanyId::new();
    let rates = Arc::new(RateTable::new());
    rates.set_base_currency(company_id, code("USD"));
    rates.set_rate(
        company_id,
        code("EUR"),
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        dec!(0.9),
    );
    let book = OrderBook::new(LinkConfig::default(), rates, Arc::new(InMemoryAuditLog::new()));
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

    let sale_id = SalesOrderId::new(AggregateId::new());
    book.execute_sale(SalesOrderCommand::CreateSalesOrder(sales::CreateSalesOrder {
        company_id,
        order_id: sale_id,
        name: "S00001".to_string(),
        customer: PartyId::new(AggregateId::new()),
        currency: code("USD"),
        vehicle: VehicleInfo::new().with_plate("bench-1"),
        occurred_at: now,
    }))
    .unwrap();
    for _ in 0..lines {
        book.execute_sale(SalesOrderCommand::AddLine(sales::AddLine {
            company_id,
            order_id: sale_id,
            product_id: ProductId::new(AggregateId::new()),
            description: "Part".to_string(),
            quantity: dec!(10),
            unit_price: dec!(25),
            occurred_at: now,
        }))
        .unwrap();
    }

    for i in 0..purchases {
        let order_id = PurchaseOrderId::new(AggregateId::new());
        let currency = if i % 2 == 0 { "USD" } else { "EUR" };
        book.execute_purchase(PurchaseOrderCommand::CreatePurchaseOrder(
            purchasing::CreatePurchaseOrder {
                company_id,
                order_id,
                name: format!("P{:05}", i + 1),
                vendor: PartyId::new(AggregateId::new()),
                partner_ref: None,
                currency: code(currency),
                date_order: now,
                sale_order_id: Some(sale_id),
                vehicle: VehicleInfo::new(),
                occurred_at: now,
            },
        ))
        .unwrap();
        let line_no = (i as u32 % lines) + 1;
        book.execute_purchase(PurchaseOrderCommand::AddLine(purchasing::AddLine {
            company_id,
            order_id,
            product_id: ProductId::new(AggregateId::new()),
            description: "Part".to_string(),
            quantity: Decimal::ONE,
            unit_price: dec!(20),
            sale_line: Some(SaleLineRef { order_id: sale_id, line_no }),
            occurred_at: now,
        }))
        .unwrap();
        book.confirm_purchase(company_id, order_id, now).unwrap();
    }

    (book, company_id, sale_id)
}

fn bench_recompute_sale_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("recompute_sale_order");

    for purchases in [1usize, 10, 100, 500].iter() {
        group.throughput(Throughput::Elements(*purchases as u64));
        group.bench_with_input(
            BenchmarkId::new("linked_purchases", purchases),
            purchases,
            |b, &count| {
                let (book, company_id, sale_id) = setup(20, count);
                b.iter(|| {
                    black_box(book.recompute_sale_order(company_id, black_box(sale_id)).unwrap());
                });
            },
        );
    }

    group.finish();
}

fn bench_purchase_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("purchase_summary");

    for purchases in [10usize, 100].iter() {
        group.bench_with_input(
            BenchmarkId::new("build_and_render", purchases),
            purchases,
            |b, &count| {
                let (book, company_id, sale_id) = setup(20, count);
                let renderer = orderlink_infra::Renderer::new().unwrap();
                b.iter(|| {
                    let summary = book.purchase_summary(company_id, sale_id).unwrap();
                    black_box(renderer.purchase_summary(&summary).unwrap());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_recompute_sale_order, bench_purchase_summary);
criterion_main!(benches);
