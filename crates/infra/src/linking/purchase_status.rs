//! Purchase coverage of sale lines.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use orderlink_products::ProductId;
use orderlink_purchasing::{PurchaseOrder, PurchaseState};
use orderlink_sales::{PurchaseStatus, SaleLineRef, SalesOrder};

/// Derived purchase figures of one sale line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLineStatus {
    pub line_no: u32,
    pub product_id: ProductId,
    pub description: String,
    pub ordered: Decimal,
    pub purchased: Decimal,
    /// `ordered - purchased`; negative when more was bought than sold.
    pub pending: Decimal,
    pub status: PurchaseStatus,
}

impl SaleLineStatus {
    /// Pending quantity as shown to users: never below zero.
    pub fn pending_display(&self) -> Decimal {
        self.pending.max(Decimal::ZERO)
    }
}

/// Order-level purchase statistics of a sale order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseStatistics {
    /// Purchase orders linked to the sale order, any state.
    pub purchase_order_count: usize,
    /// Lines on linked purchase orders that are confirmed or locked.
    pub purchase_lines_in_process: usize,
    /// Sale lines that still need purchasing.
    pub pending_to_purchase: usize,
    pub products_purchased_qty: Decimal,
    pub products_pending_qty: Decimal,
}

/// Quantity bought for `line` across `purchases`, ignoring cancelled orders.
pub fn purchased_quantity(line: SaleLineRef, purchases: &[PurchaseOrder]) -> Decimal {
    purchases
        .iter()
        .filter(|po| po.state() != PurchaseState::Cancel)
        .flat_map(|po| po.lines())
        .filter(|l| l.sale_line == Some(line))
        .map(|l| l.quantity)
        .sum()
}

/// Status of every line of `order`.
///
/// `purchases` are the purchase orders with at least one line pointing at the
/// order; other orders are harmless, their lines simply never match.
pub fn line_statuses(order: &SalesOrder, purchases: &[PurchaseOrder]) -> Vec<SaleLineStatus> {
    order
        .lines()
        .iter()
        .map(|line| {
            let purchased = purchased_quantity(order.line_ref(line.line_no), purchases);
            SaleLineStatus {
                line_no: line.line_no,
                product_id: line.product_id,
                description: line.description.clone(),
                ordered: line.quantity,
                purchased,
                pending: line.quantity - purchased,
                status: PurchaseStatus::classify(purchased, line.quantity),
            }
        })
        .collect()
}

/// Roll line figures up to the order; `linked_purchases` are the orders linked
/// through their header.
pub fn statistics(lines: &[SaleLineStatus], linked_purchases: &[PurchaseOrder]) -> PurchaseStatistics {
    let pending: Vec<Decimal> = lines
        .iter()
        .map(|l| l.pending)
        .filter(|p| *p > Decimal::ZERO)
        .collect();

    PurchaseStatistics {
        purchase_order_count: linked_purchases.len(),
        purchase_lines_in_process: linked_purchases
            .iter()
            .filter(|po| po.is_confirmed())
            .map(|po| po.lines().len())
            .sum(),
        pending_to_purchase: pending.len(),
        products_purchased_qty: lines.iter().map(|l| l.purchased).sum(),
        products_pending_qty: pending.iter().copied().sum(),
    }
}
