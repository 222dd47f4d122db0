use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use orderlink_products::ProductId;

use crate::order::SalesOrderId;

/// Sale line: product, ordered quantity, unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub line_no: u32,
    pub product_id: ProductId,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl SaleLine {
    pub fn subtotal(&self) -> Decimal {
        self.quantity * self.unit_price
    }
}

/// Address of a sale line from another document.
///
/// Line numbers are never reused within an order, so a reference to a removed
/// line never silently points at a different one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SaleLineRef {
    pub order_id: SalesOrderId,
    pub line_no: u32,
}

impl SaleLineRef {
    pub fn new(order_id: SalesOrderId, line_no: u32) -> Self {
        Self { order_id, line_no }
    }
}

/// How much of a sale line is covered by purchases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    NotPurchased,
    Partial,
    Purchased,
}

impl PurchaseStatus {
    /// `purchased <= 0` wins over `purchased >= ordered`, so a zero-quantity line
    /// with nothing bought is `NotPurchased`.
    pub fn classify(purchased: Decimal, ordered: Decimal) -> Self {
        if purchased <= Decimal::ZERO {
            PurchaseStatus::NotPurchased
        } else if purchased >= ordered {
            PurchaseStatus::Purchased
        } else {
            PurchaseStatus::Partial
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PurchaseStatus::NotPurchased => "Not purchased",
            PurchaseStatus::Partial => "Partially purchased",
            PurchaseStatus::Purchased => "Purchased",
        }
    }
}
