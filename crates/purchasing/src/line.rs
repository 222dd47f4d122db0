use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use orderlink_products::ProductId;
use orderlink_sales::SaleLineRef;

use crate::order::PurchaseOrderId;

/// Purchase line, optionally covering a sale line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub line_no: u32,
    pub product_id: ProductId,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Cleared (never cascaded) when the sale line goes away.
    pub sale_line: Option<SaleLineRef>,
}

impl PurchaseLine {
    pub fn subtotal(&self) -> Decimal {
        self.quantity * self.unit_price
    }
}

/// Address of a purchase line from another document (vendor bill lines).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PurchaseLineRef {
    pub order_id: PurchaseOrderId,
    pub line_no: u32,
}

impl PurchaseLineRef {
    pub fn new(order_id: PurchaseOrderId, line_no: u32) -> Self {
        Self { order_id, line_no }
    }
}
