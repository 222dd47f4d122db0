//! Window actions returned by wizards and smart buttons.
//!
//! An [`Action`] tells the client what to show next. Actions that can lead to a
//! new purchase order carry [`PurchaseDefaults`] so the new order starts linked
//! to the sale order and with its vehicle data.

use serde::{Deserialize, Serialize};

use orderlink_core::{CompanyId, VehicleInfo};
use orderlink_purchasing::PurchaseOrderId;
use orderlink_sales::SalesOrderId;

use crate::error::ServiceError;
use crate::order_book::OrderBook;

/// Values pre-filled on a purchase order created from the shown view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseDefaults {
    pub sale_order_id: SalesOrderId,
    pub vehicle: VehicleInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub sticky: bool,
    /// Action run once the notification is shown.
    pub next: Box<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Close the current dialog.
    Close,
    OpenPurchaseOrder {
        title: String,
        purchase_order_id: PurchaseOrderId,
        defaults: Option<PurchaseDefaults>,
    },
    ListPurchaseOrders {
        title: String,
        purchase_order_ids: Vec<PurchaseOrderId>,
        defaults: Option<PurchaseDefaults>,
    },
    OpenSaleOrder {
        title: String,
        sale_order_id: SalesOrderId,
    },
    Notify(Notification),
}

impl Action {
    /// Form for a single order, list for several, close for none.
    pub fn for_purchase_orders(
        ids: Vec<PurchaseOrderId>,
        single_title: &str,
        list_title: &str,
        defaults: Option<PurchaseDefaults>,
    ) -> Self {
        match ids.as_slice() {
            [] => Action::Close,
            [id] => Action::OpenPurchaseOrder {
                title: single_title.to_string(),
                purchase_order_id: *id,
                defaults,
            },
            _ => Action::ListPurchaseOrders {
                title: list_title.to_string(),
                purchase_order_ids: ids,
                defaults,
            },
        }
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>, next: Action) -> Self {
        Action::Notify(Notification {
            title: title.into(),
            message: message.into(),
            kind: NotificationKind::Success,
            sticky: false,
            next: Box::new(next),
        })
    }
}

impl OrderBook {
    /// Smart button on the sale order: its linked purchase orders.
    pub fn view_purchase_orders(
        &self,
        company_id: CompanyId,
        sale_order_id: SalesOrderId,
    ) -> Result<Action, ServiceError> {
        let order = self
            .sale_order(company_id, sale_order_id)
            .ok_or_else(|| ServiceError::not_found("sale order"))?;
        let ids = self
            .linked_purchase_orders(company_id, sale_order_id)
            .iter()
            .map(|po| po.id_typed())
            .collect();
        let defaults = PurchaseDefaults {
            sale_order_id,
            vehicle: order.vehicle().clone(),
        };
        Ok(Action::for_purchase_orders(ids, "Purchase order", "Purchase orders", Some(defaults)))
    }

    /// Smart button on the purchase order: the sale order it belongs to.
    pub fn view_sale_order(
        &self,
        company_id: CompanyId,
        purchase_order_id: PurchaseOrderId,
    ) -> Result<Action, ServiceError> {
        self.purchase_order(company_id, purchase_order_id)
            .ok_or_else(|| ServiceError::not_found("purchase order"))?;
        Ok(match self.linked_sale_order(company_id, purchase_order_id) {
            Some(order) => Action::OpenSaleOrder {
                title: "Sale order".to_string(),
                sale_order_id: order.id_typed(),
            },
            None => Action::Close,
        })
    }
}
