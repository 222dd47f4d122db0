//! Vehicle search filters and grouping over sale orders, purchase orders and
//! invoices.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use orderlink_core::{CompanyId, VehicleField, VehicleInfo};
use orderlink_invoicing::Invoice;
use orderlink_purchasing::PurchaseOrder;
use orderlink_sales::SalesOrder;

use crate::order_book::OrderBook;

/// A document carrying vehicle data.
pub trait HasVehicle {
    fn vehicle_info(&self) -> &VehicleInfo;
}

impl HasVehicle for SalesOrder {
    fn vehicle_info(&self) -> &VehicleInfo {
        self.vehicle()
    }
}

impl HasVehicle for PurchaseOrder {
    fn vehicle_info(&self) -> &VehicleInfo {
        self.vehicle()
    }
}

impl HasVehicle for Invoice {
    fn vehicle_info(&self) -> &VehicleInfo {
        self.vehicle()
    }
}

/// Search filter on vehicle data. Text filters match case-insensitive substrings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "filter", content = "value", rename_all = "snake_case")]
pub enum VehicleFilter {
    PlateContains(String),
    BrandContains(String),
    VinContains(String),
    /// The plate is set.
    WithVehicle,
    /// The plate is unset.
    WithoutVehicle,
}

impl VehicleFilter {
    pub fn matches(&self, vehicle: &VehicleInfo) -> bool {
        match self {
            VehicleFilter::PlateContains(text) => contains(vehicle.plate(), text),
            VehicleFilter::BrandContains(text) => contains(vehicle.brand(), text),
            VehicleFilter::VinContains(text) => contains(vehicle.vin(), text),
            VehicleFilter::WithVehicle => vehicle.plate().is_some(),
            VehicleFilter::WithoutVehicle => vehicle.plate().is_none(),
        }
    }
}

fn contains(value: Option<&str>, text: &str) -> bool {
    // Stored values are upper case already.
    value.is_some_and(|v| v.contains(&text.to_uppercase()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleGroup {
    Plate,
    Brand,
}

impl VehicleGroup {
    fn field(self) -> VehicleField {
        match self {
            VehicleGroup::Plate => VehicleField::Plate,
            VehicleGroup::Brand => VehicleField::Brand,
        }
    }
}

/// Documents matching every filter, in input order.
pub fn filter_documents<T: HasVehicle>(documents: impl IntoIterator<Item = T>, filters: &[VehicleFilter]) -> Vec<T> {
    documents
        .into_iter()
        .filter(|d| filters.iter().all(|f| f.matches(d.vehicle_info())))
        .collect()
}

/// Documents grouped by plate or brand; documents without the value group under `None`.
pub fn group_documents<T: HasVehicle>(documents: Vec<T>, group: VehicleGroup) -> BTreeMap<Option<String>, Vec<T>> {
    let mut groups: BTreeMap<Option<String>, Vec<T>> = BTreeMap::new();
    for document in documents {
        let key = document.vehicle_info().get(group.field()).map(str::to_string);
        groups.entry(key).or_default().push(document);
    }
    groups
}

impl OrderBook {
    pub fn search_sale_orders(&self, company_id: CompanyId, filters: &[VehicleFilter]) -> Vec<SalesOrder> {
        filter_documents(self.sale_orders(company_id), filters)
    }

    pub fn search_purchase_orders(&self, company_id: CompanyId, filters: &[VehicleFilter]) -> Vec<PurchaseOrder> {
        filter_documents(self.purchase_orders(company_id), filters)
    }

    pub fn search_invoices(&self, company_id: CompanyId, filters: &[VehicleFilter]) -> Vec<Invoice> {
        filter_documents(self.invoices(company_id), filters)
    }
}
