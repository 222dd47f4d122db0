use serde::{Deserialize, Serialize};

use orderlink_core::{CompanyId, VehicleInfo};
use orderlink_sales::SalesOrderId;

use crate::error::ServiceError;
use crate::order_book::OrderBook;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelField {
    pub label: String,
    pub value: String,
}

/// Vehicle data of a sale order, shown while linking purchases to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehiclePanel {
    pub sale_order: String,
    pub fields: Vec<PanelField>,
}

impl VehiclePanel {
    pub fn build(sale_order: &str, vehicle: &VehicleInfo) -> Self {
        Self {
            sale_order: sale_order.to_string(),
            fields: vehicle
                .present()
                .map(|(field, value)| PanelField {
                    label: field.label().to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }
}

impl OrderBook {
    pub fn vehicle_panel(&self, company_id: CompanyId, sale_order_id: SalesOrderId) -> Result<VehiclePanel, ServiceError> {
        let order = self
            .sale_order(company_id, sale_order_id)
            .ok_or_else(|| ServiceError::not_found("sale order"))?;
        Ok(VehiclePanel::build(order.name(), order.vehicle()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::Renderer;

    #[test]
    fn panel_lists_present_fields_only() {
        let panel = VehiclePanel::build("S00042", &VehicleInfo::new().with_plate("abc-123").with_vin("vin9"));
        let html = Renderer::new().unwrap().vehicle_panel(&panel).unwrap();

        assert!(html.contains("<strong>Sale order:</strong> S00042"));
        assert!(html.contains("<li><strong>Plate:</strong> ABC-123</li>"));
        assert!(html.contains("<li><strong>VIN:</strong> VIN9</li>"));
        assert!(!html.contains("Brand"));
    }

    #[test]
    fn panel_without_vehicle_data_says_so() {
        let panel = VehiclePanel::build("S00042", &VehicleInfo::new());
        let html = Renderer::new().unwrap().vehicle_panel(&panel).unwrap();
        assert!(html.contains("This sale has no vehicle data"));
    }
}
