//! HTML summaries and export data for sale orders.
//!
//! View models are built from the book on every call, so a summary always
//! reflects the current documents. [`Renderer`] turns them into HTML with the
//! bundled tera templates; `.html` templates are auto-escaped.

mod export;
mod product_control;
mod purchase_summary;
mod vehicle_panel;

use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::debug;

use crate::error::ServiceError;

pub use export::{ExportAction, LiquidationReport, ReportInvoice, ReportPurchase};
pub use product_control::{ProductControl, ProductControlRow};
pub use purchase_summary::{PurchaseSummary, PurchaseSummaryRow, badge_class};
pub use vehicle_panel::{PanelField, VehiclePanel};

pub const PURCHASE_SUMMARY: &str = "purchase_summary.html";
pub const PRODUCT_CONTROL: &str = "product_control.html";
pub const VEHICLE_PANEL: &str = "vehicle_panel.html";

const TEMPLATES: [(&str, &str); 3] = [
    (PURCHASE_SUMMARY, include_str!("../../templates/purchase_summary.html")),
    (PRODUCT_CONTROL, include_str!("../../templates/product_control.html")),
    (VEHICLE_PANEL, include_str!("../../templates/vehicle_panel.html")),
];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to load template {name}: {source}")]
    Template {
        name: String,
        #[source]
        source: tera::Error,
    },

    #[error("failed to render {name}: {source}")]
    Render {
        name: String,
        #[source]
        source: tera::Error,
    },

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Renders report view models with the bundled templates.
#[derive(Debug)]
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    pub fn new() -> Result<Self, ReportError> {
        let mut tera = Tera::default();
        for (name, content) in TEMPLATES {
            tera.add_raw_template(name, content).map_err(|source| ReportError::Template {
                name: name.to_string(),
                source,
            })?;
        }
        debug!(templates = TEMPLATES.len(), "report templates loaded");
        Ok(Self { tera })
    }

    /// Render `template` with a serializable context.
    pub fn render(&self, template: &str, context: &impl Serialize) -> Result<String, ReportError> {
        let render_error = |source| ReportError::Render {
            name: template.to_string(),
            source,
        };
        let context = Context::from_serialize(context).map_err(render_error)?;
        self.tera.render(template, &context).map_err(render_error)
    }

    pub fn purchase_summary(&self, summary: &PurchaseSummary) -> Result<String, ReportError> {
        self.render(PURCHASE_SUMMARY, summary)
    }

    pub fn product_control(&self, control: &ProductControl) -> Result<String, ReportError> {
        self.render(PRODUCT_CONTROL, control)
    }

    pub fn vehicle_panel(&self, panel: &VehiclePanel) -> Result<String, ReportError> {
        self.render(VEHICLE_PANEL, panel)
    }
}
