//! Vehicle data carried across sale orders, purchase orders and invoices.
//!
//! Every entry path (builder, setter, deserialization) goes through
//! [`VehicleInfo::normalize`], so a stored value is always the upper-cased input.

use serde::{Deserialize, Serialize};

use crate::value_object::ValueObject;

/// One of the four vehicle attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleField {
    Plate,
    Brand,
    Year,
    Vin,
}

impl VehicleField {
    pub const ALL: [VehicleField; 4] = [
        VehicleField::Plate,
        VehicleField::Brand,
        VehicleField::Year,
        VehicleField::Vin,
    ];

    pub fn label(self) -> &'static str {
        match self {
            VehicleField::Plate => "Plate",
            VehicleField::Brand => "Brand",
            VehicleField::Year => "Year",
            VehicleField::Vin => "VIN",
        }
    }
}

/// Plate, brand, year and VIN of the serviced vehicle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawVehicleInfo")]
pub struct VehicleInfo {
    plate: Option<String>,
    brand: Option<String>,
    year: Option<String>,
    vin: Option<String>,
}

impl ValueObject for VehicleInfo {}

#[derive(Deserialize)]
struct RawVehicleInfo {
    #[serde(default)]
    plate: Option<String>,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    year: Option<String>,
    #[serde(default)]
    vin: Option<String>,
}

impl From<RawVehicleInfo> for VehicleInfo {
    fn from(raw: RawVehicleInfo) -> Self {
        let mut info = VehicleInfo::default();
        info.set(VehicleField::Plate, raw.plate.as_deref());
        info.set(VehicleField::Brand, raw.brand.as_deref());
        info.set(VehicleField::Year, raw.year.as_deref());
        info.set(VehicleField::Vin, raw.vin.as_deref());
        info
    }
}

impl VehicleInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalized form of a single field value, as it would be stored.
    ///
    /// Also serves as the as-you-type preview for forms. Empty input means unset.
    pub fn normalize(value: &str) -> Option<String> {
        if value.is_empty() {
            None
        } else {
            Some(value.to_uppercase())
        }
    }

    pub fn with_plate(mut self, value: impl AsRef<str>) -> Self {
        self.set(VehicleField::Plate, Some(value.as_ref()));
        self
    }

    pub fn with_brand(mut self, value: impl AsRef<str>) -> Self {
        self.set(VehicleField::Brand, Some(value.as_ref()));
        self
    }

    pub fn with_year(mut self, value: impl AsRef<str>) -> Self {
        self.set(VehicleField::Year, Some(value.as_ref()));
        self
    }

    pub fn with_vin(mut self, value: impl AsRef<str>) -> Self {
        self.set(VehicleField::Vin, Some(value.as_ref()));
        self
    }

    pub fn plate(&self) -> Option<&str> {
        self.plate.as_deref()
    }

    pub fn brand(&self) -> Option<&str> {
        self.brand.as_deref()
    }

    pub fn year(&self) -> Option<&str> {
        self.year.as_deref()
    }

    pub fn vin(&self) -> Option<&str> {
        self.vin.as_deref()
    }

    pub fn get(&self, field: VehicleField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: VehicleField, value: Option<&str>) {
        *self.slot_mut(field) = value.and_then(Self::normalize);
    }

    /// Present fields, in `VehicleField::ALL` order.
    pub fn present(&self) -> impl Iterator<Item = (VehicleField, &str)> + '_ {
        VehicleField::ALL
            .into_iter()
            .filter_map(move |f| self.get(f).map(|v| (f, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }

    pub fn has_any(&self) -> bool {
        !self.is_empty()
    }

    /// Fill only the fields that are unset here. Returns whether anything changed.
    pub fn merge_missing(&mut self, source: &VehicleInfo) -> bool {
        let mut changed = false;
        for field in VehicleField::ALL {
            if self.get(field).is_none() {
                if let Some(value) = source.get(field) {
                    *self.slot_mut(field) = Some(value.to_string());
                    changed = true;
                }
            }
        }
        changed
    }

    /// Overwrite every field that is set on `source`, leaving the others alone.
    pub fn overwrite_present(&mut self, source: &VehicleInfo) -> bool {
        let mut changed = false;
        for (field, value) in source.present() {
            if self.get(field) != Some(value) {
                *self.slot_mut(field) = Some(value.to_string());
                changed = true;
            }
        }
        changed
    }

    fn slot(&self, field: VehicleField) -> &Option<String> {
        match field {
            VehicleField::Plate => &self.plate,
            VehicleField::Brand => &self.brand,
            VehicleField::Year => &self.year,
            VehicleField::Vin => &self.vin,
        }
    }

    fn slot_mut(&mut self, field: VehicleField) -> &mut Option<String> {
        match field {
            VehicleField::Plate => &mut self.plate,
            VehicleField::Brand => &mut self.brand,
            VehicleField::Year => &mut self.year,
            VehicleField::Vin => &mut self.vin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn builder_upper_cases_every_field() {
        let info = VehicleInfo::new()
            .with_plate("abc-123")
            .with_brand("toyota")
            .with_year("2024")
            .with_vin("vin123abc");

        assert_eq!(info.plate(), Some("ABC-123"));
        assert_eq!(info.brand(), Some("TOYOTA"));
        assert_eq!(info.year(), Some("2024"));
        assert_eq!(info.vin(), Some("VIN123ABC"));
    }

    #[test]
    fn empty_input_is_unset() {
        let mut info = VehicleInfo::new().with_plate("p1");
        info.set(VehicleField::Plate, Some(""));
        assert_eq!(info.plate(), None);
        assert!(info.is_empty());
    }

    #[test]
    fn deserialization_normalizes() {
        let info: VehicleInfo =
            serde_json::from_str(r#"{"plate":"xyz-789","brand":"honda"}"#).unwrap();
        assert_eq!(info.plate(), Some("XYZ-789"));
        assert_eq!(info.brand(), Some("HONDA"));
        assert_eq!(info.year(), None);
    }

    #[test]
    fn merge_missing_keeps_existing_values() {
        let mut invoice = VehicleInfo::new().with_plate("MANUAL-1");
        let source = VehicleInfo::new().with_plate("SRC-1").with_brand("mazda");

        assert!(invoice.merge_missing(&source));
        assert_eq!(invoice.plate(), Some("MANUAL-1"));
        assert_eq!(invoice.brand(), Some("MAZDA"));
        assert!(!invoice.merge_missing(&source));
    }

    #[test]
    fn overwrite_present_replaces_only_set_fields() {
        let mut purchase = VehicleInfo::new().with_plate("OLD").with_vin("KEEP");
        let sale = VehicleInfo::new().with_plate("NEW").with_brand("kia");

        assert!(purchase.overwrite_present(&sale));
        assert_eq!(purchase.plate(), Some("NEW"));
        assert_eq!(purchase.brand(), Some("KIA"));
        assert_eq!(purchase.vin(), Some("KEEP"));
    }

    proptest! {
        #[test]
        fn stored_value_is_upper_cased_input(input in "\\PC{1,24}") {
            let mut info = VehicleInfo::new();
            let expected = input.to_uppercase();
            info.set(VehicleField::Vin, Some(&input));
            prop_assert_eq!(info.vin(), Some(expected.as_str()));
            prop_assert_eq!(VehicleInfo::normalize(&input), Some(expected));
        }
    }
}
