//! Runtime configuration for linking, purchasing wizards and exports.

use tracing::warn;

use orderlink_purchasing::PurchaseState;

/// Knobs shared by the order book and its wizards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Stable party key of the catch-all vendor.
    pub generic_vendor_key: String,
    /// Display name used when the catch-all vendor has to be created.
    pub generic_vendor_name: String,
    /// Initial state filter of the purchase-linking wizard (`None` = any state).
    pub link_state_filter: Option<PurchaseState>,
    /// Business days between purchase confirmation and its deadline.
    pub deadline_business_days: u32,
    /// Purchase-creation wizard: one purchase order per vendor.
    pub group_by_vendor: bool,
    /// Purchase-creation wizard: buy only what is still pending.
    pub only_missing: bool,
    /// URL prefix of the spreadsheet export endpoint.
    pub export_url_base: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            generic_vendor_key: "generic_vendor".to_string(),
            generic_vendor_name: "GENERIC VENDOR".to_string(),
            link_state_filter: Some(PurchaseState::Purchase),
            deadline_business_days: 10,
            group_by_vendor: true,
            only_missing: true,
            export_url_base: "/web/content/export/liquidation".to_string(),
        }
    }
}

impl LinkConfig {
    /// Defaults overridden by `ORDERLINK_*` environment variables.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(key) = lookup("ORDERLINK_GENERIC_VENDOR_KEY").filter(|v| !v.trim().is_empty()) {
            config.generic_vendor_key = key;
        }
        if let Some(name) = lookup("ORDERLINK_GENERIC_VENDOR_NAME").filter(|v| !v.trim().is_empty()) {
            config.generic_vendor_name = name;
        }
        if let Some(raw) = lookup("ORDERLINK_LINK_STATE") {
            match parse_state_filter(&raw) {
                Some(filter) => config.link_state_filter = filter,
                None => warn!(value = %raw, "ignoring unknown ORDERLINK_LINK_STATE"),
            }
        }
        if let Some(raw) = lookup("ORDERLINK_DEADLINE_DAYS") {
            match raw.trim().parse::<u32>() {
                Ok(days) => config.deadline_business_days = days,
                Err(_) => warn!(value = %raw, "ignoring invalid ORDERLINK_DEADLINE_DAYS"),
            }
        }
        if let Some(raw) = lookup("ORDERLINK_GROUP_BY_VENDOR") {
            match raw.trim().parse::<bool>() {
                Ok(flag) => config.group_by_vendor = flag,
                Err(_) => warn!(value = %raw, "ignoring invalid ORDERLINK_GROUP_BY_VENDOR"),
            }
        }
        if let Some(raw) = lookup("ORDERLINK_ONLY_MISSING") {
            match raw.trim().parse::<bool>() {
                Ok(flag) => config.only_missing = flag,
                Err(_) => warn!(value = %raw, "ignoring invalid ORDERLINK_ONLY_MISSING"),
            }
        }
        if let Some(base) = lookup("ORDERLINK_EXPORT_URL_BASE").filter(|v| !v.trim().is_empty()) {
            config.export_url_base = base.trim_end_matches('/').to_string();
        }

        config
    }

    pub fn with_generic_vendor(mut self, key: impl Into<String>, name: impl Into<String>) -> Self {
        self.generic_vendor_key = key.into();
        self.generic_vendor_name = name.into();
        self
    }

    pub fn with_link_state_filter(mut self, filter: Option<PurchaseState>) -> Self {
        self.link_state_filter = filter;
        self
    }

    pub fn with_deadline_business_days(mut self, days: u32) -> Self {
        self.deadline_business_days = days;
        self
    }

    pub fn with_group_by_vendor(mut self, group: bool) -> Self {
        self.group_by_vendor = group;
        self
    }

    pub fn with_only_missing(mut self, only_missing: bool) -> Self {
        self.only_missing = only_missing;
        self
    }

    pub fn with_export_url_base(mut self, base: impl Into<String>) -> Self {
        self.export_url_base = base.into();
        self
    }
}

/// `"any"` means no filter; otherwise a purchase state name.
fn parse_state_filter(raw: &str) -> Option<Option<PurchaseState>> {
    let value = raw.trim().to_ascii_lowercase();
    if value == "any" || value.is_empty() {
        return Some(None);
    }
    [
        PurchaseState::Draft,
        PurchaseState::Sent,
        PurchaseState::ToApprove,
        PurchaseState::Purchase,
        PurchaseState::Done,
        PurchaseState::Cancel,
    ]
    .into_iter()
    .find(|s| s.as_str() == value)
    .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_wizard_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.link_state_filter, Some(PurchaseState::Purchase));
        assert!(config.group_by_vendor);
        assert!(config.only_missing);
        assert_eq!(config.deadline_business_days, 10);
        assert_eq!(config.generic_vendor_key, "generic_vendor");
    }

    #[test]
    fn env_overrides_are_applied() {
        let config = LinkConfig::from_lookup(lookup_from(&[
            ("ORDERLINK_LINK_STATE", "any"),
            ("ORDERLINK_DEADLINE_DAYS", "5"),
            ("ORDERLINK_GROUP_BY_VENDOR", "false"),
            ("ORDERLINK_EXPORT_URL_BASE", "/export/"),
        ]));

        assert_eq!(config.link_state_filter, None);
        assert_eq!(config.deadline_business_days, 5);
        assert!(!config.group_by_vendor);
        assert!(config.only_missing);
        assert_eq!(config.export_url_base, "/export");
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let config = LinkConfig::from_lookup(lookup_from(&[
            ("ORDERLINK_LINK_STATE", "shipped"),
            ("ORDERLINK_DEADLINE_DAYS", "ten"),
            ("ORDERLINK_ONLY_MISSING", "maybe"),
        ]));

        assert_eq!(config, LinkConfig::default());
    }

    #[test]
    fn state_filter_accepts_snake_case_names() {
        let config = LinkConfig::from_lookup(lookup_from(&[("ORDERLINK_LINK_STATE", "to_approve")]));
        assert_eq!(config.link_state_filter, Some(PurchaseState::ToApprove));
    }
}
