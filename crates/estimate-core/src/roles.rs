use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const EDITOR: &str = "Editor";
pub const RESEARCHER: &str = "Researcher";
pub const SPECIALIST_REVIEWER: &str = "Specialist Reviewer";

/// The preset roles, in display order.
pub const CANONICAL_ROLES: [&str; 3] = [EDITOR, RESEARCHER, SPECIALIST_REVIEWER];

/// Hourly rate every preset role is pinned to.
pub const CANONICAL_RATE: f64 = 120.0;

/// Rate offered for a role the rate table does not know about.
pub const FALLBACK_RATE: f64 = 80.0;

/// Sustainable-pace ceiling for a single allocation, in hours per day.
pub const DAILY_HOURS_LIMIT: f64 = 5.0;

/// Role names used by earlier schema versions and the preset they collapse onto.
pub const LEGACY_ROLE_ALIASES: [(&str, &str); 5] = [
    ("Lead Editor", EDITOR),
    ("Editor/Researcher", EDITOR),
    ("Research Assistant", RESEARCHER),
    ("Topic Specialist", RESEARCHER),
    ("Reviewer", SPECIALIST_REVIEWER),
];

pub fn canonical_role_for(legacy: &str) -> Option<&'static str> {
    LEGACY_ROLE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == legacy)
        .map(|(_, canonical)| *canonical)
}

pub fn canonical_preset_rates() -> BTreeMap<String, f64> {
    CANONICAL_ROLES
        .iter()
        .map(|role| (role.to_string(), CANONICAL_RATE))
        .collect()
}

/// Hourly rates keyed by role name.
///
/// `preset` holds the names the demand buckets recognise; `custom` holds
/// free-form additions that receive no demand unless a mapping names them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRates {
    #[serde(default = "canonical_preset_rates")]
    pub preset: BTreeMap<String, f64>,
    #[serde(default)]
    pub custom: BTreeMap<String, f64>,
}

impl Default for RoleRates {
    fn default() -> Self {
        Self::canonical()
    }
}

impl RoleRates {
    pub fn canonical() -> Self {
        Self {
            preset: canonical_preset_rates(),
            custom: BTreeMap::new(),
        }
    }

    pub fn rate_for(&self, role: &str) -> Option<f64> {
        self.preset
            .get(role)
            .or_else(|| self.custom.get(role))
            .copied()
    }

    pub fn default_rate_for(&self, role: &str) -> f64 {
        self.rate_for(role).unwrap_or(FALLBACK_RATE)
    }

    pub fn is_preset(&self, role: &str) -> bool {
        self.preset.contains_key(role)
    }

    pub fn knows(&self, role: &str) -> bool {
        self.rate_for(role).is_some()
    }

    /// Adds or updates a custom role. Preset names are left alone and `false` is returned.
    pub fn set_custom_rate(&mut self, role: impl Into<String>, rate: f64) -> bool {
        let role = role.into();
        if self.is_preset(&role) {
            return false;
        }
        self.custom.insert(role, rate.max(0.0));
        true
    }

    pub fn remove_custom_rate(&mut self, role: &str) -> bool {
        self.custom.remove(role).is_some()
    }

    /// Resets the preset table to the canonical names and rates.
    /// Returns whether anything had drifted.
    pub fn reassert_canonical(&mut self) -> bool {
        let canonical = canonical_preset_rates();
        if self.preset == canonical {
            return false;
        }
        self.preset = canonical;
        true
    }

    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.preset.keys().chain(self.custom.keys()).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_aliases_resolve_to_presets() {
        assert_eq!(canonical_role_for("Lead Editor"), Some(EDITOR));
        assert_eq!(canonical_role_for("Topic Specialist"), Some(RESEARCHER));
        assert_eq!(canonical_role_for("Reviewer"), Some(SPECIALIST_REVIEWER));
        assert_eq!(canonical_role_for("Editor"), None);
    }

    #[test]
    fn preset_names_cannot_become_custom() {
        let mut rates = RoleRates::canonical();
        assert!(!rates.set_custom_rate(EDITOR, 10.0));
        assert_eq!(rates.rate_for(EDITOR), Some(CANONICAL_RATE));

        assert!(rates.set_custom_rate("Illustrator", 95.0));
        assert_eq!(rates.rate_for("Illustrator"), Some(95.0));
        assert_eq!(rates.default_rate_for("Translator"), FALLBACK_RATE);
    }

    #[test]
    fn reassert_reports_drift() {
        let mut rates = RoleRates::canonical();
        assert!(!rates.reassert_canonical());
        rates.preset.insert(EDITOR.into(), 150.0);
        rates.preset.insert("Lead Editor".into(), 120.0);
        assert!(rates.reassert_canonical());
        assert_eq!(rates.preset, canonical_preset_rates());
    }
}
