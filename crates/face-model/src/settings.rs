//! Persisted per-rule settings schema and the default rule set.
//!
//! The settings file is a JSON object mapping rule name to a
//! [`MovementSetting`]. Field names are PascalCase. Fields this version does
//! not know about are carried through load/save untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rule::{ActuationKind, Direction, GestureRule, RuleSet};

/// Rule name → persisted setting.
pub type SettingsMap = BTreeMap<String, MovementSetting>;

/// One persisted rule entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MovementSetting {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
    /// Channel name.
    #[serde(default)]
    pub coordinate: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub continuous: bool,
    #[serde(default)]
    pub mouse_action_type: ActuationKind,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub instruction_image: String,

    /// Unrecognised fields, preserved on save.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_sensitivity() -> f64 {
    1.0
}

fn default_enabled() -> bool {
    true
}

impl MovementSetting {
    /// Build the runtime rule for this entry.
    ///
    /// A negative threshold is read as its magnitude.
    pub fn to_rule(&self, name: &str) -> GestureRule {
        if self.threshold < 0.0 {
            tracing::warn!(
                rule = %name,
                threshold = self.threshold,
                "Negative threshold, using its magnitude"
            );
        }
        GestureRule {
            name: name.to_string(),
            source_channel: self.coordinate.clone(),
            direction: self.direction,
            threshold: self.threshold.abs(),
            sensitivity: self.sensitivity,
            enabled: self.enabled,
            continuous: self.continuous,
            actuation: self.mouse_action_type,
            bound_key: self.key.clone(),
            display_name: if self.display_name.is_empty() {
                name.to_string()
            } else {
                self.display_name.clone()
            },
            illustration_ref: self.instruction_image.clone(),
        }
    }

    /// Persisted form of a runtime rule.
    pub fn from_rule(rule: &GestureRule) -> Self {
        Self {
            key: rule.bound_key.clone(),
            threshold: rule.threshold,
            sensitivity: rule.sensitivity,
            coordinate: rule.source_channel.clone(),
            direction: rule.direction,
            enabled: rule.enabled,
            continuous: rule.continuous,
            mouse_action_type: rule.actuation,
            display_name: rule.display_name.clone(),
            instruction_image: rule.illustration_ref.clone(),
            extra: BTreeMap::new(),
        }
    }
}

/// Build the runtime rule set from persisted settings.
pub fn rule_set_from_settings(settings: &SettingsMap) -> RuleSet {
    settings
        .iter()
        .map(|(name, setting)| setting.to_rule(name))
        .collect()
}

/// Add every default rule missing from `settings`.
///
/// Existing entries, including names this version does not ship, are left
/// alone. Returns how many entries were added.
pub fn backfill_defaults(settings: &mut SettingsMap) -> usize {
    let mut added = 0;
    for (name, setting) in default_settings() {
        if !settings.contains_key(&name) {
            settings.insert(name, setting);
            added += 1;
        }
    }
    added
}

/// The shipped rule set.
pub fn default_settings() -> SettingsMap {
    let mut settings = SettingsMap::new();
    let mut add = |name: &str,
                   key: &str,
                   coordinate: &str,
                   direction: Direction,
                   threshold: f64,
                   sensitivity: f64,
                   continuous: bool,
                   display_name: &str| {
        settings.insert(
            name.to_string(),
            MovementSetting {
                key: key.to_string(),
                threshold,
                sensitivity,
                coordinate: coordinate.to_string(),
                direction,
                enabled: true,
                continuous,
                mouse_action_type: ActuationKind::Key,
                display_name: display_name.to_string(),
                instruction_image: format!("Assets/Instructions/{name}.png"),
                extra: BTreeMap::new(),
            },
        );
    };

    add("HeadTiltLeft", "Q", "Roll", Direction::Negative, 10.0, 0.5, true, "Tilt Head Left");
    add("HeadTiltRight", "E", "Roll", Direction::Positive, 10.0, 0.5, true, "Tilt Head Right");
    add("MouthOpen", "Space", "MouthHeight", Direction::Positive, 0.1, 0.5, false, "Open Mouth");
    add("MouthWide", "Enter", "MouthWidth", Direction::Positive, 0.3, 2.0, false, "Widen Mouth");
    add("HeadLeft", "Left", "HeadRotation", Direction::Negative, 20.0, 1.0, true, "Turn Head Left");
    add("HeadRight", "Right", "HeadRotation", Direction::Positive, 20.0, 1.0, true, "Turn Head Right");

    settings
}
