//! Rule settings sources and the file-backed settings manager.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use headput_common::error::{HeadputError, HeadputResult};
use headput_face_model::{
    backfill_defaults, default_settings, rule_set_from_settings, ActuationKind, Direction,
    MovementSetting, RuleSet, SettingsMap,
};

/// Where the engine reads its rules from on construction and on refresh.
pub trait SettingsSource: Send {
    /// Re-read the rule set. Never fails; a broken source yields defaults.
    fn load_rules(&mut self) -> RuleSet;
}

/// A fixed rule set that can be swapped out between refreshes.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    rules: RuleSet,
}

impl StaticSettings {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn defaults() -> Self {
        Self::new(rule_set_from_settings(&default_settings()))
    }

    pub fn set_rules(&mut self, rules: RuleSet) {
        self.rules = rules;
    }

    pub fn rules_mut(&mut self) -> &mut RuleSet {
        &mut self.rules
    }
}

impl SettingsSource for StaticSettings {
    fn load_rules(&mut self) -> RuleSet {
        self.rules.clone()
    }
}

impl<S: SettingsSource> SettingsSource for Arc<Mutex<S>> {
    fn load_rules(&mut self) -> RuleSet {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .load_rules()
    }
}

/// What [`SettingsManager::load`] found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file was read and already had every default rule.
    Loaded,
    /// Missing default rules were added and the file was rewritten.
    Backfilled { added: usize },
    /// No file existed; defaults were written.
    Created,
    /// The file could not be read or parsed; defaults are in use and the
    /// file was left untouched.
    Fallback,
}

/// One typed field change for [`SettingsManager::update_setting`].
#[derive(Debug, Clone, PartialEq)]
pub enum SettingUpdate {
    Key(String),
    Threshold(f64),
    Sensitivity(f64),
    Coordinate(String),
    Direction(Direction),
    Enabled(bool),
    Continuous(bool),
    MouseActionType(ActuationKind),
    DisplayName(String),
    InstructionImage(String),
}

impl SettingUpdate {
    /// Parse a persisted field name and a textual value.
    pub fn parse(field: &str, value: &str) -> HeadputResult<Self> {
        let update = match field.to_ascii_lowercase().as_str() {
            "key" => SettingUpdate::Key(value.to_string()),
            "threshold" => SettingUpdate::Threshold(parse_number(field, value)?),
            "sensitivity" => SettingUpdate::Sensitivity(parse_number(field, value)?),
            "coordinate" => SettingUpdate::Coordinate(value.to_string()),
            "direction" => SettingUpdate::Direction(match value.to_ascii_lowercase().as_str() {
                "positive" => Direction::Positive,
                "negative" => Direction::Negative,
                _ => {
                    return Err(HeadputError::settings(format!(
                        "Direction must be Positive or Negative, got '{value}'"
                    )))
                }
            }),
            "enabled" => SettingUpdate::Enabled(parse_bool(field, value)?),
            "continuous" => SettingUpdate::Continuous(parse_bool(field, value)?),
            "mouseactiontype" => SettingUpdate::MouseActionType(
                ActuationKind::from_setting_name(value).ok_or_else(|| {
                    HeadputError::settings(format!("Unknown mouse action type '{value}'"))
                })?,
            ),
            "displayname" => SettingUpdate::DisplayName(value.to_string()),
            "instructionimage" => SettingUpdate::InstructionImage(value.to_string()),
            _ => return Err(HeadputError::settings(format!("Unknown setting field '{field}'"))),
        };
        Ok(update)
    }

    pub fn apply(&self, setting: &mut MovementSetting) {
        match self {
            SettingUpdate::Key(key) => setting.key = key.clone(),
            SettingUpdate::Threshold(threshold) => setting.threshold = *threshold,
            SettingUpdate::Sensitivity(sensitivity) => setting.sensitivity = *sensitivity,
            SettingUpdate::Coordinate(coordinate) => setting.coordinate = coordinate.clone(),
            SettingUpdate::Direction(direction) => setting.direction = *direction,
            SettingUpdate::Enabled(enabled) => setting.enabled = *enabled,
            SettingUpdate::Continuous(continuous) => setting.continuous = *continuous,
            SettingUpdate::MouseActionType(kind) => setting.mouse_action_type = *kind,
            SettingUpdate::DisplayName(name) => setting.display_name = name.clone(),
            SettingUpdate::InstructionImage(image) => setting.instruction_image = image.clone(),
        }
    }
}

fn parse_number(field: &str, value: &str) -> HeadputResult<f64> {
    let number: f64 = value
        .trim()
        .parse()
        .map_err(|_| HeadputError::settings(format!("{field} must be a number, got '{value}'")))?;
    if !number.is_finite() {
        return Err(HeadputError::settings(format!("{field} must be finite")));
    }
    Ok(number)
}

fn parse_bool(field: &str, value: &str) -> HeadputResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(HeadputError::settings(format!(
            "{field} must be true or false, got '{value}'"
        ))),
    }
}

/// Persisted per-rule settings with additive migration from the defaults.
#[derive(Debug, Clone)]
pub struct SettingsManager {
    path: PathBuf,
    settings: SettingsMap,
}

impl SettingsManager {
    /// Open the settings file at `path`, loading it immediately.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut manager = Self {
            path: path.into(),
            settings: default_settings(),
        };
        manager.load();
        manager
    }

    /// Re-read the settings file.
    ///
    /// The manager always ends up with a usable mapping: a missing file is
    /// created from defaults, a malformed one is replaced in memory only.
    pub fn load(&mut self) -> LoadOutcome {
        if !self.path.exists() {
            self.settings = default_settings();
            if let Err(e) = self.save() {
                tracing::warn!(error = %e, path = %self.path.display(), "Failed to write default settings");
            }
            tracing::info!(path = %self.path.display(), "Created default settings");
            return LoadOutcome::Created;
        }

        let parsed = std::fs::read_to_string(&self.path)
            .map_err(HeadputError::from)
            .and_then(|content| serde_json::from_str::<SettingsMap>(&content).map_err(HeadputError::from));

        let mut settings = match parsed {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, path = %self.path.display(), "Failed to load settings, using defaults");
                self.settings = default_settings();
                return LoadOutcome::Fallback;
            }
        };

        let added = backfill_defaults(&mut settings);
        self.settings = settings;
        if added == 0 {
            tracing::debug!(rules = self.settings.len(), "Loaded settings");
            return LoadOutcome::Loaded;
        }

        tracing::info!(added, "Added missing default rules to settings");
        if let Err(e) = self.save() {
            tracing::warn!(error = %e, path = %self.path.display(), "Failed to persist backfilled settings");
        }
        LoadOutcome::Backfilled { added }
    }

    /// Write the current mapping to the settings file.
    pub fn save(&self) -> HeadputResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.settings)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn all_settings(&self) -> &SettingsMap {
        &self.settings
    }

    pub fn get_setting(&self, name: &str) -> Option<&MovementSetting> {
        self.settings.get(name)
    }

    /// Apply one field change and persist it.
    ///
    /// Returns `Ok(false)` without saving when no rule is named `name`.
    pub fn update_setting(&mut self, name: &str, update: SettingUpdate) -> HeadputResult<bool> {
        let Some(setting) = self.settings.get_mut(name) else {
            tracing::debug!(rule = %name, "Ignoring update for unknown rule");
            return Ok(false);
        };
        update.apply(setting);
        self.save()?;
        Ok(true)
    }

    pub fn reset_to_defaults(&mut self) -> HeadputResult<()> {
        self.settings = default_settings();
        self.save()
    }

    pub fn rules(&self) -> RuleSet {
        rule_set_from_settings(&self.settings)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsSource for SettingsManager {
    fn load_rules(&mut self) -> RuleSet {
        self.load();
        self.rules()
    }
}
