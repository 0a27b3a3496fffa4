//! Gesture rules: which channel deviation triggers which actuation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::channel::Channel;

/// Which side of zero counts as active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Direction {
    #[default]
    Positive,
    Negative,
}

impl Direction {
    /// Boundary-inclusive threshold test on a signed, scaled value.
    pub fn is_triggered(self, adjusted: f64, threshold: f64) -> bool {
        match self {
            Direction::Positive => adjusted >= threshold,
            Direction::Negative => adjusted <= -threshold,
        }
    }
}

/// What a rule does while active.
///
/// Persisted as the `MouseActionType` string; `"None"` means the rule drives
/// its bound key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActuationKind {
    #[default]
    Key,
    MouseMoveX,
    MouseMoveY,
    MouseLeftClick,
    MouseRightClick,
    MouseScroll,
}

impl ActuationKind {
    pub const ALL: [ActuationKind; 6] = [
        ActuationKind::Key,
        ActuationKind::MouseMoveX,
        ActuationKind::MouseMoveY,
        ActuationKind::MouseLeftClick,
        ActuationKind::MouseRightClick,
        ActuationKind::MouseScroll,
    ];

    /// Parse a persisted `MouseActionType` value.
    pub fn from_setting_name(name: &str) -> Option<Self> {
        let kind = match name {
            "None" | "" => ActuationKind::Key,
            "MoveHorizontal" => ActuationKind::MouseMoveX,
            "MoveVertical" => ActuationKind::MouseMoveY,
            "LeftClick" => ActuationKind::MouseLeftClick,
            "RightClick" => ActuationKind::MouseRightClick,
            "Scroll" => ActuationKind::MouseScroll,
            _ => return None,
        };
        Some(kind)
    }

    pub fn setting_name(self) -> &'static str {
        match self {
            ActuationKind::Key => "None",
            ActuationKind::MouseMoveX => "MoveHorizontal",
            ActuationKind::MouseMoveY => "MoveVertical",
            ActuationKind::MouseLeftClick => "LeftClick",
            ActuationKind::MouseRightClick => "RightClick",
            ActuationKind::MouseScroll => "Scroll",
        }
    }
}

impl From<String> for ActuationKind {
    fn from(value: String) -> Self {
        Self::from_setting_name(&value).unwrap_or_else(|| {
            tracing::warn!(mouse_action = %value, "Unsupported mouse action type, using key actuation");
            ActuationKind::Key
        })
    }
}

impl From<ActuationKind> for String {
    fn from(value: ActuationKind) -> Self {
        value.setting_name().to_string()
    }
}

impl fmt::Display for ActuationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.setting_name())
    }
}

/// One logical movement: a channel, a threshold, and what to actuate.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureRule {
    /// Unique rule name; also the owner id for held keys.
    pub name: String,
    /// Channel settings name, e.g. `"MouthHeight"`.
    pub source_channel: String,
    pub direction: Direction,
    /// Non-negative magnitude the scaled value must reach.
    pub threshold: f64,
    /// Multiplier applied to the baseline-relative value.
    pub sensitivity: f64,
    pub enabled: bool,
    /// Key rules only: re-send key-down every active frame.
    pub continuous: bool,
    pub actuation: ActuationKind,
    /// Key name for [`ActuationKind::Key`] rules.
    pub bound_key: String,
    pub display_name: String,
    pub illustration_ref: String,
}

impl GestureRule {
    /// A key rule with default presentation fields.
    pub fn key(
        name: impl Into<String>,
        source_channel: impl Into<String>,
        direction: Direction,
        threshold: f64,
        sensitivity: f64,
        bound_key: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            source_channel: source_channel.into(),
            direction,
            threshold,
            sensitivity,
            enabled: true,
            continuous: false,
            actuation: ActuationKind::Key,
            bound_key: bound_key.into(),
            illustration_ref: String::new(),
        }
    }

    pub fn continuous(mut self, continuous: bool) -> Self {
        self.continuous = continuous;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_actuation(mut self, actuation: ActuationKind) -> Self {
        self.actuation = actuation;
        self
    }

    /// Channel this rule reads, if the name is known.
    pub fn channel(&self) -> Option<Channel> {
        Channel::from_name(&self.source_channel)
    }

    /// Scale a resolved channel value by this rule's sensitivity.
    pub fn adjust(&self, value: f64) -> f64 {
        value * self.sensitivity
    }

    /// Whether a scaled value activates this rule.
    pub fn should_trigger(&self, adjusted: f64) -> bool {
        self.direction.is_triggered(adjusted, self.threshold)
    }
}

/// Rules keyed by unique name, iterated in name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: BTreeMap<String, GestureRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a rule, replacing any rule with the same name.
    pub fn insert(&mut self, rule: GestureRule) -> Option<GestureRule> {
        self.rules.insert(rule.name.clone(), rule)
    }

    pub fn get(&self, name: &str) -> Option<&GestureRule> {
        self.rules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GestureRule> {
        self.rules.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<GestureRule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = GestureRule>>(iter: I) -> Self {
        let mut set = RuleSet::new();
        for rule in iter {
            set.insert(rule);
        }
        set
    }
}
