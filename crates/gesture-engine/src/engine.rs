//! The per-sample gesture state machine.
//!
//! Each call to [`GestureEngine::process`] runs two passes over the rule
//! set. The first resolves every enabled rule and fires its actuation; the
//! second issues a key release for every rule left inactive. Releases are
//! idempotent at the actuator, so the second pass guarantees a key never
//! stays down after its rule stops matching, whatever happened in between.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use headput_actuator::{Actuator, KeyCode, MouseButton};
use headput_common::config::EngineConfig;
use headput_face_model::{
    ActuationKind, Channel, ChannelResolver, GestureRule, MeasurementSample, RuleSet,
};

use crate::settings::SettingsSource;

/// Calibration lifecycle of an engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    /// No sample seen yet.
    Uncalibrated,
    /// Counting warm-up samples after the first frame.
    Calibrating { seen: u32 },
    /// A baseline is in use.
    Calibrated,
}

/// Per-rule activation state, reset whenever the rule set changes shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleActivationState {
    pub active: bool,
    /// Last value the rule produced (signed, sensitivity-scaled).
    pub last_adjusted: f64,
}

#[derive(Debug, Clone)]
struct LoadedRule {
    rule: GestureRule,
    channel: Option<Channel>,
}

impl LoadedRule {
    fn new(rule: GestureRule) -> Self {
        let channel = rule.channel();
        if channel.is_none() {
            tracing::warn!(
                rule = %rule.name,
                channel = %rule.source_channel,
                "Unknown channel, rule will never trigger"
            );
        }
        if rule.actuation == ActuationKind::Key && KeyCode::parse(&rule.bound_key).is_none() {
            tracing::warn!(rule = %rule.name, key = %rule.bound_key, "Unknown key, rule will not press anything");
        }
        Self { rule, channel }
    }

    fn releases_key(&self) -> bool {
        self.rule.actuation == ActuationKind::Key && !self.rule.bound_key.is_empty()
    }
}

#[derive(Debug, Clone)]
struct PendingRelease {
    key: String,
    owner: String,
    due: Instant,
}

/// Stateful evaluator turning samples into actuation calls.
pub struct GestureEngine {
    config: EngineConfig,
    actuator: Box<dyn Actuator>,
    settings: Box<dyn SettingsSource>,
    resolver: ChannelResolver,
    rules: Vec<LoadedRule>,
    states: BTreeMap<String, RuleActivationState>,
    calibration: CalibrationState,
    recalibrate_next: bool,
    previous: Option<MeasurementSample>,
    pending_releases: Vec<PendingRelease>,
    last_sample_at: Option<Instant>,
    input_active: bool,
    paused: bool,
    frames: u64,
}

impl GestureEngine {
    /// Create an engine, loading its rules from `settings`.
    pub fn new(
        config: EngineConfig,
        actuator: Box<dyn Actuator>,
        mut settings: Box<dyn SettingsSource>,
    ) -> Self {
        let rules = settings.load_rules();
        let resolver = ChannelResolver::new(config.suppression);
        let mut engine = Self {
            config,
            actuator,
            settings,
            resolver,
            rules: Vec::new(),
            states: BTreeMap::new(),
            calibration: CalibrationState::Uncalibrated,
            recalibrate_next: false,
            previous: None,
            pending_releases: Vec::new(),
            last_sample_at: None,
            input_active: false,
            paused: false,
            frames: 0,
        };
        engine.install_rules(rules);
        tracing::info!(
            rules = engine.rules.len(),
            actuator = %engine.actuator.name(),
            warmup = engine.config.warmup_samples,
            "Gesture engine ready"
        );
        engine
    }

    /// Process a sample received now.
    pub fn process(&mut self, sample: &MeasurementSample) {
        self.process_at(sample, Instant::now());
    }

    /// Process a sample received at `now`.
    pub fn process_at(&mut self, sample: &MeasurementSample, now: Instant) {
        if self.paused {
            tracing::trace!("Paused, sample ignored");
            return;
        }
        self.last_sample_at = Some(now);
        if !self.input_active {
            self.input_active = true;
            tracing::info!("Input active");
        }

        if self.previous.is_none() {
            self.previous = Some(*sample);
            if self.calibration == CalibrationState::Uncalibrated {
                if self.config.warmup_samples == 0 {
                    self.calibrate(sample);
                } else {
                    self.calibration = CalibrationState::Calibrating { seen: 0 };
                }
            }
            tracing::debug!("First sample stored, skipping evaluation");
            return;
        }

        self.frames += 1;
        self.advance_calibration(sample);

        self.evaluate(sample, now);
        self.release_inactive();

        self.previous = Some(*sample);
    }

    fn advance_calibration(&mut self, sample: &MeasurementSample) {
        if self.recalibrate_next {
            if sample_is_finite(sample) {
                self.recalibrate_next = false;
                self.calibrate(sample);
            }
            return;
        }

        if let CalibrationState::Calibrating { seen } = self.calibration {
            let seen = seen.saturating_add(1);
            if seen >= self.config.warmup_samples && sample_is_finite(sample) {
                self.calibrate(sample);
            } else {
                self.calibration = CalibrationState::Calibrating { seen };
            }
        }
    }

    fn evaluate(&mut self, sample: &MeasurementSample, now: Instant) {
        let release_after = self.config.discrete_release();

        for loaded in &self.rules {
            let rule = &loaded.rule;
            let state = self.states.entry(rule.name.clone()).or_default();
            let was_active = state.active;

            if !rule.enabled {
                state.active = false;
                continue;
            }

            let value = match loaded.channel {
                Some(channel) => self.resolver.resolve_channel(sample, channel),
                None => {
                    tracing::trace!(rule = %rule.name, channel = %rule.source_channel, "Unknown channel");
                    0.0
                }
            };
            let adjusted = rule.adjust(value);
            state.last_adjusted = adjusted;

            let triggered = adjusted.is_finite() && rule.should_trigger(adjusted);
            tracing::trace!(rule = %rule.name, value, adjusted, triggered, "Evaluated rule");

            if triggered {
                fire(
                    self.actuator.as_mut(),
                    &mut self.pending_releases,
                    rule,
                    was_active,
                    adjusted,
                    now + release_after,
                );
            }
            state.active = triggered;
        }
    }

    fn release_inactive(&mut self) {
        for loaded in &self.rules {
            let active = self
                .states
                .get(&loaded.rule.name)
                .is_some_and(|state| state.active);
            if !active && loaded.releases_key() {
                self.actuator
                    .key_up(&loaded.rule.bound_key, &loaded.rule.name);
                self.pending_releases
                    .retain(|pending| pending.owner != loaded.rule.name);
            }
        }
    }

    /// Capture a new baseline from `reference`, replacing any previous one.
    pub fn calibrate(&mut self, reference: &MeasurementSample) {
        self.resolver.calibrate(reference);
        self.calibration = CalibrationState::Calibrated;
        tracing::info!(frame = self.frames, "Calibration set");
    }

    /// Calibrate against the next sample that arrives.
    pub fn request_recalibration(&mut self) {
        self.recalibrate_next = true;
        tracing::info!("Recalibration requested");
    }

    /// Re-read the rule set from the settings source.
    ///
    /// Keys held by rules that disappeared, or whose bound key or actuation
    /// changed, are released immediately. Rules that were merely disabled
    /// are released by the next processed sample.
    pub fn refresh_settings(&mut self) {
        let rules = self.settings.load_rules();

        for old in &self.rules {
            let replaced = match rules.get(&old.rule.name) {
                Some(new) => {
                    new.bound_key != old.rule.bound_key || new.actuation != old.rule.actuation
                }
                None => true,
            };
            if !replaced {
                continue;
            }
            if old.releases_key() {
                self.actuator.key_up(&old.rule.bound_key, &old.rule.name);
            }
            self.states.remove(&old.rule.name);
            self.pending_releases
                .retain(|pending| pending.owner != old.rule.name);
        }

        self.install_rules(rules);
        tracing::info!(rules = self.rules.len(), "Settings refreshed");
    }

    fn install_rules(&mut self, rules: RuleSet) {
        self.rules = rules.iter().cloned().map(LoadedRule::new).collect();
        self.states
            .retain(|name, _| rules.contains(name));
    }

    /// Release every scheduled discrete press due at or before `now`.
    /// Returns how many releases were issued.
    pub fn poll_scheduled_releases(&mut self, now: Instant) -> usize {
        if self.pending_releases.is_empty() {
            return 0;
        }
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_releases)
            .into_iter()
            .partition(|pending| pending.due <= now);
        self.pending_releases = waiting;

        for pending in &due {
            self.actuator.key_up(&pending.key, &pending.owner);
        }
        due.len()
    }

    /// Flag input as stale and release everything the actuator holds.
    pub fn mark_input_inactive(&mut self) {
        if !self.input_active {
            return;
        }
        self.input_active = false;
        self.release_everything();
        tracing::info!("Input inactive, released all keys");
    }

    /// Pause or resume tracking. Samples are ignored while paused, and
    /// entering the pause releases everything held.
    pub fn set_paused(&mut self, paused: bool) {
        if self.paused == paused {
            return;
        }
        self.paused = paused;
        if paused {
            self.input_active = false;
            self.release_everything();
            tracing::info!("Tracking paused");
        } else {
            tracing::info!("Tracking resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Release everything before the engine goes away.
    pub fn shutdown(&mut self) {
        self.release_everything();
    }

    fn release_everything(&mut self) {
        self.pending_releases.clear();
        for state in self.states.values_mut() {
            state.active = false;
        }
        self.actuator.release_all();
    }

    /// Baseline-relative value of `channel` for `sample`.
    pub fn resolve(&self, sample: &MeasurementSample, channel: Channel) -> f64 {
        self.resolver.resolve_channel(sample, channel)
    }

    pub fn calibration_state(&self) -> CalibrationState {
        self.calibration
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration == CalibrationState::Calibrated
    }

    pub fn is_active(&self, rule: &str) -> bool {
        self.states.get(rule).is_some_and(|state| state.active)
    }

    pub fn rule_state(&self, rule: &str) -> Option<&RuleActivationState> {
        self.states.get(rule)
    }

    pub fn rules(&self) -> impl Iterator<Item = &GestureRule> {
        self.rules.iter().map(|loaded| &loaded.rule)
    }

    pub fn last_sample_at(&self) -> Option<Instant> {
        self.last_sample_at
    }

    pub fn is_input_active(&self) -> bool {
        self.input_active
    }

    /// Samples evaluated so far (the first frame is not counted).
    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    pub fn pending_release_count(&self) -> usize {
        self.pending_releases.len()
    }

    pub fn discrete_release(&self) -> Duration {
        self.config.discrete_release()
    }
}

fn fire(
    actuator: &mut dyn Actuator,
    pending_releases: &mut Vec<PendingRelease>,
    rule: &GestureRule,
    was_active: bool,
    adjusted: f64,
    release_at: Instant,
) {
    match rule.actuation {
        ActuationKind::Key => {
            if rule.bound_key.is_empty() {
                return;
            }
            if rule.continuous {
                actuator.key_down(&rule.bound_key, &rule.name);
            } else if !was_active {
                actuator.key_down(&rule.bound_key, &rule.name);
                pending_releases.retain(|pending| pending.owner != rule.name);
                pending_releases.push(PendingRelease {
                    key: rule.bound_key.clone(),
                    owner: rule.name.clone(),
                    due: release_at,
                });
            }
        }
        ActuationKind::MouseMoveX | ActuationKind::MouseMoveY | ActuationKind::MouseScroll => {
            let Some(amount) = mouse_amount(adjusted * rule.sensitivity) else {
                return;
            };
            match rule.actuation {
                ActuationKind::MouseMoveX => actuator.move_mouse_relative(amount, 0),
                ActuationKind::MouseMoveY => actuator.move_mouse_relative(0, amount),
                _ => actuator.scroll_mouse(amount),
            }
        }
        ActuationKind::MouseLeftClick | ActuationKind::MouseRightClick => {
            if was_active {
                return;
            }
            let button = MouseButton::from_is_right(rule.actuation == ActuationKind::MouseRightClick);
            actuator.mouse_button_down(button);
            actuator.mouse_button_up(button);
        }
    }
}

fn mouse_amount(scaled: f64) -> Option<i32> {
    if !scaled.is_finite() {
        return None;
    }
    Some(scaled.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32)
}

fn sample_is_finite(sample: &MeasurementSample) -> bool {
    Channel::ALL
        .iter()
        .filter(|channel| !channel.is_derived())
        .all(|channel| channel.value(sample, &Default::default()).is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::StaticSettings;
    use headput_actuator::{ActuationCommand, RecordingActuator};
    use headput_face_model::Direction;

    fn engine_with(rules: Vec<GestureRule>) -> (GestureEngine, RecordingActuator) {
        let recorder = RecordingActuator::new();
        let engine = GestureEngine::new(
            EngineConfig::default(),
            Box::new(recorder.clone()),
            Box::new(StaticSettings::new(rules.into_iter().collect())),
        );
        (engine, recorder)
    }

    fn head_x(x: f64) -> MeasurementSample {
        MeasurementSample {
            nose_x: x,
            ..Default::default()
        }
    }

    #[test]
    fn test_warmup_calibrates_after_configured_samples() {
        let (mut engine, _) = engine_with(vec![]);
        engine.process(&head_x(0.0));
        assert_eq!(engine.calibration_state(), CalibrationState::Calibrating { seen: 0 });

        for i in 1..10 {
            engine.process(&head_x(i as f64));
            assert!(!engine.is_calibrated());
        }
        engine.process(&head_x(3.0));
        assert!(engine.is_calibrated());
        assert_eq!(engine.resolve(&head_x(3.0), Channel::NoseX), 0.0);
    }

    #[test]
    fn test_zero_warmup_calibrates_on_first_sample() {
        let recorder = RecordingActuator::new();
        let config = EngineConfig {
            warmup_samples: 0,
            ..Default::default()
        };
        let mut engine = GestureEngine::new(
            config,
            Box::new(recorder),
            Box::new(StaticSettings::default()),
        );
        engine.process(&head_x(2.0));
        assert!(engine.is_calibrated());
    }

    #[test]
    fn test_recalibration_uses_next_sample() {
        let (mut engine, _) = engine_with(vec![]);
        engine.process(&head_x(0.0));
        engine.calibrate(&head_x(1.0));
        engine.request_recalibration();
        engine.process(&head_x(5.0));
        assert_eq!(engine.resolve(&head_x(5.0), Channel::NoseX), 0.0);
    }

    #[test]
    fn test_non_finite_value_counts_as_inactive() {
        let rule = GestureRule::key("Nose", "NoseX", Direction::Positive, 0.0, 1.0, "A");
        let (mut engine, recorder) = engine_with(vec![rule]);
        engine.process(&head_x(0.0));
        engine.process(&head_x(f64::NAN));
        assert!(!engine.is_active("Nose"));
        assert_eq!(recorder.count(&ActuationCommand::key_down("A", "Nose")), 0);
        assert_eq!(recorder.count(&ActuationCommand::key_up("A", "Nose")), 1);
    }

    #[test]
    fn test_mouse_move_scales_every_active_frame() {
        let rule = GestureRule::key("Pan", "NoseX", Direction::Positive, 0.5, 2.0, "")
            .with_actuation(ActuationKind::MouseMoveX);
        let (mut engine, recorder) = engine_with(vec![rule]);
        engine.process(&head_x(0.0));
        engine.process(&head_x(1.0));
        engine.process(&head_x(1.0));

        // adjusted = 1.0 * 2.0, moved by adjusted * sensitivity
        let moves = recorder.count(&ActuationCommand::MoveMouse { dx: 4, dy: 0 });
        assert_eq!(moves, 2);
    }

    #[test]
    fn test_click_fires_once_per_edge() {
        let rule = GestureRule::key("Click", "NoseX", Direction::Positive, 0.5, 1.0, "")
            .with_actuation(ActuationKind::MouseRightClick);
        let (mut engine, recorder) = engine_with(vec![rule]);
        engine.process(&head_x(0.0));
        engine.process(&head_x(1.0));
        engine.process(&head_x(1.0));
        engine.process(&head_x(0.0));
        engine.process(&head_x(1.0));

        let down = ActuationCommand::MouseButtonDown {
            button: MouseButton::Right,
        };
        let up = ActuationCommand::MouseButtonUp {
            button: MouseButton::Right,
        };
        assert_eq!(recorder.count(&down), 2);
        assert_eq!(recorder.count(&up), 2);
    }

    #[test]
    fn test_vertical_move_only_sets_dy() {
        let rule = GestureRule::key("Nod", "NoseX", Direction::Negative, 0.5, 1.0, "")
            .with_actuation(ActuationKind::MouseMoveY);
        let (mut engine, recorder) = engine_with(vec![rule]);
        engine.process(&head_x(0.0));
        engine.process(&head_x(-3.0));

        assert_eq!(
            recorder.commands(),
            vec![ActuationCommand::MoveMouse { dx: 0, dy: -3 }]
        );
    }

    #[test]
    fn test_scroll_every_active_frame() {
        let rule = GestureRule::key("Wheel", "NoseX", Direction::Positive, 0.5, 1.5, "")
            .with_actuation(ActuationKind::MouseScroll);
        let (mut engine, recorder) = engine_with(vec![rule]);
        engine.process(&head_x(0.0));
        engine.process(&head_x(2.0));
        engine.process(&head_x(2.0));
        engine.process(&head_x(0.0));

        // adjusted = 3.0, scrolled by adjusted * sensitivity
        assert_eq!(recorder.count(&ActuationCommand::Scroll { amount: 5 }), 2);
        assert_eq!(recorder.commands().len(), 2);
    }

    #[test]
    fn test_left_click_presses_and_releases_left_button() {
        let rule = GestureRule::key("Click", "NoseX", Direction::Positive, 0.5, 1.0, "")
            .with_actuation(ActuationKind::MouseLeftClick);
        let (mut engine, recorder) = engine_with(vec![rule]);
        engine.process(&head_x(0.0));
        engine.process(&head_x(1.0));
        engine.process(&head_x(1.0));

        assert_eq!(
            recorder.commands(),
            vec![
                ActuationCommand::MouseButtonDown {
                    button: MouseButton::Left
                },
                ActuationCommand::MouseButtonUp {
                    button: MouseButton::Left
                },
            ]
        );
    }

    #[test]
    fn test_discrete_press_schedules_release() {
        let rule = GestureRule::key("Open", "NoseX", Direction::Positive, 0.5, 1.0, "Space");
        let (mut engine, recorder) = engine_with(vec![rule]);
        let start = Instant::now();
        engine.process_at(&head_x(0.0), start);
        engine.process_at(&head_x(1.0), start);
        assert_eq!(engine.pending_release_count(), 1);

        assert_eq!(engine.poll_scheduled_releases(start + Duration::from_millis(49)), 0);
        assert_eq!(engine.poll_scheduled_releases(start + Duration::from_millis(50)), 1);
        assert_eq!(
            recorder.commands().last(),
            Some(&ActuationCommand::key_up("Space", "Open"))
        );
    }

    #[test]
    fn test_mark_input_inactive_releases_everything_once() {
        let rule = GestureRule::key("Tilt", "NoseX", Direction::Positive, 0.5, 1.0, "Q")
            .continuous(true);
        let (mut engine, recorder) = engine_with(vec![rule]);
        engine.process(&head_x(0.0));
        engine.process(&head_x(1.0));
        assert!(engine.is_active("Tilt"));

        engine.mark_input_inactive();
        engine.mark_input_inactive();
        assert!(!engine.is_active("Tilt"));
        assert!(!engine.is_input_active());
        assert_eq!(recorder.count(&ActuationCommand::ReleaseAll), 1);
    }

    #[test]
    fn test_paused_engine_ignores_samples() {
        let rule = GestureRule::key("Tilt", "NoseX", Direction::Positive, 0.5, 1.0, "Q")
            .continuous(true);
        let (mut engine, recorder) = engine_with(vec![rule]);
        engine.process(&head_x(0.0));
        engine.process(&head_x(1.0));

        engine.set_paused(true);
        engine.set_paused(true);
        assert!(engine.is_paused());
        assert!(!engine.is_active("Tilt"));
        assert_eq!(recorder.count(&ActuationCommand::ReleaseAll), 1);

        let frames = engine.frames_processed();
        engine.process(&head_x(1.0));
        assert_eq!(engine.frames_processed(), frames);
        assert_eq!(recorder.count(&ActuationCommand::key_down("Q", "Tilt")), 1);

        engine.set_paused(false);
        engine.process(&head_x(1.0));
        assert_eq!(recorder.count(&ActuationCommand::key_down("Q", "Tilt")), 2);
    }

    #[test]
    fn test_mouse_amount_saturates() {
        assert_eq!(mouse_amount(2.4), Some(2));
        assert_eq!(mouse_amount(-2.6), Some(-3));
        assert_eq!(mouse_amount(1e12), Some(i32::MAX));
        assert_eq!(mouse_amount(f64::INFINITY), None);
    }
}
