//! HeadPut Gesture Engine
//!
//! Consumes a stream of measurement samples and drives an actuator:
//! - **Engine:** calibration lifecycle, per-rule activation, two-pass
//!   trigger/release evaluation, scheduled release of discrete presses
//! - **Timeout:** watchdog that releases everything when input goes stale
//! - **Settings:** rule sources, including the file-backed settings manager
//! - **Service:** the engine behind a mutex with its background ticks
//!
//! `process` never fails: bad rules and bad samples degrade to inactive
//! rules for that frame.

pub mod engine;
pub mod service;
pub mod settings;
pub mod timeout;

pub use engine::{CalibrationState, GestureEngine, RuleActivationState};
pub use service::{GestureHandle, GestureService};
pub use settings::{LoadOutcome, SettingUpdate, SettingsManager, SettingsSource, StaticSettings};
pub use timeout::InputTimeoutMonitor;
