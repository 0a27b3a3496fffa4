//! HeadPut Face Model
//!
//! Defines the core data contracts for gesture evaluation:
//! - **Samples:** One frame of facial landmark measurements
//! - **Channels:** Named scalar signals resolved from a sample, with
//!   optional calibration baseline subtraction
//! - **Rules:** Configured mappings from a channel deviation to an actuation
//! - **Settings:** The persisted per-rule schema and the default rule set
//!
//! Everything here is plain data and pure functions; no I/O.

pub mod channel;
pub mod rule;
pub mod sample;
pub mod settings;

pub use channel::*;
pub use rule::*;
pub use sample::*;
pub use settings::*;
