//! Named channels, calibration baselines, and channel resolution.
//!
//! Every channel name a rule may reference maps to an accessor through a
//! `match`, and baseline offsets live in a fixed array indexed by channel,
//! so resolution costs the same for every frame and every rule.

use std::fmt;

use headput_common::config::SuppressionConfig;

use crate::sample::MeasurementSample;

/// A named scalar signal read from a [`MeasurementSample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    NoseX,
    NoseY,
    NoseZ,
    LeftEyeCornerY,
    RightEyeCornerY,
    LeftEyeCornerZ,
    RightEyeCornerZ,
    LeftEyebrowY,
    RightEyebrowY,
    LeftEyeSocketY,
    RightEyeSocketY,
    MouthTopY,
    MouthBottomY,
    MouthLeftX,
    MouthRightX,
    LeftEarZ,
    RightEarZ,
    ForeheadZ,
    ChinZ,
    MouthHeight,
    MouthWidth,
    LeftEyebrowHeight,
    RightEyebrowHeight,
    Roll,
    HeadRotation,
    HeadPitch,
}

impl Channel {
    pub const COUNT: usize = 26;

    pub const ALL: [Channel; Channel::COUNT] = [
        Channel::NoseX,
        Channel::NoseY,
        Channel::NoseZ,
        Channel::LeftEyeCornerY,
        Channel::RightEyeCornerY,
        Channel::LeftEyeCornerZ,
        Channel::RightEyeCornerZ,
        Channel::LeftEyebrowY,
        Channel::RightEyebrowY,
        Channel::LeftEyeSocketY,
        Channel::RightEyeSocketY,
        Channel::MouthTopY,
        Channel::MouthBottomY,
        Channel::MouthLeftX,
        Channel::MouthRightX,
        Channel::LeftEarZ,
        Channel::RightEarZ,
        Channel::ForeheadZ,
        Channel::ChinZ,
        Channel::MouthHeight,
        Channel::MouthWidth,
        Channel::LeftEyebrowHeight,
        Channel::RightEyebrowHeight,
        Channel::Roll,
        Channel::HeadRotation,
        Channel::HeadPitch,
    ];

    /// Look up a channel by the name used in rule settings.
    ///
    /// Raw channels accept their wire names; `lEarX`/`rEarX` are accepted
    /// as aliases for the ear depths because older settings files use them.
    pub fn from_name(name: &str) -> Option<Channel> {
        let channel = match name {
            "NoseX" | "X" => Channel::NoseX,
            "NoseY" | "Y" => Channel::NoseY,
            "NoseZ" | "Z" => Channel::NoseZ,
            "lEyeCornerY" => Channel::LeftEyeCornerY,
            "rEyeCornerY" => Channel::RightEyeCornerY,
            "lEyeCornerZ" => Channel::LeftEyeCornerZ,
            "rEyeCornerZ" => Channel::RightEyeCornerZ,
            "lEyebrowY" => Channel::LeftEyebrowY,
            "rEyebrowY" => Channel::RightEyebrowY,
            "lEyesocketY" => Channel::LeftEyeSocketY,
            "rEyesocketY" => Channel::RightEyeSocketY,
            "MouthTopY" => Channel::MouthTopY,
            "MouthBotY" => Channel::MouthBottomY,
            "MouthLX" => Channel::MouthLeftX,
            "MouthRX" => Channel::MouthRightX,
            "lEarZ" | "lEarX" => Channel::LeftEarZ,
            "rEarZ" | "rEarX" => Channel::RightEarZ,
            "ForeheadZ" => Channel::ForeheadZ,
            "ChinZ" => Channel::ChinZ,
            "MouthHeight" => Channel::MouthHeight,
            "MouthWidth" => Channel::MouthWidth,
            "LeftEyebrowHeight" => Channel::LeftEyebrowHeight,
            "RightEyebrowHeight" => Channel::RightEyebrowHeight,
            "Roll" => Channel::Roll,
            "HeadRotation" => Channel::HeadRotation,
            "HeadPitch" => Channel::HeadPitch,
            _ => return None,
        };
        Some(channel)
    }

    /// Canonical settings name.
    pub fn name(self) -> &'static str {
        match self {
            Channel::NoseX => "NoseX",
            Channel::NoseY => "NoseY",
            Channel::NoseZ => "NoseZ",
            Channel::LeftEyeCornerY => "lEyeCornerY",
            Channel::RightEyeCornerY => "rEyeCornerY",
            Channel::LeftEyeCornerZ => "lEyeCornerZ",
            Channel::RightEyeCornerZ => "rEyeCornerZ",
            Channel::LeftEyebrowY => "lEyebrowY",
            Channel::RightEyebrowY => "rEyebrowY",
            Channel::LeftEyeSocketY => "lEyesocketY",
            Channel::RightEyeSocketY => "rEyesocketY",
            Channel::MouthTopY => "MouthTopY",
            Channel::MouthBottomY => "MouthBotY",
            Channel::MouthLeftX => "MouthLX",
            Channel::MouthRightX => "MouthRX",
            Channel::LeftEarZ => "lEarZ",
            Channel::RightEarZ => "rEarZ",
            Channel::ForeheadZ => "ForeheadZ",
            Channel::ChinZ => "ChinZ",
            Channel::MouthHeight => "MouthHeight",
            Channel::MouthWidth => "MouthWidth",
            Channel::LeftEyebrowHeight => "LeftEyebrowHeight",
            Channel::RightEyebrowHeight => "RightEyebrowHeight",
            Channel::Roll => "Roll",
            Channel::HeadRotation => "HeadRotation",
            Channel::HeadPitch => "HeadPitch",
        }
    }

    /// Whether this channel is computed from other fields.
    pub fn is_derived(self) -> bool {
        matches!(
            self,
            Channel::MouthHeight
                | Channel::MouthWidth
                | Channel::LeftEyebrowHeight
                | Channel::RightEyebrowHeight
                | Channel::Roll
                | Channel::HeadRotation
                | Channel::HeadPitch
        )
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Uncalibrated value of this channel on `sample`.
    pub fn value(self, sample: &MeasurementSample, suppression: &SuppressionConfig) -> f64 {
        match self {
            Channel::NoseX => sample.nose_x,
            Channel::NoseY => sample.nose_y,
            Channel::NoseZ => sample.nose_z,
            Channel::LeftEyeCornerY => sample.left_eye_corner_y,
            Channel::RightEyeCornerY => sample.right_eye_corner_y,
            Channel::LeftEyeCornerZ => sample.left_eye_corner_z,
            Channel::RightEyeCornerZ => sample.right_eye_corner_z,
            Channel::LeftEyebrowY => sample.left_eyebrow_y,
            Channel::RightEyebrowY => sample.right_eyebrow_y,
            Channel::LeftEyeSocketY => sample.left_eye_socket_y,
            Channel::RightEyeSocketY => sample.right_eye_socket_y,
            Channel::MouthTopY => sample.mouth_top_y,
            Channel::MouthBottomY => sample.mouth_bottom_y,
            Channel::MouthLeftX => sample.mouth_left_x,
            Channel::MouthRightX => sample.mouth_right_x,
            Channel::LeftEarZ => sample.left_ear_z,
            Channel::RightEarZ => sample.right_ear_z,
            Channel::ForeheadZ => sample.forehead_z,
            Channel::ChinZ => sample.chin_z,
            Channel::MouthHeight => sample.mouth_height(),
            Channel::MouthWidth => sample.mouth_width(),
            Channel::LeftEyebrowHeight => sample.left_eyebrow_height(),
            Channel::RightEyebrowHeight => sample.right_eyebrow_height(),
            Channel::Roll => sample.roll(suppression),
            Channel::HeadRotation => sample.head_rotation(suppression),
            Channel::HeadPitch => sample.head_pitch(),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-channel neutral values captured from one reference sample.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationBaseline {
    offsets: [f64; Channel::COUNT],
}

impl CalibrationBaseline {
    /// Snapshot every channel of `reference`.
    pub fn capture(reference: &MeasurementSample, suppression: &SuppressionConfig) -> Self {
        let mut offsets = [0.0; Channel::COUNT];
        for channel in Channel::ALL {
            offsets[channel.index()] = channel.value(reference, suppression);
        }
        Self { offsets }
    }

    pub fn offset(&self, channel: Channel) -> f64 {
        self.offsets[channel.index()]
    }
}

/// Resolves channel values, subtracting the calibration baseline once one
/// has been captured.
#[derive(Debug, Clone)]
pub struct ChannelResolver {
    suppression: SuppressionConfig,
    baseline: Option<CalibrationBaseline>,
}

impl ChannelResolver {
    pub fn new(suppression: SuppressionConfig) -> Self {
        Self {
            suppression,
            baseline: None,
        }
    }

    /// Resolve a channel by settings name.
    ///
    /// Unknown names resolve to `0.0` and log a warning; a misconfigured
    /// rule must not stop the others from being evaluated.
    pub fn resolve(&self, sample: &MeasurementSample, channel_name: &str) -> f64 {
        match Channel::from_name(channel_name) {
            Some(channel) => self.resolve_channel(sample, channel),
            None => {
                tracing::warn!(channel = %channel_name, "Unknown channel, resolving to 0.0");
                0.0
            }
        }
    }

    /// Baseline-relative value of a known channel.
    pub fn resolve_channel(&self, sample: &MeasurementSample, channel: Channel) -> f64 {
        let raw = channel.value(sample, &self.suppression);
        match &self.baseline {
            Some(baseline) => raw - baseline.offset(channel),
            None => raw,
        }
    }

    /// Replace the baseline with a snapshot of `reference`.
    pub fn calibrate(&mut self, reference: &MeasurementSample) {
        self.baseline = Some(CalibrationBaseline::capture(reference, &self.suppression));
    }

    pub fn is_calibrated(&self) -> bool {
        self.baseline.is_some()
    }
}
