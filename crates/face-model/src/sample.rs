//! Measurement samples delivered by the capture process.
//!
//! A sample is one frame of facial geometry. Field names on the wire follow
//! the capture process (`lEyeCornerY`, `MouthBotY`, ...); missing fields
//! read as zero. Derived channels are pure functions of the raw fields.

use headput_common::config::SuppressionConfig;
use serde::{Deserialize, Serialize};

/// One frame of raw facial landmark coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementSample {
    /// Landmark id reported by the tracker.
    #[serde(rename = "Id")]
    pub id: i64,

    /// Nose tip position.
    #[serde(rename = "X")]
    pub nose_x: f64,
    #[serde(rename = "Y")]
    pub nose_y: f64,
    #[serde(rename = "Z")]
    pub nose_z: f64,

    /// Tracker confidence for this frame.
    #[serde(rename = "Confidence")]
    pub confidence: f64,

    #[serde(rename = "lEyeCornerY")]
    pub left_eye_corner_y: f64,
    #[serde(rename = "rEyeCornerY")]
    pub right_eye_corner_y: f64,
    #[serde(rename = "lEyeCornerZ")]
    pub left_eye_corner_z: f64,
    #[serde(rename = "rEyeCornerZ")]
    pub right_eye_corner_z: f64,

    #[serde(rename = "lEyebrowY")]
    pub left_eyebrow_y: f64,
    #[serde(rename = "rEyebrowY")]
    pub right_eyebrow_y: f64,
    #[serde(rename = "lEyesocketY")]
    pub left_eye_socket_y: f64,
    #[serde(rename = "rEyesocketY")]
    pub right_eye_socket_y: f64,

    #[serde(rename = "MouthTopY")]
    pub mouth_top_y: f64,
    #[serde(rename = "MouthBotY")]
    pub mouth_bottom_y: f64,
    #[serde(rename = "MouthLX")]
    pub mouth_left_x: f64,
    #[serde(rename = "MouthRX")]
    pub mouth_right_x: f64,

    #[serde(rename = "lEarZ")]
    pub left_ear_z: f64,
    #[serde(rename = "rEarZ")]
    pub right_ear_z: f64,

    #[serde(rename = "ForeheadZ")]
    pub forehead_z: f64,
    #[serde(rename = "ChinZ")]
    pub chin_z: f64,
}

impl MeasurementSample {
    pub fn mouth_height(&self) -> f64 {
        self.mouth_bottom_y - self.mouth_top_y
    }

    pub fn mouth_width(&self) -> f64 {
        self.mouth_left_x - self.mouth_right_x
    }

    pub fn left_eyebrow_height(&self) -> f64 {
        self.left_eyebrow_y - self.left_eye_socket_y
    }

    pub fn right_eyebrow_height(&self) -> f64 {
        self.right_eyebrow_y - self.right_eye_socket_y
    }

    /// Raw eye-corner height difference driving roll.
    pub fn tilt_delta(&self) -> f64 {
        self.left_eye_corner_y - self.right_eye_corner_y
    }

    /// Raw ear depth difference driving rotation.
    pub fn rotation_delta(&self) -> f64 {
        self.left_ear_z - self.right_ear_z
    }

    /// Head tilt in degrees, without cross-suppression.
    pub fn head_tilt_angle(&self) -> f64 {
        self.tilt_delta().atan().to_degrees()
    }

    /// Head yaw proxy in degrees, without cross-suppression.
    pub fn head_rotation_angle(&self) -> f64 {
        self.rotation_delta().atan().to_degrees()
    }

    /// Head tilt in degrees, attenuated while the head is also rotated.
    pub fn roll(&self, suppression: &SuppressionConfig) -> f64 {
        self.head_tilt_angle() * suppression_factor(suppression, self.rotation_delta().abs())
    }

    /// Head rotation in degrees, attenuated while the head is also tilted.
    pub fn head_rotation(&self, suppression: &SuppressionConfig) -> f64 {
        self.head_rotation_angle() * suppression_factor(suppression, self.tilt_delta().abs())
    }

    pub fn head_pitch(&self) -> f64 {
        (self.forehead_z + self.chin_z) / 2.0
            - (self.left_eye_corner_z + self.right_eye_corner_z) / 2.0
    }
}

/// Scale applied to one axis given the magnitude of the competing axis.
pub fn suppression_factor(config: &SuppressionConfig, competing_magnitude: f64) -> f64 {
    if competing_magnitude > config.high {
        0.0
    } else if competing_magnitude > config.low {
        config.attenuation
    } else {
        1.0
    }
}
