//! Property tests for channel resolution and rule thresholds.

use headput_common::config::SuppressionConfig;
use headput_face_model::{
    suppression_factor, Channel, ChannelResolver, Direction, GestureRule, MeasurementSample,
};
use proptest::prelude::*;

fn arb_sample() -> impl Strategy<Value = MeasurementSample> {
    (
        prop::array::uniform8(-5.0f64..5.0),
        prop::array::uniform8(-5.0f64..5.0),
        prop::array::uniform3(-5.0f64..5.0),
    )
        .prop_map(|(a, b, c)| MeasurementSample {
            nose_x: a[0],
            nose_y: a[1],
            nose_z: a[2],
            left_eye_corner_y: a[3],
            right_eye_corner_y: a[4],
            left_eye_corner_z: a[5],
            right_eye_corner_z: a[6],
            left_eyebrow_y: a[7],
            right_eyebrow_y: b[0],
            left_eye_socket_y: b[1],
            right_eye_socket_y: b[2],
            mouth_top_y: b[3],
            mouth_bottom_y: b[4],
            mouth_left_x: b[5],
            mouth_right_x: b[6],
            left_ear_z: b[7],
            right_ear_z: c[0],
            forehead_z: c[1],
            chin_z: c[2],
            ..Default::default()
        })
}

proptest! {
    #[test]
    fn prop_calibrating_on_a_sample_zeroes_it(sample in arb_sample()) {
        let mut resolver = ChannelResolver::new(SuppressionConfig::default());
        resolver.calibrate(&sample);
        for channel in Channel::ALL {
            prop_assert_eq!(resolver.resolve_channel(&sample, channel), 0.0);
        }
    }

    #[test]
    fn prop_derived_channels_depend_only_on_raw_fields(sample in arb_sample()) {
        let suppression = SuppressionConfig::default();
        let copy = sample;
        for channel in Channel::ALL {
            let first = channel.value(&sample, &suppression);
            let second = channel.value(&copy, &suppression);
            prop_assert_eq!(first.to_bits(), second.to_bits());
        }
    }

    #[test]
    fn prop_suppression_never_amplifies(sample in arb_sample()) {
        let suppression = SuppressionConfig::default();
        prop_assert!(sample.roll(&suppression).abs() <= sample.head_tilt_angle().abs());
        prop_assert!(sample.head_rotation(&suppression).abs() <= sample.head_rotation_angle().abs());
        prop_assert!(sample.roll(&suppression).abs() < 90.0);
    }

    #[test]
    fn prop_suppression_factor_is_monotonic(a in 0.0f64..2.0, b in 0.0f64..2.0) {
        let config = SuppressionConfig::default();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(suppression_factor(&config, lo) >= suppression_factor(&config, hi));
    }

    #[test]
    fn prop_threshold_is_inclusive_on_both_sides(threshold in 0.0f64..100.0) {
        let positive = GestureRule::key("P", "Roll", Direction::Positive, threshold, 1.0, "E");
        let negative = GestureRule::key("N", "Roll", Direction::Negative, threshold, 1.0, "Q");
        prop_assert!(positive.should_trigger(threshold));
        prop_assert!(negative.should_trigger(-threshold));
    }

    #[test]
    fn prop_symmetric_rules_idle_between_thresholds(
        threshold in 0.01f64..100.0,
        fraction in -0.99f64..0.99,
    ) {
        let positive = GestureRule::key("P", "Roll", Direction::Positive, threshold, 1.0, "E");
        let negative = GestureRule::key("N", "Roll", Direction::Negative, threshold, 1.0, "Q");
        let value = threshold * fraction;
        prop_assert!(!positive.should_trigger(value));
        prop_assert!(!negative.should_trigger(value));
    }
}
