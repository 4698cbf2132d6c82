//! Filter manager tests
//!
//! Batch filtering, confidence gating, reconfiguration and persistence.

use common::{
    FilterConfig, FilterError, FilterManager, FilterParameters, Keypoint, OneEuroFilter,
    ParameterUpdate, Pose, Preset,
};

const DT_MS: f64 = 33.0;

fn wrist(x: f64, score: f64) -> Keypoint {
    Keypoint::new("left_wrist", x, 50.0, score)
}

fn skeleton(offset: f64, score: f64) -> Vec<Keypoint> {
    (0..17)
        .map(|i| {
            Keypoint::new(
                format!("kp{}", i),
                i as f64 * 10.0 + offset,
                i as f64 * 5.0 - offset,
                score,
            )
            .with_z(offset * 0.5)
        })
        .collect()
}

mod scenarios {
    use super::*;

    #[test]
    fn left_wrist_end_to_end() {
        let mut manager = FilterManager::default();
        let params = *manager.parameters();

        let out1 = manager.filter_pose(&[wrist(100.0, 0.9)], 0.0);
        assert_eq!(out1[0].x, 100.0);

        let out2 = manager.filter_pose(&[wrist(102.0, 0.9)], DT_MS);
        let x2 = out2[0].x;
        assert!(x2 > 100.0 && x2 < 102.0, "got {}", x2);

        let tau = 1.0 / (2.0 * std::f64::consts::PI * params.min_cutoff);
        let fixed_alpha = 1.0 / (1.0 + tau / (DT_MS / 1000.0));
        let fixed = 100.0 + fixed_alpha * 2.0;
        assert!(x2 > fixed, "adaptive {} should lead fixed-alpha {}", x2, fixed);

        let out3 = manager.filter_pose(&[wrist(160.0, 0.9)], 2.0 * DT_MS);
        let x3 = out3[0].x;
        assert!(x3 > 102.0 && x3 < 160.0, "got {}", x3);

        let mut non_adaptive = OneEuroFilter::new(FilterParameters { beta: 0.0, ..params });
        non_adaptive.filter(100.0, 0.0);
        non_adaptive.filter(102.0, DT_MS);
        let baseline = non_adaptive.filter(160.0, 2.0 * DT_MS);
        assert!(
            x3 > baseline + 5.0,
            "velocity-driven cutoff should pull {} well past {}",
            x3,
            baseline
        );

        // non-coordinate fields pass through
        assert_eq!(out3[0].name, "left_wrist");
        assert_eq!(out3[0].score, 0.9);
        assert!((out3[0].y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn low_confidence_wrist_is_untouched() {
        let mut manager = FilterManager::default();
        for (i, x) in [100.0, 102.0, 160.0].into_iter().enumerate() {
            let input = wrist(x, 0.1);
            let out = manager.filter_pose(&[input.clone()], i as f64 * DT_MS);
            assert_eq!(out[0], input);
        }
        assert_eq!(manager.stats().filter_count, 0);
    }
}

mod gating {
    use super::*;

    #[test]
    fn only_confident_keypoints_get_filters() {
        let mut manager = FilterManager::default();
        let keypoints = vec![wrist(1.0, 0.9), wrist(2.0, 0.29), wrist(3.0, 0.3)];
        manager.filter_pose(&keypoints, 0.0);
        // threshold is inclusive: two keypoints, x and y each
        assert_eq!(manager.filter_count(), 4);
    }

    #[test]
    fn nan_score_is_gated() {
        let mut manager = FilterManager::default();
        let input = wrist(5.0, f64::NAN);
        let out = manager.filter_pose(&[input], 0.0);
        assert_eq!(out[0].x, 5.0);
        assert_eq!(manager.filter_count(), 0);
    }

    #[test]
    fn custom_threshold() {
        let mut manager = FilterManager::default();
        manager.set_confidence_threshold(0.95).unwrap();
        manager.filter_pose(&[wrist(1.0, 0.9)], 0.0);
        assert_eq!(manager.filter_count(), 0);

        assert!(manager.set_confidence_threshold(1.5).is_err());
        assert!(manager.set_confidence_threshold(f64::NAN).is_err());
        assert_eq!(manager.confidence_threshold(), 0.95);
    }
}

mod batches {
    use super::*;

    #[test]
    fn poses_have_independent_filters() {
        let mut manager = FilterManager::default();
        let poses = vec![Pose::new(vec![wrist(0.0, 0.9)]), Pose::new(vec![wrist(500.0, 0.9)])];
        manager.filter_multiple_poses(&poses, 0.0);
        assert_eq!(manager.filter_count(), 4);

        let moved = vec![Pose::new(vec![wrist(10.0, 0.9)]), Pose::new(vec![wrist(500.0, 0.9)])];
        let out = manager.filter_multiple_poses(&moved, DT_MS);
        assert!(out[0].keypoints[0].x > 0.0 && out[0].keypoints[0].x < 10.0);
        assert!((out[1].keypoints[0].x - 500.0).abs() < 1e-9);
    }

    #[test]
    fn pose_score_is_preserved() {
        let mut manager = FilterManager::default();
        let mut pose = Pose::new(vec![wrist(1.0, 0.9)]);
        pose.score = Some(0.77);
        let out = manager.filter_multiple_poses(&[pose], 0.0);
        assert_eq!(out[0].score, Some(0.77));
    }

    #[test]
    fn three_dimensional_keypoints_filter_z() {
        let mut manager = FilterManager::default();
        manager.filter_pose(&[wrist(0.0, 0.9).with_z(0.0)], 0.0);
        assert_eq!(manager.filter_count(), 3);

        let out = manager.filter_pose(&[wrist(0.0, 0.9).with_z(1.0)], DT_MS);
        let z = out[0].z.unwrap();
        assert!(z > 0.0 && z < 1.0, "got {}", z);
    }

    #[test]
    fn empty_input_is_a_no_op() {
        let mut manager = FilterManager::default();
        assert!(manager.filter_pose(&[], 0.0).is_empty());
        assert!(manager.filter_multiple_poses(&[], 0.0).is_empty());
        let stats = manager.stats();
        assert_eq!(stats.performance.total_filtered, 0);
        assert_eq!(stats.error_count, 0);
    }

    #[test]
    fn malformed_keypoint_does_not_abort_the_batch() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut manager = FilterManager::default();
        manager.filter_pose(&[wrist(0.0, 0.9), wrist(0.0, 0.9)], 0.0);

        let bad = Keypoint::new("left_wrist", f64::INFINITY, 50.0, 0.9);
        let out = manager.filter_pose(&[bad, wrist(10.0, 0.9)], DT_MS);

        assert_eq!(out[0].x, f64::INFINITY);
        assert!(out[1].x > 0.0 && out[1].x < 10.0);
        assert_eq!(manager.stats().error_count, 1);
    }

    #[test]
    fn performance_stats_track_frames() {
        let mut manager = FilterManager::default();
        let frames = 1000;
        for i in 0..frames {
            let offset = (i as f64 * 0.1).sin() * 3.0;
            manager.filter_pose(&skeleton(offset, 0.9), i as f64 * DT_MS);
        }
        let stats = manager.stats();
        assert_eq!(stats.performance.total_filtered, frames);
        assert_eq!(stats.filter_count, 17 * 3);
        // sub-millisecond per keypoint
        assert!(stats.performance.average_processing_time < 17.0);

        manager.reset_stats();
        assert_eq!(manager.stats().performance.total_filtered, 0);
    }
}

mod lifecycle {
    use super::*;

    #[test]
    fn parameter_change_matches_fresh_manager() {
        let mut manager = FilterManager::default();
        for i in 0..5 {
            manager.filter_pose(&skeleton(i as f64 * 4.0, 0.9), i as f64 * DT_MS);
        }

        let changed = manager
            .update_parameters(ParameterUpdate {
                beta: Some(0.05),
                min_cutoff: Some(2.0),
                ..Default::default()
            })
            .unwrap();
        assert!(changed);
        assert_eq!(manager.filter_count(), 0);

        let mut fresh = FilterManager::with_parameters(*manager.parameters());
        for i in 5..8 {
            let ts = i as f64 * DT_MS;
            let input = skeleton(i as f64 * 4.0, 0.9);
            assert_eq!(manager.filter_pose(&input, ts), fresh.filter_pose(&input, ts));
        }
    }

    #[test]
    fn unchanged_update_keeps_filters() {
        let mut manager = FilterManager::default();
        manager.filter_pose(&[wrist(1.0, 0.9)], 0.0);

        let same = ParameterUpdate::from(*manager.parameters());
        assert!(!manager.update_parameters(same).unwrap());
        assert!(!manager.update_parameters(ParameterUpdate::default()).unwrap());
        assert_eq!(manager.filter_count(), 2);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let mut manager = FilterManager::default();
        manager
            .update_parameters(ParameterUpdate {
                beta: Some(5.0),
                frequency: Some(0.0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(manager.parameters().beta, 1.0);
        assert_eq!(manager.parameters().frequency, 1.0);
    }

    #[test]
    fn non_finite_update_is_rejected_atomically() {
        let mut manager = FilterManager::default();
        manager.filter_pose(&[wrist(1.0, 0.9)], 0.0);
        let before = *manager.parameters();

        let err = manager
            .update_parameters(ParameterUpdate {
                beta: Some(0.2),
                derivative_cutoff: Some(f64::NAN),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(
            err,
            FilterError::Configuration { ref parameter, .. } if parameter == "derivativeCutoff"
        ));
        assert_eq!(*manager.parameters(), before);
        assert_eq!(manager.filter_count(), 2);
    }

    #[test]
    fn presets_apply_and_unknown_names_are_rejected() {
        let mut manager = FilterManager::default();
        manager.filter_pose(&[wrist(1.0, 0.9)], 0.0);

        manager.apply_preset("smooth").unwrap();
        assert_eq!(*manager.parameters(), Preset::Smooth.parameters());
        assert_eq!(manager.filter_count(), 0);

        let err = manager.apply_preset("ultra").unwrap_err();
        assert_eq!(err, FilterError::UnknownPreset("ultra".to_string()));
        assert_eq!(*manager.parameters(), Preset::Smooth.parameters());
    }

    #[test]
    fn configured_preset_overrides_parameters() {
        let manager = FilterManager::new(FilterConfig {
            preset: Some(Preset::Responsive),
            ..Default::default()
        });
        assert_eq!(*manager.parameters(), Preset::Responsive.parameters());
    }

    #[test]
    fn disabling_releases_state() {
        let mut manager = FilterManager::default();
        manager.filter_pose(&[wrist(0.0, 0.9)], 0.0);
        manager.filter_pose(&[wrist(10.0, 0.9)], DT_MS);

        manager.set_enabled(false);
        assert_eq!(manager.filter_count(), 0);
        let input = wrist(200.0, 0.9);
        assert_eq!(manager.filter_pose(&[input.clone()], 2.0 * DT_MS)[0], input);
        assert!(!manager.stats().enabled);

        manager.set_enabled(true);
        // no stale velocity from before the gap
        assert_eq!(manager.filter_pose(&[wrist(300.0, 0.9)], 3.0 * DT_MS)[0].x, 300.0);
    }

    #[test]
    fn reset_filters_clears_bias() {
        let mut manager = FilterManager::default();
        manager.filter_pose(&[wrist(0.0, 0.9)], 0.0);
        manager.filter_pose(&[wrist(10.0, 0.9)], DT_MS);
        manager.reset_filters();
        assert_eq!(manager.filter_count(), 0);
        assert_eq!(manager.filter_pose(&[wrist(42.0, 0.9)], 2.0 * DT_MS)[0].x, 42.0);
    }
}

mod validation {
    use super::*;

    #[test]
    fn flags_errors_and_warnings() {
        let result =
            FilterManager::validate_parameters(&FilterParameters::new(90.0, 0.0, 0.8, f64::NAN));
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 2, "{:?}", result.errors);
        assert!(result.errors.iter().any(|e| e.contains("minCutoff")));
        assert!(result.errors.iter().any(|e| e.contains("derivativeCutoff")));
        assert!(result.warnings.iter().any(|w| w.contains("frequency")));
        assert!(result.warnings.iter().any(|w| w.contains("beta")));
    }

    #[test]
    fn warnings_do_not_invalidate() {
        let result =
            FilterManager::validate_parameters(&FilterParameters::new(100.0, 1.0, 0.9, 1.0));
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 2);
    }
}

mod persistence {
    use super::*;

    #[test]
    fn export_import_round_trip() {
        let mut source = FilterManager::default();
        source.apply_preset("performance").unwrap();
        source.set_enabled(false);
        let json = source.export_config().to_json();

        let mut target = FilterManager::default();
        target.import_config(&json).unwrap();
        assert_eq!(target.parameters(), source.parameters());
        assert!(!target.is_enabled());
    }

    #[test]
    fn export_uses_camel_case_wire_format() {
        let manager = FilterManager::default();
        let value: serde_json::Value = serde_json::to_value(manager.export_config()).unwrap();
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["enabled"], true);
        assert_eq!(value["parameters"]["minCutoff"], 1.0);
        assert_eq!(value["parameters"]["derivativeCutoff"], 1.0);
        assert!(value["timestamp"].as_u64().unwrap() > 0);

        let stats: serde_json::Value = serde_json::to_value(manager.stats()).unwrap();
        assert!(stats["performance"]["averageProcessingTime"].is_number());
        assert_eq!(stats["filterCount"], 0);
    }

    #[test]
    fn invalid_documents_leave_state_untouched() {
        let mut manager = FilterManager::default();
        manager.filter_pose(&[wrist(1.0, 0.9)], 0.0);
        let before = *manager.parameters();

        let cases = [
            "not json",
            r#"{"enabled": true}"#,
            concat!(
                r#"{"parameters": {"frequency": 30, "minCutoff": 1, "beta": 7, "#,
                r#""derivativeCutoff": 1}, "enabled": false}"#
            ),
            concat!(
                r#"{"parameters": {"frequency": 30, "minCutoff": 2, "beta": 0.1, "#,
                r#""derivativeCutoff": 1}, "enabled": true, "version": "2.0"}"#
            ),
        ];
        for json in cases {
            let err = manager.import_config(json).unwrap_err();
            assert!(matches!(err, FilterError::Import(_)), "{}: {:?}", json, err);
            assert_eq!(*manager.parameters(), before);
            assert!(manager.is_enabled());
            assert_eq!(manager.filter_count(), 2);
        }
    }

    #[test]
    fn import_without_timestamp_or_version() {
        let mut manager = FilterManager::default();
        let json = concat!(
            r#"{"parameters": {"frequency": 60, "minCutoff": 0.5, "beta": 0.02, "#,
            r#""derivativeCutoff": 1.5}, "enabled": true}"#
        );
        manager.import_config(json).unwrap();
        assert_eq!(*manager.parameters(), FilterParameters::new(60.0, 0.5, 0.02, 1.5));
    }
}
