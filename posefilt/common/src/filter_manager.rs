use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::config::check_confidence_threshold;
use crate::{
    FilterConfig, FilterError, FilterParameters, FilterState, Keypoint, ParameterRanges,
    ParameterUpdate, Pose, Preset, ValidationResult,
};

pub const CONFIG_VERSION: &str = "1.0";

const ERROR_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Identity of one filtered coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterKey {
    pub pose_index: usize,
    pub keypoint_index: usize,
    pub axis: Axis,
}

impl FilterKey {
    pub fn new(pose_index: usize, keypoint_index: usize, axis: Axis) -> Self {
        Self {
            pose_index,
            keypoint_index,
            axis,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceStats {
    /// Frames that went through the filters.
    pub total_filtered: u64,
    /// Mean wall time per filtered frame, in milliseconds.
    pub average_processing_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterStats {
    pub enabled: bool,
    pub filter_count: usize,
    pub parameters: FilterParameters,
    pub performance: PerformanceStats,
    pub error_count: u64,
}

/// Persisted manager settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedConfig {
    pub parameters: FilterParameters,
    pub enabled: bool,
    /// Milliseconds since the Unix epoch at export time.
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    CONFIG_VERSION.to_string()
}

impl ExportedConfig {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct RunningStats {
    frames: u64,
    processing_time: Duration,
    errors: u64,
    last_error_log: Option<Instant>,
}

/// Applies one shared One Euro tuning to every coordinate of every tracked keypoint.
///
/// Filter states are created lazily per [`FilterKey`] and all of them are dropped
/// whenever the tuning changes or the manager is disabled.
#[derive(Debug)]
pub struct FilterManager {
    parameters: FilterParameters,
    ranges: ParameterRanges,
    confidence_threshold: f64,
    enabled: bool,
    filters: HashMap<FilterKey, FilterState>,
    stats: RunningStats,
}

impl Default for FilterManager {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}

impl FilterManager {
    /// Builds a manager from `config`. Out-of-range defaults are clamped into their
    /// ranges; use [`FilterConfig::validate`] beforehand to reject them instead.
    pub fn new(config: FilterConfig) -> Self {
        let ranges = if config.ranges.check().is_ok() {
            config.ranges
        } else {
            warn!("Configured parameter ranges are invalid, using defaults");
            ParameterRanges::default()
        };
        let confidence_threshold =
            if check_confidence_threshold(config.confidence_threshold).is_ok() {
                config.confidence_threshold
            } else {
                warn!(
                    "Confidence threshold {} is invalid, using {}",
                    config.confidence_threshold,
                    crate::DEFAULT_CONFIDENCE_THRESHOLD
                );
                crate::DEFAULT_CONFIDENCE_THRESHOLD
            };

        let mut manager = Self {
            parameters: FilterParameters::default(),
            ranges,
            confidence_threshold,
            enabled: config.enabled,
            filters: HashMap::new(),
            stats: RunningStats::default(),
        };

        if let Err(e) = manager.set_parameters(config.parameters) {
            warn!("Ignoring configured parameters: {}", e);
        }
        if let Some(preset) = config.preset {
            manager.apply(preset);
        }
        manager
    }

    pub fn with_parameters(parameters: FilterParameters) -> Self {
        Self::new(FilterConfig {
            parameters,
            ..Default::default()
        })
    }

    pub fn parameters(&self) -> &FilterParameters {
        &self.parameters
    }

    pub fn ranges(&self) -> &ParameterRanges {
        &self.ranges
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    pub fn set_confidence_threshold(&mut self, threshold: f64) -> Result<(), FilterError> {
        check_confidence_threshold(threshold)?;
        self.confidence_threshold = threshold;
        Ok(())
    }

    pub fn filter_pose(&mut self, keypoints: &[Keypoint], timestamp: f64) -> Vec<Keypoint> {
        if !self.enabled || keypoints.is_empty() {
            return keypoints.to_vec();
        }

        let started = Instant::now();
        let out = self.filter_keypoints(0, keypoints, timestamp);
        self.record_frame(started.elapsed());
        out
    }

    pub fn filter_multiple_poses(&mut self, poses: &[Pose], timestamp: f64) -> Vec<Pose> {
        if !self.enabled || poses.is_empty() {
            return poses.to_vec();
        }

        let started = Instant::now();
        let out = poses
            .iter()
            .enumerate()
            .map(|(pose_index, pose)| Pose {
                keypoints: self.filter_keypoints(pose_index, &pose.keypoints, timestamp),
                score: pose.score,
            })
            .collect();
        self.record_frame(started.elapsed());
        out
    }

    fn filter_keypoints(
        &mut self,
        pose_index: usize,
        keypoints: &[Keypoint],
        timestamp: f64,
    ) -> Vec<Keypoint> {
        let mut out = Vec::with_capacity(keypoints.len());
        for (keypoint_index, keypoint) in keypoints.iter().enumerate() {
            // NaN scores fail this comparison and are gated out too
            if !(keypoint.score >= self.confidence_threshold) {
                out.push(keypoint.clone());
                continue;
            }

            match self.filter_keypoint(pose_index, keypoint_index, keypoint, timestamp) {
                Ok(filtered) => out.push(filtered),
                Err(e) => {
                    self.record_error(pose_index, keypoint, &e);
                    out.push(keypoint.clone());
                }
            }
        }
        out
    }

    /// Filters every axis of one keypoint or none of them.
    fn filter_keypoint(
        &mut self,
        pose_index: usize,
        keypoint_index: usize,
        keypoint: &Keypoint,
        timestamp: f64,
    ) -> Result<Keypoint, FilterError> {
        if !keypoint.is_finite() {
            return Err(FilterError::MalformedSample(format!(
                "non-finite coordinates ({}, {}, {:?})",
                keypoint.x, keypoint.y, keypoint.z
            )));
        }

        let mut axes = vec![(Axis::X, keypoint.x), (Axis::Y, keypoint.y)];
        if let Some(z) = keypoint.z {
            axes.push((Axis::Z, z));
        }

        let mut staged = Vec::with_capacity(axes.len());
        for (axis, raw) in axes {
            let key = FilterKey::new(pose_index, keypoint_index, axis);
            let mut state = self.filters.get(&key).copied().unwrap_or_default();
            let value = state.filter(raw, timestamp, &self.parameters)?;
            staged.push((key, state, value));
        }

        let mut filtered = keypoint.clone();
        for (key, state, value) in staged {
            match key.axis {
                Axis::X => filtered.x = value,
                Axis::Y => filtered.y = value,
                Axis::Z => filtered.z = Some(value),
            }
            if self.filters.insert(key, state).is_none() {
                trace!("Created filter for {:?} ({})", key, keypoint.name);
            }
        }
        Ok(filtered)
    }

    fn record_frame(&mut self, elapsed: Duration) {
        self.stats.frames += 1;
        self.stats.processing_time += elapsed;
    }

    fn record_error(&mut self, pose_index: usize, keypoint: &Keypoint, error: &FilterError) {
        self.stats.errors += 1;

        let now = Instant::now();
        let should_log = match self.stats.last_error_log {
            Some(last) => now.duration_since(last) >= ERROR_LOG_INTERVAL,
            None => true,
        };
        if should_log {
            self.stats.last_error_log = Some(now);
            warn!(
                "Passing keypoint '{}' of pose {} through unfiltered: {} ({} errors so far)",
                keypoint.name, pose_index, error, self.stats.errors
            );
        } else {
            debug!(
                "Passing keypoint '{}' of pose {} through unfiltered: {}",
                keypoint.name, pose_index, error
            );
        }
    }

    /// Applies a partial parameter change.
    ///
    /// Finite values outside their range are clamped into it. Returns whether the
    /// active parameters changed; when they did, every tracked filter is reset.
    pub fn update_parameters(&mut self, update: ParameterUpdate) -> Result<bool, FilterError> {
        if update.is_empty() {
            return Ok(false);
        }

        let mut next = self.parameters;
        let ranges = self.ranges;

        for (name, value, range, slot) in [
            ("frequency", update.frequency, ranges.frequency, &mut next.frequency),
            ("minCutoff", update.min_cutoff, ranges.min_cutoff, &mut next.min_cutoff),
            ("beta", update.beta, ranges.beta, &mut next.beta),
            (
                "derivativeCutoff",
                update.derivative_cutoff,
                ranges.derivative_cutoff,
                &mut next.derivative_cutoff,
            ),
        ] {
            let Some(value) = value else {
                continue;
            };
            if !value.is_finite() {
                return Err(FilterError::configuration(
                    name,
                    format!("{} is not a finite number", value),
                ));
            }
            let clamped = range.clamp(value);
            if clamped != value {
                warn!(
                    "{} = {} is outside [{}, {}], clamped to {}",
                    name, value, range.min, range.max, clamped
                );
            }
            *slot = clamped;
        }

        if next == self.parameters {
            return Ok(false);
        }

        self.parameters = next;
        self.reset_filters();
        info!("Filter parameters updated: {:?}", self.parameters);
        Ok(true)
    }

    pub fn set_parameters(&mut self, parameters: FilterParameters) -> Result<bool, FilterError> {
        self.update_parameters(parameters.into())
    }

    pub fn apply_preset(&mut self, name: &str) -> Result<(), FilterError> {
        let preset = name.parse::<Preset>()?;
        self.apply(preset);
        Ok(())
    }

    fn apply(&mut self, preset: Preset) {
        // preset values are within the default ranges; custom ranges may clamp them
        match self.set_parameters(preset.parameters()) {
            Ok(_) => info!("Applied preset '{}': {}", preset, preset.description()),
            Err(e) => warn!("Failed to apply preset '{}': {}", preset, e),
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if !enabled {
            self.reset_filters();
        }
        info!("Filtering {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn reset_filters(&mut self) {
        if !self.filters.is_empty() {
            debug!("Resetting {} filters", self.filters.len());
        }
        self.filters.clear();
    }

    pub fn stats(&self) -> FilterStats {
        let average_processing_time = if self.stats.frames > 0 {
            self.stats.processing_time.as_secs_f64() * 1000.0 / self.stats.frames as f64
        } else {
            0.0
        };
        FilterStats {
            enabled: self.enabled,
            filter_count: self.filters.len(),
            parameters: self.parameters,
            performance: PerformanceStats {
                total_filtered: self.stats.frames,
                average_processing_time,
            },
            error_count: self.stats.errors,
        }
    }

    pub fn reset_stats(&mut self) {
        self.stats = RunningStats::default();
    }

    /// Checks `parameters` against the default ranges.
    pub fn validate_parameters(parameters: &FilterParameters) -> ValidationResult {
        parameters.validate(&ParameterRanges::default())
    }

    pub fn export_config(&self) -> ExportedConfig {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        ExportedConfig {
            parameters: self.parameters,
            enabled: self.enabled,
            timestamp,
            version: CONFIG_VERSION.to_string(),
        }
    }

    /// Restores settings produced by [`FilterManager::export_config`].
    ///
    /// The document is fully validated before anything is applied; on error the
    /// manager is left untouched.
    pub fn import_config(&mut self, json: &str) -> Result<(), FilterError> {
        let config: ExportedConfig =
            serde_json::from_str(json).map_err(|e| FilterError::Import(e.to_string()))?;

        let major = config.version.split('.').next().unwrap_or_default();
        let supported = CONFIG_VERSION.split('.').next().unwrap_or_default();
        if major != supported {
            return Err(FilterError::Import(format!(
                "unsupported config version {} (expected {}.x)",
                config.version, supported
            )));
        }

        let result = config.parameters.validate(&self.ranges);
        if !result.is_valid {
            return Err(FilterError::Import(result.errors.join("; ")));
        }
        for warning in &result.warnings {
            warn!("Imported config: {}", warning);
        }

        self.set_parameters(config.parameters)?;
        self.set_enabled(config.enabled);
        info!("Imported filter config (version {})", config.version);
        Ok(())
    }
}
