use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::FilterError;

const HIGH_FREQUENCY_HZ: f64 = 60.0;
const HIGH_BETA: f64 = 0.5;
const LOW_MIN_CUTOFF_HZ: f64 = 0.1;

/// Tuning shared by every signal a manager filters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParameters {
    /// Nominal sampling rate in Hz. The filter itself uses the measured rate.
    pub frequency: f64,
    #[serde(alias = "min_cutoff")]
    pub min_cutoff: f64,
    pub beta: f64,
    #[serde(alias = "derivative_cutoff", alias = "d_cutoff")]
    pub derivative_cutoff: f64,
}

impl Default for FilterParameters {
    fn default() -> Self {
        Self {
            frequency: 30.0,
            min_cutoff: 1.0,
            beta: 0.007,
            derivative_cutoff: 1.0,
        }
    }
}

impl FilterParameters {
    pub fn new(frequency: f64, min_cutoff: f64, beta: f64, derivative_cutoff: f64) -> Self {
        Self {
            frequency,
            min_cutoff,
            beta,
            derivative_cutoff,
        }
    }

    /// Range-checks every field. Legal values known to degrade output become warnings.
    pub fn validate(&self, ranges: &ParameterRanges) -> ValidationResult {
        let mut result = ValidationResult::default();

        for (name, value, range) in [
            ("frequency", self.frequency, ranges.frequency),
            ("minCutoff", self.min_cutoff, ranges.min_cutoff),
            ("beta", self.beta, ranges.beta),
            ("derivativeCutoff", self.derivative_cutoff, ranges.derivative_cutoff),
        ] {
            if !value.is_finite() {
                result.errors.push(format!("{} must be a finite number", name));
            } else if !range.contains(value) {
                result.errors.push(format!(
                    "{} must be between {} and {} (got {})",
                    name, range.min, range.max, value
                ));
            }
        }

        if self.frequency > HIGH_FREQUENCY_HZ {
            result.warnings.push(format!(
                "frequency above {} Hz adds cost without visible smoothing gains",
                HIGH_FREQUENCY_HZ
            ));
        }
        if self.beta > HIGH_BETA {
            result.warnings.push(format!(
                "beta above {} lets most jitter through during motion",
                HIGH_BETA
            ));
        }
        if self.min_cutoff.is_finite() && self.min_cutoff < LOW_MIN_CUTOFF_HZ {
            result.warnings.push(format!(
                "minCutoff below {} Hz causes noticeable lag",
                LOW_MIN_CUTOFF_HZ
            ));
        }

        result.is_valid = result.errors.is_empty();
        result
    }
}

/// Partial parameter change. `None` fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParameterUpdate {
    pub frequency: Option<f64>,
    #[serde(alias = "min_cutoff")]
    pub min_cutoff: Option<f64>,
    pub beta: Option<f64>,
    #[serde(alias = "derivative_cutoff", alias = "d_cutoff")]
    pub derivative_cutoff: Option<f64>,
}

impl ParameterUpdate {
    pub fn is_empty(&self) -> bool {
        self.frequency.is_none()
            && self.min_cutoff.is_none()
            && self.beta.is_none()
            && self.derivative_cutoff.is_none()
    }
}

impl From<FilterParameters> for ParameterUpdate {
    fn from(p: FilterParameters) -> Self {
        Self {
            frequency: Some(p.frequency),
            min_cutoff: Some(p.min_cutoff),
            beta: Some(p.beta),
            derivative_cutoff: Some(p.derivative_cutoff),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub min: f64,
    pub max: f64,
}

impl ParameterRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParameterRanges {
    pub frequency: ParameterRange,
    #[serde(alias = "min_cutoff")]
    pub min_cutoff: ParameterRange,
    pub beta: ParameterRange,
    #[serde(alias = "derivative_cutoff")]
    pub derivative_cutoff: ParameterRange,
}

impl Default for ParameterRanges {
    fn default() -> Self {
        Self {
            frequency: ParameterRange::new(1.0, 120.0),
            min_cutoff: ParameterRange::new(0.01, 10.0),
            beta: ParameterRange::new(0.0, 1.0),
            derivative_cutoff: ParameterRange::new(0.01, 10.0),
        }
    }
}

impl ParameterRanges {
    /// Checks the ranges themselves are usable before any parameter is tested against them.
    pub fn check(&self) -> Result<(), FilterError> {
        for (name, range) in [
            ("frequency", self.frequency),
            ("minCutoff", self.min_cutoff),
            ("beta", self.beta),
            ("derivativeCutoff", self.derivative_cutoff),
        ] {
            if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max {
                return Err(FilterError::configuration(
                    name,
                    format!("range [{}, {}] is not a valid interval", range.min, range.max),
                ));
            }
        }
        if self.min_cutoff.min <= 0.0 || self.derivative_cutoff.min <= 0.0 {
            return Err(FilterError::configuration(
                "ranges",
                "cutoff ranges must stay strictly positive",
            ));
        }
        if self.frequency.min <= 0.0 {
            return Err(FilterError::configuration(
                "frequency",
                "range must stay strictly positive",
            ));
        }
        if self.beta.min < 0.0 {
            return Err(FilterError::configuration(
                "beta",
                "range must not allow negative values",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Named parameter bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Smooth,
    Responsive,
    Balanced,
    Performance,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Smooth,
        Preset::Responsive,
        Preset::Balanced,
        Preset::Performance,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Smooth => "smooth",
            Preset::Responsive => "responsive",
            Preset::Balanced => "balanced",
            Preset::Performance => "performance",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Preset::Smooth => "Heavy smoothing for slow, deliberate movement",
            Preset::Responsive => "Minimal lag for fast movement such as sports or dance",
            Preset::Balanced => "General purpose trade-off between jitter and lag",
            Preset::Performance => "Tuned for low frame rates on constrained devices",
        }
    }

    pub fn parameters(&self) -> FilterParameters {
        match self {
            Preset::Smooth => FilterParameters::new(30.0, 0.5, 0.001, 1.0),
            Preset::Responsive => FilterParameters::new(30.0, 2.0, 0.05, 1.0),
            Preset::Balanced => FilterParameters::default(),
            Preset::Performance => FilterParameters::new(15.0, 1.5, 0.01, 1.0),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Preset::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| FilterError::UnknownPreset(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parameters_are_valid_without_warnings() {
        let result = FilterParameters::default().validate(&ParameterRanges::default());
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn every_preset_is_valid() {
        let ranges = ParameterRanges::default();
        for preset in Preset::ALL {
            let result = preset.parameters().validate(&ranges);
            assert!(result.is_valid, "{} invalid: {:?}", preset, result.errors);
        }
    }

    #[test]
    fn preset_names_parse_case_insensitively() {
        assert_eq!("Smooth".parse::<Preset>().unwrap(), Preset::Smooth);
        assert_eq!(" performance ".parse::<Preset>().unwrap(), Preset::Performance);
        assert!(matches!(
            "jittery".parse::<Preset>(),
            Err(FilterError::UnknownPreset(name)) if name == "jittery"
        ));
    }

    #[test]
    fn clamp_stays_in_range() {
        let r = ParameterRange::new(0.0, 1.0);
        assert_eq!(r.clamp(-3.0), 0.0);
        assert_eq!(r.clamp(3.0), 1.0);
        assert_eq!(r.clamp(0.25), 0.25);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut ranges = ParameterRanges::default();
        ranges.beta = ParameterRange::new(1.0, 0.0);
        assert!(ranges.check().is_err());
    }

    #[test]
    fn negative_beta_range_is_rejected() {
        let mut ranges = ParameterRanges::default();
        ranges.beta = ParameterRange::new(-1.0, 1.0);
        assert!(matches!(
            ranges.check(),
            Err(FilterError::Configuration { ref parameter, .. }) if parameter == "beta"
        ));
    }

    #[test]
    fn zero_frequency_range_is_rejected() {
        let mut ranges = ParameterRanges::default();
        ranges.frequency = ParameterRange::new(0.0, 120.0);
        assert!(ranges.check().is_err());
    }

    #[test]
    fn accepts_snake_case_aliases() {
        let p: FilterParameters = serde_json::from_str(
            r#"{"frequency": 60, "min_cutoff": 0.5, "beta": 0.1, "d_cutoff": 2.0}"#,
        )
        .unwrap();
        assert_eq!(p, FilterParameters::new(60.0, 0.5, 0.1, 2.0));
    }
}
