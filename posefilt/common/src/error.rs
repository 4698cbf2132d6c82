/// Errors raised by the filtering core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("Invalid value for {parameter}: {reason}")]
    Configuration { parameter: String, reason: String },
    #[error("Unknown preset '{0}' (expected one of: smooth, responsive, balanced, performance)")]
    UnknownPreset(String),
    #[error("Failed to import filter config: {0}")]
    Import(String),
    #[error("Malformed sample: {0}")]
    MalformedSample(String),
}

impl FilterError {
    pub(crate) fn configuration(parameter: &str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }
}
