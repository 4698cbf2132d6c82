pub use api::{FrameSink, Keypoint, Pose, PoseFrame, PoseSource};

mod config;
mod error;
mod euro_filter;
mod filter_manager;
mod low_pass;
mod parameters;

pub use config::{AppConfig, FilterConfig, InputMode, OutputMode, DEFAULT_CONFIDENCE_THRESHOLD};
pub use error::FilterError;
pub use euro_filter::{FilterState, OneEuroFilter};
pub use filter_manager::{
    Axis, ExportedConfig, FilterKey, FilterManager, FilterStats, PerformanceStats, CONFIG_VERSION,
};
pub use low_pass::LowPassFilter;
pub use parameters::{
    FilterParameters, ParameterRange, ParameterRanges, ParameterUpdate, Preset, ValidationResult,
};
