use log::debug;
use std::f64::consts::PI;

use crate::{FilterError, FilterParameters, LowPassFilter};

/// alpha = 1 / (1 + tau/Te), tau = 1/(2*pi*fc)
fn smoothing_factor(elapsed: f64, cutoff: f64) -> Result<f64, FilterError> {
    if !cutoff.is_finite() || cutoff <= 0.0 {
        return Err(FilterError::MalformedSample(format!(
            "cutoff frequency {} is not positive",
            cutoff
        )));
    }
    let tau = 1.0 / (2.0 * PI * cutoff);
    Ok((1.0 / (1.0 + tau / elapsed)).clamp(0.0, 1.0))
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LastSample {
    raw: f64,
    timestamp: f64,
}

/// Persistent state of one filtered signal. The tuning is supplied on every call so
/// many states can share a single parameter set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterState {
    last: Option<LastSample>,
    value: LowPassFilter,
    derivative: LowPassFilter,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.last.is_some()
    }

    /// Most recent filtered output.
    pub fn last_output(&self) -> Option<f64> {
        self.value.last()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Filters `value` observed at `timestamp` (milliseconds).
    ///
    /// State is committed only when a finite output was produced, so an error
    /// leaves the state exactly as it was before the call.
    pub fn filter(
        &mut self,
        value: f64,
        timestamp: f64,
        params: &FilterParameters,
    ) -> Result<f64, FilterError> {
        if !value.is_finite() {
            return Err(FilterError::MalformedSample(format!(
                "value {} is not finite",
                value
            )));
        }
        if !timestamp.is_finite() {
            return Err(FilterError::MalformedSample(format!(
                "timestamp {} is not finite",
                timestamp
            )));
        }

        let Some(last) = self.last else {
            let mut next = *self;
            next.value.filter(value, 1.0);
            next.derivative.filter(0.0, 1.0);
            next.last = Some(LastSample {
                raw: value,
                timestamp,
            });
            *self = next;
            return Ok(value);
        };

        let elapsed = (timestamp - last.timestamp) / 1000.0;
        if elapsed <= 0.0 {
            return Ok(self.last_output().unwrap_or(value));
        }

        let mut next = *self;

        let dx = (value - last.raw) / elapsed;
        let edx = next
            .derivative
            .filter(dx, smoothing_factor(elapsed, params.derivative_cutoff)?);
        let cutoff = params.min_cutoff + params.beta * edx.abs();
        let out = next.value.filter(value, smoothing_factor(elapsed, cutoff)?);

        if !out.is_finite() || !edx.is_finite() {
            return Err(FilterError::MalformedSample(format!(
                "filter diverged (value {}, derivative {})",
                out, edx
            )));
        }

        next.last = Some(LastSample {
            raw: value,
            timestamp,
        });
        *self = next;
        Ok(out)
    }
}

/// Standalone One Euro filter for a single scalar signal.
///
/// Changing parameters does not reset the history; call [`OneEuroFilter::reset`]
/// when the next samples must not be biased by the old tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OneEuroFilter {
    parameters: FilterParameters,
    state: FilterState,
}

impl OneEuroFilter {
    pub fn new(parameters: FilterParameters) -> Self {
        Self {
            parameters,
            state: FilterState::new(),
        }
    }

    pub fn new_with_config(min_cutoff: f64, beta: f64) -> Self {
        Self::new(FilterParameters {
            min_cutoff,
            beta,
            ..Default::default()
        })
    }

    pub fn parameters(&self) -> &FilterParameters {
        &self.parameters
    }

    pub fn update_parameters(&mut self, parameters: FilterParameters) {
        self.parameters = parameters;
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_initialized()
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }

    pub fn try_filter(&mut self, value: f64, timestamp: f64) -> Result<f64, FilterError> {
        self.state.filter(value, timestamp, &self.parameters)
    }

    /// Never fails: a sample that cannot be filtered is returned unchanged.
    pub fn filter(&mut self, value: f64, timestamp: f64) -> f64 {
        match self.try_filter(value, timestamp) {
            Ok(filtered) => filtered,
            Err(e) => {
                debug!("Passing sample through unfiltered: {}", e);
                value
            }
        }
    }
}
