/// First-order exponential smoother. The caller supplies the blend coefficient.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LowPassFilter {
    prev: Option<f64>,
}

impl LowPassFilter {
    pub fn new() -> Self {
        Self { prev: None }
    }

    pub fn filter(&mut self, value: f64, alpha: f64) -> f64 {
        let out = match self.prev {
            Some(prev) => alpha * value + (1.0 - alpha) * prev,
            None => value,
        };
        self.prev = Some(out);
        out
    }

    pub fn last(&self) -> Option<f64> {
        self.prev
    }

    pub fn is_initialized(&self) -> bool {
        self.prev.is_some()
    }

    pub fn reset(&mut self) {
        self.prev = None;
    }
}
