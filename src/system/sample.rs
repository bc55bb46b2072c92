use std::time::Instant;

/// One raw read of an OS counter or gauge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: Instant,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: Instant, value: f64) -> Self {
        Self { timestamp, value }
    }
}
