use std::time::Duration;

/// Running latency statistics for detection cycles.
#[derive(Debug, Default, Clone)]
pub struct TimeCalc {
    n: usize,
    total: Duration,
    last: Duration,
    max: Duration,
}

impl TimeCalc {
    pub fn add(&mut self, x: Duration) {
        self.n += 1;
        self.total += x;
        self.last = x;
        self.max = self.max.max(x);
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn last(&self) -> Duration {
        self.last
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn avg(&self) -> Duration {
        if self.n == 0 {
            return Duration::ZERO;
        }
        self.total / self.n as u32
    }
}
