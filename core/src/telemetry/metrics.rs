use std::sync::Mutex;

pub struct MetricsRecorder {
    inner: Mutex<StackMetrics>,
}

/// Running totals across every ensemble processed by one engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StackMetrics {
    pub ensembles: usize,
    pub low_fold: usize,
    pub nodes_stacked: usize,
    pub nodes_empty: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StackMetrics::default()),
        }
    }

    pub fn record_ensemble(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.ensembles += 1;
        }
    }

    pub fn record_low_fold(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.low_fold += 1;
        }
    }

    pub fn record_nodes(&self, stacked: usize, empty: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.nodes_stacked += stacked;
            metrics.nodes_empty += empty;
        }
    }

    pub fn snapshot(&self) -> StackMetrics {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            StackMetrics::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
