//! Console logging backend.

use super::MetricLogger;

/// Logger that writes metrics through `tracing` at info level.
pub struct ConsoleLogger {
    prefix: String,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self {
            prefix: String::new(),
        }
    }

    /// Prepend `prefix/` to every metric name
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.prefix, name)
        }
    }

    fn line(&self, metrics: &[(String, f64)], step: u64) -> String {
        let body: Vec<String> = metrics
            .iter()
            .map(|(key, value)| format!("{}={:.4}", self.name(key), value))
            .collect();
        format!("Step {}: {}", step, body.join(", "))
    }
}

impl MetricLogger for ConsoleLogger {
    fn log_scalar(&self, name: &str, value: f64, step: u64) {
        tracing::info!("Step {}: {} = {:.4}", step, self.name(name), value);
    }

    fn log_metrics(&self, metrics: &[(String, f64)], step: u64) {
        // One line per step
        tracing::info!("{}", self.line(metrics, step));
    }
}
