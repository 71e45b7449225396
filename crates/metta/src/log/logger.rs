//! Metric logger traits and composites.

/// Sink for named metrics. Metrics arrive as ordered `(name, value)` pairs so
/// a backend can keep the order they were produced in.
pub trait MetricLogger: Send + Sync {
    /// Log a single scalar.
    fn log_scalar(&self, name: &str, value: f64, step: u64);

    /// Log a group of metrics recorded at the same step.
    fn log_metrics(&self, metrics: &[(String, f64)], step: u64) {
        for (name, value) in metrics {
            self.log_scalar(name, *value, step);
        }
    }

    /// Flush any pending writes.
    fn close(&self) {}
}

/// A logger that does nothing (default).
pub struct NoOpLogger;

impl MetricLogger for NoOpLogger {
    fn log_scalar(&self, _name: &str, _value: f64, _step: u64) {}
    fn log_metrics(&self, _metrics: &[(String, f64)], _step: u64) {}
}

/// A composite logger that dispatches to multiple backends.
#[derive(Default)]
pub struct CompositeLogger {
    loggers: Vec<Box<dyn MetricLogger>>,
}

impl CompositeLogger {
    pub fn new(loggers: Vec<Box<dyn MetricLogger>>) -> Self {
        Self { loggers }
    }

    pub fn add(&mut self, logger: Box<dyn MetricLogger>) {
        self.loggers.push(logger);
    }

    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }
}

impl MetricLogger for CompositeLogger {
    fn log_scalar(&self, name: &str, value: f64, step: u64) {
        for logger in &self.loggers {
            logger.log_scalar(name, value, step);
        }
    }

    fn log_metrics(&self, metrics: &[(String, f64)], step: u64) {
        for logger in &self.loggers {
            logger.log_metrics(metrics, step);
        }
    }

    fn close(&self) {
        for logger in &self.loggers {
            logger.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<(String, f64, u64)>>>);

    impl MetricLogger for Recorder {
        fn log_scalar(&self, name: &str, value: f64, step: u64) {
            self.0.lock().unwrap().push((name.to_string(), value, step));
        }
    }

    #[test]
    fn test_composite_fans_out_in_order() {
        let a = Recorder::default();
        let b = Recorder::default();
        let composite = CompositeLogger::new(vec![Box::new(a.clone()), Box::new(b.clone())]);
        composite.log_metrics(&[("z".into(), 1.0), ("a".into(), 2.0)], 7);

        for recorder in [a, b] {
            let seen = recorder.0.lock().unwrap().clone();
            assert_eq!(seen, vec![("z".into(), 1.0, 7), ("a".into(), 2.0, 7)]);
        }
    }
}
