//! Metric sinks for simulation statistics.
//!
//! Provides:
//! - `MetricLogger` trait for composable backends
//! - `ConsoleLogger` writing through `tracing`
//! - `CompositeLogger` for multi-backend logging

mod console;
mod logger;

pub use console::ConsoleLogger;
pub use logger::{CompositeLogger, MetricLogger, NoOpLogger};
