//! Logging seam shared by the buffer and the writer.
//!
//! Diagnostics never surface as errors to the embedding application, so the
//! collaborators that produce them take a [`Logger`] they can report
//! through. Tests install recording implementations; production code can use
//! [`TracingLogger`] to forward everything to the `tracing` ecosystem.

/// Severity attached to a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Error,
}

/// Receives diagnostics from the buffer and the writer.
///
/// Implementations must be safe for concurrent calls from the writer's
/// worker thread and from whichever threads drive the buffer.
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

/// A [`Logger`] that forwards diagnostics to the `tracing` macros.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(target: "datadog_tracer", "{message}"),
            LogLevel::Info => tracing::info!(target: "datadog_tracer", "{message}"),
            LogLevel::Error => tracing::error!(target: "datadog_tracer", "{message}"),
        }
    }
}
