//! Injectable logger collaborator.
//!
//! Every method has a no-op default, so an implementor that overrides none of them
//! behaves like a logger with no methods at all.

/// Sink for the pipeline's human-readable log lines.
pub trait Logger
where
	Self: Send + Sync,
{
	/// Informational line.
	fn info(&self, message: &str) {
		let _ = message;
	}

	/// Recoverable problem.
	fn warn(&self, message: &str) {
		let _ = message;
	}

	/// Failure.
	fn error(&self, message: &str) {
		let _ = message;
	}
}

/// Logger that discards everything; the default for every component.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogger;
impl Logger for NoopLogger {}

/// Logger that forwards lines to `tracing` under the `bearer_fetch` target.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;
#[cfg(feature = "tracing")]
impl Logger for TracingLogger {
	fn info(&self, message: &str) {
		tracing::info!(target: "bearer_fetch", "{message}");
	}

	fn warn(&self, message: &str) {
		tracing::warn!(target: "bearer_fetch", "{message}");
	}

	fn error(&self, message: &str) {
		tracing::error!(target: "bearer_fetch", "{message}");
	}
}
