//! Observability helpers for the request pipeline, refresh path, and guards.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `bearer_fetch.flow` carrying `flow`,
//!   `resource`, `status`, and `outcome` fields, and to get [`TracingLogger`].
//! - Enable `metrics` to increment the `bearer_fetch_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.

mod logger;
mod metrics;
mod tracing;

pub use logger::*;
pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Pipeline stages observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// A client request, including its optional retry.
	Request,
	/// A refresh callback invocation.
	Refresh,
	/// A navigation guard decision.
	Guard,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Request => "request",
			FlowKind::Refresh => "refresh",
			FlowKind::Guard => "guard",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a pipeline stage.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
