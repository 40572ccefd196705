//! Refresh-on-401 handling with an optional single-flight latch.
//!
//! Without coordination, every request that receives a 401 runs the refresh callback on its
//! own. With the latch enabled (the default), requests that fail while another refresh is in
//! flight wait for it and reuse its outcome instead of starting a second one. Only the request
//! that actually ran the callback clears the token and publishes the logout event.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	client::HttpClient,
	events::{AuthEvent, LogoutReason},
	obs::{FlowKind, FlowOutcome, FlowSpan},
};

/// Single-flight latch keyed by nothing more than "a refresh is in progress".
#[derive(Debug, Default)]
pub(crate) struct RefreshGate {
	lock: AsyncMutex<()>,
	generation: AtomicU64,
	last_outcome: Mutex<bool>,
}
impl RefreshGate {
	fn generation(&self) -> u64 {
		self.generation.load(Ordering::Acquire)
	}

	fn complete(&self, outcome: bool) {
		*self.last_outcome.lock() = outcome;
		self.generation.fetch_add(1, Ordering::AcqRel);
	}
}

impl HttpClient {
	/// Runs (or joins) one refresh attempt for `endpoint`, which just failed with 401.
	///
	/// Never errors: a falsy result or a callback error clears the token through the sink,
	/// publishes [`AuthEvent::Logout`], and resolves to `false`.
	pub(crate) async fn try_refresh(&self, endpoint: &str) -> bool {
		if !self.single_flight_refresh {
			return self.run_refresh(endpoint).await;
		}

		let observed = self.refresh_gate.generation();
		let _in_flight = self.refresh_gate.lock.lock().await;

		if self.refresh_gate.generation() != observed {
			self.refresh_metrics.record_shared();

			return *self.refresh_gate.last_outcome.lock();
		}

		let outcome = self.run_refresh(endpoint).await;

		self.refresh_gate.complete(outcome);

		outcome
	}

	async fn run_refresh(&self, endpoint: &str) -> bool {
		let span = FlowSpan::start(FlowKind::Refresh, endpoint);

		self.refresh_metrics.record_attempt();

		let result = match &self.refresher {
			Some(refresher) => span.instrument(refresher.refresh()).await,
			None => Ok(false),
		};
		let reason = match result {
			Ok(true) => {
				self.logger.info("[Fetch] Token refreshed");
				self.refresh_metrics.record_success();
				span.finish(FlowOutcome::Success);

				return true;
			},
			Ok(false) => {
				self.logger.warn("[Fetch] Refresh callback returned false");

				LogoutReason::RefreshFailed
			},
			Err(e) => {
				self.logger.error(&format!("[Fetch] Refresh exception: {e}"));

				LogoutReason::RefreshException
			},
		};

		self.refresh_metrics.record_failure();
		span.finish(FlowOutcome::Failure);

		if let Some(sink) = &self.token_sink {
			sink.on_token(None);
		}

		self.events.publish(&AuthEvent::Logout { reason });

		false
	}
}
