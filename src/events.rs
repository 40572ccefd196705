//! Explicit publish/subscribe channel for session lifecycle notifications.
//!
//! The client never reaches for a process-wide bus; it publishes into whatever
//! [`EventSink`] it was built with. Publishing is fire-and-forget: listeners are
//! invoked synchronously and nothing is awaited or acknowledged.

// self
use crate::_prelude::*;

type Listener = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

/// Why a logout notification was emitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
	/// The refresh callback reported failure.
	RefreshFailed,
	/// The refresh callback returned an error.
	RefreshException,
}
impl LogoutReason {
	/// Returns the wire tag (`refresh_failed` or `refresh_exception`).
	pub const fn as_str(self) -> &'static str {
		match self {
			LogoutReason::RefreshFailed => "refresh_failed",
			LogoutReason::RefreshException => "refresh_exception",
		}
	}
}
impl Display for LogoutReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Notifications published by the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum AuthEvent {
	/// Credentials could not be refreshed; listeners should drop session state.
	#[serde(rename = "auth:logout")]
	Logout {
		/// Failure tag.
		reason: LogoutReason,
	},
}
impl AuthEvent {
	/// Event name as seen by listeners.
	pub const fn name(&self) -> &'static str {
		match self {
			AuthEvent::Logout { .. } => "auth:logout",
		}
	}
}

/// Destination for [`AuthEvent`] notifications.
pub trait EventSink
where
	Self: Send + Sync,
{
	/// Publishes `event` without waiting for any listener.
	fn publish(&self, event: &AuthEvent);
}
impl<F> EventSink for F
where
	F: Fn(&AuthEvent) + Send + Sync,
{
	fn publish(&self, event: &AuthEvent) {
		self(event)
	}
}

/// Sink that drops every event; used when no bus is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopEventSink;
impl EventSink for NoopEventSink {
	fn publish(&self, _event: &AuthEvent) {}
}

/// In-process bus fanning each event out to every subscriber.
#[derive(Clone, Default)]
pub struct EventBus {
	listeners: Arc<RwLock<Vec<Listener>>>,
}
impl EventBus {
	/// Registers a listener for all future events.
	pub fn subscribe(&self, listener: impl Fn(&AuthEvent) + Send + Sync + 'static) {
		self.listeners.write().push(Arc::new(listener));
	}

	/// Number of registered listeners.
	pub fn listener_count(&self) -> usize {
		self.listeners.read().len()
	}
}
impl EventSink for EventBus {
	fn publish(&self, event: &AuthEvent) {
		// Snapshot so listeners may subscribe while being notified.
		let listeners = self.listeners.read().clone();

		for listener in listeners {
			listener(event);
		}
	}
}
impl Debug for EventBus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EventBus").field("listeners", &self.listener_count()).finish()
	}
}
