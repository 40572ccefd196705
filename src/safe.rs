//! Non-throwing wrappers around [`HttpClient`] calls.
//!
//! Call sites that prefer branching on a value over propagating errors use these helpers;
//! the underlying request semantics are unchanged.

// self
use crate::{_prelude::*, client::HttpClient, http::RequestOptions, obs::Logger};

/// Outcome of a wrapped call: exactly one of data or error.
#[derive(Debug)]
pub enum SafeResult<T> {
	/// The call succeeded.
	Data(T),
	/// The call failed.
	Error(Error),
}
impl<T> SafeResult<T> {
	/// Successful payload, if any.
	pub fn data(&self) -> Option<&T> {
		match self {
			Self::Data(data) => Some(data),
			Self::Error(_) => None,
		}
	}

	/// Failure, if any.
	pub fn error(&self) -> Option<&Error> {
		match self {
			Self::Data(_) => None,
			Self::Error(e) => Some(e),
		}
	}

	/// Returns `true` when the call succeeded.
	pub fn is_data(&self) -> bool {
		matches!(self, Self::Data(_))
	}

	/// Converts back into a [`Result`].
	pub fn into_result(self) -> Result<T> {
		match self {
			Self::Data(data) => Ok(data),
			Self::Error(e) => Err(e),
		}
	}
}
impl<T> From<Result<T>> for SafeResult<T> {
	fn from(result: Result<T>) -> Self {
		match result {
			Ok(data) => Self::Data(data),
			Err(e) => Self::Error(e),
		}
	}
}

/// Awaits `action`, logging and capturing any error instead of returning it.
///
/// The log line reads `[API] ❌ <code or status or "Error">: <message>`.
pub async fn handle_request<T, Fut>(action: Fut, logger: &dyn Logger) -> SafeResult<T>
where
	Fut: Future<Output = Result<T>>,
{
	match action.await {
		Ok(data) => SafeResult::Data(data),
		Err(e) => {
			logger.error(&format_failure(&e));

			SafeResult::Error(e)
		},
	}
}

/// `GET url` through [`handle_request`].
pub async fn safe_get(
	client: &HttpClient,
	url: &str,
	opts: Option<RequestOptions>,
	logger: &dyn Logger,
) -> SafeResult<Value> {
	handle_request(client.get(url, opts), logger).await
}

/// `POST url` through [`handle_request`].
pub async fn safe_post(
	client: &HttpClient,
	url: &str,
	body: Option<Value>,
	opts: Option<RequestOptions>,
	logger: &dyn Logger,
) -> SafeResult<Value> {
	handle_request(client.post(url, body, opts), logger).await
}

/// `PUT url` through [`handle_request`].
pub async fn safe_put(
	client: &HttpClient,
	url: &str,
	body: Option<Value>,
	opts: Option<RequestOptions>,
	logger: &dyn Logger,
) -> SafeResult<Value> {
	handle_request(client.put(url, body, opts), logger).await
}

/// `DELETE url` through [`handle_request`].
pub async fn safe_delete(
	client: &HttpClient,
	url: &str,
	body: Option<Value>,
	opts: Option<RequestOptions>,
	logger: &dyn Logger,
) -> SafeResult<Value> {
	handle_request(client.delete(url, body, opts), logger).await
}

fn format_failure(e: &Error) -> String {
	let label = match (e.code(), e.status()) {
		(Some(code), _) => code.to_owned(),
		(None, Some(status)) => status.to_string(),
		(None, None) => "Error".to_owned(),
	};
	let message = e.to_string();
	let message = if message.is_empty() { "Unknown error" } else { &message };

	format!("[API] ❌ {label}: {message}")
}
