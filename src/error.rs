//! Client-level error types shared by the request pipeline, auth state, and stores.

// self
use crate::{_prelude::*, client::MessageRules, http::HttpResponse};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed error used at callback seams (refresh routines, hooks, session checks).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Upstream answered with a non-success status.
	#[error(transparent)]
	Http(#[from] HttpError),
	/// Transport failure (DNS, TCP, TLS, body read).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// A registered hook failed.
	#[error(transparent)]
	Hook(#[from] HookError),
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Parsed body could not be decoded into the requested type.
	#[error("Response body could not be decoded.")]
	Decode {
		/// Structured decoding failure, including the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl Error {
	/// Short machine-readable code, when the failure carries one.
	pub fn code(&self) -> Option<&str> {
		match self {
			Self::Http(e) if !e.code.is_empty() => Some(&e.code),
			_ => None,
		}
	}

	/// HTTP status, when the failure came from a response.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Http(e) => Some(e.status),
			_ => None,
		}
	}

	/// Returns `true` for a 401 response.
	pub fn is_unauthorized(&self) -> bool {
		self.status() == Some(401)
	}
}

/// Normalized HTTP failure carrying the status, raw payload, short code, and human message.
#[derive(Clone, Debug, PartialEq, ThisError)]
#[error("{message}")]
pub struct HttpError {
	/// HTTP status code returned by the server.
	pub status: u16,
	/// Parsed response payload (`Value::Null` when empty or not JSON).
	pub data: Value,
	/// Short code from the payload, or [`HttpError::DEFAULT_CODE`].
	pub code: String,
	/// Normalized human-readable message.
	pub message: String,
}
impl HttpError {
	/// Code used when the payload does not carry one.
	pub const DEFAULT_CODE: &'static str = "HTTP_ERROR";
	/// Message used when neither the payload nor the status line has one.
	pub const FALLBACK_MESSAGE: &'static str = "Request failed";

	/// Builds the error from a response and its already parsed payload.
	///
	/// The message is taken from `data.message`, then `data.error`, then the status text,
	/// then [`HttpError::FALLBACK_MESSAGE`], and is passed through `rules`.
	pub fn from_response(response: &HttpResponse, data: Value, rules: &MessageRules) -> Self {
		let raw = non_empty_str(&data, "message")
			.or_else(|| non_empty_str(&data, "error"))
			.map(ToOwned::to_owned)
			.or_else(|| Some(response.status_text.clone()).filter(|s| !s.is_empty()))
			.unwrap_or_else(|| Self::FALLBACK_MESSAGE.to_owned());
		let code = non_empty_str(&data, "code").unwrap_or(Self::DEFAULT_CODE).to_owned();

		Self { status: response.status, message: rules.normalize(&raw), data, code }
	}
}

fn non_empty_str<'a>(data: &'a Value, field: &str) -> Option<&'a str> {
	data.get(field).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Resolved request URL cannot be parsed.
	#[error("Request URL `{url}` is invalid.")]
	InvalidUrl {
		/// The resolved URL string.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	Body(#[source] serde_json::Error),
	/// No transport was configured and no default transport is compiled in.
	#[error("No HTTP transport is configured.")]
	MissingTransport,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling `{url}`.")]
	Network {
		/// Target URL of the failed call.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: impl Into<String>, src: impl Into<BoxError>) -> Self {
		Self::Network { url: url.into(), source: src.into() }
	}
}

/// Failure raised by a before-request or after-response hook.
#[derive(Debug, ThisError)]
#[error("{stage} hook #{index} failed.")]
pub struct HookError {
	/// Pipeline stage (`before_request` or `after_response`).
	pub stage: &'static str,
	/// Zero-based registration index of the failing hook.
	pub index: usize,
	/// Error returned by the hook.
	#[source]
	pub source: BoxError,
}
