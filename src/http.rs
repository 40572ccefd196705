//! Transport primitives for the bearer client.
//!
//! The module exposes [`HttpTransport`] alongside the request/response values the
//! pipeline passes to hooks, so downstream crates can swap the HTTP stack without
//! touching token injection, hooks, or refresh handling. [`ReqwestTransport`] is the
//! default implementation when the `reqwest` feature is enabled.

// std
use std::ops::Deref;
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// HTTP verbs issued by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the canonical upper-case verb.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Cookie/credential policy attached to each request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialsMode {
	/// Always send credentials, including cross-origin.
	Include,
	/// Send credentials only to the same origin.
	#[default]
	SameOrigin,
	/// Never send credentials.
	Omit,
}
impl CredentialsMode {
	/// Returns the wire label (`include`, `same-origin`, `omit`).
	pub const fn as_str(self) -> &'static str {
		match self {
			CredentialsMode::Include => "include",
			CredentialsMode::SameOrigin => "same-origin",
			CredentialsMode::Omit => "omit",
		}
	}
}

/// Per-call overrides accepted by the verb helpers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
	/// Headers merged into the request; client-managed headers are applied on top.
	pub headers: BTreeMap<String, String>,
	/// Credentials override; falls back to the client default.
	pub credentials: Option<CredentialsMode>,
}
impl RequestOptions {
	/// Adds or replaces a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Overrides the credentials mode for this call.
	pub fn with_credentials(mut self, mode: CredentialsMode) -> Self {
		self.credentials = Some(mode);

		self
	}
}

/// Fully built outbound request, minus the target URL.
///
/// Before-request hooks receive a mutable reference and may adjust it; a refresh retry
/// re-sends the same value unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
	/// HTTP verb.
	pub method: Method,
	/// Header map.
	pub headers: BTreeMap<String, String>,
	/// Serialized JSON body, present only for non-GET calls with a body.
	pub body: Option<String>,
	/// Resolved credentials mode.
	pub credentials: CredentialsMode,
}
impl HttpRequest {
	/// Returns a header value by exact name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).map(String::as_str)
	}
}

/// Response captured from the transport with the full body buffered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Canonical reason phrase, possibly empty.
	pub status_text: String,
	/// Response headers (lower-case names).
	pub headers: BTreeMap<String, String>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Body decoded as UTF-8, lossily.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Parses the body leniently: empty bodies and invalid JSON both yield `Value::Null`.
	pub fn json_lenient(&self) -> Value {
		let text = self.text();

		if text.is_empty() {
			return Value::Null;
		}

		serde_json::from_str(&text).unwrap_or(Value::Null)
	}
}

/// Abstraction over HTTP stacks capable of executing a built request.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can back many
/// client instances, and they must buffer the full body before resolving.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` to `url` and returns the buffered response.
	fn execute<'a>(&'a self, url: &'a Url, request: &'a HttpRequest) -> TransportFuture<'a>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// `reqwest` has no notion of browser credential modes, so [`HttpRequest::credentials`] is
/// ignored here; configure cookie handling on the wrapped client instead.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	async fn send(&self, url: &Url, request: &HttpRequest) -> Result<HttpResponse, ReqwestError> {
		let method = match request.method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Delete => reqwest::Method::DELETE,
		};
		let mut builder = self.0.request(method, url.clone());

		for (name, value) in &request.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}
		if let Some(body) = &request.body {
			builder = builder.body(body.clone());
		}

		let response = builder.send().await?;
		let status = response.status();
		let headers = response
			.headers()
			.iter()
			.filter_map(|(name, value)| {
				value.to_str().ok().map(|v| (name.as_str().to_owned(), v.to_owned()))
			})
			.collect();
		let body = response.bytes().await?.to_vec();

		Ok(HttpResponse {
			status: status.as_u16(),
			status_text: status.canonical_reason().unwrap_or_default().to_owned(),
			headers,
			body,
		})
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute<'a>(&'a self, url: &'a Url, request: &'a HttpRequest) -> TransportFuture<'a> {
		Box::pin(async move {
			self.send(url, request)
				.await
				.map_err(|e| TransportError::network(url.as_str(), e))
		})
	}
}
