//! Bearer-token HTTP client: request building, hook pipeline, error normalization, and the
//! single refresh-and-retry on authorization failure.
//!
//! The client never references [`AuthState`](crate::auth::AuthState) directly. It sees three
//! callbacks ([`TokenSource`], [`TokenSink`], [`Refresher`]) that a caller usually backs with
//! one auth state via [`HttpClientBuilder::auth_state`].

pub mod hooks;
pub mod message;

mod refresh;

pub use hooks::*;
pub use message::*;

// self
use crate::{
	_prelude::*,
	auth::{AuthState, Refresher, TokenSink, TokenSource},
	error::{ConfigError, HttpError},
	events::{EventSink, NoopEventSink},
	http::{CredentialsMode, HttpRequest, HttpResponse, HttpTransport, Method, RequestOptions},
	obs::{FlowKind, FlowOutcome, FlowSpan, Logger, NoopLogger, RefreshMetrics},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;
use refresh::RefreshGate;

/// Prefix of endpoints that never trigger a refresh on 401.
pub const AUTH_ENDPOINT_PREFIX: &str = "/auth/";

/// Authenticated HTTP client.
///
/// Cheap to share behind an [`Arc`]; hook registration and refresh coordination use interior
/// mutability so every method takes `&self`.
pub struct HttpClient {
	base_url: String,
	transport: Arc<dyn HttpTransport>,
	token_source: Option<Arc<dyn TokenSource>>,
	token_sink: Option<Arc<dyn TokenSink>>,
	refresher: Option<Arc<dyn Refresher>>,
	logger: Arc<dyn Logger>,
	events: Arc<dyn EventSink>,
	credentials: Option<CredentialsMode>,
	message_rules: MessageRules,
	before_request: HookList<dyn BeforeRequestHook>,
	after_response: HookList<dyn AfterResponseHook>,
	single_flight_refresh: bool,
	refresh_gate: RefreshGate,
	refresh_metrics: Arc<RefreshMetrics>,
}
impl HttpClient {
	/// Starts a builder for a client rooted at `base_url`.
	pub fn builder(base_url: impl Into<String>) -> HttpClientBuilder {
		HttpClientBuilder::new(base_url)
	}

	/// Base URL prepended to relative endpoints.
	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	/// Refresh counters for this client.
	pub fn refresh_metrics(&self) -> &Arc<RefreshMetrics> {
		&self.refresh_metrics
	}

	/// `GET endpoint`.
	pub async fn get(&self, endpoint: &str, opts: Option<RequestOptions>) -> Result<Value> {
		self.send(Method::Get, endpoint, None, opts.unwrap_or_default()).await
	}

	/// `POST endpoint` with an optional JSON body.
	pub async fn post(
		&self,
		endpoint: &str,
		body: Option<Value>,
		opts: Option<RequestOptions>,
	) -> Result<Value> {
		self.send(Method::Post, endpoint, body, opts.unwrap_or_default()).await
	}

	/// `PUT endpoint` with an optional JSON body.
	pub async fn put(
		&self,
		endpoint: &str,
		body: Option<Value>,
		opts: Option<RequestOptions>,
	) -> Result<Value> {
		self.send(Method::Put, endpoint, body, opts.unwrap_or_default()).await
	}

	/// `DELETE endpoint` with an optional JSON body.
	pub async fn delete(
		&self,
		endpoint: &str,
		body: Option<Value>,
		opts: Option<RequestOptions>,
	) -> Result<Value> {
		self.send(Method::Delete, endpoint, body, opts.unwrap_or_default()).await
	}

	/// [`HttpClient::get`], decoding the body into `T`.
	pub async fn get_json<T>(&self, endpoint: &str, opts: Option<RequestOptions>) -> Result<T>
	where
		T: DeserializeOwned,
	{
		decode(self.get(endpoint, opts).await?)
	}

	/// [`HttpClient::post`], decoding the body into `T`.
	pub async fn post_json<T>(
		&self,
		endpoint: &str,
		body: Option<Value>,
		opts: Option<RequestOptions>,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		decode(self.post(endpoint, body, opts).await?)
	}

	/// [`HttpClient::put`], decoding the body into `T`.
	pub async fn put_json<T>(
		&self,
		endpoint: &str,
		body: Option<Value>,
		opts: Option<RequestOptions>,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		decode(self.put(endpoint, body, opts).await?)
	}

	/// [`HttpClient::delete`], decoding the body into `T`.
	pub async fn delete_json<T>(
		&self,
		endpoint: &str,
		body: Option<Value>,
		opts: Option<RequestOptions>,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		decode(self.delete(endpoint, body, opts).await?)
	}

	/// Appends a hook run before every subsequent dispatch.
	pub fn register_before_request(&self, hook: Arc<dyn BeforeRequestHook>) {
		self.before_request.push(hook);
	}

	/// Appends a hook run after every subsequent response.
	pub fn register_after_response(&self, hook: Arc<dyn AfterResponseHook>) {
		self.after_response.push(hook);
	}

	/// Dispatches one request and returns the parsed body (`Value::Null` when empty or not
	/// JSON).
	///
	/// On a 401 outside [`AUTH_ENDPOINT_PREFIX`] the refresh callback runs once; if it
	/// succeeds, the identical request is re-sent exactly once without re-running hooks.
	pub async fn send(
		&self,
		method: Method,
		endpoint: &str,
		body: Option<Value>,
		opts: RequestOptions,
	) -> Result<Value> {
		let span = FlowSpan::start(FlowKind::Request, endpoint);
		let result = span.instrument(self.dispatch(&span, method, endpoint, body, opts)).await;

		span.finish(if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure });

		result
	}

	/// Resolves `endpoint` against the base URL.
	///
	/// Absolute `http://` / `https://` endpoints (any case) are returned unchanged; anything
	/// else is appended to the base URL verbatim, without slash normalization.
	pub fn resolve_url(&self, endpoint: &str) -> String {
		if is_absolute(endpoint) {
			endpoint.to_owned()
		} else {
			format!("{}{endpoint}", self.base_url)
		}
	}

	/// Builds the outgoing request: merged headers, JSON body, bearer token, and credentials.
	pub fn build_request(
		&self,
		method: Method,
		body: Option<&Value>,
		opts: RequestOptions,
	) -> Result<HttpRequest> {
		let RequestOptions { mut headers, credentials } = opts;
		let body = match body.filter(|b| !b.is_null() && method != Method::Get) {
			Some(value) => {
				set_managed_header(&mut headers, "Content-Type", "application/json".into());

				Some(serde_json::to_string(value).map_err(ConfigError::Body)?)
			},
			None => None,
		};

		if let Some(token) =
			self.token_source.as_ref().and_then(|s| s.token()).filter(|t| !t.is_empty())
		{
			set_managed_header(&mut headers, "Authorization", format!("Bearer {token}"));
		}

		let credentials = credentials.or(self.credentials).unwrap_or_default();

		Ok(HttpRequest { method, headers, body, credentials })
	}

	async fn dispatch(
		&self,
		span: &FlowSpan,
		method: Method,
		endpoint: &str,
		body: Option<Value>,
		opts: RequestOptions,
	) -> Result<Value> {
		let mut request = self.build_request(method, body.as_ref(), opts)?;
		let url = self.parse_url(endpoint)?;

		self.logger.info(&format!("[Fetch] → {method} {url}"));
		self.before_request.run(&mut request).await?;

		let response = self.transport.execute(&url, &request).await?;

		span.record_status(response.status);
		self.after_response.run(&response).await?;

		let data = response.json_lenient();

		self.logger.info(&format!("[Fetch] ← {} {endpoint}", response.status));

		if response.is_success() {
			return Ok(data);
		}

		self.handle_error(span, response, endpoint, &request, data).await
	}

	async fn handle_error(
		&self,
		span: &FlowSpan,
		response: HttpResponse,
		endpoint: &str,
		request: &HttpRequest,
		data: Value,
	) -> Result<Value> {
		if response.status == 401 && !endpoint.starts_with(AUTH_ENDPOINT_PREFIX) {
			self.logger.warn("[Fetch] 401 received, attempting refresh...");

			if self.try_refresh(endpoint).await {
				let retry_url = self.parse_url(endpoint)?;
				let retry = self.transport.execute(&retry_url, request).await?;
				let retry_data = retry.json_lenient();

				span.record_status(retry.status);

				self.logger.info(&format!("[Fetch] ← {} {endpoint} (retry)", retry.status));

				if retry.is_success() {
					return Ok(retry_data);
				}

				return Err(
					HttpError::from_response(&retry, retry_data, &self.message_rules).into()
				);
			}
		}

		Err(HttpError::from_response(&response, data, &self.message_rules).into())
	}

	fn parse_url(&self, endpoint: &str) -> Result<Url> {
		let url = self.resolve_url(endpoint);

		Url::parse(&url).map_err(|source| ConfigError::InvalidUrl { url, source }.into())
	}
}
impl Debug for HttpClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpClient")
			.field("base_url", &self.base_url)
			.field("credentials", &self.credentials)
			.field("token_source_set", &self.token_source.is_some())
			.field("refresher_set", &self.refresher.is_some())
			.field("before_request", &self.before_request)
			.field("after_response", &self.after_response)
			.field("single_flight_refresh", &self.single_flight_refresh)
			.finish()
	}
}

/// Builder for [`HttpClient`].
pub struct HttpClientBuilder {
	base_url: String,
	transport: Option<Arc<dyn HttpTransport>>,
	token_source: Option<Arc<dyn TokenSource>>,
	token_sink: Option<Arc<dyn TokenSink>>,
	refresher: Option<Arc<dyn Refresher>>,
	logger: Arc<dyn Logger>,
	events: Arc<dyn EventSink>,
	credentials: Option<CredentialsMode>,
	message_rules: MessageRules,
	single_flight_refresh: bool,
}
impl HttpClientBuilder {
	/// Creates a builder with `include` credentials, default message rules, no-op logger and
	/// event sink, and single-flight refresh enabled.
	pub fn new(base_url: impl Into<String>) -> Self {
		Self {
			base_url: base_url.into(),
			transport: None,
			token_source: None,
			token_sink: None,
			refresher: None,
			logger: Arc::new(NoopLogger),
			events: Arc::new(NoopEventSink),
			credentials: Some(CredentialsMode::Include),
			message_rules: MessageRules::default(),
			single_flight_refresh: true,
		}
	}

	/// Uses a custom transport instead of the default reqwest one.
	pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
		self.transport = Some(transport);

		self
	}

	/// Supplies the bearer token for each request.
	pub fn token_source(mut self, source: Arc<dyn TokenSource>) -> Self {
		self.token_source = Some(source);

		self
	}

	/// Receives token clears after a failed refresh.
	pub fn token_sink(mut self, sink: Arc<dyn TokenSink>) -> Self {
		self.token_sink = Some(sink);

		self
	}

	/// Refresh routine run on 401.
	pub fn refresher(mut self, refresher: Arc<dyn Refresher>) -> Self {
		self.refresher = Some(refresher);

		self
	}

	/// Wires one [`AuthState`] as token source, token sink, and refresher.
	pub fn auth_state(self, auth: Arc<AuthState>) -> Self {
		self.token_source(auth.clone()).token_sink(auth.clone()).refresher(auth)
	}

	/// Replaces the logger.
	pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
		self.logger = logger;

		self
	}

	/// Destination for logout notifications.
	pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
		self.events = events;

		self
	}

	/// Default credentials mode; `None` falls back to `same-origin`.
	pub fn credentials(mut self, mode: impl Into<Option<CredentialsMode>>) -> Self {
		self.credentials = mode.into();

		self
	}

	/// Replaces the error-message normalization rules.
	pub fn message_rules(mut self, rules: MessageRules) -> Self {
		self.message_rules = rules;

		self
	}

	/// Toggles sharing one in-flight refresh across concurrently failing requests.
	pub fn single_flight_refresh(mut self, enabled: bool) -> Self {
		self.single_flight_refresh = enabled;

		self
	}

	/// Finalizes the client.
	pub fn build(self) -> Result<HttpClient> {
		let transport = match self.transport {
			Some(transport) => transport,
			None => default_transport()?,
		};

		Ok(HttpClient {
			base_url: self.base_url,
			transport,
			token_source: self.token_source,
			token_sink: self.token_sink,
			refresher: self.refresher,
			logger: self.logger,
			events: self.events,
			credentials: self.credentials,
			message_rules: self.message_rules,
			before_request: HookList::default(),
			after_response: HookList::default(),
			single_flight_refresh: self.single_flight_refresh,
			refresh_gate: RefreshGate::default(),
			refresh_metrics: Default::default(),
		})
	}
}
impl Debug for HttpClientBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpClientBuilder")
			.field("base_url", &self.base_url)
			.field("transport_set", &self.transport.is_some())
			.field("credentials", &self.credentials)
			.finish()
	}
}

#[cfg(feature = "reqwest")]
fn default_transport() -> Result<Arc<dyn HttpTransport>> {
	let client = ReqwestClient::builder().build().map_err(ConfigError::http_client_build)?;

	Ok(Arc::new(ReqwestTransport::with_client(client)))
}
#[cfg(not(feature = "reqwest"))]
fn default_transport() -> Result<Arc<dyn HttpTransport>> {
	Err(ConfigError::MissingTransport.into())
}

// Replaces every case variant of `name` so the transport never sends it twice.
fn set_managed_header(headers: &mut BTreeMap<String, String>, name: &str, value: String) {
	headers.retain(|key, _| !key.eq_ignore_ascii_case(name));
	headers.insert(name.to_owned(), value);
}

fn is_absolute(endpoint: &str) -> bool {
	let lower = endpoint.get(..8).unwrap_or(endpoint).to_ascii_lowercase();

	lower.starts_with("http://") || lower.starts_with("https://")
}

fn decode<T>(value: Value) -> Result<T>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(value).map_err(|source| Error::Decode { source })
}
