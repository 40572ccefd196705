//! Navigation guards built on [`AuthState`].
//!
//! [`RequireAuth`] decides whether a route transition may proceed. It reads the auth state
//! directly rather than going through the HTTP client, and fails closed: any doubt about the
//! session produces a redirect to the login path carrying a `next` parameter.

// self
use crate::{
	_prelude::*,
	auth::AuthState,
	obs::{FlowKind, FlowOutcome, FlowSpan, Logger, NoopLogger},
};

/// Route prefix reserved for API traffic; navigation into it is always rejected.
pub const RESERVED_API_PREFIX: &str = "/api/";

/// Boxed future returned by [`SessionCheck::check_session`].
pub type SessionCheckFuture<'a> =
	Pin<Box<dyn Future<Output = Result<bool, BoxError>> + 'a + Send>>;

/// Server-side session verification run after local checks pass.
pub trait SessionCheck
where
	Self: Send + Sync,
{
	/// Returns whether the session is still valid upstream.
	fn check_session(&self) -> SessionCheckFuture<'_>;
}
impl<F, Fut> SessionCheck for F
where
	F: Fn() -> Fut + Send + Sync,
	Fut: 'static + Send + Future<Output = Result<bool, BoxError>>,
{
	fn check_session(&self) -> SessionCheckFuture<'_> {
		Box::pin(self())
	}
}

/// Target of a navigation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GuardContext {
	/// Requested path; may already carry a query or fragment.
	pub path: String,
	/// Query string, with or without the leading `?`.
	pub query: Option<String>,
	/// Fragment, with or without the leading `#`.
	pub fragment: Option<String>,
}
impl GuardContext {
	/// Context for `path` with no separate query or fragment.
	pub fn new(path: impl Into<String>) -> Self {
		Self { path: path.into(), query: None, fragment: None }
	}

	/// Attaches a query string.
	pub fn with_query(mut self, query: impl Into<String>) -> Self {
		self.query = Some(query.into());

		self
	}

	/// Attaches a fragment.
	pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
		self.fragment = Some(fragment.into());

		self
	}

	/// `path + query + fragment`, restoring the `?` / `#` separators when missing.
	pub fn target(&self) -> String {
		let mut target = self.path.clone();

		push_part(&mut target, self.query.as_deref(), '?');
		push_part(&mut target, self.fragment.as_deref(), '#');

		target
	}
}

fn push_part(target: &mut String, part: Option<&str>, separator: char) {
	let Some(part) = part.filter(|p| !p.is_empty() && *p != separator.to_string()) else {
		return;
	};

	if !part.starts_with(separator) {
		target.push(separator);
	}

	target.push_str(part);
}

/// Outcome of a guard check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
	/// Navigation may proceed.
	Allow,
	/// Navigation must go to this path instead.
	Redirect(String),
}
impl GuardDecision {
	/// Returns `true` for [`GuardDecision::Allow`].
	pub fn is_allowed(&self) -> bool {
		matches!(self, Self::Allow)
	}

	/// Redirect target, if any.
	pub fn redirect(&self) -> Option<&str> {
		match self {
			Self::Allow => None,
			Self::Redirect(path) => Some(path),
		}
	}
}

/// Configuration for [`RequireAuth`].
#[derive(Clone)]
pub struct RequireAuthOptions {
	/// Path redirected to when the session is missing or invalid.
	pub login_path: String,
	/// Optional upstream verification run once local checks pass.
	pub session_check: Option<Arc<dyn SessionCheck>>,
	/// Logger for guard decisions.
	pub logger: Arc<dyn Logger>,
}
impl RequireAuthOptions {
	/// Default login path.
	pub const DEFAULT_LOGIN_PATH: &'static str = "/login";

	/// Overrides the login path.
	pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = path.into();

		self
	}

	/// Adds an upstream session check.
	pub fn with_session_check(mut self, check: Arc<dyn SessionCheck>) -> Self {
		self.session_check = Some(check);

		self
	}

	/// Replaces the logger.
	pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
		self.logger = logger;

		self
	}
}
impl Default for RequireAuthOptions {
	fn default() -> Self {
		Self {
			login_path: Self::DEFAULT_LOGIN_PATH.into(),
			session_check: None,
			logger: Arc::new(NoopLogger),
		}
	}
}
impl Debug for RequireAuthOptions {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequireAuthOptions")
			.field("login_path", &self.login_path)
			.field("session_check_set", &self.session_check.is_some())
			.finish()
	}
}

/// Guard admitting only authenticated navigations.
#[derive(Clone, Debug)]
pub struct RequireAuth {
	auth: Arc<AuthState>,
	options: RequireAuthOptions,
}
impl RequireAuth {
	/// Creates the guard.
	pub fn new(auth: Arc<AuthState>, options: RequireAuthOptions) -> Self {
		Self { auth, options }
	}

	/// Decides whether navigation to `ctx` may proceed.
	///
	/// 1. Not logged in: redirect.
	/// 2. Token expired: try [`AuthState::init_from_storage`]; redirect unless it succeeds.
	/// 3. Session check configured: allow only when it reports `true`; otherwise clear the auth
	///    state and redirect. Errors from the check are logged and count as `false`.
	/// 4. Otherwise allow.
	pub async fn check(&self, ctx: &GuardContext) -> GuardDecision {
		let span = FlowSpan::start(FlowKind::Guard, &ctx.path);
		let decision = span.instrument(self.decide(ctx)).await;

		span.finish(match decision {
			GuardDecision::Allow => FlowOutcome::Success,
			GuardDecision::Redirect(_) => FlowOutcome::Failure,
		});

		decision
	}

	async fn decide(&self, ctx: &GuardContext) -> GuardDecision {
		let logger = &self.options.logger;
		let target = ctx.target();

		logger.info(&format!("[Guard] Checking auth for: {target}"));

		if !self.auth.is_logged_in() {
			logger.warn("[Guard] Not logged in.");

			return self.redirect(&target);
		}
		if self.auth.is_token_expired(Duration::ZERO) {
			logger.info("[Guard] Token expired, refreshing...");

			match self.auth.init_from_storage().await {
				Ok(true) => {},
				Ok(false) => {
					logger.warn("[Guard] Refresh failed");

					return self.redirect(&target);
				},
				Err(e) => {
					logger.error(&format!("[Guard] Refresh failed: {e}"));

					return self.redirect(&target);
				},
			}
		}

		let Some(check) = &self.options.session_check else {
			return GuardDecision::Allow;
		};

		match check.check_session().await {
			Ok(true) => {
				logger.info("[Guard] Session check OK");

				return GuardDecision::Allow;
			},
			Ok(false) => logger.warn("[Guard] Session check failed"),
			Err(e) => logger.error(&format!("[Guard] Session check exception: {e}")),
		}

		if let Err(e) = self.auth.clear() {
			logger.error(&format!("[Guard] Failed to clear auth state: {e}"));
		}

		self.redirect(&target)
	}

	fn redirect(&self, target: &str) -> GuardDecision {
		GuardDecision::Redirect(format!(
			"{}?next={}",
			self.options.login_path,
			encode_uri_component(target)
		))
	}
}

/// Builds a [`RequireAuth`] guard.
pub fn require_auth(auth: Arc<AuthState>, options: RequireAuthOptions) -> RequireAuth {
	RequireAuth::new(auth, options)
}

/// Rejects navigation into [`RESERVED_API_PREFIX`].
pub fn on_before_navigate(to: &str) -> bool {
	!to.starts_with(RESERVED_API_PREFIX)
}

/// Percent-encodes `input` like JavaScript's `encodeURIComponent`.
///
/// Leaves `A-Z a-z 0-9 - _ . ! ~ * ' ( )` untouched and encodes every other UTF-8 byte as
/// `%XX` (upper-case hex).
pub fn encode_uri_component(input: &str) -> String {
	const HEX: &[u8; 16] = b"0123456789ABCDEF";

	let mut out = String::with_capacity(input.len());

	for &b in input.as_bytes() {
		if b.is_ascii_alphanumeric() || b"-_.!~*'()".contains(&b) {
			out.push(b as char);
		} else {
			out.push('%');
			out.push(HEX[(b >> 4) as usize] as char);
			out.push(HEX[(b & 0x0F) as usize] as char);
		}
	}

	out
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn encoding_matches_javascript() {
		assert_eq!(encode_uri_component("/dashboard?tab=2"), "%2Fdashboard%3Ftab%3D2");
		assert_eq!(encode_uri_component("a b&c#d"), "a%20b%26c%23d");
		assert_eq!(encode_uri_component("-_.!~*'()"), "-_.!~*'()");
		assert_eq!(encode_uri_component("é"), "%C3%A9");
	}

	#[test]
	fn target_joins_query_and_fragment() {
		assert_eq!(GuardContext::new("/dashboard?tab=2").target(), "/dashboard?tab=2");
		assert_eq!(
			GuardContext::new("/docs").with_query("page=3").with_fragment("#intro").target(),
			"/docs?page=3#intro"
		);
		assert_eq!(GuardContext::new("/docs").with_query("?").target(), "/docs");
	}

	#[test]
	fn api_routes_are_rejected() {
		assert!(!on_before_navigate("/api/internal"));
		assert!(on_before_navigate("/settings"));
		assert!(on_before_navigate("/apiary"));
	}

	#[test]
	fn decision_accessors() {
		assert!(GuardDecision::Allow.is_allowed());
		assert_eq!(GuardDecision::Redirect("/login".into()).redirect(), Some("/login"));
	}
}
