//! Callback contracts wiring credentials into the client without a concrete auth type.
//!
//! [`HttpClient`](crate::client::HttpClient) only ever sees these traits. Closures
//! implement them directly, and [`AuthState`](crate::auth::AuthState) implements the three
//! client-facing ones so a single session object can back a client.
//!
//! There is exactly one refresh contract on the client side: [`Refresher`] reports
//! success as a boolean. Token-producing routines plug into
//! [`AuthState`](crate::auth::AuthState) as a [`TokenFetcher`], and the auth state stores
//! the new token before reporting success.

// self
use crate::_prelude::*;

/// Boxed future returned by [`Refresher::refresh`].
pub type RefreshFuture<'a> = Pin<Box<dyn Future<Output = Result<bool, BoxError>> + 'a + Send>>;

/// Boxed future returned by [`TokenFetcher::fetch_token`].
pub type FetchFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Option<String>, BoxError>> + 'a + Send>>;

/// Supplies the current bearer token, if any.
pub trait TokenSource
where
	Self: Send + Sync,
{
	/// Current token; `None` or an empty string means "send no `Authorization` header".
	fn token(&self) -> Option<String>;
}
impl<F> TokenSource for F
where
	F: Fn() -> Option<String> + Send + Sync,
{
	fn token(&self) -> Option<String> {
		self()
	}
}

/// Receives token changes decided by the client (currently only "token cleared").
pub trait TokenSink
where
	Self: Send + Sync,
{
	/// Called with the new token, or `None` when credentials must be dropped.
	fn on_token(&self, token: Option<&str>);
}
impl<F> TokenSink for F
where
	F: Fn(Option<&str>) + Send + Sync,
{
	fn on_token(&self, token: Option<&str>) {
		self(token)
	}
}

/// Attempts to refresh credentials and reports whether it worked.
///
/// `Ok(false)` and `Err(_)` are both failures; the client distinguishes them only in the
/// logout reason it publishes.
pub trait Refresher
where
	Self: Send + Sync,
{
	/// Runs one refresh attempt.
	fn refresh(&self) -> RefreshFuture<'_>;
}
impl<F, Fut> Refresher for F
where
	F: Fn() -> Fut + Send + Sync,
	Fut: 'static + Send + Future<Output = Result<bool, BoxError>>,
{
	fn refresh(&self) -> RefreshFuture<'_> {
		Box::pin(self())
	}
}

/// Obtains a fresh token for [`AuthState`](crate::auth::AuthState).
pub trait TokenFetcher
where
	Self: Send + Sync,
{
	/// Returns a new token, or `None` when the session cannot be renewed.
	fn fetch_token(&self) -> FetchFuture<'_>;
}
impl<F, Fut> TokenFetcher for F
where
	F: Fn() -> Fut + Send + Sync,
	Fut: 'static + Send + Future<Output = Result<Option<String>, BoxError>>,
{
	fn fetch_token(&self) -> FetchFuture<'_> {
		Box::pin(self())
	}
}
