//! Session holder: current bearer token plus a persisted "has session" flag.

// self
use crate::{
	_prelude::*,
	auth::{RefreshFuture, Refresher, TokenFetcher, TokenSecret, TokenSink, TokenSource},
	obs::{Logger, NoopLogger},
	store::KeyValueStore,
};

/// Authentication state for one logical session.
///
/// The token lives in memory only; the store keeps a `"true"` flag under the storage key
/// while a token is held, so a restarted process knows a refresh is worth attempting.
/// Not designed for concurrent writers from independent sessions.
pub struct AuthState {
	token: RwLock<Option<TokenSecret>>,
	storage_key: String,
	store: Arc<dyn KeyValueStore>,
	fetcher: Option<Arc<dyn TokenFetcher>>,
	logger: Arc<dyn Logger>,
}
impl AuthState {
	/// Storage key used by [`AuthState::with_default_key`].
	pub const DEFAULT_STORAGE_KEY: &'static str = "auth:has_session";

	const FLAG_SET: &'static str = "true";

	/// Creates an empty state persisting its flag under `storage_key`.
	pub fn new(storage_key: impl Into<String>, store: Arc<dyn KeyValueStore>) -> Self {
		Self {
			token: RwLock::new(None),
			storage_key: storage_key.into(),
			store,
			fetcher: None,
			logger: Arc::new(NoopLogger),
		}
	}

	/// Creates an empty state using [`AuthState::DEFAULT_STORAGE_KEY`].
	pub fn with_default_key(store: Arc<dyn KeyValueStore>) -> Self {
		Self::new(Self::DEFAULT_STORAGE_KEY, store)
	}

	/// Configures the routine used to obtain fresh tokens.
	pub fn with_fetcher(mut self, fetcher: Arc<dyn TokenFetcher>) -> Self {
		self.fetcher = Some(fetcher);

		self
	}

	/// Replaces the logger.
	pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
		self.logger = logger;

		self
	}

	/// Key under which the session flag is persisted.
	pub fn storage_key(&self) -> &str {
		&self.storage_key
	}

	/// Reloads the persisted flag and, when a fetcher is configured, tries to obtain a
	/// fresh token. Returns whether the session is authenticated afterwards.
	///
	/// A fetcher error or an empty result clears the session.
	pub async fn init_from_storage(&self) -> Result<bool> {
		let persisted = self.has_session()?;

		let Some(fetcher) = self.fetcher.clone() else {
			return Ok(self.current().is_some() || persisted);
		};

		match fetcher.fetch_token().await {
			Ok(Some(token)) if !token.is_empty() => {
				self.set_token(Some(&token))?;

				Ok(true)
			},
			Ok(_) => {
				self.logger.warn("[Auth] Refresh returned no token.");
				self.clear()?;

				Ok(false)
			},
			Err(e) => {
				self.logger.error(&format!("[Auth] Refresh failed: {e}"));
				self.clear()?;

				Ok(false)
			},
		}
	}

	/// `true` when a token is held or the store carries the session flag.
	///
	/// Unreadable storage counts as "no session".
	pub fn is_logged_in(&self) -> bool {
		if self.current().is_some() {
			return true;
		}

		self.has_session().unwrap_or_else(|e| {
			self.logger.warn(&format!("[Auth] Session flag unreadable: {e}"));

			false
		})
	}

	/// Current token, if any.
	pub fn token(&self) -> Option<TokenSecret> {
		self.current()
	}

	/// Stores `token`, or clears the session when `None` or empty.
	pub fn set_token(&self, token: Option<&str>) -> Result<()> {
		match token.and_then(TokenSecret::new) {
			Some(secret) => {
				*self.token.write() = Some(secret);
				self.store.set(&self.storage_key, Self::FLAG_SET)?;

				Ok(())
			},
			None => self.clear(),
		}
	}

	/// Drops the token and the persisted flag unconditionally.
	pub fn clear(&self) -> Result<()> {
		*self.token.write() = None;
		self.store.remove(&self.storage_key)?;

		Ok(())
	}

	/// Whether the held token is expired, allowing `skew` of lateness.
	///
	/// No token, or a token without a decodable `exp` claim, counts as expired.
	pub fn is_token_expired(&self, skew: Duration) -> bool {
		self.is_token_expired_at(OffsetDateTime::now_utc(), skew)
	}

	/// [`AuthState::is_token_expired`] against an explicit clock reading.
	pub fn is_token_expired_at(&self, now: OffsetDateTime, skew: Duration) -> bool {
		match self.current().and_then(|t| t.claims()) {
			Some(claims) => claims.is_expired_at(now, skew),
			None => true,
		}
	}

	fn current(&self) -> Option<TokenSecret> {
		self.token.read().clone()
	}

	fn has_session(&self) -> Result<bool> {
		Ok(self.store.get(&self.storage_key)?.as_deref() == Some(Self::FLAG_SET))
	}
}
impl Debug for AuthState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthState")
			.field("storage_key", &self.storage_key)
			.field("token_set", &self.token.read().is_some())
			.field("fetcher_set", &self.fetcher.is_some())
			.finish()
	}
}
impl TokenSource for AuthState {
	fn token(&self) -> Option<String> {
		self.current().map(|t| t.expose().to_owned())
	}
}
impl TokenSink for AuthState {
	fn on_token(&self, token: Option<&str>) {
		if let Err(e) = self.set_token(token) {
			self.logger.error(&format!("[Auth] Failed to persist token change: {e}"));
		}
	}
}
impl Refresher for AuthState {
	fn refresh(&self) -> RefreshFuture<'_> {
		Box::pin(async move {
			let Some(fetcher) = self.fetcher.clone() else {
				return Ok(false);
			};

			match fetcher.fetch_token().await? {
				Some(token) if !token.is_empty() => {
					self.set_token(Some(&token))?;

					Ok(true)
				},
				_ => Ok(false),
			}
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::{auth::claims::encode_unsigned, store::MemoryStore};

	fn state() -> (AuthState, MemoryStore) {
		let store = MemoryStore::default();

		(AuthState::new("session", Arc::new(store.clone())), store)
	}

	fn jwt_expiring_in(seconds: i64) -> String {
		let exp = OffsetDateTime::now_utc().unix_timestamp() + seconds;

		encode_unsigned(&serde_json::json!({ "exp": exp }))
	}

	#[test]
	fn set_token_persists_flag_and_clear_removes_it() {
		let (auth, store) = state();

		assert!(!auth.is_logged_in());

		auth.set_token(Some("abc")).expect("Setting a token should succeed.");

		assert!(auth.is_logged_in());
		assert_eq!(
			store.get("session").expect("Store read should succeed."),
			Some("true".into())
		);
		assert_eq!(TokenSource::token(&auth), Some("abc".into()));

		auth.set_token(None).expect("Clearing via set_token should succeed.");

		assert!(!auth.is_logged_in());
		assert!(store.is_empty());

		auth.set_token(Some("abc")).expect("Setting a token should succeed.");
		auth.set_token(Some("")).expect("An empty token should clear the session.");

		assert!(auth.token().is_none());
		assert!(store.is_empty());
	}

	#[test]
	fn persisted_flag_alone_counts_as_logged_in() {
		let (auth, store) = state();

		store.set("session", "true").expect("Store write should succeed.");

		assert!(auth.is_logged_in());
		assert!(auth.token().is_none());
		assert!(auth.is_token_expired(Duration::ZERO));
	}

	#[test]
	fn expiry_checks_decode_the_token() {
		let (auth, _) = state();

		auth.set_token(Some(&jwt_expiring_in(300))).expect("Setting a token should succeed.");

		assert!(!auth.is_token_expired(Duration::ZERO));

		auth.set_token(Some(&jwt_expiring_in(-300))).expect("Setting a token should succeed.");

		assert!(auth.is_token_expired(Duration::ZERO));
		assert!(!auth.is_token_expired(Duration::seconds(600)));

		auth.set_token(Some("opaque")).expect("Setting a token should succeed.");

		assert!(auth.is_token_expired(Duration::ZERO));
	}

	#[tokio::test]
	async fn init_from_storage_uses_fetcher() {
		let store = MemoryStore::default();
		let calls = Arc::new(AtomicUsize::new(0));
		let fetcher = {
			let calls = calls.clone();

			move || {
				calls.fetch_add(1, Ordering::SeqCst);

				async { Ok::<_, BoxError>(Some("fresh".to_owned())) }
			}
		};
		let auth =
			AuthState::new("session", Arc::new(store.clone())).with_fetcher(Arc::new(fetcher));

		assert!(auth.init_from_storage().await.expect("Init should succeed."));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(auth.token().map(|t| t.expose().to_owned()), Some("fresh".into()));
		assert_eq!(
			store.get("session").expect("Store read should succeed."),
			Some("true".into())
		);
	}

	#[tokio::test]
	async fn init_from_storage_clears_on_fetch_failure() {
		let store = MemoryStore::default();

		store.set("session", "true").expect("Store write should succeed.");

		let fetcher = || async { Err::<Option<String>, BoxError>("network down".into()) };
		let auth =
			AuthState::new("session", Arc::new(store.clone())).with_fetcher(Arc::new(fetcher));

		assert!(!auth.init_from_storage().await.expect("Init should swallow fetch errors."));
		assert!(!auth.is_logged_in());
		assert!(store.is_empty());
	}

	#[tokio::test]
	async fn init_from_storage_without_fetcher_reports_flag() {
		let (auth, store) = state();

		assert!(!auth.init_from_storage().await.expect("Init should succeed."));

		store.set("session", "true").expect("Store write should succeed.");

		assert!(auth.init_from_storage().await.expect("Init should succeed."));
	}

	#[tokio::test]
	async fn refresher_adapter_stores_fetched_token() {
		let fetcher = || async { Ok::<_, BoxError>(Some("rotated".to_owned())) };
		let auth = AuthState::new("session", Arc::new(MemoryStore::default()))
			.with_fetcher(Arc::new(fetcher));

		assert!(auth.refresh().await.expect("Refresh should succeed."));
		assert_eq!(TokenSource::token(&auth), Some("rotated".into()));

		let (bare, _) = state();

		assert!(!bare.refresh().await.expect("Refresh without fetcher should report false."));
	}

	#[test]
	fn sink_clears_session() {
		let (auth, store) = state();

		auth.set_token(Some("abc")).expect("Setting a token should succeed.");
		auth.on_token(None);

		assert!(!auth.is_logged_in());
		assert!(store.is_empty());
	}
}
