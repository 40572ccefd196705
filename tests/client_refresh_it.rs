#![cfg(feature = "reqwest")]

// std
use std::sync::{
	Arc, Mutex,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use httpmock::prelude::*;
// self
use bearer_fetch::{
	auth::AuthState,
	client::HttpClient,
	error::BoxError,
	events::{AuthEvent, EventBus, LogoutReason},
	store::{KeyValueStore, MemoryStore},
};

fn counting_refresher(
	calls: Arc<AtomicUsize>,
	outcome: bool,
) -> impl Fn() -> std::future::Ready<Result<bool, BoxError>> + Send + Sync {
	move || {
		calls.fetch_add(1, Ordering::SeqCst);

		std::future::ready(Ok(outcome))
	}
}

fn recording_bus() -> (EventBus, Arc<Mutex<Vec<AuthEvent>>>) {
	let bus = EventBus::default();
	let events = Arc::new(Mutex::new(Vec::new()));
	let sink = events.clone();

	bus.subscribe(move |event| {
		sink.lock().expect("Event log lock should not be poisoned.").push(event.clone())
	});

	(bus, events)
}

#[tokio::test]
async fn unauthorized_request_is_retried_once_after_refresh() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/orders").header("authorization", "Bearer stale");
			then.status(401).body("{\"message\":\"token expired\",\"code\":\"TOKEN_EXPIRED\"}");
		})
		.await;
	let calls = Arc::new(AtomicUsize::new(0));
	let client = HttpClient::builder(server.base_url())
		.token_source(Arc::new(|| Some("stale".to_owned())))
		.refresher(Arc::new(counting_refresher(calls.clone(), true)))
		.build()
		.expect("Client should build.");
	let err = client.get("/orders", None).await.expect_err("Retry should still be rejected.");

	mock.assert_hits_async(2).await;

	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert_eq!(err.status(), Some(401));
	assert_eq!(err.code(), Some("TOKEN_EXPIRED"));
	assert_eq!(err.to_string(), "Token expired");
	assert_eq!(client.refresh_metrics().successes(), 1);
}

#[tokio::test]
async fn auth_endpoints_fail_without_refreshing() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/login");
			then.status(401).body("{\"error\":\"Invalid credentials\"}");
		})
		.await;
	let calls = Arc::new(AtomicUsize::new(0));
	let (bus, events) = recording_bus();
	let client = HttpClient::builder(server.base_url())
		.refresher(Arc::new(counting_refresher(calls.clone(), true)))
		.event_sink(Arc::new(bus))
		.build()
		.expect("Client should build.");
	let err = client
		.post("/auth/login", Some(serde_json::json!({ "user": "a" })), None)
		.await
		.expect_err("Login should be rejected.");

	mock.assert_hits_async(1).await;

	assert_eq!(calls.load(Ordering::SeqCst), 0);
	assert_eq!(err.to_string(), "Invalid credentials");
	assert!(events.lock().expect("Event log lock should not be poisoned.").is_empty());
}

#[tokio::test]
async fn failed_refresh_logs_out_the_auth_state() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/me");
			then.status(401);
		})
		.await;
	let store = MemoryStore::default();
	let fetcher = || async { Ok::<Option<String>, BoxError>(None) };
	let auth = Arc::new(
		AuthState::new("session", Arc::new(store.clone())).with_fetcher(Arc::new(fetcher)),
	);

	auth.set_token(Some("stale")).expect("Seeding the auth state should succeed.");

	let (bus, events) = recording_bus();
	let client = HttpClient::builder(server.base_url())
		.auth_state(auth.clone())
		.event_sink(Arc::new(bus))
		.build()
		.expect("Client should build.");
	let err = client.get("/me", None).await.expect_err("Original 401 should surface.");

	mock.assert_hits_async(1).await;

	assert_eq!(err.status(), Some(401));
	assert!(!auth.is_logged_in());
	assert_eq!(store.get("session").expect("Store read should succeed."), None);
	assert_eq!(
		*events.lock().expect("Event log lock should not be poisoned."),
		vec![AuthEvent::Logout { reason: LogoutReason::RefreshFailed }]
	);
}

#[tokio::test]
async fn refresh_through_auth_state_rotates_the_stored_token() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/me");
			then.status(401);
		})
		.await;
	let fetcher = || async { Ok::<_, BoxError>(Some("fresh".to_owned())) };
	let auth = Arc::new(
		AuthState::new("session", Arc::new(MemoryStore::default()))
			.with_fetcher(Arc::new(fetcher)),
	);
	let client = HttpClient::builder(server.base_url())
		.auth_state(auth.clone())
		.build()
		.expect("Client should build.");
	let _ = client.get("/me", None).await.expect_err("Retry should still be rejected.");

	mock.assert_hits_async(2).await;

	assert_eq!(auth.token().map(|t| t.expose().to_owned()), Some("fresh".into()));
}
