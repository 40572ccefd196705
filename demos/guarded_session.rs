//! Wires one `AuthState` into the client and a navigation guard, then walks a session through
//! a rejected request, a token refresh, and a guard check against a local mock API.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use bearer_fetch::{
	auth::AuthState,
	client::HttpClient,
	error::BoxError,
	events::{AuthEvent, EventBus},
	guard::{GuardContext, RequireAuthOptions, require_auth},
	store::MemoryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let profile_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/profile");
			then.status(401).body("{\"message\":\"token expired\",\"code\":\"TOKEN_EXPIRED\"}");
		})
		.await;
	let fetcher = || async { Ok::<_, BoxError>(Some("demo-refreshed".to_owned())) };
	let auth = Arc::new(
		AuthState::with_default_key(Arc::new(MemoryStore::default()))
			.with_fetcher(Arc::new(fetcher)),
	);

	auth.set_token(Some("demo-stale"))?;

	let bus = EventBus::default();

	bus.subscribe(|event: &AuthEvent| println!("Auth event: {}.", event.name()));

	let client = HttpClient::builder(server.base_url())
		.auth_state(auth.clone())
		.event_sink(Arc::new(bus))
		.build()?;

	match client.get("/profile", None).await {
		Ok(profile) => println!("Profile: {profile}."),
		Err(e) => println!("Profile request failed after one retry: {e}."),
	}

	profile_mock.assert_hits_async(2).await;

	println!(
		"Token after refresh: {}.",
		auth.token().map(|t| t.to_string()).unwrap_or_else(|| "<none>".into())
	);

	let guard = require_auth(auth.clone(), RequireAuthOptions::default());
	let decision = guard.check(&GuardContext::new("/dashboard").with_query("tab=2")).await;

	match decision.redirect() {
		Some(to) => println!("Guard redirected to {to}."),
		None => println!("Guard allowed /dashboard."),
	}

	Ok(())
}
