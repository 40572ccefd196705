#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use bearer_fetch::{
	client::{AfterResponseHook, BeforeRequestHook, HookFuture, HttpClient},
	error::Error,
	http::{HttpRequest, HttpResponse, RequestOptions},
};
use std::sync::{Arc, Mutex};

fn client_for(server: &MockServer, token: &'static str) -> HttpClient {
	HttpClient::builder(server.base_url())
		.token_source(Arc::new(move || Some(token.to_owned())))
		.build()
		.expect("Client should build with the default reqwest transport.")
}

struct Recorder {
	name: &'static str,
	log: Arc<Mutex<Vec<String>>>,
}
impl BeforeRequestHook for Recorder {
	fn before_request<'a>(&'a self, request: &'a mut HttpRequest) -> HookFuture<'a> {
		Box::pin(async move {
			self.log.lock().expect("Hook log lock should not be poisoned.").push(self.name.into());
			request.headers.insert("x-hooked".into(), self.name.into());

			Ok(())
		})
	}
}
impl AfterResponseHook for Recorder {
	fn after_response<'a>(&'a self, response: &'a HttpResponse) -> HookFuture<'a> {
		Box::pin(async move {
			self.log
				.lock()
				.expect("Hook log lock should not be poisoned.")
				.push(format!("{}:{}", self.name, response.status));

			Ok(())
		})
	}
}

#[tokio::test]
async fn get_attaches_bearer_token_and_parses_json() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/users").header("authorization", "Bearer abc");
			then.status(200)
				.header("content-type", "application/json")
				.body("[{\"id\":1},{\"id\":2}]");
		})
		.await;
	let client = client_for(&server, "abc");
	let users = client.get("/users", None).await.expect("GET /users should succeed.");

	mock.assert_async().await;

	assert_eq!(users, json!([{ "id": 1 }, { "id": 2 }]));
}

#[tokio::test]
async fn post_sends_json_body_with_content_type() {
	let server = MockServer::start_async().await;
	let payload = json!({ "sku": "w-1", "qty": 3 });
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/orders")
				.header("content-type", "application/json")
				.json_body(json!({ "sku": "w-1", "qty": 3 }));
			then.status(201).body("{\"id\":\"o-9\"}");
		})
		.await;
	let client = client_for(&server, "abc");
	let created = client
		.post("/orders", Some(payload), None)
		.await
		.expect("POST /orders should succeed.");

	mock.assert_async().await;

	assert_eq!(created["id"], "o-9");
}

#[tokio::test]
async fn absolute_urls_bypass_the_base_url() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/elsewhere");
			then.status(200).body("");
		})
		.await;
	let client = HttpClient::builder("http://127.0.0.1:9/unused")
		.build()
		.expect("Client should build with the default reqwest transport.");
	let body = client
		.get(&server.url("/elsewhere"), None)
		.await
		.expect("Absolute GET should reach the mock server.");

	mock.assert_async().await;

	assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn hooks_run_in_order_around_dispatch() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(PUT).path("/profile").header("x-hooked", "second");
			then.status(200).body("{\"ok\":true}");
		})
		.await;
	let client = client_for(&server, "abc");
	let log = Arc::new(Mutex::new(Vec::new()));

	client.register_before_request(Arc::new(Recorder { name: "first", log: log.clone() }));
	client.register_before_request(Arc::new(Recorder { name: "second", log: log.clone() }));
	client.register_after_response(Arc::new(Recorder { name: "after", log: log.clone() }));
	client
		.put("/profile", Some(json!({ "bio": "hi" })), None)
		.await
		.expect("PUT /profile should succeed.");

	mock.assert_async().await;

	assert_eq!(
		*log.lock().expect("Hook log lock should not be poisoned."),
		vec!["first".to_owned(), "second".to_owned(), "after:200".to_owned()]
	);
}

#[tokio::test]
async fn validation_errors_are_normalized() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/register");
			then.status(400).json_body(json!({
				"message": "body/pwd should match pattern \"^.{8,}$\"",
				"code": "FST_ERR_VALIDATION",
			}));
		})
		.await;

	let client = client_for(&server, "");
	let err = client
		.post("/auth/register", Some(json!({ "user": "a", "pwd": "b" })), None)
		.await
		.expect_err("Registration should be rejected.");

	match err {
		Error::Http(e) => {
			assert_eq!(e.status, 400);
			assert_eq!(e.code, "FST_ERR_VALIDATION");
			assert_eq!(e.message, "Password should match pattern \"^.{8,}$\"");
			assert_eq!(e.data["code"], "FST_ERR_VALIDATION");
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}
}

#[tokio::test]
async fn empty_token_sends_no_authorization_header() {
	let server = MockServer::start_async().await;
	let with_header = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/sessions/1").header_exists("authorization");
			then.status(500);
		})
		.await;
	let without_header = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/sessions/1");
			then.status(204);
		})
		.await;
	let client = client_for(&server, "");
	let opts = RequestOptions::default().with_header("x-request-id", "r-1");

	client
		.delete("/sessions/1", None, Some(opts))
		.await
		.expect("DELETE without a token should hit the header-less mock.");

	with_header.assert_hits_async(0).await;
	without_header.assert_async().await;
}

#[tokio::test]
async fn status_text_is_the_fallback_message() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/missing");
			then.status(404).body("<html>nope</html>");
		})
		.await;

	let client = client_for(&server, "abc");
	let err = client.get("/missing", None).await.expect_err("Missing resource should fail.");

	assert_eq!(err.status(), Some(404));
	assert_eq!(err.code(), Some("HTTP_ERROR"));
	assert_eq!(err.to_string(), "Not Found");
}
