//! Bearer-token HTTP client with ordered hook pipelines, one-shot refresh-and-retry, and
//! auth-aware navigation guards.
//!
//! The crate is organized leaf-first:
//!
//! - [`auth::AuthState`] owns the current token and a persisted "has session" flag.
//! - [`client::HttpClient`] builds requests, injects bearer tokens, runs hooks, normalizes
//!   failures into [`error::HttpError`], and retries once after a successful refresh.
//! - [`safe`] converts client failures into [`safe::SafeResult`] values.
//! - [`guard::RequireAuth`] turns the auth state into allow/redirect navigation decisions.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod error;
pub mod events;
pub mod guard;
pub mod http;
pub mod obs;
pub mod safe;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{BoxError, Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
