//! Unverified JWT payload decoding used for client-side expiry checks.
//!
//! Signatures are never checked here; the server stays the authority. The client only
//! needs `exp` to decide whether a refresh is worth attempting before navigating.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::_prelude::*;

/// Registered claims read from a token payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
	/// Expiry, in seconds since the Unix epoch.
	#[serde(default, deserialize_with = "lenient_timestamp")]
	pub exp: Option<i64>,
	/// Issued-at, in seconds since the Unix epoch.
	#[serde(default, deserialize_with = "lenient_timestamp")]
	pub iat: Option<i64>,
	/// Subject.
	#[serde(default)]
	pub sub: Option<String>,
}
impl TokenClaims {
	/// Decodes the payload segment of `token`; `None` when it is not a readable JWT.
	pub fn decode(token: &str) -> Option<Self> {
		let mut segments = token.split('.');
		let payload = match (segments.next(), segments.next(), segments.next()) {
			(Some(_), Some(payload), Some(_)) if segments.next().is_none() => payload,
			_ => return None,
		};
		// Some issuers keep the padding.
		let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;

		serde_json::from_slice(&bytes).ok()
	}

	/// Expiry as an instant, when present and representable.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		OffsetDateTime::from_unix_timestamp(self.exp?).ok()
	}

	/// Whether the token is expired at `now`, tolerating `skew` of lateness.
	///
	/// Tokens without a usable `exp` claim are expired, as are checks whose `now - skew` falls
	/// outside the representable range.
	pub fn is_expired_at(&self, now: OffsetDateTime, skew: Duration) -> bool {
		match (self.expires_at(), now.checked_sub(skew)) {
			(Some(expires_at), Some(cutoff)) => expires_at <= cutoff,
			_ => true,
		}
	}
}

// Accepts integer or fractional seconds.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	let value = Option::<Value>::deserialize(deserializer)?;

	Ok(value.and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))))
}

#[cfg(test)]
pub(crate) fn encode_unsigned(payload: &Value) -> String {
	let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
	let body = URL_SAFE_NO_PAD.encode(payload.to_string());

	format!("{header}.{body}.sig")
}
