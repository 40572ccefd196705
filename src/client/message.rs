//! Presentation rules for upstream validation messages.
//!
//! Schema validators upstream report failures such as `body/pwd should match pattern "^.{8,}$"`.
//! [`MessageRules`] strips the prefix, capitalizes the leading field token, then applies a
//! small rename table so the message reads well in a UI.

// self
use crate::_prelude::*;

/// Configurable normalization applied to every [`HttpError`](crate::error::HttpError)
/// message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRules {
	prefix: Option<String>,
	renames: Vec<(String, String)>,
}
impl MessageRules {
	/// Prefix emitted by the upstream schema validator.
	pub const DEFAULT_PREFIX: &'static str = "body/";

	/// Rules that leave every message untouched.
	pub fn none() -> Self {
		Self { prefix: None, renames: Vec::new() }
	}

	/// Rules triggered by `prefix`, with an empty rename table.
	pub fn with_prefix(prefix: impl Into<String>) -> Self {
		Self { prefix: Some(prefix.into()), renames: Vec::new() }
	}

	/// Appends a whole-word rename applied after capitalization.
	pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
		self.renames.push((from.into(), to.into()));

		self
	}

	/// Rewrites `message` when it starts with the configured prefix; otherwise returns it
	/// unchanged.
	pub fn normalize(&self, message: &str) -> String {
		let Some(rest) = self.prefix.as_deref().and_then(|p| message.strip_prefix(p)) else {
			return message.to_owned();
		};
		let field_len = rest.bytes().take_while(|b| is_word_byte(*b)).count();
		let mut out = String::with_capacity(rest.len() + 16);
		let mut chars = rest[..field_len].chars();

		if let Some(first) = chars.next() {
			out.push(first.to_ascii_uppercase());
			out.push_str(chars.as_str());
		}

		out.push_str(&rest[field_len..]);

		for (from, to) in &self.renames {
			if let Some(at) = find_word(&out, from) {
				out.replace_range(at..at + from.len(), to);
			}
		}

		out
	}
}
impl Default for MessageRules {
	/// `body/` prefix with `User → User/Email` and `Pwd → Password`.
	fn default() -> Self {
		Self::with_prefix(Self::DEFAULT_PREFIX)
			.rename("User", "User/Email")
			.rename("Pwd", "Password")
	}
}

fn is_word_byte(b: u8) -> bool {
	b.is_ascii_alphanumeric() || b == b'_'
}

// First occurrence of `word` bounded by non-word characters on both sides.
fn find_word(haystack: &str, word: &str) -> Option<usize> {
	if word.is_empty() {
		return None;
	}

	let bytes = haystack.as_bytes();

	haystack.match_indices(word).map(|(at, _)| at).find(|&at| {
		let end = at + word.len();
		let left = at == 0 || !is_word_byte(bytes[at - 1]);
		let right = end == bytes.len() || !is_word_byte(bytes[end]);

		left && right
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn password_field_is_relabeled() {
		let rules = MessageRules::default();

		assert_eq!(
			rules.normalize("body/pwd should match pattern \"^.{8,}$\""),
			"Password should match pattern \"^.{8,}$\""
		);
	}

	#[test]
	fn login_identifier_is_relabeled() {
		let rules = MessageRules::default();

		assert_eq!(rules.normalize("body/user must be string"), "User/Email must be string");
	}

	#[test]
	fn other_fields_are_only_capitalized() {
		let rules = MessageRules::default();

		assert_eq!(
			rules.normalize("body/email must match format \"email\""),
			"Email must match format \"email\""
		);
		assert_eq!(rules.normalize("body/username is taken"), "Username is taken");
	}

	#[test]
	fn unprefixed_messages_pass_through() {
		let rules = MessageRules::default();

		assert_eq!(rules.normalize("pwd too short"), "pwd too short");
		assert_eq!(MessageRules::none().normalize("body/pwd x"), "body/pwd x");
	}

	#[test]
	fn prefix_without_field_is_stripped() {
		assert_eq!(MessageRules::default().normalize("body/ must be object"), " must be object");
	}

	#[test]
	fn custom_tables_apply_in_order() {
		let rules = MessageRules::with_prefix("query/").rename("Q", "Search term");

		assert_eq!(rules.normalize("query/q is required"), "Search term is required");
		assert_eq!(rules.normalize("body/q is required"), "body/q is required");
	}

	#[test]
	fn renames_respect_word_boundaries() {
		assert_eq!(find_word("Users and User", "User"), Some(10));
		assert_eq!(find_word("PwdX", "Pwd"), None);
		assert_eq!(find_word("anything", ""), None);
	}
}
