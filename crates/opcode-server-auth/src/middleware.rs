// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request authentication context and credential extraction.
//!
//! ```text
//! Request → session cookie? → session lookup → CurrentUser
//!         → Bearer token?   → user token lookup → CurrentUser
//!         → neither         → AuthContext::unauthenticated()
//! ```
//!
//! The lookups themselves live in the server crate; this module only knows
//! how to pull credentials out of headers and what the result looks like.

use http::header::{AUTHORIZATION, COOKIE};
use http::HeaderMap;

use crate::{SessionId, User, UserId};

/// Default name for the session cookie.
pub const SESSION_COOKIE_NAME: &str = "opcode_session";

/// The authenticated user for the current request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
	pub user: User,
	/// Set when the request authenticated with a session cookie.
	pub session_id: Option<SessionId>,
}

impl CurrentUser {
	pub fn from_session(user: User, session_id: SessionId) -> Self {
		Self {
			user,
			session_id: Some(session_id),
		}
	}

	pub fn from_token(user: User) -> Self {
		Self {
			user,
			session_id: None,
		}
	}

	pub fn id(&self) -> UserId {
		self.user.id
	}
}

/// Authentication state attached to every request by the auth layer.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
	pub current_user: Option<CurrentUser>,
}

impl AuthContext {
	pub fn unauthenticated() -> Self {
		Self { current_user: None }
	}

	pub fn authenticated(user: CurrentUser) -> Self {
		Self {
			current_user: Some(user),
		}
	}

	pub fn is_authenticated(&self) -> bool {
		self.current_user.is_some()
	}
}

/// Find a cookie by name in the `Cookie` header.
pub fn extract_session_cookie_with_name(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
	headers
		.get_all(COOKIE)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(|value| value.split(';'))
		.find_map(|cookie| {
			let (name, value) = cookie.trim().split_once('=')?;
			(name == cookie_name && !value.is_empty()).then(|| value.to_string())
		})
}

/// `Authorization: Bearer <token>`
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
	headers
		.get(AUTHORIZATION)?
		.to_str()
		.ok()?
		.strip_prefix("Bearer ")
		.map(str::trim)
		.filter(|token| !token.is_empty())
		.map(str::to_string)
}

#[cfg(test)]
mod tests {
	use super::*;
	use http::HeaderValue;

	mod cookies {
		use super::*;

		#[test]
		fn finds_named_cookie_among_others() {
			let mut headers = HeaderMap::new();
			headers.insert(
				COOKIE,
				HeaderValue::from_static("theme=dark; opcode_session=abc123; lang=en"),
			);
			assert_eq!(
				extract_session_cookie_with_name(&headers, SESSION_COOKIE_NAME),
				Some("abc123".to_string())
			);
		}

		#[test]
		fn searches_multiple_cookie_headers() {
			let mut headers = HeaderMap::new();
			headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
			headers.append(COOKIE, HeaderValue::from_static("opcode_session=xyz"));
			assert_eq!(
				extract_session_cookie_with_name(&headers, SESSION_COOKIE_NAME),
				Some("xyz".to_string())
			);
		}

		#[test]
		fn ignores_prefix_matches_and_empty_values() {
			let mut headers = HeaderMap::new();
			headers.insert(
				COOKIE,
				HeaderValue::from_static("opcode_session_old=1; opcode_session="),
			);
			assert_eq!(
				extract_session_cookie_with_name(&headers, SESSION_COOKIE_NAME),
				None
			);
		}
	}

	mod bearer {
		use super::*;

		#[test]
		fn extracts_token() {
			let mut headers = HeaderMap::new();
			headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok_1"));
			assert_eq!(extract_bearer_token(&headers), Some("tok_1".to_string()));
		}

		#[test]
		fn rejects_other_schemes_and_blank_tokens() {
			let mut headers = HeaderMap::new();
			headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
			assert_eq!(extract_bearer_token(&headers), None);

			headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
			assert_eq!(extract_bearer_token(&headers), None);
		}
	}

	#[test]
	fn default_context_is_unauthenticated() {
		assert!(!AuthContext::default().is_authenticated());
		assert!(!AuthContext::unauthenticated().is_authenticated());
	}
}
