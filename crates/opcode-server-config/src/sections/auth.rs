// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session and cookie configuration.

use serde::Deserialize;

/// Authentication configuration (resolved).
#[derive(Debug, Clone)]
pub struct AuthConfig {
	pub session_cookie_name: String,
	/// Adds the `Secure` attribute to session cookies.
	pub secure_cookies: bool,
	pub session_ttl_days: i64,
}

impl Default for AuthConfig {
	fn default() -> Self {
		AuthConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfigLayer {
	#[serde(default)]
	pub session_cookie_name: Option<String>,
	#[serde(default)]
	pub secure_cookies: Option<bool>,
	#[serde(default)]
	pub session_ttl_days: Option<i64>,
}

impl AuthConfigLayer {
	pub fn merge(&mut self, other: AuthConfigLayer) {
		if other.session_cookie_name.is_some() {
			self.session_cookie_name = other.session_cookie_name;
		}
		if other.secure_cookies.is_some() {
			self.secure_cookies = other.secure_cookies;
		}
		if other.session_ttl_days.is_some() {
			self.session_ttl_days = other.session_ttl_days;
		}
	}

	pub fn finalize(self) -> AuthConfig {
		AuthConfig {
			session_cookie_name: self
				.session_cookie_name
				.unwrap_or_else(|| "opcode_session".to_string()),
			secure_cookies: self.secure_cookies.unwrap_or(true),
			session_ttl_days: self.session_ttl_days.unwrap_or(60),
		}
	}
}
