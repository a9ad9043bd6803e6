// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SMTP configuration section for the welcome mailer.

use crate::error::ConfigError;
use opcode_common_secret::SecretString;
use serde::Deserialize;

/// SMTP settings as read from a single source; every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SmtpConfigLayer {
	pub host: Option<String>,
	pub port: Option<u16>,
	pub username: Option<String>,
	pub password: Option<SecretString>,
	pub from_address: Option<String>,
	pub from_name: Option<String>,
	/// STARTTLS on connect. Defaults to true.
	pub use_tls: Option<bool>,
}

impl SmtpConfigLayer {
	pub fn merge(&mut self, other: SmtpConfigLayer) {
		if other.host.is_some() {
			self.host = other.host;
		}
		if other.port.is_some() {
			self.port = other.port;
		}
		if other.username.is_some() {
			self.username = other.username;
		}
		if other.password.is_some() {
			self.password = other.password;
		}
		if other.from_address.is_some() {
			self.from_address = other.from_address;
		}
		if other.from_name.is_some() {
			self.from_name = other.from_name;
		}
		if other.use_tls.is_some() {
			self.use_tls = other.use_tls;
		}
	}

	/// Resolve the layer. `Ok(None)` means no host was given and mail is off.
	pub fn build(self) -> Result<Option<SmtpConfig>, ConfigError> {
		let Some(host) = self.host.filter(|h| !h.is_empty()) else {
			return Ok(None);
		};

		let from_address = self
			.from_address
			.filter(|a| !a.is_empty())
			.ok_or_else(|| {
				ConfigError::Validation(
					"SMTP from_address is required when host is configured".to_string(),
				)
			})?;

		Ok(Some(SmtpConfig {
			host,
			port: self.port.unwrap_or(587),
			username: self.username,
			password: self.password,
			from_address,
			from_name: self
				.from_name
				.unwrap_or_else(|| "Operation Code".to_string()),
			use_tls: self.use_tls.unwrap_or(true),
		}))
	}
}

/// Validated SMTP configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
	pub host: String,
	pub port: u16,
	pub username: Option<String>,
	pub password: Option<SecretString>,
	pub from_address: String,
	pub from_name: String,
	pub use_tls: bool,
}
