// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database configuration.
//!
//! The connection URL may carry credentials, so it is held as a
//! [`SecretString`] and never logged.

use opcode_common_secret::SecretString;
use serde::Deserialize;

const DEFAULT_DATABASE_URL: &str = "sqlite:./opcode.db";

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
	pub url: SecretString,
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		DatabaseConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfigLayer {
	#[serde(default)]
	pub url: Option<SecretString>,
}

impl DatabaseConfigLayer {
	pub fn merge(&mut self, other: DatabaseConfigLayer) {
		if other.url.is_some() {
			self.url = other.url;
		}
	}

	pub fn finalize(self) -> DatabaseConfig {
		DatabaseConfig {
			url: self
				.url
				.unwrap_or_else(|| SecretString::new(DEFAULT_DATABASE_URL.to_string())),
		}
	}
}
