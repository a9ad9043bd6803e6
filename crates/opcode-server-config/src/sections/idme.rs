// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity verification provider configuration.

use serde::Deserialize;

pub const DEFAULT_IDME_BASE_URL: &str = "https://api.id.me/api/public/v3";

#[derive(Debug, Clone)]
pub struct IdMeConfig {
	pub base_url: String,
	pub timeout_secs: u64,
}

impl Default for IdMeConfig {
	fn default() -> Self {
		IdMeConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdMeConfigLayer {
	#[serde(default)]
	pub base_url: Option<String>,
	#[serde(default)]
	pub timeout_secs: Option<u64>,
}

impl IdMeConfigLayer {
	pub fn merge(&mut self, other: IdMeConfigLayer) {
		if other.base_url.is_some() {
			self.base_url = other.base_url;
		}
		if other.timeout_secs.is_some() {
			self.timeout_secs = other.timeout_secs;
		}
	}

	pub fn finalize(self) -> IdMeConfig {
		IdMeConfig {
			base_url: self
				.base_url
				.map(|url| url.trim_end_matches('/').to_string())
				.unwrap_or_else(|| DEFAULT_IDME_BASE_URL.to_string()),
			timeout_secs: self.timeout_secs.unwrap_or(10),
		}
	}
}
