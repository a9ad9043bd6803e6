// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP listener configuration.

use serde::Deserialize;

/// HTTP listener configuration (resolved).
#[derive(Debug, Clone)]
pub struct HttpConfig {
	pub host: String,
	pub port: u16,
	/// Public origin of the frontend, used to build redirect URLs.
	pub base_url: String,
}

impl Default for HttpConfig {
	fn default() -> Self {
		HttpConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpConfigLayer {
	#[serde(default)]
	pub host: Option<String>,
	#[serde(default)]
	pub port: Option<u16>,
	#[serde(default)]
	pub base_url: Option<String>,
}

impl HttpConfigLayer {
	pub fn merge(&mut self, other: HttpConfigLayer) {
		if other.host.is_some() {
			self.host = other.host;
		}
		if other.port.is_some() {
			self.port = other.port;
		}
		if other.base_url.is_some() {
			self.base_url = other.base_url;
		}
	}

	pub fn finalize(self) -> HttpConfig {
		let port = self.port.unwrap_or(3000);
		HttpConfig {
			host: self.host.unwrap_or_else(|| "0.0.0.0".to_string()),
			port,
			base_url: self
				.base_url
				.map(|url| url.trim_end_matches('/').to_string())
				.unwrap_or_else(|| format!("http://localhost:{port}")),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults() {
		let config = HttpConfigLayer::default().finalize();
		assert_eq!(config.host, "0.0.0.0");
		assert_eq!(config.port, 3000);
		assert_eq!(config.base_url, "http://localhost:3000");
	}

	#[test]
	fn base_url_follows_port_and_drops_trailing_slash() {
		let config = HttpConfigLayer {
			port: Some(8081),
			..Default::default()
		}
		.finalize();
		assert_eq!(config.base_url, "http://localhost:8081");

		let config = HttpConfigLayer {
			base_url: Some("https://operationcode.org/".to_string()),
			..Default::default()
		}
		.finalize();
		assert_eq!(config.base_url, "https://operationcode.org");
	}

	#[test]
	fn merge_keeps_unset_fields() {
		let mut base = HttpConfigLayer {
			host: Some("127.0.0.1".to_string()),
			port: Some(3000),
			base_url: None,
		};
		base.merge(HttpConfigLayer {
			port: Some(9000),
			..Default::default()
		});
		assert_eq!(base.host.as_deref(), Some("127.0.0.1"));
		assert_eq!(base.port, Some(9000));
	}
}
