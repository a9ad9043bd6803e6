// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! ID.me identity verification client.
//!
//! Exchanges a member-supplied access token for their attribute document at
//! `{base_url}/attributes.json` and reports whether any verification group
//! (military, veteran, military family, ...) is marked verified.
//!
//! # Errors
//!
//! Every failure is an [`IdMeError`]: a blank token, a transport failure or
//! timeout, a non-success status, or a body that is not the expected JSON.
//! The client never retries.

use std::time::Duration;

use async_trait::async_trait;
use opcode_server_config::IdMeConfig;
use serde::Deserialize;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum IdMeError {
	#[error("access token is blank")]
	MissingToken,

	#[error("invalid ID.me URL: {0}")]
	InvalidUrl(#[from] url::ParseError),

	#[error("HTTP request failed: {0}")]
	HttpRequest(#[from] reqwest::Error),

	#[error("ID.me API error ({status}): {body}")]
	Api { status: u16, body: String },

	#[error("failed to parse response: {0}")]
	ParseError(String),
}

/// One entry of the `status` array in the attributes response.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct VerificationStatus {
	#[serde(default)]
	pub group: Option<String>,
	#[serde(default)]
	pub subgroups: Vec<String>,
	#[serde(default)]
	pub verified: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttributesResponse {
	#[serde(default)]
	pub status: Vec<VerificationStatus>,
}

impl AttributesResponse {
	/// `true` when any group is verified.
	pub fn is_verified(&self) -> bool {
		self.status.iter().any(|s| s.verified)
	}
}

/// Something that can tell whether an access token belongs to a verified member.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
	async fn verify(&self, access_token: &str) -> Result<bool, IdMeError>;
}

#[derive(Debug, Clone)]
pub struct IdMeClient {
	base_url: String,
	http_client: reqwest::Client,
}

impl IdMeClient {
	#[tracing::instrument(skip_all, name = "IdMeClient::new", fields(base_url = %config.base_url))]
	pub fn new(config: &IdMeConfig) -> Result<Self, IdMeError> {
		let http_client =
			opcode_common_http::new_client_with_timeout(Duration::from_secs(config.timeout_secs))?;
		Url::parse(&config.base_url)?;

		Ok(Self {
			base_url: config.base_url.trim_end_matches('/').to_string(),
			http_client,
		})
	}

	fn attributes_url(&self, access_token: &str) -> Result<Url, IdMeError> {
		let url = Url::parse_with_params(
			&format!("{}/attributes.json", self.base_url),
			&[("access_token", access_token)],
		)?;
		Ok(url)
	}

	/// Fetch the member's attribute document.
	#[tracing::instrument(skip(self, access_token), name = "IdMeClient::get_attributes")]
	pub async fn get_attributes(&self, access_token: &str) -> Result<AttributesResponse, IdMeError> {
		if access_token.trim().is_empty() {
			return Err(IdMeError::MissingToken);
		}

		let url = self.attributes_url(access_token.trim())?;
		tracing::debug!("fetching ID.me attributes");

		let response = self
			.http_client
			.get(url)
			.header("Accept", "application/json")
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			tracing::warn!(status = status.as_u16(), "ID.me returned an error");
			return Err(IdMeError::Api {
				status: status.as_u16(),
				body,
			});
		}

		let body = response.text().await?;
		parse_attributes(&body)
	}
}

#[async_trait]
impl IdentityVerifier for IdMeClient {
	async fn verify(&self, access_token: &str) -> Result<bool, IdMeError> {
		let attributes = self.get_attributes(access_token).await?;
		let verified = attributes.is_verified();
		tracing::debug!(verified, groups = attributes.status.len(), "ID.me verification resolved");
		Ok(verified)
	}
}

pub fn parse_attributes(body: &str) -> Result<AttributesResponse, IdMeError> {
	serde_json::from_str(body)
		.map_err(|e| IdMeError::ParseError(format!("failed to parse attributes response: {e}")))
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{extract::Query, http::StatusCode, routing::get, Router};
	use proptest::prelude::*;
	use std::collections::HashMap;

	mod parsing {
		use super::*;

		#[test]
		fn any_verified_group_counts() {
			let attrs = parse_attributes(
				r#"{"status":[
					{"group":"military","subgroups":["Service Member"],"verified":false},
					{"group":"veteran","subgroups":["Veteran"],"verified":true}
				]}"#,
			)
			.unwrap();
			assert!(attrs.is_verified());
		}

		#[test]
		fn empty_or_missing_status_is_unverified() {
			assert!(!parse_attributes(r#"{"status":[]}"#).unwrap().is_verified());
			assert!(!parse_attributes(r#"{"attributes":[]}"#).unwrap().is_verified());
		}

		#[test]
		fn garbage_is_a_parse_error() {
			assert!(matches!(
				parse_attributes("<html>oops</html>"),
				Err(IdMeError::ParseError(_))
			));
		}

		proptest! {
			#[test]
			fn verified_iff_some_entry_is(flags in prop::collection::vec(any::<bool>(), 0..8)) {
				let attrs = AttributesResponse {
					status: flags
						.iter()
						.map(|&verified| VerificationStatus { group: None, subgroups: vec![], verified })
						.collect(),
				};
				prop_assert_eq!(attrs.is_verified(), flags.iter().any(|&f| f));
			}
		}
	}

	async fn spawn_provider(router: Router) -> IdMeClient {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, router).await.unwrap();
		});
		IdMeClient::new(&IdMeConfig {
			base_url: format!("http://{addr}/api/public/v3"),
			timeout_secs: 5,
		})
		.unwrap()
	}

	fn provider() -> Router {
		Router::new().route(
			"/api/public/v3/attributes.json",
			get(|Query(params): Query<HashMap<String, String>>| async move {
				match params.get("access_token").map(String::as_str) {
					Some("veteran") => (
						StatusCode::OK,
						r#"{"status":[{"group":"veteran","subgroups":["Veteran"],"verified":true}]}"#,
					),
					Some("civilian") => (StatusCode::OK, r#"{"status":[]}"#),
					Some("broken") => (StatusCode::OK, "not json"),
					_ => (StatusCode::UNAUTHORIZED, r#"{"error":"invalid_token"}"#),
				}
			}),
		)
	}

	mod client {
		use super::*;

		#[tokio::test]
		async fn verified_member() {
			let client = spawn_provider(provider()).await;
			assert!(client.verify("veteran").await.unwrap());
		}

		#[tokio::test]
		async fn unverified_member() {
			let client = spawn_provider(provider()).await;
			assert!(!client.verify("civilian").await.unwrap());
		}

		#[tokio::test]
		async fn rejected_token_is_an_api_error() {
			let client = spawn_provider(provider()).await;
			assert!(matches!(
				client.verify("expired").await,
				Err(IdMeError::Api { status: 401, .. })
			));
		}

		#[tokio::test]
		async fn malformed_body_is_a_parse_error() {
			let client = spawn_provider(provider()).await;
			assert!(matches!(
				client.verify("broken").await,
				Err(IdMeError::ParseError(_))
			));
		}

		#[tokio::test]
		async fn blank_token_never_reaches_the_network() {
			let client = IdMeClient::new(&IdMeConfig {
				base_url: "http://127.0.0.1:9/unroutable".to_string(),
				timeout_secs: 1,
			})
			.unwrap();
			assert!(matches!(
				client.verify("  ").await,
				Err(IdMeError::MissingToken)
			));
		}

		#[test]
		fn access_token_is_query_encoded() {
			let client = IdMeClient::new(&IdMeConfig::default()).unwrap();
			let url = client.attributes_url("a b&c").unwrap();
			assert_eq!(
				url.as_str(),
				"https://api.id.me/api/public/v3/attributes.json?access_token=a+b%26c"
			);
		}
	}
}
