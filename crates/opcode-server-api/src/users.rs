// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use opcode_server_auth::{Profile, User, UserAttributes};
use serde::{Deserialize, Serialize};

/// `{"user": {...}}` body for register, update and social login.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRequest {
	#[serde(default)]
	pub user: UserAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExistUser {
	#[serde(default)]
	pub email: Option<String>,
}

/// `{"user": {"email": ...}}`; every part may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExistRequest {
	#[serde(default)]
	pub user: Option<ExistUser>,
}

impl ExistRequest {
	pub fn email(&self) -> Option<&str> {
		self.user
			.as_ref()
			.and_then(|u| u.email.as_deref())
			.map(str::trim)
			.filter(|e| !e.is_empty())
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyRequest {
	#[serde(default)]
	pub access_token: Option<String>,
}

/// A user as returned to clients. Never carries the password hash or token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
	pub id: String,
	pub email: String,
	#[serde(flatten)]
	pub profile: Profile,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
	fn from(user: &User) -> Self {
		Self {
			id: user.id.to_string(),
			email: user.email.clone(),
			profile: user.profile.clone(),
			created_at: user.created_at,
			updated_at: user.updated_at,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCountResponse {
	pub user_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
	pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectResponse {
	pub redirect_to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialLoginResponse {
	pub token: String,
	pub user: UserResponse,
	pub redirect_to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
	pub status: String,
	pub verified: bool,
}

impl VerifyResponse {
	pub fn ok(verified: bool) -> Self {
		Self {
			status: "ok".to_string(),
			verified,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyFailureResponse {
	pub status: String,
}

impl Default for VerifyFailureResponse {
	fn default() -> Self {
		Self {
			status: "unprocessable_entity".to_string(),
		}
	}
}

/// `{"errors": "..."}` for failures that are not field validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorsResponse {
	pub errors: String,
}

/// Generic error body, used for authentication failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

#[cfg(test)]
mod tests {
	use super::*;
	use opcode_server_auth::{generate_user_token, UserId};

	fn user() -> User {
		User {
			id: UserId::generate(),
			email: "ada@example.com".to_string(),
			token: generate_user_token(),
			profile: Profile {
				first_name: Some("Ada".to_string()),
				mentor: true,
				interests: vec!["rust".to_string()],
				..Default::default()
			},
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	#[test]
	fn user_response_flattens_profile_and_hides_secrets() {
		let user = user();
		let json = serde_json::to_value(UserResponse::from(&user)).unwrap();

		assert_eq!(json["email"], "ada@example.com");
		assert_eq!(json["first_name"], "Ada");
		assert_eq!(json["mentor"], true);
		assert_eq!(json["interests"], serde_json::json!(["rust"]));
		assert!(json.get("profile").is_none());
		assert!(json.get("token").is_none());
		assert!(json.get("password").is_none());
		assert!(json.get("password_hash").is_none());
		assert!(!json.to_string().contains(user.token.expose().as_str()));
	}

	#[test]
	fn exist_request_tolerates_missing_parts() {
		let empty: ExistRequest = serde_json::from_str("{}").unwrap();
		assert_eq!(empty.email(), None);

		let blank: ExistRequest = serde_json::from_str(r#"{"user":{"email":"  "}}"#).unwrap();
		assert_eq!(blank.email(), None);

		let full: ExistRequest =
			serde_json::from_str(r#"{"user":{"email":"ada@example.com"}}"#).unwrap();
		assert_eq!(full.email(), Some("ada@example.com"));
	}

	#[test]
	fn verify_bodies_have_fixed_status_strings() {
		assert_eq!(
			serde_json::to_value(VerifyResponse::ok(true)).unwrap(),
			serde_json::json!({"status": "ok", "verified": true})
		);
		assert_eq!(
			serde_json::to_value(VerifyFailureResponse::default()).unwrap(),
			serde_json::json!({"status": "unprocessable_entity"})
		);
	}
}
