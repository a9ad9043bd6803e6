// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Browser sessions.
//!
//! A session is created on sign-in. The client holds a random token in a
//! cookie; only its SHA-256 hash (see [`crate::hash_token`]) is stored.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::{SessionId, UserId};

/// Default lifetime of a session.
pub const SESSION_EXPIRY_DAYS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
	pub id: SessionId,
	pub user_id: UserId,
	pub created_at: DateTime<Utc>,
	pub last_used_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
}

impl Session {
	pub fn new(user_id: UserId) -> Self {
		Self::with_ttl_days(user_id, SESSION_EXPIRY_DAYS)
	}

	pub fn with_ttl_days(user_id: UserId, ttl_days: i64) -> Self {
		let now = Utc::now();
		Self {
			id: SessionId::generate(),
			user_id,
			created_at: now,
			last_used_at: now,
			expires_at: now + Duration::days(ttl_days),
			ip_address: None,
			user_agent: None,
		}
	}

	pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
		self.ip_address = Some(ip.into());
		self
	}

	pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
		self.user_agent = Some(ua.into());
		self
	}

	pub fn is_expired(&self) -> bool {
		Utc::now() > self.expires_at
	}
}

/// 32 random bytes, hex encoded.
pub fn generate_session_token() -> String {
	let bytes: [u8; 32] = rand::thread_rng().gen();
	hex::encode(bytes)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn new_session_expires_in_sixty_days() {
		let session = Session::new(UserId::generate());
		let ttl = session.expires_at - session.created_at;
		assert_eq!(ttl.num_days(), SESSION_EXPIRY_DAYS);
		assert!(!session.is_expired());
	}

	#[test]
	fn past_expiry_is_expired() {
		let mut session = Session::new(UserId::generate());
		session.expires_at = Utc::now() - Duration::seconds(1);
		assert!(session.is_expired());
	}

	#[test]
	fn builders_record_client_info() {
		let session = Session::new(UserId::generate())
			.with_ip("203.0.113.9")
			.with_user_agent("curl/8.0");
		assert_eq!(session.ip_address.as_deref(), Some("203.0.113.9"));
		assert_eq!(session.user_agent.as_deref(), Some("curl/8.0"));
	}

	#[test]
	fn session_tokens_are_random_hex() {
		let a = generate_session_token();
		assert_eq!(a.len(), 64);
		assert!(hex::decode(&a).is_ok());
		assert_ne!(a, generate_session_token());
	}
}
