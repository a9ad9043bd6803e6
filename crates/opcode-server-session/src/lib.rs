// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session creation for opcode sign-in flows.
//!
//! Registration and social login both end the same way: a [`Session`] row
//! with client metadata, a random token whose hash is persisted, and a
//! `Set-Cookie` header carrying the plaintext token back to the browser.

use opcode_server_auth::{generate_session_token, hash_token, Session, UserId};
use opcode_server_config::AuthConfig;
use opcode_server_db::SessionStore;
use std::sync::Arc;
use thiserror::Error;

const SECONDS_PER_DAY: i64 = 60 * 60 * 24;

#[derive(Debug, Error)]
pub enum SessionError {
	#[error("failed to create session: {0}")]
	Database(#[from] opcode_server_db::DbError),
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
	Registration,
	Social,
}

impl AuthMethod {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Registration => "registration",
			Self::Social => "social",
		}
	}
}

impl std::fmt::Display for AuthMethod {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
}

#[derive(Debug)]
pub struct SessionRequest {
	pub user_id: UserId,
	pub auth_method: AuthMethod,
	pub client_info: ClientInfo,
}

impl SessionRequest {
	pub fn new(user_id: UserId, auth_method: AuthMethod, client_info: ClientInfo) -> Self {
		Self {
			user_id,
			auth_method,
			client_info,
		}
	}
}

pub struct SessionResponse {
	pub session: Session,
	pub token: String,
	pub cookie_header: String,
}

pub struct SessionService {
	session_repo: Arc<dyn SessionStore>,
	cookie_name: String,
	secure_cookies: bool,
	ttl_days: i64,
}

impl SessionService {
	pub fn new(session_repo: Arc<dyn SessionStore>, config: &AuthConfig) -> Self {
		Self {
			session_repo,
			cookie_name: config.session_cookie_name.clone(),
			secure_cookies: config.secure_cookies,
			ttl_days: config.session_ttl_days,
		}
	}

	pub fn cookie_name(&self) -> &str {
		&self.cookie_name
	}

	#[tracing::instrument(skip(self, request), fields(user_id = %request.user_id, auth_method = %request.auth_method))]
	pub async fn create_session(&self, request: SessionRequest) -> Result<SessionResponse> {
		let mut session = Session::with_ttl_days(request.user_id, self.ttl_days);
		if let Some(ip) = request.client_info.ip_address {
			session = session.with_ip(ip);
		}
		if let Some(ua) = request.client_info.user_agent {
			session = session.with_user_agent(ua);
		}

		let token = generate_session_token();
		let token_hash = hash_token(&token);

		self
			.session_repo
			.create_session(&session, &token_hash)
			.await?;

		let cookie_header = self.cookie_header(&token);

		tracing::info!(
			user_id = %request.user_id,
			session_id = %session.id,
			auth_method = %request.auth_method,
			"Session created"
		);

		Ok(SessionResponse {
			session,
			token,
			cookie_header,
		})
	}

	fn cookie_header(&self, token: &str) -> String {
		let mut header = format!(
			"{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
			self.cookie_name,
			token,
			self.ttl_days * SECONDS_PER_DAY
		);
		if self.secure_cookies {
			header.push_str("; Secure");
		}
		header
	}
}
