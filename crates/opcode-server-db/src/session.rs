// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session repository for browser sessions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opcode_server_auth::{Session, SessionId, UserId};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use crate::error::DbError;

#[async_trait]
pub trait SessionStore: Send + Sync {
	async fn create_session(&self, session: &Session, token_hash: &str) -> Result<(), DbError>;
	async fn get_session_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>, DbError>;
	async fn update_session_last_used(&self, id: &SessionId) -> Result<(), DbError>;
	async fn cleanup_expired_sessions(&self) -> Result<u64, DbError>;
}

#[derive(Clone)]
pub struct SessionRepository {
	pool: SqlitePool,
}

impl SessionRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a new web session.
	///
	/// # Arguments
	/// * `session` - The session metadata
	/// * `token_hash` - SHA-256 hash of the session token (never store plaintext)
	#[tracing::instrument(skip(self, session, token_hash), fields(session_id = %session.id, user_id = %session.user_id))]
	pub async fn create_session(&self, session: &Session, token_hash: &str) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO sessions (
				id, user_id, token_hash, created_at, last_used_at, expires_at,
				ip_address, user_agent
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(session.id.to_string())
		.bind(session.user_id.to_string())
		.bind(token_hash)
		.bind(session.created_at.to_rfc3339())
		.bind(session.last_used_at.to_rfc3339())
		.bind(session.expires_at.to_rfc3339())
		.bind(&session.ip_address)
		.bind(&session.user_agent)
		.execute(&self.pool)
		.await?;

		tracing::debug!(session_id = %session.id, user_id = %session.user_id, "session created");
		Ok(())
	}

	/// Get a session by its token hash.
	///
	/// # Note
	/// Does not check expiry - caller should verify `expires_at`.
	#[tracing::instrument(skip(self, token_hash))]
	pub async fn get_session_by_token_hash(
		&self,
		token_hash: &str,
	) -> Result<Option<Session>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, user_id, created_at, last_used_at, expires_at, ip_address, user_agent
			FROM sessions
			WHERE token_hash = ?
			"#,
		)
		.bind(token_hash)
		.fetch_optional(&self.pool)
		.await?;

		row.as_ref().map(parse_session_row).transpose()
	}

	#[tracing::instrument(skip(self), fields(session_id = %id))]
	pub async fn update_session_last_used(&self, id: &SessionId) -> Result<(), DbError> {
		sqlx::query("UPDATE sessions SET last_used_at = ? WHERE id = ?")
			.bind(Utc::now().to_rfc3339())
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;

		tracing::debug!(session_id = %id, "session last_used updated");
		Ok(())
	}

	/// Remove every session whose `expires_at` has passed.
	#[tracing::instrument(skip(self))]
	pub async fn cleanup_expired_sessions(&self) -> Result<u64, DbError> {
		let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
			.bind(Utc::now().to_rfc3339())
			.execute(&self.pool)
			.await?;

		let removed = result.rows_affected();
		if removed > 0 {
			tracing::info!(removed, "expired sessions cleaned up");
		}
		Ok(removed)
	}
}

#[async_trait]
impl SessionStore for SessionRepository {
	async fn create_session(&self, session: &Session, token_hash: &str) -> Result<(), DbError> {
		self.create_session(session, token_hash).await
	}

	async fn get_session_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>, DbError> {
		self.get_session_by_token_hash(token_hash).await
	}

	async fn update_session_last_used(&self, id: &SessionId) -> Result<(), DbError> {
		self.update_session_last_used(id).await
	}

	async fn cleanup_expired_sessions(&self) -> Result<u64, DbError> {
		self.cleanup_expired_sessions().await
	}
}

fn parse_session_row(row: &sqlx::sqlite::SqliteRow) -> Result<Session, DbError> {
	let id_str: String = row.get("id");
	let user_id_str: String = row.get("user_id");
	let created_at_str: String = row.get("created_at");
	let last_used_at_str: String = row.get("last_used_at");
	let expires_at_str: String = row.get("expires_at");

	let id = Uuid::parse_str(&id_str)
		.map_err(|e| DbError::Internal(format!("Invalid session id UUID: {e}")))?;
	let user_id = Uuid::parse_str(&user_id_str)
		.map_err(|e| DbError::Internal(format!("Invalid user_id UUID: {e}")))?;

	let parse = |raw: &str, column: &str| {
		DateTime::parse_from_rfc3339(raw)
			.map(|dt| dt.with_timezone(&Utc))
			.map_err(|e| DbError::Internal(format!("Invalid {column}: {e}")))
	};

	Ok(Session {
		id: SessionId::new(id),
		user_id: UserId::new(user_id),
		created_at: parse(&created_at_str, "created_at")?,
		last_used_at: parse(&last_used_at_str, "last_used_at")?,
		expires_at: parse(&expires_at_str, "expires_at")?,
		ip_address: row.get("ip_address"),
		user_agent: row.get("user_agent"),
	})
}
