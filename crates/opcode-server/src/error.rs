// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.
//!
//! Field validation renders as `{"field": ["message"]}` and authentication
//! failures as `{"error", "message"}` with 401. Everything else is caught at
//! the handler boundary and rendered as `{"errors": "..."}` with 422.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use opcode_server_api::{ErrorResponse, ErrorsResponse};
use opcode_server_auth::FieldErrors;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error("Database error: {0}")]
	Db(#[from] opcode_server_db::DbError),

	#[error("Validation failed: {0}")]
	Validation(FieldErrors),

	#[error("Authentication error: {0}")]
	Auth(#[from] opcode_server_auth::AuthError),

	#[error("Session error: {0}")]
	Session(#[from] opcode_server_session::SessionError),

	#[error("SMTP error: {0}")]
	Smtp(#[from] opcode_server_smtp::SmtpError),

	#[error("Identity verification error: {0}")]
	IdMe(#[from] opcode_server_idme::IdMeError),

	#[error(transparent)]
	Location(#[from] opcode_server_db::LocationError),

	#[error("Unauthorized: {0}")]
	Unauthorized(String),

	#[error("Internal error: {0}")]
	Internal(String),
}

impl From<FieldErrors> for ServerError {
	fn from(errors: FieldErrors) -> Self {
		ServerError::Validation(errors)
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		match self {
			ServerError::Validation(errors) => {
				tracing::debug!(errors = %errors, "validation failed");
				(StatusCode::UNPROCESSABLE_ENTITY, Json(errors)).into_response()
			}
			ServerError::Unauthorized(message) => (
				StatusCode::UNAUTHORIZED,
				Json(ErrorResponse {
					error: "unauthorized".to_string(),
					message,
				}),
			)
				.into_response(),
			other => {
				tracing::error!(error = %other, "request failed");
				(
					StatusCode::UNPROCESSABLE_ENTITY,
					Json(ErrorsResponse {
						errors: other.to_string(),
					}),
				)
					.into_response()
			}
		}
	}
}
