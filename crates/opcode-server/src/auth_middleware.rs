// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication middleware for Axum.
//!
//! [`auth_layer`] resolves the caller from a session cookie or a bearer
//! token and stores an [`AuthContext`] on the request. Handlers that need a
//! signed-in member take the [`RequireAuth`] extractor, which rejects with
//! 401 before any body is read.
//!
//! Session tokens are hashed before lookup and never logged.

use axum::{
	body::Body,
	extract::{FromRequestParts, State},
	http::{request::Parts, Request, StatusCode},
	middleware::Next,
	response::{IntoResponse, Response},
	Json,
};
use chrono::Utc;
use opcode_server_api::ErrorResponse;
use opcode_server_auth::{
	extract_bearer_token, extract_session_cookie_with_name, hash_token, AuthContext, CurrentUser,
};
use std::sync::Arc;
use tracing::instrument;

use crate::api::AppState;
use opcode_server_db::{SessionStore, UserStore};

/// Token priority: session cookie, then `Authorization: Bearer`.
#[instrument(
	name = "auth_layer",
	skip(state, request, next),
	fields(
		auth_method = tracing::field::Empty,
		user_id = tracing::field::Empty,
	)
)]
pub async fn auth_layer(
	State(state): State<AppState>,
	mut request: Request<Body>,
	next: Next,
) -> Response {
	let headers = request.headers();
	let span = tracing::Span::current();

	if let Some(session_token) =
		extract_session_cookie_with_name(headers, &state.auth_config.session_cookie_name)
	{
		if let Some(auth_ctx) =
			authenticate_session(&session_token, &state.session_repo, &state.user_repo).await
		{
			if let Some(ref user) = auth_ctx.current_user {
				span.record("auth_method", "session");
				span.record("user_id", tracing::field::display(&user.user.id));
			}
			request.extensions_mut().insert(auth_ctx);
			return next.run(request).await;
		}
	}

	if let Some(bearer_token) = extract_bearer_token(headers) {
		if let Some(auth_ctx) = authenticate_user_token(&bearer_token, &state.user_repo).await {
			if let Some(ref user) = auth_ctx.current_user {
				span.record("auth_method", "token");
				span.record("user_id", tracing::field::display(&user.user.id));
			}
			request.extensions_mut().insert(auth_ctx);
			return next.run(request).await;
		}
	}

	span.record("auth_method", "none");
	request
		.extensions_mut()
		.insert(AuthContext::unauthenticated());
	next.run(request).await
}

/// Look the session up by token hash, check expiry, load its user and touch
/// `last_used_at` in the background.
#[instrument(skip(session_token, session_repo, user_repo), fields(session_id = tracing::field::Empty))]
async fn authenticate_session(
	session_token: &str,
	session_repo: &Arc<dyn SessionStore>,
	user_repo: &Arc<dyn UserStore>,
) -> Option<AuthContext> {
	let token_hash = hash_token(session_token);

	let session = match session_repo.get_session_by_token_hash(&token_hash).await {
		Ok(Some(session)) => session,
		Ok(None) => {
			tracing::debug!("Session not found for token hash");
			return None;
		}
		Err(e) => {
			tracing::error!(error = %e, "Failed to look up session");
			return None;
		}
	};

	tracing::Span::current().record("session_id", tracing::field::display(&session.id));

	if session.expires_at < Utc::now() {
		tracing::debug!(session_id = %session.id, "Session expired");
		return None;
	}

	let user = match user_repo.get_user_by_id(&session.user_id).await {
		Ok(Some(user)) => user,
		Ok(None) => {
			tracing::warn!(user_id = %session.user_id, "User not found for valid session");
			return None;
		}
		Err(e) => {
			tracing::error!(error = %e, "Failed to look up user");
			return None;
		}
	};

	let session_id = session.id;
	let session_repo = Arc::clone(session_repo);
	tokio::spawn(async move {
		if let Err(e) = session_repo.update_session_last_used(&session_id).await {
			tracing::warn!(error = %e, "Failed to update session last used");
		}
	});

	Some(AuthContext::authenticated(CurrentUser::from_session(
		user, session.id,
	)))
}

/// Match a bearer token against the per-user API token.
#[instrument(skip(token, user_repo))]
async fn authenticate_user_token(token: &str, user_repo: &Arc<dyn UserStore>) -> Option<AuthContext> {
	match user_repo.get_user_by_token(token).await {
		Ok(Some(user)) => Some(AuthContext::authenticated(CurrentUser::from_token(user))),
		Ok(None) => {
			tracing::debug!("No user for bearer token");
			None
		}
		Err(e) => {
			tracing::error!(error = %e, "Failed to look up user by token");
			None
		}
	}
}

/// Extractor that requires an authenticated caller.
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
	S: Send + Sync,
{
	type Rejection = Response;

	#[instrument(name = "RequireAuth::from_request_parts", skip_all)]
	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let auth_ctx = parts
			.extensions
			.get::<AuthContext>()
			.cloned()
			.unwrap_or_else(AuthContext::unauthenticated);

		match auth_ctx.current_user {
			Some(user) => {
				tracing::debug!(user_id = %user.user.id, "Authentication required: success");
				Ok(RequireAuth(user))
			}
			None => {
				tracing::debug!("Authentication required: no valid credentials");
				let response = (
					StatusCode::UNAUTHORIZED,
					Json(ErrorResponse {
						error: "unauthorized".to_string(),
						message: "Authentication required".to_string(),
					}),
				);
				Err(response.into_response())
			}
		}
	}
}
