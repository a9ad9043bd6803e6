// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router construction.

use std::sync::Arc;

use axum::{
	middleware::from_fn_with_state,
	routing::{get, post},
	Router,
};
use opcode_server_config::{AuthConfig, ServerConfig};
use opcode_server_db::{SessionRepository, SessionStore, SqlitePool, UserRepository, UserStore};
use opcode_server_email::{EmailSender, EmailService};
use opcode_server_idme::{IdMeClient, IdentityVerifier};
use opcode_server_session::SessionService;
use opcode_server_smtp::SmtpClient;

use crate::accounts::AccountService;
use crate::auth_middleware::auth_layer;
use crate::error::ServerError;
use crate::routes;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
	pub pool: SqlitePool,
	pub user_repo: Arc<dyn UserStore>,
	pub session_repo: Arc<dyn SessionStore>,
	pub accounts: AccountService,
	pub session_service: Arc<SessionService>,
	/// `None` when SMTP is not configured.
	pub email: Option<Arc<dyn EmailSender>>,
	pub identity_verifier: Arc<dyn IdentityVerifier>,
	/// Public origin used for redirects, without a trailing slash.
	pub base_url: String,
	pub auth_config: AuthConfig,
}

/// Wire repositories and outbound clients from configuration.
pub fn create_app_state(pool: SqlitePool, config: &ServerConfig) -> Result<AppState, ServerError> {
	let user_repo: Arc<dyn UserStore> = Arc::new(UserRepository::new(pool.clone()));
	let session_repo: Arc<dyn SessionStore> = Arc::new(SessionRepository::new(pool.clone()));

	let email: Option<Arc<dyn EmailSender>> = match &config.smtp {
		Some(smtp_config) => {
			let client = SmtpClient::new(smtp_config)?;
			tracing::info!(host = %smtp_config.host, "SMTP configured; welcome emails enabled");
			Some(Arc::new(EmailService::new(Arc::new(client))))
		}
		None => {
			tracing::info!("SMTP not configured; welcome emails disabled");
			None
		}
	};

	let identity_verifier: Arc<dyn IdentityVerifier> = Arc::new(IdMeClient::new(&config.idme)?);

	Ok(AppState {
		pool,
		accounts: AccountService::new(Arc::clone(&user_repo)),
		session_service: Arc::new(SessionService::new(
			Arc::clone(&session_repo),
			&config.auth,
		)),
		user_repo,
		session_repo,
		email,
		identity_verifier,
		base_url: config.http.base_url.clone(),
		auth_config: config.auth.clone(),
	})
}

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(routes::health::health_check))
		.route(
			"/api/v1/users",
			get(routes::users::count)
				.post(routes::users::register)
				.patch(routes::users::update_profile)
				.put(routes::users::update_profile),
		)
		.route(
			"/api/v1/users/exist",
			post(routes::users::resolve_social_redirect),
		)
		.route("/api/v1/users/social", post(routes::users::social_login))
		.route(
			"/api/v1/users/profile/verify",
			post(routes::users::verify_identity),
		)
		.route(
			"/api/v1/users/by_location",
			get(routes::users::count_by_location),
		)
		.layer(from_fn_with_state(state.clone(), auth_layer))
		.with_state(state)
}
