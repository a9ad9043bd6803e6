// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User endpoints: counting, registration, profile updates, social login and
//! identity verification.
//!
//! User bodies are parsed here rather than by the `Json` extractor so that a
//! field that cannot be read is reported as a field error. The `exist` and
//! `verify` bodies are best effort: unreadable means empty.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
	body::Bytes,
	extract::{rejection::JsonRejection, Query, State},
	http::{
		header::{LOCATION, SET_COOKIE},
		HeaderMap, HeaderValue, StatusCode,
	},
	response::{IntoResponse, Response},
	Json,
};
use opcode_server_api::{
	ExistRequest, RedirectResponse, SocialLoginResponse, TokenResponse, UserCountResponse,
	UserRequest, UserResponse, VerifyFailureResponse, VerifyRequest, VerifyResponse,
};
use opcode_server_auth::{validation::INVALID, FieldErrors, User, UserAttributes};
use opcode_server_db::LocationQuery;
use opcode_server_email::{EmailRequest, EmailSender};
use opcode_server_session::{AuthMethod, SessionRequest};
use serde_json::{Map, Value};

use crate::{
	accounts::{AccountError, EXISTING_USER_REDIRECT},
	api::AppState,
	auth_middleware::RequireAuth,
	client_info::client_info_from_headers,
	error::ServerError,
};

/// Where `exist` sends callers with no matching account.
pub const SOCIAL_LOGIN_REDIRECT: &str = "/social_login";

/// Registration page that receives social-login failures.
pub const SIGN_UP_PATH: &str = "/users/sign_up";

fn body_or_default<T: Default>(body: Result<Json<T>, JsonRejection>) -> T {
	match body {
		Ok(Json(value)) => value,
		Err(rejection) => {
			tracing::debug!(error = %rejection, "unreadable request body; treating as empty");
			T::default()
		}
	}
}

/// Parse a `{"user": {...}}` body. An empty body is an empty request; any
/// attribute that cannot be read is reported against its own key.
pub fn parse_user_request(body: &[u8]) -> Result<UserRequest, FieldErrors> {
	if body.iter().all(u8::is_ascii_whitespace) {
		return Ok(UserRequest::default());
	}

	let value: Value = serde_json::from_slice(body).map_err(|e| {
		tracing::debug!(error = %e, "request body is not JSON");
		unreadable("user")
	})?;

	serde_json::from_value::<UserRequest>(value.clone()).map_err(|e| {
		tracing::debug!(error = %e, "request body does not match the user attributes");
		unreadable_attributes(&value)
	})
}

fn unreadable(field: &str) -> FieldErrors {
	let mut errors = FieldErrors::new();
	errors.add(field, INVALID);
	errors
}

/// Try each attribute on its own to find the ones that fail.
fn unreadable_attributes(value: &Value) -> FieldErrors {
	let Some(Value::Object(attrs)) = value.get("user") else {
		return unreadable("user");
	};

	let mut errors = FieldErrors::new();
	for (key, attr) in attrs {
		let mut single = Map::new();
		single.insert(key.clone(), attr.clone());
		if serde_json::from_value::<UserAttributes>(Value::Object(single)).is_err() {
			errors.add(key, INVALID);
		}
	}
	if errors.is_empty() {
		errors.add("user", INVALID);
	}
	errors
}

/// `GET /api/v1/users`
#[tracing::instrument(skip(state))]
pub async fn count(State(state): State<AppState>) -> Result<Json<UserCountResponse>, ServerError> {
	let user_count = state.user_repo.count_users().await?;
	Ok(Json(UserCountResponse { user_count }))
}

/// `POST /api/v1/users`
///
/// Creates the account, starts a session and queues the welcome email.
#[tracing::instrument(skip(state, headers, body))]
pub async fn register(
	State(state): State<AppState>,
	headers: HeaderMap,
	body: Bytes,
) -> Result<Response, ServerError> {
	let request = parse_user_request(&body)?;
	let user = state.accounts.register(&request.user).await?;

	send_welcome_email(state.email.clone(), &user);

	let cookie = start_session(&state, &user, AuthMethod::Registration, &headers).await?;
	Ok((
		cookie,
		Json(TokenResponse {
			token: user.token.expose().clone(),
		}),
	)
		.into_response())
}

/// `PATCH|PUT /api/v1/users`
#[tracing::instrument(skip(state, current_user, body), fields(user_id = %current_user.id()))]
pub async fn update_profile(
	State(state): State<AppState>,
	RequireAuth(current_user): RequireAuth,
	body: Bytes,
) -> Result<Json<UserResponse>, ServerError> {
	let request = parse_user_request(&body)?;
	let user = state
		.accounts
		.update_profile(&current_user.user, &request.user)
		.await?;
	Ok(Json(UserResponse::from(&user)))
}

/// `POST /api/v1/users/exist`
#[tracing::instrument(skip(state, body))]
pub async fn resolve_social_redirect(
	State(state): State<AppState>,
	body: Result<Json<ExistRequest>, JsonRejection>,
) -> Result<Json<RedirectResponse>, ServerError> {
	let request = body_or_default(body);

	let exists = match request.email() {
		Some(email) => state.user_repo.get_user_by_email(email).await?.is_some(),
		None => false,
	};

	let redirect_to = if exists {
		EXISTING_USER_REDIRECT
	} else {
		SOCIAL_LOGIN_REDIRECT
	};
	Ok(Json(RedirectResponse {
		redirect_to: redirect_to.to_string(),
	}))
}

/// `POST /api/v1/users/social`
///
/// Resolves or creates the account. Failures redirect to the sign-up page
/// with the error sentences in an `alert` parameter.
#[tracing::instrument(skip(state, headers, body))]
pub async fn social_login(
	State(state): State<AppState>,
	headers: HeaderMap,
	body: Bytes,
) -> Result<Response, ServerError> {
	let request = match parse_user_request(&body) {
		Ok(request) => request,
		Err(errors) => {
			tracing::info!(errors = %errors, "unreadable social login payload; redirecting to sign up");
			return Ok(sign_up_redirect(&state.base_url, &errors.full_messages()));
		}
	};

	let saved = async {
		let (resolved, redirect_path) = state
			.accounts
			.fetch_social_user_and_redirect_path(&request.user)
			.await?;
		let user = state.accounts.save_social(resolved).await?;
		Ok::<_, AccountError>((user, redirect_path))
	}
	.await;

	let (user, redirect_path) = match saved {
		Ok(saved) => saved,
		Err(e) => {
			tracing::info!(error = %e, "social login failed; redirecting to sign up");
			return Ok(sign_up_redirect(&state.base_url, &e.full_messages()));
		}
	};

	let cookie = start_session(&state, &user, AuthMethod::Social, &headers).await?;
	Ok((
		cookie,
		Json(SocialLoginResponse {
			token: user.token.expose().clone(),
			user: UserResponse::from(&user),
			redirect_to: redirect_path.to_string(),
		}),
	)
		.into_response())
}

/// `POST /api/v1/users/profile/verify`
#[tracing::instrument(skip(state, current_user, body), fields(user_id = %current_user.id()))]
pub async fn verify_identity(
	State(state): State<AppState>,
	RequireAuth(current_user): RequireAuth,
	body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Response {
	let request = body_or_default(body);
	let access_token = request.access_token.unwrap_or_default();

	let outcome = async {
		let verified = state.identity_verifier.verify(&access_token).await?;
		tracing::debug!(verified, "identity verification status");
		tracing::debug!(user_id = %current_user.id(), "updating verified flag");
		state
			.user_repo
			.set_verified(&current_user.id(), verified)
			.await?;
		Ok::<_, ServerError>(verified)
	}
	.await;

	match outcome {
		Ok(verified) => (StatusCode::OK, Json(VerifyResponse::ok(verified))).into_response(),
		Err(e) => {
			tracing::warn!(error = %e, "identity verification failed");
			(
				StatusCode::UNPROCESSABLE_ENTITY,
				Json(VerifyFailureResponse::default()),
			)
				.into_response()
		}
	}
}

/// `GET /api/v1/users/by_location`
#[tracing::instrument(skip(state, params))]
pub async fn count_by_location(
	State(state): State<AppState>,
	Query(params): Query<HashMap<String, String>>,
) -> Result<Json<UserCountResponse>, ServerError> {
	let query = LocationQuery::from_params(&params)?;
	let user_count = state.user_repo.count_users_by_location(&query).await?;
	Ok(Json(UserCountResponse { user_count }))
}

async fn start_session(
	state: &AppState,
	user: &User,
	auth_method: AuthMethod,
	headers: &HeaderMap,
) -> Result<HeaderMap, ServerError> {
	let session = state
		.session_service
		.create_session(SessionRequest::new(
			user.id,
			auth_method,
			client_info_from_headers(headers),
		))
		.await?;

	Ok(set_cookie_headers(&session.cookie_header))
}

fn set_cookie_headers(cookie_header: &str) -> HeaderMap {
	let mut headers = HeaderMap::new();
	match HeaderValue::from_str(cookie_header) {
		Ok(value) => {
			headers.insert(SET_COOKIE, value);
		}
		Err(e) => {
			tracing::warn!(error = %e, "session cookie is not a valid header value; response carries no cookie");
		}
	}
	headers
}

/// Fire-and-forget; the response never waits on or reports delivery.
fn send_welcome_email(sender: Option<Arc<dyn EmailSender>>, user: &User) {
	let Some(sender) = sender else {
		tracing::debug!(user_id = %user.id, "SMTP not configured; skipping welcome email");
		return;
	};

	let to = user.email.clone();
	let user_id = user.id;
	let request = EmailRequest::Welcome {
		first_name: user.profile.first_name.clone(),
	};
	tokio::spawn(async move {
		match sender.send(&to, request).await {
			Ok(()) => tracing::debug!(%user_id, "welcome email sent"),
			Err(e) => tracing::warn!(%user_id, error = %e, "failed to send welcome email"),
		}
	});
}

/// 302 to `{base_url}/users/sign_up?alert=...` with one message per line.
fn sign_up_redirect(base_url: &str, messages: &[String]) -> Response {
	let location = sign_up_url(base_url, messages);
	match HeaderValue::from_str(&location) {
		Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
		Err(e) => ServerError::Internal(format!("invalid redirect location: {e}")).into_response(),
	}
}

fn sign_up_url(base_url: &str, messages: &[String]) -> String {
	let query = url::form_urlencoded::Serializer::new(String::new())
		.append_pair("alert", &messages.join("\n"))
		.finish();
	format!("{}{SIGN_UP_PATH}?{query}", base_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
	use super::*;

	mod user_body {
		use super::*;

		#[test]
		fn empty_body_is_an_empty_request() {
			let request = parse_user_request(b"  ").unwrap();
			assert!(request.user.email.is_none());
		}

		#[test]
		fn form_encoded_scalars_are_accepted() {
			let request = parse_user_request(
				br#"{"user":{"bio":"Navy","mentor":"true","years_of_service":"5"}}"#,
			)
			.unwrap();
			assert_eq!(request.user.bio, Some(Some("Navy".to_string())));
			assert_eq!(request.user.mentor, Some(true));
			assert_eq!(request.user.years_of_service, Some(Some(5)));
		}

		#[test]
		fn bad_attribute_is_reported_by_name() {
			let errors =
				parse_user_request(br#"{"user":{"bio":"Navy","years_of_service":"five"}}"#)
					.unwrap_err();
			assert_eq!(errors.get("years_of_service").unwrap(), [INVALID]);
			assert!(errors.get("bio").is_none());
			assert_eq!(errors.full_messages(), vec!["Years of service is invalid"]);
		}

		#[test]
		fn malformed_json_is_reported_against_user() {
			let errors = parse_user_request(b"{not json").unwrap_err();
			assert_eq!(errors.get("user").unwrap(), [INVALID]);
		}

		#[test]
		fn non_object_user_is_reported_against_user() {
			let errors = parse_user_request(br#"{"user":["ada@example.com"]}"#).unwrap_err();
			assert_eq!(errors.get("user").unwrap(), [INVALID]);
		}
	}

	#[test]
	fn unusable_cookie_value_is_dropped() {
		assert!(set_cookie_headers("opcode_session=abc\n; Path=/")
			.get(SET_COOKIE)
			.is_none());
		assert!(set_cookie_headers("opcode_session=abc; Path=/")
			.get(SET_COOKIE)
			.is_some());
	}

	#[test]
	fn sign_up_url_encodes_newline_joined_alert() {
		let url = sign_up_url(
			"http://localhost:3000",
			&[
				"Email is invalid".to_string(),
				"Password can't be blank".to_string(),
			],
		);
		let parsed = url::Url::parse(&url).unwrap();
		assert_eq!(parsed.path(), "/users/sign_up");
		let alert = parsed
			.query_pairs()
			.find(|(k, _)| k == "alert")
			.map(|(_, v)| v.into_owned())
			.unwrap();
		assert_eq!(alert, "Email is invalid\nPassword can't be blank");
	}

	#[test]
	fn sign_up_url_tolerates_trailing_slash() {
		let url = sign_up_url("https://operationcode.org/", &["Email is invalid".to_string()]);
		assert!(url.starts_with("https://operationcode.org/users/sign_up?alert="));
	}

	#[test]
	fn sign_up_redirect_is_302() {
		let response = sign_up_redirect("http://localhost:3000", &["Email is invalid".to_string()]);
		assert_eq!(response.status(), StatusCode::FOUND);
		assert!(response
			.headers()
			.get(LOCATION)
			.unwrap()
			.to_str()
			.unwrap()
			.starts_with("http://localhost:3000/users/sign_up"));
	}
}
