// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Account creation and profile updates on top of a [`UserStore`].
//!
//! Validation runs first and collects every field error; uniqueness of the
//! email is checked against the store and, for the race between check and
//! insert, by mapping the store's conflict to the same field error.

use std::sync::Arc;

use opcode_server_auth::{
	generate_random_password, generate_user_token, hash_password, normalize_email,
	validate_new_user, validate_update, validation::TAKEN, AuthError, FieldErrors, NewUser, User,
	UserAttributes, UserId,
};
use opcode_server_db::{DbError, UserStore};

use crate::error::ServerError;

pub const EXISTING_USER_REDIRECT: &str = "/profile";
pub const NEW_USER_REDIRECT: &str = "/signup-info";

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
	#[error("{0}")]
	Invalid(FieldErrors),

	#[error(transparent)]
	Db(#[from] DbError),

	#[error(transparent)]
	Auth(#[from] AuthError),
}

impl AccountError {
	/// Sentences suitable for showing to the member.
	pub fn full_messages(&self) -> Vec<String> {
		match self {
			AccountError::Invalid(errors) => errors.full_messages(),
			other => vec![other.to_string()],
		}
	}
}

impl From<AccountError> for ServerError {
	fn from(err: AccountError) -> Self {
		match err {
			AccountError::Invalid(errors) => ServerError::Validation(errors),
			AccountError::Db(e) => ServerError::Db(e),
			AccountError::Auth(e) => ServerError::Auth(e),
		}
	}
}

/// Outcome of resolving a social-provider payload.
#[derive(Debug, Clone)]
pub enum SocialUser {
	/// An account with this email already exists.
	Existing(User),
	/// Nothing matched; these attributes will create one.
	New(UserAttributes),
}

impl SocialUser {
	pub fn redirect_path(&self) -> &'static str {
		match self {
			SocialUser::Existing(_) => EXISTING_USER_REDIRECT,
			SocialUser::New(_) => NEW_USER_REDIRECT,
		}
	}
}

#[derive(Clone)]
pub struct AccountService {
	users: Arc<dyn UserStore>,
}

impl AccountService {
	pub fn new(users: Arc<dyn UserStore>) -> Self {
		Self { users }
	}

	/// Validate and persist a new account.
	#[tracing::instrument(skip(self, attrs))]
	pub async fn register(&self, attrs: &UserAttributes) -> Result<User, AccountError> {
		let mut errors = validate_new_user(attrs);
		let email = attrs.email.as_deref().map(normalize_email).unwrap_or_default();
		if errors.get("email").is_none() && self.users.get_user_by_email(&email).await?.is_some() {
			errors.add("email", TAKEN);
		}
		errors.into_result().map_err(AccountError::Invalid)?;

		let password = attrs.password.as_ref().ok_or_else(|| {
			let mut errors = FieldErrors::new();
			errors.add("password", opcode_server_auth::validation::BLANK);
			AccountError::Invalid(errors)
		})?;

		let new_user = NewUser {
			id: UserId::generate(),
			email,
			password_hash: hash_password(password)?,
			token: generate_user_token(),
			profile: attrs.to_profile(),
		};

		let user = self
			.users
			.create_user(&new_user)
			.await
			.map_err(email_conflict)?;

		tracing::info!(user_id = %user.id, "user registered");
		Ok(user)
	}

	/// Apply the present attributes to `user` and persist.
	#[tracing::instrument(skip(self, user, attrs), fields(user_id = %user.id))]
	pub async fn update_profile(
		&self,
		user: &User,
		attrs: &UserAttributes,
	) -> Result<User, AccountError> {
		let mut errors = validate_update(attrs);

		let mut updated = user.clone();
		attrs.apply_to(&mut updated.profile);

		if let Some(email) = attrs.email.as_deref() {
			let email = normalize_email(email);
			if errors.get("email").is_none() && email != user.email {
				if let Some(other) = self.users.get_user_by_email(&email).await? {
					if other.id != user.id {
						errors.add("email", TAKEN);
					}
				}
			}
			updated.email = email;
		}
		errors.into_result().map_err(AccountError::Invalid)?;

		let password_hash = attrs.password.as_ref().map(hash_password).transpose()?;

		let saved = self
			.users
			.update_user(&updated, password_hash.as_deref())
			.await
			.map_err(email_conflict)?;

		tracing::info!(user_id = %saved.id, "profile updated");
		Ok(saved)
	}

	/// Find the account behind a social login payload, or prepare one.
	///
	/// Only the email, names, zip and password are taken from the payload.
	/// A payload without a password gets a random one so the new account
	/// passes validation.
	#[tracing::instrument(skip(self, attrs))]
	pub async fn fetch_social_user_and_redirect_path(
		&self,
		attrs: &UserAttributes,
	) -> Result<(SocialUser, &'static str), AccountError> {
		let email = attrs
			.email
			.as_deref()
			.map(str::trim)
			.filter(|e| !e.is_empty());

		if let Some(email) = email {
			if let Some(user) = self.users.get_user_by_email(email).await? {
				tracing::debug!(user_id = %user.id, "social login matched existing user");
				let resolved = SocialUser::Existing(user);
				let path = resolved.redirect_path();
				return Ok((resolved, path));
			}
		}

		let password = attrs
			.password
			.clone()
			.filter(|p| !p.expose().is_empty())
			.unwrap_or_else(generate_random_password);

		let resolved = SocialUser::New(UserAttributes {
			email: attrs.email.clone(),
			first_name: attrs.first_name.clone(),
			last_name: attrs.last_name.clone(),
			zip: attrs.zip.clone(),
			password: Some(password),
			..Default::default()
		});
		let path = resolved.redirect_path();
		Ok((resolved, path))
	}

	/// Persist a resolved social user: existing accounts are re-saved as they
	/// are, new ones go through registration.
	pub async fn save_social(&self, resolved: SocialUser) -> Result<User, AccountError> {
		match resolved {
			SocialUser::Existing(user) => Ok(self.users.update_user(&user, None).await?),
			SocialUser::New(attrs) => self.register(&attrs).await,
		}
	}
}

fn email_conflict(err: DbError) -> AccountError {
	match err {
		DbError::Conflict(_) => {
			let mut errors = FieldErrors::new();
			errors.add("email", TAKEN);
			AccountError::Invalid(errors)
		}
		other => AccountError::Db(other),
	}
}
