// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User repository.
//!
//! Profile booleans are stored as INTEGER, `interests` as a JSON array and
//! timestamps as RFC 3339 text. Emails are normalized before every write and
//! lookup, so the UNIQUE index is effectively case-insensitive.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opcode_common_secret::SecretString;
use opcode_server_auth::{normalize_email, NewUser, Profile, User, UserId};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePool, SqliteRow};
use sqlx::{QueryBuilder, Row};
use uuid::Uuid;

use crate::error::{is_unique_violation, DbError};
use crate::location::LocationQuery;

const USER_COLUMNS: &str = "id, email, token, zip, mentor, slack_name, first_name, last_name, \
	bio, verified, state, address1, address2, username, volunteer, branch_of_service, \
	years_of_service, pay_grade, military_occupational_specialty, github, twitter, linked_in, \
	employment_status, education, company_role, company_name, education_level, \
	scholarship_info, interests, created_at, updated_at";

#[async_trait]
pub trait UserStore: Send + Sync {
	async fn create_user(&self, user: &NewUser) -> Result<User, DbError>;
	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError>;
	async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError>;
	async fn get_user_by_token(&self, token: &str) -> Result<Option<User>, DbError>;
	async fn update_user(&self, user: &User, password_hash: Option<&str>) -> Result<User, DbError>;
	async fn set_verified(&self, id: &UserId, verified: bool) -> Result<(), DbError>;
	async fn count_users(&self) -> Result<i64, DbError>;
	async fn count_users_by_location(&self, query: &LocationQuery) -> Result<i64, DbError>;
}

#[derive(Clone)]
pub struct UserRepository {
	pool: SqlitePool,
}

impl UserRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Insert a new user.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the email (or token) is already taken.
	#[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
	pub async fn create_user(&self, user: &NewUser) -> Result<User, DbError> {
		let now = Utc::now();
		let email = normalize_email(&user.email);
		let interests = serde_json::to_string(&user.profile.interests)?;

		let query = sqlx::query(
			r#"
			INSERT INTO users (
				zip, mentor, slack_name, first_name, last_name, bio, verified, state,
				address1, address2, username, volunteer, branch_of_service, years_of_service,
				pay_grade, military_occupational_specialty, github, twitter, linked_in,
				employment_status, education, company_role, company_name, education_level,
				scholarship_info, interests,
				id, email, password_hash, token, created_at, updated_at
			) VALUES (
				?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
				?, ?, ?, ?, ?, ?
			)
			"#,
		);

		let result = bind_profile(query, &user.profile, interests)
			.bind(user.id.to_string())
			.bind(&email)
			.bind(&user.password_hash)
			.bind(user.token.expose())
			.bind(now.to_rfc3339())
			.bind(now.to_rfc3339())
			.execute(&self.pool)
			.await;

		match result {
			Ok(_) => {}
			Err(e) if is_unique_violation(&e) => {
				return Err(DbError::Conflict("email has already been taken".to_string()));
			}
			Err(e) => return Err(e.into()),
		}

		tracing::debug!(user_id = %user.id, "user created");
		Ok(User {
			id: user.id,
			email,
			token: user.token.clone(),
			profile: user.profile.clone(),
			created_at: now,
			updated_at: now,
		})
	}

	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError> {
		let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?;

		row.as_ref().map(row_to_user).transpose()
	}

	#[tracing::instrument(skip(self, email))]
	pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
		let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
			.bind(normalize_email(email))
			.fetch_optional(&self.pool)
			.await?;

		row.as_ref().map(row_to_user).transpose()
	}

	/// Look up a user by their API token.
	#[tracing::instrument(skip(self, token))]
	pub async fn get_user_by_token(&self, token: &str) -> Result<Option<User>, DbError> {
		let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE token = ?"))
			// Note: the token is intentionally not logged
			.bind(token)
			.fetch_optional(&self.pool)
			.await?;

		row.as_ref().map(row_to_user).transpose()
	}

	/// Persist the email and profile of `user`, and the password hash when
	/// one is given. Returns the stored user with a fresh `updated_at`.
	///
	/// # Errors
	/// Returns `DbError::NotFound` if the user does not exist and
	/// `DbError::Conflict` if the new email belongs to someone else.
	#[tracing::instrument(skip(self, user, password_hash), fields(user_id = %user.id))]
	pub async fn update_user(
		&self,
		user: &User,
		password_hash: Option<&str>,
	) -> Result<User, DbError> {
		let now = Utc::now();
		let email = normalize_email(&user.email);
		let interests = serde_json::to_string(&user.profile.interests)?;

		let query = sqlx::query(
			r#"
			UPDATE users SET
				zip = ?, mentor = ?, slack_name = ?, first_name = ?, last_name = ?, bio = ?,
				verified = ?, state = ?, address1 = ?, address2 = ?, username = ?,
				volunteer = ?, branch_of_service = ?, years_of_service = ?, pay_grade = ?,
				military_occupational_specialty = ?, github = ?, twitter = ?, linked_in = ?,
				employment_status = ?, education = ?, company_role = ?, company_name = ?,
				education_level = ?, scholarship_info = ?, interests = ?,
				email = ?, password_hash = COALESCE(?, password_hash), updated_at = ?
			WHERE id = ?
			"#,
		);

		let result = bind_profile(query, &user.profile, interests)
			.bind(&email)
			.bind(password_hash)
			.bind(now.to_rfc3339())
			.bind(user.id.to_string())
			.execute(&self.pool)
			.await;

		let result = match result {
			Ok(result) => result,
			Err(e) if is_unique_violation(&e) => {
				return Err(DbError::Conflict("email has already been taken".to_string()));
			}
			Err(e) => return Err(e.into()),
		};

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("user {}", user.id)));
		}

		tracing::debug!(user_id = %user.id, password_changed = password_hash.is_some(), "user updated");
		Ok(User {
			email,
			updated_at: now,
			..user.clone()
		})
	}

	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn set_verified(&self, id: &UserId, verified: bool) -> Result<(), DbError> {
		let result = sqlx::query("UPDATE users SET verified = ?, updated_at = ? WHERE id = ?")
			.bind(verified)
			.bind(Utc::now().to_rfc3339())
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("user {id}")));
		}

		tracing::debug!(user_id = %id, verified, "user verified flag updated");
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn count_users(&self) -> Result<i64, DbError> {
		let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
			.fetch_one(&self.pool)
			.await?;
		Ok(count)
	}

	#[tracing::instrument(skip(self), fields(column = query.column()))]
	pub async fn count_users_by_location(&self, query: &LocationQuery) -> Result<i64, DbError> {
		let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users WHERE ");
		match query {
			LocationQuery::States(_) => builder.push("UPPER(state) IN ("),
			LocationQuery::Zips(_) => builder.push("zip IN ("),
		};
		let mut separated = builder.separated(", ");
		for value in query.values() {
			separated.push_bind(value.clone());
		}
		separated.push_unseparated(")");

		let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
		tracing::debug!(count, "counted users by location");
		Ok(count)
	}
}

#[async_trait]
impl UserStore for UserRepository {
	async fn create_user(&self, user: &NewUser) -> Result<User, DbError> {
		self.create_user(user).await
	}

	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError> {
		self.get_user_by_id(id).await
	}

	async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
		self.get_user_by_email(email).await
	}

	async fn get_user_by_token(&self, token: &str) -> Result<Option<User>, DbError> {
		self.get_user_by_token(token).await
	}

	async fn update_user(&self, user: &User, password_hash: Option<&str>) -> Result<User, DbError> {
		self.update_user(user, password_hash).await
	}

	async fn set_verified(&self, id: &UserId, verified: bool) -> Result<(), DbError> {
		self.set_verified(id, verified).await
	}

	async fn count_users(&self) -> Result<i64, DbError> {
		self.count_users().await
	}

	async fn count_users_by_location(&self, query: &LocationQuery) -> Result<i64, DbError> {
		self.count_users_by_location(query).await
	}
}

/// Bind the 26 profile columns in declaration order.
fn bind_profile<'q>(
	query: Query<'q, Sqlite, SqliteArguments<'q>>,
	profile: &'q Profile,
	interests: String,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
	query
		.bind(&profile.zip)
		.bind(profile.mentor)
		.bind(&profile.slack_name)
		.bind(&profile.first_name)
		.bind(&profile.last_name)
		.bind(&profile.bio)
		.bind(profile.verified)
		.bind(&profile.state)
		.bind(&profile.address1)
		.bind(&profile.address2)
		.bind(&profile.username)
		.bind(profile.volunteer)
		.bind(&profile.branch_of_service)
		.bind(profile.years_of_service)
		.bind(&profile.pay_grade)
		.bind(&profile.military_occupational_specialty)
		.bind(&profile.github)
		.bind(&profile.twitter)
		.bind(&profile.linked_in)
		.bind(&profile.employment_status)
		.bind(&profile.education)
		.bind(&profile.company_role)
		.bind(&profile.company_name)
		.bind(&profile.education_level)
		.bind(&profile.scholarship_info)
		.bind(interests)
}

fn parse_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>, DbError> {
	DateTime::parse_from_rfc3339(raw)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("Invalid {column}: {e}")))
}

fn row_to_user(row: &SqliteRow) -> Result<User, DbError> {
	let id_str: String = row.get("id");
	let id = Uuid::parse_str(&id_str)
		.map_err(|e| DbError::Internal(format!("Invalid user id UUID: {e}")))?;
	let interests: String = row.get("interests");
	let created_at: String = row.get("created_at");
	let updated_at: String = row.get("updated_at");

	let profile = Profile {
		zip: row.get("zip"),
		mentor: row.get("mentor"),
		slack_name: row.get("slack_name"),
		first_name: row.get("first_name"),
		last_name: row.get("last_name"),
		bio: row.get("bio"),
		verified: row.get("verified"),
		state: row.get("state"),
		address1: row.get("address1"),
		address2: row.get("address2"),
		username: row.get("username"),
		volunteer: row.get("volunteer"),
		branch_of_service: row.get("branch_of_service"),
		years_of_service: row.get("years_of_service"),
		pay_grade: row.get("pay_grade"),
		military_occupational_specialty: row.get("military_occupational_specialty"),
		github: row.get("github"),
		twitter: row.get("twitter"),
		linked_in: row.get("linked_in"),
		employment_status: row.get("employment_status"),
		education: row.get("education"),
		company_role: row.get("company_role"),
		company_name: row.get("company_name"),
		education_level: row.get("education_level"),
		scholarship_info: row.get("scholarship_info"),
		interests: serde_json::from_str(&interests)?,
	};

	Ok(User {
		id: UserId::new(id),
		email: row.get("email"),
		token: SecretString::new(row.get("token")),
		profile,
		created_at: parse_timestamp(&created_at, "created_at")?,
		updated_at: parse_timestamp(&updated_at, "updated_at")?,
	})
}
