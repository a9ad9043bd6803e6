// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Users, sessions and credentials for the opcode server.
//!
//! This crate is storage-agnostic. It defines the [`User`] and [`Session`]
//! entities, the allow-listed [`UserAttributes`] accepted from clients, field
//! validation producing [`FieldErrors`], Argon2 password hashing, token
//! generation, and the [`AuthContext`] the HTTP layer attaches to requests.

mod argon2_config;
pub mod error;
pub mod middleware;
pub mod password;
pub mod session;
pub mod types;
pub mod user;
pub mod validation;

pub use error::AuthError;
pub use middleware::{
	extract_bearer_token, extract_session_cookie_with_name, AuthContext, CurrentUser,
	SESSION_COOKIE_NAME,
};
pub use password::{generate_random_password, hash_password, verify_password};
pub use session::{generate_session_token, Session, SESSION_EXPIRY_DAYS};
pub use types::{SessionId, UserId};
pub use user::{generate_user_token, normalize_email, NewUser, Profile, User, UserAttributes};
pub use validation::{validate_new_user, validate_update, FieldErrors};

use sha2::{Digest, Sha256};

/// SHA-256 of a bearer or session token, hex encoded. This is what gets stored.
pub fn hash_token(token: &str) -> String {
	let mut hasher = Sha256::new();
	hasher.update(token.as_bytes());
	hex::encode(hasher.finalize())
}
