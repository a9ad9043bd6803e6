// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Password hashing with Argon2id.

use argon2::password_hash::{
	rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use opcode_common_secret::SecretString;
use rand::Rng;
use tracing::instrument;

use crate::argon2_config::argon2_instance;
use crate::error::AuthError;

/// Hash a password into a PHC string (algorithm, parameters, salt and hash).
#[instrument(name = "password.hash", skip_all)]
pub fn hash_password(password: &SecretString) -> Result<String, AuthError> {
	let salt = SaltString::generate(&mut OsRng);
	argon2_instance()
		.hash_password(password.expose().as_bytes(), &salt)
		.map(|hash| hash.to_string())
		.map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Check a password against a stored PHC string. Malformed hashes never match.
#[instrument(name = "password.verify", skip_all)]
pub fn verify_password(password: &SecretString, hash: &str) -> bool {
	let Ok(parsed) = PasswordHash::new(hash) else {
		return false;
	};
	argon2_instance()
		.verify_password(password.expose().as_bytes(), &parsed)
		.is_ok()
}

/// A random password for accounts created through a social provider.
pub fn generate_random_password() -> SecretString {
	let bytes: [u8; 32] = rand::thread_rng().gen();
	SecretString::new(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn secret(s: &str) -> SecretString {
		SecretString::new(s.to_string())
	}

	#[test]
	fn hash_verifies_with_same_password() {
		let hash = hash_password(&secret("correct horse")).unwrap();
		assert!(hash.starts_with("$argon2id$"));
		assert!(verify_password(&secret("correct horse"), &hash));
	}

	#[test]
	fn hash_rejects_other_password() {
		let hash = hash_password(&secret("correct horse")).unwrap();
		assert!(!verify_password(&secret("battery staple"), &hash));
	}

	#[test]
	fn same_password_hashes_differently() {
		let a = hash_password(&secret("correct horse")).unwrap();
		let b = hash_password(&secret("correct horse")).unwrap();
		assert_ne!(a, b);
	}

	#[test]
	fn malformed_hash_never_matches() {
		assert!(!verify_password(&secret("anything"), "not-a-phc-string"));
	}

	#[test]
	fn random_password_is_long_enough() {
		let password = generate_random_password();
		assert_eq!(password.expose().len(), 64);
		assert_ne!(password, generate_random_password());
	}
}
