// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret values for the opcode server.
//!
//! [`Secret<T>`] holds SMTP passwords, user passwords in flight and session
//! tokens. It redacts itself in `Debug`, `Display` and `Serialize`, zeroes its
//! memory on drop, and only hands out the inner value through
//! [`Secret::expose`].
//!
//! ```
//! use opcode_common_secret::SecretString;
//!
//! let password = SecretString::new("hunter22".to_string());
//! assert_eq!(format!("{password}"), "[REDACTED]");
//! assert_eq!(password.expose(), "hunter22");
//! ```

pub mod env;

use std::fmt;
use zeroize::Zeroize;

pub use env::{load_secret_env, SecretEnvError};

/// Placeholder printed wherever a secret would otherwise appear.
pub const REDACTED: &str = "[REDACTED]";

/// Wrapper for a sensitive value.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

pub type SecretString = Secret<String>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Borrow the wrapped value. Every call site is a deliberate disclosure.
	pub fn expose(&self) -> &T {
		&self.inner
	}

	/// Copy the wrapped value out, leaving this wrapper to zeroize its own copy.
	pub fn into_inner(self) -> T
	where
		T: Clone,
	{
		self.inner.clone()
	}
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self::new(self.inner.clone())
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

#[cfg(feature = "serde")]
mod serde_impl {
	use super::{Secret, REDACTED};
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use zeroize::Zeroize;

	impl<T> Serialize for Secret<T>
	where
		T: Zeroize,
	{
		fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			serializer.serialize_str(REDACTED)
		}
	}

	impl<'de, T> Deserialize<'de> for Secret<T>
	where
		T: Deserialize<'de> + Zeroize,
	{
		fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where
			D: Deserializer<'de>,
		{
			T::deserialize(deserializer).map(Secret::new)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	mod formatting {
		use super::*;

		#[test]
		fn debug_hides_value() {
			let secret = SecretString::new("smtp-password".to_string());
			let out = format!("{secret:?}");
			assert_eq!(out, "Secret(\"[REDACTED]\")");
		}

		#[test]
		fn display_hides_value() {
			let secret = SecretString::new("smtp-password".to_string());
			assert_eq!(secret.to_string(), REDACTED);
		}

		#[test]
		fn optional_secret_debug_hides_value() {
			let secret = Some(SecretString::new("smtp-password".to_string()));
			assert!(!format!("{secret:?}").contains("smtp-password"));
		}
	}

	mod access {
		use super::*;

		#[test]
		fn expose_and_into_inner_return_the_value() {
			let secret = SecretString::from("token-abc".to_string());
			assert_eq!(secret.expose(), "token-abc");
			assert_eq!(secret.clone().into_inner(), "token-abc");
		}

		#[test]
		fn equality_uses_the_value() {
			assert_eq!(
				SecretString::new("a".to_string()),
				SecretString::new("a".to_string())
			);
			assert_ne!(
				SecretString::new("a".to_string()),
				SecretString::new("b".to_string())
			);
		}
	}

	#[cfg(feature = "serde")]
	mod serde_tests {
		use super::*;

		#[test]
		fn serializes_as_placeholder() {
			let secret = SecretString::new("smtp-password".to_string());
			assert_eq!(serde_json::to_string(&secret).unwrap(), "\"[REDACTED]\"");
		}

		#[test]
		fn deserializes_the_real_value() {
			let secret: SecretString = serde_json::from_str("\"smtp-password\"").unwrap();
			assert_eq!(secret.expose(), "smtp-password");
		}
	}

	proptest! {
		#[test]
		fn debug_and_display_never_leak(inner in "[a-z0-9]{8,40}") {
			let secret = SecretString::new(inner.clone());
			prop_assert!(!format!("{:?}", secret).contains(&inner), "Debug output leaked secret");
			prop_assert!(!format!("{}", secret).contains(&inner), "Display output leaked secret");
		}
	}
}
