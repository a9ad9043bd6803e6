// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Field-level validation of user attributes.
//!
//! Errors are collected per field into [`FieldErrors`], which serializes as
//! `{"email": ["can't be blank"], ...}` and can render full sentences such as
//! `"Email has already been taken"`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use opcode_common_secret::SecretString;
use regex::Regex;
use serde::Serialize;

use crate::user::UserAttributes;

pub const PASSWORD_MIN_LENGTH: usize = 6;
pub const PASSWORD_MAX_LENGTH: usize = 128;

pub const BLANK: &str = "can't be blank";
pub const INVALID: &str = "is invalid";
pub const TAKEN: &str = "has already been taken";

static EMAIL_REGEX: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("email pattern compiles"));

/// Validation messages keyed by attribute name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add(&mut self, field: &str, message: impl Into<String>) {
		self.0.entry(field.to_string()).or_default().push(message.into());
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn get(&self, field: &str) -> Option<&[String]> {
		self.0.get(field).map(Vec::as_slice)
	}

	/// `Ok(())` when nothing was recorded.
	pub fn into_result(self) -> Result<(), FieldErrors> {
		if self.is_empty() {
			Ok(())
		} else {
			Err(self)
		}
	}

	/// Human sentences, one per message.
	pub fn full_messages(&self) -> Vec<String> {
		self.0
			.iter()
			.flat_map(|(field, messages)| {
				let name = humanize(field);
				messages.iter().map(move |m| format!("{name} {m}"))
			})
			.collect()
	}
}

impl std::fmt::Display for FieldErrors {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.full_messages().join(", "))
	}
}

impl std::error::Error for FieldErrors {}

fn humanize(field: &str) -> String {
	let spaced = field.replace('_', " ");
	let mut chars = spaced.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}

pub fn is_valid_email(email: &str) -> bool {
	EMAIL_REGEX.is_match(email)
}

/// Presence, then format (format is only checked on non-blank input).
pub fn validate_email(email: Option<&str>, errors: &mut FieldErrors) {
	match email.map(str::trim) {
		None | Some("") => errors.add("email", BLANK),
		Some(email) if !is_valid_email(email) => errors.add("email", INVALID),
		Some(_) => {}
	}
}

/// Presence and length of a password.
pub fn validate_password(password: Option<&SecretString>, errors: &mut FieldErrors) {
	let Some(password) = password.map(|p| p.expose()).filter(|p| !p.is_empty()) else {
		errors.add("password", BLANK);
		return;
	};

	let length = password.chars().count();
	if length < PASSWORD_MIN_LENGTH {
		errors.add(
			"password",
			format!("is too short (minimum is {PASSWORD_MIN_LENGTH} characters)"),
		);
	} else if length > PASSWORD_MAX_LENGTH {
		errors.add(
			"password",
			format!("is too long (maximum is {PASSWORD_MAX_LENGTH} characters)"),
		);
	}
}

fn validate_profile(attrs: &UserAttributes, errors: &mut FieldErrors) {
	if attrs.years_of_service.flatten().is_some_and(|years| years < 0) {
		errors.add("years_of_service", "must be greater than or equal to 0");
	}
}

/// Validate attributes for a brand-new account. Uniqueness is checked by the
/// store, not here.
pub fn validate_new_user(attrs: &UserAttributes) -> FieldErrors {
	let mut errors = FieldErrors::new();
	validate_email(attrs.email.as_deref(), &mut errors);
	validate_password(attrs.password.as_ref(), &mut errors);
	validate_profile(attrs, &mut errors);
	errors
}

/// Validate attributes for an update: only what is present is checked.
pub fn validate_update(attrs: &UserAttributes) -> FieldErrors {
	let mut errors = FieldErrors::new();
	if attrs.email.is_some() {
		validate_email(attrs.email.as_deref(), &mut errors);
	}
	if attrs.password.is_some() {
		validate_password(attrs.password.as_ref(), &mut errors);
	}
	validate_profile(attrs, &mut errors);
	errors
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn attrs(email: Option<&str>, password: Option<&str>) -> UserAttributes {
		UserAttributes {
			email: email.map(str::to_string),
			password: password.map(|p| SecretString::new(p.to_string())),
			..Default::default()
		}
	}

	mod new_user {
		use super::*;

		#[test]
		fn valid_attributes_pass() {
			assert!(validate_new_user(&attrs(Some("ada@example.com"), Some("secret1"))).is_empty());
		}

		#[test]
		fn blank_email_is_only_blank() {
			let errors = validate_new_user(&attrs(Some("  "), Some("secret1")));
			assert_eq!(errors.get("email").unwrap(), [BLANK]);
		}

		#[test]
		fn malformed_email_is_invalid() {
			let errors = validate_new_user(&attrs(Some("not-an-email"), Some("secret1")));
			assert_eq!(errors.get("email").unwrap(), [INVALID]);
		}

		#[test]
		fn missing_password_is_blank() {
			let errors = validate_new_user(&attrs(Some("ada@example.com"), None));
			assert_eq!(errors.get("password").unwrap(), [BLANK]);
		}

		#[test]
		fn short_password_reports_minimum() {
			let errors = validate_new_user(&attrs(Some("ada@example.com"), Some("abc")));
			assert_eq!(
				errors.get("password").unwrap(),
				["is too short (minimum is 6 characters)"]
			);
		}

		#[test]
		fn long_password_reports_maximum() {
			let long = "x".repeat(PASSWORD_MAX_LENGTH + 1);
			let errors = validate_new_user(&attrs(Some("ada@example.com"), Some(&long)));
			assert_eq!(
				errors.get("password").unwrap(),
				["is too long (maximum is 128 characters)"]
			);
		}

		#[test]
		fn negative_years_of_service_rejected() {
			let mut a = attrs(Some("ada@example.com"), Some("secret1"));
			a.years_of_service = Some(Some(-1));
			assert!(validate_new_user(&a).get("years_of_service").is_some());
		}
	}

	mod update {
		use super::*;

		#[test]
		fn absent_fields_are_not_checked() {
			assert!(validate_update(&UserAttributes::default()).is_empty());
		}

		#[test]
		fn present_but_blank_email_is_rejected() {
			let errors = validate_update(&attrs(Some(""), None));
			assert_eq!(errors.get("email").unwrap(), [BLANK]);
		}
	}

	mod messages {
		use super::*;

		#[test]
		fn full_messages_humanize_field_names() {
			let mut errors = FieldErrors::new();
			errors.add("email", TAKEN);
			errors.add("years_of_service", "must be greater than or equal to 0");
			assert_eq!(
				errors.full_messages(),
				vec![
					"Email has already been taken".to_string(),
					"Years of service must be greater than or equal to 0".to_string(),
				]
			);
		}

		#[test]
		fn serializes_as_field_map() {
			let mut errors = FieldErrors::new();
			errors.add("email", BLANK);
			errors.add("password", BLANK);
			let json = serde_json::to_value(&errors).unwrap();
			assert_eq!(
				json,
				serde_json::json!({ "email": [BLANK], "password": [BLANK] })
			);
		}

		#[test]
		fn into_result_reflects_emptiness() {
			assert!(FieldErrors::new().into_result().is_ok());
			let mut errors = FieldErrors::new();
			errors.add("email", INVALID);
			assert!(errors.into_result().is_err());
		}
	}

	proptest! {
		#[test]
		fn simple_addresses_are_valid(local in "[a-z0-9._+-]{1,20}", domain in "[a-z0-9-]{1,20}\\.[a-z]{2,6}") {
			prop_assert!(is_valid_email(&format!("{}@{}", local, domain)), "expected valid email");
		}

		#[test]
		fn whitespace_makes_address_invalid(local in "[a-z]{1,10}", domain in "[a-z]{1,10}") {
			let with_space = format!("{local} @{domain}.com");
			prop_assert!(!is_valid_email(&with_space));
		}

		#[test]
		fn passwords_within_bounds_pass(password in "[a-zA-Z0-9]{6,128}") {
			let mut errors = FieldErrors::new();
			validate_password(Some(&SecretString::new(password)), &mut errors);
			prop_assert!(errors.is_empty());
		}
	}
}
