// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User entity and the permitted attribute set.
//!
//! - [`User`]: a persisted account with its API token and [`Profile`]
//! - [`Profile`]: everything a member can edit about themselves
//! - [`UserAttributes`]: the allow-listed fields accepted on register and update
//! - [`NewUser`]: a validated, not yet persisted account

use chrono::{DateTime, Utc};
use opcode_common_secret::SecretString;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use serde_with::{serde_as, BoolFromInt, DisplayFromStr, PickFirst};

use crate::types::UserId;

/// Profile fields, stored alongside the account and serialized back to clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
	pub zip: Option<String>,
	pub mentor: bool,
	pub slack_name: Option<String>,
	pub first_name: Option<String>,
	pub last_name: Option<String>,
	pub bio: Option<String>,
	pub verified: bool,
	pub state: Option<String>,
	pub address1: Option<String>,
	pub address2: Option<String>,
	pub username: Option<String>,
	pub volunteer: bool,
	pub branch_of_service: Option<String>,
	pub years_of_service: Option<i32>,
	pub pay_grade: Option<String>,
	pub military_occupational_specialty: Option<String>,
	pub github: Option<String>,
	pub twitter: Option<String>,
	pub linked_in: Option<String>,
	pub employment_status: Option<String>,
	pub education: Option<String>,
	pub company_role: Option<String>,
	pub company_name: Option<String>,
	pub education_level: Option<String>,
	pub scholarship_info: Option<String>,
	pub interests: Vec<String>,
}

/// A registered user.
#[derive(Debug, Clone)]
pub struct User {
	pub id: UserId,
	/// Trimmed and lowercased; unique across users.
	pub email: String,
	/// Opaque API token issued at creation.
	pub token: SecretString,
	pub profile: Profile,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// A user ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
	pub id: UserId,
	pub email: String,
	pub password_hash: String,
	pub token: SecretString,
	pub profile: Profile,
}

/// Allow-listed request attributes. Unknown keys are dropped during
/// deserialization.
///
/// Profile fields are tri-state: an absent key leaves the current value
/// alone, an explicit `null` clears it, and a value replaces it. Flags and
/// `years_of_service` also accept their form-encoded string spellings
/// (`"true"`, `"5"`), and flags accept `0` / `1`.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserAttributes {
	pub email: Option<String>,
	pub password: Option<SecretString>,
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub zip: Option<Option<String>>,
	#[serde_as(as = "Option<PickFirst<(_, DisplayFromStr, BoolFromInt)>>")]
	pub mentor: Option<bool>,
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub slack_name: Option<Option<String>>,
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub first_name: Option<Option<String>>,
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub last_name: Option<Option<String>>,
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub bio: Option<Option<String>>,
	#[serde_as(as = "Option<PickFirst<(_, DisplayFromStr, BoolFromInt)>>")]
	pub verified: Option<bool>,
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub state: Option<Option<String>>,
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub address1: Option<Option<String>>,
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub address2: Option<Option<String>>,
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub username: Option<Option<String>>,
	#[serde_as(as = "Option<PickFirst<(_, DisplayFromStr, BoolFromInt)>>")]
	pub volunteer: Option<bool>,
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub branch_of_service: Option<Option<String>>,
	#[serde(default, deserialize_with = "nullable_lenient_int")]
	pub years_of_service: Option<Option<i32>>,
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub pay_grade: Option<Option<String>>,
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub military_occupational_specialty: Option<Option<String>>,
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub github: Option<Option<String>>,
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub twitter: Option<Option<String>>,
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub linked_in: Option<Option<String>>,
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub employment_status: Option<Option<String>>,
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub education: Option<Option<String>>,
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub company_role: Option<Option<String>>,
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub company_name: Option<Option<String>>,
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub education_level: Option<Option<String>>,
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub scholarship_info: Option<Option<String>>,
	/// `null` empties the list.
	#[serde(default, with = "::serde_with::rust::double_option")]
	pub interests: Option<Option<Vec<String>>>,
}

#[serde_as]
#[derive(Deserialize)]
#[serde(transparent)]
struct LenientInt(#[serde_as(as = "PickFirst<(_, DisplayFromStr)>")] i32);

/// `null` becomes `Some(None)`; a missing key is handled by `#[serde(default)]`.
fn nullable_lenient_int<'de, D>(deserializer: D) -> Result<Option<Option<i32>>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Option::<LenientInt>::deserialize(deserializer)?;
	Ok(Some(value.map(|LenientInt(n)| n)))
}

macro_rules! assign_present {
	($attrs:expr, $profile:expr, [$($field:ident),* $(,)?]) => {
		$(
			if let Some(value) = $attrs.$field {
				$profile.$field = value;
			}
		)*
	};
}

impl UserAttributes {
	/// Write every present profile attribute into `profile`.
	///
	/// `email` and `password` are not profile fields and are left for the
	/// caller, which validates and stores them separately.
	pub fn apply_to(&self, profile: &mut Profile) {
		let attrs = self.clone();
		assign_present!(
			attrs,
			profile,
			[
				zip,
				mentor,
				slack_name,
				first_name,
				last_name,
				bio,
				verified,
				state,
				address1,
				address2,
				username,
				volunteer,
				branch_of_service,
				years_of_service,
				pay_grade,
				military_occupational_specialty,
				github,
				twitter,
				linked_in,
				employment_status,
				education,
				company_role,
				company_name,
				education_level,
				scholarship_info,
			]
		);

		if let Some(interests) = attrs.interests {
			profile.interests = dedup_preserving_order(interests.unwrap_or_default());
		}
	}

	/// A fresh profile carrying only the supplied attributes.
	pub fn to_profile(&self) -> Profile {
		let mut profile = Profile::default();
		self.apply_to(&mut profile);
		profile
	}
}

fn dedup_preserving_order(values: Vec<String>) -> Vec<String> {
	let mut seen = std::collections::HashSet::new();
	values
		.into_iter()
		.map(|v| v.trim().to_string())
		.filter(|v| !v.is_empty() && seen.insert(v.clone()))
		.collect()
}

/// Trim and lowercase an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
	email.trim().to_lowercase()
}

/// Generate the opaque per-user API token (32 random bytes, hex encoded).
pub fn generate_user_token() -> SecretString {
	let bytes: [u8; 32] = rand::thread_rng().gen();
	SecretString::new(hex::encode(bytes))
}
