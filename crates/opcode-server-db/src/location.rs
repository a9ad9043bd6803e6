// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Location criteria for counting members.
//!
//! Built from raw query parameters:
//! - `state=CA,or` matches the stored state case-insensitively
//! - `zip=97201,97202` matches the stored zip exactly
//!
//! When both are present `state` wins.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
	#[error("no location criteria supplied; expected one of: state, zip")]
	MissingCriteria,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationQuery {
	/// Upper-cased state codes.
	States(Vec<String>),
	Zips(Vec<String>),
}

impl LocationQuery {
	pub fn from_params(params: &HashMap<String, String>) -> Result<Self, LocationError> {
		let states = split_list(params.get("state"));
		if !states.is_empty() {
			return Ok(Self::States(
				states.into_iter().map(|s| s.to_uppercase()).collect(),
			));
		}

		let zips = split_list(params.get("zip"));
		if !zips.is_empty() {
			return Ok(Self::Zips(zips));
		}

		Err(LocationError::MissingCriteria)
	}

	pub fn column(&self) -> &'static str {
		match self {
			Self::States(_) => "state",
			Self::Zips(_) => "zip",
		}
	}

	pub fn values(&self) -> &[String] {
		match self {
			Self::States(values) | Self::Zips(values) => values,
		}
	}
}

fn split_list(raw: Option<&String>) -> Vec<String> {
	let mut values: Vec<String> = raw
		.map(|raw| {
			raw.split(',')
				.map(str::trim)
				.filter(|v| !v.is_empty())
				.map(str::to_string)
				.collect()
		})
		.unwrap_or_default();
	values.dedup();
	values
}
