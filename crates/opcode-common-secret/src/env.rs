// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Loading secrets from `VAR` or `VAR_FILE` environment variables.

use std::path::PathBuf;
use std::{env, fs};

use crate::SecretString;

#[derive(Debug, thiserror::Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

/// Read a secret from `{var}_FILE` (a path) or `{var}` (the value itself).
///
/// The file form wins when both are set. One trailing newline is stripped from
/// file contents. Returns `Ok(None)` when neither variable is present.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path) = env::var(&file_var) {
		if path.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}
		let path = PathBuf::from(path);
		let content = fs::read_to_string(&path).map_err(|source| SecretEnvError::Io {
			path: path.clone(),
			source,
		})?;
		let value = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(SecretString::new(value)));
	}

	Ok(env::var(var).ok().map(SecretString::new))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn missing_vars_yield_none() {
		let var = "OPCODE_TEST_SECRET_ABSENT_7731";
		env::remove_var(var);
		env::remove_var(format!("{var}_FILE"));
		assert!(load_secret_env(var).unwrap().is_none());
	}

	#[test]
	fn direct_value_is_used() {
		let var = "OPCODE_TEST_SECRET_DIRECT_7732";
		env::set_var(var, "direct-value");
		let secret = load_secret_env(var).unwrap().unwrap();
		assert_eq!(secret.expose(), "direct-value");
		env::remove_var(var);
	}

	#[test]
	fn file_value_wins_and_trailing_newline_is_stripped() {
		let var = "OPCODE_TEST_SECRET_FILE_7733";
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "from-file").unwrap();

		env::set_var(var, "direct-value");
		env::set_var(format!("{var}_FILE"), file.path());

		let secret = load_secret_env(var).unwrap().unwrap();
		assert_eq!(secret.expose(), "from-file");

		env::remove_var(var);
		env::remove_var(format!("{var}_FILE"));
	}

	#[test]
	fn empty_file_path_is_an_error() {
		let var = "OPCODE_TEST_SECRET_EMPTY_7734";
		env::set_var(format!("{var}_FILE"), "");
		assert!(matches!(
			load_secret_env(var),
			Err(SecretEnvError::EmptyPath { .. })
		));
		env::remove_var(format!("{var}_FILE"));
	}
}
