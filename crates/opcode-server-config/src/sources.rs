// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, a TOML file and the environment.

use std::path::PathBuf;

use opcode_common_secret::load_secret_env;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	AuthConfigLayer, DatabaseConfigLayer, HttpConfigLayer, IdMeConfigLayer, LoggingConfigLayer,
	SmtpConfigLayer,
};

/// Higher precedence overrides lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file source. A missing file yields an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/opcode/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment source. Convention: `OPCODE_SERVER_<SECTION>_<FIELD>`.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		Ok(ServerConfigLayer {
			http: Some(HttpConfigLayer {
				host: env_var("OPCODE_SERVER_HOST"),
				port: env_parse("OPCODE_SERVER_PORT")?,
				base_url: env_var("OPCODE_SERVER_BASE_URL"),
			}),
			database: Some(DatabaseConfigLayer {
				url: load_secret_env("OPCODE_SERVER_DATABASE_URL")?,
			}),
			auth: Some(AuthConfigLayer {
				session_cookie_name: env_var("OPCODE_SERVER_SESSION_COOKIE_NAME"),
				secure_cookies: env_bool("OPCODE_SERVER_SECURE_COOKIES"),
				session_ttl_days: env_parse("OPCODE_SERVER_SESSION_TTL_DAYS")?,
			}),
			smtp: Some(SmtpConfigLayer {
				host: env_var("OPCODE_SERVER_SMTP_HOST"),
				port: env_parse("OPCODE_SERVER_SMTP_PORT")?,
				username: env_var("OPCODE_SERVER_SMTP_USERNAME"),
				password: load_secret_env("OPCODE_SERVER_SMTP_PASSWORD")?,
				from_address: env_var("OPCODE_SERVER_SMTP_FROM_ADDRESS"),
				from_name: env_var("OPCODE_SERVER_SMTP_FROM_NAME"),
				use_tls: env_bool("OPCODE_SERVER_SMTP_USE_TLS"),
			}),
			idme: Some(IdMeConfigLayer {
				base_url: env_var("OPCODE_SERVER_IDME_BASE_URL"),
				timeout_secs: env_parse("OPCODE_SERVER_IDME_TIMEOUT_SECS")?,
			}),
			logging: Some(LoggingConfigLayer {
				level: env_var("OPCODE_SERVER_LOG_LEVEL"),
				json: env_bool("OPCODE_SERVER_LOG_JSON"),
			}),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("cannot parse '{v}'"),
		}),
		None => Ok(None),
	}
}
