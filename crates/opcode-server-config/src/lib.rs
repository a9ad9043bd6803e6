// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the opcode user service.
//!
//! Sources are layered, lowest precedence first:
//! 1. built-in defaults
//! 2. a TOML file (`/etc/opcode/server.toml` unless a path is given)
//! 3. `OPCODE_SERVER_*` environment variables
//!
//! ```ignore
//! let config = opcode_server_config::load_config()?;
//! println!("listening on {}", config.socket_addr());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use std::path::PathBuf;
use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub database: DatabaseConfig,
	pub auth: AuthConfig,
	/// `None` when no SMTP host is configured; welcome mail is then skipped.
	pub smtp: Option<SmtpConfig>,
	pub idme: IdMeConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from defaults, the system TOML file and the environment.
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Same as [`load_config`] with a caller-supplied TOML path.
pub fn load_config_with_file(config_path: impl Into<PathBuf>) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Resolve a merged layer into a validated [`ServerConfig`].
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let http = layer.http.unwrap_or_default().finalize();
	let database = layer.database.unwrap_or_default().finalize();
	let auth = layer.auth.unwrap_or_default().finalize();
	let smtp = layer.smtp.unwrap_or_default().build()?;
	let idme = layer.idme.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	let config = ServerConfig {
		http,
		database,
		auth,
		smtp,
		idme,
		logging,
	};
	validate_config(&config)?;

	info!(
		host = %config.http.host,
		port = config.http.port,
		smtp_configured = config.smtp.is_some(),
		idme_base_url = %config.idme.base_url,
		"Server configuration loaded"
	);

	Ok(config)
}

fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
	for (key, value) in [
		("http.base_url", &config.http.base_url),
		("idme.base_url", &config.idme.base_url),
	] {
		url::Url::parse(value).map_err(|e| ConfigError::InvalidValue {
			key: key.to_string(),
			message: format!("'{value}' is not a URL: {e}"),
		})?;
	}

	if config.auth.session_ttl_days <= 0 {
		return Err(ConfigError::Validation(
			"auth.session_ttl_days must be positive".to_string(),
		));
	}

	if config.idme.timeout_secs == 0 {
		return Err(ConfigError::Validation(
			"idme.timeout_secs must be positive".to_string(),
		));
	}

	Ok(())
}
