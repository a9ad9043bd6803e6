// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Operation Code user API server binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use opcode_server::{create_app_state, create_router};
use opcode_server_db::SessionRepository;
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// HTTP server for the Operation Code user API.
#[derive(Parser, Debug)]
#[command(name = "opcode-server", about = "Operation Code user API server", version)]
struct Args {
	/// TOML configuration file (defaults to /etc/opcode/server.toml)
	#[arg(long, env = "OPCODE_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => opcode_server_config::load_config_with_file(path)?,
		None => opcode_server_config::load_config()?,
	};

	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| config.logging.level.clone().into());
	let registry = tracing_subscriber::registry().with(filter);
	if config.logging.json {
		registry
			.with(tracing_subscriber::fmt::layer().json())
			.init();
	} else {
		registry.with(tracing_subscriber::fmt::layer()).init();
	}

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		smtp_configured = config.smtp.is_some(),
		"starting opcode-server"
	);

	let pool = opcode_server_db::create_pool(config.database.url.expose()).await?;
	opcode_server_db::run_migrations(&pool).await?;

	let state = create_app_state(pool.clone(), &config)?;

	let sessions = SessionRepository::new(pool);
	let cleanup = tokio::spawn(async move {
		let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
		loop {
			interval.tick().await;
			match sessions.cleanup_expired_sessions().await {
				Ok(0) => {}
				Ok(removed) => tracing::info!(removed, "removed expired sessions"),
				Err(e) => tracing::warn!(error = %e, "expired session cleanup failed"),
			}
		}
	});

	let app = create_router(state)
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		);

	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);

	let listener = tokio::net::TcpListener::bind(&addr).await?;

	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
		}
	}

	cleanup.abort();
	tracing::info!("Server shutdown complete");
	Ok(())
}
