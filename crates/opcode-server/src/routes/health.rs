// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use opcode_server_api::{ComponentHealth, HealthResponse, HealthStatus};
use opcode_server_db::SqlitePool;

use crate::api::AppState;

/// `SELECT 1` against the pool, timed.
pub async fn check_database(pool: &SqlitePool) -> ComponentHealth {
	let start = Instant::now();
	let result = opcode_server_db::ping(pool).await;
	let latency_ms = start.elapsed().as_millis() as u64;

	match result {
		Ok(()) => ComponentHealth {
			status: HealthStatus::Healthy,
			latency_ms,
			error: None,
		},
		Err(e) => {
			tracing::warn!(error = %e, "database health check failed");
			ComponentHealth {
				status: HealthStatus::Unhealthy,
				latency_ms,
				error: Some(e.to_string()),
			}
		}
	}
}

#[tracing::instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let database = check_database(&state.pool).await;
	let status = database.status;
	let code = match status {
		HealthStatus::Healthy => StatusCode::OK,
		HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
	};

	(
		code,
		Json(HealthResponse {
			status,
			version: env!("CARGO_PKG_VERSION").to_string(),
			database,
		}),
	)
}
