// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Operation Code user API server.
//!
//! Registration, profile updates, social login and identity verification
//! over HTTP, backed by SQLite.

pub mod accounts;
pub mod api;
pub mod auth_middleware;
pub mod client_info;
pub mod error;
pub mod routes;

pub use accounts::{AccountError, AccountService, SocialUser};
pub use api::{create_app_state, create_router, AppState};
pub use error::ServerError;
pub use opcode_server_config::ServerConfig;
