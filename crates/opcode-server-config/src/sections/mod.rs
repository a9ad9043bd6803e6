// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for opcode-server.

pub mod auth;
pub mod database;
pub mod http;
pub mod idme;
pub mod logging;
pub mod smtp;

pub use auth::{AuthConfig, AuthConfigLayer};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use idme::{IdMeConfig, IdMeConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use smtp::{SmtpConfig, SmtpConfigLayer};
