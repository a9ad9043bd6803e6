// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! # opcode-server-db
//!
//! SQLite persistence for the opcode user service via sqlx.
//!
//! Each domain has a `*Store` trait (the seam handlers depend on) and a
//! `*Repository` struct holding a `SqlitePool` that implements it by
//! delegating to inherent methods.
//!
//! | Variant | When |
//! |---------|------|
//! | `NotFound` | An id that should exist does not (update by id) |
//! | `Conflict` | Unique constraint violation (email already taken) |
//! | `Sqlx` | Anything unexpected from the driver |
//! | `Internal` | Unparseable stored data |
//!
//! Lookups where absence is normal return `Result<Option<T>>`.

pub mod error;
pub mod location;
pub mod migrations;
pub mod pool;
pub mod session;
pub mod user;

#[cfg(test)]
mod testing;

pub use error::{DbError, Result};
pub use location::{LocationError, LocationQuery};
pub use migrations::run_migrations;
pub use pool::{create_pool, ping};
pub use session::{SessionRepository, SessionStore};
pub use user::{UserRepository, UserStore};

pub use sqlx::sqlite::SqlitePool;
