// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod health;
pub mod users;

pub use health::{ComponentHealth, HealthResponse, HealthStatus};
pub use users::{
	ErrorResponse, ErrorsResponse, ExistRequest, ExistUser, RedirectResponse, SocialLoginResponse,
	TokenResponse, UserCountResponse, UserRequest, UserResponse, VerifyFailureResponse,
	VerifyRequest, VerifyResponse,
};
