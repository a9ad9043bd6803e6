// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client metadata recorded on new sessions.

use axum::http::HeaderMap;
use opcode_server_session::ClientInfo;

/// IP address and user agent from request headers.
///
/// The IP comes from the first hop of `X-Forwarded-For`, then `X-Real-IP`.
pub fn client_info_from_headers(headers: &HeaderMap) -> ClientInfo {
	let ip_address = forwarded_for(headers).or_else(|| header_str(headers, "x-real-ip"));
	let user_agent = header_str(headers, "user-agent");

	tracing::debug!(ip = ?ip_address, "client info extracted");

	ClientInfo {
		ip_address,
		user_agent,
	}
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
	header_str(headers, "x-forwarded-for")?
		.split(',')
		.next()
		.map(str::trim)
		.filter(|ip| !ip.is_empty())
		.map(str::to_string)
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
	headers
		.get(name)
		.and_then(|v| v.to_str().ok())
		.map(str::trim)
		.filter(|v| !v.is_empty())
		.map(str::to_string)
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::http::HeaderValue;

	#[test]
	fn prefers_first_forwarded_hop() {
		let mut headers = HeaderMap::new();
		headers.insert(
			"x-forwarded-for",
			HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
		);
		headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
		headers.insert("user-agent", HeaderValue::from_static("curl/8.5"));

		let info = client_info_from_headers(&headers);
		assert_eq!(info.ip_address.as_deref(), Some("203.0.113.7"));
		assert_eq!(info.user_agent.as_deref(), Some("curl/8.5"));
	}

	#[test]
	fn falls_back_to_real_ip() {
		let mut headers = HeaderMap::new();
		headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
		assert_eq!(
			client_info_from_headers(&headers).ip_address.as_deref(),
			Some("10.0.0.2")
		);
	}

	#[test]
	fn empty_headers_yield_nothing() {
		let info = client_info_from_headers(&HeaderMap::new());
		assert!(info.ip_address.is_none());
		assert!(info.user_agent.is_none());
	}
}
