// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Email service for opcode.
//!
//! [`EmailService`] renders an [`EmailRequest`] into a subject plus HTML and
//! text bodies and hands it to SMTP. Handlers depend on the [`EmailSender`]
//! trait so tests can capture mail instead of sending it.

use async_trait::async_trait;
use opcode_server_smtp::SmtpClient;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
	#[error("SMTP error: {0}")]
	Smtp(#[from] opcode_server_smtp::SmtpError),
}

pub type Result<T> = std::result::Result<T, EmailError>;

pub const WELCOME_SUBJECT: &str = "Welcome to Operation Code";

/// Email request variants for different email types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailRequest {
	/// Sent once after registration.
	Welcome {
		/// Greeting name; falls back to a generic greeting when absent.
		first_name: Option<String>,
	},
}

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
	pub subject: String,
	pub html: String,
	pub text: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
	async fn send(&self, to: &str, request: EmailRequest) -> Result<()>;
}

pub struct EmailService {
	smtp_client: Arc<SmtpClient>,
}

impl EmailService {
	pub fn new(smtp_client: Arc<SmtpClient>) -> Self {
		Self { smtp_client }
	}

	#[tracing::instrument(
		name = "email_service_send",
		skip(self, request),
		fields(to = %to, request_type = ?std::mem::discriminant(&request))
	)]
	pub async fn send(&self, to: &str, request: EmailRequest) -> Result<()> {
		let email = render_email(&request);

		self
			.smtp_client
			.send_email(to, &email.subject, &email.html, &email.text)
			.await?;

		tracing::info!("Email sent successfully");
		Ok(())
	}
}

#[async_trait]
impl EmailSender for EmailService {
	async fn send(&self, to: &str, request: EmailRequest) -> Result<()> {
		EmailService::send(self, to, request).await
	}
}

pub fn render_email(request: &EmailRequest) -> RenderedEmail {
	match request {
		EmailRequest::Welcome { first_name } => render_welcome(first_name.as_deref()),
	}
}

fn render_welcome(first_name: Option<&str>) -> RenderedEmail {
	let greeting = match first_name.map(str::trim).filter(|n| !n.is_empty()) {
		Some(name) => format!("Hi {name},"),
		None => "Hi there,".to_string(),
	};
	let body = "Thanks for joining Operation Code, the community helping military \
		veterans and their families build careers in software.";
	let next = "Complete your profile so we can match you with mentors, \
		scholarships and opportunities.";

	let html = format!(
		r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{WELCOME_SUBJECT}</title>
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h1 style="color: #1a1a1a; font-size: 24px; margin-bottom: 20px;">{WELCOME_SUBJECT}</h1>
    <p>{greeting}</p>
    <p style="margin-bottom: 20px;">{body}</p>
    <p style="margin-bottom: 20px;">{next}</p>
    <p style="margin-top: 20px; color: #666; font-size: 14px;">The Operation Code team</p>
</body>
</html>"#,
		greeting = escape_html(&greeting),
	);

	let text = format!("{greeting}\n\n{body}\n\n{next}\n\nThe Operation Code team");

	RenderedEmail {
		subject: WELCOME_SUBJECT.to_string(),
		html,
		text,
	}
}

fn escape_html(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());
	for c in raw.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#39;"),
			_ => out.push(c),
		}
	}
	out
}
