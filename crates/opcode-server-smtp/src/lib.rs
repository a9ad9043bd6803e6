// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SMTP client for opcode.
//!
//! Sends multipart (HTML + plain text) mail over STARTTLS, or plaintext when
//! `use_tls` is off, with optional authentication. Configuration comes from
//! [`opcode_server_config::SmtpConfig`]; the password stays a
//! `SecretString` until it is handed to lettre.

use lettre::{
	message::{header::ContentType, Mailbox, MultiPart, SinglePart},
	transport::smtp::authentication::Credentials,
	AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use opcode_server_config::SmtpConfig;

#[derive(Debug, thiserror::Error)]
pub enum SmtpError {
	#[error("connection failed: {0}")]
	Connection(String),

	#[error("send failed: {0}")]
	Send(String),

	#[error("invalid email address: {0}")]
	Address(String),
}

pub struct SmtpClient {
	transport: AsyncSmtpTransport<Tokio1Executor>,
	from_mailbox: Mailbox,
}

impl SmtpClient {
	/// Build the transport. No connection is made until the first send.
	///
	/// # Errors
	///
	/// Returns [`SmtpError::Address`] if the from address is invalid and
	/// [`SmtpError::Connection`] if the TLS relay cannot be set up.
	#[tracing::instrument(
		name = "smtp_client_new",
		skip(config),
		fields(host = %config.host, port = %config.port, use_tls = %config.use_tls)
	)]
	pub fn new(config: &SmtpConfig) -> Result<Self, SmtpError> {
		let from_mailbox = sender_mailbox(&config.from_name, &config.from_address)?;

		let builder = if config.use_tls {
			AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
				.map_err(|e| SmtpError::Connection(format!("{e}")))?
		} else {
			AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
		};

		let mut builder = builder.port(config.port);

		if let (Some(username), Some(password)) = (&config.username, &config.password) {
			let credentials = Credentials::new(username.clone(), password.expose().clone());
			builder = builder.credentials(credentials);
		}

		let transport = builder.build();

		tracing::debug!("SMTP client initialized");

		Ok(Self {
			transport,
			from_mailbox,
		})
	}

	/// Send a multipart email. The recipient's client picks which part to show.
	///
	/// # Errors
	///
	/// Returns [`SmtpError::Address`] if the recipient address is invalid and
	/// [`SmtpError::Send`] if the message cannot be built or delivered.
	#[tracing::instrument(
		name = "smtp_send_email",
		skip(self, body_html, body_text),
		fields(to = %to, subject = %subject)
	)]
	pub async fn send_email(
		&self,
		to: &str,
		subject: &str,
		body_html: &str,
		body_text: &str,
	) -> Result<(), SmtpError> {
		let message = build_message(&self.from_mailbox, to, subject, body_html, body_text)?;

		self
			.transport
			.send(message)
			.await
			.map_err(|e| SmtpError::Send(format!("{e}")))?;

		tracing::info!("email sent successfully");

		Ok(())
	}
}

fn sender_mailbox(name: &str, address: &str) -> Result<Mailbox, SmtpError> {
	format!("{name} <{address}>")
		.parse()
		.map_err(|e| SmtpError::Address(format!("{e}")))
}

fn build_message(
	from: &Mailbox,
	to: &str,
	subject: &str,
	body_html: &str,
	body_text: &str,
) -> Result<Message, SmtpError> {
	let to_mailbox: Mailbox = to.parse().map_err(|e| SmtpError::Address(format!("{e}")))?;

	Message::builder()
		.from(from.clone())
		.to(to_mailbox)
		.subject(subject)
		.multipart(
			MultiPart::alternative()
				.singlepart(
					SinglePart::builder()
						.header(ContentType::TEXT_PLAIN)
						.body(body_text.to_string()),
				)
				.singlepart(
					SinglePart::builder()
						.header(ContentType::TEXT_HTML)
						.body(body_html.to_string()),
				),
		)
		.map_err(|e| SmtpError::Send(format!("failed to build message: {e}")))
}
