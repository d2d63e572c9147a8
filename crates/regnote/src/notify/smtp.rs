//! SMTP mailer.
//!
//! Defaults to submission on port 587 with STARTTLS required and LOGIN/PLAIN
//! authentication when credentials are configured.

use super::{Mailer, Notification};
use crate::config::{MailConfig, MailTls};
use crate::error::DispatchError;
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox, Message};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::debug;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build the transport. No connection is made until the first send.
    pub fn new(config: &MailConfig) -> Result<Self, DispatchError> {
        let from: Mailbox = config.from.parse()?;

        let tls = match config.tls {
            MailTls::None => Tls::None,
            mode => {
                let params = TlsParameters::builder(config.host.clone())
                    .dangerous_accept_invalid_certs(config.accept_invalid_certs)
                    .build()?;
                if mode == MailTls::Wrapper {
                    Tls::Wrapper(params)
                } else {
                    Tls::Required(params)
                }
            }
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.host.as_str())
            .port(config.port)
            .tls(tls);

        match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                builder = builder
                    .credentials(Credentials::new(username.clone(), password.clone()))
                    .authentication(vec![Mechanism::Login, Mechanism::Plain]);
            }
            (Some(username), None) => {
                return Err(DispatchError::Unavailable(format!(
                    "no password configured for SMTP user '{}'",
                    username
                )));
            }
            _ => {}
        }

        debug!(host = %config.host, port = config.port, tls = ?config.tls, "SMTP transport configured");

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    /// Assemble the MIME message for a notification.
    pub fn build_message(&self, notification: &Notification) -> Result<Message, DispatchError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(notification.subject.as_str());

        for address in &notification.to {
            builder = builder.to(address.parse::<Mailbox>()?);
        }
        for address in &notification.cc {
            builder = builder.cc(address.parse::<Mailbox>()?);
        }
        for address in &notification.bcc {
            builder = builder.bcc(address.parse::<Mailbox>()?);
        }

        Ok(builder
            .header(ContentType::TEXT_HTML)
            .body(notification.body.clone())?)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, notification: &Notification) -> Result<(), DispatchError> {
        let message = self.build_message(notification)?;
        self.transport.send(message).await?;
        Ok(())
    }
}
