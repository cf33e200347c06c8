//! Outbound email.
//!
//! The services only see the [`Mailer`] trait. [`SmtpMailer`] delivers through
//! lettre's async SMTP transport; [`LogMailer`] writes the message to the log
//! and is used whenever `mail.enabled` is false.

use std::sync::Arc;

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::header::ContentType,
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;
use tracing::info;

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(String),
}

/// A rendered plain-text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub subject: String,
    pub body: String,
}

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    /// Hands the message to the transport.
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] when the address is invalid or the transport
    /// refuses the message.
    async fn send(&self, to: &str, mail: &OutgoingMail) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };
        let mut builder = builder.port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, mail: &OutgoingMail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from_address.parse()?)
            .to(to.parse()?)
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport.send(message).await?;

        info!(to = to, subject = %mail.subject, "Email sent");
        Ok(())
    }
}

pub struct LogMailer;

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, mail: &OutgoingMail) -> Result<(), MailError> {
        info!(
            to = to,
            subject = %mail.subject,
            body = %mail.body,
            "Mail delivery disabled, logging message instead"
        );
        Ok(())
    }
}

/// Builds the mailer selected by `mail.enabled`.
pub fn build_mailer(config: &MailConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    if config.enabled {
        let mailer = SmtpMailer::new(config)
            .map_err(|e| anyhow::anyhow!("Failed to configure SMTP transport: {e}"))?;
        info!(host = %config.smtp_host, port = config.smtp_port, "SMTP mailer configured");
        Ok(Arc::new(mailer))
    } else {
        Ok(Arc::new(LogMailer))
    }
}

pub mod templates {
    use super::OutgoingMail;
    use crate::domain::BLOCK_THRESHOLD;

    #[must_use]
    pub fn occurrence_rejected(
        user_name: &str,
        occurrence_title: &str,
        justification: &str,
        account_blocked: bool,
    ) -> OutgoingMail {
        let mut body = format!(
            "Olá, {user_name}.\n\n\
             Sua ocorrência \"{occurrence_title}\" foi recusada pela equipe de moderação.\n\n\
             Justificativa: {justification}\n"
        );

        if account_blocked {
            body.push_str(&format!(
                "\nSua conta foi bloqueada por acumular {BLOCK_THRESHOLD} ocorrências recusadas. \
                 Entre em contato com a administração para solicitar o desbloqueio.\n"
            ));
        }

        body.push_str("\nAtenciosamente,\nEquipe SVCA\n");

        OutgoingMail {
            subject: "Sua ocorrência foi recusada".to_string(),
            body,
        }
    }

    #[must_use]
    pub fn password_reset(user_name: &str, link: &str, ttl_minutes: i64) -> OutgoingMail {
        OutgoingMail {
            subject: "Redefinição de senha".to_string(),
            body: format!(
                "Olá, {user_name}.\n\n\
                 Recebemos um pedido para redefinir a sua senha. Acesse o link abaixo para \
                 escolher uma nova senha:\n\n{link}\n\n\
                 O link expira em {ttl_minutes} minutos. Se você não fez este pedido, ignore \
                 esta mensagem.\n\nAtenciosamente,\nEquipe SVCA\n"
            ),
        }
    }
}
