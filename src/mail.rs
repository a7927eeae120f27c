use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::config::MailConfig;

/// One outgoing message: the workflow layer supplies recipient, subject
/// and both bodies; delivery is fire-and-forget from its perspective.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub plain_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingEmail) -> anyhow::Result<()>;
}

/// Async SMTP transport. With no host configured it degrades to a no-op
/// that only logs, which keeps development and tests mail-server-free.
pub struct SmtpMailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| anyhow::anyhow!("invalid MAIL_FROM address: {e}"))?;

        let transport = if config.smtp_host.trim().is_empty() {
            warn!("SMTP host not configured; outgoing mail will only be logged");
            None
        } else {
            let mut builder =
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                    .port(config.smtp_port);
            if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password)
            {
                builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
            }
            Some(builder.build())
        };

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingEmail) -> anyhow::Result<()> {
        let Some(transport) = &self.transport else {
            info!(to = %mail.to, subject = %mail.subject, "mail transport disabled, dropping message");
            return Ok(());
        };

        let message = Message::builder()
            .from(self.from.clone())
            .to(mail.to.parse::<Mailbox>()?)
            .subject(&mail.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(mail.plain_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(mail.html_body),
                    ),
            )?;

        transport.send(message).await?;
        info!(to = %mail.to, subject = %mail.subject, "mail sent");
        Ok(())
    }
}

pub fn confirmation_email(base_url: &str, recipient: &str, token: &str) -> OutgoingEmail {
    let link = format!("{base_url}/auth/emailverification/{token}");
    let year = OffsetDateTime::now_utc().year();
    OutgoingEmail {
        to: recipient.to_owned(),
        subject: "Chattings: Confirm your email".to_owned(),
        html_body: format!(
            "<h1>Chattings: Email confirmation</h1>\n\
             <p>You see this email because someone used your email to registrate \
             on <a href=\"{base_url}\">chattings.com</a>, if it's not you just \
             ignore this message.</p>\n\
             <p>Follow this link to confirm your email address: \
             <a href=\"{link}\">confirm</a></p>\n\
             <p><a href=\"{base_url}\">chattings.com</a> | {year}</p>"
        ),
        plain_body: format!(
            "Chattings: Email confirmation\n\n\
             You see this email because someone used your email to registrate on \
             chattings.com, if it's not you just ignore this message.\n\n\
             Follow this link to confirm your email address: {link}\n\n\
             chattings.com | {year}"
        ),
    }
}

pub fn recovery_email(base_url: &str, recipient: &str, token: &str) -> OutgoingEmail {
    let link = format!("{base_url}/auth/password-recovery/{token}");
    let year = OffsetDateTime::now_utc().year();
    OutgoingEmail {
        to: recipient.to_owned(),
        subject: "Chattings: Recover your password".to_owned(),
        html_body: format!(
            "<h1>Chattings: Password Recovery</h1>\n\
             <p>You see this email because someone used your email to recover \
             password on <a href=\"{base_url}\">chattings.com</a>, if it's not \
             you just ignore this message.</p>\n\
             <p>Follow this link to continue password recovery: \
             <a href=\"{link}\">recover password</a></p>\n\
             <p><a href=\"{base_url}\">chattings.com</a> | {year}</p>"
        ),
        plain_body: format!(
            "Chattings: Password Recovery\n\n\
             You see this email because someone used your email to recover \
             password on chattings.com, if it's not you just ignore this \
             message.\n\n\
             Follow this link to continue password recovery: {link}\n\n\
             chattings.com | {year}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_email_embeds_token_link() {
        let mail = confirmation_email("http://localhost:8080", "temp2@mail.com", "abcDEF123");
        assert_eq!(mail.to, "temp2@mail.com");
        assert_eq!(mail.subject, "Chattings: Confirm your email");
        assert!(mail
            .html_body
            .contains("http://localhost:8080/auth/emailverification/abcDEF123"));
        assert!(mail
            .plain_body
            .contains("Follow this link to confirm your email address:"));
    }

    #[test]
    fn recovery_email_embeds_token_link() {
        let mail = recovery_email("http://localhost:8080", "temp2@mail.com", "abcDEF123");
        assert_eq!(mail.subject, "Chattings: Recover your password");
        assert!(mail
            .html_body
            .contains("http://localhost:8080/auth/password-recovery/abcDEF123"));
        assert!(mail.plain_body.contains("continue password recovery"));
    }

    #[tokio::test]
    async fn disabled_transport_drops_message() {
        let mailer = SmtpMailer::new(&MailConfig {
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            from: "Chattings <no-reply@chattings.com>".into(),
        })
        .expect("mailer builds without smtp host");

        let mail = confirmation_email("http://localhost:8080", "temp2@mail.com", "tok");
        mailer.send(mail).await.expect("no-op send succeeds");
    }
}
