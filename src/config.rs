use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Empty host disables SMTP; the mailer then only logs outgoing mail.
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Absolute prefix for the links embedded in outgoing email.
    pub base_url: String,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let base_url = std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into());
        let mail = MailConfig {
            smtp_host: std::env::var("SMTP_HOST").unwrap_or_default(),
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            smtp_username: std::env::var("SMTP_USERNAME").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            from: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "Chattings <no-reply@chattings.com>".into()),
        };
        Ok(Self {
            database_url,
            base_url,
            mail,
        })
    }
}
