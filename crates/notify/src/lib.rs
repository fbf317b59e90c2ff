use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use common::config::EmailConfig;
use common::{ChangeNotifier, Error, Result};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// SMTP change-notification collaborator. One plain-text message per
/// notification, to every configured recipient.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl Mailer {
    /// Build the transport from config. `mode = "ssl"` uses implicit TLS;
    /// anything else negotiates STARTTLS. Bad addresses or an empty
    /// recipient list are configuration errors.
    pub fn from_config(cfg: &EmailConfig) -> Result<Self> {
        let relay = if cfg.mode.eq_ignore_ascii_case("ssl") {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.smtp_host)
        }
        .map_err(|e| Error::Smtp(e.to_string()))?;

        let transport = relay
            .port(cfg.smtp_port)
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .timeout(Some(SEND_TIMEOUT))
            .build();

        let from: Mailbox = cfg
            .from_addr
            .parse()
            .map_err(|e| Error::Config(format!("invalid email.from_addr '{}': {e}", cfg.from_addr)))?;
        let to = cfg
            .to_addrs
            .iter()
            .map(|addr| {
                addr.parse().map_err(|e| {
                    Error::Config(format!("invalid email.to_addrs entry '{addr}': {e}"))
                })
            })
            .collect::<Result<Vec<Mailbox>>>()?;
        if to.is_empty() {
            return Err(Error::Config("email.to_addrs is empty".into()));
        }

        Ok(Self { transport, from, to })
    }
}

#[async_trait]
impl ChangeNotifier for Mailer {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }
        let message = builder
            .body(body.to_string())
            .map_err(|e| Error::Smtp(e.to_string()))?;

        debug!(subject = %subject, recipients = self.to.len(), "Sending change email");
        self.transport
            .send(message)
            .await
            .map_err(|e| Error::Smtp(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            username: "watcher".into(),
            password: "secret".into(),
            from_addr: "watcher@example.com".into(),
            to_addrs: vec!["ops@example.com".into()],
            ..EmailConfig::default()
        }
    }

    #[test]
    fn builds_for_both_tls_modes() {
        assert!(Mailer::from_config(&config()).is_ok());

        let mut ssl = config();
        ssl.mode = "ssl".into();
        ssl.smtp_port = 465;
        assert!(Mailer::from_config(&ssl).is_ok());
    }

    #[test]
    fn invalid_from_address_is_a_config_error() {
        let mut cfg = config();
        cfg.from_addr = "not an address".into();
        assert!(matches!(
            Mailer::from_config(&cfg),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn empty_recipient_list_is_a_config_error() {
        let mut cfg = config();
        cfg.to_addrs.clear();
        assert!(matches!(
            Mailer::from_config(&cfg),
            Err(Error::Config(_))
        ));
    }
}
