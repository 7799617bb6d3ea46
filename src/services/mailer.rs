use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailBody {
    /// Provider-side template rendered with the given variables.
    Template {
        id: String,
        data: BTreeMap<String, String>,
    },
    Content { text: String, html: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: EmailBody,
}

impl EmailMessage {
    /// Looks up a link either in the template variables or the plain-text body.
    pub fn link(&self) -> Option<String> {
        match &self.body {
            EmailBody::Template { data, .. } => data
                .values()
                .find(|value| value.starts_with("http"))
                .cloned(),
            EmailBody::Content { text, .. } => text
                .split_whitespace()
                .find(|word| word.starts_with("http"))
                .map(|word| word.trim_end_matches('.').to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("mail request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// SendGrid v3 `mail/send` client.
pub struct SendGridMailer {
    client: Client,
    api_key: String,
    api_url: String,
    from: String,
}

impl SendGridMailer {
    pub fn new(api_key: String, api_url: String, from: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            from,
        }
    }

    fn payload(&self, message: &EmailMessage) -> Value {
        match &message.body {
            EmailBody::Template { id, data } => json!({
                "personalizations": [{
                    "to": [{ "email": message.to }],
                    "dynamic_template_data": data,
                }],
                "from": { "email": self.from },
                "subject": message.subject,
                "template_id": id,
            }),
            EmailBody::Content { text, html } => {
                let mut content = vec![json!({ "type": "text/plain", "value": text })];
                if let Some(html) = html {
                    content.push(json!({ "type": "text/html", "value": html }));
                }
                json!({
                    "personalizations": [{ "to": [{ "email": message.to }] }],
                    "from": { "email": self.from },
                    "subject": message.subject,
                    "content": content,
                })
            }
        }
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let url = format!("{}/v3/mail/send", self.api_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.payload(message))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("SendGrid rejected email to {}: {} {}", message.to, status, body);
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!("Email '{}' sent to {}", message.subject, message.to);
        Ok(())
    }
}

/// Used when no provider key is configured; the message only reaches the logs.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        tracing::warn!(
            to = %message.to,
            subject = %message.subject,
            link = ?message.link(),
            "SENDGRID_API_KEY not set, email not delivered"
        );
        Ok(())
    }
}

pub fn from_config(config: &Config) -> Arc<dyn Mailer> {
    match &config.sendgrid_api_key {
        Some(key) => Arc::new(SendGridMailer::new(
            key.clone(),
            config.sendgrid_api_url.clone(),
            config.from_email.clone(),
        )),
        None => Arc::new(LogMailer),
    }
}

pub fn confirmation_email(config: &Config, to: &str, username: &str, raw_token: &str) -> EmailMessage {
    let url = format!("{}/confirm-email/{}", config.frontend_url, raw_token);
    let body = match &config.confirmation_template_id {
        Some(id) => EmailBody::Template {
            id: id.clone(),
            data: BTreeMap::from([
                ("confirmationUrl".to_string(), url),
                ("username".to_string(), username.to_string()),
            ]),
        },
        None => EmailBody::Content {
            text: format!(
                "Hello {},\n\nPlease confirm your email address by visiting {}\n\nThis link expires in 24 hours.",
                username, url
            ),
            html: Some(format!(
                "<p>Hello {},</p><p>Please <a href=\"{}\">confirm your email address</a>.</p><p>This link expires in 24 hours.</p>",
                username, url
            )),
        },
    };

    EmailMessage {
        to: to.to_string(),
        subject: "Confirm Your Email".to_string(),
        body,
    }
}

pub fn password_reset_email(config: &Config, to: &str, username: &str, raw_token: &str) -> EmailMessage {
    let url = format!("{}/reset-password/{}", config.frontend_url, raw_token);
    let body = match &config.reset_template_id {
        Some(id) => EmailBody::Template {
            id: id.clone(),
            data: BTreeMap::from([
                ("recipient_name".to_string(), username.to_string()),
                ("reset_password_link".to_string(), url),
            ]),
        },
        None => EmailBody::Content {
            text: format!(
                "Hello {},\n\nYou requested a password reset. Please visit {} to reset your password.\n\nIf you didn't request this, please ignore this email.",
                username, url
            ),
            html: Some(format!(
                "<p>Hello {},</p><p>You requested a password reset. Please click <a href=\"{}\">here</a> to reset your password.</p><p>If you didn't request this, please ignore this email.</p>",
                username, url
            )),
        },
    };

    EmailMessage {
        to: to.to_string(),
        subject: "Password Reset Request".to_string(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_config;

    #[test]
    fn confirmation_email_uses_template_when_configured() {
        let config = test_config();
        let message = confirmation_email(&config, "a@example.com", "alice", "abc123");

        assert_eq!(message.subject, "Confirm Your Email");
        assert_eq!(
            message.link().as_deref(),
            Some("http://localhost:5173/confirm-email/abc123")
        );
        assert!(matches!(message.body, EmailBody::Template { .. }));
    }

    #[test]
    fn reset_email_falls_back_to_text_and_html() {
        let mut config = test_config();
        config.reset_template_id = None;
        let message = password_reset_email(&config, "a@example.com", "alice", "tok");

        match &message.body {
            EmailBody::Content { text, html } => {
                assert!(text.contains("Hello alice"));
                assert!(html.as_deref().unwrap().contains("/reset-password/tok"));
            }
            other => panic!("expected plain content, got {:?}", other),
        }
        assert_eq!(
            message.link().as_deref(),
            Some("http://localhost:5173/reset-password/tok")
        );
    }

    #[test]
    fn payload_shapes_match_sendgrid_api() {
        let mailer = SendGridMailer::new("key".into(), "http://mail".into(), "from@x.io".into());
        let message = confirmation_email(&test_config(), "to@x.io", "bob", "t");

        let payload = mailer.payload(&message);
        assert_eq!(payload["personalizations"][0]["to"][0]["email"], "to@x.io");
        assert_eq!(payload["from"]["email"], "from@x.io");
        assert_eq!(payload["template_id"], "tmpl-confirm");
        assert_eq!(payload["personalizations"][0]["dynamic_template_data"]["username"], "bob");
    }
}
