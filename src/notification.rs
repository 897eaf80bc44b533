use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::configuration::MailSettings;
use crate::entity::{issue, user};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn issue_reported(reporter: &user::Model, issue: &issue::Model, site_name: &str) -> Self {
        Self {
            to: reporter.email.clone(),
            subject: format!("[{site_name}] Issue #{} received: {}", issue.id, issue.title),
            body: format!(
                "Hello {},\n\nWe have received your report \"{}\" and will keep you posted.\n\nPriority: {:?}\n\n{site_name}",
                reporter.username, issue.title, issue.priority,
            ),
        }
    }

    pub fn issue_resolved(reporter: &user::Model, issue: &issue::Model, resolver: &str, site_name: &str) -> Self {
        let resolved_on = issue
            .resolved_on
            .map(|date| date.to_string())
            .unwrap_or_else(|| "today".to_string());

        Self {
            to: reporter.email.clone(),
            subject: format!("[{site_name}] Issue #{} resolved: {}", issue.id, issue.title),
            body: format!(
                "Hello {},\n\nYour issue \"{}\" was marked resolved by {resolver} on {resolved_on}.\n\n{site_name}",
                reporter.username, issue.title,
            ),
        }
    }

    pub fn report_warning(user: &user::Model, report_count: i32, site_name: &str) -> Self {
        Self {
            to: user.email.clone(),
            subject: format!("[{site_name}] Your account has been reported"),
            body: format!(
                "Hello {},\n\nYour account has now been reported {report_count} times by other residents. \
                 Further reports will lower your reputation.\n\n{site_name}",
                user.username,
            ),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Posts notifications to a transactional mail API.
pub struct HttpMailer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(endpoint: String, api_key: Option<String>, from: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .context("failed to build mail http client")?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            from,
        })
    }
}

#[async_trait]
impl Notifier for HttpMailer {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        let payload = json!({
            "from": self.from,
            "to": notification.to,
            "subject": notification.subject,
            "text": notification.body,
        });

        let mut request = self.client.post(&self.endpoint).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        request
            .send()
            .await
            .context("mail api request failed")?
            .error_for_status()
            .context("mail api rejected the message")?;

        Ok(())
    }
}

/// Used when no mail API is configured.
pub struct LogMailer;

#[async_trait]
impl Notifier for LogMailer {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        tracing::info!(to = %notification.to, subject = %notification.subject, "mail api not configured; notification logged only");
        Ok(())
    }
}

/// Sends `notification`, logging instead of propagating any failure.
pub async fn deliver(notifier: &dyn Notifier, notification: Notification) {
    match notifier.send(&notification).await {
        Ok(()) => tracing::info!(to = %notification.to, subject = %notification.subject, "notification sent"),
        Err(err) => tracing::error!(to = %notification.to, error = %format!("{err:#}"), "failed to send notification"),
    }
}

pub fn build_notifier(settings: &MailSettings) -> anyhow::Result<Arc<dyn Notifier>> {
    match &settings.api_url {
        Some(url) => Ok(Arc::new(HttpMailer::new(
            url.clone(),
            settings.api_key.clone(),
            settings.from_email.clone(),
        )?)),
        None => Ok(Arc::new(LogMailer)),
    }
}
