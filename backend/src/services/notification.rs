//! Alert mail notification service
//!
//! Supports:
//! - Recipient lookup (active administrators and staff with a valid email)
//! - Pluggable mail transport (HTTP mail API or log-only)
//! - Best-effort delivery: one failed recipient never blocks the others

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::{validate_email, Alert, AlertClassification};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::config::MailConfig;
use crate::error::AppResult;

/// A single outgoing mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivers mail to one recipient
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), String>;
}

/// Mail transport backed by an HTTP mail API
pub struct HttpMailTransport {
    endpoint: String,
    api_key: String,
    from: String,
    http_client: reqwest::Client,
}

/// Mail API request body
#[derive(Debug, Serialize)]
struct MailApiRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Mail API error body
#[derive(Debug, Deserialize)]
struct MailApiResponse {
    #[serde(default)]
    message: Option<String>,
}

impl HttpMailTransport {
    /// Create a new HTTP mail transport
    pub fn new(endpoint: String, api_key: String, from: String) -> Self {
        Self {
            endpoint,
            api_key,
            from,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MailTransport for HttpMailTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), String> {
        let request = MailApiRequest {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Failed to reach mail API: {}", e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let error: MailApiResponse = response
                .json()
                .await
                .unwrap_or(MailApiResponse { message: None });
            Err(error
                .message
                .unwrap_or_else(|| format!("Mail API returned status {}", status)))
        }
    }
}

/// Transport that only logs mail, used when no mail endpoint is configured
pub struct LogMailTransport;

#[async_trait]
impl MailTransport for LogMailTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), String> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "Alert mail (log transport)"
        );
        Ok(())
    }
}

/// A user who receives stock alert mail
#[derive(Debug, Clone, FromRow)]
pub struct AlertRecipient {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Alert details needed to compose the mail
#[derive(Debug, Clone)]
pub struct AlertNotice {
    pub alert_id: Uuid,
    pub classification: AlertClassification,
    pub product_name: String,
    pub sku: String,
    pub message: String,
}

impl AlertNotice {
    pub fn new(alert: &Alert, product_name: &str, sku: &str) -> Self {
        Self {
            alert_id: alert.id,
            classification: alert.classification,
            product_name: product_name.to_string(),
            sku: sku.to_string(),
            message: alert.message.clone(),
        }
    }

    /// Compose the mail for one recipient
    pub fn to_mail(&self, recipient: &AlertRecipient) -> MailMessage {
        MailMessage {
            to: recipient.email.clone(),
            subject: format!(
                "[Stockroom] {}: {} ({})",
                self.classification.label(),
                self.product_name,
                self.sku
            ),
            body: format!(
                "Hello {},\n\n{}\n\nAlert reference: {}\n",
                recipient.name, self.message, self.alert_id
            ),
        }
    }
}

/// Outcome of dispatching one alert
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
    pub timed_out: bool,
}

/// Notification service for alert mail
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
    transport: Arc<dyn MailTransport>,
    timeout: Duration,
}

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(db: PgPool, transport: Arc<dyn MailTransport>, timeout: Duration) -> Self {
        Self {
            db,
            transport,
            timeout,
        }
    }

    /// Build the service from mail configuration
    pub fn from_config(db: PgPool, config: &MailConfig) -> Self {
        let transport: Arc<dyn MailTransport> = if config.endpoint.trim().is_empty() {
            tracing::warn!("No mail endpoint configured, alert mail will only be logged");
            Arc::new(LogMailTransport)
        } else {
            Arc::new(HttpMailTransport::new(
                config.endpoint.clone(),
                config.api_key.clone(),
                config.from.clone(),
            ))
        };

        Self::new(db, transport, Duration::from_secs(config.timeout_secs))
    }

    /// Active administrators and staff with a valid email address
    pub async fn recipients(&self) -> AppResult<Vec<AlertRecipient>> {
        let users = sqlx::query_as::<_, AlertRecipient>(
            r#"
            SELECT id, name, email
            FROM users
            WHERE is_active = TRUE
              AND role IN ('admin', 'staff')
              AND email IS NOT NULL
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(filter_recipients(users))
    }

    /// Mail every recipient about an alert.
    ///
    /// Never fails: lookup and delivery errors are logged and reported.
    pub async fn notify_alert(&self, notice: &AlertNotice) -> DeliveryReport {
        let recipients = match self.recipients().await {
            Ok(recipients) => recipients,
            Err(e) => {
                tracing::error!(alert_id = %notice.alert_id, "Failed to load alert recipients: {}", e);
                return DeliveryReport::default();
            }
        };

        if recipients.is_empty() {
            tracing::warn!(alert_id = %notice.alert_id, "No recipients for alert mail");
            return DeliveryReport::default();
        }

        dispatch_with_timeout(self.transport.as_ref(), &recipients, notice, self.timeout).await
    }
}

/// Drop recipients whose address would be rejected by the transport
pub fn filter_recipients(users: Vec<AlertRecipient>) -> Vec<AlertRecipient> {
    users
        .into_iter()
        .filter(|u| validate_email(&u.email).is_ok())
        .collect()
}

/// Send one mail per recipient, continuing past failures
pub async fn deliver(
    transport: &dyn MailTransport,
    recipients: &[AlertRecipient],
    notice: &AlertNotice,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    for recipient in recipients {
        let mail = notice.to_mail(recipient);
        match transport.send(&mail).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                tracing::warn!(
                    alert_id = %notice.alert_id,
                    recipient = %recipient.email,
                    "Failed to send alert mail: {}",
                    e
                );
                report.failed += 1;
            }
        }
    }

    report
}

/// [`deliver`] bounded by `timeout`; undelivered recipients count as failed
pub async fn dispatch_with_timeout(
    transport: &dyn MailTransport,
    recipients: &[AlertRecipient],
    notice: &AlertNotice,
    timeout: Duration,
) -> DeliveryReport {
    match tokio::time::timeout(timeout, deliver(transport, recipients, notice)).await {
        Ok(report) => {
            tracing::info!(
                alert_id = %notice.alert_id,
                sent = report.sent,
                failed = report.failed,
                "Alert mail dispatched"
            );
            report
        }
        Err(_) => {
            tracing::warn!(
                alert_id = %notice.alert_id,
                timeout_ms = timeout.as_millis() as u64,
                "Alert mail dispatch timed out"
            );
            DeliveryReport {
                sent: 0,
                failed: recipients.len(),
                timed_out: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records mail and fails for configured addresses
    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<MailMessage>>,
        failing: Vec<String>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn send(&self, message: &MailMessage) -> Result<(), String> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.contains(&message.to) {
                return Err("mailbox unavailable".to_string());
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn recipient(name: &str, email: &str) -> AlertRecipient {
        AlertRecipient {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    fn notice() -> AlertNotice {
        AlertNotice {
            alert_id: Uuid::new_v4(),
            classification: AlertClassification::OutOfStock,
            product_name: "Widget".to_string(),
            sku: "WID-001".to_string(),
            message: "Out of stock: Widget (WID-001) has no stock left".to_string(),
        }
    }

    #[tokio::test]
    async fn test_one_mail_per_recipient() {
        let transport = RecordingTransport::default();
        let recipients = vec![
            recipient("Ana", "ana@example.com"),
            recipient("Ben", "ben@example.com"),
        ];

        let report = deliver(&transport, &recipients, &notice()).await;

        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 0);
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].to, "ana@example.com");
        assert_eq!(sent[0].subject, "[Stockroom] Out of stock: Widget (WID-001)");
        assert!(sent[1].body.starts_with("Hello Ben,"));
    }

    #[tokio::test]
    async fn test_failure_does_not_block_other_recipients() {
        let transport = RecordingTransport {
            failing: vec!["ana@example.com".to_string()],
            ..Default::default()
        };
        let recipients = vec![
            recipient("Ana", "ana@example.com"),
            recipient("Ben", "ben@example.com"),
        ];

        let report = deliver(&transport, &recipients, &notice()).await;

        assert_eq!(report, DeliveryReport { sent: 1, failed: 1, timed_out: false });
        assert_eq!(transport.sent.lock().unwrap()[0].to, "ben@example.com");
    }

    #[tokio::test]
    async fn test_dispatch_times_out() {
        let transport = RecordingTransport {
            delay: Some(Duration::from_millis(200)),
            ..Default::default()
        };
        let recipients = vec![recipient("Ana", "ana@example.com")];

        let report =
            dispatch_with_timeout(&transport, &recipients, &notice(), Duration::from_millis(10))
                .await;

        assert!(report.timed_out);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn test_invalid_addresses_are_filtered() {
        let filtered = filter_recipients(vec![
            recipient("Ana", "ana@example.com"),
            recipient("Bad", "not-an-address"),
        ]);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "Ana");
    }

    #[test]
    fn test_log_transport_never_fails() {
        let mail = notice().to_mail(&recipient("Ana", "ana@example.com"));
        assert!(tokio_test::block_on(LogMailTransport.send(&mail)).is_ok());
    }
}
