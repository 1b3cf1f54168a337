use crate::core::{EmailDispatcher, EmailMessage};
use crate::domain::model::DispatchReceipt;
use crate::utils::error::{ReportError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com";

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
}

/// Sends plain-text mail through the Resend HTTP API.
#[derive(Debug, Clone)]
pub struct ResendDispatcher {
    client: Client,
    emails_url: Url,
    api_key: String,
}

impl ResendDispatcher {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            emails_url: base.join("emails")?,
            api_key: api_key.to_string(),
        })
    }

    fn dispatch_error(message: impl Into<String>) -> ReportError {
        ReportError::DispatchError {
            message: message.into(),
        }
    }
}

#[async_trait]
impl EmailDispatcher for ResendDispatcher {
    async fn send(&self, message: &EmailMessage) -> Result<DispatchReceipt> {
        tracing::debug!(
            url = %self.emails_url,
            recipients = message.to.len(),
            subject = %message.subject,
            "Sending email via Resend"
        );

        let response = self
            .client
            .post(self.emails_url.clone())
            .bearer_auth(&self.api_key)
            .json(message)
            .send()
            .await
            .map_err(|e| Self::dispatch_error(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .map(str::to_string)
                        .unwrap_or_else(|| status.to_string())
                });
            tracing::warn!(status = %status, body = %body, "Resend rejected the email");
            return Err(Self::dispatch_error(reason));
        }

        let sent: SendResponse = response
            .json()
            .await
            .map_err(|e| Self::dispatch_error(format!("could not decode response: {}", e)))?;
        Ok(DispatchReceipt {
            message_id: sent.id,
        })
    }
}

/// Prints the message instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct ConsoleDispatcher;

#[async_trait]
impl EmailDispatcher for ConsoleDispatcher {
    async fn send(&self, message: &EmailMessage) -> Result<DispatchReceipt> {
        println!("From: {}", message.from);
        println!("To: {}", message.to.join(", "));
        println!("Subject: {}", message.subject);
        println!();
        println!("{}", message.text);
        Ok(DispatchReceipt::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emails_url() {
        let dispatcher =
            ResendDispatcher::new(DEFAULT_RESEND_API_URL, "re_123", Duration::from_secs(5)).unwrap();
        assert_eq!(dispatcher.emails_url.as_str(), "https://api.resend.com/emails");
    }

    #[test]
    fn test_console_dispatcher_has_no_message_id() {
        let message = EmailMessage {
            from: "summary@example.com".to_string(),
            to: vec!["kitchen@example.com".to_string()],
            subject: "Daily Order Summary - 2024-06-04".to_string(),
            text: "Jumla: 00".to_string(),
        };

        let receipt = tokio_test::block_on(ConsoleDispatcher.send(&message)).unwrap();
        assert_eq!(receipt, DispatchReceipt::default());
    }
}
