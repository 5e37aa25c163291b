//! Failure webhook delivery.
//!
//! When a detached plugin run fails, the requester's chat platform is told
//! through the `responseCallback` URL it supplied with the request.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::info;

use crate::error::{DispatchError, Result};
use crate::report::failure_payload;

/// Sends a plugin failure back to the requester.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FailureNotifier: Send + Sync {
    /// POST the failure `output` to `callback_url`.
    async fn notify_failure(&self, callback_url: &str, output: &str) -> Result<()>;
}

/// JSON webhook notifier compatible with Slack `response_url`s.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
}

impl WebhookNotifier {
    /// Creates a notifier whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FailureNotifier for WebhookNotifier {
    async fn notify_failure(&self, callback_url: &str, output: &str) -> Result<()> {
        let url = Url::parse(callback_url.trim()).map_err(|e| {
            DispatchError::Notification(format!("Invalid callback URL '{}': {}", callback_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DispatchError::Notification(format!(
                "Unsupported callback URL scheme '{}'",
                url.scheme()
            )));
        }

        let response = self
            .client
            .post(url)
            .json(&failure_payload(output))
            .send()
            .await
            .map_err(|e| DispatchError::Notification(format!("Failed to call webhook: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Notification(format!(
                "Webhook returned HTTP {}: {}",
                status,
                body.trim()
            )));
        }

        info!("Failure notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Bytes, extract::State, http::HeaderMap, routing::post, Router};
    use std::sync::{Arc, Mutex};

    type Captured = Arc<Mutex<Vec<(Option<String>, String)>>>;

    async fn capture(State(captured): State<Captured>, headers: HeaderMap, body: Bytes) {
        let content_type = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        captured
            .lock()
            .unwrap()
            .push((content_type, String::from_utf8_lossy(&body).into_owned()));
    }

    async fn spawn_stub() -> (String, Captured) {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/hook", post(capture))
            .with_state(Arc::clone(&captured));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{}/hook", addr), captured)
    }

    #[tokio::test]
    async fn test_posts_json_payload() {
        let (url, captured) = spawn_stub().await;
        let notifier = WebhookNotifier::new(Duration::from_secs(5)).unwrap();

        notifier
            .notify_failure(&url, "ValueError: \"bad\"")
            .await
            .unwrap();

        let calls = captured.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.as_deref(), Some("application/json"));
        assert!(calls[0].1.contains(r#"ValueError: \"bad\""#));
        let parsed: serde_json::Value = serde_json::from_str(&calls[0].1).unwrap();
        assert!(parsed["text"].as_str().unwrap().contains("```"));
    }

    #[tokio::test]
    async fn test_invalid_url_is_notification_error() {
        let notifier = WebhookNotifier::new(Duration::from_secs(1)).unwrap();
        let result = notifier.notify_failure("not a url", "x").await;
        assert!(matches!(result, Err(DispatchError::Notification(_))));
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let notifier = WebhookNotifier::new(Duration::from_secs(1)).unwrap();
        let result = notifier.notify_failure("file:///etc/passwd", "x").await;
        assert!(matches!(result, Err(DispatchError::Notification(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let notifier = WebhookNotifier::new(Duration::from_secs(1)).unwrap();
        let result = notifier.notify_failure("http://127.0.0.1:1/hook", "x").await;
        assert!(matches!(result, Err(DispatchError::Notification(_))));
    }
}
