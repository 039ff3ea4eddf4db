use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RunStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct WebhookPayload {
    pub(crate) project: String,
    pub(crate) date: String,
    pub(crate) status: RunStatus,
    pub(crate) deleted_files: Vec<String>,
}

/// Delivers the run status somewhere. Always yields a message to log,
/// never an error.
#[async_trait]
pub(crate) trait Notify: Send + Sync {
    async fn notify(&self, url: &str, payload: &WebhookPayload, disabled: bool) -> String;
}

pub(crate) struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub(crate) fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notify for WebhookNotifier {
    async fn notify(&self, url: &str, payload: &WebhookPayload, disabled: bool) -> String {
        if disabled {
            return "Notification disabled".to_string();
        }

        match self.client.post(url).json(payload).send().await {
            Ok(response) => format!("Webhook sent, status: {}", response.status().as_u16()),
            Err(e) => {
                tracing::warn!(url, error = %e, "webhook delivery failed");
                format!("Webhook failed: {}", e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn payload() -> WebhookPayload {
        WebhookPayload {
            project: "site".to_string(),
            date: "20240101-000000".to_string(),
            status: RunStatus::Failed,
            deleted_files: vec!["site-20231201-000000.tar.gz".to_string()],
        }
    }

    #[test]
    fn payload_serializes_with_expected_fields() {
        let json = serde_json::to_value(payload()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "project": "site",
                "date": "20240101-000000",
                "status": "failed",
                "deleted_files": ["site-20231201-000000.tar.gz"],
            })
        );
    }

    #[tokio::test]
    async fn disabled_skips_the_network() {
        let message = WebhookNotifier::new()
            .notify("http://127.0.0.1:1/unused", &payload(), true)
            .await;
        assert_eq!(message, "Notification disabled");
    }

    #[tokio::test]
    async fn transport_failure_becomes_a_message() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let message = WebhookNotifier::new()
            .notify(&format!("http://{}/hook", addr), &payload(), false)
            .await;
        assert!(message.starts_with("Webhook failed: "), "{}", message);
    }

    #[tokio::test]
    async fn posts_json_and_reports_status_code() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|line| {
                            let lower = line.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            socket
                .write_all(b"HTTP/1.1 202 Accepted\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await
                .unwrap();
            String::from_utf8(request).unwrap()
        });

        let message = WebhookNotifier::new()
            .notify(&format!("http://{}/hook", addr), &payload(), false)
            .await;
        assert_eq!(message, "Webhook sent, status: 202");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /hook "));
        assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
        assert!(request.contains("\"status\":\"failed\""));
    }
}
