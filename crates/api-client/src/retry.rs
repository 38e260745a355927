use std::time::Duration;

use tracing::warn;

use crate::error::ClientError;

/// Backoff schedule for idempotent POSTs. One retry per entry in `delays`.
///
/// `timeout` overrides the client-wide timeout for each attempt.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub delays: Vec<Duration>,
    pub timeout: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delays: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ],
            timeout: None,
        }
    }
}

impl RetryConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn max_attempts(&self) -> usize {
        self.delays.len() + 1
    }
}

/// POST `body` as JSON, retrying on connection errors and 5xx responses.
///
/// 2xx and 4xx come back immediately, and so does a timed-out attempt: the
/// server may still be working on it. After the last attempt the final 5xx
/// response (or connection error) is returned to the caller.
pub async fn retry_post(
    client: &reqwest::Client,
    url: &str,
    api_key: Option<&str>,
    body: &serde_json::Value,
    config: &RetryConfig,
) -> Result<reqwest::Response, ClientError> {
    let max_attempts = config.max_attempts();
    let mut attempt = 0;

    loop {
        let mut req = client.post(url).json(body);
        if let Some(key) = api_key {
            req = req.bearer_auth(key);
        }
        if let Some(timeout) = config.timeout {
            req = req.timeout(timeout);
        }

        let outcome = req.send().await;
        let Some(delay) = config.delays.get(attempt).copied() else {
            return Ok(outcome?);
        };
        match outcome {
            Ok(resp) if resp.status().is_server_error() => {
                warn!(
                    "POST attempt {}/{} failed (HTTP {}), retrying in {:?}",
                    attempt + 1,
                    max_attempts,
                    resp.status(),
                    delay,
                );
            }
            Ok(resp) => return Ok(resp),
            Err(e) if e.is_timeout() => return Err(e.into()),
            Err(e) => {
                warn!(
                    "POST attempt {}/{} failed ({e}), retrying in {:?}",
                    attempt + 1,
                    max_attempts,
                    delay,
                );
            }
        }
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `statuses` in order, one connection each, counting requests.
    async fn scripted_server(statuses: Vec<&'static str>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            for status in statuses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 4096];
                let _ = socket.read(&mut buf).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let response = format!(
                    "HTTP/1.1 {status}\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{{}}"
                );
                socket.write_all(response.as_bytes()).await.unwrap();
            }
        });
        (format!("http://{addr}/"), hits)
    }

    fn fast(retries: usize) -> RetryConfig {
        RetryConfig {
            delays: vec![Duration::from_millis(10); retries],
            timeout: None,
        }
    }

    #[tokio::test]
    async fn retries_server_errors_until_success() {
        let (url, hits) = scripted_server(vec!["503 Service Unavailable", "502 Bad Gateway", "200 OK"]).await;
        let client = reqwest::Client::new();
        let resp = retry_post(&client, &url, Some("key"), &serde_json::json!({}), &fast(3))
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (url, hits) = scripted_server(vec!["403 Forbidden"]).await;
        let client = reqwest::Client::new();
        let resp = retry_post(&client, &url, None, &serde_json::json!({}), &fast(3))
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn last_server_error_is_returned() {
        let (url, hits) = scripted_server(vec!["500 Internal Server Error", "500 Internal Server Error"]).await;
        let client = reqwest::Client::new();
        let resp = retry_post(&client, &url, None, &serde_json::json!({}), &fast(1))
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn timed_out_attempt_is_not_resent() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 4096];
                let _ = socket.read(&mut buf).await;
                counter.fetch_add(1, Ordering::SeqCst);
                // Never answer; keep the socket open.
                held.push(socket);
            }
        });

        let client = reqwest::Client::new();
        let config = fast(3).with_timeout(Duration::from_millis(200));
        let err = retry_post(&client, &format!("http://{addr}/"), None, &serde_json::json!({}), &config)
            .await
            .unwrap_err();
        match err {
            ClientError::Http(e) => assert!(e.is_timeout()),
            other => panic!("expected a timeout, got {other:?}"),
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
