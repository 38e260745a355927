use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use gametaverns_api::*;

use crate::error::ClientError;
use crate::retry::{RetryConfig, retry_post};

type Result<T> = std::result::Result<T, ClientError>;

/// Per-request ceiling for a play import. Large BGG histories are paged
/// server-side with a delay between pages, so this is far above the
/// client-wide timeout.
const IMPORT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Typed HTTP client for a GameTaverns server.
///
/// REST endpoints live under `/api`; the import and contact form are served
/// under `/functions/v1` and answer with a `success` flag in the body.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    import_retry: RetryConfig,
}

impl ApiClient {
    /// Create a new client with the given base URL and timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create from an existing `reqwest::Client` (e.g. shared in tests).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            import_retry: RetryConfig::default().with_timeout(IMPORT_TIMEOUT),
        }
    }

    pub fn set_api_key(&mut self, key: String) {
        self.api_key = Some(key);
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn function_url(&self, name: &str) -> String {
        format!("{}/functions/v1/{}", self.base_url, name)
    }

    fn key_or_err(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or(ClientError::MissingApiKey)
    }

    async fn get_public<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let mut req = self.client.get(self.url(path));
        if let Some(key) = self.api_key.as_deref() {
            req = req.bearer_auth(key);
        }
        parse_response(req.send().await?).await
    }

    async fn get_authed<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let key = self.key_or_err()?;
        let resp = self.client.get(self.url(path)).bearer_auth(key).send().await?;
        parse_response(resp).await
    }

    async fn post_authed<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let key = self.key_or_err()?;
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(key)
            .json(body)
            .send()
            .await?;
        parse_response(resp).await
    }

    // ── Health / auth ─────────────────────────────────────────────────────

    pub async fn health(&self) -> Result<HealthResponse> {
        let resp = self.client.get(self.url("/health")).send().await?;
        parse_response(resp).await
    }

    pub async fn register(&self, display_name: &str) -> Result<RegisterResponse> {
        let resp = self
            .client
            .post(self.url("/register"))
            .json(&RegisterRequest {
                display_name: display_name.to_string(),
            })
            .send()
            .await?;
        parse_response(resp).await
    }

    pub async fn me(&self) -> Result<MeResponse> {
        self.get_authed("/auth/me").await
    }

    // ── Libraries & games ─────────────────────────────────────────────────

    pub async fn public_libraries(&self) -> Result<ListLibrariesResponse> {
        self.get_public("/libraries").await
    }

    pub async fn my_libraries(&self) -> Result<ListLibrariesResponse> {
        self.get_authed("/libraries/mine").await
    }

    pub async fn library_by_slug(&self, slug: &str) -> Result<LibraryResponse> {
        self.get_public(&format!("/libraries/by-slug/{slug}")).await
    }

    pub async fn create_library(&self, req: &CreateLibraryRequest) -> Result<LibraryResponse> {
        self.post_authed("/libraries", req).await
    }

    pub async fn list_games(&self, library_id: &str) -> Result<ListGamesResponse> {
        self.get_public(&format!("/libraries/{library_id}/games")).await
    }

    pub async fn create_game(
        &self,
        library_id: &str,
        req: &CreateGameRequest,
    ) -> Result<GameResponse> {
        self.post_authed(&format!("/libraries/{library_id}/games"), req)
            .await
    }

    pub async fn list_sessions(
        &self,
        library_id: &str,
        limit: Option<u32>,
    ) -> Result<ListSessionsResponse> {
        let path = match limit {
            Some(limit) => format!("/libraries/{library_id}/sessions?limit={limit}"),
            None => format!("/libraries/{library_id}/sessions"),
        };
        self.get_public(&path).await
    }

    // ── Loans, trades, events, polls ──────────────────────────────────────

    pub async fn request_loan(&self, library_id: &str, req: &LoanRequest) -> Result<LoanResponse> {
        self.post_authed(&format!("/libraries/{library_id}/loans"), req)
            .await
    }

    pub async fn transition_loan(&self, loan_id: &str, action: LoanAction) -> Result<LoanResponse> {
        self.post_authed(
            &format!("/loans/{loan_id}/transition"),
            &LoanTransitionRequest { action },
        )
        .await
    }

    pub async fn trade_matches(&self) -> Result<TradeMatchesResponse> {
        self.get_authed("/trades/matches").await
    }

    pub async fn register_for_event(
        &self,
        event_id: &str,
        req: &EventRegistrationRequest,
    ) -> Result<RegistrationResponse> {
        let resp = self
            .client
            .post(self.url(&format!("/events/{event_id}/registrations")))
            .json(req)
            .send()
            .await?;
        parse_response(resp).await
    }

    pub async fn poll_results(&self, poll_id: &str) -> Result<PollResultsResponse> {
        self.get_public(&format!("/polls/{poll_id}/results")).await
    }

    // ── Functions ─────────────────────────────────────────────────────────

    /// Run a BGG play import. Re-running an import is harmless since plays
    /// already stored are skipped, so connection failures and 5xx are
    /// retried. A timeout is not: the server may still be importing.
    pub async fn import_plays(&self, req: &BggImportRequest) -> Result<BggImportResponse> {
        let key = self.key_or_err()?;
        let body = serde_json::to_value(req)?;
        let resp = retry_post(
            &self.client,
            &self.function_url("bgg-play-import"),
            Some(key),
            &body,
            &self.import_retry,
        )
        .await?;
        parse_response(resp).await
    }

    /// Send a contact message. Not retried: every attempt counts against the
    /// sender's hourly limit.
    pub async fn send_message(&self, req: &SendMessageRequest) -> Result<SendMessageResponse> {
        let resp = self
            .client
            .post(self.function_url("send-message"))
            .json(req)
            .send()
            .await?;
        parse_response(resp).await
    }
}

/// Return the deserialized body on 2xx, or the server's error message.
pub(crate) async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        return Err(ClientError::Api { status, message });
    }
    Ok(resp.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer one request with a canned status line and JSON body.
    async fn one_shot_server(status: &'static str, body: &'static str) -> String {
        delayed_server(Duration::ZERO, status, body).await
    }

    /// Like `one_shot_server`, but wait `delay` before answering.
    async fn delayed_server(delay: Duration, status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;
            tokio::time::sleep(delay).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn error_envelope_becomes_message() {
        let base = one_shot_server(
            "429 Too Many Requests",
            r#"{"success":false,"error":"too many messages, try again later"}"#,
        )
        .await;
        let client = ApiClient::new(&base, Duration::from_secs(5)).unwrap();
        let err = client
            .send_message(&SendMessageRequest {
                library_id: "lib".into(),
                game_id: None,
                sender_name: "Visitor".into(),
                sender_email: "v@example.com".into(),
                message: "hi".into(),
            })
            .await
            .unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(err.to_string(), "429 Too Many Requests: too many messages, try again later");
    }

    #[tokio::test]
    async fn authed_calls_need_a_key() {
        let client = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        assert!(matches!(client.me().await, Err(ClientError::MissingApiKey)));
    }

    #[tokio::test]
    async fn health_parses() {
        let base = one_shot_server("200 OK", r#"{"status":"ok","version":"0.1.0"}"#).await;
        let client = ApiClient::new(&format!("{base}/"), Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), base);
        let health = client.health().await.unwrap();
        assert_eq!(health.status, "ok");
    }

    #[tokio::test]
    async fn import_outlives_the_client_timeout() {
        let base = delayed_server(
            Duration::from_millis(600),
            "200 OK",
            r#"{"success":true,"imported":2,"updated":0,"skipped":0,"failed":0,"total_plays":2,"unmatched_games":[],"errors":[]}"#,
        )
        .await;
        let mut client = ApiClient::new(&base, Duration::from_millis(100)).unwrap();
        client.set_api_key("key".into());
        let report = client
            .import_plays(&BggImportRequest {
                bgg_username: "alice".into(),
                library_id: "lib".into(),
                update_existing: false,
            })
            .await
            .unwrap();
        assert_eq!(report.imported, 2);
    }
}
