use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::BggError;
use crate::parse::{BggPlay, PlaysPage, parse_plays_page};

pub const DEFAULT_BASE_URL: &str = "https://boardgamegeek.com";

/// Fixed pause between page requests.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(1);

/// Hard stop so a misreported `total` can't page forever.
const MAX_PAGES: u32 = 500;

/// User-Agent strings tried in order when BGG refuses a request.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "GameTaverns/1.0 (+https://gametaverns.com)",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

/// Connection settings for the BGG client.
#[derive(Debug, Clone)]
pub struct BggConfig {
    pub base_url: String,
    pub page_delay: Duration,
    pub user_agents: Vec<String>,
    pub timeout: Duration,
}

impl Default for BggConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_delay: DEFAULT_PAGE_DELAY,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Anything that can produce a user's full play history.
///
/// The import engine depends on this instead of [`BggClient`] so it can run
/// against canned data.
#[async_trait]
pub trait PlaysSource: Send + Sync {
    async fn fetch_plays(&self, username: &str) -> Result<Vec<BggPlay>, BggError>;
}

/// HTTP client for `xmlapi2/plays`.
pub struct BggClient {
    client: reqwest::Client,
    config: BggConfig,
}

impl BggClient {
    pub fn new(config: BggConfig) -> Result<Self, BggError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config: BggConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
        })
    }

    pub fn config(&self) -> &BggConfig {
        &self.config
    }

    fn plays_url(&self, username: &str, page: u32) -> String {
        format!(
            "{}/xmlapi2/plays?username={}&page={page}",
            self.config.base_url,
            urlencoding::encode(username)
        )
    }

    /// Fetch one page, rotating through the configured User-Agents while BGG
    /// answers with a "blocked" status.
    pub async fn fetch_page(&self, username: &str, page: u32) -> Result<PlaysPage, BggError> {
        let url = self.plays_url(username, page);
        let agents = &self.config.user_agents;
        let attempts = agents.len().max(1);

        for attempt in 0..attempts {
            let mut req = self.client.get(&url);
            if let Some(agent) = agents.get(attempt) {
                req = req.header(reqwest::header::USER_AGENT, agent.as_str());
            }
            let resp = req.send().await?;
            let status = resp.status();

            if is_blocked(status) {
                warn!(
                    "BGG page {page} attempt {}/{attempts} blocked (HTTP {status}), rotating user agent",
                    attempt + 1
                );
                continue;
            }
            if !status.is_success() {
                return Err(BggError::Status(status.as_u16()));
            }

            let body = resp.text().await?;
            return parse_plays_page(&body);
        }

        Err(BggError::Blocked { attempts })
    }

    /// Fetch pages sequentially until the declared total is reached or a page
    /// comes back empty, pausing between requests.
    pub async fn fetch_all_plays(&self, username: &str) -> Result<Vec<BggPlay>, BggError> {
        let mut plays = Vec::new();
        let mut page = 1;

        loop {
            if page > 1 {
                tokio::time::sleep(self.config.page_delay).await;
            }
            let fetched = self.fetch_page(username, page).await?;
            info!(
                username,
                page,
                total = fetched.total,
                count = fetched.plays.len(),
                "fetched BGG plays page"
            );

            let empty = fetched.plays.is_empty();
            plays.extend(fetched.plays);
            if empty || plays.len() >= fetched.total as usize {
                break;
            }
            if page >= MAX_PAGES {
                warn!(username, "stopping BGG fetch after {MAX_PAGES} pages");
                break;
            }
            page += 1;
        }

        debug!(username, plays = plays.len(), "BGG fetch complete");
        Ok(plays)
    }
}

#[async_trait]
impl PlaysSource for BggClient {
    async fn fetch_plays(&self, username: &str) -> Result<Vec<BggPlay>, BggError> {
        self.fetch_all_plays(username).await
    }
}

/// Statuses BGG uses when it throttles or queues a request.
fn is_blocked(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::ACCEPTED
            | StatusCode::FORBIDDEN
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::{
        Router,
        extract::{Query, State},
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::get,
    };

    type Seen = Arc<Mutex<Vec<(String, String)>>>;

    fn play_xml(id: &str) -> String {
        format!(
            r#"<play id="{id}" date="2024-01-01" quantity="1"><item name="Azul" objectid="230802"/></play>"#
        )
    }

    fn page_xml(total: u32, page: u32, ids: &[&str]) -> String {
        let plays: String = ids.iter().map(|id| play_xml(id)).collect();
        format!(r#"<plays username="u" total="{total}" page="{page}">{plays}</plays>"#)
    }

    async fn spawn(app: Router) -> Option<String> {
        let listener = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
            Ok(l) => l,
            Err(e) => {
                eprintln!("skipping BGG client test (cannot bind): {e}");
                return None;
            }
        };
        let addr = listener.local_addr().ok()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Some(format!("http://{addr}"))
    }

    fn test_config(base_url: String, agents: &[&str]) -> BggConfig {
        BggConfig {
            base_url,
            page_delay: Duration::from_millis(1),
            user_agents: agents.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(5),
        }
    }

    fn record(seen: &Seen, q: &HashMap<String, String>, headers: &HeaderMap) {
        let page = q.get("page").cloned().unwrap_or_default();
        let ua = headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        seen.lock().unwrap().push((page, ua));
    }

    #[tokio::test]
    async fn pages_until_total_reached() {
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route(
                "/xmlapi2/plays",
                get(
                    |State(seen): State<Seen>,
                     Query(q): Query<HashMap<String, String>>,
                     headers: HeaderMap| async move {
                        record(&seen, &q, &headers);
                        match q.get("page").map(String::as_str) {
                            Some("1") => page_xml(3, 1, &["1", "2"]),
                            _ => page_xml(3, 2, &["3"]),
                        }
                    },
                ),
            )
            .with_state(seen.clone());
        let Some(base) = spawn(app).await else { return };

        let client = BggClient::new(test_config(base, &["ua-a"])).unwrap();
        let plays = client.fetch_plays("some user").await.unwrap();
        let ids: Vec<_> = plays.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);

        let seen = seen.lock().unwrap();
        let pages: Vec<_> = seen.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(pages, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn stops_on_empty_page() {
        let app = Router::new().route(
            "/xmlapi2/plays",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                match q.get("page").map(String::as_str) {
                    Some("1") => page_xml(10, 1, &["1"]),
                    _ => page_xml(10, 2, &[]),
                }
            }),
        );
        let Some(base) = spawn(app).await else { return };

        let client = BggClient::new(test_config(base, &["ua-a"])).unwrap();
        let plays = client.fetch_plays("u").await.unwrap();
        assert_eq!(plays.len(), 1);
    }

    #[tokio::test]
    async fn rotates_user_agent_when_blocked() {
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route(
                "/xmlapi2/plays",
                get(
                    |State(seen): State<Seen>,
                     Query(q): Query<HashMap<String, String>>,
                     headers: HeaderMap| async move {
                        record(&seen, &q, &headers);
                        let ua = headers
                            .get("user-agent")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default();
                        if ua == "ua-good" {
                            (AxumStatus::OK, page_xml(1, 1, &["77"]))
                        } else {
                            (AxumStatus::FORBIDDEN, String::new())
                        }
                    },
                ),
            )
            .with_state(seen.clone());
        let Some(base) = spawn(app).await else { return };

        let client = BggClient::new(test_config(base, &["ua-bad", "ua-good"])).unwrap();
        let page = client.fetch_page("u", 1).await.unwrap();
        assert_eq!(page.plays[0].id, "77");

        let seen = seen.lock().unwrap();
        let agents: Vec<_> = seen.iter().map(|(_, ua)| ua.as_str()).collect();
        assert_eq!(agents, vec!["ua-bad", "ua-good"]);
    }

    #[tokio::test]
    async fn blocked_after_all_agents() {
        let app = Router::new().route(
            "/xmlapi2/plays",
            get(|| async { (AxumStatus::TOO_MANY_REQUESTS, "slow down") }),
        );
        let Some(base) = spawn(app).await else { return };

        let client = BggClient::new(test_config(base, &["a", "b", "c"])).unwrap();
        let err = client.fetch_plays("u").await.unwrap_err();
        assert!(matches!(err, BggError::Blocked { attempts: 3 }));
    }

    #[tokio::test]
    async fn other_status_is_not_retried() {
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route(
                "/xmlapi2/plays",
                get(
                    |State(seen): State<Seen>,
                     Query(q): Query<HashMap<String, String>>,
                     headers: HeaderMap| async move {
                        record(&seen, &q, &headers);
                        AxumStatus::INTERNAL_SERVER_ERROR
                    },
                ),
            )
            .with_state(seen.clone());
        let Some(base) = spawn(app).await else { return };

        let client = BggClient::new(test_config(base, &["a", "b"])).unwrap();
        let err = client.fetch_page("u", 1).await.unwrap_err();
        assert!(matches!(err, BggError::Status(500)));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn username_is_url_encoded() {
        let client = BggClient::new(BggConfig {
            base_url: "http://bgg.test/".into(),
            ..BggConfig::default()
        })
        .unwrap();
        assert_eq!(
            client.plays_url("tom & jerry", 2),
            "http://bgg.test/xmlapi2/plays?username=tom%20%26%20jerry&page=2"
        );
    }
}
