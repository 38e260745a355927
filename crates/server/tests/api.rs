use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use gametaverns_bgg::{BggError, BggPlay, BggPlayer, PlaysSource};
use gametaverns_server::storage::{Db, open_in_memory};
use gametaverns_server::{AppConfig, AppState, app};

/// Serves a fixed list of plays and remembers which usernames were asked for.
#[derive(Default)]
struct FakePlays {
    plays: Vec<BggPlay>,
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl PlaysSource for FakePlays {
    async fn fetch_plays(&self, username: &str) -> Result<Vec<BggPlay>, BggError> {
        self.calls.lock().unwrap().push(username.to_string());
        Ok(self.plays.clone())
    }
}

struct TestApp {
    router: Router,
    db: Db,
}

impl TestApp {
    fn new(plays: Vec<BggPlay>) -> Self {
        Self::with_source(Arc::new(FakePlays {
            plays,
            ..Default::default()
        }))
    }

    fn with_source(bgg: Arc<dyn PlaysSource>) -> Self {
        let db = open_in_memory().unwrap();
        let state = AppState {
            db: db.clone(),
            config: AppConfig {
                ip_hash_salt: "test-salt".into(),
                ..Default::default()
            },
            bgg,
        };
        Self {
            router: app(state),
            db,
        }
    }

    /// Install a trigger that aborts writes matching `when` on `table`.
    fn reject(&self, event: &str, table: &str, when: &str) {
        self.db
            .conn()
            .execute_batch(&format!(
                "CREATE TRIGGER reject_write BEFORE {event} ON {table} WHEN {when}
                 BEGIN SELECT RAISE(ABORT, 'write rejected'); END;"
            ))
            .unwrap();
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        key: Option<&str>,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header("authorization", format!("Bearer {key}"));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str, key: Option<&str>) -> (StatusCode, Value) {
        self.send("GET", uri, key, None, &[]).await
    }

    async fn post(&self, uri: &str, key: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, key, Some(body), &[]).await
    }

    async fn register(&self, name: &str) -> String {
        let (status, body) = self
            .post("/api/register", None, json!({ "display_name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["api_key"].as_str().unwrap().to_string()
    }

    async fn library(&self, key: &str, slug: &str, public: bool) -> String {
        let (status, body) = self
            .post(
                "/api/libraries",
                Some(key),
                json!({ "slug": slug, "name": format!("{slug} library"), "is_public": public }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn game(&self, key: &str, library_id: &str, body: Value) -> String {
        let (status, body) = self
            .post(&format!("/api/libraries/{library_id}/games"), Some(key), body)
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

fn gloomhaven_play() -> BggPlay {
    let player = |name: &str, win: bool| BggPlayer {
        name: name.into(),
        win,
        ..Default::default()
    };
    BggPlay {
        id: "12345".into(),
        date: "2024-02-10".into(),
        quantity: 1,
        game_name: "Gloomhaven".into(),
        game_bgg_id: Some("174430".into()),
        players: vec![player("Alex", true), player("Sam", false)],
        ..Default::default()
    }
}

// ── Auth ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new(vec![]);
    let (status, body) = app.get("/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn first_user_is_admin_and_keys_authenticate() {
    let app = TestApp::new(vec![]);
    let first = app.register("alice").await;
    let second = app.register("bob").await;

    let (status, me) = app.get("/api/auth/me", Some(&first)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["display_name"], "alice");
    assert_eq!(me["is_admin"], true);

    let (_, me) = app.get("/api/auth/me", Some(&second)).await;
    assert_eq!(me["is_admin"], false);

    let (status, body) = app.get("/api/auth/me", Some("not-a-key")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app.get("/api/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post("/api/register", None, json!({ "display_name": "alice" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn only_the_owner_manages_a_library() {
    let app = TestApp::new(vec![]);
    let owner = app.register("owner").await;
    let other = app.register("other").await;
    let library_id = app.library(&owner, "tavern", true).await;

    let (status, _) = app
        .post(
            &format!("/api/libraries/{library_id}/games"),
            Some(&other),
            json!({ "title": "Azul" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get("/api/libraries/by-slug/tavern", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], library_id.as_str());

    let (status, _) = app
        .post("/api/libraries", Some(&other), json!({ "slug": "tavern", "name": "Copy" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn private_library_is_hidden_from_strangers() {
    let app = TestApp::new(vec![]);
    let owner = app.register("owner").await;
    let stranger = app.register("stranger").await;
    let library_id = app.library(&owner, "secret-stash", false).await;

    let uri = format!("/api/libraries/{library_id}");
    assert_eq!(app.get(&uri, Some(&owner)).await.0, StatusCode::OK);
    assert_eq!(app.get(&uri, Some(&stranger)).await.0, StatusCode::NOT_FOUND);
    assert_eq!(app.get(&uri, None).await.0, StatusCode::NOT_FOUND);

    let (_, listed) = app.get("/api/libraries", None).await;
    assert!(listed["libraries"].as_array().unwrap().is_empty());
}

// ── BGG import ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn bgg_import_creates_session_then_skips_duplicate() {
    let source = Arc::new(FakePlays {
        plays: vec![gloomhaven_play()],
        ..Default::default()
    });
    let app = TestApp::with_source(source.clone());
    let owner = app.register("owner").await;
    let library_id = app.library(&owner, "tavern", true).await;
    app.game(
        &owner,
        &library_id,
        json!({ "title": "Gloomhaven", "bgg_id": "174430" }),
    )
    .await;

    let request = json!({ "bgg_username": "alex_plays", "library_id": library_id });
    let (status, report) = app
        .post("/functions/v1/bgg-play-import", Some(&owner), request.clone())
        .await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["success"], true);
    assert_eq!(report["imported"], 1);
    assert_eq!(report["total_plays"], 1);

    let (_, sessions) = app
        .get(&format!("/api/libraries/{library_id}/sessions"), None)
        .await;
    let sessions = sessions["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["bgg_play_id"], "12345");
    assert_eq!(sessions[0]["game_title"], "Gloomhaven");
    assert_eq!(sessions[0]["players"].as_array().unwrap().len(), 2);

    let (status, report) = app
        .post("/functions/v1/bgg-play-import", Some(&owner), request)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["imported"], 0);
    assert_eq!(report["skipped"], 1);

    let (_, sessions) = app
        .get(&format!("/api/libraries/{library_id}/sessions"), None)
        .await;
    assert_eq!(sessions["sessions"].as_array().unwrap().len(), 1);
    assert_eq!(*source.calls.lock().unwrap(), vec!["alex_plays", "alex_plays"]);
}

#[tokio::test]
async fn bgg_import_requires_library_owner() {
    let app = TestApp::new(vec![gloomhaven_play()]);
    let owner = app.register("owner").await;
    let other = app.register("other").await;
    let library_id = app.library(&owner, "tavern", true).await;

    let request = json!({ "bgg_username": "alex_plays", "library_id": library_id });
    let (status, _) = app
        .post("/functions/v1/bgg-play-import", None, request.clone())
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post("/functions/v1/bgg-play-import", Some(&other), request)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn malformed_function_body_gets_error_envelope() {
    let app = TestApp::new(vec![]);
    let (status, body) = app
        .send(
            "POST",
            "/functions/v1/send-message",
            None,
            Some(json!({ "library_id": 7 })),
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn malformed_rest_body_gets_error_envelope() {
    let app = TestApp::new(vec![]);
    let owner = app.register("owner").await;

    let (status, body) = app
        .post("/api/libraries", Some(&owner), json!({ "slug": 7 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    let (status, body) = app
        .send(
            "POST",
            "/api/register",
            None,
            None,
            &[("content-type", "application/json")],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

// ── Messages ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sixth_message_from_same_ip_is_rate_limited() {
    let app = TestApp::new(vec![]);
    let owner = app.register("owner").await;
    let library_id = app.library(&owner, "tavern", true).await;

    let message = json!({
        "library_id": library_id,
        "sender_name": "Visitor",
        "sender_email": "Visitor@Example.com",
        "message": "Is Azul available this weekend?",
    });
    let from = [("x-forwarded-for", "203.0.113.9, 10.0.0.1")];

    for _ in 0..5 {
        let (status, body) = app
            .send("POST", "/functions/v1/send-message", None, Some(message.clone()), &from)
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["success"], true);
    }

    let (status, body) = app
        .send("POST", "/functions/v1/send-message", None, Some(message.clone()), &from)
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);

    // A different client is unaffected.
    let (status, _) = app
        .send(
            "POST",
            "/functions/v1/send-message",
            None,
            Some(message),
            &[("x-forwarded-for", "198.51.100.4")],
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, inbox) = app
        .get(&format!("/api/libraries/{library_id}/messages"), Some(&owner))
        .await;
    let messages = inbox["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 6);
    assert_eq!(messages[0]["sender_email"], "visitor@example.com");
    assert_eq!(messages[0]["is_read"], false);
}

// ── Loans ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn loan_lifecycle_and_illegal_transition() {
    let app = TestApp::new(vec![]);
    let owner = app.register("owner").await;
    let borrower = app.register("borrower").await;
    let library_id = app.library(&owner, "tavern", true).await;
    let game_id = app.game(&owner, &library_id, json!({ "title": "Azul" })).await;

    let (status, loan) = app
        .post(
            &format!("/api/libraries/{library_id}/loans"),
            Some(&borrower),
            json!({ "game_id": game_id }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{loan}");
    assert_eq!(loan["status"], "requested");
    let transition = format!("/api/loans/{}/transition", loan["id"].as_str().unwrap());

    // Borrower cannot approve their own request.
    let (status, _) = app
        .post(&transition, Some(&borrower), json!({ "action": "approve" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    for (action, expected) in [("approve", "approved"), ("activate", "active"), ("return", "returned")] {
        let (status, body) = app
            .post(&transition, Some(&owner), json!({ "action": action }))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["status"], expected);
    }

    let (status, body) = app
        .post(&transition, Some(&owner), json!({ "action": "activate" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (_, mine) = app.get("/api/loans/mine", Some(&borrower)).await;
    assert_eq!(mine["loans"][0]["status"], "returned");
}

#[tokio::test]
async fn loan_needs_a_free_copy() {
    let app = TestApp::new(vec![]);
    let owner = app.register("owner").await;
    let first = app.register("first").await;
    let second = app.register("second").await;
    let library_id = app.library(&owner, "tavern", true).await;
    let game_id = app.game(&owner, &library_id, json!({ "title": "Azul" })).await;
    let loans = format!("/api/libraries/{library_id}/loans");

    let (_, loan) = app
        .post(&loans, Some(&first), json!({ "game_id": game_id }))
        .await;
    let (status, _) = app
        .post(
            &format!("/api/loans/{}/transition", loan["id"].as_str().unwrap()),
            Some(&owner),
            json!({ "action": "approve" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(&loans, Some(&second), json!({ "game_id": game_id }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(&loans, Some(&owner), json!({ "game_id": game_id }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Trades ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn trade_matches_pair_wants_with_other_users_offers() {
    let app = TestApp::new(vec![]);
    let seller = app.register("seller").await;
    let buyer = app.register("buyer").await;
    let library_id = app.library(&seller, "shelf", true).await;
    let gloom = app
        .game(
            &seller,
            &library_id,
            json!({ "title": "Gloomhaven", "bgg_id": "174430", "is_for_trade": true }),
        )
        .await;
    let azul = app
        .game(&seller, &library_id, json!({ "title": "Azul", "is_for_trade": true }))
        .await;
    app.game(&seller, &library_id, json!({ "title": "Root" })).await;

    app.post(
        "/api/trades/wants",
        Some(&buyer),
        json!({ "title": "Gloomhaven (2nd printing)", "bgg_id": "174430" }),
    )
    .await;
    app.post("/api/trades/wants", Some(&buyer), json!({ "title": "  AZUL " }))
        .await;
    app.post("/api/trades/wants", Some(&buyer), json!({ "title": "Root" }))
        .await;

    let (status, body) = app.get("/api/trades/matches", Some(&buyer)).await;
    assert_eq!(status, StatusCode::OK);
    let mut matched: Vec<&str> = body["matches"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["game_id"].as_str().unwrap())
        .collect();
    matched.sort_unstable();
    let mut expected = vec![gloom.as_str(), azul.as_str()];
    expected.sort_unstable();
    assert_eq!(matched, expected);

    // Sellers never match against their own shelf.
    app.post("/api/trades/wants", Some(&seller), json!({ "title": "Azul" }))
        .await;
    let (_, body) = app.get("/api/trades/matches", Some(&seller)).await;
    assert!(body["matches"].as_array().unwrap().is_empty());
}

// ── Events ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_event_waitlists_and_promotes_on_cancel() {
    let app = TestApp::new(vec![]);
    let owner = app.register("owner").await;
    let library_id = app.library(&owner, "tavern", true).await;

    let (status, event) = app
        .post(
            &format!("/api/libraries/{library_id}/events"),
            Some(&owner),
            json!({ "title": "Game night", "event_date": "2024-06-01 19:00:00", "max_attendees": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{event}");
    let registrations = format!("/api/events/{}/registrations", event["id"].as_str().unwrap());

    let mut ids = Vec::new();
    for name in ["Ann", "Ben", "Cat", "Dan"] {
        let (status, body) = app
            .post(&registrations, None, json!({ "attendee_name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        ids.push((body["id"].as_str().unwrap().to_string(), body));
    }
    assert_eq!(ids[1].1["status"], "registered");
    assert_eq!(ids[2].1["status"], "waitlisted");
    assert_eq!(ids[2].1["waitlist_position"], 1);
    assert_eq!(ids[3].1["waitlist_position"], 2);

    let (status, _) = app
        .post(&registrations, None, json!({ "attendee_name": "Ann" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, cancelled) = app
        .send(
            "DELETE",
            &format!("{registrations}/{}", ids[0].0),
            Some(&owner),
            None,
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (_, list) = app.get(&registrations, Some(&owner)).await;
    let by_name = |name: &str| {
        list["registrations"]
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["attendee_name"] == name)
            .cloned()
            .unwrap()
    };
    assert_eq!(by_name("Cat")["status"], "registered");
    assert_eq!(by_name("Cat")["waitlist_position"], Value::Null);
    assert_eq!(by_name("Dan")["status"], "waitlisted");
    assert_eq!(by_name("Dan")["waitlist_position"], 1);

    // A cancelled attendee can sign up again and joins the back of the line.
    let (status, again) = app
        .post(&registrations, None, json!({ "attendee_name": "Ann" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{again}");
    assert_eq!(again["status"], "waitlisted");
    assert_eq!(again["waitlist_position"], 2);

    let (status, _) = app.get(&registrations, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── Polls ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn poll_votes_respect_limits_and_close() {
    let app = TestApp::new(vec![]);
    let owner = app.register("owner").await;
    let library_id = app.library(&owner, "tavern", true).await;

    let (status, poll) = app
        .post(
            &format!("/api/libraries/{library_id}/polls"),
            Some(&owner),
            json!({
                "title": "What next?",
                "max_votes_per_voter": 1,
                "options": [{ "label": "Azul" }, { "label": "Root" }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{poll}");
    let poll_id = poll["id"].as_str().unwrap();
    let azul = poll["options"][0]["id"].as_str().unwrap();
    let root = poll["options"][1]["id"].as_str().unwrap();
    let votes = format!("/api/polls/{poll_id}/votes");

    let (status, _) = app
        .post(&votes, None, json!({ "option_id": azul, "voter_id": "v1" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .post(&votes, None, json!({ "option_id": azul, "voter_id": "v1" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app
        .post(&votes, None, json!({ "option_id": root, "voter_id": "v1" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app
        .post(&votes, None, json!({ "option_id": root, "voter_id": "v2" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, results) = app.get(&format!("/api/polls/{poll_id}/results"), None).await;
    assert_eq!(results["total_votes"], 2);

    let close = format!("/api/polls/{poll_id}/close");
    assert_eq!(app.post(&close, Some(&owner), json!({})).await.0, StatusCode::OK);
    assert_eq!(
        app.post(&close, Some(&owner), json!({})).await.0,
        StatusCode::CONFLICT
    );
    let (status, _) = app
        .post(&votes, None, json!({ "option_id": azul, "voter_id": "v3" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// ── Tournaments ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn match_result_updates_standings_once() {
    let app = TestApp::new(vec![]);
    let owner = app.register("owner").await;
    let library_id = app.library(&owner, "tavern", true).await;

    let (status, tournament) = app
        .post(
            &format!("/api/libraries/{library_id}/tournaments"),
            Some(&owner),
            json!({
                "name": "Spring cup",
                "players": [
                    { "player_name": "Ann", "seed": 1 },
                    { "player_name": "Ben", "seed": 2 },
                ],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{tournament}");
    let tournament_id = tournament["id"].as_str().unwrap();
    let ann = tournament["players"][0]["id"].as_str().unwrap();
    let ben = tournament["players"][1]["id"].as_str().unwrap();

    let (status, game) = app
        .post(
            &format!("/api/tournaments/{tournament_id}/matches"),
            Some(&owner),
            json!({ "round": 1, "player1_id": ann, "player2_id": ben }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{game}");
    let result = format!(
        "/api/tournaments/{tournament_id}/matches/{}/result",
        game["id"].as_str().unwrap()
    );

    let (status, _) = app
        .post(&result, Some(&owner), json!({ "winner_id": "nobody" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, decided) = app
        .post(&result, Some(&owner), json!({ "winner_id": ben }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["winner_id"], ben);

    let (status, _) = app
        .post(&result, Some(&owner), json!({ "winner_id": ann }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, standings) = app
        .get(&format!("/api/tournaments/{tournament_id}"), None)
        .await;
    let player = |id: &str| {
        standings["players"]
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["id"] == id)
            .cloned()
            .unwrap()
    };
    assert_eq!(player(ben)["wins"], 1);
    assert_eq!(player(ben)["losses"], 0);
    assert_eq!(player(ann)["losses"], 1);
}

// ── Multi-row writes ─────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_poll_option_leaves_no_poll() {
    let app = TestApp::new(vec![]);
    let owner = app.register("owner").await;
    let library_id = app.library(&owner, "tavern", true).await;
    app.reject("INSERT", "poll_options", "NEW.label = 'Root'");

    let polls = format!("/api/libraries/{library_id}/polls");
    let (status, body) = app
        .post(
            &polls,
            Some(&owner),
            json!({ "title": "What next?", "options": [{ "label": "Azul" }, { "label": "Root" }] }),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);

    let (status, list) = app.get(&polls, Some(&owner)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["polls"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn failed_session_player_leaves_no_session() {
    let app = TestApp::new(vec![]);
    let owner = app.register("owner").await;
    let library_id = app.library(&owner, "tavern", true).await;
    let game_id = app.game(&owner, &library_id, json!({ "title": "Azul" })).await;
    app.reject("INSERT", "game_session_players", "NEW.player_name = 'Sam'");

    let sessions = format!("/api/libraries/{library_id}/sessions");
    let (status, _) = app
        .post(
            &sessions,
            Some(&owner),
            json!({
                "game_id": game_id,
                "played_at": "2024-02-10",
                "players": [{ "player_name": "Alex" }, { "player_name": "Sam" }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, list) = app.get(&sessions, None).await;
    assert_eq!(list["sessions"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn failed_promotion_keeps_the_seat() {
    let app = TestApp::new(vec![]);
    let owner = app.register("owner").await;
    let library_id = app.library(&owner, "tavern", true).await;
    let (_, event) = app
        .post(
            &format!("/api/libraries/{library_id}/events"),
            Some(&owner),
            json!({ "title": "Game night", "event_date": "2024-06-01 19:00:00", "max_attendees": 1 }),
        )
        .await;
    let registrations = format!("/api/events/{}/registrations", event["id"].as_str().unwrap());
    let (_, ann) = app
        .post(&registrations, None, json!({ "attendee_name": "Ann" }))
        .await;
    let (_, ben) = app
        .post(&registrations, None, json!({ "attendee_name": "Ben" }))
        .await;
    assert_eq!(ben["status"], "waitlisted");
    app.reject(
        "UPDATE",
        "event_registrations",
        "NEW.attendee_name = 'Ben' AND NEW.status = 'registered'",
    );

    let (status, _) = app
        .send(
            "DELETE",
            &format!("{registrations}/{}", ann["id"].as_str().unwrap()),
            Some(&owner),
            None,
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, list) = app.get(&registrations, Some(&owner)).await;
    let list = list["registrations"].as_array().unwrap();
    assert_eq!(list[0]["attendee_name"], "Ann");
    assert_eq!(list[0]["status"], "registered");
    assert_eq!(list[1]["attendee_name"], "Ben");
    assert_eq!(list[1]["waitlist_position"], 1);
}
