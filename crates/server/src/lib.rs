//! GameTaverns server: multi-tenant board-game libraries over Axum + SQLite.

pub mod config;
pub mod error;
pub mod import;
pub mod routes;
pub mod storage;

use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    routing::{delete, get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use gametaverns_bgg::PlaysSource;

pub use config::AppConfig;
pub use storage::Db;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: AppConfig,
    pub bgg: Arc<dyn PlaysSource>,
}

impl FromRef<AppState> for Db {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn PlaysSource> {
    fn from_ref(state: &AppState) -> Self {
        state.bgg.clone()
    }
}

/// Build the full router: REST under `/api`, edge-style functions under
/// `/functions/v1`.
pub fn app(state: AppState) -> Router {
    use routes::{
        auth, events, functions, games, health, libraries, loans, messages, polls, sessions,
        tournaments, trades,
    };

    let api = Router::new()
        .route("/health", get(health::health))
        // Auth
        .route("/register", post(auth::register))
        .route("/auth/me", get(auth::me))
        // Libraries
        .route(
            "/libraries",
            get(libraries::list_public).post(libraries::create_library),
        )
        .route("/libraries/mine", get(libraries::list_mine))
        .route("/libraries/by-slug/{slug}", get(libraries::get_by_slug))
        .route(
            "/libraries/{id}",
            get(libraries::get_library)
                .put(libraries::update_library)
                .delete(libraries::delete_library),
        )
        // Games
        .route(
            "/libraries/{id}/games",
            get(games::list_games).post(games::create_game),
        )
        .route(
            "/libraries/{id}/games/{game_id}",
            get(games::get_game)
                .put(games::update_game)
                .delete(games::delete_game),
        )
        // Play sessions
        .route(
            "/libraries/{id}/sessions",
            get(sessions::list_sessions).post(sessions::create_session),
        )
        .route(
            "/libraries/{id}/sessions/{session_id}",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        // Loans
        .route(
            "/libraries/{id}/loans",
            get(loans::list_library_loans).post(loans::request_loan),
        )
        .route("/loans/mine", get(loans::list_my_loans))
        .route("/loans/{id}/transition", post(loans::transition_loan))
        // Trades
        .route(
            "/trades/wants",
            get(trades::list_wants).post(trades::create_want),
        )
        .route("/trades/wants/{id}", delete(trades::delete_want))
        .route("/trades/matches", get(trades::matches))
        // Events
        .route(
            "/libraries/{id}/events",
            get(events::list_events).post(events::create_event),
        )
        .route(
            "/events/{id}/registrations",
            get(events::list_registrations).post(events::register),
        )
        .route(
            "/events/{id}/registrations/{registration_id}",
            delete(events::cancel_registration),
        )
        // Messages
        .route("/libraries/{id}/messages", get(messages::list_messages))
        .route("/messages/{id}/read", post(messages::mark_read))
        // Polls
        .route(
            "/libraries/{id}/polls",
            get(polls::list_polls).post(polls::create_poll),
        )
        .route("/polls/{id}/votes", post(polls::vote))
        .route("/polls/{id}/results", get(polls::results))
        .route("/polls/{id}/close", post(polls::close_poll))
        // Tournaments
        .route(
            "/libraries/{id}/tournaments",
            post(tournaments::create_tournament),
        )
        .route("/tournaments/{id}", get(tournaments::get_tournament))
        .route("/tournaments/{id}/matches", post(tournaments::create_match))
        .route(
            "/tournaments/{id}/matches/{match_id}/result",
            post(tournaments::record_result),
        );

    let functions = Router::new()
        .route("/bgg-play-import", post(functions::bgg_play_import))
        .route("/send-message", post(functions::send_message));

    Router::new()
        .nest("/api", api)
        .nest("/functions/v1", functions)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
