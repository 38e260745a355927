use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;

use gametaverns_api::{
    CreateSessionRequest, ListSessionsResponse, OkResponse, SessionResponse, db,
};

use crate::error::{ApiErr, ApiJson};
use crate::routes::auth::AuthUser;
use crate::routes::{clean, new_id, owned_library, visible_library};
use crate::storage::{
    Db, player_from_row, session_from_row, sq_execute, sq_query_map, sq_query_opt,
};

const DEFAULT_LIST_LIMIT: u64 = 100;
const MAX_LIST_LIMIT: u64 = 500;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u64>,
}

/// Fetch a session with its players attached.
pub(crate) fn load_session(
    conn: &Connection,
    library_id: &str,
    session_id: &str,
) -> Result<SessionResponse, ApiErr> {
    let mut session = sq_query_opt(conn, db::sessions::get(library_id, session_id), session_from_row)
        .map_err(ApiErr::from_db("load session"))?
        .ok_or_else(|| ApiErr::not_found("session not found"))?;
    session.players = sq_query_map(conn, db::sessions::players_list(&session.id), player_from_row)
        .map_err(ApiErr::from_db("load session players"))?;
    Ok(session)
}

/// GET /api/libraries/{id}/sessions: newest first, players included.
pub async fn list_sessions(
    State(db): State<Db>,
    Path(library_id): Path<String>,
    Query(q): Query<ListQuery>,
    user: Option<AuthUser>,
) -> Result<Json<ListSessionsResponse>, ApiErr> {
    let limit = q.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);

    let conn = db.conn();
    visible_library(&conn, &library_id, user.as_ref())?;
    let mut sessions = sq_query_map(
        &conn,
        db::sessions::list_by_library(&library_id, limit),
        session_from_row,
    )
    .map_err(ApiErr::from_db("list sessions"))?;
    for session in &mut sessions {
        session.players =
            sq_query_map(&conn, db::sessions::players_list(&session.id), player_from_row)
                .map_err(ApiErr::from_db("list session players"))?;
    }
    Ok(Json(ListSessionsResponse { sessions }))
}

/// POST /api/libraries/{id}/sessions: log a play by hand.
pub async fn create_session(
    State(db): State<Db>,
    Path(library_id): Path<String>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiErr> {
    if req.played_at.trim().is_empty() {
        return Err(ApiErr::bad_request("played_at is required"));
    }
    if req.duration_minutes.is_some_and(|m| m < 0) {
        return Err(ApiErr::bad_request("duration_minutes cannot be negative"));
    }
    if req.players.iter().any(|p| p.player_name.trim().is_empty()) {
        return Err(ApiErr::bad_request("every player needs a name"));
    }

    let conn = db.conn();
    owned_library(&conn, &library_id, &user)?;
    sq_query_opt(
        &conn,
        db::games::get(&library_id, &req.game_id),
        |row| row.get::<_, String>(0),
    )
    .map_err(ApiErr::from_db("load game"))?
    .ok_or_else(|| ApiErr::bad_request("game does not belong to this library"))?;

    let session_id = new_id();
    let tx = conn
        .unchecked_transaction()
        .map_err(ApiErr::from_db("begin session"))?;
    sq_execute(
        &tx,
        db::sessions::insert(&db::sessions::SessionParams {
            id: &session_id,
            library_id: &library_id,
            game_id: &req.game_id,
            played_at: req.played_at.trim(),
            duration_minutes: req.duration_minutes,
            location: clean(req.location.as_deref()),
            notes: clean(req.notes.as_deref()),
            bgg_play_id: None,
        }),
    )
    .map_err(ApiErr::from_db("insert session"))?;

    for player in &req.players {
        sq_execute(
            &tx,
            db::sessions::player_insert(&db::sessions::PlayerParams {
                id: &new_id(),
                session_id: &session_id,
                player_name: player.player_name.trim(),
                bgg_username: clean(player.bgg_username.as_deref()),
                score: clean(player.score.as_deref()),
                is_winner: player.is_winner,
                is_first_play: player.is_first_play,
                color: clean(player.color.as_deref()),
            }),
        )
        .map_err(ApiErr::from_db("insert session player"))?;
    }
    tx.commit().map_err(ApiErr::from_db("commit session"))?;

    Ok((
        StatusCode::CREATED,
        Json(load_session(&conn, &library_id, &session_id)?),
    ))
}

pub async fn get_session(
    State(db): State<Db>,
    Path((library_id, session_id)): Path<(String, String)>,
    user: Option<AuthUser>,
) -> Result<Json<SessionResponse>, ApiErr> {
    let conn = db.conn();
    visible_library(&conn, &library_id, user.as_ref())?;
    load_session(&conn, &library_id, &session_id).map(Json)
}

pub async fn delete_session(
    State(db): State<Db>,
    Path((library_id, session_id)): Path<(String, String)>,
    user: AuthUser,
) -> Result<Json<OkResponse>, ApiErr> {
    let conn = db.conn();
    owned_library(&conn, &library_id, &user)?;
    let deleted = sq_execute(&conn, db::sessions::delete(&library_id, &session_id))
        .map_err(ApiErr::from_db("delete session"))?;
    if deleted == 0 {
        return Err(ApiErr::not_found("session not found"));
    }
    Ok(Json(OkResponse { ok: true }))
}
