//! `/functions/v1/*` endpoints. They answer with a `success` flag in the
//! body and report malformed JSON through the same error envelope.

use std::sync::Arc;

use axum::{Json, extract::State, http::HeaderMap};
use chrono::Utc;

use gametaverns_api::{
    BggImportRequest, BggImportResponse, SendMessageRequest, SendMessageResponse, crypto, db,
    service,
};
use gametaverns_bgg::PlaysSource;

use crate::AppConfig;
use crate::error::{ApiErr, ApiJson};
use crate::import;
use crate::routes::auth::AuthUser;
use crate::routes::{clean, new_id, owned_library, visible_library};
use crate::storage::{Db, sq_count, sq_execute, sq_query_opt};

/// POST /functions/v1/bgg-play-import
pub async fn bgg_play_import(
    State(db): State<Db>,
    State(bgg): State<Arc<dyn PlaysSource>>,
    user: AuthUser,
    ApiJson(req): ApiJson<BggImportRequest>,
) -> Result<Json<BggImportResponse>, ApiErr> {
    let username = service::validate_bgg_username(&req.bgg_username)?;
    let library_id = req.library_id.trim();
    if library_id.is_empty() {
        return Err(ApiErr::bad_request("library_id is required"));
    }

    {
        let conn = db.conn();
        owned_library(&conn, library_id, &user)?;
    }

    tracing::info!(%username, library_id, update_existing = req.update_existing, "starting BGG import");
    let plays = bgg.fetch_plays(&username).await.map_err(|e| {
        tracing::warn!(%username, "BGG fetch failed: {e}");
        ApiErr::bad_gateway(format!("failed to fetch plays from BoardGameGeek: {e}"))
    })?;

    let conn = db.conn();
    let report = import::apply_plays(&conn, library_id, &plays, req.update_existing)
        .map_err(ApiErr::from_db("import plays"))?;
    Ok(Json(report))
}

/// POST /functions/v1/send-message: public contact form, rate limited per
/// hashed client IP.
pub async fn send_message(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiErr> {
    let msg = service::validate_message(&req.sender_name, &req.sender_email, &req.message)?;

    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let ip = service::client_ip(header("x-forwarded-for"), header("x-real-ip"));
    let ip_hash = crypto::hash_ip(&config.ip_hash_salt, &ip);

    let conn = db.conn();
    visible_library(&conn, &req.library_id, None)?;
    let game_id = clean(req.game_id.as_deref());
    if let Some(game_id) = game_id {
        sq_query_opt(&conn, db::games::get(&req.library_id, game_id), |row| {
            row.get::<_, String>(0)
        })
        .map_err(ApiErr::from_db("load game"))?
        .ok_or_else(|| ApiErr::bad_request("game does not belong to this library"))?;
    }

    let recent = sq_count(
        &conn,
        db::messages::count_since(&ip_hash, &service::rate_limit_cutoff(Utc::now())),
    )
    .map_err(ApiErr::from_db("count recent messages"))?;
    if let Err(e) = service::check_rate_limit(recent, config.message_rate_limit) {
        tracing::warn!(library_id = %req.library_id, "message rate limit hit");
        return Err(e.into());
    }

    let id = new_id();
    sq_execute(
        &conn,
        db::messages::insert(&db::messages::InsertParams {
            id: &id,
            library_id: &req.library_id,
            game_id,
            sender_name: &msg.sender_name,
            sender_email: &msg.sender_email,
            message: &msg.message,
            sender_ip_hash: &ip_hash,
        }),
    )
    .map_err(ApiErr::from_db("insert message"))?;
    tracing::info!(message_id = %id, library_id = %req.library_id, "message stored");

    Ok(Json(SendMessageResponse {
        success: true,
        message_id: id,
    }))
}
