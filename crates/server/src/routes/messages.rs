use axum::{
    Json,
    extract::{Path, State},
};

use gametaverns_api::{ListMessagesResponse, OkResponse, db};

use crate::error::ApiErr;
use crate::routes::auth::AuthUser;
use crate::routes::owned_library;
use crate::storage::{Db, message_from_row, sq_execute, sq_query_map, sq_query_opt};

/// GET /api/libraries/{id}/messages: the owner's inbox, newest first.
pub async fn list_messages(
    State(db): State<Db>,
    Path(library_id): Path<String>,
    user: AuthUser,
) -> Result<Json<ListMessagesResponse>, ApiErr> {
    let conn = db.conn();
    owned_library(&conn, &library_id, &user)?;
    let messages = sq_query_map(
        &conn,
        db::messages::list_by_library(&library_id),
        message_from_row,
    )
    .map_err(ApiErr::from_db("list messages"))?;
    Ok(Json(ListMessagesResponse { messages }))
}

pub async fn mark_read(
    State(db): State<Db>,
    Path(id): Path<String>,
    user: AuthUser,
) -> Result<Json<OkResponse>, ApiErr> {
    let conn = db.conn();
    let library_id = sq_query_opt(&conn, db::messages::library_of(&id), |row| {
        row.get::<_, String>(0)
    })
    .map_err(ApiErr::from_db("load message"))?
    .ok_or_else(|| ApiErr::not_found("message not found"))?;
    owned_library(&conn, &library_id, &user)?;

    sq_execute(&conn, db::messages::mark_read(&id)).map_err(ApiErr::from_db("mark read"))?;
    Ok(Json(OkResponse { ok: true }))
}
