use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use gametaverns_api::{
    CreateGameRequest, GameResponse, ListGamesResponse, OkResponse, UpdateGameRequest, db,
    service,
};

use crate::error::{ApiErr, ApiJson};
use crate::routes::auth::AuthUser;
use crate::routes::{clean, new_id, owned_library, visible_library};
use crate::storage::{Db, game_from_row, sq_execute, sq_query_map, sq_query_opt};

fn load_game(
    conn: &rusqlite::Connection,
    library_id: &str,
    game_id: &str,
) -> Result<GameResponse, ApiErr> {
    sq_query_opt(conn, db::games::get(library_id, game_id), game_from_row)
        .map_err(ApiErr::from_db("load game"))?
        .ok_or_else(|| ApiErr::not_found("game not found"))
}

pub async fn list_games(
    State(db): State<Db>,
    Path(library_id): Path<String>,
    user: Option<AuthUser>,
) -> Result<Json<ListGamesResponse>, ApiErr> {
    let conn = db.conn();
    visible_library(&conn, &library_id, user.as_ref())?;
    let games = sq_query_map(&conn, db::games::list_by_library(&library_id), game_from_row)
        .map_err(ApiErr::from_db("list games"))?;
    Ok(Json(ListGamesResponse { games }))
}

pub async fn create_game(
    State(db): State<Db>,
    Path(library_id): Path<String>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateGameRequest>,
) -> Result<(StatusCode, Json<GameResponse>), ApiErr> {
    let title = service::validate_game_title(&req.title)?;
    let copies_owned = service::validate_copies_owned(req.copies_owned.unwrap_or(1))?;
    let id = new_id();

    let conn = db.conn();
    owned_library(&conn, &library_id, &user)?;
    sq_execute(
        &conn,
        db::games::insert(&db::games::InsertParams {
            id: &id,
            library_id: &library_id,
            title: &title,
            bgg_id: clean(req.bgg_id.as_deref()),
            copies_owned,
            is_for_trade: req.is_for_trade.unwrap_or(false),
        }),
    )
    .map_err(ApiErr::from_db("insert game"))?;

    Ok((StatusCode::CREATED, Json(load_game(&conn, &library_id, &id)?)))
}

pub async fn get_game(
    State(db): State<Db>,
    Path((library_id, game_id)): Path<(String, String)>,
    user: Option<AuthUser>,
) -> Result<Json<GameResponse>, ApiErr> {
    let conn = db.conn();
    visible_library(&conn, &library_id, user.as_ref())?;
    load_game(&conn, &library_id, &game_id).map(Json)
}

pub async fn update_game(
    State(db): State<Db>,
    Path((library_id, game_id)): Path<(String, String)>,
    user: AuthUser,
    ApiJson(req): ApiJson<UpdateGameRequest>,
) -> Result<Json<GameResponse>, ApiErr> {
    let title = req
        .title
        .as_deref()
        .map(service::validate_game_title)
        .transpose()?;
    let copies_owned = req
        .copies_owned
        .map(service::validate_copies_owned)
        .transpose()?;

    let conn = db.conn();
    owned_library(&conn, &library_id, &user)?;
    let current = load_game(&conn, &library_id, &game_id)?;

    let params = db::games::UpdateParams {
        title: title.as_deref(),
        bgg_id: req.bgg_id.as_deref().map(str::trim),
        copies_owned,
        is_for_trade: req.is_for_trade,
    };
    let Some(built) = db::games::update(&library_id, &game_id, &params) else {
        return Ok(Json(current));
    };
    sq_execute(&conn, built).map_err(ApiErr::from_db("update game"))?;

    load_game(&conn, &library_id, &game_id).map(Json)
}

pub async fn delete_game(
    State(db): State<Db>,
    Path((library_id, game_id)): Path<(String, String)>,
    user: AuthUser,
) -> Result<Json<OkResponse>, ApiErr> {
    let conn = db.conn();
    owned_library(&conn, &library_id, &user)?;
    let deleted = sq_execute(&conn, db::games::delete(&library_id, &game_id))
        .map_err(ApiErr::from_db("delete game"))?;
    if deleted == 0 {
        return Err(ApiErr::not_found("game not found"));
    }
    Ok(Json(OkResponse { ok: true }))
}
