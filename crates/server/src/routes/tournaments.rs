use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rusqlite::Connection;

use gametaverns_api::{
    CreateMatchRequest, CreateTournamentRequest, MatchResponse, RecordResultRequest,
    TournamentResponse, db, service,
};

use crate::error::{ApiErr, ApiJson};
use crate::routes::auth::AuthUser;
use crate::routes::{clean, new_id, owned_library, visible_library};
use crate::storage::{
    Db, TournamentRow, match_from_row, sq_execute, sq_query_map, sq_query_opt,
    tournament_from_row, tournament_player_from_row,
};

fn load_tournament_row(conn: &Connection, id: &str) -> Result<TournamentRow, ApiErr> {
    sq_query_opt(conn, db::tournaments::get(id), tournament_from_row)
        .map_err(ApiErr::from_db("load tournament"))?
        .ok_or_else(|| ApiErr::not_found("tournament not found"))
}

fn load_tournament(conn: &Connection, row: TournamentRow) -> Result<TournamentResponse, ApiErr> {
    let players = sq_query_map(
        conn,
        db::tournaments::players_list(&row.id),
        tournament_player_from_row,
    )
    .map_err(ApiErr::from_db("load tournament players"))?;
    let matches = sq_query_map(conn, db::tournaments::matches_list(&row.id), match_from_row)
        .map_err(ApiErr::from_db("load tournament matches"))?;
    Ok(TournamentResponse {
        id: row.id,
        library_id: row.library_id,
        name: row.name,
        game_id: row.game_id,
        created_at: row.created_at,
        players,
        matches,
    })
}

fn load_match(conn: &Connection, tournament_id: &str, id: &str) -> Result<MatchResponse, ApiErr> {
    sq_query_opt(conn, db::tournaments::match_get(tournament_id, id), match_from_row)
        .map_err(ApiErr::from_db("load match"))?
        .ok_or_else(|| ApiErr::not_found("match not found"))
}

/// POST /api/libraries/{id}/tournaments: players and seeds are entered by
/// hand.
pub async fn create_tournament(
    State(db): State<Db>,
    Path(library_id): Path<String>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateTournamentRequest>,
) -> Result<(StatusCode, Json<TournamentResponse>), ApiErr> {
    let name = service::validate_title(&req.name)?;
    let players = req
        .players
        .iter()
        .map(|p| service::validate_attendee_name(&p.player_name).map(|n| (n, p.seed)))
        .collect::<Result<Vec<_>, _>>()?;

    let conn = db.conn();
    owned_library(&conn, &library_id, &user)?;
    let game_id = clean(req.game_id.as_deref());
    if let Some(game_id) = game_id {
        sq_query_opt(&conn, db::games::get(&library_id, game_id), |r| {
            r.get::<_, String>(0)
        })
        .map_err(ApiErr::from_db("load game"))?
        .ok_or_else(|| ApiErr::bad_request("game does not belong to this library"))?;
    }

    let id = new_id();
    let tx = conn
        .unchecked_transaction()
        .map_err(ApiErr::from_db("begin tournament"))?;
    sq_execute(&tx, db::tournaments::insert(&id, &library_id, &name, game_id))
        .map_err(ApiErr::from_db("insert tournament"))?;
    for (player_name, seed) in &players {
        sq_execute(
            &tx,
            db::tournaments::player_insert(&new_id(), &id, player_name, *seed),
        )
        .map_err(ApiErr::from_db("insert tournament player"))?;
    }
    tx.commit().map_err(ApiErr::from_db("commit tournament"))?;

    let tournament = load_tournament(&conn, load_tournament_row(&conn, &id)?)?;
    Ok((StatusCode::CREATED, Json(tournament)))
}

pub async fn get_tournament(
    State(db): State<Db>,
    Path(id): Path<String>,
    user: Option<AuthUser>,
) -> Result<Json<TournamentResponse>, ApiErr> {
    let conn = db.conn();
    let row = load_tournament_row(&conn, &id)?;
    visible_library(&conn, &row.library_id, user.as_ref())?;
    load_tournament(&conn, row).map(Json)
}

/// POST /api/tournaments/{id}/matches
pub async fn create_match(
    State(db): State<Db>,
    Path(tournament_id): Path<String>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateMatchRequest>,
) -> Result<(StatusCode, Json<MatchResponse>), ApiErr> {
    if req.round < 1 {
        return Err(ApiErr::bad_request("round must be at least 1"));
    }
    if req.player1_id == req.player2_id {
        return Err(ApiErr::bad_request("a match needs two different players"));
    }

    let conn = db.conn();
    let tournament = load_tournament_row(&conn, &tournament_id)?;
    owned_library(&conn, &tournament.library_id, &user)?;
    for player_id in [&req.player1_id, &req.player2_id] {
        sq_query_opt(
            &conn,
            db::tournaments::player_in_tournament(&tournament_id, player_id),
            |r| r.get::<_, String>(0),
        )
        .map_err(ApiErr::from_db("load tournament player"))?
        .ok_or_else(|| ApiErr::bad_request("player is not part of this tournament"))?;
    }

    let id = new_id();
    sq_execute(
        &conn,
        db::tournaments::match_insert(
            &id,
            &tournament_id,
            req.round,
            &req.player1_id,
            &req.player2_id,
        ),
    )
    .map_err(ApiErr::from_db("insert match"))?;

    Ok((StatusCode::CREATED, Json(load_match(&conn, &tournament_id, &id)?)))
}

/// POST /api/tournaments/{id}/matches/{match_id}/result: a decided match
/// cannot be re-recorded.
pub async fn record_result(
    State(db): State<Db>,
    Path((tournament_id, match_id)): Path<(String, String)>,
    user: AuthUser,
    ApiJson(req): ApiJson<RecordResultRequest>,
) -> Result<Json<MatchResponse>, ApiErr> {
    let conn = db.conn();
    let tournament = load_tournament_row(&conn, &tournament_id)?;
    owned_library(&conn, &tournament.library_id, &user)?;
    let current = load_match(&conn, &tournament_id, &match_id)?;

    let loser = service::match_loser(
        &current.player1_id,
        &current.player2_id,
        &req.winner_id,
        current.winner_id.as_deref(),
    )?;

    let tx = conn
        .unchecked_transaction()
        .map_err(ApiErr::from_db("begin result"))?;
    let changed = sq_execute(&tx, db::tournaments::match_set_winner(&match_id, &req.winner_id))
        .map_err(ApiErr::from_db("set match winner"))?;
    if changed == 0 {
        return Err(ApiErr::conflict("match already has a result"));
    }
    sq_execute(&tx, db::tournaments::add_win(&req.winner_id))
        .map_err(ApiErr::from_db("add win"))?;
    sq_execute(&tx, db::tournaments::add_loss(loser)).map_err(ApiErr::from_db("add loss"))?;
    tx.commit().map_err(ApiErr::from_db("commit result"))?;
    tracing::info!(%tournament_id, %match_id, winner = %req.winner_id, "match result recorded");

    load_match(&conn, &tournament_id, &match_id).map(Json)
}
