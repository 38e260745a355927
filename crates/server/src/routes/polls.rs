use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rusqlite::Connection;

use gametaverns_api::{
    CreatePollRequest, ListPollsResponse, OkResponse, PollOptionResponse, PollOptionResult,
    PollResponse, PollResultsResponse, PollStatus, VoteRequest, db, service,
};

use crate::error::{ApiErr, ApiJson, is_constraint_violation};
use crate::routes::auth::AuthUser;
use crate::routes::{clean, new_id, owned_library, visible_library};
use crate::storage::{
    Db, PollRow, poll_from_row, sq_count, sq_execute, sq_query_map, sq_query_opt,
};

fn load_poll_row(conn: &Connection, id: &str) -> Result<PollRow, ApiErr> {
    sq_query_opt(conn, db::polls::get(id), poll_from_row)
        .map_err(ApiErr::from_db("load poll"))?
        .ok_or_else(|| ApiErr::not_found("poll not found"))
}

fn with_options(conn: &Connection, row: PollRow) -> Result<PollResponse, ApiErr> {
    let options = sq_query_map(conn, db::polls::options_list(&row.id), |r| {
        Ok(PollOptionResponse {
            id: r.get(0)?,
            label: r.get(1)?,
            game_id: r.get(2)?,
        })
    })
    .map_err(ApiErr::from_db("load poll options"))?;
    Ok(PollResponse {
        id: row.id,
        library_id: row.library_id,
        title: row.title,
        description: row.description,
        status: row.status,
        max_votes_per_voter: row.max_votes_per_voter,
        created_at: row.created_at,
        options,
    })
}

pub async fn list_polls(
    State(db): State<Db>,
    Path(library_id): Path<String>,
    user: Option<AuthUser>,
) -> Result<Json<ListPollsResponse>, ApiErr> {
    let conn = db.conn();
    visible_library(&conn, &library_id, user.as_ref())?;
    let rows = sq_query_map(&conn, db::polls::list_by_library(&library_id), poll_from_row)
        .map_err(ApiErr::from_db("list polls"))?;
    let polls = rows
        .into_iter()
        .map(|row| with_options(&conn, row))
        .collect::<Result<_, _>>()?;
    Ok(Json(ListPollsResponse { polls }))
}

pub async fn create_poll(
    State(db): State<Db>,
    Path(library_id): Path<String>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreatePollRequest>,
) -> Result<(StatusCode, Json<PollResponse>), ApiErr> {
    let title = service::validate_title(&req.title)?;
    let max_votes = req
        .max_votes_per_voter
        .unwrap_or(service::DEFAULT_MAX_VOTES_PER_VOTER);
    if max_votes < 1 {
        return Err(ApiErr::bad_request("max_votes_per_voter must be at least 1"));
    }
    if req.options.len() < 2 {
        return Err(ApiErr::bad_request("a poll needs at least two options"));
    }
    let labels = req
        .options
        .iter()
        .map(|o| service::validate_title(&o.label))
        .collect::<Result<Vec<_>, _>>()?;

    let conn = db.conn();
    owned_library(&conn, &library_id, &user)?;
    for game_id in req.options.iter().filter_map(|o| clean(o.game_id.as_deref())) {
        sq_query_opt(&conn, db::games::get(&library_id, game_id), |r| {
            r.get::<_, String>(0)
        })
        .map_err(ApiErr::from_db("load game"))?
        .ok_or_else(|| ApiErr::bad_request("poll option game does not belong to this library"))?;
    }

    let poll_id = new_id();
    let tx = conn
        .unchecked_transaction()
        .map_err(ApiErr::from_db("begin poll"))?;
    sq_execute(
        &tx,
        db::polls::insert(
            &poll_id,
            &library_id,
            &title,
            clean(req.description.as_deref()),
            max_votes,
        ),
    )
    .map_err(ApiErr::from_db("insert poll"))?;
    for (position, (option, label)) in req.options.iter().zip(&labels).enumerate() {
        sq_execute(
            &tx,
            db::polls::option_insert(
                &new_id(),
                &poll_id,
                label,
                clean(option.game_id.as_deref()),
                position as i64,
            ),
        )
        .map_err(ApiErr::from_db("insert poll option"))?;
    }
    tx.commit().map_err(ApiErr::from_db("commit poll"))?;

    let poll = with_options(&conn, load_poll_row(&conn, &poll_id)?)?;
    Ok((StatusCode::CREATED, Json(poll)))
}

/// POST /api/polls/{id}/votes: anyone who can see the library may vote.
pub async fn vote(
    State(db): State<Db>,
    Path(poll_id): Path<String>,
    user: Option<AuthUser>,
    ApiJson(req): ApiJson<VoteRequest>,
) -> Result<(StatusCode, Json<OkResponse>), ApiErr> {
    let voter_id = req.voter_id.trim();
    if voter_id.is_empty() || voter_id.len() > 100 {
        return Err(ApiErr::bad_request("voter_id must be 1-100 characters"));
    }

    let conn = db.conn();
    let poll = with_options(&conn, load_poll_row(&conn, &poll_id)?)?;
    visible_library(&conn, &poll.library_id, user.as_ref())?;
    if !poll.options.iter().any(|o| o.id == req.option_id) {
        return Err(ApiErr::bad_request("option does not belong to this poll"));
    }

    let votes = sq_count(&conn, db::polls::count_by_voter(&poll_id, voter_id))
        .map_err(ApiErr::from_db("count votes"))?;
    let same_option = sq_count(
        &conn,
        db::polls::count_by_voter_option(&poll_id, &req.option_id, voter_id),
    )
    .map_err(ApiErr::from_db("count option votes"))?;
    service::check_vote(poll.status, votes, poll.max_votes_per_voter, same_option > 0)?;

    match sq_execute(
        &conn,
        db::polls::vote_insert(&new_id(), &poll_id, &req.option_id, voter_id),
    ) {
        Ok(_) => Ok((StatusCode::CREATED, Json(OkResponse { ok: true }))),
        Err(e) if is_constraint_violation(&e) => {
            Err(ApiErr::conflict("already voted for this option"))
        }
        Err(e) => Err(ApiErr::from_db("insert vote")(e)),
    }
}

pub async fn results(
    State(db): State<Db>,
    Path(poll_id): Path<String>,
    user: Option<AuthUser>,
) -> Result<Json<PollResultsResponse>, ApiErr> {
    let conn = db.conn();
    let poll = load_poll_row(&conn, &poll_id)?;
    visible_library(&conn, &poll.library_id, user.as_ref())?;

    let results = sq_query_map(&conn, db::polls::tally(&poll_id), |r| {
        Ok(PollOptionResult {
            option_id: r.get(0)?,
            label: r.get(1)?,
            votes: r.get(2)?,
        })
    })
    .map_err(ApiErr::from_db("tally poll"))?;
    let total_votes = results.iter().map(|r| r.votes).sum();

    Ok(Json(PollResultsResponse {
        poll_id,
        status: poll.status,
        total_votes,
        results,
    }))
}

pub async fn close_poll(
    State(db): State<Db>,
    Path(poll_id): Path<String>,
    user: AuthUser,
) -> Result<Json<OkResponse>, ApiErr> {
    let conn = db.conn();
    let poll = load_poll_row(&conn, &poll_id)?;
    owned_library(&conn, &poll.library_id, &user)?;
    if poll.status == PollStatus::Closed {
        return Err(ApiErr::conflict("poll is already closed"));
    }
    sq_execute(&conn, db::polls::set_status(&poll_id, PollStatus::Closed))
        .map_err(ApiErr::from_db("close poll"))?;
    Ok(Json(OkResponse { ok: true }))
}
