use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rusqlite::Connection;

use gametaverns_api::{
    ListLoansResponse, LoanAction, LoanRequest, LoanResponse, LoanTransitionRequest, db,
    service::{self, LoanActor},
};

use crate::error::{ApiErr, ApiJson};
use crate::routes::auth::AuthUser;
use crate::routes::{can_manage, clean, load_library, new_id, owned_library, visible_library};
use crate::storage::{Db, game_from_row, loan_from_row, sq_count, sq_execute, sq_query_map, sq_query_opt};

fn load_loan(conn: &Connection, id: &str) -> Result<LoanResponse, ApiErr> {
    sq_query_opt(conn, db::loans::get(id), loan_from_row)
        .map_err(ApiErr::from_db("load loan"))?
        .ok_or_else(|| ApiErr::not_found("loan not found"))
}

/// 409 unless some copy of the game is not held by another loan.
fn ensure_copy_available(conn: &Connection, library_id: &str, game_id: &str) -> Result<(), ApiErr> {
    let game = sq_query_opt(conn, db::games::get(library_id, game_id), game_from_row)
        .map_err(ApiErr::from_db("load game"))?
        .ok_or_else(|| ApiErr::not_found("game not found"))?;
    let held = sq_count(conn, db::loans::count_held(&game.id))
        .map_err(ApiErr::from_db("count held loans"))?;
    service::check_loan_availability(game.copies_owned, held)?;
    Ok(())
}

/// POST /api/libraries/{id}/loans: ask to borrow a game.
pub async fn request_loan(
    State(db): State<Db>,
    Path(library_id): Path<String>,
    user: AuthUser,
    ApiJson(req): ApiJson<LoanRequest>,
) -> Result<(StatusCode, Json<LoanResponse>), ApiErr> {
    let conn = db.conn();
    let library = visible_library(&conn, &library_id, Some(&user))?;
    if library.owner_id == user.user_id {
        return Err(ApiErr::bad_request("cannot borrow from your own library"));
    }
    ensure_copy_available(&conn, &library_id, &req.game_id)?;

    let id = new_id();
    sq_execute(
        &conn,
        db::loans::insert(
            &id,
            &library_id,
            &req.game_id,
            &user.user_id,
            clean(req.notes.as_deref()),
            clean(req.due_date.as_deref()),
        ),
    )
    .map_err(ApiErr::from_db("insert loan"))?;
    tracing::info!(loan_id = %id, game_id = %req.game_id, "loan requested");

    Ok((StatusCode::CREATED, Json(load_loan(&conn, &id)?)))
}

/// GET /api/libraries/{id}/loans: owner view.
pub async fn list_library_loans(
    State(db): State<Db>,
    Path(library_id): Path<String>,
    user: AuthUser,
) -> Result<Json<ListLoansResponse>, ApiErr> {
    let conn = db.conn();
    owned_library(&conn, &library_id, &user)?;
    let loans = sq_query_map(&conn, db::loans::list_by_library(&library_id), loan_from_row)
        .map_err(ApiErr::from_db("list loans"))?;
    Ok(Json(ListLoansResponse { loans }))
}

/// GET /api/loans/mine: loans the caller borrowed.
pub async fn list_my_loans(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<ListLoansResponse>, ApiErr> {
    let conn = db.conn();
    let loans = sq_query_map(&conn, db::loans::list_by_borrower(&user.user_id), loan_from_row)
        .map_err(ApiErr::from_db("list my loans"))?;
    Ok(Json(ListLoansResponse { loans }))
}

/// POST /api/loans/{id}/transition
pub async fn transition_loan(
    State(db): State<Db>,
    Path(id): Path<String>,
    user: AuthUser,
    ApiJson(req): ApiJson<LoanTransitionRequest>,
) -> Result<Json<LoanResponse>, ApiErr> {
    let conn = db.conn();
    let loan = load_loan(&conn, &id)?;
    let library = load_library(&conn, &loan.library_id)?;
    let actor = LoanActor {
        is_lender: can_manage(&library, &user),
        is_borrower: loan.borrower_id == user.user_id,
    };
    if !actor.is_lender && !actor.is_borrower {
        return Err(ApiErr::not_found("loan not found"));
    }

    let next = service::plan_loan_transition(loan.status, req.action, actor)?;
    if req.action == LoanAction::Approve {
        ensure_copy_available(&conn, &loan.library_id, &loan.game_id)?;
    }

    let changed = sq_execute(&conn, db::loans::transition(&id, loan.status, next))
        .map_err(ApiErr::from_db("update loan"))?;
    if changed == 0 {
        return Err(ApiErr::conflict("loan changed concurrently, reload and retry"));
    }
    tracing::info!(loan_id = %id, from = %loan.status, to = %next, "loan transitioned");

    load_loan(&conn, &id).map(Json)
}
