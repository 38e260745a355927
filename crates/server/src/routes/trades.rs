use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use gametaverns_api::{
    ListTradeWantsResponse, OkResponse, TradeMatch, TradeMatchesResponse, TradeWantRequest,
    TradeWantResponse, db, service,
};

use crate::error::{ApiErr, ApiJson};
use crate::routes::auth::AuthUser;
use crate::routes::{clean, new_id};
use crate::storage::{Db, sq_execute, sq_query_map, want_from_row};

pub async fn list_wants(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<ListTradeWantsResponse>, ApiErr> {
    let conn = db.conn();
    let wants = sq_query_map(&conn, db::trades::wants_by_user(&user.user_id), want_from_row)
        .map_err(ApiErr::from_db("list wants"))?;
    Ok(Json(ListTradeWantsResponse { wants }))
}

pub async fn create_want(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<TradeWantRequest>,
) -> Result<(StatusCode, Json<TradeWantResponse>), ApiErr> {
    let title = service::validate_game_title(&req.title)?;
    let id = new_id();

    let conn = db.conn();
    sq_execute(
        &conn,
        db::trades::want_insert(
            &id,
            &user.user_id,
            &title,
            clean(req.bgg_id.as_deref()),
            clean(req.notes.as_deref()),
        ),
    )
    .map_err(ApiErr::from_db("insert want"))?;

    let want = sq_query_map(&conn, db::trades::wants_by_user(&user.user_id), want_from_row)
        .map_err(ApiErr::from_db("reload want"))?
        .into_iter()
        .find(|w| w.id == id)
        .ok_or_else(|| ApiErr::internal("want vanished after insert"))?;
    Ok((StatusCode::CREATED, Json(want)))
}

pub async fn delete_want(
    State(db): State<Db>,
    Path(id): Path<String>,
    user: AuthUser,
) -> Result<Json<OkResponse>, ApiErr> {
    let conn = db.conn();
    let deleted = sq_execute(&conn, db::trades::want_delete(&user.user_id, &id))
        .map_err(ApiErr::from_db("delete want"))?;
    if deleted == 0 {
        return Err(ApiErr::not_found("want not found"));
    }
    Ok(Json(OkResponse { ok: true }))
}

/// A for-trade game in someone else's library.
struct Offer {
    game_id: String,
    title: String,
    bgg_id: Option<String>,
    library_id: String,
    library_name: String,
    owner_id: String,
}

/// GET /api/trades/matches: the caller's wants against other users'
/// for-trade games.
pub async fn matches(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<TradeMatchesResponse>, ApiErr> {
    let conn = db.conn();
    let wants = sq_query_map(&conn, db::trades::wants_by_user(&user.user_id), want_from_row)
        .map_err(ApiErr::from_db("list wants"))?;
    let offers = sq_query_map(
        &conn,
        db::trades::offers_excluding_owner(&user.user_id),
        |row| {
            Ok(Offer {
                game_id: row.get(0)?,
                title: row.get(1)?,
                bgg_id: row.get(2)?,
                library_id: row.get(3)?,
                library_name: row.get(4)?,
                owner_id: row.get(5)?,
            })
        },
    )
    .map_err(ApiErr::from_db("list trade offers"))?;

    let matches = wants
        .iter()
        .flat_map(|want| {
            offers
                .iter()
                .filter(|offer| {
                    service::want_matches(
                        want.bgg_id.as_deref(),
                        &want.title,
                        offer.bgg_id.as_deref(),
                        &offer.title,
                    )
                })
                .map(move |offer| TradeMatch {
                    want_id: want.id.clone(),
                    want_title: want.title.clone(),
                    game_id: offer.game_id.clone(),
                    game_title: offer.title.clone(),
                    bgg_id: offer.bgg_id.clone(),
                    library_id: offer.library_id.clone(),
                    library_name: offer.library_name.clone(),
                    owner_id: offer.owner_id.clone(),
                })
        })
        .collect();

    Ok(Json(TradeMatchesResponse { matches }))
}
