use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use gametaverns_api::{
    CreateLibraryRequest, LibraryResponse, ListLibrariesResponse, OkResponse,
    UpdateLibraryRequest, db, service,
};

use crate::error::{ApiErr, ApiJson, is_constraint_violation};
use crate::routes::auth::AuthUser;
use crate::routes::{clean, new_id, owned_library, visible_library};
use crate::storage::{Db, library_from_row, sq_execute, sq_query_map, sq_query_opt};

/// POST /api/libraries
pub async fn create_library(
    State(db): State<Db>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateLibraryRequest>,
) -> Result<(StatusCode, Json<LibraryResponse>), ApiErr> {
    let slug = service::validate_slug(&req.slug)?;
    let name = service::validate_library_name(&req.name)?;
    let id = new_id();

    let conn = db.conn();
    match sq_execute(
        &conn,
        db::libraries::insert(
            &id,
            &user.user_id,
            &slug,
            &name,
            clean(req.description.as_deref()),
            req.is_public.unwrap_or(true),
        ),
    ) {
        Ok(_) => {}
        Err(e) if is_constraint_violation(&e) => {
            return Err(ApiErr::conflict("slug already taken"));
        }
        Err(e) => return Err(ApiErr::from_db("insert library")(e)),
    }

    let library = sq_query_opt(&conn, db::libraries::get_by_id(&id), library_from_row)
        .map_err(ApiErr::from_db("reload library"))?
        .ok_or_else(|| ApiErr::internal("library vanished after insert"))?;
    tracing::info!(library_id = %library.id, slug = %library.slug, "created library");
    Ok((StatusCode::CREATED, Json(library)))
}

/// GET /api/libraries: public directory.
pub async fn list_public(State(db): State<Db>) -> Result<Json<ListLibrariesResponse>, ApiErr> {
    let conn = db.conn();
    let libraries = sq_query_map(&conn, db::libraries::list_public(), library_from_row)
        .map_err(ApiErr::from_db("list libraries"))?;
    Ok(Json(ListLibrariesResponse { libraries }))
}

/// GET /api/libraries/mine
pub async fn list_mine(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<ListLibrariesResponse>, ApiErr> {
    let conn = db.conn();
    let libraries = sq_query_map(
        &conn,
        db::libraries::list_by_owner(&user.user_id),
        library_from_row,
    )
    .map_err(ApiErr::from_db("list own libraries"))?;
    Ok(Json(ListLibrariesResponse { libraries }))
}

pub async fn get_library(
    State(db): State<Db>,
    Path(id): Path<String>,
    user: Option<AuthUser>,
) -> Result<Json<LibraryResponse>, ApiErr> {
    let conn = db.conn();
    visible_library(&conn, &id, user.as_ref()).map(Json)
}

/// GET /api/libraries/by-slug/{slug}: how a tenant subdomain resolves.
pub async fn get_by_slug(
    State(db): State<Db>,
    Path(slug): Path<String>,
    user: Option<AuthUser>,
) -> Result<Json<LibraryResponse>, ApiErr> {
    let conn = db.conn();
    let id = sq_query_opt(
        &conn,
        db::libraries::get_by_slug(&slug.to_lowercase()),
        |row| row.get::<_, String>(0),
    )
    .map_err(ApiErr::from_db("library by slug"))?
    .ok_or_else(|| ApiErr::not_found("library not found"))?;
    visible_library(&conn, &id, user.as_ref()).map(Json)
}

pub async fn update_library(
    State(db): State<Db>,
    Path(id): Path<String>,
    user: AuthUser,
    ApiJson(req): ApiJson<UpdateLibraryRequest>,
) -> Result<Json<LibraryResponse>, ApiErr> {
    let name = req
        .name
        .as_deref()
        .map(service::validate_library_name)
        .transpose()?;

    let conn = db.conn();
    let current = owned_library(&conn, &id, &user)?;
    let Some(built) = db::libraries::update(
        &id,
        name.as_deref(),
        req.description.as_deref().map(str::trim),
        req.is_public,
    ) else {
        return Ok(Json(current));
    };
    sq_execute(&conn, built).map_err(ApiErr::from_db("update library"))?;

    owned_library(&conn, &id, &user).map(Json)
}

pub async fn delete_library(
    State(db): State<Db>,
    Path(id): Path<String>,
    user: AuthUser,
) -> Result<Json<OkResponse>, ApiErr> {
    let conn = db.conn();
    owned_library(&conn, &id, &user)?;
    sq_execute(&conn, db::libraries::delete(&id)).map_err(ApiErr::from_db("delete library"))?;
    tracing::info!(library_id = %id, "deleted library");
    Ok(Json(OkResponse { ok: true }))
}
