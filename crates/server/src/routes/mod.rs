pub mod auth;
pub mod events;
pub mod functions;
pub mod games;
pub mod health;
pub mod libraries;
pub mod loans;
pub mod messages;
pub mod polls;
pub mod sessions;
pub mod tournaments;
pub mod trades;

use rusqlite::Connection;

use gametaverns_api::{LibraryResponse, db};

use crate::error::ApiErr;
use crate::routes::auth::AuthUser;
use crate::storage::{library_from_row, sq_query_opt};

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn load_library(conn: &Connection, id: &str) -> Result<LibraryResponse, ApiErr> {
    sq_query_opt(conn, db::libraries::get_by_id(id), library_from_row)
        .map_err(ApiErr::from_db("load library"))?
        .ok_or_else(|| ApiErr::not_found("library not found"))
}

pub(crate) fn can_manage(library: &LibraryResponse, user: &AuthUser) -> bool {
    user.is_admin || library.owner_id == user.user_id
}

/// Load a library the caller may mutate: 404 if missing, 403 otherwise.
pub(crate) fn owned_library(
    conn: &Connection,
    id: &str,
    user: &AuthUser,
) -> Result<LibraryResponse, ApiErr> {
    let library = load_library(conn, id)?;
    if !can_manage(&library, user) {
        return Err(ApiErr::forbidden("only the library owner can do this"));
    }
    Ok(library)
}

/// Load a library the caller may read. Private libraries look missing to
/// everyone but their owner.
pub(crate) fn visible_library(
    conn: &Connection,
    id: &str,
    user: Option<&AuthUser>,
) -> Result<LibraryResponse, ApiErr> {
    let library = load_library(conn, id)?;
    if !library.is_public && !user.is_some_and(|u| can_manage(&library, u)) {
        return Err(ApiErr::not_found("library not found"));
    }
    Ok(library)
}

/// Trim and drop empty optional text.
pub(crate) fn clean(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
