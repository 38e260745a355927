use axum::{
    Json,
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts, State},
    http::{StatusCode, request::Parts},
};
use uuid::Uuid;

use gametaverns_api::{
    MeResponse, RegisterRequest, RegisterResponse, crypto, db, service,
};

use crate::AppConfig;
use crate::error::{ApiErr, ApiJson, is_constraint_violation};
use crate::storage::{Db, sq_count, sq_execute, sq_query_opt};

// ---------------------------------------------------------------------------
// Auth extractor
// ---------------------------------------------------------------------------

/// Authenticated user extracted from the `Authorization: Bearer <api_key>` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub display_name: String,
    pub is_admin: bool,
}

fn bearer(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|k| !k.is_empty())
}

fn lookup(db: &Db, api_key: &str) -> Result<AuthUser, ApiErr> {
    let conn = db.conn();
    sq_query_opt(
        &conn,
        db::users::get_by_key_hash(&crypto::hash_token(api_key)),
        |row| {
            Ok(AuthUser {
                user_id: row.get(0)?,
                display_name: row.get(1)?,
                is_admin: row.get(2)?,
            })
        },
    )
    .map_err(ApiErr::from_db("auth lookup"))?
    .ok_or_else(|| ApiErr::unauthorized("invalid API key"))
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Db: FromRef<S>,
{
    type Rejection = ApiErr;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let api_key = bearer(parts)
            .ok_or_else(|| ApiErr::unauthorized("missing or invalid Authorization header"))?;
        lookup(&Db::from_ref(state), api_key)
    }
}

/// `Option<AuthUser>`: anonymous when no header is sent, but a bad key is
/// still rejected.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Db: FromRef<S>,
{
    type Rejection = ApiErr;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        match bearer(parts) {
            Some(api_key) => lookup(&Db::from_ref(state), api_key).map(Some),
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Register
// ---------------------------------------------------------------------------

/// POST /api/register. The very first account becomes admin.
pub async fn register(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiErr> {
    let display_name = service::validate_display_name(&req.display_name)?;

    if !config.registration_open {
        return Err(ApiErr::forbidden("registration is currently closed"));
    }

    let user_id = Uuid::new_v4().to_string();
    let api_key = crypto::generate_api_key();

    let conn = db.conn();
    let is_admin = sq_count(&conn, db::users::count()).map_err(ApiErr::from_db("count users"))? == 0;

    match sq_execute(
        &conn,
        db::users::insert(
            &user_id,
            &display_name,
            &crypto::hash_token(&api_key),
            is_admin,
        ),
    ) {
        Ok(_) => {
            tracing::info!(%user_id, is_admin, "registered user");
            Ok((
                StatusCode::CREATED,
                Json(RegisterResponse {
                    user_id,
                    display_name,
                    api_key,
                }),
            ))
        }
        Err(e) if is_constraint_violation(&e) => {
            Err(ApiErr::conflict("display name already taken"))
        }
        Err(e) => Err(ApiErr::from_db("register")(e)),
    }
}

// ---------------------------------------------------------------------------
// Current user
// ---------------------------------------------------------------------------

pub async fn me(user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: user.user_id,
        display_name: user.display_name,
        is_admin: user.is_admin,
    })
}
