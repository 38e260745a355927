//! User query builders.

use sea_query::{Alias, Asterisk, Expr, Func, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::Users;

/// INSERT a new user. Only the API key hash is stored.
pub fn insert(id: &str, display_name: &str, api_key_hash: &str, is_admin: bool) -> Built {
    Query::insert()
        .into_table(Users::Table)
        .columns([
            Users::Id,
            Users::DisplayName,
            Users::ApiKeyHash,
            Users::IsAdmin,
        ])
        .values_panic([
            id.into(),
            display_name.into(),
            api_key_hash.into(),
            is_admin.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// SELECT id, display_name, is_admin by API key hash.
pub fn get_by_key_hash(api_key_hash: &str) -> Built {
    Query::select()
        .columns([Users::Id, Users::DisplayName, Users::IsAdmin])
        .from(Users::Table)
        .and_where(Expr::col(Users::ApiKeyHash).eq(api_key_hash))
        .build(SqliteQueryBuilder)
}

/// Count all users. The first registered user becomes admin.
pub fn count() -> Built {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
        .from(Users::Table)
        .build(SqliteQueryBuilder)
}
