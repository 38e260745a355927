//! Library (tenant) query builders.

use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::Libraries;

/// Column list for library SELECT queries.
/// Order must match `library_from_row()` in the server.
fn library_columns(q: &mut sea_query::SelectStatement) -> &mut sea_query::SelectStatement {
    q.column((Libraries::Table, Libraries::Id))
        .column((Libraries::Table, Libraries::OwnerId))
        .column((Libraries::Table, Libraries::Slug))
        .column((Libraries::Table, Libraries::Name))
        .column((Libraries::Table, Libraries::Description))
        .column((Libraries::Table, Libraries::IsPublic))
        .column((Libraries::Table, Libraries::CreatedAt))
}

pub fn insert(
    id: &str,
    owner_id: &str,
    slug: &str,
    name: &str,
    description: Option<&str>,
    is_public: bool,
) -> Built {
    Query::insert()
        .into_table(Libraries::Table)
        .columns([
            Libraries::Id,
            Libraries::OwnerId,
            Libraries::Slug,
            Libraries::Name,
            Libraries::Description,
            Libraries::IsPublic,
        ])
        .values_panic([
            id.into(),
            owner_id.into(),
            slug.into(),
            name.into(),
            description.map(|s| s.to_string()).into(),
            is_public.into(),
        ])
        .build(SqliteQueryBuilder)
}

pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    library_columns(&mut q);
    q.from(Libraries::Table)
        .and_where(Expr::col((Libraries::Table, Libraries::Id)).eq(id))
        .build(SqliteQueryBuilder)
}

pub fn get_by_slug(slug: &str) -> Built {
    let mut q = Query::select().to_owned();
    library_columns(&mut q);
    q.from(Libraries::Table)
        .and_where(Expr::col((Libraries::Table, Libraries::Slug)).eq(slug))
        .build(SqliteQueryBuilder)
}

/// Public libraries, newest first.
pub fn list_public() -> Built {
    let mut q = Query::select().to_owned();
    library_columns(&mut q);
    q.from(Libraries::Table)
        .and_where(Expr::col((Libraries::Table, Libraries::IsPublic)).eq(true))
        .order_by((Libraries::Table, Libraries::CreatedAt), Order::Desc)
        .build(SqliteQueryBuilder)
}

pub fn list_by_owner(owner_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    library_columns(&mut q);
    q.from(Libraries::Table)
        .and_where(Expr::col((Libraries::Table, Libraries::OwnerId)).eq(owner_id))
        .order_by((Libraries::Table, Libraries::CreatedAt), Order::Desc)
        .build(SqliteQueryBuilder)
}

/// Apply the provided fields; `None` leaves a column untouched.
pub fn update(
    id: &str,
    name: Option<&str>,
    description: Option<&str>,
    is_public: Option<bool>,
) -> Option<Built> {
    let mut q = Query::update();
    q.table(Libraries::Table);
    let mut touched = false;
    if let Some(name) = name {
        q.value(Libraries::Name, name);
        touched = true;
    }
    if let Some(description) = description {
        q.value(Libraries::Description, description);
        touched = true;
    }
    if let Some(is_public) = is_public {
        q.value(Libraries::IsPublic, is_public);
        touched = true;
    }
    if !touched {
        return None;
    }
    Some(
        q.and_where(Expr::col(Libraries::Id).eq(id))
            .build(SqliteQueryBuilder),
    )
}

pub fn delete(id: &str) -> Built {
    Query::delete()
        .from_table(Libraries::Table)
        .and_where(Expr::col(Libraries::Id).eq(id))
        .build(SqliteQueryBuilder)
}
