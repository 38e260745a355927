//! Game catalog query builders.

use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::Games;

/// Column list for game SELECT queries.
/// Order must match `game_from_row()` in the server.
fn game_columns(q: &mut sea_query::SelectStatement) -> &mut sea_query::SelectStatement {
    q.column((Games::Table, Games::Id))
        .column((Games::Table, Games::LibraryId))
        .column((Games::Table, Games::Title))
        .column((Games::Table, Games::BggId))
        .column((Games::Table, Games::CopiesOwned))
        .column((Games::Table, Games::IsForTrade))
        .column((Games::Table, Games::CreatedAt))
}

pub struct InsertParams<'a> {
    pub id: &'a str,
    pub library_id: &'a str,
    pub title: &'a str,
    pub bgg_id: Option<&'a str>,
    pub copies_owned: i64,
    pub is_for_trade: bool,
}

pub fn insert(p: &InsertParams<'_>) -> Built {
    Query::insert()
        .into_table(Games::Table)
        .columns([
            Games::Id,
            Games::LibraryId,
            Games::Title,
            Games::BggId,
            Games::CopiesOwned,
            Games::IsForTrade,
        ])
        .values_panic([
            p.id.into(),
            p.library_id.into(),
            p.title.into(),
            p.bgg_id.map(|s| s.to_string()).into(),
            p.copies_owned.into(),
            p.is_for_trade.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// SELECT a game scoped to its library.
pub fn get(library_id: &str, id: &str) -> Built {
    let mut q = Query::select().to_owned();
    game_columns(&mut q);
    q.from(Games::Table)
        .and_where(Expr::col((Games::Table, Games::Id)).eq(id))
        .and_where(Expr::col((Games::Table, Games::LibraryId)).eq(library_id))
        .build(SqliteQueryBuilder)
}

/// SELECT a game by id, whatever library holds it.
pub fn get_by_id(id: &str) -> Built {
    let mut q = Query::select().to_owned();
    game_columns(&mut q);
    q.from(Games::Table)
        .and_where(Expr::col((Games::Table, Games::Id)).eq(id))
        .build(SqliteQueryBuilder)
}

pub fn list_by_library(library_id: &str) -> Built {
    let mut q = Query::select().to_owned();
    game_columns(&mut q);
    q.from(Games::Table)
        .and_where(Expr::col((Games::Table, Games::LibraryId)).eq(library_id))
        .order_by((Games::Table, Games::Title), Order::Asc)
        .build(SqliteQueryBuilder)
}

/// `(id, bgg_id, title)` for every game in a library, oldest first so the
/// earliest entry wins on duplicate titles.
pub fn catalog(library_id: &str) -> Built {
    Query::select()
        .columns([Games::Id, Games::BggId, Games::Title])
        .from(Games::Table)
        .and_where(Expr::col(Games::LibraryId).eq(library_id))
        .order_by(Games::CreatedAt, Order::Asc)
        .order_by(Games::Id, Order::Asc)
        .build(SqliteQueryBuilder)
}

pub struct UpdateParams<'a> {
    pub title: Option<&'a str>,
    pub bgg_id: Option<&'a str>,
    pub copies_owned: Option<i64>,
    pub is_for_trade: Option<bool>,
}

/// Apply the provided fields; `None` leaves a column untouched.
pub fn update(library_id: &str, id: &str, p: &UpdateParams<'_>) -> Option<Built> {
    let mut q = Query::update();
    q.table(Games::Table);
    let mut touched = false;
    if let Some(title) = p.title {
        q.value(Games::Title, title);
        touched = true;
    }
    if let Some(bgg_id) = p.bgg_id {
        q.value(Games::BggId, bgg_id);
        touched = true;
    }
    if let Some(copies) = p.copies_owned {
        q.value(Games::CopiesOwned, copies);
        touched = true;
    }
    if let Some(is_for_trade) = p.is_for_trade {
        q.value(Games::IsForTrade, is_for_trade);
        touched = true;
    }
    if !touched {
        return None;
    }
    Some(
        q.and_where(Expr::col(Games::Id).eq(id))
            .and_where(Expr::col(Games::LibraryId).eq(library_id))
            .build(SqliteQueryBuilder),
    )
}

pub fn delete(library_id: &str, id: &str) -> Built {
    Query::delete()
        .from_table(Games::Table)
        .and_where(Expr::col(Games::Id).eq(id))
        .and_where(Expr::col(Games::LibraryId).eq(library_id))
        .build(SqliteQueryBuilder)
}
