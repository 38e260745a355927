//! Trade want-list and for-trade query builders.

use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::{Games, Libraries, TradeWants};

pub fn want_insert(
    id: &str,
    user_id: &str,
    title: &str,
    bgg_id: Option<&str>,
    notes: Option<&str>,
) -> Built {
    Query::insert()
        .into_table(TradeWants::Table)
        .columns([
            TradeWants::Id,
            TradeWants::UserId,
            TradeWants::Title,
            TradeWants::BggId,
            TradeWants::Notes,
        ])
        .values_panic([
            id.into(),
            user_id.into(),
            title.into(),
            bgg_id.map(|s| s.to_string()).into(),
            notes.map(|s| s.to_string()).into(),
        ])
        .build(SqliteQueryBuilder)
}

/// A user's wants. Order must match `want_from_row()`.
pub fn wants_by_user(user_id: &str) -> Built {
    Query::select()
        .columns([
            TradeWants::Id,
            TradeWants::UserId,
            TradeWants::Title,
            TradeWants::BggId,
            TradeWants::Notes,
            TradeWants::CreatedAt,
        ])
        .from(TradeWants::Table)
        .and_where(Expr::col(TradeWants::UserId).eq(user_id))
        .order_by(TradeWants::CreatedAt, Order::Desc)
        .build(SqliteQueryBuilder)
}

pub fn want_delete(user_id: &str, id: &str) -> Built {
    Query::delete()
        .from_table(TradeWants::Table)
        .and_where(Expr::col(TradeWants::Id).eq(id))
        .and_where(Expr::col(TradeWants::UserId).eq(user_id))
        .build(SqliteQueryBuilder)
}

/// Games flagged for trade in libraries *not* owned by `user_id`:
/// `(game_id, title, bgg_id, library_id, library_name, owner_id)`.
pub fn offers_excluding_owner(user_id: &str) -> Built {
    Query::select()
        .column((Games::Table, Games::Id))
        .column((Games::Table, Games::Title))
        .column((Games::Table, Games::BggId))
        .column((Libraries::Table, Libraries::Id))
        .column((Libraries::Table, Libraries::Name))
        .column((Libraries::Table, Libraries::OwnerId))
        .from(Games::Table)
        .inner_join(
            Libraries::Table,
            Expr::col((Libraries::Table, Libraries::Id)).equals((Games::Table, Games::LibraryId)),
        )
        .and_where(Expr::col((Games::Table, Games::IsForTrade)).eq(true))
        .and_where(Expr::col((Libraries::Table, Libraries::OwnerId)).ne(user_id))
        .order_by((Games::Table, Games::Title), Order::Asc)
        .build(SqliteQueryBuilder)
}
