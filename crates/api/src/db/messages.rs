//! Contact message query builders.

use sea_query::{Alias, Asterisk, Expr, Func, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::LibraryMessages;

pub struct InsertParams<'a> {
    pub id: &'a str,
    pub library_id: &'a str,
    pub game_id: Option<&'a str>,
    pub sender_name: &'a str,
    pub sender_email: &'a str,
    pub message: &'a str,
    pub sender_ip_hash: &'a str,
}

pub fn insert(p: &InsertParams<'_>) -> Built {
    Query::insert()
        .into_table(LibraryMessages::Table)
        .columns([
            LibraryMessages::Id,
            LibraryMessages::LibraryId,
            LibraryMessages::GameId,
            LibraryMessages::SenderName,
            LibraryMessages::SenderEmail,
            LibraryMessages::Message,
            LibraryMessages::SenderIpHash,
        ])
        .values_panic([
            p.id.into(),
            p.library_id.into(),
            p.game_id.map(|s| s.to_string()).into(),
            p.sender_name.into(),
            p.sender_email.into(),
            p.message.into(),
            p.sender_ip_hash.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Messages stored for `sender_ip_hash` at or after `since`.
pub fn count_since(sender_ip_hash: &str, since: &str) -> Built {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
        .from(LibraryMessages::Table)
        .and_where(Expr::col(LibraryMessages::SenderIpHash).eq(sender_ip_hash))
        .and_where(Expr::col(LibraryMessages::CreatedAt).gte(since))
        .build(SqliteQueryBuilder)
}

/// Inbox of a library, newest first. Order must match `message_from_row()`.
pub fn list_by_library(library_id: &str) -> Built {
    Query::select()
        .columns([
            LibraryMessages::Id,
            LibraryMessages::LibraryId,
            LibraryMessages::GameId,
            LibraryMessages::SenderName,
            LibraryMessages::SenderEmail,
            LibraryMessages::Message,
            LibraryMessages::IsRead,
            LibraryMessages::CreatedAt,
        ])
        .from(LibraryMessages::Table)
        .and_where(Expr::col(LibraryMessages::LibraryId).eq(library_id))
        .order_by(LibraryMessages::CreatedAt, Order::Desc)
        .build(SqliteQueryBuilder)
}

/// Library that received a message.
pub fn library_of(id: &str) -> Built {
    Query::select()
        .column(LibraryMessages::LibraryId)
        .from(LibraryMessages::Table)
        .and_where(Expr::col(LibraryMessages::Id).eq(id))
        .build(SqliteQueryBuilder)
}

pub fn mark_read(id: &str) -> Built {
    Query::update()
        .table(LibraryMessages::Table)
        .value(LibraryMessages::IsRead, true)
        .and_where(Expr::col(LibraryMessages::Id).eq(id))
        .build(SqliteQueryBuilder)
}
