//! Play session (and per-player row) query builders.

use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::{GameSessionPlayers, GameSessions, Games};

/// Column list for session SELECT queries (with the game title joined in).
/// Order must match `session_from_row()` in the server.
fn session_select() -> sea_query::SelectStatement {
    Query::select()
        .column((GameSessions::Table, GameSessions::Id))
        .column((GameSessions::Table, GameSessions::LibraryId))
        .column((GameSessions::Table, GameSessions::GameId))
        .column((Games::Table, Games::Title))
        .column((GameSessions::Table, GameSessions::PlayedAt))
        .column((GameSessions::Table, GameSessions::DurationMinutes))
        .column((GameSessions::Table, GameSessions::Location))
        .column((GameSessions::Table, GameSessions::Notes))
        .column((GameSessions::Table, GameSessions::BggPlayId))
        .column((GameSessions::Table, GameSessions::CreatedAt))
        .from(GameSessions::Table)
        .inner_join(
            Games::Table,
            Expr::col((Games::Table, Games::Id)).equals((GameSessions::Table, GameSessions::GameId)),
        )
        .to_owned()
}

/// Parameters shared by session INSERT and the import UPDATE.
pub struct SessionParams<'a> {
    pub id: &'a str,
    pub library_id: &'a str,
    pub game_id: &'a str,
    pub played_at: &'a str,
    pub duration_minutes: Option<i64>,
    pub location: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub bgg_play_id: Option<&'a str>,
}

pub fn insert(p: &SessionParams<'_>) -> Built {
    Query::insert()
        .into_table(GameSessions::Table)
        .columns([
            GameSessions::Id,
            GameSessions::LibraryId,
            GameSessions::GameId,
            GameSessions::PlayedAt,
            GameSessions::DurationMinutes,
            GameSessions::Location,
            GameSessions::Notes,
            GameSessions::BggPlayId,
        ])
        .values_panic([
            p.id.into(),
            p.library_id.into(),
            p.game_id.into(),
            p.played_at.into(),
            p.duration_minutes.into(),
            p.location.map(|s| s.to_string()).into(),
            p.notes.map(|s| s.to_string()).into(),
            p.bgg_play_id.map(|s| s.to_string()).into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Overwrite an existing session's fields in place (import update mode).
pub fn overwrite(p: &SessionParams<'_>) -> Built {
    Query::update()
        .table(GameSessions::Table)
        .values([
            (GameSessions::GameId, p.game_id.into()),
            (GameSessions::PlayedAt, p.played_at.into()),
            (GameSessions::DurationMinutes, p.duration_minutes.into()),
            (
                GameSessions::Location,
                p.location.map(|s| s.to_string()).into(),
            ),
            (GameSessions::Notes, p.notes.map(|s| s.to_string()).into()),
        ])
        .and_where(Expr::col(GameSessions::Id).eq(p.id))
        .build(SqliteQueryBuilder)
}

/// Id of the session carrying `bgg_play_id` in a library, if any.
pub fn find_by_bgg_play_id(library_id: &str, bgg_play_id: &str) -> Built {
    Query::select()
        .column(GameSessions::Id)
        .from(GameSessions::Table)
        .and_where(Expr::col(GameSessions::LibraryId).eq(library_id))
        .and_where(Expr::col(GameSessions::BggPlayId).eq(bgg_play_id))
        .build(SqliteQueryBuilder)
}

pub fn get(library_id: &str, id: &str) -> Built {
    session_select()
        .and_where(Expr::col((GameSessions::Table, GameSessions::Id)).eq(id))
        .and_where(Expr::col((GameSessions::Table, GameSessions::LibraryId)).eq(library_id))
        .build(SqliteQueryBuilder)
}

/// Sessions of a library, newest play first.
pub fn list_by_library(library_id: &str, limit: u64) -> Built {
    session_select()
        .and_where(Expr::col((GameSessions::Table, GameSessions::LibraryId)).eq(library_id))
        .order_by((GameSessions::Table, GameSessions::PlayedAt), Order::Desc)
        .order_by((GameSessions::Table, GameSessions::CreatedAt), Order::Desc)
        .limit(limit)
        .build(SqliteQueryBuilder)
}

pub fn delete(library_id: &str, id: &str) -> Built {
    Query::delete()
        .from_table(GameSessions::Table)
        .and_where(Expr::col(GameSessions::Id).eq(id))
        .and_where(Expr::col(GameSessions::LibraryId).eq(library_id))
        .build(SqliteQueryBuilder)
}

// ── Players ────────────────────────────────────────────────────────────────

pub struct PlayerParams<'a> {
    pub id: &'a str,
    pub session_id: &'a str,
    pub player_name: &'a str,
    pub bgg_username: Option<&'a str>,
    pub score: Option<&'a str>,
    pub is_winner: bool,
    pub is_first_play: bool,
    pub color: Option<&'a str>,
}

pub fn player_insert(p: &PlayerParams<'_>) -> Built {
    Query::insert()
        .into_table(GameSessionPlayers::Table)
        .columns([
            GameSessionPlayers::Id,
            GameSessionPlayers::SessionId,
            GameSessionPlayers::PlayerName,
            GameSessionPlayers::BggUsername,
            GameSessionPlayers::Score,
            GameSessionPlayers::IsWinner,
            GameSessionPlayers::IsFirstPlay,
            GameSessionPlayers::Color,
        ])
        .values_panic([
            p.id.into(),
            p.session_id.into(),
            p.player_name.into(),
            p.bgg_username.map(|s| s.to_string()).into(),
            p.score.map(|s| s.to_string()).into(),
            p.is_winner.into(),
            p.is_first_play.into(),
            p.color.map(|s| s.to_string()).into(),
        ])
        .build(SqliteQueryBuilder)
}

pub fn players_delete(session_id: &str) -> Built {
    Query::delete()
        .from_table(GameSessionPlayers::Table)
        .and_where(Expr::col(GameSessionPlayers::SessionId).eq(session_id))
        .build(SqliteQueryBuilder)
}

/// Players of one session. Order must match `player_from_row()`.
pub fn players_list(session_id: &str) -> Built {
    Query::select()
        .columns([
            GameSessionPlayers::Id,
            GameSessionPlayers::PlayerName,
            GameSessionPlayers::BggUsername,
            GameSessionPlayers::Score,
            GameSessionPlayers::IsWinner,
            GameSessionPlayers::IsFirstPlay,
            GameSessionPlayers::Color,
        ])
        .from(GameSessionPlayers::Table)
        .and_where(Expr::col(GameSessionPlayers::SessionId).eq(session_id))
        .order_by(GameSessionPlayers::PlayerName, Order::Asc)
        .build(SqliteQueryBuilder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_joins_game_title() {
        let (sql, _) = list_by_library("lib-1", 50);
        assert!(sql.contains("INNER JOIN \"games\""));
        assert!(sql.contains("ORDER BY \"game_sessions\".\"played_at\" DESC"));
        assert!(sql.contains("LIMIT"));
    }

    #[test]
    fn overwrite_keeps_dedup_key() {
        let (sql, _) = overwrite(&SessionParams {
            id: "s1",
            library_id: "l1",
            game_id: "g1",
            played_at: "2024-01-01",
            duration_minutes: Some(60),
            location: None,
            notes: None,
            bgg_play_id: Some("12345"),
        });
        assert!(!sql.contains("bgg_play_id"));
        assert!(!sql.contains("library_id"));
    }
}
