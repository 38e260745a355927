//! Tournament, player, and match query builders.
//!
//! Brackets are entered by hand; nothing here pairs or seeds players.

use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::{TournamentMatches, TournamentPlayers, Tournaments};

pub fn insert(id: &str, library_id: &str, name: &str, game_id: Option<&str>) -> Built {
    Query::insert()
        .into_table(Tournaments::Table)
        .columns([
            Tournaments::Id,
            Tournaments::LibraryId,
            Tournaments::Name,
            Tournaments::GameId,
        ])
        .values_panic([
            id.into(),
            library_id.into(),
            name.into(),
            game_id.map(|s| s.to_string()).into(),
        ])
        .build(SqliteQueryBuilder)
}

/// `(id, library_id, name, game_id, created_at)`.
pub fn get(id: &str) -> Built {
    Query::select()
        .columns([
            Tournaments::Id,
            Tournaments::LibraryId,
            Tournaments::Name,
            Tournaments::GameId,
            Tournaments::CreatedAt,
        ])
        .from(Tournaments::Table)
        .and_where(Expr::col(Tournaments::Id).eq(id))
        .build(SqliteQueryBuilder)
}

pub fn player_insert(id: &str, tournament_id: &str, player_name: &str, seed: Option<i64>) -> Built {
    Query::insert()
        .into_table(TournamentPlayers::Table)
        .columns([
            TournamentPlayers::Id,
            TournamentPlayers::TournamentId,
            TournamentPlayers::PlayerName,
            TournamentPlayers::Seed,
        ])
        .values_panic([
            id.into(),
            tournament_id.into(),
            player_name.into(),
            seed.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// `(id, player_name, seed, wins, losses)`, seeded players first.
pub fn players_list(tournament_id: &str) -> Built {
    Query::select()
        .columns([
            TournamentPlayers::Id,
            TournamentPlayers::PlayerName,
            TournamentPlayers::Seed,
            TournamentPlayers::Wins,
            TournamentPlayers::Losses,
        ])
        .from(TournamentPlayers::Table)
        .and_where(Expr::col(TournamentPlayers::TournamentId).eq(tournament_id))
        .order_by_expr(Expr::col(TournamentPlayers::Seed).is_null(), Order::Asc)
        .order_by(TournamentPlayers::Seed, Order::Asc)
        .order_by(TournamentPlayers::PlayerName, Order::Asc)
        .build(SqliteQueryBuilder)
}

pub fn player_in_tournament(tournament_id: &str, player_id: &str) -> Built {
    Query::select()
        .column(TournamentPlayers::Id)
        .from(TournamentPlayers::Table)
        .and_where(Expr::col(TournamentPlayers::TournamentId).eq(tournament_id))
        .and_where(Expr::col(TournamentPlayers::Id).eq(player_id))
        .build(SqliteQueryBuilder)
}

pub fn add_win(player_id: &str) -> Built {
    Query::update()
        .table(TournamentPlayers::Table)
        .value(
            TournamentPlayers::Wins,
            Expr::col(TournamentPlayers::Wins).add(1),
        )
        .and_where(Expr::col(TournamentPlayers::Id).eq(player_id))
        .build(SqliteQueryBuilder)
}

pub fn add_loss(player_id: &str) -> Built {
    Query::update()
        .table(TournamentPlayers::Table)
        .value(
            TournamentPlayers::Losses,
            Expr::col(TournamentPlayers::Losses).add(1),
        )
        .and_where(Expr::col(TournamentPlayers::Id).eq(player_id))
        .build(SqliteQueryBuilder)
}

// ── Matches ────────────────────────────────────────────────────────────────

pub fn match_insert(
    id: &str,
    tournament_id: &str,
    round: i64,
    player1_id: &str,
    player2_id: &str,
) -> Built {
    Query::insert()
        .into_table(TournamentMatches::Table)
        .columns([
            TournamentMatches::Id,
            TournamentMatches::TournamentId,
            TournamentMatches::Round,
            TournamentMatches::Player1Id,
            TournamentMatches::Player2Id,
        ])
        .values_panic([
            id.into(),
            tournament_id.into(),
            round.into(),
            player1_id.into(),
            player2_id.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Order must match `match_from_row()`.
fn match_select() -> sea_query::SelectStatement {
    Query::select()
        .columns([
            TournamentMatches::Id,
            TournamentMatches::Round,
            TournamentMatches::Player1Id,
            TournamentMatches::Player2Id,
            TournamentMatches::WinnerId,
            TournamentMatches::PlayedAt,
        ])
        .from(TournamentMatches::Table)
        .to_owned()
}

pub fn match_get(tournament_id: &str, id: &str) -> Built {
    match_select()
        .and_where(Expr::col(TournamentMatches::Id).eq(id))
        .and_where(Expr::col(TournamentMatches::TournamentId).eq(tournament_id))
        .build(SqliteQueryBuilder)
}

pub fn matches_list(tournament_id: &str) -> Built {
    match_select()
        .and_where(Expr::col(TournamentMatches::TournamentId).eq(tournament_id))
        .order_by(TournamentMatches::Round, Order::Asc)
        .order_by_expr(Expr::cust("rowid"), Order::Asc)
        .build(SqliteQueryBuilder)
}

/// Record the winner once; a second result for the same match updates nothing.
pub fn match_set_winner(id: &str, winner_id: &str) -> Built {
    Query::update()
        .table(TournamentMatches::Table)
        .values([
            (TournamentMatches::WinnerId, winner_id.into()),
            (TournamentMatches::PlayedAt, Expr::cust("datetime('now')")),
        ])
        .and_where(Expr::col(TournamentMatches::Id).eq(id))
        .and_where(Expr::col(TournamentMatches::WinnerId).is_null())
        .build(SqliteQueryBuilder)
}
