//! Poll, option, and vote query builders.

use sea_query::{Alias, Asterisk, Expr, Func, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::{PollOptions, PollVotes, Polls};
use crate::PollStatus;

/// Order must match `poll_from_row()`.
fn poll_select() -> sea_query::SelectStatement {
    Query::select()
        .columns([
            Polls::Id,
            Polls::LibraryId,
            Polls::Title,
            Polls::Description,
            Polls::Status,
            Polls::MaxVotesPerVoter,
            Polls::CreatedAt,
        ])
        .from(Polls::Table)
        .to_owned()
}

pub fn insert(
    id: &str,
    library_id: &str,
    title: &str,
    description: Option<&str>,
    max_votes_per_voter: i64,
) -> Built {
    Query::insert()
        .into_table(Polls::Table)
        .columns([
            Polls::Id,
            Polls::LibraryId,
            Polls::Title,
            Polls::Description,
            Polls::MaxVotesPerVoter,
        ])
        .values_panic([
            id.into(),
            library_id.into(),
            title.into(),
            description.map(|s| s.to_string()).into(),
            max_votes_per_voter.into(),
        ])
        .build(SqliteQueryBuilder)
}

pub fn get(id: &str) -> Built {
    poll_select()
        .and_where(Expr::col(Polls::Id).eq(id))
        .build(SqliteQueryBuilder)
}

pub fn list_by_library(library_id: &str) -> Built {
    poll_select()
        .and_where(Expr::col(Polls::LibraryId).eq(library_id))
        .order_by(Polls::CreatedAt, Order::Desc)
        .build(SqliteQueryBuilder)
}

pub fn set_status(id: &str, status: PollStatus) -> Built {
    Query::update()
        .table(Polls::Table)
        .value(Polls::Status, status.as_str())
        .and_where(Expr::col(Polls::Id).eq(id))
        .build(SqliteQueryBuilder)
}

// ── Options ────────────────────────────────────────────────────────────────

pub fn option_insert(
    id: &str,
    poll_id: &str,
    label: &str,
    game_id: Option<&str>,
    position: i64,
) -> Built {
    Query::insert()
        .into_table(PollOptions::Table)
        .columns([
            PollOptions::Id,
            PollOptions::PollId,
            PollOptions::Label,
            PollOptions::GameId,
            PollOptions::Position,
        ])
        .values_panic([
            id.into(),
            poll_id.into(),
            label.into(),
            game_id.map(|s| s.to_string()).into(),
            position.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// `(id, label, game_id)` in display order.
pub fn options_list(poll_id: &str) -> Built {
    Query::select()
        .columns([PollOptions::Id, PollOptions::Label, PollOptions::GameId])
        .from(PollOptions::Table)
        .and_where(Expr::col(PollOptions::PollId).eq(poll_id))
        .order_by(PollOptions::Position, Order::Asc)
        .build(SqliteQueryBuilder)
}

// ── Votes ──────────────────────────────────────────────────────────────────

pub fn vote_insert(id: &str, poll_id: &str, option_id: &str, voter_id: &str) -> Built {
    Query::insert()
        .into_table(PollVotes::Table)
        .columns([
            PollVotes::Id,
            PollVotes::PollId,
            PollVotes::OptionId,
            PollVotes::VoterId,
        ])
        .values_panic([
            id.into(),
            poll_id.into(),
            option_id.into(),
            voter_id.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Votes a voter has cast in a poll.
pub fn count_by_voter(poll_id: &str, voter_id: &str) -> Built {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
        .from(PollVotes::Table)
        .and_where(Expr::col(PollVotes::PollId).eq(poll_id))
        .and_where(Expr::col(PollVotes::VoterId).eq(voter_id))
        .build(SqliteQueryBuilder)
}

pub fn count_by_voter_option(poll_id: &str, option_id: &str, voter_id: &str) -> Built {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
        .from(PollVotes::Table)
        .and_where(Expr::col(PollVotes::PollId).eq(poll_id))
        .and_where(Expr::col(PollVotes::OptionId).eq(option_id))
        .and_where(Expr::col(PollVotes::VoterId).eq(voter_id))
        .build(SqliteQueryBuilder)
}

/// `(option_id, label, votes)` for every option, most votes first.
pub fn tally(poll_id: &str) -> Built {
    Query::select()
        .column((PollOptions::Table, PollOptions::Id))
        .column((PollOptions::Table, PollOptions::Label))
        .expr_as(
            Func::count(Expr::col((PollVotes::Table, PollVotes::Id))),
            Alias::new("votes"),
        )
        .from(PollOptions::Table)
        .left_join(
            PollVotes::Table,
            Expr::col((PollVotes::Table, PollVotes::OptionId))
                .equals((PollOptions::Table, PollOptions::Id)),
        )
        .and_where(Expr::col((PollOptions::Table, PollOptions::PollId)).eq(poll_id))
        .group_by_col((PollOptions::Table, PollOptions::Id))
        .order_by_expr(Expr::cust("votes"), Order::Desc)
        .order_by((PollOptions::Table, PollOptions::Position), Order::Asc)
        .build(SqliteQueryBuilder)
}
