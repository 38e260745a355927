//! Game loan query builders.

use sea_query::{Alias, Asterisk, Expr, Func, Order, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::GameLoans;
use crate::LoanStatus;

/// Column list for loan SELECT queries.
/// Order must match `loan_from_row()` in the server.
fn loan_select() -> sea_query::SelectStatement {
    Query::select()
        .columns([
            GameLoans::Id,
            GameLoans::LibraryId,
            GameLoans::GameId,
            GameLoans::BorrowerId,
            GameLoans::Status,
            GameLoans::Notes,
            GameLoans::DueDate,
            GameLoans::RequestedAt,
            GameLoans::ApprovedAt,
            GameLoans::BorrowedAt,
            GameLoans::ReturnedAt,
        ])
        .from(GameLoans::Table)
        .to_owned()
}

pub fn insert(
    id: &str,
    library_id: &str,
    game_id: &str,
    borrower_id: &str,
    notes: Option<&str>,
    due_date: Option<&str>,
) -> Built {
    Query::insert()
        .into_table(GameLoans::Table)
        .columns([
            GameLoans::Id,
            GameLoans::LibraryId,
            GameLoans::GameId,
            GameLoans::BorrowerId,
            GameLoans::Status,
            GameLoans::Notes,
            GameLoans::DueDate,
        ])
        .values_panic([
            id.into(),
            library_id.into(),
            game_id.into(),
            borrower_id.into(),
            LoanStatus::Requested.as_str().into(),
            notes.map(|s| s.to_string()).into(),
            due_date.map(|s| s.to_string()).into(),
        ])
        .build(SqliteQueryBuilder)
}

pub fn get(id: &str) -> Built {
    loan_select()
        .and_where(Expr::col(GameLoans::Id).eq(id))
        .build(SqliteQueryBuilder)
}

pub fn list_by_library(library_id: &str) -> Built {
    loan_select()
        .and_where(Expr::col(GameLoans::LibraryId).eq(library_id))
        .order_by(GameLoans::RequestedAt, Order::Desc)
        .build(SqliteQueryBuilder)
}

pub fn list_by_borrower(borrower_id: &str) -> Built {
    loan_select()
        .and_where(Expr::col(GameLoans::BorrowerId).eq(borrower_id))
        .order_by(GameLoans::RequestedAt, Order::Desc)
        .build(SqliteQueryBuilder)
}

/// Number of loans currently holding a copy of `game_id`.
pub fn count_held(game_id: &str) -> Built {
    let held: Vec<&str> = LoanStatus::ALL
        .iter()
        .filter(|s| s.holds_copy())
        .map(LoanStatus::as_str)
        .collect();
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"))
        .from(GameLoans::Table)
        .and_where(Expr::col(GameLoans::GameId).eq(game_id))
        .and_where(Expr::col(GameLoans::Status).is_in(held))
        .build(SqliteQueryBuilder)
}

/// Move a loan to `next`, stamping the matching timestamp column.
/// The `status = current` guard makes a concurrent transition a no-op.
pub fn transition(id: &str, current: LoanStatus, next: LoanStatus) -> Built {
    let mut q = Query::update();
    q.table(GameLoans::Table)
        .value(GameLoans::Status, next.as_str())
        .value(GameLoans::UpdatedAt, Expr::cust("datetime('now')"));
    match next {
        LoanStatus::Approved => {
            q.value(GameLoans::ApprovedAt, Expr::cust("datetime('now')"));
        }
        LoanStatus::Active => {
            q.value(GameLoans::BorrowedAt, Expr::cust("datetime('now')"));
        }
        LoanStatus::Returned => {
            q.value(GameLoans::ReturnedAt, Expr::cust("datetime('now')"));
        }
        _ => {}
    }
    q.and_where(Expr::col(GameLoans::Id).eq(id))
        .and_where(Expr::col(GameLoans::Status).eq(current.as_str()))
        .build(SqliteQueryBuilder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_held_filters_on_holding_statuses() {
        let (sql, values) = count_held("g1");
        assert!(sql.contains("IN (?, ?)"));
        assert_eq!(values.0.len(), 3);
        let held: Vec<String> = values.0[1..].iter().map(|v| format!("{v:?}")).collect();
        assert!(held.iter().any(|v| v.contains("approved")));
        assert!(held.iter().any(|v| v.contains("active")));
    }

    #[test]
    fn transition_stamps_timestamp() {
        let (sql, _) = transition("l1", LoanStatus::Approved, LoanStatus::Active);
        assert!(sql.contains("\"borrowed_at\" = datetime('now')"));
        assert!(!sql.contains("\"returned_at\""));
        let (sql, _) = transition("l1", LoanStatus::Requested, LoanStatus::Declined);
        assert!(!sql.contains("\"approved_at\""));
    }
}
