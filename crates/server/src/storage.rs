use anyhow::{Context, Result};
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{Connection, OptionalExtension, Row, params_from_iter};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gametaverns_api::db::Built;
use gametaverns_api::db::migrations::MIGRATIONS;
use gametaverns_api::{
    EventResponse, GameResponse, LibraryResponse, LoanResponse, LoanStatus, MatchResponse,
    MessageResponse, PlayerResponse, PollStatus, RegistrationResponse, RegistrationStatus,
    SessionResponse, TournamentPlayerResponse, TradeWantResponse,
};

/// Shared database state
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    /// Lock the connection. Never hold the guard across an `.await`.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Initialize the database: open connection, enable WAL, run migrations
pub fn init_db(data_dir: &Path) -> Result<Db> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;
    let db_path = data_dir.join("gametaverns.db");
    let conn = Connection::open(&db_path).context("opening SQLite database")?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    prepare(conn)
}

/// Fresh in-memory database with the full schema, for tests and dry runs.
pub fn open_in_memory() -> Result<Db> {
    let conn = Connection::open_in_memory().context("opening in-memory SQLite database")?;
    prepare(conn)
}

fn prepare(conn: Connection) -> Result<Db> {
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    run_migrations(&conn)?;
    Ok(Db {
        conn: Arc::new(Mutex::new(conn)),
    })
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .with_context(|| format!("checking migration {name}"))?;

        if !already_applied {
            conn.execute_batch(sql)
                .with_context(|| format!("running migration {name}"))?;
            conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])?;
            tracing::info!("applied migration: {name}");
        }
    }

    Ok(())
}

// ─── sea-query bridge ───────────────────────────────────────────────────────

fn to_sql_values(values: &sea_query::Values) -> Vec<SqlValue> {
    values
        .0
        .iter()
        .map(|v| match v {
            sea_query::Value::Bool(Some(b)) => SqlValue::Integer(i64::from(*b)),
            sea_query::Value::TinyInt(Some(i)) => SqlValue::Integer(i64::from(*i)),
            sea_query::Value::SmallInt(Some(i)) => SqlValue::Integer(i64::from(*i)),
            sea_query::Value::Int(Some(i)) => SqlValue::Integer(i64::from(*i)),
            sea_query::Value::BigInt(Some(i)) => SqlValue::Integer(*i),
            sea_query::Value::TinyUnsigned(Some(i)) => SqlValue::Integer(i64::from(*i)),
            sea_query::Value::SmallUnsigned(Some(i)) => SqlValue::Integer(i64::from(*i)),
            sea_query::Value::Unsigned(Some(i)) => SqlValue::Integer(i64::from(*i)),
            sea_query::Value::BigUnsigned(Some(i)) => {
                SqlValue::Integer(i64::try_from(*i).unwrap_or(i64::MAX))
            }
            sea_query::Value::Float(Some(f)) => SqlValue::Real(f64::from(*f)),
            sea_query::Value::Double(Some(f)) => SqlValue::Real(*f),
            sea_query::Value::String(Some(s)) => SqlValue::Text(s.as_str().to_string()),
            sea_query::Value::Char(Some(c)) => SqlValue::Text(c.to_string()),
            sea_query::Value::Bytes(Some(b)) => SqlValue::Blob(b.as_slice().to_vec()),
            _ => SqlValue::Null,
        })
        .collect()
}

pub fn sq_execute(conn: &Connection, (sql, values): Built) -> rusqlite::Result<usize> {
    conn.execute(&sql, params_from_iter(to_sql_values(&values)))
}

pub fn sq_query_row<T>(
    conn: &Connection,
    (sql, values): Built,
    f: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<T> {
    conn.query_row(&sql, params_from_iter(to_sql_values(&values)), f)
}

/// Like [`sq_query_row`] but `Ok(None)` when no row matches.
pub fn sq_query_opt<T>(
    conn: &Connection,
    built: Built,
    f: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Option<T>> {
    sq_query_row(conn, built, f).optional()
}

pub fn sq_query_map<T>(
    conn: &Connection,
    (sql, values): Built,
    f: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(to_sql_values(&values)), f)?;
    rows.collect()
}

/// Run a single-column `COUNT(*)` query.
pub fn sq_count(conn: &Connection, built: Built) -> rusqlite::Result<i64> {
    sq_query_row(conn, built, |row| row.get(0))
}

// ─── Row mappers ────────────────────────────────────────────────────────────
// Column orders follow the builders in `gametaverns_api::db`.

fn text_enum<T>(row: &Row<'_>, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unexpected status value {raw:?}").into(),
        )
    })
}

pub fn library_from_row(row: &Row<'_>) -> rusqlite::Result<LibraryResponse> {
    Ok(LibraryResponse {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        slug: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        is_public: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn game_from_row(row: &Row<'_>) -> rusqlite::Result<GameResponse> {
    Ok(GameResponse {
        id: row.get(0)?,
        library_id: row.get(1)?,
        title: row.get(2)?,
        bgg_id: row.get(3)?,
        copies_owned: row.get(4)?,
        is_for_trade: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Session row without players; callers attach them.
pub fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionResponse> {
    Ok(SessionResponse {
        id: row.get(0)?,
        library_id: row.get(1)?,
        game_id: row.get(2)?,
        game_title: row.get(3)?,
        played_at: row.get(4)?,
        duration_minutes: row.get(5)?,
        location: row.get(6)?,
        notes: row.get(7)?,
        bgg_play_id: row.get(8)?,
        created_at: row.get(9)?,
        players: Vec::new(),
    })
}

pub fn player_from_row(row: &Row<'_>) -> rusqlite::Result<PlayerResponse> {
    Ok(PlayerResponse {
        id: row.get(0)?,
        player_name: row.get(1)?,
        bgg_username: row.get(2)?,
        score: row.get(3)?,
        is_winner: row.get(4)?,
        is_first_play: row.get(5)?,
        color: row.get(6)?,
    })
}

pub fn loan_from_row(row: &Row<'_>) -> rusqlite::Result<LoanResponse> {
    Ok(LoanResponse {
        id: row.get(0)?,
        library_id: row.get(1)?,
        game_id: row.get(2)?,
        borrower_id: row.get(3)?,
        status: text_enum(row, 4, LoanStatus::parse)?,
        notes: row.get(5)?,
        due_date: row.get(6)?,
        requested_at: row.get(7)?,
        approved_at: row.get(8)?,
        borrowed_at: row.get(9)?,
        returned_at: row.get(10)?,
    })
}

pub fn want_from_row(row: &Row<'_>) -> rusqlite::Result<TradeWantResponse> {
    Ok(TradeWantResponse {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        bgg_id: row.get(3)?,
        notes: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn event_from_row(row: &Row<'_>) -> rusqlite::Result<EventResponse> {
    Ok(EventResponse {
        id: row.get(0)?,
        library_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        event_date: row.get(4)?,
        location: row.get(5)?,
        max_attendees: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub fn registration_from_row(row: &Row<'_>) -> rusqlite::Result<RegistrationResponse> {
    Ok(RegistrationResponse {
        id: row.get(0)?,
        event_id: row.get(1)?,
        attendee_name: row.get(2)?,
        attendee_email: row.get(3)?,
        status: text_enum(row, 4, RegistrationStatus::parse)?,
        waitlist_position: row.get(5)?,
        registered_at: row.get(6)?,
    })
}

pub fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageResponse> {
    Ok(MessageResponse {
        id: row.get(0)?,
        library_id: row.get(1)?,
        game_id: row.get(2)?,
        sender_name: row.get(3)?,
        sender_email: row.get(4)?,
        message: row.get(5)?,
        is_read: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Poll header columns; options are loaded separately.
pub struct PollRow {
    pub id: String,
    pub library_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: PollStatus,
    pub max_votes_per_voter: i64,
    pub created_at: String,
}

pub fn poll_from_row(row: &Row<'_>) -> rusqlite::Result<PollRow> {
    Ok(PollRow {
        id: row.get(0)?,
        library_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: text_enum(row, 4, PollStatus::parse)?,
        max_votes_per_voter: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub struct TournamentRow {
    pub id: String,
    pub library_id: String,
    pub name: String,
    pub game_id: Option<String>,
    pub created_at: String,
}

pub fn tournament_from_row(row: &Row<'_>) -> rusqlite::Result<TournamentRow> {
    Ok(TournamentRow {
        id: row.get(0)?,
        library_id: row.get(1)?,
        name: row.get(2)?,
        game_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub fn tournament_player_from_row(row: &Row<'_>) -> rusqlite::Result<TournamentPlayerResponse> {
    Ok(TournamentPlayerResponse {
        id: row.get(0)?,
        player_name: row.get(1)?,
        seed: row.get(2)?,
        wins: row.get(3)?,
        losses: row.get(4)?,
    })
}

pub fn match_from_row(row: &Row<'_>) -> rusqlite::Result<MatchResponse> {
    Ok(MatchResponse {
        id: row.get(0)?,
        round: row.get(1)?,
        player1_id: row.get(2)?,
        player2_id: row.get(3)?,
        winner_id: row.get(4)?,
        played_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gametaverns_api::db;

    #[test]
    fn init_db_creates_file_and_is_rerunnable() {
        let dir = tempfile::tempdir().unwrap();
        init_db(dir.path()).unwrap();
        assert!(dir.path().join("gametaverns.db").exists());

        let db = init_db(dir.path()).unwrap();
        let applied: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM _migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }

    #[test]
    fn sea_query_values_bind() {
        let db = open_in_memory().unwrap();
        let conn = db.conn();
        sq_execute(&conn, db::users::insert("u1", "alice", "hash", true)).unwrap();

        let (id, name, admin): (String, String, bool) =
            sq_query_row(&conn, db::users::get_by_key_hash("hash"), |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .unwrap();
        assert_eq!((id.as_str(), name.as_str(), admin), ("u1", "alice", true));

        let missing = sq_query_opt(&conn, db::users::get_by_key_hash("nope"), |r| {
            r.get::<_, String>(0)
        })
        .unwrap();
        assert!(missing.is_none());
        assert_eq!(sq_count(&conn, db::users::count()).unwrap(), 1);
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let db = open_in_memory().unwrap();
        let conn = db.conn();
        let err = sq_execute(
            &conn,
            db::libraries::insert("l1", "ghost", "ghost-lib", "Ghost", None, true),
        )
        .unwrap_err();
        assert!(crate::error::is_constraint_violation(&err));
    }
}
