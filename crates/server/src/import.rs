//! BGG play import: match fetched plays to library games and write them as
//! play sessions.
//!
//! Every expanded record is written in its own transaction. A failure on one
//! record is counted and reported while the rest carry on.

use rusqlite::Connection;

use gametaverns_api::service::GameCatalog;
use gametaverns_api::{BggImportResponse, db};
use gametaverns_bgg::{BggPlay, BggPlayer};

use crate::routes::new_id;
use crate::storage::{sq_execute, sq_query_map, sq_query_opt};

const ANONYMOUS_PLAYER: &str = "Anonymous";

enum Outcome {
    Imported,
    Updated,
    Skipped,
}

/// Write `plays` into `library_id`. Only the catalog lookup can fail the
/// whole run; per-record errors land in the report.
pub fn apply_plays(
    conn: &Connection,
    library_id: &str,
    plays: &[BggPlay],
    update_existing: bool,
) -> rusqlite::Result<BggImportResponse> {
    let games = sq_query_map(conn, db::games::catalog(library_id), |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;
    let catalog = GameCatalog::new(games);

    let mut report = BggImportResponse {
        success: true,
        ..Default::default()
    };

    for play in plays {
        for key in play.dedup_keys() {
            report.total_plays += 1;

            let Some(game_id) = catalog.find(play.game_bgg_id.as_deref(), &play.game_name) else {
                let title = play.game_name.trim();
                if !report.unmatched_games.iter().any(|t| t == title) {
                    report.unmatched_games.push(title.to_string());
                }
                continue;
            };

            match write_record(conn, library_id, game_id, &key, play, update_existing) {
                Ok(Outcome::Imported) => report.imported += 1,
                Ok(Outcome::Updated) => report.updated += 1,
                Ok(Outcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    tracing::warn!(library_id, play = %key, "failed to import play: {e}");
                    report.failed += 1;
                    report.errors.push(format!("play {key}: {e}"));
                }
            }
        }
    }

    tracing::info!(
        library_id,
        imported = report.imported,
        updated = report.updated,
        skipped = report.skipped,
        failed = report.failed,
        unmatched = report.unmatched_games.len(),
        "BGG import finished"
    );
    Ok(report)
}

fn write_record(
    conn: &Connection,
    library_id: &str,
    game_id: &str,
    key: &str,
    play: &BggPlay,
    update_existing: bool,
) -> rusqlite::Result<Outcome> {
    let existing = sq_query_opt(
        conn,
        db::sessions::find_by_bgg_play_id(library_id, key),
        |row| row.get::<_, String>(0),
    )?;
    if existing.is_some() && !update_existing {
        return Ok(Outcome::Skipped);
    }

    let tx = conn.unchecked_transaction()?;
    let (session_id, outcome) = match existing {
        Some(id) => (id, Outcome::Updated),
        None => (new_id(), Outcome::Imported),
    };
    let params = db::sessions::SessionParams {
        id: &session_id,
        library_id,
        game_id,
        played_at: &play.date,
        duration_minutes: play.length_minutes,
        location: play.location.as_deref(),
        notes: play.comments.as_deref(),
        bgg_play_id: Some(key),
    };

    match outcome {
        Outcome::Updated => {
            sq_execute(&tx, db::sessions::overwrite(&params))?;
            sq_execute(&tx, db::sessions::players_delete(&session_id))?;
        }
        _ => {
            sq_execute(&tx, db::sessions::insert(&params))?;
        }
    }
    for player in &play.players {
        insert_player(&tx, &session_id, player)?;
    }

    tx.commit()?;
    Ok(outcome)
}

fn insert_player(conn: &Connection, session_id: &str, player: &BggPlayer) -> rusqlite::Result<usize> {
    let name = match player.display_name().trim() {
        "" => ANONYMOUS_PLAYER,
        name => name,
    };
    sq_execute(
        conn,
        db::sessions::player_insert(&db::sessions::PlayerParams {
            id: &new_id(),
            session_id,
            player_name: name,
            bgg_username: player.username.as_deref(),
            score: player.score.as_deref(),
            is_winner: player.win,
            is_first_play: player.new,
            color: player.color.as_deref(),
        }),
    )
}
