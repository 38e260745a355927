use anyhow::{Context, Result};

use gametaverns_api::LibraryResponse;

use crate::config::CliConfig;
use crate::server::{authed_client, public_client};

pub async fn run_list(config: &CliConfig, mine: bool, json: bool) -> Result<()> {
    let libraries = if mine {
        authed_client(config)?.my_libraries().await
    } else {
        public_client(config)?.public_libraries().await
    }
    .context("listing libraries")?
    .libraries;

    if json {
        println!("{}", serde_json::to_string_pretty(&libraries)?);
        return Ok(());
    }
    if libraries.is_empty() {
        println!("No libraries.");
    }
    for library in &libraries {
        println!("{}", library_line(library));
    }
    Ok(())
}

/// Show a library with its games and most recent plays.
pub async fn run_show(config: &CliConfig, slug: &str, recent: u32) -> Result<()> {
    let client = public_client(config)?;
    let library = client
        .library_by_slug(slug)
        .await
        .with_context(|| format!("looking up library '{slug}'"))?;
    let games = client.list_games(&library.id).await?.games;
    let sessions = client.list_sessions(&library.id, Some(recent)).await?.sessions;

    println!("{}", library_line(&library));
    if let Some(description) = &library.description {
        println!("  {description}");
    }
    println!();
    println!("Games ({}):", games.len());
    for game in &games {
        let bgg = game
            .bgg_id
            .as_deref()
            .map(|id| format!("  bgg:{id}"))
            .unwrap_or_default();
        let trade = if game.is_for_trade { "  [for trade]" } else { "" };
        println!("  {} x{}{bgg}{trade}", game.title, game.copies_owned);
    }
    println!();
    println!("Recent plays:");
    for session in &sessions {
        let players: Vec<&str> = session
            .players
            .iter()
            .map(|p| p.player_name.as_str())
            .collect();
        println!(
            "  {}  {}  {}",
            session.played_at,
            session.game_title,
            players.join(", ")
        );
    }
    Ok(())
}

fn library_line(library: &LibraryResponse) -> String {
    let visibility = if library.is_public { "public" } else { "private" };
    format!("{:<24} {} ({visibility})", library.slug, library.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_shows_slug_and_visibility() {
        let library = LibraryResponse {
            id: "1".into(),
            owner_id: "u".into(),
            slug: "tavern".into(),
            name: "The Tavern".into(),
            description: None,
            is_public: false,
            created_at: "2024-01-01 00:00:00".into(),
        };
        let line = library_line(&library);
        assert!(line.starts_with("tavern "));
        assert!(line.ends_with("The Tavern (private)"));
    }
}
