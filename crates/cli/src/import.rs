use anyhow::{Context, Result};

use gametaverns_api::{BggImportRequest, BggImportResponse};

use crate::config::CliConfig;
use crate::server::authed_client;

/// Trigger a BGG play import into the library with `slug`.
pub async fn run_import(
    config: &CliConfig,
    slug: &str,
    bgg_username: &str,
    update_existing: bool,
    json: bool,
) -> Result<()> {
    let client = authed_client(config)?;
    let library = client
        .library_by_slug(slug)
        .await
        .with_context(|| format!("looking up library '{slug}'"))?;

    tracing::info!(library_id = %library.id, bgg_username, "requesting import");
    let report = client
        .import_plays(&BggImportRequest {
            bgg_username: bgg_username.to_string(),
            library_id: library.id,
            update_existing,
        })
        .await
        .context("BGG import failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&library.name, &report));
    }
    Ok(())
}

fn render_report(library_name: &str, report: &BggImportResponse) -> String {
    let mut out = format!(
        "Imported plays into {library_name}: {} new, {} updated, {} skipped, {} failed ({} total)\n",
        report.imported, report.updated, report.skipped, report.failed, report.total_plays
    );
    if !report.unmatched_games.is_empty() {
        out.push_str("Not in this library:\n");
        for title in &report.unmatched_games {
            out.push_str(&format!("  - {title}\n"));
        }
    }
    for error in &report.errors {
        out.push_str(&format!("error: {error}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_unmatched_and_errors() {
        let report = BggImportResponse {
            success: true,
            imported: 3,
            skipped: 1,
            failed: 1,
            total_plays: 6,
            unmatched_games: vec!["Root".into()],
            errors: vec!["play 77: database is locked".into()],
            ..Default::default()
        };
        let text = render_report("Tavern", &report);
        assert!(text.starts_with(
            "Imported plays into Tavern: 3 new, 0 updated, 1 skipped, 1 failed (6 total)\n"
        ));
        assert!(text.contains("  - Root\n"));
        assert!(text.ends_with("error: play 77: database is locked\n"));
    }

    #[test]
    fn clean_report_is_one_line() {
        let report = BggImportResponse {
            success: true,
            imported: 1,
            total_plays: 1,
            ..Default::default()
        };
        assert_eq!(render_report("Tavern", &report).lines().count(), 1);
    }
}
