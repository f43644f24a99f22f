//! Catalog loading and query commands

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::activity::{ActivityLog, LogEntry, LogLevel, MemoryLog, TracingLog};
use crate::catalog::{self, Executable, GameRecord};
use crate::cli::output::{print_error, print_formatted, print_success, status_line, OutputFormat};
use crate::config::Config;
use crate::dialog::{ConsoleDialog, Dialog, NativeDialog};
use crate::loader::{CatalogSource, ChecksumStatus, GameListLoader, LoadPhase, LoadState};
use crate::mirror::{HttpFetcher, MirrorMeta};

/// Extra time allowed past the settle delay before giving up on "done"
const DONE_GRACE: Duration = Duration::from_secs(5);

/// JSON-serializable summary of a catalog load
#[derive(Serialize)]
struct FetchResult {
    phase: LoadPhase,
    source: Option<CatalogSource>,
    games: usize,
    mirror_entries: usize,
    bundled_entries: usize,
    fetch_error: Option<String>,
    mirror_error: Option<String>,
    bundled_error: Option<String>,
    meta: Option<MirrorMeta>,
    meta_age_hours: Option<i64>,
    checksum: ChecksumStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    activity: Option<Vec<LogEntry>>,
}

impl FetchResult {
    fn from_state(state: &LoadState, activity: Option<Vec<LogEntry>>) -> Self {
        Self {
            phase: state.phase,
            source: state.active_source,
            games: state.game_db.len(),
            mirror_entries: state.mirror_len(),
            bundled_entries: state.bundled.data.len(),
            fetch_error: state.fetch_error.clone(),
            mirror_error: state.mirror.error.clone(),
            bundled_error: state.bundled.error.clone(),
            meta: state.mirror_meta.clone(),
            meta_age_hours: state
                .mirror_meta
                .as_ref()
                .and_then(|m| m.age_hours(chrono::Utc::now())),
            checksum: state.checksum_status(),
            activity,
        }
    }
}

/// JSON-serializable game entry
#[derive(Serialize)]
struct GameSummary {
    name: String,
    aliases: Vec<String>,
    executables: Vec<String>,
}

impl From<&GameRecord> for GameSummary {
    fn from(game: &GameRecord) -> Self {
        Self {
            name: game.name.clone(),
            aliases: game.aliases.clone(),
            executables: game.executables.iter().map(describe_executable).collect(),
        }
    }
}

fn describe_executable(exe: &Executable) -> String {
    let mut text = exe.name().to_string();
    if let Some(os) = exe.os() {
        text.push_str(&format!(" [{}]", os));
    }
    if exe.is_launcher() {
        text.push_str(" (launcher)");
    }
    text
}

#[derive(Serialize)]
struct LookupResult {
    executable: String,
    game: Option<GameSummary>,
}

/// Build a loader from the user's configuration
fn build_loader(
    config: &Config,
    log: Arc<dyn ActivityLog>,
    no_dialog: bool,
) -> Result<GameListLoader<HttpFetcher>> {
    let fetcher =
        HttpFetcher::new(config.http_timeout()).context("Failed to create HTTP client")?;

    let dialog: Arc<dyn Dialog> = if no_dialog || !config.loader.native_dialog {
        Arc::new(ConsoleDialog)
    } else {
        Arc::new(NativeDialog)
    };

    Ok(GameListLoader::new(fetcher, log, dialog)
        .with_urls(config.mirror_urls())
        .with_bundled(config.bundled_source())
        .with_settle_delay(config.settle_delay()))
}

/// Load the catalog once and skip the settle window
async fn load_catalog(no_dialog: bool) -> Result<Vec<GameRecord>> {
    let config = Config::load()?;
    let loader = build_loader(&config, Arc::new(TracingLog), no_dialog)?;

    let games = loader.fetch_game_list().await;
    loader.mark_done();

    Ok(games)
}

pub async fn fetch(
    show_log: bool,
    verbose: bool,
    no_dialog: bool,
    format: OutputFormat,
) -> Result<()> {
    let config = Config::load()?;
    let log = Arc::new(MemoryLog::new());
    let loader = build_loader(&config, Arc::clone(&log) as Arc<dyn ActivityLog>, no_dialog)?;

    let mut rx = loader.subscribe();
    loader.fetch_game_list().await;

    // The settle window also gives the metadata request time to land
    let done = tokio::time::timeout(
        config.settle_delay() + DONE_GRACE,
        rx.wait_for(|s| s.all_fetch_done),
    )
    .await
    .is_ok();
    if !done {
        tracing::warn!("Loader did not report completion in time");
        loader.mark_done();
    }

    let state = loader.state();
    let min_level = if verbose { LogLevel::Debug } else { LogLevel::Info };
    let activity = show_log.then(|| log.at_least(min_level));
    let result = FetchResult::from_state(&state, activity);

    print_formatted(&result, format, format_fetch_text);

    Ok(())
}

fn format_fetch_text(r: &FetchResult) -> String {
    let source = match r.source {
        Some(CatalogSource::Mirror) => "mirror",
        Some(CatalogSource::Bundled) => "bundled",
        None => "none",
    };

    let mut lines = vec![
        format!("Status:       {}", r.phase.description()),
        format!("Active list:  {} ({} games)", source, r.games),
    ];

    lines.push(status_line(
        r.mirror_error.is_none(),
        &match &r.mirror_error {
            Some(e) => format!("Mirror: {}", e),
            None => format!("Mirror ({} entries)", r.mirror_entries),
        },
    ));
    lines.push(status_line(
        r.bundled_error.is_none(),
        &match &r.bundled_error {
            Some(e) => format!("Bundled list: {}", e),
            None => format!("Bundled list ({} entries)", r.bundled_entries),
        },
    ));

    match &r.meta {
        Some(meta) => {
            let age = r
                .meta_age_hours
                .map(|h| format!(" ({}h ago)", h))
                .unwrap_or_default();
            lines.push(format!("{}{}", meta.summary(), age));
            if let Some(count) = meta.items_count {
                lines.push(format!("Mirror items: {}", count));
            }
        }
        None => lines.push("Mirror metadata unavailable".to_string()),
    }

    let checksum = match r.checksum {
        ChecksumStatus::Match => "matches mirror metadata",
        ChecksumStatus::Mismatch => "DOES NOT match mirror metadata",
        ChecksumStatus::Unknown => "not verified",
    };
    lines.push(format!("Checksum:     {}", checksum));

    if let Some(error) = &r.fetch_error {
        lines.push(format!("Error: {}", error));
    }

    if let Some(activity) = &r.activity {
        lines.push(String::new());
        lines.push("Activity:".to_string());
        for entry in activity {
            lines.push(format!(
                "  {} [{}] {}",
                entry.timestamp.format("%H:%M:%S%.3f"),
                entry.level,
                entry.message
            ));
        }
    }

    lines.join("\n")
}

pub async fn meta(format: OutputFormat) -> Result<()> {
    let config = Config::load()?;
    let loader = build_loader(&config, Arc::new(TracingLog), true)?;

    let meta = loader.fetch_mirror_meta().await;

    print_formatted(&meta, format, |m| match m {
        Some(meta) => {
            let mut lines = vec![
                format!("Status:       {}", meta.status),
                format!("Last updated: {}", meta.last_updated),
                format!("Source:       {}", meta.source_url),
                format!("SHA-256:      {}", meta.sha256),
            ];
            if let Some(etag) = &meta.etag {
                lines.push(format!("ETag:         {}", etag));
            }
            if let Some(count) = meta.items_count {
                lines.push(format!("Items:        {}", count));
            }
            lines.join("\n")
        }
        None => "Mirror metadata unavailable".to_string(),
    });

    Ok(())
}

pub async fn lookup(
    executable: &str,
    no_dialog: bool,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let games = load_catalog(no_dialog).await?;
    let game = catalog::find_by_executable(&games, executable);

    match (game, format) {
        (None, OutputFormat::Text) => {
            print_error(&format!("No known game uses '{}'", executable));
        }
        _ => {
            let result = LookupResult {
                executable: executable.to_string(),
                game: game.map(GameSummary::from),
            };
            print_formatted(&result, format, |r| match &r.game {
                Some(game) => format_game(game),
                None => String::new(),
            });
        }
    }

    if game.is_some() {
        print_success(&format!("Matched among {} games", games.len()), quiet);
    }

    Ok(())
}

pub async fn search(query: &str, limit: usize, no_dialog: bool, format: OutputFormat) -> Result<()> {
    let games = load_catalog(no_dialog).await?;
    let hits: Vec<GameSummary> = catalog::search(&games, query)
        .into_iter()
        .take(limit)
        .map(GameSummary::from)
        .collect();

    print_formatted(&hits, format, |hits| {
        if hits.is_empty() {
            format!("No games match '{}'", query)
        } else {
            hits.iter().map(format_game).collect::<Vec<_>>().join("\n\n")
        }
    });

    Ok(())
}

fn format_game(game: &GameSummary) -> String {
    let mut lines = vec![game.name.clone()];
    if !game.aliases.is_empty() {
        lines.push(format!("  Aliases:     {}", game.aliases.join(", ")));
    }
    if !game.executables.is_empty() {
        lines.push(format!("  Executables: {}", game.executables.join(", ")));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_summary_flattens_executables() {
        let game = GameRecord {
            name: "Counter-Strike 2".to_string(),
            aliases: vec!["CS2".to_string()],
            executables: vec![
                Executable::Name("cs2.exe".to_string()),
                Executable::Detailed {
                    name: "cs2".to_string(),
                    os: Some("linux".to_string()),
                    is_launcher: false,
                },
                Executable::Detailed {
                    name: "steam.exe".to_string(),
                    os: Some("win32".to_string()),
                    is_launcher: true,
                },
            ],
            id: None,
        };

        let summary = GameSummary::from(&game);
        assert_eq!(
            summary.executables,
            vec!["cs2.exe", "cs2 [linux]", "steam.exe [win32] (launcher)"]
        );
        assert_eq!(
            format_game(&summary),
            "Counter-Strike 2\n  Aliases:     CS2\n  Executables: cs2.exe, cs2 [linux], steam.exe [win32] (launcher)"
        );
    }

    #[test]
    fn test_fetch_text_for_bundled_fallback() {
        let mut state = LoadState::default();
        state.active_source = Some(CatalogSource::Bundled);
        state.fetch_error = Some("Failed to fetch the game list from the mirror.".to_string());
        state.mirror.error = Some("HTTP 503".to_string());

        let text = format_fetch_text(&FetchResult::from_state(&state, None));
        assert!(text.contains("Status:       Idle"));
        assert!(text.contains("Active list:  bundled (0 games)"));
        assert!(text.contains("[  ] Mirror: HTTP 503"));
        assert!(text.contains("[OK] Bundled list (0 entries)"));
        assert!(text.contains("Mirror metadata unavailable"));
        assert!(text.contains("Checksum:     not verified"));
        assert!(text.contains("Error: Failed to fetch"));
    }
}
