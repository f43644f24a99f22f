//! Game list loading with mirror fallback.
//!
//! `GameListLoader` resolves the active catalog:
//!
//! 1. The mirror chain (primary, then CDN fallback) and the bundled catalog are
//!    fetched concurrently; neither cancels the other.
//! 2. Mirror metadata is fetched in a detached task and lands in the published
//!    state whenever it resolves.
//! 3. The mirror payload wins if it passes `is_valid_game_list`, otherwise the
//!    bundled list is used.
//! 4. After a settle delay `all_fetch_done` flips, giving front ends a fixed
//!    loading window instead of a flicker.
//!
//! State is published through a `watch` channel. Overlapping calls to
//! `fetch_game_list` are not guarded; callers serialize them.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::watch;

use crate::activity::{ActivityLog, LogLevel};
use crate::app_data::{bundled_gamelist_json, mirror_config};
use crate::catalog::{decode_game_list, is_valid_game_list, parse_game_list, GameRecord};
use crate::dialog::{Dialog, MessageOptions};
use crate::mirror::{fetch_json, FetchError, MirrorFetcher, MirrorMeta, MirrorUrls};
use crate::task::SettleTimer;

/// Recorded in `fetch_error` when the whole mirror chain failed
pub const MIRROR_ERROR: &str = "Failed to fetch the game list from the mirror.";

/// Title of the dialog shown when no source could be loaded
pub const TOTAL_FAILURE_TITLE: &str = "Error fetching games";

/// Errors loading the bundled catalog
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to read bundled game list: {0}")]
    BundledIo(#[from] std::io::Error),

    #[error("Failed to parse bundled game list: {0}")]
    BundledParse(#[from] serde_json::Error),
}

/// Where the offline catalog comes from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BundledSource {
    /// The copy compiled into the binary
    #[default]
    Embedded,
    /// A JSON file on disk
    File(PathBuf),
}

/// Which source the active list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    Mirror,
    Bundled,
}

/// Progress of one `fetch_game_list` invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadPhase {
    #[default]
    Idle,
    Fetching,
    Merged,
    Settling,
    Done,
}

impl LoadPhase {
    /// Get a human-readable description of the current phase
    pub fn description(&self) -> &'static str {
        match self {
            LoadPhase::Idle => "Idle",
            LoadPhase::Fetching => "Fetching game lists...",
            LoadPhase::Merged => "Game list selected",
            LoadPhase::Settling => "Finishing up...",
            LoadPhase::Done => "Ready",
        }
    }
}

/// Result and flags of one source
#[derive(Debug, Clone, Default)]
pub struct SourceState<T> {
    pub data: T,
    pub loading: bool,
    pub ready: bool,
    pub error: Option<String>,
}

impl<T> SourceState<T> {
    fn start(&mut self, initial: T) {
        self.data = initial;
        self.loading = true;
        self.ready = false;
        self.error = None;
    }

    fn settle<E: std::fmt::Display>(&mut self, error: Option<&E>) {
        self.loading = false;
        self.ready = error.is_none();
        self.error = error.map(|e| e.to_string());
    }
}

/// Agreement between the received catalog and the digest the mirror advertises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumStatus {
    Unknown,
    Match,
    Mismatch,
}

/// Everything a front end needs to render the loading state
#[derive(Debug, Clone)]
pub struct LoadState {
    /// User-facing error when the mirror chain failed
    pub fetch_error: Option<String>,
    /// Raw, unvalidated mirror payload
    pub mirror: SourceState<Value>,
    pub bundled: SourceState<Vec<GameRecord>>,
    /// The active catalog
    pub game_db: Vec<GameRecord>,
    pub active_source: Option<CatalogSource>,
    pub mirror_meta: Option<MirrorMeta>,
    /// SHA-256 of the catalog bytes received from the mirror
    pub mirror_sha256: Option<String>,
    pub all_fetch_done: bool,
    pub phase: LoadPhase,
}

impl Default for LoadState {
    fn default() -> Self {
        Self {
            fetch_error: None,
            mirror: SourceState {
                data: Value::Array(Vec::new()),
                ..Default::default()
            },
            bundled: SourceState::default(),
            game_db: Vec::new(),
            active_source: None,
            mirror_meta: None,
            mirror_sha256: None,
            all_fetch_done: false,
            phase: LoadPhase::Idle,
        }
    }
}

impl LoadState {
    /// Compare the received digest with the one in the mirror meta
    pub fn checksum_status(&self) -> ChecksumStatus {
        match (&self.mirror_sha256, &self.mirror_meta) {
            (Some(actual), Some(meta)) if !meta.sha256.is_empty() => {
                if actual.eq_ignore_ascii_case(meta.sha256.trim()) {
                    ChecksumStatus::Match
                } else {
                    ChecksumStatus::Mismatch
                }
            }
            _ => ChecksumStatus::Unknown,
        }
    }

    /// Number of entries in the raw mirror payload
    pub fn mirror_len(&self) -> usize {
        self.mirror.data.as_array().map(Vec::len).unwrap_or(0)
    }
}

/// Flip the terminal flag once; false if there was nothing to do
fn settle_state(state: &mut LoadState) -> bool {
    let settling = matches!(state.phase, LoadPhase::Merged | LoadPhase::Settling);
    if state.all_fetch_done || !settling {
        return false;
    }
    state.all_fetch_done = true;
    state.phase = LoadPhase::Done;
    true
}

/// Resolves the active game catalog from the mirrors and the bundled copy
pub struct GameListLoader<F: MirrorFetcher> {
    fetcher: F,
    urls: MirrorUrls,
    bundled: BundledSource,
    settle_delay: Duration,
    log: Arc<dyn ActivityLog>,
    dialog: Arc<dyn Dialog>,
    state: Arc<watch::Sender<LoadState>>,
    timer: Mutex<Option<SettleTimer>>,
}

impl<F: MirrorFetcher> GameListLoader<F> {
    /// Create a loader with the shipped endpoints, bundled copy and settle delay
    pub fn new(fetcher: F, log: Arc<dyn ActivityLog>, dialog: Arc<dyn Dialog>) -> Self {
        let (state, _) = watch::channel(LoadState::default());
        Self {
            fetcher,
            urls: MirrorUrls::default(),
            bundled: BundledSource::default(),
            settle_delay: Duration::from_millis(mirror_config().loader.settle_delay_ms),
            log,
            dialog,
            state: Arc::new(state),
            timer: Mutex::new(None),
        }
    }

    pub fn with_urls(mut self, urls: MirrorUrls) -> Self {
        self.urls = urls;
        self
    }

    pub fn with_bundled(mut self, bundled: BundledSource) -> Self {
        self.bundled = bundled;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Snapshot of the current state
    pub fn state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.state.subscribe()
    }

    // ========================================================================
    // Mirror metadata
    // ========================================================================

    /// Fetch mirror metadata, trying the CDN once if the primary fails.
    ///
    /// Best-effort: failures are logged and yield `None`.
    pub async fn fetch_mirror_meta(&self) -> Option<MirrorMeta> {
        fetch_meta_chain(&self.fetcher, &self.urls, self.log.as_ref()).await
    }

    /// Fetch metadata in a detached task and publish it when it arrives
    fn spawn_meta_fetch(&self) {
        let fetcher = self.fetcher.clone();
        let urls = self.urls.clone();
        let log = Arc::clone(&self.log);
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            if let Some(meta) = fetch_meta_chain(&fetcher, &urls, log.as_ref()).await {
                log.add_log(LogLevel::Debug, &meta.summary());
                state.send_modify(|s| s.mirror_meta = Some(meta));
            }
        });
    }

    // ========================================================================
    // Sources
    // ========================================================================

    /// Fetch the raw catalog from the primary mirror, falling back to the CDN.
    ///
    /// Also starts the metadata fetch without waiting for it. The payload is
    /// returned unvalidated. Fails only when both URLs fail, with the CDN's error.
    pub async fn fetch_game_list_from_mirror(&self) -> Result<Value, FetchError> {
        self.log
            .add_log(LogLevel::Info, "Fetching game list from mirror...");

        self.spawn_meta_fetch();

        match self.fetch_catalog(&self.urls.catalog_primary).await {
            Ok(data) => return Ok(data),
            Err(e) => self.log.add_log(
                LogLevel::Warning,
                &format!("Primary mirror unavailable ({}), using CDN fallback...", e),
            ),
        }

        match self.fetch_catalog(&self.urls.catalog_fallback).await {
            Ok(data) => Ok(data),
            Err(e) => {
                self.log
                    .add_log(LogLevel::Error, "CDN fallback unavailable as well");
                Err(e)
            }
        }
    }

    /// GET one catalog URL, recording the digest of a successful body
    async fn fetch_catalog(&self, url: &str) -> Result<Value, FetchError> {
        let bytes = self.fetcher.fetch_bytes(url).await?;
        let data: Value = serde_json::from_slice(&bytes)?;

        let digest = format!("{:x}", Sha256::digest(&bytes));
        self.state.send_modify(|s| s.mirror_sha256 = Some(digest));

        Ok(data)
    }

    /// Load the offline catalog. Never touches the network.
    pub async fn fetch_bundled_game_list(&self) -> Result<Vec<GameRecord>, LoaderError> {
        self.log
            .add_log(LogLevel::Info, "Loading bundled game list...");

        let list = match &self.bundled {
            BundledSource::Embedded => parse_game_list(bundled_gamelist_json())?,
            BundledSource::File(path) => {
                let text = tokio::fs::read_to_string(path).await?;
                parse_game_list(&text)?
            }
        };

        Ok(list)
    }

    // ========================================================================
    // Orchestration
    // ========================================================================

    /// Fetch both sources, select the active list and start the settle timer.
    ///
    /// Never fails: errors end up in the published state, the activity log and,
    /// when every source failed, a dialog. Returns the selected list.
    pub async fn fetch_game_list(&self) -> Vec<GameRecord> {
        self.cancel_timer();
        self.state.send_modify(|s| {
            *s = LoadState::default();
            s.phase = LoadPhase::Fetching;
            s.mirror.start(Value::Array(Vec::new()));
            s.bundled.start(Vec::new());
        });
        self.log.add_log(LogLevel::Info, "Fetching game list...");

        let mirror = async {
            let result = self.fetch_game_list_from_mirror().await;
            self.state
                .send_modify(|s| s.mirror.settle(result.as_ref().err()));
            result
        };
        let bundled = async {
            let result = self.fetch_bundled_game_list().await;
            self.state
                .send_modify(|s| s.bundled.settle(result.as_ref().err()));
            result
        };
        let (mirror, bundled) = tokio::join!(mirror, bundled);

        let mut fetch_error = None;
        let mirror_data = match mirror {
            Ok(data) => data,
            Err(e) => {
                fetch_error = Some(MIRROR_ERROR.to_string());
                self.log.add_log(
                    LogLevel::Error,
                    &format!("Error fetching game list from mirror: {}", e),
                );
                Value::Array(Vec::new())
            }
        };

        let bundled_failed = bundled.is_err();
        let bundled_list = bundled.unwrap_or_else(|e| {
            self.log.add_log(
                LogLevel::Error,
                &format!("Error loading bundled game list: {}", e),
            );
            Vec::new()
        });

        if let Some(error) = fetch_error.as_deref().filter(|_| bundled_failed) {
            let text = format!("There was an error fetching the game list. {}", error);
            self.dialog
                .message(&text, MessageOptions::error(TOTAL_FAILURE_TITLE))
                .await;
        }

        let (game_db, source) = self.select(&mirror_data, &bundled_list);

        self.state.send_modify(|s| {
            s.fetch_error = fetch_error;
            s.mirror.data = mirror_data;
            s.bundled.data = bundled_list;
            s.game_db = game_db.clone();
            s.active_source = Some(source);
            s.phase = LoadPhase::Merged;
        });

        self.schedule_settle();
        game_db
    }

    /// Prefer a structurally valid mirror payload, otherwise the bundled list
    fn select(&self, mirror: &Value, bundled: &[GameRecord]) -> (Vec<GameRecord>, CatalogSource) {
        if is_valid_game_list(mirror) {
            let (list, skipped) = decode_game_list(mirror);
            if let Some((index, e)) = skipped.first() {
                self.log.add_log(
                    LogLevel::Warning,
                    &format!(
                        "Skipped {} malformed mirror entries (first at #{}: {})",
                        skipped.len(),
                        index,
                        e
                    ),
                );
            }
            self.log.add_log(
                LogLevel::Info,
                &format!("Using mirror game list. {} games.", list.len()),
            );
            return (list, CatalogSource::Mirror);
        }

        self.log.add_log(
            LogLevel::Info,
            &format!("Using bundled game list. {} games.", bundled.len()),
        );
        (bundled.to_vec(), CatalogSource::Bundled)
    }

    // ========================================================================
    // Settle timer
    // ========================================================================

    fn schedule_settle(&self) {
        self.state.send_modify(|s| s.phase = LoadPhase::Settling);

        let state = Arc::clone(&self.state);
        let timer = SettleTimer::schedule(self.settle_delay, move || {
            state.send_if_modified(settle_state);
        });

        // Replacing drops (and so cancels) any older timer
        if let Ok(mut slot) = self.timer.lock() {
            *slot = Some(timer);
        }
    }

    fn cancel_timer(&self) {
        let pending = self.timer.lock().ok().and_then(|mut slot| slot.take());
        if let Some(timer) = pending {
            timer.cancel();
        }
    }

    /// Reach the terminal state now, cancelling the pending settle timer.
    ///
    /// Ignored before the merge step. Returns whether the flag changed.
    pub fn mark_done(&self) -> bool {
        if !matches!(
            self.state.borrow().phase,
            LoadPhase::Merged | LoadPhase::Settling
        ) {
            return false;
        }
        self.cancel_timer();
        self.state.send_if_modified(settle_state)
    }
}

/// Meta chain shared by the public call and the detached task
async fn fetch_meta_chain<F: MirrorFetcher>(
    fetcher: &F,
    urls: &MirrorUrls,
    log: &dyn ActivityLog,
) -> Option<MirrorMeta> {
    log.add_log(LogLevel::Debug, "Fetching mirror metadata...");
    match fetch_json::<_, MirrorMeta>(fetcher, &urls.meta_primary).await {
        Ok(meta) => return Some(meta),
        Err(e) => log.add_log(
            LogLevel::Debug,
            &format!("Primary metadata unavailable ({}), trying CDN...", e),
        ),
    }

    match fetch_json::<_, MirrorMeta>(fetcher, &urls.meta_fallback).await {
        Ok(meta) => Some(meta),
        Err(e) => {
            log.add_log(
                LogLevel::Warning,
                &format!("Could not fetch mirror metadata: {}", e),
            );
            None
        }
    }
}
