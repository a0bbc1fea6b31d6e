//! Detection coordinator.
//!
//! Two producers feed one consumer over an mpsc channel:
//!
//! - a board sampler that captures a [`BoardSnapshot`] every poll interval,
//! - a move-list watcher that forwards appended move nodes, re-locating the
//!   container on a fixed backoff whenever it is missing or replaced.
//!
//! The consumer owns all session state (dedup ledger, last snapshot, last
//! URL) and is the single place where a [`SacrificeSignal`] is built and
//! sent out. Both detectors may fire for the same physical capture; those
//! duplicates are not suppressed.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::capture::BoardReader;
use crate::config::SentinelConfig;
use crate::diff;
use crate::notation::{MoveListDetector, MoveNode};
use crate::overlay::OverlayController;
use crate::page::{Notifier, Page, PageLoad};
use crate::types::{BoardSnapshot, SacrificeSignal, SentinelResult};

const OBSERVATION_QUEUE: usize = 64;
const SIGNAL_QUEUE: usize = 32;

/// Which detector produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSource {
    MoveList,
    BoardDiff,
}

impl fmt::Display for DetectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionSource::MoveList => f.write_str("move list"),
            DetectionSource::BoardDiff => f.write_str("board diff"),
        }
    }
}

/// Raw input from one of the producers.
#[derive(Debug, Clone)]
pub enum Observation {
    /// Result of one sampling tick: the page address read alongside the
    /// board, and the board itself (`None` when not found).
    Board {
        url: String,
        snapshot: Option<BoardSnapshot>,
    },
    /// A node appended to the move list.
    MoveEntry(MoveNode),
}

/// Holds the single move-list watcher task.
#[derive(Default)]
struct WatcherSlot {
    handle: Option<JoinHandle<()>>,
}

impl WatcherSlot {
    fn is_armed(&self) -> bool {
        matches!(&self.handle, Some(h) if !h.is_finished())
    }

    fn was_started(&self) -> bool {
        self.handle.is_some()
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Runs both detectors for one page and emits unified signals.
pub struct Coordinator {
    page: Arc<dyn Page>,
    notifier: Arc<dyn Notifier>,
    overlay: OverlayController,
    reader: Arc<BoardReader>,
    config: SentinelConfig,
    moves: MoveListDetector,
    last_snapshot: Option<BoardSnapshot>,
    last_url: String,
    signals: broadcast::Sender<SacrificeSignal>,
    observations: mpsc::Sender<Observation>,
    inbox: Option<mpsc::Receiver<Observation>>,
    watcher: WatcherSlot,
}

impl Coordinator {
    /// Create a coordinator for a fresh page session.
    pub fn new(
        page: Arc<dyn Page>,
        notifier: Arc<dyn Notifier>,
        overlay: OverlayController,
        config: SentinelConfig,
    ) -> SentinelResult<Self> {
        config.validate()?;
        let reader = Arc::new(BoardReader::new(&config.selectors)?);
        let (observations, inbox) = mpsc::channel(OBSERVATION_QUEUE);
        let (signals, _) = broadcast::channel(SIGNAL_QUEUE);
        let last_url = page.url();

        Ok(Self {
            page,
            notifier,
            overlay,
            reader,
            config,
            moves: MoveListDetector::new(),
            last_snapshot: None,
            last_url,
            signals,
            observations,
            inbox: Some(inbox),
            watcher: WatcherSlot::default(),
        })
    }

    /// Receive every signal this coordinator emits.
    pub fn subscribe(&self) -> broadcast::Receiver<SacrificeSignal> {
        self.signals.subscribe()
    }

    /// Address of the current page session.
    pub fn session_url(&self) -> &str {
        &self.last_url
    }

    pub fn move_detector(&self) -> &MoveListDetector {
        &self.moves
    }

    pub fn overlay(&self) -> &OverlayController {
        &self.overlay
    }

    /// Run until `shutdown` is notified.
    pub async fn run(mut self, shutdown: Arc<Notify>) {
        let Some(mut inbox) = self.inbox.take() else {
            tracing::warn!("Coordinator inbox already consumed");
            return;
        };

        tracing::info!("Rook sacrifice detector started on {}", self.last_url);

        let sampler = spawn_board_sampler(
            Arc::clone(&self.page),
            Arc::clone(&self.reader),
            self.config.poll_interval(),
            self.observations.clone(),
        );
        self.arm_move_list(Duration::ZERO);

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    tracing::info!("Rook sacrifice detector stopping");
                    break;
                }
                observation = inbox.recv() => {
                    match observation {
                        Some(observation) => {
                            self.handle(observation);
                        }
                        None => break,
                    }
                }
            }
        }

        sampler.abort();
        self.watcher.abort();
    }

    /// Process one observation, returning the signal it produced, if any.
    pub fn handle(&mut self, observation: Observation) -> Option<SacrificeSignal> {
        let url = match &observation {
            Observation::Board { url, .. } => url.clone(),
            Observation::MoveEntry(_) => self.page.url(),
        };
        self.navigate_to(url);

        match observation {
            Observation::Board { snapshot, .. } => {
                let finding = diff::analyze(self.last_snapshot.as_ref(), snapshot.as_ref());
                self.last_snapshot = snapshot;
                let finding = finding?;
                tracing::debug!("Board diff: {}", finding.describe());
                Some(self.confirm(DetectionSource::BoardDiff, None))
            }
            Observation::MoveEntry(node) => {
                let description = self.moves.observe(&node)?;
                Some(self.confirm(DetectionSource::MoveList, Some(description)))
            }
        }
    }

    /// Reset session state when the page address changed. Returns `true` on
    /// a change.
    pub fn check_navigation(&mut self) -> bool {
        let url = self.page.url();
        self.navigate_to(url)
    }

    fn navigate_to(&mut self, url: String) -> bool {
        if url == self.last_url {
            return false;
        }

        tracing::info!("Page changed: {} -> {url}", self.last_url);
        self.last_url = url;
        self.moves.reset();
        self.last_snapshot = None;
        self.overlay.reset();

        if self.watcher.was_started() {
            self.watcher.abort();
            self.arm_move_list(self.config.rearm_delay());
        }
        true
    }

    /// Build, send and display a signal.
    fn confirm(&mut self, source: DetectionSource, description: Option<String>) -> SacrificeSignal {
        let description = description.unwrap_or_else(|| self.config.default_move_label.clone());
        let signal = SacrificeSignal::new(description, self.last_url.clone());

        tracing::info!(
            "Rook sacrifice detected via {source}: {} ({})",
            signal.move_description,
            signal.source_url
        );

        if let Err(e) = self.notifier.notify(&signal.to_message()) {
            tracing::warn!("Sacrifice notification dropped: {e}");
        }
        // no subscribers is fine
        let _ = self.signals.send(signal.clone());

        self.overlay.trigger(Some(&signal.move_description));
        signal
    }

    /// Spawn the move-list watcher unless one is already running.
    fn arm_move_list(&mut self, delay: Duration) -> bool {
        if self.watcher.is_armed() {
            tracing::debug!("Move list watcher already armed");
            return false;
        }

        let page = Arc::clone(&self.page);
        let selectors = self.config.selectors.move_list.clone();
        let backoff = self.config.reattach_backoff();
        let tx = self.observations.clone();

        self.watcher.handle = Some(tokio::spawn(watch_move_list(
            page, selectors, backoff, delay, tx,
        )));
        true
    }
}

fn spawn_board_sampler(
    page: Arc<dyn Page>,
    reader: Arc<BoardReader>,
    period: Duration,
    tx: mpsc::Sender<Observation>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let PageLoad { url, document } = page.load();
            let snapshot = document.and_then(|html| reader.capture(&html));
            if tx.send(Observation::Board { url, snapshot }).await.is_err() {
                break;
            }
        }
    })
}

async fn watch_move_list(
    page: Arc<dyn Page>,
    selectors: Vec<String>,
    backoff: Duration,
    delay: Duration,
    tx: mpsc::Sender<Observation>,
) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    loop {
        match page.observe_move_list(&selectors) {
            Some(mut entries) => {
                tracing::debug!("Move list watcher attached");
                while let Some(node) = entries.recv().await {
                    if tx.send(Observation::MoveEntry(node)).await.is_err() {
                        return;
                    }
                }
                tracing::debug!("Move list container detached");
            }
            None => {
                tracing::trace!("Move list not found, retrying in {}ms", backoff.as_millis());
            }
        }
        tokio::time::sleep(backoff).await;
    }
}
