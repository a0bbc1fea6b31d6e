//! End-to-end coordinator tests against an in-memory page.
//!
//! All tests run on a paused clock so poll intervals and backoffs advance
//! instantly and deterministically.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};

use rook_sentinel::*;

// ─────────────────────── helpers ───────────────────────

const GAME_1: &str = "https://www.chess.com/game/live/1001";
const GAME_2: &str = "https://www.chess.com/game/live/1002";

#[derive(Default)]
struct FakePage {
    url: Mutex<String>,
    document: Mutex<Option<String>>,
    move_list_present: AtomicBool,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<MoveNode>>>,
    lookups: AtomicUsize,
}

impl FakePage {
    fn new(url: &str) -> Arc<Self> {
        let page = Self::default();
        *page.url.lock().unwrap() = url.to_string();
        page.move_list_present.store(true, Ordering::SeqCst);
        Arc::new(page)
    }

    fn navigate(&self, url: &str) {
        *self.url.lock().unwrap() = url.to_string();
    }

    fn set_document(&self, html: &str) {
        *self.document.lock().unwrap() = Some(html.to_string());
    }

    /// Append a move node to every attached watcher.
    fn append(&self, text: &str) {
        let subs = self.subscribers.lock().unwrap();
        for tx in subs.iter() {
            let _ = tx.send(MoveNode::plain(text));
        }
    }

    /// Replace the move-list container, closing every subscription.
    fn detach(&self) {
        self.subscribers.lock().unwrap().clear();
    }

    fn live_subscribers(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap()
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }
}

impl Page for FakePage {
    fn url(&self) -> String {
        self.url.lock().unwrap().clone()
    }

    fn document(&self) -> Option<String> {
        self.document.lock().unwrap().clone()
    }

    fn observe_move_list(&self, _selectors: &[String]) -> Option<mpsc::UnboundedReceiver<MoveNode>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if !self.move_list_present.load(Ordering::SeqCst) {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        Some(rx)
    }
}

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<OutboundMessage>>,
    fail: bool,
}

impl RecordingNotifier {
    fn moves(&self) -> Vec<(String, String)> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| match m {
                OutboundMessage::RookSacrificeDetected { move_text, url } => {
                    (move_text.clone(), url.clone())
                }
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &OutboundMessage) -> SentinelResult<()> {
        if self.fail {
            return Err(SentinelError::Notify("no receiving end".into()));
        }
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}

fn overlay() -> OverlayController {
    OverlayController::new(
        Arc::new(LogOnlyPlayer),
        Arc::new(StaticSettings::default()),
        Duration::from_secs(10),
    )
}

/// Player that stays on screen until told to stop, tracking how many
/// overlays are playing at once.
#[derive(Default)]
struct HeldPlayer {
    plays: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    stop: Notify,
}

struct OnScreen<'a>(&'a AtomicUsize);

impl Drop for OnScreen<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl OverlayPlayer for HeldPlayer {
    async fn play(&self, _request: OverlayRequest) -> SentinelResult<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        let _on_screen = OnScreen(&self.active);
        self.stop.notified().await;
        Ok(())
    }
}

struct Running {
    shutdown: Arc<Notify>,
    task: tokio::task::JoinHandle<()>,
}

impl Running {
    async fn stop(self) {
        self.shutdown.notify_one();
        self.task.await.unwrap();
    }
}

fn start(coordinator: Coordinator) -> Running {
    let shutdown = Arc::new(Notify::new());
    let task = tokio::spawn(coordinator.run(Arc::clone(&shutdown)));
    Running { shutdown, task }
}

async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn board_html(pieces: &[&str]) -> String {
    let squares: String = pieces
        .iter()
        .map(|p| format!(r#"<div class="piece {p}"></div>"#))
        .collect();
    format!(r#"<html><body><div class="board">{squares}</div></body></html>"#)
}

// ═══════════════════════════════════════════════════════
// MOVE LIST
// ═══════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn test_move_list_capture_notified_once() {
    let page = FakePage::new(GAME_1);
    let notifier = Arc::new(RecordingNotifier::default());
    let coordinator =
        Coordinator::new(page.clone(), notifier.clone(), overlay(), SentinelConfig::default())
            .unwrap();
    let running = start(coordinator);
    settle(10).await;

    page.append("Rxe5");
    page.append("Rxe5");
    page.append("Nf6");
    page.append("Rxe5");
    settle(10).await;

    assert_eq!(
        notifier.moves(),
        vec![("Rxe5".to_string(), GAME_1.to_string())]
    );
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_navigation_resets_ledger_and_rearms_single_watcher() {
    let page = FakePage::new(GAME_1);
    let notifier = Arc::new(RecordingNotifier::default());
    let coordinator =
        Coordinator::new(page.clone(), notifier.clone(), overlay(), SentinelConfig::default())
            .unwrap();
    let running = start(coordinator);
    settle(10).await;

    page.append("Rxe5");
    settle(10).await;
    assert_eq!(notifier.moves().len(), 1);

    page.navigate(GAME_2);
    // next board tick notices the new address, re-arm follows after a delay
    settle(2000).await;
    assert_eq!(page.live_subscribers(), 1);

    page.append("Rxe5");
    settle(10).await;
    assert_eq!(
        notifier.moves(),
        vec![
            ("Rxe5".to_string(), GAME_1.to_string()),
            ("Rxe5".to_string(), GAME_2.to_string()),
        ]
    );
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_watcher_retries_until_move_list_appears() {
    let page = FakePage::new(GAME_1);
    page.move_list_present.store(false, Ordering::SeqCst);
    let notifier = Arc::new(RecordingNotifier::default());
    let coordinator =
        Coordinator::new(page.clone(), notifier.clone(), overlay(), SentinelConfig::default())
            .unwrap();
    let running = start(coordinator);

    settle(5000).await;
    // lookups at t = 0s, 2s, 4s
    assert_eq!(page.lookups.load(Ordering::SeqCst), 3);
    assert_eq!(page.live_subscribers(), 0);

    page.move_list_present.store(true, Ordering::SeqCst);
    settle(1500).await;
    assert_eq!(page.live_subscribers(), 1);

    page.append("Rxd8+");
    settle(10).await;
    assert_eq!(notifier.moves()[0].0, "Rxd8+");
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_replaced_container_is_reattached() {
    let page = FakePage::new(GAME_1);
    let notifier = Arc::new(RecordingNotifier::default());
    let coordinator =
        Coordinator::new(page.clone(), notifier.clone(), overlay(), SentinelConfig::default())
            .unwrap();
    let running = start(coordinator);
    settle(10).await;
    assert_eq!(page.lookups.load(Ordering::SeqCst), 1);

    page.detach();
    settle(2500).await;
    assert_eq!(page.lookups.load(Ordering::SeqCst), 2);
    assert_eq!(page.live_subscribers(), 1);

    page.append("Raxb7");
    settle(10).await;
    assert_eq!(notifier.moves().len(), 1);
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_notifier_failure_does_not_stop_detection() {
    let page = FakePage::new(GAME_1);
    let notifier = Arc::new(RecordingNotifier {
        fail: true,
        ..RecordingNotifier::default()
    });
    let coordinator =
        Coordinator::new(page.clone(), notifier.clone(), overlay(), SentinelConfig::default())
            .unwrap();
    let mut signals = coordinator.subscribe();
    let running = start(coordinator);
    settle(10).await;

    page.append("Rxe5");
    page.append("Rxd8");
    settle(10).await;

    assert_eq!(signals.recv().await.unwrap().move_description, "Rxe5");
    assert_eq!(signals.recv().await.unwrap().move_description, "Rxd8");
    running.stop().await;
}

// ═══════════════════════════════════════════════════════
// BOARD SAMPLING
// ═══════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn test_board_sampler_detects_direct_capture() {
    let page = FakePage::new(GAME_1);
    page.move_list_present.store(false, Ordering::SeqCst);
    page.set_document(&board_html(&["wr square-41", "bq square-48", "wk square-51"]));

    let notifier = Arc::new(RecordingNotifier::default());
    let coordinator =
        Coordinator::new(page.clone(), notifier.clone(), overlay(), SentinelConfig::default())
            .unwrap();
    let running = start(coordinator);
    settle(1500).await;
    assert!(notifier.moves().is_empty());

    page.set_document(&board_html(&["bq square-41", "wk square-51"]));
    settle(1000).await;
    assert_eq!(
        notifier.moves(),
        vec![("Rook sacrifice".to_string(), GAME_1.to_string())]
    );

    // the unchanged board keeps being sampled without re-firing
    settle(3000).await;
    assert_eq!(notifier.moves().len(), 1);
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_both_detectors_may_fire_for_one_capture() {
    let page = FakePage::new(GAME_1);
    page.set_document(&board_html(&["wr square-41", "br square-48"]));

    let notifier = Arc::new(RecordingNotifier::default());
    let coordinator =
        Coordinator::new(page.clone(), notifier.clone(), overlay(), SentinelConfig::default())
            .unwrap();
    let running = start(coordinator);
    settle(500).await;

    page.set_document(&board_html(&["br square-41"]));
    page.append("Rxd1");
    settle(1000).await;

    let moves: Vec<String> = notifier.moves().into_iter().map(|(m, _)| m).collect();
    assert_eq!(moves.len(), 2);
    assert!(moves.contains(&"Rxd1".to_string()));
    assert!(moves.contains(&"Rook sacrifice".to_string()));
    running.stop().await;
}

// ═══════════════════════════════════════════════════════
// OVERLAY
// ═══════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn test_navigation_never_leaves_two_overlays_playing() {
    let page = FakePage::new(GAME_1);
    let notifier = Arc::new(RecordingNotifier::default());
    let player = Arc::new(HeldPlayer::default());
    let overlay = OverlayController::new(
        player.clone(),
        Arc::new(StaticSettings::default()),
        Duration::from_secs(10),
    );
    let coordinator =
        Coordinator::new(page.clone(), notifier.clone(), overlay, SentinelConfig::default())
            .unwrap();
    let running = start(coordinator);
    settle(10).await;

    page.append("Rxe5");
    settle(10).await;
    assert_eq!(player.active.load(Ordering::SeqCst), 1);

    page.navigate(GAME_2);
    settle(2000).await;
    // the old game's overlay is gone with the old page
    assert_eq!(player.active.load(Ordering::SeqCst), 0);

    page.append("Rxd8");
    settle(10).await;
    page.append("Rxc8");
    settle(10).await;

    assert_eq!(notifier.moves().len(), 3);
    assert_eq!(player.plays.load(Ordering::SeqCst), 2);
    assert_eq!(player.active.load(Ordering::SeqCst), 1);
    assert_eq!(player.max_active.load(Ordering::SeqCst), 1);
    running.stop().await;
}

#[test]
fn test_extract_page_url_request() {
    let page = FakePage::new(GAME_1);
    let response = respond(&*page, &InboundRequest::ExtractPageUrl);
    assert_eq!(response.url, GAME_1);
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        serde_json::json!({ "url": GAME_1 })
    );
}
