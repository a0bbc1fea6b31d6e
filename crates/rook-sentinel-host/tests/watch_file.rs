//! Watch-session tests against a real page file on disk.

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Notify;

use rook_sentinel_host::config::HostConfig;
use rook_sentinel_host::runner::{WatchOptions, Watcher};
use rook_sentinel_host::transport::JsonLineSink;

// ─────────────────────── helpers ───────────────────────

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    fn messages(&self) -> Vec<Value> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }
}

/// Write a game page with a board and a move list.
fn write_page(path: &Path, game: u32, board: &[&str], moves: &[&str]) {
    let pieces: String = board
        .iter()
        .map(|p| format!(r#"<div class="piece {p}"></div>"#))
        .collect();
    let nodes: String = moves
        .iter()
        .map(|m| format!(r#"<div class="node">{m}</div>"#))
        .collect();
    let html = format!(
        r#"<html><head><link rel="canonical" href="https://www.chess.com/game/live/{game}"></head>
<body><div class="board">{pieces}</div><vertical-move-list>{nodes}</vertical-move-list></body></html>"#
    );
    std::fs::write(path, html).unwrap();
}

fn options(page: &Path, settings: &Path) -> WatchOptions {
    WatchOptions {
        page: page.to_path_buf(),
        url: None,
        settings: settings.to_path_buf(),
        config: HostConfig {
            page_poll_ms: 50,
            ..HostConfig::default()
        },
        serve_stdin: false,
    }
}

async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

// ═══════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn test_appended_rook_capture_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let page = dir.path().join("page.html");
    let settings = dir.path().join("settings.json");
    let board = ["wr square-11", "bk square-58"];
    write_page(&page, 1, &board, &["e4", "e5"]);

    let out = SharedBuf::default();
    let watcher = Watcher::new(options(&page, &settings), JsonLineSink::new(Box::new(out.clone())))
        .unwrap();
    let shutdown = Arc::new(Notify::new());
    let task = tokio::spawn(watcher.run(Arc::clone(&shutdown)));
    settle(100).await;

    write_page(&page, 1, &board, &["e4", "e5", "Rxe5"]);
    settle(200).await;

    let messages = out.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["action"], "rookSacrificeDetected");
    assert_eq!(messages[0]["move"], "Rxe5");
    assert_eq!(messages[0]["url"], "https://www.chess.com/game/live/1");

    shutdown.notify_one();
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_new_game_accepts_same_move_again() {
    let dir = tempfile::tempdir().unwrap();
    let page = dir.path().join("page.html");
    let settings = dir.path().join("settings.json");
    let board = ["wr square-11", "bk square-58"];
    write_page(&page, 1, &board, &["e4"]);

    let out = SharedBuf::default();
    let watcher = Watcher::new(options(&page, &settings), JsonLineSink::new(Box::new(out.clone())))
        .unwrap();
    let shutdown = Arc::new(Notify::new());
    let task = tokio::spawn(watcher.run(Arc::clone(&shutdown)));
    settle(100).await;

    write_page(&page, 1, &board, &["e4", "Rxe5"]);
    settle(200).await;
    assert_eq!(out.messages().len(), 1);

    // navigate: new canonical address and a fresh move list
    write_page(&page, 2, &board, &["d4"]);
    settle(3000).await;

    write_page(&page, 2, &board, &["d4", "Rxe5"]);
    settle(200).await;

    let messages = out.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1]["move"], "Rxe5");
    assert_eq!(messages[1]["url"], "https://www.chess.com/game/live/2");

    shutdown.notify_one();
    task.await.unwrap().unwrap();
}

#[test]
fn test_missing_page_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let result = Watcher::new(
        options(&dir.path().join("absent.html"), &dir.path().join("s.json")),
        JsonLineSink::new(Box::new(SharedBuf::default())),
    );
    assert!(result.is_err());
}
