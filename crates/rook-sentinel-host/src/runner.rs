//! Wires the coordinator to the file page, stdio channel, settings and player.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::BufReader;
use tokio::sync::Notify;

use rook_sentinel::{Coordinator, LogOnlyPlayer, OverlayController, OverlayPlayer, Page};

use crate::config::HostConfig;
use crate::error::HostResult;
use crate::page::FilePage;
use crate::player::CommandPlayer;
use crate::settings::FileSettings;
use crate::transport::{serve_requests, JsonLineSink};

/// Inputs for a watch session.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub page: PathBuf,
    pub url: Option<String>,
    pub settings: PathBuf,
    pub config: HostConfig,
    /// Answer requests read from stdin.
    pub serve_stdin: bool,
}

/// A configured, not yet running watch session.
pub struct Watcher {
    coordinator: Coordinator,
    page: Arc<FilePage>,
    sink: JsonLineSink,
    serve_stdin: bool,
}

impl Watcher {
    pub fn new(options: WatchOptions, sink: JsonLineSink) -> HostResult<Self> {
        let page = Arc::new(FilePage::new(
            &options.page,
            options.url,
            Duration::from_millis(options.config.page_poll_ms),
        ));
        // fail early on an unreadable page file
        page.read()?;

        let player: Arc<dyn OverlayPlayer> = match CommandPlayer::from_config(&options.config.player) {
            Some(player) => Arc::new(player),
            None => {
                tracing::info!("No overlay player configured, overlays are logged only");
                Arc::new(LogOnlyPlayer)
            }
        };
        let overlay = OverlayController::new(
            player,
            Arc::new(FileSettings::new(options.settings)),
            options.config.detection.overlay_ceiling(),
        );

        let coordinator = Coordinator::new(
            page.clone(),
            Arc::new(sink.clone()),
            overlay,
            options.config.detection,
        )?;

        Ok(Self {
            coordinator,
            page,
            sink,
            serve_stdin: options.serve_stdin,
        })
    }

    /// Run until `shutdown` is notified.
    pub async fn run(self, shutdown: Arc<Notify>) -> HostResult<()> {
        tracing::info!("Watching {} ({})", self.page.path().display(), self.page.url());

        let requests = if self.serve_stdin {
            let page: Arc<dyn Page> = self.page.clone();
            let sink = self.sink.clone();
            Some(tokio::spawn(async move {
                let stdin = BufReader::new(tokio::io::stdin());
                if let Err(e) = serve_requests(stdin, page, sink).await {
                    tracing::warn!("Request channel closed: {e}");
                }
            }))
        } else {
            None
        };

        self.coordinator.run(shutdown).await;

        if let Some(requests) = requests {
            requests.abort();
        }
        Ok(())
    }
}
