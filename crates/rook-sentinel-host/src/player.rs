//! Overlay player that runs an external command.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use rook_sentinel::{OverlayPlayer, OverlayRequest, SentinelError, SentinelResult};

use crate::config::PlayerConfig;

/// Plays the overlay by spawning `command... [asset]` and waiting for it to
/// exit. The child is killed if the playback ceiling drops the future.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
    asset: Option<PathBuf>,
}

impl CommandPlayer {
    /// Build from config. Returns `None` when no command is configured.
    pub fn from_config(config: &PlayerConfig) -> Option<Self> {
        let (program, args) = config.command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            asset: config.asset.clone(),
        })
    }

    fn command(&self, request: &OverlayRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(asset) = &self.asset {
            cmd.arg(asset);
        }
        cmd.env("ROOK_SENTINEL_MOVE", &request.move_description)
            .env("ROOK_SENTINEL_MUTED", if request.muted { "1" } else { "0" })
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl OverlayPlayer for CommandPlayer {
    async fn play(&self, request: OverlayRequest) -> SentinelResult<()> {
        tracing::info!("Playing overlay for {}", request.move_description);
        let status = self
            .command(&request)
            .status()
            .await
            .map_err(|e| SentinelError::Playback(format!("{}: {e}", self.program)))?;

        if status.success() {
            Ok(())
        } else {
            Err(SentinelError::Playback(format!(
                "{} exited with {status}",
                self.program
            )))
        }
    }
}
