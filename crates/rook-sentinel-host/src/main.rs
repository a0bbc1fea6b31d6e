//! Rook Sentinel entry point.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tokio::sync::Notify;

use rook_sentinel::{BoardReader, MoveEvent, MoveNode};
use rook_sentinel_host::config::{resolve_config_path, resolve_settings_path, HostConfig};
use rook_sentinel_host::runner::{WatchOptions, Watcher};
use rook_sentinel_host::transport::JsonLineSink;

#[derive(Parser)]
#[command(
    name = "rook-sentinel",
    about = "Detects rook sacrifices on a chess page and reports them",
    version
)]
struct Cli {
    /// Path to the JSON config file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a page file and report sacrifices as JSON lines on stdout.
    Watch {
        /// HTML file standing in for the live page.
        page: PathBuf,

        /// Page address to report (defaults to the canonical link or file URL).
        #[arg(long)]
        url: Option<String>,

        /// Path to the settings file.
        #[arg(long)]
        settings: Option<String>,

        /// Do not answer requests on stdin.
        #[arg(long)]
        no_stdin: bool,
    },

    /// Print the board read from a page file as JSON.
    Snapshot {
        /// HTML file to read.
        page: PathBuf,
    },

    /// Classify a single move-list entry.
    Classify {
        /// Text content of the entry.
        text: String,

        /// Markup of the entry (defaults to the text).
        #[arg(long)]
        markup: Option<String>,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = resolve_config_path(cli.config.as_deref());

    match cli.command {
        Commands::Watch {
            page,
            url,
            settings,
            no_stdin,
        } => {
            let config = HostConfig::load(Path::new(&config_path))?;
            let options = WatchOptions {
                page,
                url,
                settings: PathBuf::from(resolve_settings_path(settings.as_deref())),
                config,
                serve_stdin: !no_stdin,
            };
            let watcher = Watcher::new(options, JsonLineSink::stdout())?;

            let shutdown = Arc::new(Notify::new());
            let signal = Arc::clone(&shutdown);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupted");
                }
                signal.notify_one();
            });

            watcher.run(shutdown).await?;
        }

        Commands::Snapshot { page } => {
            let config = HostConfig::load(Path::new(&config_path))?;
            let reader = BoardReader::new(&config.detection.selectors)?;
            let html = std::fs::read_to_string(&page)?;
            match reader.capture(&html) {
                Some(board) => println!("{}", serde_json::to_string_pretty(&board)?),
                None => {
                    eprintln!("No board found in {}", page.display());
                    std::process::exit(1);
                }
            }
        }

        Commands::Classify { text, markup } => {
            let node = match markup {
                Some(markup) => MoveNode::new(text, markup),
                None => MoveNode::plain(text),
            };
            let event = MoveEvent::from_node(&node);
            let info = serde_json::json!({
                "event": event,
                "rook_capture": event.is_rook_capture(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "rook-sentinel", &mut std::io::stdout());
        }
    }

    Ok(())
}
