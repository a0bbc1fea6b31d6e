//! Rook Sentinel host: runs the detection engine against a page file and
//! reports over stdio.

pub mod config;
pub mod error;
pub mod page;
pub mod player;
pub mod runner;
pub mod settings;
pub mod transport;

pub use config::{resolve_config_path, resolve_settings_path, HostConfig};
pub use error::{HostError, HostResult};
pub use page::FilePage;
pub use runner::{WatchOptions, Watcher};
pub use transport::JsonLineSink;
