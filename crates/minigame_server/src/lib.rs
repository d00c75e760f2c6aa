//! Server shell for the minigame platform: configuration, CLI handling,
//! and the session directory that hosts game modes behind join codes.

pub mod cli;
pub mod config;
pub mod directory;

pub use cli::CliArgs;
pub use config::{AppConfig, LoggingSettings, OpenAiSettings, ServerSettings};
pub use directory::{DirectoryError, ModeFactory, SessionDirectory, SessionInfo};
