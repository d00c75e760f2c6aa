//! The session directory.
//!
//! Players host and join games through short join codes. The directory
//! owns every live game: a code sits in `pending` from hosting until a
//! successful start, then moves to `active` until the game is stopped.
//! Game modes register as named factories so new modes plug in without
//! touching the directory.

use dashmap::DashMap;
use minigame_core::{Minigame, SessionError};
use minigame_host::PlayerId;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Builds a fresh game instance for one hosted session.
pub type ModeFactory = Box<dyn Fn() -> Arc<dyn Minigame> + Send + Sync>;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("unknown game mode: {0}")]
    UnknownMode(String),

    #[error("unknown join code: {0}")]
    UnknownCode(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// One directory entry: the mode name it was hosted as, plus the game.
struct Entry {
    kind: String,
    game: Arc<dyn Minigame>,
}

/// A snapshot row returned by [`SessionDirectory::list`].
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub code: String,
    pub kind: String,
    pub running: bool,
    pub player_count: usize,
}

/// Registry of game modes and the sessions hosted from them.
pub struct SessionDirectory {
    modes: DashMap<String, ModeFactory>,
    pending: DashMap<String, Entry>,
    active: DashMap<String, Entry>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self {
            modes: DashMap::new(),
            pending: DashMap::new(),
            active: DashMap::new(),
        }
    }

    /// Registers a game mode under a name players can host.
    pub fn register_mode(&self, name: impl Into<String>, factory: ModeFactory) {
        let name = name.into();
        info!(mode = %name, "game mode registered");
        self.modes.insert(name, factory);
    }

    pub fn mode_names(&self) -> Vec<String> {
        self.modes.iter().map(|e| e.key().clone()).collect()
    }

    /// Hosts a new session of the named mode and returns its join code.
    /// The hosting player is seeded as the first participant.
    pub fn host_session(
        &self,
        kind: &str,
        host_player: PlayerId,
    ) -> Result<String, DirectoryError> {
        let game = {
            let factory = self
                .modes
                .get(kind)
                .ok_or_else(|| DirectoryError::UnknownMode(kind.to_string()))?;
            factory()
        };
        game.on_player_join(host_player);

        let code = self.fresh_code();
        info!(mode = %kind, %code, "session hosted");
        self.pending.insert(
            code.clone(),
            Entry {
                kind: kind.to_string(),
                game,
            },
        );
        Ok(code)
    }

    /// Joins a player into the session behind a code. Pending sessions
    /// take new participants; active ones only let existing participants
    /// back in.
    pub fn join(&self, code: &str, player: PlayerId) -> Result<(), DirectoryError> {
        if let Some(entry) = self.pending.get(code) {
            entry.game.on_player_join(player);
            return Ok(());
        }
        if let Some(entry) = self.active.get(code) {
            entry.game.on_player_rejoin(player);
            return Ok(());
        }
        Err(DirectoryError::UnknownCode(code.to_string()))
    }

    /// Removes a player from whichever session holds the code.
    pub fn leave(&self, code: &str, player: PlayerId) -> Result<(), DirectoryError> {
        let entry = self
            .pending
            .get(code)
            .or_else(|| self.active.get(code))
            .ok_or_else(|| DirectoryError::UnknownCode(code.to_string()))?;
        entry.game.on_player_leave(player);
        Ok(())
    }

    /// Starts a pending session. On success the code moves to the active
    /// set; on failure it stays pending so the host can retry.
    pub fn start(&self, code: &str) -> Result<(), DirectoryError> {
        let game = {
            let entry = self
                .pending
                .get(code)
                .ok_or_else(|| DirectoryError::UnknownCode(code.to_string()))?;
            Arc::clone(&entry.game)
        };
        game.on_start()?;
        if let Some((code, entry)) = self.pending.remove(code) {
            info!(%code, "session started");
            self.active.insert(code, entry);
        }
        Ok(())
    }

    /// Stops a session and drops it from the directory. Pending sessions
    /// are simply discarded; active ones get a proper end.
    pub fn stop(&self, code: &str) -> Result<(), DirectoryError> {
        if let Some((code, entry)) = self.active.remove(code) {
            entry.game.end();
            info!(%code, "session stopped");
            return Ok(());
        }
        if let Some((code, _)) = self.pending.remove(code) {
            info!(%code, "pending session discarded");
            return Ok(());
        }
        Err(DirectoryError::UnknownCode(code.to_string()))
    }

    /// A snapshot of every hosted session.
    pub fn list(&self) -> Vec<SessionInfo> {
        let mut rows: Vec<SessionInfo> = self
            .pending
            .iter()
            .chain(self.active.iter())
            .map(|entry| SessionInfo {
                code: entry.key().clone(),
                kind: entry.value().kind.clone(),
                running: entry.value().game.session().is_running(),
                player_count: entry.value().game.session().player_count(),
            })
            .collect();
        rows.sort_by(|a, b| a.code.cmp(&b.code));
        rows
    }

    fn fresh_code(&self) -> String {
        loop {
            let code = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
            if !self.pending.contains_key(&code) && !self.active.contains_key(&code) {
                return code;
            }
        }
    }
}

impl Default for SessionDirectory {
    fn default() -> Self {
        Self::new()
    }
}
