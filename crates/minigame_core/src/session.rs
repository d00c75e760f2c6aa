//! Sessions and the abstract game-mode contract.
//!
//! A [`Session`] is the shared state a game mode and its features hang off:
//! the participant roster, the dedicated world, the running flag and the
//! feature set. Features hold a non-owning reference back to the session,
//! so dropping the mode drops the whole object graph.

use crate::features::FeatureSet;
use minigame_host::{Host, PlayerId, World, WorldError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;
use tracing::debug;

/// Errors raised by session lifecycle transitions.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("world provisioning failed: {0}")]
    World(#[from] WorldError),

    #[error("session is already running")]
    AlreadyRunning,

    #[error("session is gone")]
    Gone,
}

/// Shared state of one minigame session.
pub struct Session {
    host: Arc<Host>,
    lobby: Arc<World>,
    /// Ordered roster; uniqueness enforced by `add_player`.
    players: Mutex<Vec<PlayerId>>,
    world: RwLock<Option<Arc<World>>>,
    running: AtomicBool,
    features: FeatureSet,
}

impl Session {
    /// Build a session against a host and the lobby world every teardown
    /// returns players to.
    pub fn new(host: Arc<Host>, lobby: Arc<World>) -> Arc<Self> {
        Arc::new(Self {
            host,
            lobby,
            players: Mutex::new(Vec::new()),
            world: RwLock::new(None),
            running: AtomicBool::new(false),
            features: FeatureSet::new(),
        })
    }

    pub fn host(&self) -> &Arc<Host> {
        &self.host
    }

    pub fn lobby(&self) -> &Arc<World> {
        &self.lobby
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Add a player to the roster. Re-adding a present player is a no-op;
    /// order of first insertion is preserved.
    pub fn add_player(&self, player: PlayerId) {
        let mut players = self.players.lock().expect("roster poisoned");
        if !players.contains(&player) {
            debug!(%player, "joined roster");
            players.push(player);
        }
    }

    /// Remove a player from the roster. Removing an absent player is a
    /// no-op.
    pub fn remove_player(&self, player: PlayerId) {
        let mut players = self.players.lock().expect("roster poisoned");
        if let Some(idx) = players.iter().position(|p| *p == player) {
            debug!(%player, "left roster");
            players.remove(idx);
        }
    }

    pub fn contains_player(&self, player: PlayerId) -> bool {
        self.players.lock().expect("roster poisoned").contains(&player)
    }

    /// Snapshot of the roster in join order.
    pub fn players(&self) -> Vec<PlayerId> {
        self.players.lock().expect("roster poisoned").clone()
    }

    pub fn player_count(&self) -> usize {
        self.players.lock().expect("roster poisoned").len()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// The session's dedicated world, once provisioned.
    pub fn world(&self) -> Option<Arc<World>> {
        self.world.read().expect("world slot poisoned").clone()
    }

    pub fn set_world(&self, world: Option<Arc<World>>) {
        *self.world.write().expect("world slot poisoned") = world;
    }
}

/// A concrete game mode.
///
/// The hooks are the mode's own semantics; `end` is a convenience that
/// forwards to `on_end` so external callers (the session directory) never
/// need to know the teardown details.
pub trait Minigame: Send + Sync {
    fn session(&self) -> &Arc<Session>;

    /// Start the mode. Must not flip the running flag when world
    /// provisioning fails.
    fn on_start(&self) -> Result<(), SessionError>;

    fn on_end(&self);

    fn on_player_join(&self, player: PlayerId);

    fn on_player_leave(&self, player: PlayerId);

    fn on_player_rejoin(&self, player: PlayerId);

    fn end(&self) {
        self.on_end();
    }
}
