//! Per-session world provisioning and teardown.

use crate::features::Feature;
use crate::session::{Session, SessionError};
use minigame_host::{PlayerId, World};
use std::sync::{Arc, Weak};
use tracing::{error, info};

/// Provisions the session's dedicated world and tears it down afterwards.
pub struct WorldManager {
    session: Weak<Session>,
}

impl WorldManager {
    pub fn new(session: &Arc<Session>) -> Arc<Self> {
        Arc::new(Self {
            session: Arc::downgrade(session),
        })
    }

    /// Create the session's world with structure generation on. A `None`
    /// name gets a collision-resistant generated one. On success the
    /// session's world reference is rebound; on failure the caller must
    /// abort its start sequence.
    pub fn create_world(&self, name: Option<&str>) -> Result<Arc<World>, SessionError> {
        let session = self.session.upgrade().ok_or(SessionError::Gone)?;
        let world = session.host().create_world(name, true)?;
        session.set_world(Some(Arc::clone(&world)));
        Ok(world)
    }

    /// Tear the session's world down: relocate every participant to the
    /// lobby, unload, then delete the files.
    ///
    /// An unload failure aborts before any file deletion and leaves the
    /// session state consistent for a retry.
    pub fn delete_world(&self) -> Result<(), SessionError> {
        let session = self.session.upgrade().ok_or(SessionError::Gone)?;
        let Some(world) = session.world() else {
            return Ok(());
        };

        // Relocation happens-before unload; unload refuses occupied worlds.
        for player in session.players() {
            self.teleport_to_lobby(player);
        }

        let host = session.host();
        let unloaded = match host.unload_world(world.id) {
            Ok(world) => world,
            Err(err) => {
                error!(world = %world.name, %err, "world unload failed, leaving files in place");
                return Err(err.into());
            }
        };
        host.worlds.delete_files(&unloaded)?;
        session.set_world(None);
        info!(world = %unloaded.name, "session world deleted");
        Ok(())
    }

    /// Send one player to the lobby spawn. Safe for players already there.
    pub fn teleport_to_lobby(&self, player: PlayerId) {
        if let Some(session) = self.session.upgrade() {
            let spawn = session.lobby().spawn_location();
            session.host().teleport(player, spawn);
        }
    }
}

impl Feature for WorldManager {
    fn name(&self) -> &'static str {
        "world_manager"
    }

    fn detach(&self) {}
}
