//! World instances and the on-disk world registry.
//!
//! Every world owns a directory under the registry root; deleting a world
//! removes that directory recursively, but only after the world has been
//! unloaded. Unloading is refused while players remain inside, which keeps
//! teardown retryable instead of half-done.

use crate::types::{Location, Position, WorldId};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Ticks in one in-game day.
pub const DAY_LENGTH: u64 = 24_000;

/// Night spans this time-of-day window.
pub const NIGHT_START: u64 = 13_000;
pub const NIGHT_END: u64 = 23_000;

/// Errors raised by world provisioning and teardown.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("world name {0:?} is already in use")]
    NameTaken(String),

    #[error("unknown world {0}")]
    UnknownWorld(WorldId),

    #[error("world {name:?} still has {players} player(s) inside, unload refused")]
    StillOccupied { name: String, players: usize },

    #[error("failed to create world directory {path}: {source}")]
    CreateFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to delete world directory {path}: {source}")]
    DeleteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A loaded world instance.
pub struct World {
    pub id: WorldId,
    pub name: String,
    pub spawn: Position,
    pub directory: PathBuf,
    pub generate_structures: bool,
    time: AtomicU64,
}

impl World {
    /// Current time of day in ticks, `0..DAY_LENGTH`.
    pub fn time(&self) -> u64 {
        self.time.load(Ordering::SeqCst)
    }

    pub fn set_time(&self, time: u64) {
        self.time.store(time % DAY_LENGTH, Ordering::SeqCst);
    }

    pub(crate) fn advance_time(&self) {
        let next = (self.time.load(Ordering::SeqCst) + 1) % DAY_LENGTH;
        self.time.store(next, Ordering::SeqCst);
    }

    /// Whether the current time of day counts as night.
    pub fn is_night(&self) -> bool {
        let t = self.time();
        (NIGHT_START..=NIGHT_END).contains(&t)
    }

    /// Spawn point as a full location.
    pub fn spawn_location(&self) -> Location {
        Location::new(self.id, self.spawn)
    }

    /// Surface height at the given column. The host models flat terrain at
    /// spawn height.
    pub fn highest_block_y(&self, _x: f64, _z: f64) -> f64 {
        self.spawn.y
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("time", &self.time())
            .finish()
    }
}

/// Registry of loaded worlds, backed by directories under one root.
pub struct WorldRegistry {
    root: PathBuf,
    worlds: DashMap<WorldId, Arc<World>>,
}

impl WorldRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            worlds: DashMap::new(),
        }
    }

    /// Create a world. A `None` name generates a collision-resistant one.
    pub fn create(
        &self,
        name: Option<&str>,
        generate_structures: bool,
    ) -> Result<Arc<World>, WorldError> {
        let name = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => format!("minigame_{}", &Uuid::new_v4().simple().to_string()[..8]),
        };
        if self.worlds.iter().any(|w| w.name == name) {
            return Err(WorldError::NameTaken(name));
        }

        let directory = self.root.join(&name);
        std::fs::create_dir_all(&directory).map_err(|source| WorldError::CreateFailed {
            path: directory.clone(),
            source,
        })?;

        let world = Arc::new(World {
            id: WorldId::new(),
            name,
            spawn: Position::new(0.0, 64.0, 0.0),
            directory,
            generate_structures,
            time: AtomicU64::new(0),
        });
        info!(world = %world.name, id = %world.id, "world created");
        self.worlds.insert(world.id, Arc::clone(&world));
        Ok(world)
    }

    pub fn get(&self, id: WorldId) -> Option<Arc<World>> {
        self.worlds.get(&id).map(|w| Arc::clone(&w))
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<World>> {
        self.worlds
            .iter()
            .find(|w| w.name == name)
            .map(|w| Arc::clone(&w))
    }

    /// Drop a world from the registry, returning it so the caller can still
    /// reach its directory. The occupancy check lives on the host, which
    /// knows where the players are.
    pub(crate) fn remove(&self, id: WorldId) -> Option<Arc<World>> {
        let removed = self.worlds.remove(&id).map(|(_, w)| w);
        if let Some(world) = &removed {
            debug!(world = %world.name, "world unloaded");
        }
        removed
    }

    /// Delete a world's directory recursively. Must only be called after a
    /// successful unload.
    pub fn delete_files(&self, world: &World) -> Result<(), WorldError> {
        if world.directory.exists() {
            std::fs::remove_dir_all(&world.directory).map_err(|source| {
                WorldError::DeleteFailed {
                    path: world.directory.clone(),
                    source,
                }
            })?;
        }
        info!(world = %world.name, "world files deleted");
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Advance every loaded world's clock by one tick.
    pub(crate) fn advance_time(&self) {
        for world in self.worlds.iter() {
            world.advance_time();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_names_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let registry = WorldRegistry::new(dir.path());
        let a = registry.create(None, true).unwrap();
        let b = registry.create(None, true).unwrap();
        assert_ne!(a.name, b.name);
        assert!(a.directory.exists());
        assert!(b.directory.exists());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let registry = WorldRegistry::new(dir.path());
        registry.create(Some("lobby"), false).unwrap();
        assert!(matches!(
            registry.create(Some("lobby"), false),
            Err(WorldError::NameTaken(_))
        ));
    }

    #[test]
    fn night_window_matches_time_of_day() {
        let dir = tempfile::tempdir().unwrap();
        let registry = WorldRegistry::new(dir.path());
        let world = registry.create(None, true).unwrap();
        world.set_time(6_000);
        assert!(!world.is_night());
        world.set_time(14_000);
        assert!(world.is_night());
        world.set_time(23_500);
        assert!(!world.is_night());
    }
}
