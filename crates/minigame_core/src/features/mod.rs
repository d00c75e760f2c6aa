//! Session capabilities ("features").
//!
//! Each feature implements one orthogonal slice of session behavior and
//! holds a non-owning back-reference to its session. The [`FeatureSet`] is
//! a statically-typed registry with one slot per capability kind; callers
//! treat an empty slot as "not installed for this session" and degrade
//! gracefully.

mod copper_drop_iron;
mod death_manager;
mod instant_smelting;
mod player_resetter;
mod team_manager;
mod world_manager;

pub use copper_drop_iron::CopperDropIron;
pub use death_manager::DeathManager;
pub use instant_smelting::InstantSmelting;
pub use player_resetter::PlayerResetter;
pub use team_manager::{TeamManager, TEAM_PALETTE};
pub use world_manager::WorldManager;

use crate::items::CustomItemManager;
use crate::mobs::CustomMobManager;
use std::sync::{Arc, RwLock};
use tracing::warn;

/// Common surface of every capability.
pub trait Feature: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    /// Drop event subscriptions and scheduled tasks. Called when the
    /// session tears down; must be safe to call more than once.
    fn detach(&self);
}

#[derive(Default)]
struct Slots {
    player_resetter: Option<Arc<PlayerResetter>>,
    death_manager: Option<Arc<DeathManager>>,
    team_manager: Option<Arc<TeamManager>>,
    world_manager: Option<Arc<WorldManager>>,
    item_manager: Option<Arc<CustomItemManager>>,
    mob_manager: Option<Arc<CustomMobManager>>,
    instant_smelting: Option<Arc<InstantSmelting>>,
    copper_drop_iron: Option<Arc<CopperDropIron>>,
}

/// One slot per capability kind. Installing over a filled slot replaces the
/// previous instance (last wins) and warns, since double-registration is a
/// wiring mistake worth surfacing.
pub struct FeatureSet {
    slots: RwLock<Slots>,
}

macro_rules! slot {
    ($install:ident, $get:ident, $field:ident, $ty:ty) => {
        pub fn $install(&self, feature: Arc<$ty>) {
            let mut slots = self.slots.write().expect("feature set poisoned");
            if let Some(previous) = slots.$field.replace(feature) {
                warn!(
                    feature = previous.name(),
                    "capability registered twice, replacing previous instance"
                );
                previous.detach();
            }
        }

        pub fn $get(&self) -> Option<Arc<$ty>> {
            self.slots.read().expect("feature set poisoned").$field.clone()
        }
    };
}

impl FeatureSet {
    pub(crate) fn new() -> Self {
        Self {
            slots: RwLock::new(Slots::default()),
        }
    }

    slot!(install_player_resetter, player_resetter, player_resetter, PlayerResetter);
    slot!(install_death_manager, death_manager, death_manager, DeathManager);
    slot!(install_team_manager, team_manager, team_manager, TeamManager);
    slot!(install_world_manager, world_manager, world_manager, WorldManager);
    slot!(install_item_manager, item_manager, item_manager, CustomItemManager);
    slot!(install_mob_manager, mob_manager, mob_manager, CustomMobManager);
    slot!(install_instant_smelting, instant_smelting, instant_smelting, InstantSmelting);
    slot!(install_copper_drop_iron, copper_drop_iron, copper_drop_iron, CopperDropIron);

    /// Detach every installed capability. Used by session teardown.
    pub fn detach_all(&self) {
        let slots = self.slots.read().expect("feature set poisoned");
        let features: [Option<&dyn Feature>; 8] = [
            slots.player_resetter.as_deref().map(|f| f as _),
            slots.death_manager.as_deref().map(|f| f as _),
            slots.team_manager.as_deref().map(|f| f as _),
            slots.world_manager.as_deref().map(|f| f as _),
            slots.item_manager.as_deref().map(|f| f as _),
            slots.mob_manager.as_deref().map(|f| f as _),
            slots.instant_smelting.as_deref().map(|f| f as _),
            slots.copper_drop_iron.as_deref().map(|f| f as _),
        ];
        for feature in features.into_iter().flatten() {
            feature.detach();
        }
    }
}
