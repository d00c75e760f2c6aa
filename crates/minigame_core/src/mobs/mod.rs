//! Custom mob variants and their manager.
//!
//! Unlike items, every spawned mob is unique: identity is a fresh random
//! [`InstanceId`] per spawn, embedded into the entity's hidden tags. The
//! manager owns spawn bookkeeping, the death-event lookup, and the
//! periodic boss-bar proximity pass.

mod business_villager;
mod invincible_zombie;
mod special_dog;

pub use business_villager::{BusinessVillager, FLOWER_PRICE};
pub use invincible_zombie::InvincibleZombie;
pub use special_dog::{SpecialDog, NAMING_DEADLINE_TICKS, OWNER_DEATH_PENALTY};

use crate::features::Feature;
use crate::hooks::HookSet;
use crate::session::Session;
use minigame_host::{
    BossBarId, Entity, EntityDeathEvent, EntityId, EntityKind, Location, TaskHandle,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tracing::debug;
use uuid::Uuid;

/// Players within this radius of a mob see its boss bar.
pub const BOSS_BAR_RADIUS: f64 = 50.0;

/// The closed set of custom mob variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MobKind {
    InvincibleZombie,
    BusinessVillager,
    SpecialDog,
}

/// Per-instance random identity. Two spawns of the same variant never
/// compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A custom mob variant instance.
pub trait CustomMob: Send + Sync {
    fn kind(&self) -> MobKind;

    fn instance_id(&self) -> InstanceId;

    /// The underlying creature to spawn.
    fn entity_kind(&self) -> EntityKind;

    /// Appearance, attributes and flags applied to the freshly spawned
    /// entity.
    fn customize(&self, entity: &mut Entity);

    /// Wire listeners, create boss bars, start per-variant behavior. Runs
    /// after the entity exists in the registry.
    fn on_spawned(self: Arc<Self>, _session: &Arc<Session>, _entity: EntityId) -> HookSet {
        HookSet::default()
    }

    /// The mob's boss bar, when it keeps one.
    fn boss_bar(&self) -> Option<BossBarId> {
        None
    }

    /// Release per-instance resources. Minimum contract: any boss bar is
    /// removed.
    fn on_death(&self, _session: &Arc<Session>) {}
}

struct SpawnedMob {
    entity: EntityId,
    mob: Arc<dyn CustomMob>,
    hooks: HookSet,
}

/// Spawn bookkeeping plus the death-lookup and boss-bar ticking.
pub struct CustomMobManager {
    session: Weak<Session>,
    spawned: Mutex<HashMap<InstanceId, SpawnedMob>>,
    teardown: Mutex<HookSet>,
    bar_task: Mutex<Option<TaskHandle>>,
}

impl CustomMobManager {
    pub fn new(session: &Arc<Session>) -> Arc<Self> {
        let manager = Arc::new_cyclic(|weak: &Weak<Self>| {
            let handler = Weak::clone(weak);
            let death = session
                .host()
                .events
                .subscribe::<EntityDeathEvent, _>(move |event| {
                    if let Some(manager) = handler.upgrade() {
                        manager.handle_death(&event.entity);
                    }
                });

            let mut teardown = HookSet::default();
            teardown.subscriptions.push(death);

            Self {
                session: Arc::downgrade(session),
                spawned: Mutex::new(HashMap::new()),
                teardown: Mutex::new(teardown),
                bar_task: Mutex::new(None),
            }
        });

        let ticker = Arc::downgrade(&manager);
        let task = session.host().scheduler.run_repeating(1, move || {
            if let Some(manager) = ticker.upgrade() {
                manager.update_boss_bars();
            }
        });
        *manager.bar_task.lock().expect("bar task poisoned") = Some(task);
        manager
    }

    /// Spawn a variant instance: create the entity, embed the instance
    /// marker, apply the variant's customization, then run its spawn hook.
    pub fn spawn(&self, mob: Arc<dyn CustomMob>, location: Location) -> Option<EntityId> {
        let session = self.session.upgrade()?;
        let host = session.host();
        let instance = mob.instance_id();

        let entity = host.spawn_entity(mob.entity_kind(), location);
        host.with_entity_mut(entity, |e| {
            e.tags
                .insert(Entity::CUSTOM_MOB_TAG.to_string(), instance.to_string());
            mob.customize(e);
        });
        let hooks = Arc::clone(&mob).on_spawned(&session, entity);

        debug!(kind = ?mob.kind(), %instance, "custom mob spawned");
        self.spawned
            .lock()
            .expect("mob registry poisoned")
            .insert(instance, SpawnedMob { entity, mob, hooks });
        Some(entity)
    }

    /// The registered instance behind a spawned entity, if any.
    pub fn lookup(&self, entity: EntityId) -> Option<Arc<dyn CustomMob>> {
        self.spawned
            .lock()
            .expect("mob registry poisoned")
            .values()
            .find(|s| s.entity == entity)
            .map(|s| Arc::clone(&s.mob))
    }

    pub fn spawned_count(&self) -> usize {
        self.spawned.lock().expect("mob registry poisoned").len()
    }

    /// Death handling: match the entity's embedded marker against the
    /// registry, run the variant's death hook, release its hooks, then
    /// unregister. Untracked entities are a normal no-op.
    fn handle_death(&self, entity: &Entity) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        let Some(marker) = entity.custom_mob_marker() else {
            return;
        };
        let Ok(instance) = marker.parse::<Uuid>().map(InstanceId) else {
            return;
        };
        let removed = self
            .spawned
            .lock()
            .expect("mob registry poisoned")
            .remove(&instance);
        if let Some(mut spawned) = removed {
            debug!(kind = ?spawned.mob.kind(), %instance, "custom mob died");
            spawned.mob.on_death(&session);
            spawned.hooks.release(session.host());
        }
    }

    /// Per-tick boss bar pass: sync each bar's progress with its mob's
    /// health and gate viewers on proximity.
    fn update_boss_bars(&self) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        let host = session.host();
        let bars: Vec<(EntityId, BossBarId)> = {
            let spawned = self.spawned.lock().expect("mob registry poisoned");
            spawned
                .values()
                .filter_map(|s| s.mob.boss_bar().map(|bar| (s.entity, bar)))
                .collect()
        };
        for (entity, bar) in bars {
            let Some((fraction, location)) =
                host.with_entity(entity, |e| (e.health_fraction(), e.location))
            else {
                continue;
            };
            let nearby: Vec<_> = session
                .players()
                .into_iter()
                .filter(|p| {
                    host.with_player(*p, |p| {
                        p.location.world == location.world
                            && p.location.position.distance(&location.position) <= BOSS_BAR_RADIUS
                    })
                    .unwrap_or(false)
                })
                .collect();
            host.with_boss_bar_mut(bar, |b| {
                b.progress = fraction;
                b.viewers = nearby.into_iter().collect();
            });
        }
    }
}

impl Feature for CustomMobManager {
    fn name(&self) -> &'static str {
        "custom_mob_manager"
    }

    fn detach(&self) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        let host = session.host();
        if let Some(task) = self.bar_task.lock().expect("bar task poisoned").take() {
            task.cancel();
        }
        self.teardown.lock().expect("teardown poisoned").release(host);

        let mut spawned = self.spawned.lock().expect("mob registry poisoned");
        for (_, mut mob) in spawned.drain() {
            mob.mob.on_death(&session);
            mob.hooks.release(host);
            host.remove_entity(mob.entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_ids_differ_between_spawns_of_one_variant() {
        let a = InvincibleZombie::new();
        let b = InvincibleZombie::new();
        assert_ne!(a.instance_id(), b.instance_id());
    }
}
