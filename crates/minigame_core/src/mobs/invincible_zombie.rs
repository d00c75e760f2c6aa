//! A zombie that cannot be killed.

use crate::hooks::HookSet;
use crate::mobs::{CustomMob, InstanceId, MobKind};
use crate::session::Session;
use minigame_host::{BarColor, BarStyle, BossBarId, Entity, EntityId, EntityKind};
use std::sync::{Arc, Mutex};

/// Night terror: invulnerable, fast, relentless, with a red boss bar shown
/// to anyone close enough to worry.
pub struct InvincibleZombie {
    id: InstanceId,
    bar: Mutex<Option<BossBarId>>,
}

impl InvincibleZombie {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: InstanceId::new(),
            bar: Mutex::new(None),
        })
    }
}

impl CustomMob for InvincibleZombie {
    fn kind(&self) -> MobKind {
        MobKind::InvincibleZombie
    }

    fn instance_id(&self) -> InstanceId {
        self.id
    }

    fn entity_kind(&self) -> EntityKind {
        EntityKind::Zombie
    }

    fn customize(&self, entity: &mut Entity) {
        entity.custom_name = Some("Invincible Zombie".to_string());
        entity.name_visible = false;
        entity.invulnerable = true;
        entity.can_pickup_items = false;
        entity.attributes.movement_speed = Some(0.35);
        entity.attributes.follow_range = Some(64.0);
        entity.attributes.attack_damage = Some(6.0);
    }

    fn on_spawned(self: Arc<Self>, session: &Arc<Session>, _entity: EntityId) -> HookSet {
        let bar = session
            .host()
            .create_boss_bar("Invincible Zombie", BarColor::Red, BarStyle::Solid);
        *self.bar.lock().expect("boss bar slot poisoned") = Some(bar);
        HookSet::default()
    }

    fn boss_bar(&self) -> Option<BossBarId> {
        *self.bar.lock().expect("boss bar slot poisoned")
    }

    fn on_death(&self, session: &Arc<Session>) {
        if let Some(bar) = self.bar.lock().expect("boss bar slot poisoned").take() {
            session.host().remove_boss_bar(bar);
        }
    }
}
