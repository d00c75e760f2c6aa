//! A loyal dog with a steep price.

use crate::hooks::HookSet;
use crate::mobs::{CustomMob, InstanceId, MobKind};
use crate::session::Session;
use minigame_host::{Entity, EntityId, EntityKind, PlayerChatEvent, PlayerId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tracing::info;

/// Ticks before an unnamed dog gets the default name.
pub const NAMING_DEADLINE_TICKS: u64 = 600;

/// Damage dealt to the owner when their dog dies. Lethal by design of the
/// game mode.
pub const OWNER_DEATH_PENALTY: f64 = 100.0;

const DEFAULT_NAME: &str = "Dog";

/// A wolf bonded to the nearest participant at spawn. The owner names it
/// via their next chat line (or it defaults after a deadline), and pays
/// with their life when it dies.
pub struct SpecialDog {
    id: InstanceId,
    owner: Mutex<Option<PlayerId>>,
    named: AtomicBool,
    entity: Mutex<Option<EntityId>>,
}

impl SpecialDog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: InstanceId::new(),
            owner: Mutex::new(None),
            named: AtomicBool::new(false),
            entity: Mutex::new(None),
        })
    }

    /// Spawn a dog already bonded to a specific participant.
    pub fn for_owner(owner: PlayerId) -> Arc<Self> {
        let dog = Self::new();
        *dog.owner.lock().expect("owner slot poisoned") = Some(owner);
        dog
    }

    pub fn owner(&self) -> Option<PlayerId> {
        *self.owner.lock().expect("owner slot poisoned")
    }

    fn apply_name(&self, session: &Session, name: &str) {
        if self.named.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(entity) = *self.entity.lock().expect("entity slot poisoned") {
            session
                .host()
                .with_entity_mut(entity, |e| e.custom_name = Some(name.to_string()));
        }
        if let Some(owner) = self.owner() {
            session
                .host()
                .send_message(owner, format!("\u{a7}aYour dog is now called {name}."));
        }
    }

    fn bond_nearest(&self, session: &Session, entity: EntityId) {
        let host = session.host();
        let Some(position) = host.with_entity(entity, |e| e.location.position) else {
            return;
        };
        let nearest = session
            .players()
            .into_iter()
            .filter_map(|p| {
                host.with_player(p, |pl| (p, pl.location.position.distance(&position)))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(p, _)| p);
        *self.owner.lock().expect("owner slot poisoned") = nearest;
    }
}

impl CustomMob for SpecialDog {
    fn kind(&self) -> MobKind {
        MobKind::SpecialDog
    }

    fn instance_id(&self) -> InstanceId {
        self.id
    }

    fn entity_kind(&self) -> EntityKind {
        EntityKind::Wolf
    }

    fn customize(&self, entity: &mut Entity) {
        entity.custom_name = Some("???".to_string());
        entity.name_visible = true;
        entity.can_pickup_items = false;
    }

    fn on_spawned(self: Arc<Self>, session: &Arc<Session>, entity: EntityId) -> HookSet {
        *self.entity.lock().expect("entity slot poisoned") = Some(entity);
        if self.owner().is_none() {
            self.bond_nearest(session, entity);
        }

        let host = session.host();
        if let Some(owner) = self.owner() {
            host.send_message(owner, "\u{a7}aA dog has chosen you! Name it in chat.");
        }

        let mut hooks = HookSet::default();

        let dog = Arc::downgrade(&self);
        let weak: Weak<Session> = Arc::downgrade(session);
        hooks
            .subscriptions
            .push(host.events.subscribe::<PlayerChatEvent, _>(move |event| {
                let (Some(dog), Some(session)) = (dog.upgrade(), weak.upgrade()) else {
                    return;
                };
                if dog.named.load(Ordering::SeqCst) || dog.owner() != Some(event.player) {
                    return;
                }
                event.cancelled = true;
                dog.apply_name(&session, event.message.trim());
            }));

        let dog = Arc::downgrade(&self);
        let weak: Weak<Session> = Arc::downgrade(session);
        hooks
            .tasks
            .push(host.scheduler.run_later(NAMING_DEADLINE_TICKS, move || {
                if let (Some(dog), Some(session)) = (dog.upgrade(), weak.upgrade()) {
                    dog.apply_name(&session, DEFAULT_NAME);
                }
            }));

        hooks
    }

    fn on_death(&self, session: &Arc<Session>) {
        let Some(owner) = self.owner() else {
            return;
        };
        info!(%owner, "dog died, owner pays the price");
        session
            .host()
            .send_message(owner, "\u{a7}cYour dog has died. So do you.");
        session.host().damage_player(owner, None, OWNER_DEATH_PENALTY);
    }
}
