//! The alive → dead state machine.
//!
//! Lethal damage never actually drops a participant to zero health: the
//! damage event is cancelled and the participant transitions to the dead
//! set instead. The transition fires an optional callback exactly once per
//! player, which is where the concrete mode hangs its elimination
//! semantics.

use crate::features::Feature;
use crate::session::Session;
use minigame_host::{EventPriority, PlayerDamageEvent, PlayerId, SubscriptionId};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, Weak};
use tracing::info;

type DeathCallback = Box<dyn Fn(PlayerId) + Send + Sync>;

/// Tracks eliminated participants and converts lethal damage into the dead
/// transition.
pub struct DeathManager {
    session: Weak<Session>,
    dead: Mutex<HashSet<PlayerId>>,
    on_death: Mutex<Option<DeathCallback>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl DeathManager {
    pub fn new(session: &Arc<Session>) -> Arc<Self> {
        let manager = Arc::new_cyclic(|weak: &Weak<Self>| {
            let handler = Weak::clone(weak);
            // Late so the lethality check sees the damage after every
            // mitigating handler (knockback stick and the like) has run.
            let subscription = session.host().events.subscribe_with_priority::<PlayerDamageEvent, _>(
                EventPriority::Late,
                move |event| {
                    if let Some(manager) = handler.upgrade() {
                        manager.handle_damage(event);
                    }
                },
            );
            Self {
                session: Arc::downgrade(session),
                dead: Mutex::new(HashSet::new()),
                on_death: Mutex::new(None),
                subscription: Mutex::new(Some(subscription)),
            }
        });
        manager
    }

    /// Install the single death callback. Replaces any previous one.
    pub fn set_death_callback(&self, callback: impl Fn(PlayerId) + Send + Sync + 'static) {
        *self.on_death.lock().expect("death callback poisoned") = Some(Box::new(callback));
    }

    fn handle_damage(&self, event: &mut PlayerDamageEvent) {
        if event.cancelled {
            return;
        }
        let Some(session) = self.session.upgrade() else {
            return;
        };
        if !session.is_running() || !session.contains_player(event.player) {
            return;
        }

        let lethal = session
            .host()
            .with_player(event.player, |p| p.health - event.damage <= 0.0)
            .unwrap_or(false);
        if lethal {
            event.cancelled = true;
            self.set_player_as_dead(event.player);
        }
    }

    /// Mark a participant dead. Idempotent; the death callback fires only
    /// on the first transition.
    pub fn set_player_as_dead(&self, player: PlayerId) {
        let newly_dead = self.dead.lock().expect("dead set poisoned").insert(player);
        if !newly_dead {
            return;
        }
        info!(%player, "participant eliminated");
        if let Some(callback) = self.on_death.lock().expect("death callback poisoned").as_ref() {
            callback(player);
        }
    }

    /// Bring a dead participant back. Returns `false` without mutating
    /// anything when the target is not in the dead set.
    pub fn revive_player(&self, player: PlayerId) -> bool {
        if !self.dead.lock().expect("dead set poisoned").remove(&player) {
            return false;
        }
        if let Some(session) = self.session.upgrade() {
            if let Some(resetter) = session.features().player_resetter() {
                resetter.reset_player(player);
            }
        }
        info!(%player, "participant revived");
        true
    }

    pub fn is_dead(&self, player: PlayerId) -> bool {
        self.dead.lock().expect("dead set poisoned").contains(&player)
    }

    pub fn dead_players(&self) -> Vec<PlayerId> {
        self.dead.lock().expect("dead set poisoned").iter().copied().collect()
    }

    /// Roster size minus the dead set.
    pub fn living_player_count(&self) -> usize {
        let Some(session) = self.session.upgrade() else {
            return 0;
        };
        let dead = self.dead.lock().expect("dead set poisoned");
        session
            .players()
            .iter()
            .filter(|p| !dead.contains(p))
            .count()
    }

    /// Living participants in roster order.
    pub fn living_players(&self) -> Vec<PlayerId> {
        let Some(session) = self.session.upgrade() else {
            return Vec::new();
        };
        let dead = self.dead.lock().expect("dead set poisoned");
        session
            .players()
            .into_iter()
            .filter(|p| !dead.contains(p))
            .collect()
    }
}

impl Feature for DeathManager {
    fn name(&self) -> &'static str {
        "death_manager"
    }

    fn detach(&self) {
        if let Some(subscription) = self.subscription.lock().expect("subscription poisoned").take()
        {
            if let Some(session) = self.session.upgrade() {
                session.host().events.unsubscribe(subscription);
            }
        }
    }
}
