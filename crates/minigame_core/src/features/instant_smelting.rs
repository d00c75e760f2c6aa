//! Zero-tick smelting inside the session world.

use crate::features::Feature;
use crate::session::Session;
use minigame_host::{SmeltStartEvent, SubscriptionId};
use std::sync::{Arc, Mutex, Weak};

/// Drops furnace cook time to zero while the session runs.
pub struct InstantSmelting {
    session: Weak<Session>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl InstantSmelting {
    pub fn new(session: &Arc<Session>) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let handler = Weak::clone(weak);
            let subscription = session
                .host()
                .events
                .subscribe::<SmeltStartEvent, _>(move |event| {
                    if let Some(feature) = handler.upgrade() {
                        feature.handle_smelt(event);
                    }
                });
            Self {
                session: Arc::downgrade(session),
                subscription: Mutex::new(Some(subscription)),
            }
        })
    }

    fn handle_smelt(&self, event: &mut SmeltStartEvent) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        if !session.is_running() {
            return;
        }
        if session.world().map(|w| w.id) == Some(event.world) {
            event.cook_time_ticks = 0;
        }
    }
}

impl Feature for InstantSmelting {
    fn name(&self) -> &'static str {
        "instant_smelting"
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
