//! Copper ore drops iron for participants.

use crate::features::Feature;
use crate::session::Session;
use minigame_host::{BlockBreakEvent, ItemStack, Material, SubscriptionId};
use std::sync::{Arc, Mutex, Weak};

/// While the session runs, copper ore broken by a participant drops an iron
/// ingot instead of its normal drops.
pub struct CopperDropIron {
    session: Weak<Session>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl CopperDropIron {
    pub fn new(session: &Arc<Session>) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let handler = Weak::clone(weak);
            let subscription = session
                .host()
                .events
                .subscribe::<BlockBreakEvent, _>(move |event| {
                    if let Some(feature) = handler.upgrade() {
                        feature.handle_break(event);
                    }
                });
            Self {
                session: Arc::downgrade(session),
                subscription: Mutex::new(Some(subscription)),
            }
        })
    }

    fn handle_break(&self, event: &mut BlockBreakEvent) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        if !session.is_running() || !session.contains_player(event.player) {
            return;
        }
        if matches!(
            event.material,
            Material::CopperOre | Material::DeepslateCopperOre
        ) {
            event.drops = vec![ItemStack::of(Material::IronIngot)];
        }
    }
}

impl Feature for CopperDropIron {
    fn name(&self) -> &'static str {
        "copper_drop_iron"
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
