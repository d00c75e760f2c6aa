//! Sword that scrambles the wielder's own inventory on a hit.

use crate::hooks::HookSet;
use crate::items::{CustomItem, ItemKind};
use crate::session::Session;
use minigame_host::{Enchantment, ItemStack, Material, PlayerDamageEvent, PlayerId};
use rand::seq::SliceRandom;
use std::sync::{Arc, Weak};

/// A netherite sword with a cost: every time it connects with another
/// participant, the attacker's inventory slots are shuffled.
pub struct ShuffleSword {
    session: Weak<Session>,
}

impl ShuffleSword {
    pub fn new(session: &Arc<Session>) -> Arc<Self> {
        Arc::new(Self {
            session: Arc::downgrade(session),
        })
    }

    fn shuffle_inventory(session: &Session, player: PlayerId) {
        session.host().with_player_mut(player, |p| {
            let mut contents = p.inventory.contents().to_vec();
            contents.shuffle(&mut rand::thread_rng());
            p.inventory.set_contents(contents);
        });
    }
}

impl CustomItem for ShuffleSword {
    fn kind(&self) -> ItemKind {
        ItemKind::ShuffleSword
    }

    fn display_name(&self) -> String {
        "\u{a7}5Shuffle Sword".to_string()
    }

    fn material(&self) -> Material {
        Material::NetheriteSword
    }

    fn lore(&self) -> Vec<String> {
        vec![
            "Hits hard".to_string(),
            "...but scrambles your pockets".to_string(),
        ]
    }

    fn decorate(&self, stack: &mut ItemStack) {
        stack.enchants.push((Enchantment::Unbreaking, 3));
        stack.hide_enchants = true;
    }

    fn register(self: Arc<Self>, session: &Arc<Session>) -> HookSet {
        let mut hooks = HookSet::default();
        let weak = Arc::downgrade(session);
        let marker = ItemKind::ShuffleSword.variant_id();
        hooks.subscriptions.push(
            session
                .host()
                .events
                .subscribe::<PlayerDamageEvent, _>(move |event| {
                    let Some(session) = weak.upgrade() else {
                        return;
                    };
                    let Some(attacker) = event.damager else {
                        return;
                    };
                    if !session.is_running() || !session.contains_player(event.player) {
                        return;
                    }
                    let holds = session
                        .host()
                        .with_player(attacker, |p| {
                            p.inventory
                                .main_hand()
                                .and_then(|s| s.custom_item_marker())
                                .map(|m| m == marker.as_str())
                                .unwrap_or(false)
                        })
                        .unwrap_or(false);
                    if holds {
                        Self::shuffle_inventory(&session, attacker);
                    }
                }),
        );
        hooks
    }
}
