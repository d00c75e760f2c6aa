//! Stick that knocks players around without hurting them.

use crate::hooks::HookSet;
use crate::items::{CustomItem, ItemKind};
use crate::session::Session;
use minigame_host::{
    Enchantment, EntityDamageEvent, ItemStack, Material, PlayerDamageEvent,
};
use std::sync::{Arc, Weak};

const KNOCKBACK_LEVEL: u32 = 3;

/// A heavily enchanted stick: hits on players deal zero damage (knockback
/// only) and hits on anything else are cancelled outright.
pub struct KnockbackStick {
    session: Weak<Session>,
}

impl KnockbackStick {
    pub fn new(session: &Arc<Session>) -> Arc<Self> {
        Arc::new(Self {
            session: Arc::downgrade(session),
        })
    }
}

fn damager_holds_stick(session: &Session, damager: Option<minigame_host::PlayerId>) -> bool {
    let Some(damager) = damager else {
        return false;
    };
    let marker = ItemKind::KnockbackStick.variant_id();
    session
        .host()
        .with_player(damager, |p| {
            p.inventory
                .main_hand()
                .and_then(|s| s.custom_item_marker())
                .map(|m| m == marker.as_str())
                .unwrap_or(false)
        })
        .unwrap_or(false)
}

impl CustomItem for KnockbackStick {
    fn kind(&self) -> ItemKind {
        ItemKind::KnockbackStick
    }

    fn display_name(&self) -> String {
        "\u{a7}6Knockback Stick".to_string()
    }

    fn material(&self) -> Material {
        Material::Stick
    }

    fn lore(&self) -> Vec<String> {
        vec!["Sends them flying".to_string()]
    }

    fn decorate(&self, stack: &mut ItemStack) {
        stack.enchants.push((Enchantment::Knockback, KNOCKBACK_LEVEL));
    }

    fn register(self: Arc<Self>, session: &Arc<Session>) -> HookSet {
        let mut hooks = HookSet::default();
        let events = &session.host().events;

        let weak = Arc::downgrade(session);
        hooks
            .subscriptions
            .push(events.subscribe::<PlayerDamageEvent, _>(move |event| {
                let Some(session) = weak.upgrade() else {
                    return;
                };
                if session.is_running() && damager_holds_stick(&session, event.damager) {
                    event.damage = 0.0;
                }
            }));

        let weak = Arc::downgrade(session);
        hooks
            .subscriptions
            .push(events.subscribe::<EntityDamageEvent, _>(move |event| {
                let Some(session) = weak.upgrade() else {
                    return;
                };
                if session.is_running() && damager_holds_stick(&session, event.damager) {
                    event.cancelled = true;
                }
            }));

        hooks
    }
}
