//! Mr. Business, the flower merchant.

use crate::hooks::HookSet;
use crate::items::build_stack;
use crate::mobs::{CustomMob, InstanceId, MobKind};
use crate::session::Session;
use minigame_host::{
    Entity, EntityId, EntityInteractEvent, EntityKind, EntityTargetEvent, ItemStack, Material,
    PlayerId,
};
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Flowers per custom item.
pub const FLOWER_PRICE: u32 = 5;

const GREETINGS: [&str; 4] = [
    "Mr. Business, at your service.",
    "Flowers in, wonders out.",
    "I only deal in petals, friend.",
    "Business is blooming.",
];

/// An invulnerable merchant piglin. Right-clicking trades flowers for
/// custom items; hostile AI never targets anyone.
pub struct BusinessVillager {
    id: InstanceId,
}

impl BusinessVillager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: InstanceId::new(),
        })
    }

    fn trade(session: &Session, player: PlayerId) {
        let host = session.host();
        let holding_flowers = host
            .with_player(player, |p| {
                p.inventory
                    .main_hand()
                    .filter(|s| Material::FLOWERS.contains(&s.material) && s.tags.is_empty())
                    .map(|s| s.count)
                    .unwrap_or(0)
            })
            .unwrap_or(0);

        if holding_flowers < FLOWER_PRICE {
            let greeting = GREETINGS
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(GREETINGS[0]);
            host.send_message(player, format!("\u{a7}6{greeting}"));
            host.send_message(
                player,
                format!("\u{a7}6Any custom item for {FLOWER_PRICE} flowers in hand."),
            );
            return;
        }

        let Some(items) = session.features().item_manager() else {
            return;
        };
        let kinds = items.registered_kinds();
        let Some(kind) = kinds.choose(&mut rand::thread_rng()).copied() else {
            return;
        };
        let Some(variant) = items.variant(kind) else {
            return;
        };

        let stack = build_stack(variant.as_ref());
        host.with_player_mut(player, |p| {
            if let Some(hand) = p.inventory.contents_mut().first_mut() {
                match hand {
                    Some(s) if s.count > FLOWER_PRICE => s.count -= FLOWER_PRICE,
                    _ => *hand = None,
                }
            }
        });
        if host.give_item(player, stack) {
            debug!(%player, item = ?kind, "flower trade completed");
            host.send_message(player, "\u{a7}6A pleasure doing business.");
        }
    }
}

impl CustomMob for BusinessVillager {
    fn kind(&self) -> MobKind {
        MobKind::BusinessVillager
    }

    fn instance_id(&self) -> InstanceId {
        self.id
    }

    fn entity_kind(&self) -> EntityKind {
        EntityKind::Piglin
    }

    fn customize(&self, entity: &mut Entity) {
        entity.custom_name = Some("\u{a7}6Mr. Business".to_string());
        entity.name_visible = true;
        entity.invulnerable = true;
        entity.can_pickup_items = false;
        entity.attributes.movement_speed = Some(0.0);
        entity.equipment.helmet = Some(ItemStack::of(Material::GoldenHelmet));
        entity.equipment.chestplate = Some(ItemStack::of(Material::GoldenChestplate));
        entity.equipment.leggings = Some(ItemStack::of(Material::GoldenLeggings));
        entity.equipment.boots = Some(ItemStack::of(Material::GoldenBoots));
        let flower = Material::FLOWERS[rand::thread_rng().gen_range(0..Material::FLOWERS.len())];
        entity.equipment.main_hand = Some(ItemStack::of(flower));
    }

    fn on_spawned(self: Arc<Self>, session: &Arc<Session>, entity: EntityId) -> HookSet {
        let mut hooks = HookSet::default();
        let events = &session.host().events;

        hooks
            .subscriptions
            .push(events.subscribe::<EntityTargetEvent, _>(move |event| {
                if event.entity == entity {
                    event.cancelled = true;
                }
            }));

        let weak: Weak<Session> = Arc::downgrade(session);
        hooks
            .subscriptions
            .push(events.subscribe::<EntityInteractEvent, _>(move |event| {
                if event.entity != entity {
                    return;
                }
                event.cancelled = true;
                let Some(session) = weak.upgrade() else {
                    return;
                };
                if session.is_running() && session.contains_player(event.player) {
                    Self::trade(&session, event.player);
                }
            }));

        hooks
    }
}
