//! Stick that deports whoever it hits to somewhere far, far away.

use crate::hooks::HookSet;
use crate::items::{CustomItem, ItemKind};
use crate::session::Session;
use minigame_host::{Enchantment, ItemStack, Location, Material, PlayerDamageEvent, Position};
use rand::Rng;
use std::sync::{Arc, Weak};
use tracing::warn;

/// Ticks between the hit and the departure.
const TELEPORT_DELAY_TICKS: u64 = 5;

/// Ticks of invulnerability after arrival, against fall damage and ambushes.
const INVULNERABLE_TICKS: u64 = 60;

/// How far the trip goes, in blocks.
const JOURNEY_MIN: f64 = 200.0;
const JOURNEY_MAX: f64 = 400.0;

/// Hitting a fellow participant with this ships them a few hundred blocks
/// away, at the surface, briefly invulnerable so the trip itself cannot
/// kill them.
pub struct BrazilStick {
    session: Weak<Session>,
}

impl BrazilStick {
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
    let marker = ItemKind::BrazilStick.variant_id();
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

impl CustomItem for BrazilStick {
    fn kind(&self) -> ItemKind {
        ItemKind::BrazilStick
    }

    fn display_name(&self) -> String {
        "\u{a7}aBrazil Stick".to_string()
    }

    fn material(&self) -> Material {
        Material::Stick
    }

    fn lore(&self) -> Vec<String> {
        vec![
            "Hit a player to".to_string(),
            "send them to Brazil!".to_string(),
        ]
    }

    fn decorate(&self, stack: &mut ItemStack) {
        stack.enchants.push((Enchantment::Unbreaking, 1));
        stack.hide_enchants = true;
    }

    fn register(self: Arc<Self>, session: &Arc<Session>) -> HookSet {
        let mut hooks = HookSet::default();
        let weak = Arc::downgrade(session);
        hooks
            .subscriptions
            .push(session.host().events.subscribe::<PlayerDamageEvent, _>(move |event| {
                let Some(session) = weak.upgrade() else {
                    return;
                };
                if !session.is_running()
                    || !session.contains_player(event.player)
                    || !damager_holds_stick(&session, event.damager)
                {
                    return;
                }
                event.cancelled = true;

                let host = session.host();
                let victim = event.player;
                let sender = event.damager;
                let weak = Arc::downgrade(&session);
                host.scheduler.run_later(TELEPORT_DELAY_TICKS, move || {
                    let Some(session) = weak.upgrade() else {
                        return;
                    };
                    let host = session.host();
                    let Some(origin) = host.with_player(victim, |p| p.location) else {
                        return;
                    };
                    let Some(world) = host.worlds.get(origin.world) else {
                        warn!(%victim, "trip target world is gone");
                        return;
                    };

                    let mut rng = rand::thread_rng();
                    let angle: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
                    let distance = rng.gen_range(JOURNEY_MIN..JOURNEY_MAX);
                    let x = origin.position.x + angle.cos() * distance;
                    let z = origin.position.z + angle.sin() * distance;
                    let destination = Location::new(
                        world.id,
                        Position::new(x, world.highest_block_y(x, z), z),
                    );

                    host.with_player_mut(victim, |p| p.invulnerable = true);
                    host.teleport(victim, destination);
                    host.send_message(victim, "\u{a7}aYou've been sent to Brazil!");
                    if let Some(sender) = sender {
                        let name = host
                            .with_player(victim, |p| p.name.clone())
                            .unwrap_or_default();
                        host.send_message(
                            sender,
                            format!("\u{a7}aYou sent {name} to Brazil!"),
                        );
                    }

                    let weak = Arc::downgrade(&session);
                    host.scheduler.run_later(INVULNERABLE_TICKS, move || {
                        if let Some(session) = weak.upgrade() {
                            session
                                .host()
                                .with_player_mut(victim, |p| p.invulnerable = false);
                        }
                    });
                });
            }));
        hooks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::build_stack;
    use minigame_host::Host;

    #[test]
    fn a_hit_ships_the_victim_far_away_with_a_protection_window() {
        let dir = tempfile::tempdir().unwrap();
        let host = Arc::new(Host::new(dir.path()));
        let lobby = host.create_world(Some("lobby"), false).unwrap();
        let world = host.create_world(Some("arena"), true).unwrap();
        let session = Session::new(Arc::clone(&host), lobby);
        session.set_running(true);

        let attacker = host.connect_player("a", world.spawn_location());
        let victim = host.connect_player("b", world.spawn_location());
        session.add_player(attacker);
        session.add_player(victim);

        let stick = BrazilStick::new(&session);
        host.with_player_mut(attacker, |p| {
            p.inventory.set_main_hand(Some(build_stack(stick.as_ref())))
        });
        let _hooks = stick.register(&session);

        let start = host.with_player(victim, |p| p.location.position).unwrap();
        assert_eq!(host.damage_player(victim, Some(attacker), 5.0), 0.0);
        // Nothing moves until the delayed task runs.
        assert_eq!(
            host.with_player(victim, |p| p.location.position).unwrap(),
            start
        );

        for _ in 0..TELEPORT_DELAY_TICKS {
            host.tick();
        }
        let arrived = host.with_player(victim, |p| p.location.position).unwrap();
        assert!(start.distance(&arrived) >= JOURNEY_MIN - 1.0);
        assert!(host.with_player(victim, |p| p.invulnerable).unwrap());
        assert_eq!(host.damage_player(victim, None, 10.0), 0.0);

        for _ in 0..INVULNERABLE_TICKS {
            host.tick();
        }
        assert!(!host.with_player(victim, |p| p.invulnerable).unwrap());
    }
}
