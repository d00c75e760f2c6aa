//! Pumpkin that locks itself onto another player's head.

use crate::items::{CustomItem, ItemKind};
use crate::session::Session;
use minigame_host::{Enchantment, ItemStack, Material, PlayerId};
use std::sync::{Arc, Weak};

/// Maximum distance to the cursed target, in blocks.
const CURSE_RANGE: f64 = 5.0;

/// Right-click to strap a curse-bound pumpkin onto the nearest player in
/// range. The pumpkin in hand is consumed; with nobody in range nothing is.
pub struct CursedPumpkin {
    session: Weak<Session>,
}

impl CursedPumpkin {
    pub fn new(session: &Arc<Session>) -> Arc<Self> {
        Arc::new(Self {
            session: Arc::downgrade(session),
        })
    }

    fn nearest_target(session: &Session, player: PlayerId) -> Option<PlayerId> {
        let host = session.host();
        let origin = host.with_player(player, |p| p.location)?;
        let mut best: Option<(PlayerId, f64)> = None;
        for other in host.players_in_world(origin.world) {
            if other == player {
                continue;
            }
            let Some(distance) =
                host.with_player(other, |p| p.location.position.distance(&origin.position))
            else {
                continue;
            };
            if distance < best.map(|(_, d)| d).unwrap_or(CURSE_RANGE) {
                best = Some((other, distance));
            }
        }
        best.map(|(id, _)| id)
    }
}

impl CustomItem for CursedPumpkin {
    fn kind(&self) -> ItemKind {
        ItemKind::CursedPumpkin
    }

    fn display_name(&self) -> String {
        "\u{a7}6Cursed Pumpkin".to_string()
    }

    fn material(&self) -> Material {
        Material::CarvedPumpkin
    }

    fn lore(&self) -> Vec<String> {
        vec![
            "Right-click on a player".to_string(),
            "to curse them with a".to_string(),
            "binding pumpkin head!".to_string(),
        ]
    }

    fn on_right_click(&self, player: PlayerId) -> bool {
        let Some(session) = self.session.upgrade() else {
            return false;
        };
        let host = session.host();
        host.send_message(player, "\u{a7}6Looking for a target...");

        let Some(target) = Self::nearest_target(&session, player) else {
            host.send_message(player, "\u{a7}cNo target found within range!");
            return true;
        };

        let mut pumpkin = ItemStack::of(Material::CarvedPumpkin);
        pumpkin.enchants.push((Enchantment::BindingCurse, 1));
        host.with_player_mut(target, |p| p.inventory.set_helmet(Some(pumpkin)));

        let name = host
            .with_player(target, |p| p.name.clone())
            .unwrap_or_default();
        host.send_message(
            player,
            format!("\u{a7}6You cursed {name} with a binding pumpkin!"),
        );
        host.send_message(target, "\u{a7}cYou've been cursed with a binding pumpkin!");

        // Consume the pumpkin that was just used.
        host.with_player_mut(player, |p| {
            let emptied = match p.inventory.main_hand() {
                Some(stack) if stack.count <= 1 => true,
                Some(_) => false,
                None => return,
            };
            if emptied {
                p.inventory.set_main_hand(None);
            } else if let Some(stack) = p.inventory.contents_mut()[0].as_mut() {
                stack.count -= 1;
            }
        });
        true
    }

    /// Placing the pumpkin as a block is always suppressed.
    fn on_place(&self, _player: PlayerId) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::build_stack;
    use minigame_host::{Host, Location};

    fn setup() -> (
        Arc<Host>,
        Arc<Session>,
        Arc<minigame_host::World>,
        tempfile::TempDir,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let host = Arc::new(Host::new(dir.path()));
        let lobby = host.create_world(Some("lobby"), false).unwrap();
        let world = host.create_world(Some("arena"), true).unwrap();
        let session = Session::new(Arc::clone(&host), lobby);
        session.set_running(true);
        (host, session, world, dir)
    }

    #[test]
    fn curses_the_nearest_player_and_consumes_the_pumpkin() {
        let (host, session, world, _dir) = setup();
        let caster = host.connect_player("caster", world.spawn_location());
        let target = host.connect_player("target", world.spawn_location());
        session.add_player(caster);
        session.add_player(target);

        let pumpkin = CursedPumpkin::new(&session);
        host.with_player_mut(caster, |p| {
            p.inventory.set_main_hand(Some(build_stack(pumpkin.as_ref())))
        });

        assert!(pumpkin.on_right_click(caster));
        let helmet = host
            .with_player(target, |p| p.inventory.helmet().cloned())
            .unwrap()
            .unwrap();
        assert_eq!(helmet.material, Material::CarvedPumpkin);
        assert!(helmet.enchants.contains(&(Enchantment::BindingCurse, 1)));
        assert!(host
            .with_player(caster, |p| p.inventory.main_hand().is_none())
            .unwrap());
    }

    #[test]
    fn out_of_range_targets_are_spared() {
        let (host, session, world, _dir) = setup();
        let caster = host.connect_player("caster", world.spawn_location());
        let distant = host.connect_player(
            "distant",
            Location::new(
                world.id,
                world.spawn_location().position.offset(CURSE_RANGE * 3.0, 0.0, 0.0),
            ),
        );
        session.add_player(caster);
        session.add_player(distant);

        let pumpkin = CursedPumpkin::new(&session);
        host.with_player_mut(caster, |p| {
            p.inventory.set_main_hand(Some(build_stack(pumpkin.as_ref())))
        });

        assert!(pumpkin.on_right_click(caster));
        assert!(host
            .with_player(distant, |p| p.inventory.helmet().is_none())
            .unwrap());
        // The pumpkin stays in hand.
        assert!(host
            .with_player(caster, |p| p.inventory.main_hand().is_some())
            .unwrap());
    }
}
