//! Boots that make the wearer absurdly fast.

use crate::hooks::HookSet;
use crate::items::{CustomItem, ItemKind};
use crate::session::Session;
use minigame_host::{Enchantment, ItemStack, Material, PlayerId};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, Weak};

/// Speed effect amplifier applied while the shoes are worn.
const SPEED_AMPLIFIER: u32 = 39;

/// Ticks between wear checks.
const CHECK_INTERVAL: u64 = 1;

/// Curse-bound leather boots. Right-click to put them on; a per-tick pass
/// keeps the speed effect applied exactly while they stay on.
pub struct Shoes {
    session: Weak<Session>,
    boosted: Arc<Mutex<HashSet<PlayerId>>>,
}

impl Shoes {
    pub fn new(session: &Arc<Session>) -> Arc<Self> {
        Arc::new(Self {
            session: Arc::downgrade(session),
            boosted: Arc::new(Mutex::new(HashSet::new())),
        })
    }
}

fn wearing_shoes(session: &Session, player: PlayerId) -> bool {
    let marker = ItemKind::Shoes.variant_id();
    session
        .host()
        .with_player(player, |p| {
            p.inventory
                .boots()
                .and_then(|s| s.custom_item_marker())
                .map(|m| m == marker.as_str())
                .unwrap_or(false)
        })
        .unwrap_or(false)
}

impl CustomItem for Shoes {
    fn kind(&self) -> ItemKind {
        ItemKind::Shoes
    }

    fn display_name(&self) -> String {
        "\u{a7}bPretty Good Quality Shoes".to_string()
    }

    fn material(&self) -> Material {
        Material::LeatherBoots
    }

    fn lore(&self) -> Vec<String> {
        vec!["Made in China".to_string()]
    }

    fn decorate(&self, stack: &mut ItemStack) {
        stack.enchants.push((Enchantment::BindingCurse, 1));
        stack.hide_enchants = true;
    }

    /// Right-click puts the shoes on when the boots slot is free.
    fn on_right_click(&self, player: PlayerId) -> bool {
        let Some(session) = self.session.upgrade() else {
            return false;
        };
        session.host().with_player_mut(player, |p| {
            if p.inventory.boots().is_none() {
                let shoes = p.inventory.main_hand().cloned();
                p.inventory.set_main_hand(None);
                p.inventory.set_boots(shoes);
            }
        });
        true
    }

    fn register(self: Arc<Self>, session: &Arc<Session>) -> HookSet {
        let mut hooks = HookSet::default();
        let weak = Arc::downgrade(session);
        let boosted = Arc::clone(&self.boosted);
        hooks
            .tasks
            .push(session.host().scheduler.run_repeating(CHECK_INTERVAL, move || {
                let Some(session) = weak.upgrade() else {
                    return;
                };
                let host = session.host();
                let mut boosted = boosted.lock().expect("shoe table poisoned");
                for player in session.players() {
                    if wearing_shoes(&session, player) {
                        boosted.insert(player);
                        host.with_player_mut(player, |p| p.speed_amplifier = SPEED_AMPLIFIER);
                    } else if boosted.remove(&player) {
                        host.with_player_mut(player, |p| p.speed_amplifier = 0);
                    }
                }
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
    fn speed_tracks_whether_the_shoes_are_worn() {
        let dir = tempfile::tempdir().unwrap();
        let host = Arc::new(Host::new(dir.path()));
        let lobby = host.create_world(Some("lobby"), false).unwrap();
        let world = host.create_world(Some("arena"), true).unwrap();
        let session = Session::new(Arc::clone(&host), lobby);
        session.set_running(true);

        let player = host.connect_player("runner", world.spawn_location());
        session.add_player(player);

        let shoes = Shoes::new(&session);
        host.with_player_mut(player, |p| {
            p.inventory.set_main_hand(Some(build_stack(shoes.as_ref())))
        });
        let _hooks = Arc::clone(&shoes).register(&session);

        assert!(shoes.on_right_click(player));
        assert!(host
            .with_player(player, |p| p.inventory.boots().is_some())
            .unwrap());

        host.tick();
        assert_eq!(
            host.with_player(player, |p| p.speed_amplifier).unwrap(),
            SPEED_AMPLIFIER
        );

        // Taking them off drops the effect on the next pass.
        host.with_player_mut(player, |p| p.inventory.set_boots(None));
        host.tick();
        assert_eq!(host.with_player(player, |p| p.speed_amplifier).unwrap(), 0);
    }
}
