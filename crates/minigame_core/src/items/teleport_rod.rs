//! Blaze rod that teleports the holder along their facing.

use crate::items::{CustomItem, ItemKind};
use crate::session::Session;
use minigame_host::{Location, Material, PlayerId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

/// Ticks between uses, per player.
pub const COOLDOWN_TICKS: u64 = 100;

/// Blocks travelled per use.
const TELEPORT_DISTANCE: f64 = 8.0;

/// Right-click to blink forward. Each player has an independent cooldown
/// window.
pub struct TeleportRod {
    session: Weak<Session>,
    last_use: Mutex<HashMap<PlayerId, u64>>,
}

impl TeleportRod {
    pub fn new(session: &Arc<Session>) -> Arc<Self> {
        Arc::new(Self {
            session: Arc::downgrade(session),
            last_use: Mutex::new(HashMap::new()),
        })
    }
}

impl CustomItem for TeleportRod {
    fn kind(&self) -> ItemKind {
        ItemKind::TeleportRod
    }

    fn display_name(&self) -> String {
        "\u{a7}dTeleport Rod".to_string()
    }

    fn material(&self) -> Material {
        Material::BlazeRod
    }

    fn lore(&self) -> Vec<String> {
        vec!["Right-click to blink forward".to_string()]
    }

    fn on_right_click(&self, player: PlayerId) -> bool {
        let Some(session) = self.session.upgrade() else {
            return false;
        };
        let host = session.host();
        let now = host.scheduler.current_tick();

        let mut last_use = self.last_use.lock().expect("cooldown table poisoned");
        if let Some(last) = last_use.get(&player) {
            if now.saturating_sub(*last) < COOLDOWN_TICKS {
                host.send_action_bar(player, "The rod is still recharging");
                return true;
            }
        }

        let destination = host.with_player(player, |p| {
            let dir = p.look_direction();
            Location::new(
                p.location.world,
                p.location.position.offset(
                    dir.x * TELEPORT_DISTANCE,
                    dir.y * TELEPORT_DISTANCE,
                    dir.z * TELEPORT_DISTANCE,
                ),
            )
        });
        if let Some(destination) = destination {
            last_use.insert(player, now);
            drop(last_use);
            host.teleport(player, destination);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minigame_host::Host;

    #[test]
    fn cooldown_blocks_immediate_reuse() {
        let dir = tempfile::tempdir().unwrap();
        let host = Arc::new(Host::new(dir.path()));
        let lobby = host.create_world(Some("lobby"), false).unwrap();
        let world = host.create_world(Some("arena"), true).unwrap();
        let session = Session::new(Arc::clone(&host), lobby);
        session.set_running(true);

        let player = host.connect_player("a", world.spawn_location());
        session.add_player(player);
        let rod = TeleportRod::new(&session);

        let start = host.with_player(player, |p| p.location.position).unwrap();
        rod.on_right_click(player);
        let after_first = host.with_player(player, |p| p.location.position).unwrap();
        assert!(start.distance(&after_first) > 1.0);

        rod.on_right_click(player);
        let after_second = host.with_player(player, |p| p.location.position).unwrap();
        assert_eq!(after_first, after_second);

        for _ in 0..COOLDOWN_TICKS {
            host.tick();
        }
        rod.on_right_click(player);
        let after_third = host.with_player(player, |p| p.location.position).unwrap();
        assert!(after_second.distance(&after_third) > 1.0);
    }
}
