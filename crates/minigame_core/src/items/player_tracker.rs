//! Compass that tracks other participants.

use crate::hooks::HookSet;
use crate::items::{CustomItem, ItemKind};
use crate::session::Session;
use minigame_host::{ItemStack, Material, PlayerId, Position};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

/// Re-point the compass only after the target moved this far (squared).
const REFRESH_DISTANCE_SQ: f64 = 25.0;

/// A compass cycling through the other participants on right-click. A
/// per-tick task re-points every held tracker when its target has moved
/// more than 5 blocks since the last update.
pub struct PlayerTracker {
    session: Weak<Session>,
    /// Holder → currently tracked participant.
    targets: Mutex<HashMap<PlayerId, PlayerId>>,
    /// Holder → target position last written to their compasses.
    last_written: Mutex<HashMap<PlayerId, Position>>,
}

impl PlayerTracker {
    pub fn new(session: &Arc<Session>) -> Arc<Self> {
        Arc::new(Self {
            session: Arc::downgrade(session),
            targets: Mutex::new(HashMap::new()),
            last_written: Mutex::new(HashMap::new()),
        })
    }

    /// Advance the holder's target to the next participant (excluding the
    /// holder), wrapping around.
    fn cycle_target(&self, holder: PlayerId) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        let candidates: Vec<PlayerId> = session
            .players()
            .into_iter()
            .filter(|p| *p != holder)
            .collect();
        if candidates.is_empty() {
            session
                .host()
                .send_action_bar(holder, "No one else to track");
            return;
        }

        let mut targets = self.targets.lock().expect("tracker targets poisoned");
        let next = match targets.get(&holder) {
            Some(current) => {
                let idx = candidates.iter().position(|p| p == current);
                candidates[idx.map(|i| (i + 1) % candidates.len()).unwrap_or(0)]
            }
            None => candidates[0],
        };
        targets.insert(holder, next);
        drop(targets);
        self.last_written.lock().expect("tracker cache poisoned").remove(&holder);

        let name = session
            .host()
            .with_player(next, |p| p.name.clone())
            .unwrap_or_else(|| next.to_string());
        session
            .host()
            .send_action_bar(holder, format!("Now tracking {name}"));
    }

    /// One refresh pass, run every tick while the variant is installed.
    fn refresh(&self) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        if !session.is_running() {
            return;
        }
        let host = session.host();
        let targets = self.targets.lock().expect("tracker targets poisoned").clone();
        for (holder, target) in targets {
            let Some(target_pos) = host.with_player(target, |p| p.location.position) else {
                continue;
            };
            let stale = {
                let cache = self.last_written.lock().expect("tracker cache poisoned");
                cache
                    .get(&holder)
                    .map(|last| last.distance_squared(&target_pos) > REFRESH_DISTANCE_SQ)
                    .unwrap_or(true)
            };
            if !stale {
                continue;
            }
            let marker = ItemKind::PlayerTracker.variant_id();
            host.with_player_mut(holder, |p| {
                for stack in p.inventory.items_mut() {
                    if stack.custom_item_marker() == Some(marker.as_str()) {
                        stack.compass_target = Some(target_pos);
                    }
                }
            });
            self.last_written
                .lock()
                .expect("tracker cache poisoned")
                .insert(holder, target_pos);
        }
    }
}

impl CustomItem for PlayerTracker {
    fn kind(&self) -> ItemKind {
        ItemKind::PlayerTracker
    }

    fn display_name(&self) -> String {
        "\u{a7}bPlayer Tracker".to_string()
    }

    fn material(&self) -> Material {
        Material::Compass
    }

    fn lore(&self) -> Vec<String> {
        vec!["Right-click to cycle through players".to_string()]
    }

    fn on_right_click(&self, player: PlayerId) -> bool {
        self.cycle_target(player);
        true
    }

    fn register(self: Arc<Self>, session: &Arc<Session>) -> HookSet {
        let mut hooks = HookSet::default();
        let tracker = Arc::downgrade(&self);
        hooks.tasks.push(session.host().scheduler.run_repeating(1, move || {
            if let Some(tracker) = tracker.upgrade() {
                tracker.refresh();
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
    fn cycling_wraps_and_skips_the_holder() {
        let dir = tempfile::tempdir().unwrap();
        let host = Arc::new(Host::new(dir.path()));
        let lobby = host.create_world(Some("lobby"), false).unwrap();
        let world = host.create_world(Some("arena"), true).unwrap();
        let session = Session::new(Arc::clone(&host), lobby);

        let a = host.connect_player("a", world.spawn_location());
        let b = host.connect_player("b", world.spawn_location());
        let c = host.connect_player("c", world.spawn_location());
        for p in [a, b, c] {
            session.add_player(p);
        }

        let tracker = PlayerTracker::new(&session);
        tracker.cycle_target(a);
        tracker.cycle_target(a);
        tracker.cycle_target(a);
        // Three cycles over two candidates wraps back to the first.
        let target = tracker.targets.lock().unwrap()[&a];
        assert_eq!(target, b);
        assert_ne!(target, a);
    }

    #[test]
    fn refresh_only_rewrites_after_target_moves_far_enough() {
        let dir = tempfile::tempdir().unwrap();
        let host = Arc::new(Host::new(dir.path()));
        let lobby = host.create_world(Some("lobby"), false).unwrap();
        let world = host.create_world(Some("arena"), true).unwrap();
        let session = Session::new(Arc::clone(&host), lobby);
        session.set_running(true);

        let a = host.connect_player("a", world.spawn_location());
        let b = host.connect_player("b", world.spawn_location());
        session.add_player(a);
        session.add_player(b);

        let tracker = PlayerTracker::new(&session);
        host.give_item(a, build_stack(tracker.as_ref()));
        tracker.cycle_target(a);

        tracker.refresh();
        let initial = host
            .with_player(a, |p| p.inventory.items().next().unwrap().compass_target)
            .unwrap();
        assert!(initial.is_some());

        // A 3-block move stays under the 5-block threshold.
        host.with_player_mut(b, |p| p.location.position.x += 3.0);
        tracker.refresh();
        let unchanged = host
            .with_player(a, |p| p.inventory.items().next().unwrap().compass_target)
            .unwrap();
        assert_eq!(unchanged, initial);

        host.with_player_mut(b, |p| p.location.position.x += 10.0);
        tracker.refresh();
        let moved = host
            .with_player(a, |p| p.inventory.items().next().unwrap().compass_target)
            .unwrap();
        assert_ne!(moved, initial);
    }
}
