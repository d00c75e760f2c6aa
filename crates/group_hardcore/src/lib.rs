//! # Group Hardcore
//!
//! The concrete game mode: everyone shares one hardcore life. The first
//! participant to die ends the run for the whole group after a short grace
//! window, and a randomized event scheduler keeps the pressure on in
//! between.

pub mod events;

pub use events::{EventError, GameEventKind, GameEvents};

use chat_client::ChatCompletion;
use minigame_core::{
    CopperDropIron, CustomItemManager, CustomMobManager, DeathManager, InstantSmelting,
    ItemFactories, ItemKind, Minigame, PlayerResetter, Session, SessionError, TeamManager,
    WorldManager,
};
use minigame_host::{
    Host, PlayerCommandEvent, PlayerId, SubscriptionId, TaskHandle, Title, World,
};
use rand::Rng;
use std::ops::Range;
use std::sync::{Arc, Mutex, Weak};
use tracing::{info, warn};

/// Delay window between random-event firings, in ticks.
pub const EVENT_WINDOW: Range<u64> = 3600..6000;

/// Grace delay before elimination ends the session, and before teardown
/// relocates everyone, in ticks.
pub const GRACE_TICKS: u64 = 200;

/// The group-hardcore mode.
pub struct GroupHardcore {
    session: Arc<Session>,
    events: GameEvents,
    event_window: Range<u64>,
    scheduler_task: Mutex<Option<TaskHandle>>,
    command_subscription: Mutex<Option<SubscriptionId>>,
    weak_self: Weak<Self>,
}

impl GroupHardcore {
    /// Build the mode with the standard item catalog and event window.
    pub fn new(
        host: Arc<Host>,
        lobby: Arc<World>,
        chat: Arc<dyn ChatCompletion>,
    ) -> Arc<Self> {
        Self::with_event_window(host, lobby, ItemFactories::standard(chat), EVENT_WINDOW)
    }

    /// Full-control constructor used by tests and configuration overrides.
    pub fn with_event_window(
        host: Arc<Host>,
        lobby: Arc<World>,
        factories: ItemFactories,
        event_window: Range<u64>,
    ) -> Arc<Self> {
        let session = Session::new(host, lobby);

        let features = session.features();
        features.install_player_resetter(PlayerResetter::new(&session));
        features.install_death_manager(DeathManager::new(&session));
        features.install_team_manager(TeamManager::new(&session));
        features.install_world_manager(WorldManager::new(&session));
        features.install_instant_smelting(InstantSmelting::new(&session));
        features.install_copper_drop_iron(CopperDropIron::new(&session));
        features.install_mob_manager(CustomMobManager::new(&session));
        let items = CustomItemManager::new(&session);
        items.install_all(&factories);
        features.install_item_manager(items);

        Arc::new_cyclic(|weak: &Weak<Self>| {
            // Elimination semantics for this mode: one death ends the run.
            if let Some(death) = session.features().death_manager() {
                let handler = Weak::clone(weak);
                death.set_death_callback(move |player| {
                    if let Some(game) = handler.upgrade() {
                        game.handle_death(player);
                    }
                });
            }

            // Claim-token commands route into the event catalog.
            let handler = Weak::clone(weak);
            let subscription = session
                .host()
                .events
                .subscribe::<PlayerCommandEvent, _>(move |event| {
                    if let Some(game) = handler.upgrade() {
                        game.events.handle_command(&game.session, event);
                    }
                });

            Self {
                session,
                events: GameEvents::new(),
                event_window,
                scheduler_task: Mutex::new(None),
                command_subscription: Mutex::new(Some(subscription)),
                weak_self: Weak::clone(weak),
            }
        })
    }

    pub fn events(&self) -> &GameEvents {
        &self.events
    }

    fn handle_death(&self, player: PlayerId) {
        let host = self.session.host();
        let name = host
            .with_player(player, |p| p.name.clone())
            .unwrap_or_else(|| player.to_string());
        info!(player = %name, "group hardcore run over");

        let resetter = self.session.features().player_resetter();
        for participant in self.session.players() {
            host.send_title(
                participant,
                Title::new("\u{a7}cGame Over", format!("{name} has died")),
            );
            if let Some(resetter) = &resetter {
                resetter.set_spectator(participant);
            }
        }

        // End after the grace window unless a manual stop got there first.
        let weak = Weak::clone(&self.weak_self);
        host.scheduler.run_later(GRACE_TICKS, move || {
            if let Some(game) = weak.upgrade() {
                if game.session.is_running() {
                    game.end();
                }
            }
        });
    }

    fn arm_event_scheduler(&self) {
        let delay = rand::thread_rng().gen_range(self.event_window.clone());
        let weak = Weak::clone(&self.weak_self);
        let handle = self.session.host().scheduler.run_later(delay, move || {
            let Some(game) = weak.upgrade() else {
                return;
            };
            if !game.session.is_running() {
                return;
            }
            game.events.fire_random(&game.session);
            game.arm_event_scheduler();
        });
        *self
            .scheduler_task
            .lock()
            .expect("scheduler slot poisoned") = Some(handle);
    }

    fn cancel_event_scheduler(&self) {
        if let Some(task) = self
            .scheduler_task
            .lock()
            .expect("scheduler slot poisoned")
            .take()
        {
            task.cancel();
        }
    }
}

impl Minigame for GroupHardcore {
    fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn on_start(&self) -> Result<(), SessionError> {
        if self.session.is_running() {
            return Err(SessionError::AlreadyRunning);
        }
        let features = self.session.features();
        let worlds = features.world_manager().ok_or(SessionError::Gone)?;

        // World provisioning is fatal to the start sequence; the running
        // flag stays false on failure.
        let world = worlds.create_world(None)?;
        self.session.set_running(true);

        let host = self.session.host();
        let resetter = features.player_resetter();
        let items = features.item_manager();
        for player in self.session.players() {
            host.teleport(player, world.spawn_location());
            if let Some(resetter) = &resetter {
                resetter.reset_player(player);
            }
            if let Some(items) = &items {
                items.give_item(player, ItemKind::PlayerTracker);
            }
            host.send_title(
                player,
                Title::new("\u{a7}aGroup Hardcore", "One life. Shared."),
            );
        }
        host.broadcast(world.id, "\u{a7}aThe run begins. Stay alive, together.");

        self.arm_event_scheduler();
        info!(world = %world.name, players = self.session.player_count(), "group hardcore started");
        Ok(())
    }

    fn on_end(&self) {
        self.session.set_running(false);
        self.cancel_event_scheduler();
        if let Some(subscription) = self
            .command_subscription
            .lock()
            .expect("subscription poisoned")
            .take()
        {
            self.session.host().events.unsubscribe(subscription);
        }

        // The teardown task keeps the game alive until it runs, even if
        // every outside handle is dropped right after the stop.
        let Some(game) = self.weak_self.upgrade() else {
            return;
        };
        self.session
            .host()
            .scheduler
            .run_later(GRACE_TICKS, move || {
                let features = game.session.features();
                if let Some(worlds) = features.world_manager() {
                    // Relocates everyone to the lobby before deleting.
                    if let Err(err) = worlds.delete_world() {
                        warn!(%err, "session world teardown failed");
                    }
                }
                if let Some(resetter) = features.player_resetter() {
                    for player in game.session.players() {
                        resetter.reset_player(player);
                    }
                }
                features.detach_all();
                info!("group hardcore session torn down");
            });
    }

    fn on_player_join(&self, player: PlayerId) {
        self.session.add_player(player);
        if let Some(resetter) = self.session.features().player_resetter() {
            resetter.reset_joining_player(player);
        }
    }

    fn on_player_leave(&self, player: PlayerId) {
        self.session.remove_player(player);
        if let Some(worlds) = self.session.features().world_manager() {
            worlds.teleport_to_lobby(player);
        }
        if let Some(resetter) = self.session.features().player_resetter() {
            resetter.reset_player(player);
        }
    }

    fn on_player_rejoin(&self, player: PlayerId) {
        if !self.session.contains_player(player) || !self.session.is_running() {
            return;
        }
        let host = self.session.host();
        if let Some(world) = self.session.world() {
            host.teleport(player, world.spawn_location());
        }
        let dead = self
            .session
            .features()
            .death_manager()
            .map(|d| d.is_dead(player))
            .unwrap_or(false);
        if dead {
            if let Some(resetter) = self.session.features().player_resetter() {
                resetter.set_spectator(player);
            }
        }
    }
}
