//! # Minigame Host
//!
//! In-process model of the game host a minigame plugin runs inside: players,
//! spawned entities, worlds on disk, boss bars, a typed event bus and a
//! tick-counted scheduler. Game logic lives in the crates layered on top;
//! this crate only provides the platform surface they program against.
//!
//! All gameplay state is mutated on one logical tick thread. Async work
//! (outbound HTTP, for instance) hands its results back through
//! [`TickScheduler::run_next_tick`] and never touches host state directly.

pub mod bossbar;
pub mod entity;
pub mod events;
pub mod inventory;
pub mod player;
pub mod scheduler;
pub mod types;
pub mod world;

pub use bossbar::{BossBar, BossBarId};
pub use entity::{AttributeOverrides, Entity, Equipment};
pub use events::{
    BlockBreakEvent, BlockPlaceEvent, Cancellable, ClickAction, EntityDamageEvent,
    EntityDeathEvent, EntityInteractEvent, EntityTargetEvent, EventBus, EventPriority, GameEvent,
    InventoryClickEvent, PlayerChatEvent, PlayerCommandEvent, PlayerDamageEvent,
    PlayerInteractEvent, SmeltStartEvent, SubscriptionId,
};
pub use inventory::{Inventory, ItemStack, INVENTORY_SLOTS, MAX_STACK};
pub use player::{Player, Title, MAX_FOOD, MAX_HEALTH};
pub use scheduler::{TaskHandle, TickScheduler};
pub use types::{
    BarColor, BarStyle, Enchantment, EntityId, EntityKind, GameMode, Location, Material, PlayerId,
    Position, WorldId,
};
pub use world::{World, WorldError, WorldRegistry, DAY_LENGTH, NIGHT_END, NIGHT_START};

use dashmap::DashMap;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Default furnace cook time in ticks, before any handler rewrites it.
pub const DEFAULT_COOK_TIME: u32 = 200;

/// The host platform a plugin runs inside.
///
/// Shared behind an `Arc` by everything above it. Internal maps are
/// concurrent, but events are always emitted with no map guard held so
/// handlers are free to call back into the host.
pub struct Host {
    pub events: EventBus,
    pub scheduler: TickScheduler,
    pub worlds: WorldRegistry,
    players: DashMap<PlayerId, Player>,
    entities: DashMap<EntityId, Entity>,
    boss_bars: DashMap<BossBarId, BossBar>,
    console_log: Mutex<Vec<String>>,
}

impl Host {
    /// Create a host whose worlds live under `worlds_root`.
    pub fn new(worlds_root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            events: EventBus::new(),
            scheduler: TickScheduler::new(),
            worlds: WorldRegistry::new(worlds_root),
            players: DashMap::new(),
            entities: DashMap::new(),
            boss_bars: DashMap::new(),
            console_log: Mutex::new(Vec::new()),
        }
    }

    /// Advance the host by one tick: world clocks first, then every
    /// scheduled task that came due.
    pub fn tick(&self) {
        self.worlds.advance_time();
        self.scheduler.advance();
    }

    // ---- players ----------------------------------------------------------

    /// Connect a player at the given location. The returned ID identifies
    /// the player for the rest of the session.
    pub fn connect_player(&self, name: &str, location: Location) -> PlayerId {
        let id = PlayerId::new();
        info!(player = %name, id = %id, "player connected");
        self.players.insert(id, Player::new(id, name, location));
        id
    }

    pub fn disconnect_player(&self, id: PlayerId) {
        if let Some(mut player) = self.players.get_mut(&id) {
            player.online = false;
            info!(player = %player.name, "player disconnected");
        }
    }

    /// Read a player's state through a closure. Returns `None` for unknown
    /// players.
    pub fn with_player<R>(&self, id: PlayerId, f: impl FnOnce(&Player) -> R) -> Option<R> {
        self.players.get(&id).map(|p| f(&p))
    }

    /// Mutate a player's state through a closure.
    ///
    /// The map guard is held for the duration of the closure; do not emit
    /// events or call other player accessors from inside it.
    pub fn with_player_mut<R>(&self, id: PlayerId, f: impl FnOnce(&mut Player) -> R) -> Option<R> {
        self.players.get_mut(&id).map(|mut p| f(&mut p))
    }

    /// IDs of all players ever connected, online or not.
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| *p.key()).collect()
    }

    /// IDs of currently online players.
    pub fn online_players(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|p| p.online)
            .map(|p| *p.key())
            .collect()
    }

    /// Online players currently inside the given world.
    pub fn players_in_world(&self, world: WorldId) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|p| p.online && p.location.world == world)
            .map(|p| *p.key())
            .collect()
    }

    pub fn send_message(&self, id: PlayerId, message: impl Into<String>) {
        if let Some(mut player) = self.players.get_mut(&id) {
            player.messages.push(message.into());
        }
    }

    pub fn send_title(&self, id: PlayerId, title: Title) {
        if let Some(mut player) = self.players.get_mut(&id) {
            player.titles.push(title);
        }
    }

    pub fn send_action_bar(&self, id: PlayerId, text: impl Into<String>) {
        if let Some(mut player) = self.players.get_mut(&id) {
            player.action_bar.push(text.into());
        }
    }

    /// Send a chat message to every online player in a world.
    pub fn broadcast(&self, world: WorldId, message: &str) {
        for id in self.players_in_world(world) {
            self.send_message(id, message);
        }
    }

    pub fn teleport(&self, id: PlayerId, location: Location) {
        if let Some(mut player) = self.players.get_mut(&id) {
            debug!(player = %player.name, world = %location.world, "teleport");
            player.location = location;
        }
    }

    /// Put an item into a player's inventory. Returns `false` when the
    /// inventory is full or the player is unknown.
    pub fn give_item(&self, id: PlayerId, item: ItemStack) -> bool {
        match self.players.get_mut(&id) {
            Some(mut player) => {
                let added = player.inventory.add_item(item);
                if !added {
                    warn!(player = %player.name, "inventory full, item not given");
                }
                added
            }
            None => false,
        }
    }

    /// Route damage to a player through the event bus.
    ///
    /// Emits [`PlayerDamageEvent`] first; a cancelled event or an
    /// invulnerable target leaves health untouched. Returns the final
    /// applied damage.
    pub fn damage_player(&self, id: PlayerId, damager: Option<PlayerId>, damage: f64) -> f64 {
        let invulnerable = match self.players.get(&id) {
            Some(player) => player.invulnerable,
            None => return 0.0,
        };
        if invulnerable {
            return 0.0;
        }

        let mut event = PlayerDamageEvent {
            player: id,
            damager,
            damage,
            cancelled: false,
        };
        self.events.emit(&mut event);
        if event.cancelled {
            return 0.0;
        }

        if let Some(mut player) = self.players.get_mut(&id) {
            player.health = (player.health - event.damage).max(0.0);
        }
        event.damage
    }

    // ---- entities ---------------------------------------------------------

    /// Spawn a creature and return its ID.
    pub fn spawn_entity(&self, kind: EntityKind, location: Location) -> EntityId {
        let entity = Entity::new(kind, location);
        let id = entity.id;
        debug!(kind = ?kind, id = %id, "entity spawned");
        self.entities.insert(id, entity);
        id
    }

    pub fn with_entity<R>(&self, id: EntityId, f: impl FnOnce(&Entity) -> R) -> Option<R> {
        self.entities.get(&id).map(|e| f(&e))
    }

    /// Mutate an entity's state through a closure. Same guard caveat as
    /// [`Host::with_player_mut`].
    pub fn with_entity_mut<R>(&self, id: EntityId, f: impl FnOnce(&mut Entity) -> R) -> Option<R> {
        self.entities.get_mut(&id).map(|mut e| f(&mut e))
    }

    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.iter().map(|e| *e.key()).collect()
    }

    pub fn entities_in_world(&self, world: WorldId) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|e| e.location.world == world)
            .map(|e| *e.key())
            .collect()
    }

    /// Despawn an entity without firing a death event.
    pub fn remove_entity(&self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id).map(|(_, e)| e)
    }

    /// Route damage to an entity through the event bus.
    ///
    /// Invulnerable entities and cancelled events take no damage. An entity
    /// reduced to zero health is removed from the registry before
    /// [`EntityDeathEvent`] fires with its final snapshot.
    pub fn damage_entity(&self, id: EntityId, damager: Option<PlayerId>, damage: f64) -> f64 {
        let invulnerable = match self.entities.get(&id) {
            Some(entity) => entity.invulnerable,
            None => return 0.0,
        };

        let mut event = EntityDamageEvent {
            entity: id,
            damager,
            damage,
            cancelled: false,
        };
        self.events.emit(&mut event);
        if event.cancelled || invulnerable {
            return 0.0;
        }

        let dead = match self.entities.get_mut(&id) {
            Some(mut entity) => {
                entity.health = (entity.health - event.damage).max(0.0);
                entity.health <= 0.0
            }
            None => false,
        };

        if dead {
            if let Some((_, snapshot)) = self.entities.remove(&id) {
                debug!(id = %id, kind = ?snapshot.kind, "entity died");
                let mut death = EntityDeathEvent { entity: snapshot };
                self.events.emit(&mut death);
            }
        }
        event.damage
    }

    // ---- worlds -----------------------------------------------------------

    /// Create a world; see [`WorldRegistry::create`].
    pub fn create_world(
        &self,
        name: Option<&str>,
        generate_structures: bool,
    ) -> Result<std::sync::Arc<World>, WorldError> {
        self.worlds.create(name, generate_structures)
    }

    /// Unload a world. Refused while online players remain inside, so the
    /// caller can evacuate and retry.
    pub fn unload_world(&self, id: WorldId) -> Result<std::sync::Arc<World>, WorldError> {
        let world = self.worlds.get(id).ok_or(WorldError::UnknownWorld(id))?;
        let occupants = self.players_in_world(id).len();
        if occupants > 0 {
            return Err(WorldError::StillOccupied {
                name: world.name.clone(),
                players: occupants,
            });
        }
        self.worlds
            .remove(id)
            .ok_or(WorldError::UnknownWorld(id))
    }

    /// Unload a world and delete its directory.
    pub fn delete_world(&self, id: WorldId) -> Result<(), WorldError> {
        let world = self.unload_world(id)?;
        self.worlds.delete_files(&world)
    }

    // ---- boss bars --------------------------------------------------------

    pub fn create_boss_bar(&self, title: &str, color: BarColor, style: BarStyle) -> BossBarId {
        let bar = BossBar::new(title, color, style);
        let id = bar.id;
        self.boss_bars.insert(id, bar);
        id
    }

    pub fn with_boss_bar<R>(&self, id: BossBarId, f: impl FnOnce(&BossBar) -> R) -> Option<R> {
        self.boss_bars.get(&id).map(|b| f(&b))
    }

    pub fn with_boss_bar_mut<R>(
        &self,
        id: BossBarId,
        f: impl FnOnce(&mut BossBar) -> R,
    ) -> Option<R> {
        self.boss_bars.get_mut(&id).map(|mut b| f(&mut b))
    }

    pub fn remove_boss_bar(&self, id: BossBarId) -> Option<BossBar> {
        self.boss_bars.remove(&id).map(|(_, b)| b)
    }

    // ---- input routing ----------------------------------------------------

    /// A player clicked with whatever is in their main hand.
    pub fn player_interact(&self, id: PlayerId, action: ClickAction) -> PlayerInteractEvent {
        let item = self
            .players
            .get(&id)
            .and_then(|p| p.inventory.main_hand().cloned());
        let mut event = PlayerInteractEvent {
            player: id,
            action,
            item,
            cancelled: false,
        };
        self.events.emit(&mut event);
        event
    }

    /// A player right-clicked a spawned entity.
    pub fn player_interact_entity(&self, player: PlayerId, entity: EntityId) -> EntityInteractEvent {
        let mut event = EntityInteractEvent {
            player,
            entity,
            cancelled: false,
        };
        self.events.emit(&mut event);
        event
    }

    /// A player attacked an entity with melee damage.
    pub fn player_attack_entity(&self, player: PlayerId, entity: EntityId, damage: f64) -> f64 {
        self.damage_entity(entity, Some(player), damage)
    }

    /// An entity acquired a player as its target. Returns `false` when a
    /// handler vetoed the targeting.
    pub fn entity_target(&self, entity: EntityId, target: PlayerId) -> bool {
        let mut event = EntityTargetEvent {
            entity,
            target,
            cancelled: false,
        };
        self.events.emit(&mut event);
        !event.cancelled
    }

    /// A player sent chat. Uncancelled chat is broadcast to the player's
    /// world.
    pub fn player_chat(&self, id: PlayerId, message: &str) -> PlayerChatEvent {
        let mut event = PlayerChatEvent {
            player: id,
            message: message.to_string(),
            cancelled: false,
        };
        self.events.emit(&mut event);
        if !event.cancelled {
            let line = self
                .players
                .get(&id)
                .map(|p| format!("<{}> {}", p.display_name, event.message));
            let world = self.players.get(&id).map(|p| p.location.world);
            if let (Some(line), Some(world)) = (line, world) {
                self.broadcast(world, &line);
            }
        }
        event
    }

    /// A player issued a slash command.
    pub fn player_command(&self, id: PlayerId, message: &str) -> PlayerCommandEvent {
        let mut event = PlayerCommandEvent {
            player: id,
            message: message.to_string(),
            cancelled: false,
        };
        self.events.emit(&mut event);
        event
    }

    /// A furnace starts smelting. Handlers may shorten or stretch the cook
    /// time; the final value is returned.
    pub fn start_smelt(&self, world: WorldId, input: Material) -> u32 {
        let mut event = SmeltStartEvent {
            world,
            input,
            cook_time_ticks: DEFAULT_COOK_TIME,
        };
        self.events.emit(&mut event);
        event.cook_time_ticks
    }

    // ---- console ----------------------------------------------------------

    /// Run a console command. The host records the line; observers (tests,
    /// ops tooling) read it back through [`Host::console_commands`].
    pub fn dispatch_console_command(&self, command: impl Into<String>) {
        let command = command.into();
        info!(%command, "console dispatch");
        self.console_log
            .lock()
            .expect("console log poisoned")
            .push(command);
    }

    pub fn console_commands(&self) -> Vec<String> {
        self.console_log
            .lock()
            .expect("console log poisoned")
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_with_world() -> (Host, std::sync::Arc<World>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let host = Host::new(dir.path());
        let world = host.create_world(Some("arena"), true).unwrap();
        (host, world, dir)
    }

    #[test]
    fn cancelled_damage_leaves_health_untouched() {
        let (host, world, _dir) = host_with_world();
        let id = host.connect_player("alice", world.spawn_location());

        host.events
            .subscribe::<PlayerDamageEvent, _>(|ev| ev.cancelled = true);
        let applied = host.damage_player(id, None, 6.0);

        assert_eq!(applied, 0.0);
        assert_eq!(host.with_player(id, |p| p.health).unwrap(), MAX_HEALTH);
    }

    #[test]
    fn lethal_damage_removes_entity_and_fires_death() {
        let (host, world, _dir) = host_with_world();
        let entity = host.spawn_entity(EntityKind::Wolf, world.spawn_location());

        let died = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let died2 = std::sync::Arc::clone(&died);
        host.events.subscribe::<EntityDeathEvent, _>(move |ev| {
            assert_eq!(ev.entity.kind, EntityKind::Wolf);
            died2.store(true, std::sync::atomic::Ordering::SeqCst);
        });

        host.damage_entity(entity, None, 100.0);
        assert!(died.load(std::sync::atomic::Ordering::SeqCst));
        assert!(host.with_entity(entity, |_| ()).is_none());
    }

    #[test]
    fn invulnerable_entities_shrug_off_damage() {
        let (host, world, _dir) = host_with_world();
        let entity = host.spawn_entity(EntityKind::Zombie, world.spawn_location());
        host.with_entity_mut(entity, |e| e.invulnerable = true);

        assert_eq!(host.damage_entity(entity, None, 50.0), 0.0);
        assert_eq!(host.with_entity(entity, |e| e.health).unwrap(), 20.0);
    }

    #[test]
    fn unload_refused_while_occupied() {
        let (host, world, _dir) = host_with_world();
        let id = host.connect_player("bob", world.spawn_location());

        assert!(matches!(
            host.unload_world(world.id),
            Err(WorldError::StillOccupied { players: 1, .. })
        ));

        host.disconnect_player(id);
        assert!(host.unload_world(world.id).is_ok());
    }

    #[test]
    fn chat_broadcasts_to_world_unless_cancelled() {
        let (host, world, _dir) = host_with_world();
        let a = host.connect_player("a", world.spawn_location());
        let b = host.connect_player("b", world.spawn_location());

        host.player_chat(a, "hello");
        assert_eq!(
            host.with_player(b, |p| p.messages.clone()).unwrap(),
            vec!["<a> hello".to_string()]
        );

        host.events
            .subscribe::<PlayerChatEvent, _>(|ev| ev.cancelled = true);
        host.player_chat(a, "silenced");
        assert_eq!(host.with_player(b, |p| p.messages.len()).unwrap(), 1);
    }

    #[test]
    fn smelt_cook_time_is_rewritable() {
        let (host, world, _dir) = host_with_world();
        assert_eq!(host.start_smelt(world.id, Material::IronIngot), DEFAULT_COOK_TIME);
        host.events
            .subscribe::<SmeltStartEvent, _>(|ev| ev.cook_time_ticks = 1);
        assert_eq!(host.start_smelt(world.id, Material::IronIngot), 1);
    }
}
