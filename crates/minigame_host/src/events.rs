//! Typed, synchronous event bus.
//!
//! All gameplay events are dispatched on the main tick thread; handlers
//! receive `&mut E` so they can cancel an event or rewrite its payload
//! (final damage, drop lists, cook times). Subscriptions are identified by
//! [`SubscriptionId`] and unsubscription is idempotent, which lets session
//! features tear themselves down without tracking whether another teardown
//! path already ran.

use crate::entity::Entity;
use crate::inventory::ItemStack;
use crate::types::{EntityId, Material, PlayerId, Position, WorldId};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::trace;

/// Marker trait for everything that can travel over the bus.
pub trait GameEvent: Any + Send + Sync + 'static {
    /// Event name used for trace logging.
    fn event_name() -> &'static str
    where
        Self: Sized;
}

/// Identifies one registered handler so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// When a handler runs relative to the others for the same event type.
///
/// `Late` handlers run after every `Normal` handler regardless of
/// registration order; they see the event's final payload and cancellation
/// state. Within a tier, registration order holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventPriority {
    Normal,
    Late,
}

type BoxedHandler = Arc<dyn Fn(&mut dyn Any) + Send + Sync>;

struct Registration {
    id: SubscriptionId,
    priority: EventPriority,
    handler: BoxedHandler,
}

/// The bus itself. Cheap to share behind the host's `Arc`.
pub struct EventBus {
    handlers: RwLock<HashMap<TypeId, Vec<Registration>>>,
    next_id: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a handler for events of type `E` at [`EventPriority::Normal`].
    ///
    /// Handlers run in registration order within a priority tier. A handler
    /// may subscribe or unsubscribe other handlers while running; the change
    /// takes effect on the next emit.
    pub fn subscribe<E, F>(&self, handler: F) -> SubscriptionId
    where
        E: GameEvent,
        F: Fn(&mut E) + Send + Sync + 'static,
    {
        self.subscribe_with_priority(EventPriority::Normal, handler)
    }

    /// Register a handler at an explicit priority tier.
    pub fn subscribe_with_priority<E, F>(&self, priority: EventPriority, handler: F) -> SubscriptionId
    where
        E: GameEvent,
        F: Fn(&mut E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let boxed: BoxedHandler = Arc::new(move |any: &mut dyn Any| {
            if let Some(event) = any.downcast_mut::<E>() {
                handler(event);
            }
        });
        self.handlers
            .write()
            .expect("event handler table poisoned")
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Registration {
                id,
                priority,
                handler: boxed,
            });
        trace!(event = E::event_name(), subscription = id.0, "handler subscribed");
        id
    }

    /// Remove a previously registered handler. Unknown IDs are a no-op.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut table = self.handlers.write().expect("event handler table poisoned");
        for list in table.values_mut() {
            list.retain(|r| r.id != id);
        }
    }

    /// Dispatch an event to every handler registered for its type.
    ///
    /// The handler list is snapshotted before dispatch so handlers can
    /// mutate the subscription table mid-flight.
    pub fn emit<E: GameEvent>(&self, event: &mut E) {
        let snapshot: Vec<BoxedHandler> = {
            let table = self.handlers.read().expect("event handler table poisoned");
            match table.get(&TypeId::of::<E>()) {
                Some(list) => {
                    let mut ordered: Vec<&Registration> = list.iter().collect();
                    // Stable sort keeps registration order within a tier.
                    ordered.sort_by_key(|r| r.priority);
                    ordered.iter().map(|r| Arc::clone(&r.handler)).collect()
                }
                None => return,
            }
        };
        trace!(event = E::event_name(), handlers = snapshot.len(), "dispatching");
        for handler in snapshot {
            handler(event as &mut dyn Any);
        }
    }
}

/// Events that downstream handlers may veto.
pub trait Cancellable {
    fn is_cancelled(&self) -> bool;
    fn set_cancelled(&mut self, cancelled: bool);
}

macro_rules! impl_cancellable {
    ($ty:ty) => {
        impl Cancellable for $ty {
            fn is_cancelled(&self) -> bool {
                self.cancelled
            }
            fn set_cancelled(&mut self, cancelled: bool) {
                self.cancelled = cancelled;
            }
        }
    };
}

/// Whether an interaction was a left or a right click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    Left,
    Right,
}

/// A player is about to take damage.
///
/// Cancelling prevents the health change entirely; `damage` is the final
/// amount after host-side reductions.
#[derive(Debug)]
pub struct PlayerDamageEvent {
    pub player: PlayerId,
    pub damager: Option<PlayerId>,
    pub damage: f64,
    pub cancelled: bool,
}

impl GameEvent for PlayerDamageEvent {
    fn event_name() -> &'static str {
        "player_damage"
    }
}
impl_cancellable!(PlayerDamageEvent);

/// A spawned entity is about to take damage.
#[derive(Debug)]
pub struct EntityDamageEvent {
    pub entity: EntityId,
    pub damager: Option<PlayerId>,
    pub damage: f64,
    pub cancelled: bool,
}

impl GameEvent for EntityDamageEvent {
    fn event_name() -> &'static str {
        "entity_damage"
    }
}
impl_cancellable!(EntityDamageEvent);

/// A spawned entity died and has been removed from the registry.
///
/// Carries a snapshot of the entity so late listeners can still read its
/// marker tags.
#[derive(Debug)]
pub struct EntityDeathEvent {
    pub entity: Entity,
}

impl GameEvent for EntityDeathEvent {
    fn event_name() -> &'static str {
        "entity_death"
    }
}

/// A player clicked with (or without) an item in hand.
#[derive(Debug)]
pub struct PlayerInteractEvent {
    pub player: PlayerId,
    pub action: ClickAction,
    pub item: Option<ItemStack>,
    pub cancelled: bool,
}

impl GameEvent for PlayerInteractEvent {
    fn event_name() -> &'static str {
        "player_interact"
    }
}
impl_cancellable!(PlayerInteractEvent);

/// A player right-clicked a spawned entity.
#[derive(Debug)]
pub struct EntityInteractEvent {
    pub player: PlayerId,
    pub entity: EntityId,
    pub cancelled: bool,
}

impl GameEvent for EntityInteractEvent {
    fn event_name() -> &'static str {
        "entity_interact"
    }
}
impl_cancellable!(EntityInteractEvent);

/// A spawned entity acquired a target.
#[derive(Debug)]
pub struct EntityTargetEvent {
    pub entity: EntityId,
    pub target: PlayerId,
    pub cancelled: bool,
}

impl GameEvent for EntityTargetEvent {
    fn event_name() -> &'static str {
        "entity_target"
    }
}
impl_cancellable!(EntityTargetEvent);

/// A player attempts to place a held item as a block.
#[derive(Debug)]
pub struct BlockPlaceEvent {
    pub player: PlayerId,
    pub item: Option<ItemStack>,
    pub position: Position,
    pub cancelled: bool,
}

impl GameEvent for BlockPlaceEvent {
    fn event_name() -> &'static str {
        "block_place"
    }
}
impl_cancellable!(BlockPlaceEvent);

/// A player broke a block; handlers may rewrite the drop list.
#[derive(Debug)]
pub struct BlockBreakEvent {
    pub player: PlayerId,
    pub material: Material,
    pub position: Position,
    pub drops: Vec<ItemStack>,
}

impl GameEvent for BlockBreakEvent {
    fn event_name() -> &'static str {
        "block_break"
    }
}

/// A player clicked inside an inventory view.
///
/// `current_item` is the slot content under the cursor, `cursor_item` the
/// stack being carried.
#[derive(Debug)]
pub struct InventoryClickEvent {
    pub player: PlayerId,
    pub current_item: Option<ItemStack>,
    pub cursor_item: Option<ItemStack>,
    pub cancelled: bool,
}

impl GameEvent for InventoryClickEvent {
    fn event_name() -> &'static str {
        "inventory_click"
    }
}
impl_cancellable!(InventoryClickEvent);

/// A furnace in the given world is about to start smelting.
#[derive(Debug)]
pub struct SmeltStartEvent {
    pub world: WorldId,
    pub input: Material,
    pub cook_time_ticks: u32,
}

impl GameEvent for SmeltStartEvent {
    fn event_name() -> &'static str {
        "smelt_start"
    }
}

/// A player sent a chat message.
#[derive(Debug)]
pub struct PlayerChatEvent {
    pub player: PlayerId,
    pub message: String,
    pub cancelled: bool,
}

impl GameEvent for PlayerChatEvent {
    fn event_name() -> &'static str {
        "player_chat"
    }
}
impl_cancellable!(PlayerChatEvent);

/// A player issued a slash command.
#[derive(Debug)]
pub struct PlayerCommandEvent {
    pub player: PlayerId,
    pub message: String,
    pub cancelled: bool,
}

impl GameEvent for PlayerCommandEvent {
    fn event_name() -> &'static str {
        "player_command"
    }
}
impl_cancellable!(PlayerCommandEvent);
