//! Custom item variants and their manager.
//!
//! Item identity is deterministic per variant: every stack of a kind
//! carries the same marker string, so separately constructed variant
//! instances and long-lived physical stacks always compare equal. Each
//! variant self-registers its own interaction listeners; the manager is
//! registration, bookkeeping and `give_item` only.

mod brazil_stick;
mod cursed_pumpkin;
mod knockback_stick;
mod player_tracker;
mod shoes;
mod shuffle_sword;
mod teleport_rod;
mod wish_item;

pub use brazil_stick::BrazilStick;
pub use cursed_pumpkin::CursedPumpkin;
pub use knockback_stick::KnockbackStick;
pub use player_tracker::PlayerTracker;
pub use shoes::Shoes;
pub use shuffle_sword::ShuffleSword;
pub use teleport_rod::TeleportRod;
pub use wish_item::WishItem;

use crate::features::Feature;
use crate::hooks::HookSet;
use crate::session::Session;
use chat_client::ChatCompletion;
use minigame_host::{
    BlockPlaceEvent, ClickAction, InventoryClickEvent, ItemStack, Material, PlayerId,
    PlayerInteractEvent,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tracing::warn;

/// The closed set of custom item variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    PlayerTracker,
    KnockbackStick,
    TeleportRod,
    ShuffleSword,
    BrazilStick,
    CursedPumpkin,
    Shoes,
    Wish,
}

impl ItemKind {
    pub const ALL: [ItemKind; 8] = [
        ItemKind::PlayerTracker,
        ItemKind::KnockbackStick,
        ItemKind::TeleportRod,
        ItemKind::ShuffleSword,
        ItemKind::BrazilStick,
        ItemKind::CursedPumpkin,
        ItemKind::Shoes,
        ItemKind::Wish,
    ];

    /// The variant's stable identity marker. Derived from the kind, never
    /// stored as instance state, so every construction of the same variant
    /// yields an equal marker.
    pub fn variant_id(self) -> StableVariantId {
        StableVariantId(match self {
            ItemKind::PlayerTracker => "player_tracker",
            ItemKind::KnockbackStick => "knockback_stick",
            ItemKind::TeleportRod => "teleport_rod",
            ItemKind::ShuffleSword => "shuffle_sword",
            ItemKind::BrazilStick => "brazil_stick",
            ItemKind::CursedPumpkin => "cursed_pumpkin",
            ItemKind::Shoes => "quality_shoes",
            ItemKind::Wish => "magic_wish",
        })
    }
}

/// Deterministic per-variant identity, embedded into physical stacks as a
/// hidden marker tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StableVariantId(&'static str);

impl StableVariantId {
    pub fn as_str(self) -> &'static str {
        self.0
    }
}

/// A custom item variant.
///
/// The interaction hooks return whether the triggering interaction should
/// be suppressed; every default is "don't suppress". Hooks only fire while
/// the owning session runs and only for roster participants.
pub trait CustomItem: Send + Sync {
    fn kind(&self) -> ItemKind;

    fn display_name(&self) -> String;

    fn material(&self) -> Material;

    fn lore(&self) -> Vec<String> {
        Vec::new()
    }

    /// Final presentation pass over the built stack.
    fn decorate(&self, _stack: &mut ItemStack) {}

    fn on_left_click(&self, _player: PlayerId) -> bool {
        false
    }

    fn on_right_click(&self, _player: PlayerId) -> bool {
        false
    }

    fn on_place(&self, _player: PlayerId) -> bool {
        false
    }

    fn on_inventory_enter(&self, _player: PlayerId) -> bool {
        false
    }

    fn on_inventory_leave(&self, _player: PlayerId) -> bool {
        false
    }

    /// Register variant-specific listeners and tasks beyond the standard
    /// interaction wiring.
    fn register(self: Arc<Self>, _session: &Arc<Session>) -> HookSet {
        HookSet::default()
    }

    /// Whether a physical stack is an instance of this variant.
    fn is_instance(&self, stack: &ItemStack) -> bool {
        stack.custom_item_marker() == Some(self.kind().variant_id().as_str())
    }
}

/// Build the physical stack for a variant: material, presentation, and the
/// hidden identity marker.
pub fn build_stack(item: &dyn CustomItem) -> ItemStack {
    let mut stack = ItemStack::of(item.material());
    stack.display_name = Some(item.display_name());
    stack.lore = item.lore();
    stack.tags.insert(
        ItemStack::CUSTOM_ITEM_TAG.to_string(),
        item.kind().variant_id().as_str().to_string(),
    );
    item.decorate(&mut stack);
    stack
}

fn holds_marker(stack: &Option<ItemStack>, marker: StableVariantId) -> bool {
    stack
        .as_ref()
        .and_then(|s| s.custom_item_marker())
        .map(|m| m == marker.as_str())
        .unwrap_or(false)
}

/// Wire the standard interaction hooks for one variant: click, place and
/// inventory movement events are matched against the variant's marker and
/// suppressed when the hook asks for it.
fn wire_interaction_hooks(item: Arc<dyn CustomItem>, session: &Arc<Session>) -> HookSet {
    let marker = item.kind().variant_id();
    let events = &session.host().events;
    let mut hooks = HookSet::default();

    let weak = Arc::downgrade(session);
    let variant = Arc::clone(&item);
    hooks
        .subscriptions
        .push(events.subscribe::<PlayerInteractEvent, _>(move |event| {
            let Some(session) = weak.upgrade() else {
                return;
            };
            if !session.is_running()
                || !session.contains_player(event.player)
                || !holds_marker(&event.item, marker)
            {
                return;
            }
            let suppress = match event.action {
                ClickAction::Left => variant.on_left_click(event.player),
                ClickAction::Right => variant.on_right_click(event.player),
            };
            if suppress {
                event.cancelled = true;
            }
        }));

    let weak = Arc::downgrade(session);
    let variant = Arc::clone(&item);
    hooks
        .subscriptions
        .push(events.subscribe::<BlockPlaceEvent, _>(move |event| {
            let Some(session) = weak.upgrade() else {
                return;
            };
            if !session.is_running()
                || !session.contains_player(event.player)
                || !holds_marker(&event.item, marker)
            {
                return;
            }
            if variant.on_place(event.player) {
                event.cancelled = true;
            }
        }));

    let weak = Arc::downgrade(session);
    hooks
        .subscriptions
        .push(events.subscribe::<InventoryClickEvent, _>(move |event| {
            let Some(session) = weak.upgrade() else {
                return;
            };
            if !session.is_running() || !session.contains_player(event.player) {
                return;
            }
            let mut suppress = false;
            if holds_marker(&event.current_item, marker) {
                suppress |= item.on_inventory_leave(event.player);
            }
            if holds_marker(&event.cursor_item, marker) {
                suppress |= item.on_inventory_enter(event.player);
            }
            if suppress {
                event.cancelled = true;
            }
        }));

    hooks
}

/// Constructor closure for one variant kind.
pub type ItemFactory = Box<dyn Fn(&Arc<Session>) -> Arc<dyn CustomItem> + Send + Sync>;

/// Registry of variant constructors, resolved once at startup.
#[derive(Default)]
pub struct ItemFactories {
    factories: HashMap<ItemKind, ItemFactory>,
}

impl ItemFactories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, kind: ItemKind, factory: F)
    where
        F: Fn(&Arc<Session>) -> Arc<dyn CustomItem> + Send + Sync + 'static,
    {
        self.factories.insert(kind, Box::new(factory));
    }

    /// The full standard catalog. The Magic Wish needs a chat-completion
    /// client, so the catalog is parameterized on one.
    pub fn standard(chat: Arc<dyn ChatCompletion>) -> Self {
        let mut factories = Self::new();
        factories.register(ItemKind::PlayerTracker, |s| PlayerTracker::new(s));
        factories.register(ItemKind::KnockbackStick, |s| KnockbackStick::new(s));
        factories.register(ItemKind::TeleportRod, |s| TeleportRod::new(s));
        factories.register(ItemKind::ShuffleSword, |s| ShuffleSword::new(s));
        factories.register(ItemKind::BrazilStick, |s| BrazilStick::new(s));
        factories.register(ItemKind::CursedPumpkin, |s| CursedPumpkin::new(s));
        factories.register(ItemKind::Shoes, |s| Shoes::new(s));
        factories.register(ItemKind::Wish, move |s| {
            WishItem::new(s, Arc::clone(&chat))
        });
        factories
    }

    pub fn construct(
        &self,
        kind: ItemKind,
        session: &Arc<Session>,
    ) -> Option<Arc<dyn CustomItem>> {
        self.factories.get(&kind).map(|f| f(session))
    }

    pub fn kinds(&self) -> Vec<ItemKind> {
        self.factories.keys().copied().collect()
    }
}

struct InstalledItem {
    variant: Arc<dyn CustomItem>,
    hooks: HookSet,
}

/// Registration and bookkeeping for the item catalog.
pub struct CustomItemManager {
    session: Weak<Session>,
    installed: Mutex<HashMap<ItemKind, InstalledItem>>,
}

impl CustomItemManager {
    pub fn new(session: &Arc<Session>) -> Arc<Self> {
        Arc::new(Self {
            session: Arc::downgrade(session),
            installed: Mutex::new(HashMap::new()),
        })
    }

    /// Construct and install every variant the factory registry knows.
    pub fn install_all(&self, factories: &ItemFactories) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        for kind in factories.kinds() {
            if let Some(variant) = factories.construct(kind, &session) {
                self.install(variant);
            }
        }
    }

    /// Install one variant, wiring its standard interaction hooks plus its
    /// own listeners. Installing a kind twice replaces the previous
    /// instance and warns.
    pub fn install(&self, variant: Arc<dyn CustomItem>) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        let kind = variant.kind();
        let mut hooks = wire_interaction_hooks(Arc::clone(&variant), &session);
        hooks.merge(Arc::clone(&variant).register(&session));

        let mut installed = self.installed.lock().expect("item registry poisoned");
        if let Some(mut previous) = installed.insert(kind, InstalledItem { variant, hooks }) {
            warn!(kind = ?kind, "item variant registered twice, replacing previous instance");
            previous.hooks.release(session.host());
        }
    }

    pub fn variant(&self, kind: ItemKind) -> Option<Arc<dyn CustomItem>> {
        self.installed
            .lock()
            .expect("item registry poisoned")
            .get(&kind)
            .map(|i| Arc::clone(&i.variant))
    }

    pub fn registered_kinds(&self) -> Vec<ItemKind> {
        self.installed
            .lock()
            .expect("item registry poisoned")
            .keys()
            .copied()
            .collect()
    }

    /// Build a variant's stack for a roster participant and put it in
    /// their inventory. `false` when the target is not in the roster, the
    /// kind is not installed, or the inventory is full.
    pub fn give_item(&self, player: PlayerId, kind: ItemKind) -> bool {
        let Some(session) = self.session.upgrade() else {
            return false;
        };
        if !session.contains_player(player) {
            return false;
        }
        let Some(variant) = self.variant(kind) else {
            return false;
        };
        session.host().give_item(player, build_stack(variant.as_ref()))
    }
}

impl Feature for CustomItemManager {
    fn name(&self) -> &'static str {
        "custom_item_manager"
    }

    fn detach(&self) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        let mut installed = self.installed.lock().expect("item registry poisoned");
        for (_, item) in installed.iter_mut() {
            item.hooks.release(session.host());
        }
        installed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_markers_are_deterministic_and_distinct() {
        assert_eq!(
            ItemKind::PlayerTracker.variant_id(),
            ItemKind::PlayerTracker.variant_id()
        );
        for a in ItemKind::ALL {
            for b in ItemKind::ALL {
                if a != b {
                    assert_ne!(a.variant_id(), b.variant_id());
                }
            }
        }
    }
}
