//! Item stacks and the fixed-size player inventory.

use crate::types::{Enchantment, Material, Position};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of general-purpose slots in a player inventory.
pub const INVENTORY_SLOTS: usize = 36;

/// Maximum stack size for plain materials.
pub const MAX_STACK: u32 = 64;

/// A stack of items, possibly decorated with custom presentation and
/// hidden marker tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    pub material: Material,
    pub count: u32,
    pub display_name: Option<String>,
    pub lore: Vec<String>,
    pub enchants: Vec<(Enchantment, u32)>,
    /// Hide enchantment glint text from the tooltip while keeping the glow.
    pub hide_enchants: bool,
    /// Hidden string tags, invisible to players. Custom item identity lives
    /// under [`ItemStack::CUSTOM_ITEM_TAG`].
    pub tags: HashMap<String, String>,
    /// Lodestone-style tracking target for compasses.
    pub compass_target: Option<Position>,
}

impl ItemStack {
    /// Tag key carrying a custom item variant marker.
    pub const CUSTOM_ITEM_TAG: &'static str = "custom_item_id";

    /// A plain stack of one item with no decoration.
    pub fn of(material: Material) -> Self {
        Self::with_count(material, 1)
    }

    pub fn with_count(material: Material, count: u32) -> Self {
        Self {
            material,
            count,
            display_name: None,
            lore: Vec::new(),
            enchants: Vec::new(),
            hide_enchants: false,
            tags: HashMap::new(),
            compass_target: None,
        }
    }

    /// The custom item marker, if this stack carries one.
    pub fn custom_item_marker(&self) -> Option<&str> {
        self.tags.get(Self::CUSTOM_ITEM_TAG).map(String::as_str)
    }

    /// Whether two stacks can merge into one slot: same material, no custom
    /// decoration on either side.
    fn stackable_with(&self, other: &ItemStack) -> bool {
        self.material == other.material
            && self.tags.is_empty()
            && other.tags.is_empty()
            && self.display_name.is_none()
            && other.display_name.is_none()
            && self.enchants.is_empty()
            && other.enchants.is_empty()
    }
}

/// A fixed-size slot inventory plus the two armor slots custom items care
/// about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    slots: Vec<Option<ItemStack>>,
    #[serde(default)]
    helmet: Option<ItemStack>,
    #[serde(default)]
    boots: Option<ItemStack>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

impl Inventory {
    pub fn new() -> Self {
        Self {
            slots: vec![None; INVENTORY_SLOTS],
            helmet: None,
            boots: None,
        }
    }

    /// Insert a stack, merging into compatible slots first, then filling the
    /// first empty slot. Returns `false` (and leaves the inventory
    /// unchanged) when nothing fits.
    pub fn add_item(&mut self, item: ItemStack) -> bool {
        for slot in self.slots.iter_mut().flatten() {
            if slot.stackable_with(&item) && slot.count + item.count <= MAX_STACK {
                slot.count += item.count;
                return true;
            }
        }
        for slot in self.slots.iter_mut() {
            if slot.is_none() {
                *slot = Some(item);
                return true;
            }
        }
        false
    }

    /// Remove every stack, armor included, returning how many general
    /// slots were occupied.
    pub fn clear(&mut self) -> usize {
        let occupied = self.slots.iter().filter(|s| s.is_some()).count();
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.helmet = None;
        self.boots = None;
        occupied
    }

    /// Slot 0 by convention; the host treats it as the held item.
    pub fn main_hand(&self) -> Option<&ItemStack> {
        self.slots.first().and_then(Option::as_ref)
    }

    pub fn set_main_hand(&mut self, item: Option<ItemStack>) {
        if let Some(slot) = self.slots.first_mut() {
            *slot = item;
        }
    }

    pub fn helmet(&self) -> Option<&ItemStack> {
        self.helmet.as_ref()
    }

    pub fn set_helmet(&mut self, item: Option<ItemStack>) {
        self.helmet = item;
    }

    pub fn boots(&self) -> Option<&ItemStack> {
        self.boots.as_ref()
    }

    pub fn set_boots(&mut self, item: Option<ItemStack>) {
        self.boots = item;
    }

    pub fn contents(&self) -> &[Option<ItemStack>] {
        &self.slots
    }

    pub fn contents_mut(&mut self) -> &mut [Option<ItemStack>] {
        &mut self.slots
    }

    /// Replace the entire slot array. Extra entries are dropped, missing
    /// entries become empty slots.
    pub fn set_contents(&mut self, contents: Vec<Option<ItemStack>>) {
        let mut contents = contents;
        contents.resize(INVENTORY_SLOTS, None);
        self.slots = contents;
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(|s| s.is_some())
    }

    /// Iterator over occupied slots.
    pub fn items(&self) -> impl Iterator<Item = &ItemStack> {
        self.slots.iter().flatten()
    }

    /// Mutable iterator over occupied slots.
    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut ItemStack> {
        self.slots.iter_mut().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_item_fills_and_reports_full() {
        let mut inv = Inventory::new();
        for _ in 0..INVENTORY_SLOTS {
            assert!(inv.add_item(ItemStack::of(Material::Compass).tagged()));
        }
        assert!(inv.is_full());
        assert!(!inv.add_item(ItemStack::of(Material::Stick).tagged()));
    }

    impl ItemStack {
        /// Test helper: make a stack non-stackable so each add consumes a slot.
        fn tagged(mut self) -> Self {
            self.tags.insert("t".into(), "v".into());
            self
        }
    }

    #[test]
    fn plain_stacks_merge() {
        let mut inv = Inventory::new();
        assert!(inv.add_item(ItemStack::with_count(Material::IronIngot, 10)));
        assert!(inv.add_item(ItemStack::with_count(Material::IronIngot, 10)));
        assert_eq!(inv.items().count(), 1);
        assert_eq!(inv.items().next().unwrap().count, 20);
    }

    #[test]
    fn decorated_stacks_do_not_merge() {
        let mut inv = Inventory::new();
        let mut named = ItemStack::of(Material::Stick);
        named.display_name = Some("special".into());
        assert!(inv.add_item(named.clone()));
        assert!(inv.add_item(named));
        assert_eq!(inv.items().count(), 2);
    }
}
