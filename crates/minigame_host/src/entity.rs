//! Spawned (non-player) entity state.

use crate::inventory::ItemStack;
use crate::types::{EntityId, EntityKind, Location};
use std::collections::HashMap;

/// Per-attribute overrides applied on top of the host defaults.
///
/// `None` leaves the host's default for that attribute untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeOverrides {
    pub movement_speed: Option<f64>,
    pub attack_damage: Option<f64>,
    pub follow_range: Option<f64>,
    pub knockback_resistance: Option<f64>,
    pub armor: Option<f64>,
    pub armor_toughness: Option<f64>,
}

/// Worn and held equipment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Equipment {
    pub helmet: Option<ItemStack>,
    pub chestplate: Option<ItemStack>,
    pub leggings: Option<ItemStack>,
    pub boots: Option<ItemStack>,
    pub main_hand: Option<ItemStack>,
}

/// A living creature spawned into a world.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub location: Location,
    pub health: f64,
    pub max_health: f64,
    pub custom_name: Option<String>,
    pub name_visible: bool,
    pub invulnerable: bool,
    pub can_pickup_items: bool,
    pub attributes: AttributeOverrides,
    pub equipment: Equipment,
    /// Hidden string tags. Custom mob identity lives under
    /// [`Entity::CUSTOM_MOB_TAG`].
    pub tags: HashMap<String, String>,
}

impl Entity {
    /// Tag key carrying a custom mob instance marker.
    pub const CUSTOM_MOB_TAG: &'static str = "custom_mob_id";

    pub(crate) fn new(kind: EntityKind, location: Location) -> Self {
        let max_health = match kind {
            EntityKind::Zombie => 20.0,
            EntityKind::Piglin => 16.0,
            EntityKind::Wolf => 8.0,
        };
        Self {
            id: EntityId::new(),
            kind,
            location,
            health: max_health,
            max_health,
            custom_name: None,
            name_visible: false,
            invulnerable: false,
            can_pickup_items: true,
            attributes: AttributeOverrides::default(),
            equipment: Equipment::default(),
            tags: HashMap::new(),
        }
    }

    /// The custom mob marker, if this entity carries one.
    pub fn custom_mob_marker(&self) -> Option<&str> {
        self.tags.get(Self::CUSTOM_MOB_TAG).map(String::as_str)
    }

    /// Health as a fraction of maximum, clamped to `0.0..=1.0`.
    pub fn health_fraction(&self) -> f64 {
        (self.health / self.max_health).clamp(0.0, 1.0)
    }
}
