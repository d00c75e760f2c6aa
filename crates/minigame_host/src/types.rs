//! # Core Type Definitions
//!
//! Fundamental types shared by every crate in the minigame workspace.
//! Wrapper ID types prevent confusion between the three kinds of identities
//! the host tracks (players, spawned entities, worlds), and the small
//! world-model enums describe the closed vocabulary of materials and
//! creatures the plugin actually touches.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a player connected to the host.
///
/// A wrapper around UUID that provides type safety so player IDs cannot be
/// confused with entity or world IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Creates a new random player ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a player ID from a string representation.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a spawned (non-player) entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Creates a new random entity ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a loaded world instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldId(pub Uuid);

impl WorldId {
    /// Creates a new random world ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorldId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 3D position inside a world.
///
/// Double precision to match the host platform's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    /// Creates a new position with the specified coordinates.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another position.
    pub fn distance(&self, other: &Position) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Squared distance, for comparisons that don't need the root.
    pub fn distance_squared(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Returns this position offset by the given deltas.
    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

/// A position bound to a specific world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: WorldId,
    pub position: Position,
}

impl Location {
    pub fn new(world: WorldId, position: Position) -> Self {
        Self { world, position }
    }
}

/// Play mode of a connected player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    Survival,
    Spectator,
}

/// The closed set of materials the plugin interacts with.
///
/// The host platform knows many more; only the ones custom items, drops and
/// trades reference are modeled here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Material {
    Compass,
    Stick,
    BlazeRod,
    NetheriteSword,
    CarvedPumpkin,
    LeatherBoots,
    Sunflower,
    IronIngot,
    CopperOre,
    DeepslateCopperOre,
    GoldenHelmet,
    GoldenChestplate,
    GoldenLeggings,
    GoldenBoots,
    Dandelion,
    Poppy,
    BlueOrchid,
    RedTulip,
    Cornflower,
    WitherRose,
}

impl Material {
    /// Flowers the merchant accepts as payment and holds for decoration.
    pub const FLOWERS: [Material; 6] = [
        Material::Dandelion,
        Material::Poppy,
        Material::BlueOrchid,
        Material::RedTulip,
        Material::Cornflower,
        Material::WitherRose,
    ];
}

/// Creature kinds spawnable through the custom mob system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Zombie,
    Piglin,
    Wolf,
}

/// Enchantments applied by custom item presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Enchantment {
    Unbreaking,
    Knockback,
    BindingCurse,
}

/// Boss bar color choices exposed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarColor {
    Red,
    Purple,
    White,
}

/// Boss bar render style choices exposed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarStyle {
    Solid,
    Segmented,
}
