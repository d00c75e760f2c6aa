//! Connected player state.
//!
//! Chat messages, titles and action-bar text are collected into per-player
//! outboxes; the real platform would flush these to the network layer, and
//! tests read them back directly.

use crate::inventory::Inventory;
use crate::types::{GameMode, Location, PlayerId, Position};
use serde::{Deserialize, Serialize};

/// Health cap for players.
pub const MAX_HEALTH: f64 = 20.0;

/// Food cap for players.
pub const MAX_FOOD: u32 = 20;

/// A title/subtitle display with timing in ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    pub title: String,
    pub subtitle: String,
    pub fade_in: u32,
    pub stay: u32,
    pub fade_out: u32,
}

impl Title {
    pub fn new(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            fade_in: 10,
            stay: 70,
            fade_out: 20,
        }
    }
}

/// A player connected to this host.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub display_name: String,
    pub list_name: String,
    pub location: Location,
    /// Facing, in degrees. Yaw 0 looks toward +z, pitch -90 straight up.
    pub yaw: f32,
    pub pitch: f32,
    pub health: f64,
    pub food: u32,
    pub level: u32,
    pub exp: f32,
    pub game_mode: GameMode,
    pub inventory: Inventory,
    /// Damage is dropped entirely while set.
    pub invulnerable: bool,
    /// Movement-speed effect amplifier. Zero means no effect.
    pub speed_amplifier: u32,
    pub online: bool,
    /// Chat outbox, newest last.
    pub messages: Vec<String>,
    /// Title outbox, newest last.
    pub titles: Vec<Title>,
    /// Action-bar outbox, newest last.
    pub action_bar: Vec<String>,
}

impl Player {
    pub(crate) fn new(id: PlayerId, name: &str, location: Location) -> Self {
        Self {
            id,
            name: name.to_string(),
            display_name: name.to_string(),
            list_name: name.to_string(),
            location,
            yaw: 0.0,
            pitch: 0.0,
            health: MAX_HEALTH,
            food: MAX_FOOD,
            level: 0,
            exp: 0.0,
            game_mode: GameMode::Survival,
            inventory: Inventory::new(),
            invulnerable: false,
            speed_amplifier: 0,
            online: true,
            messages: Vec::new(),
            titles: Vec::new(),
            action_bar: Vec::new(),
        }
    }

    /// Unit vector of the player's facing.
    pub fn look_direction(&self) -> Position {
        let yaw = (self.yaw as f64).to_radians();
        let pitch = (self.pitch as f64).to_radians();
        Position::new(
            -yaw.sin() * pitch.cos(),
            -pitch.sin(),
            yaw.cos() * pitch.cos(),
        )
    }
}
