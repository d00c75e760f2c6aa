//! Restores players to a clean play state.

use crate::features::Feature;
use crate::session::Session;
use minigame_host::{GameMode, PlayerId, MAX_FOOD, MAX_HEALTH};
use std::sync::{Arc, Weak};

/// Resets health, hunger, experience, game mode and inventory.
pub struct PlayerResetter {
    session: Weak<Session>,
}

impl PlayerResetter {
    pub fn new(session: &Arc<Session>) -> Arc<Self> {
        Arc::new(Self {
            session: Arc::downgrade(session),
        })
    }

    /// Full reset: survival mode, full health and food, zeroed experience,
    /// cleared inventory.
    pub fn reset_player(&self, player: PlayerId) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        session.host().with_player_mut(player, |p| {
            p.game_mode = GameMode::Survival;
            p.health = MAX_HEALTH;
            p.food = MAX_FOOD;
            p.level = 0;
            p.exp = 0.0;
            p.invulnerable = false;
            p.speed_amplifier = 0;
            p.inventory.clear();
        });
    }

    /// Freeze a player into spectator presentation without touching the
    /// rest of their state.
    pub fn set_spectator(&self, player: PlayerId) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        session
            .host()
            .with_player_mut(player, |p| p.game_mode = GameMode::Spectator);
    }

    /// Reset applied to players as they join a not-yet-started session.
    pub fn reset_joining_player(&self, player: PlayerId) {
        self.reset_player(player);
    }
}

impl Feature for PlayerResetter {
    fn name(&self) -> &'static str {
        "player_resetter"
    }

    fn detach(&self) {}
}
