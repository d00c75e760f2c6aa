//! The random-event catalog.
//!
//! Every firing picks one entry and runs it. One-shot events track their
//! fired flag inside this per-session struct; nothing outlives the session
//! that owns it. A failed firing logs and never stops future firings.

use minigame_core::{BusinessVillager, InvincibleZombie, Session, SpecialDog};
use minigame_host::{Location, PlayerCommandEvent, PlayerId};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Why an event firing did nothing.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("no participants to target")]
    NoParticipants,

    #[error("event already fired this session")]
    AlreadyFired,

    #[error("event only fires at night")]
    NotNight,

    #[error("session has no world")]
    NoWorld,

    #[error("required capability not installed")]
    MissingCapability,
}

/// The fixed catalog entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameEventKind {
    Gift,
    InvincibleZombie,
    Business,
    FreeDog,
}

impl GameEventKind {
    pub const CATALOG: [GameEventKind; 4] = [
        GameEventKind::Gift,
        GameEventKind::InvincibleZombie,
        GameEventKind::Business,
        GameEventKind::FreeDog,
    ];
}

/// Per-session event state: one-shot flags plus dog claim tokens.
#[derive(Default)]
pub struct GameEvents {
    fired: Mutex<HashSet<GameEventKind>>,
    /// Claim token → participants who already redeemed it.
    claims: Mutex<HashMap<String, HashSet<PlayerId>>>,
}

impl GameEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire one randomly chosen catalog entry. Failures are logged and
    /// swallowed so the scheduler keeps running.
    pub fn fire_random(&self, session: &Session) {
        let kind = *GameEventKind::CATALOG
            .choose(&mut rand::thread_rng())
            .expect("catalog is non-empty");
        match self.fire(kind, session) {
            Ok(()) => info!(event = ?kind, "random event fired"),
            Err(err) => warn!(event = ?kind, %err, "random event skipped"),
        }
    }

    pub fn fire(&self, kind: GameEventKind, session: &Session) -> Result<(), EventError> {
        match kind {
            GameEventKind::Gift => self.gift(session),
            GameEventKind::InvincibleZombie => self.invincible_zombie(session),
            GameEventKind::Business => self.business(session),
            GameEventKind::FreeDog => self.free_dog(session),
        }
    }

    pub fn has_fired(&self, kind: GameEventKind) -> bool {
        self.fired.lock().expect("fired set poisoned").contains(&kind)
    }

    fn mark_fired_once(&self, kind: GameEventKind) -> Result<(), EventError> {
        if self.fired.lock().expect("fired set poisoned").insert(kind) {
            Ok(())
        } else {
            Err(EventError::AlreadyFired)
        }
    }

    fn random_participant(session: &Session) -> Result<PlayerId, EventError> {
        let living = session
            .features()
            .death_manager()
            .map(|d| d.living_players())
            .unwrap_or_else(|| session.players());
        living
            .choose(&mut rand::thread_rng())
            .copied()
            .ok_or(EventError::NoParticipants)
    }

    /// Gift: one random participant gets one random registered item.
    fn gift(&self, session: &Session) -> Result<(), EventError> {
        let recipient = Self::random_participant(session)?;
        let items = session
            .features()
            .item_manager()
            .ok_or(EventError::MissingCapability)?;
        let kinds = items.registered_kinds();
        let kind = *kinds
            .choose(&mut rand::thread_rng())
            .ok_or(EventError::MissingCapability)?;
        items.give_item(recipient, kind);

        let host = session.host();
        let name = host
            .with_player(recipient, |p| p.name.clone())
            .unwrap_or_default();
        for player in session.players() {
            if player == recipient {
                host.send_message(player, "\u{a7}dA gift falls into your hands...");
            } else {
                host.send_message(player, format!("\u{a7}d{name} has received a gift."));
            }
        }
        Ok(())
    }

    /// Invincible zombie: night only, once per session, near a random
    /// participant at the surface.
    fn invincible_zombie(&self, session: &Session) -> Result<(), EventError> {
        if self.has_fired(GameEventKind::InvincibleZombie) {
            return Err(EventError::AlreadyFired);
        }
        let world = session.world().ok_or(EventError::NoWorld)?;
        if !world.is_night() {
            return Err(EventError::NotNight);
        }
        let target = Self::random_participant(session)?;
        let mobs = session
            .features()
            .mob_manager()
            .ok_or(EventError::MissingCapability)?;

        let host = session.host();
        let anchor = host
            .with_player(target, |p| p.location.position)
            .ok_or(EventError::NoParticipants)?;
        let mut rng = rand::thread_rng();
        let x = anchor.x + rng.gen_range(-10.0..10.0);
        let z = anchor.z + rng.gen_range(-10.0..10.0);
        let spawn = Location::new(
            world.id,
            minigame_host::Position::new(x, world.highest_block_y(x, z), z),
        );
        mobs.spawn(InvincibleZombie::new() as _, spawn);
        self.mark_fired_once(GameEventKind::InvincibleZombie)?;

        host.broadcast(world.id, "\u{a7}cSomething unkillable walks the night...");
        Ok(())
    }

    /// Mr. Business: once per session, at a random participant. A failed
    /// firing leaves the once-per-session flag unconsumed.
    fn business(&self, session: &Session) -> Result<(), EventError> {
        if self.has_fired(GameEventKind::Business) {
            return Err(EventError::AlreadyFired);
        }
        let target = Self::random_participant(session)?;
        let mobs = session
            .features()
            .mob_manager()
            .ok_or(EventError::MissingCapability)?;

        let host = session.host();
        let Some(location) = host.with_player(target, |p| p.location) else {
            return Err(EventError::NoParticipants);
        };
        mobs.spawn(BusinessVillager::new() as _, location);
        self.mark_fired_once(GameEventKind::Business)?;
        host.broadcast(location.world, "\u{a7}6Mr. Business has arrived.");
        Ok(())
    }

    /// Free dog: broadcast a claim token redeemable once per participant.
    fn free_dog(&self, session: &Session) -> Result<(), EventError> {
        let world = session.world().ok_or(EventError::NoWorld)?;
        let token = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
        self.claims
            .lock()
            .expect("claims poisoned")
            .insert(token.clone(), HashSet::new());
        session.host().broadcast(
            world.id,
            &format!("\u{a7}aA free dog is up for grabs! Run /claimdog {token}"),
        );
        Ok(())
    }

    /// `/claimdog <token>` handler. Valid unclaimed tokens spawn a dog
    /// bonded to the claimant; reuse is rejected with a message.
    pub fn handle_command(&self, session: &Session, event: &mut PlayerCommandEvent) {
        let mut parts = event.message.trim_start_matches('/').split_whitespace();
        if parts.next() != Some("claimdog") {
            return;
        }
        event.cancelled = true;
        let host = session.host();
        let player = event.player;

        if !session.is_running() || !session.contains_player(player) {
            return;
        }
        let Some(token) = parts.next() else {
            host.send_message(player, "\u{a7}cUsage: /claimdog <token>");
            return;
        };

        let mut claims = self.claims.lock().expect("claims poisoned");
        let Some(claimants) = claims.get_mut(token) else {
            host.send_message(player, "\u{a7}cThat token isn't valid.");
            return;
        };
        if !claimants.insert(player) {
            host.send_message(player, "\u{a7}cYou already claimed this dog.");
            return;
        }
        drop(claims);

        let Some(mobs) = session.features().mob_manager() else {
            return;
        };
        if let Some(location) = host.with_player(player, |p| p.location) {
            mobs.spawn(SpecialDog::for_owner(player) as _, location);
        }
    }
}
