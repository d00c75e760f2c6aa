//! Palette-driven team assignment.

use crate::features::Feature;
use crate::session::Session;
use minigame_host::PlayerId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tracing::info;

/// Fixed team palette: name plus chat color code applied to member display
/// names.
pub const TEAM_PALETTE: [(&str, &str); 6] = [
    ("Red", "\u{a7}c"),
    ("Blue", "\u{a7}9"),
    ("Green", "\u{a7}a"),
    ("Yellow", "\u{a7}e"),
    ("Aqua", "\u{a7}b"),
    ("Gold", "\u{a7}6"),
];

const RESET_CODE: &str = "\u{a7}r";

#[derive(Default)]
struct TeamState {
    /// Team name → members, in assignment order.
    teams: HashMap<String, Vec<PlayerId>>,
    /// Member → team name.
    by_player: HashMap<PlayerId, String>,
}

/// Splits the roster into colored teams and keeps the bidirectional
/// membership index.
pub struct TeamManager {
    session: Weak<Session>,
    state: Mutex<TeamState>,
}

impl TeamManager {
    pub fn new(session: &Arc<Session>) -> Arc<Self> {
        Arc::new(Self {
            session: Arc::downgrade(session),
            state: Mutex::new(TeamState::default()),
        })
    }

    /// Number of teams for a roster of `players`: half the roster, at least
    /// 2, capped by the palette.
    pub fn team_count_for(players: usize) -> usize {
        (players / 2).max(2).min(TEAM_PALETTE.len())
    }

    /// Assign every roster participant to a team, round-robin in join
    /// order. Clears any previous assignment first.
    pub fn assign_players_to_teams(&self) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        self.clear_teams();

        let players = session.players();
        let count = Self::team_count_for(players.len());
        let mut state = self.state.lock().expect("team state poisoned");
        for (idx, player) in players.into_iter().enumerate() {
            let (name, color) = TEAM_PALETTE[idx % count];
            state.teams.entry(name.to_string()).or_default().push(player);
            state.by_player.insert(player, name.to_string());
            session.host().with_player_mut(player, |p| {
                p.display_name = format!("{}{}{}", color, p.name, RESET_CODE);
                p.list_name = p.display_name.clone();
            });
        }
        info!(teams = count, "roster split into teams");
    }

    pub fn team_of(&self, player: PlayerId) -> Option<String> {
        self.state
            .lock()
            .expect("team state poisoned")
            .by_player
            .get(&player)
            .cloned()
    }

    pub fn members_of(&self, team: &str) -> Vec<PlayerId> {
        self.state
            .lock()
            .expect("team state poisoned")
            .teams
            .get(team)
            .cloned()
            .unwrap_or_default()
    }

    pub fn team_names(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("team state poisoned")
            .teams
            .keys()
            .cloned()
            .collect()
    }

    /// Members of a team that the death manager still counts as alive.
    /// Without a death manager installed, every member counts.
    pub fn living_count(&self, team: &str) -> usize {
        let members = self.members_of(team);
        let death = self
            .session
            .upgrade()
            .and_then(|s| s.features().death_manager());
        match death {
            Some(death) => members.iter().filter(|p| !death.is_dead(**p)).count(),
            None => members.len(),
        }
    }

    /// Remove one player from their team and restore their plain name.
    pub fn remove_player(&self, player: PlayerId) {
        let mut state = self.state.lock().expect("team state poisoned");
        if let Some(team) = state.by_player.remove(&player) {
            if let Some(members) = state.teams.get_mut(&team) {
                members.retain(|p| *p != player);
            }
        }
        drop(state);
        self.restore_name(player);
    }

    /// Drop every team and restore all member names.
    pub fn clear_teams(&self) {
        let assigned: Vec<PlayerId> = {
            let mut state = self.state.lock().expect("team state poisoned");
            let assigned = state.by_player.keys().copied().collect();
            state.teams.clear();
            state.by_player.clear();
            assigned
        };
        for player in assigned {
            self.restore_name(player);
        }
    }

    fn restore_name(&self, player: PlayerId) {
        if let Some(session) = self.session.upgrade() {
            session.host().with_player_mut(player, |p| {
                p.display_name = p.name.clone();
                p.list_name = p.name.clone();
            });
        }
    }
}

impl Feature for TeamManager {
    fn name(&self) -> &'static str {
        "team_manager"
    }

    fn detach(&self) {
        self.clear_teams();
    }
}
