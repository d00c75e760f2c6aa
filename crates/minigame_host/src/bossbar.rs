//! Boss status bars.
//!
//! Bars are plain host resources; which players see a bar is decided by
//! whoever owns it (the custom mob system gates viewers on proximity).

use crate::types::{BarColor, BarStyle, PlayerId};
use std::collections::HashSet;
use uuid::Uuid;

/// Unique identifier for a boss bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BossBarId(pub Uuid);

impl BossBarId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BossBarId {
    fn default() -> Self {
        Self::new()
    }
}

/// A boss bar with its current progress and viewer set.
#[derive(Debug, Clone)]
pub struct BossBar {
    pub id: BossBarId,
    pub title: String,
    pub color: BarColor,
    pub style: BarStyle,
    /// Fill fraction, `0.0..=1.0`.
    pub progress: f64,
    pub viewers: HashSet<PlayerId>,
}

impl BossBar {
    pub(crate) fn new(title: &str, color: BarColor, style: BarStyle) -> Self {
        Self {
            id: BossBarId::new(),
            title: title.to_string(),
            color,
            style,
            progress: 1.0,
            viewers: HashSet::new(),
        }
    }
}
