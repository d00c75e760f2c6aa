//! # Minigame Core
//!
//! The session model and its pluggable capabilities: the abstract
//! [`Minigame`] contract, the per-session [`FeatureSet`], the six
//! capability modules, and the custom item/mob variant families. Concrete
//! game modes (see the `group_hardcore` crate) compose these against a
//! `minigame_host::Host`.

pub mod features;
pub mod hooks;
pub mod items;
pub mod mobs;
pub mod session;

pub use features::{
    CopperDropIron, DeathManager, Feature, FeatureSet, InstantSmelting, PlayerResetter,
    TeamManager, WorldManager, TEAM_PALETTE,
};
pub use hooks::HookSet;
pub use items::{
    build_stack, BrazilStick, CursedPumpkin, CustomItem, CustomItemManager, ItemFactories,
    ItemKind, KnockbackStick, PlayerTracker, Shoes, ShuffleSword, StableVariantId, TeleportRod,
    WishItem,
};
pub use mobs::{
    BusinessVillager, CustomMob, CustomMobManager, InstanceId, InvincibleZombie, MobKind,
    SpecialDog, BOSS_BAR_RADIUS,
};
pub use session::{Minigame, Session, SessionError};
