//! Capability behavior against a live in-process host.

use minigame_core::{
    CopperDropIron, CustomItemManager, DeathManager, InstantSmelting, ItemFactories, ItemKind,
    KnockbackStick, PlayerResetter, Session, TeamManager, WorldManager, TEAM_PALETTE,
};
use minigame_host::{
    BlockBreakEvent, GameMode, Host, ItemStack, Material, PlayerId, Position, World, MAX_HEALTH,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

struct Fixture {
    host: Arc<Host>,
    session: Arc<Session>,
    arena: Arc<World>,
    _dir: tempfile::TempDir,
}

fn fixture(players: usize) -> (Fixture, Vec<PlayerId>) {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(Host::new(dir.path()));
    let lobby = host.create_world(Some("lobby"), false).unwrap();
    let arena = host.create_world(Some("arena"), true).unwrap();
    let session = Session::new(Arc::clone(&host), lobby);

    let ids: Vec<PlayerId> = (0..players)
        .map(|i| {
            let id = host.connect_player(&format!("player{i}"), arena.spawn_location());
            session.add_player(id);
            id
        })
        .collect();

    (
        Fixture {
            host,
            session,
            arena,
            _dir: dir,
        },
        ids,
    )
}

#[test]
fn lethal_damage_is_cancelled_and_eliminates_exactly_once() {
    let (fx, ids) = fixture(3);
    fx.session.set_running(true);

    let death = DeathManager::new(&fx.session);
    fx.session.features().install_death_manager(Arc::clone(&death));

    let fired = Arc::new(AtomicU32::new(0));
    let fired2 = Arc::clone(&fired);
    death.set_death_callback(move |_| {
        fired2.fetch_add(1, Ordering::SeqCst);
    });

    let applied = fx.host.damage_player(ids[0], None, 100.0);
    assert_eq!(applied, 0.0);
    assert_eq!(fx.host.with_player(ids[0], |p| p.health).unwrap(), MAX_HEALTH);
    assert!(death.is_dead(ids[0]));
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // Marking again is idempotent.
    death.set_player_as_dead(ids[0]);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(death.dead_players().len(), 1);
    assert_eq!(death.living_player_count(), 2);
    assert!(!death.is_dead(ids[1]));
    assert!(!death.is_dead(ids[2]));
}

#[test]
fn knockback_stick_swing_is_never_lethal() {
    let (fx, ids) = fixture(2);
    fx.session.set_running(true);

    let death = DeathManager::new(&fx.session);
    fx.session.features().install_death_manager(Arc::clone(&death));

    // Items wired after the death manager, the same order the mode uses.
    let items = CustomItemManager::new(&fx.session);
    let mut factories = ItemFactories::new();
    factories.register(ItemKind::KnockbackStick, |s| KnockbackStick::new(s));
    items.install_all(&factories);
    fx.session.features().install_item_manager(Arc::clone(&items));

    assert!(items.give_item(ids[0], ItemKind::KnockbackStick));
    fx.host.with_player_mut(ids[1], |p| p.health = 4.0);

    let applied = fx.host.damage_player(ids[1], Some(ids[0]), 6.0);
    assert_eq!(applied, 0.0);
    assert!(!death.is_dead(ids[1]));
    assert_eq!(fx.host.with_player(ids[1], |p| p.health).unwrap(), 4.0);
}

#[test]
fn cancelled_damage_never_eliminates() {
    let (fx, ids) = fixture(1);
    fx.session.set_running(true);

    let death = DeathManager::new(&fx.session);
    fx.session.features().install_death_manager(Arc::clone(&death));
    fx.host
        .events
        .subscribe::<minigame_host::PlayerDamageEvent, _>(|ev| ev.cancelled = true);

    fx.host.with_player_mut(ids[0], |p| p.health = 1.0);
    fx.host.damage_player(ids[0], None, 50.0);
    assert!(!death.is_dead(ids[0]));
}

#[test]
fn sublethal_damage_passes_through() {
    let (fx, ids) = fixture(1);
    fx.session.set_running(true);
    let death = DeathManager::new(&fx.session);
    fx.session.features().install_death_manager(Arc::clone(&death));

    let applied = fx.host.damage_player(ids[0], None, 5.0);
    assert_eq!(applied, 5.0);
    assert_eq!(fx.host.with_player(ids[0], |p| p.health).unwrap(), MAX_HEALTH - 5.0);
    assert!(!death.is_dead(ids[0]));
}

#[test]
fn damage_is_ignored_while_not_running() {
    let (fx, ids) = fixture(1);
    let death = DeathManager::new(&fx.session);
    fx.session.features().install_death_manager(Arc::clone(&death));

    fx.host.damage_player(ids[0], None, 100.0);
    assert!(!death.is_dead(ids[0]));
    assert_eq!(fx.host.with_player(ids[0], |p| p.health).unwrap(), 0.0);
}

#[test]
fn revive_fails_on_the_living_and_restores_the_dead() {
    let (fx, ids) = fixture(2);
    fx.session.set_running(true);

    let resetter = PlayerResetter::new(&fx.session);
    fx.session.features().install_player_resetter(resetter);
    let death = DeathManager::new(&fx.session);
    fx.session.features().install_death_manager(Arc::clone(&death));

    assert!(!death.revive_player(ids[0]));
    assert!(death.dead_players().is_empty());

    death.set_player_as_dead(ids[0]);
    fx.host
        .with_player_mut(ids[0], |p| p.game_mode = GameMode::Spectator);

    assert!(death.revive_player(ids[0]));
    assert!(!death.is_dead(ids[0]));
    assert_eq!(
        fx.host.with_player(ids[0], |p| p.game_mode).unwrap(),
        GameMode::Survival
    );
    assert!(!death.revive_player(ids[0]));
}

#[test]
fn five_players_split_round_robin_into_two_teams() {
    let (fx, ids) = fixture(5);
    let teams = TeamManager::new(&fx.session);
    fx.session.features().install_team_manager(Arc::clone(&teams));

    teams.assign_players_to_teams();

    let names = teams.team_names();
    assert!(names.len() >= 2 && names.len() <= TEAM_PALETTE.len());
    assert_eq!(names.len(), 2);

    let mut seen = 0;
    for name in &names {
        seen += teams.members_of(name).len();
    }
    assert_eq!(seen, 5);
    for id in &ids {
        assert!(teams.team_of(*id).is_some());
    }
    // Round-robin with 2 teams puts even indexes on the first team.
    assert_eq!(teams.team_of(ids[0]), teams.team_of(ids[2]));
    assert_eq!(teams.team_of(ids[0]), teams.team_of(ids[4]));
    assert_ne!(teams.team_of(ids[0]), teams.team_of(ids[1]));
}

#[test]
fn team_count_is_clamped_by_palette_and_floor() {
    assert_eq!(TeamManager::team_count_for(2), 2);
    assert_eq!(TeamManager::team_count_for(5), 2);
    assert_eq!(TeamManager::team_count_for(8), 4);
    assert_eq!(TeamManager::team_count_for(40), TEAM_PALETTE.len());
}

#[test]
fn removing_a_team_member_restores_their_name() {
    let (fx, ids) = fixture(4);
    let teams = TeamManager::new(&fx.session);
    teams.assign_players_to_teams();

    let colored = fx.host.with_player(ids[0], |p| p.display_name.clone()).unwrap();
    assert_ne!(colored, "player0");

    teams.remove_player(ids[0]);
    assert_eq!(teams.team_of(ids[0]), None);
    assert_eq!(
        fx.host.with_player(ids[0], |p| p.display_name.clone()).unwrap(),
        "player0"
    );
}

#[test]
fn team_living_count_follows_the_dead_set() {
    let (fx, ids) = fixture(4);
    fx.session.set_running(true);
    let teams = TeamManager::new(&fx.session);
    fx.session.features().install_team_manager(Arc::clone(&teams));
    let death = DeathManager::new(&fx.session);
    fx.session.features().install_death_manager(Arc::clone(&death));

    teams.assign_players_to_teams();
    let team = teams.team_of(ids[0]).unwrap();
    let before = teams.living_count(&team);
    death.set_player_as_dead(ids[0]);
    assert_eq!(teams.living_count(&team), before - 1);
}

#[test]
fn world_teardown_relocates_before_deleting() {
    let (fx, ids) = fixture(2);
    let worlds = WorldManager::new(&fx.session);
    fx.session.features().install_world_manager(Arc::clone(&worlds));

    let world = worlds.create_world(None).unwrap();
    let directory = world.directory.clone();
    for id in &ids {
        fx.host.teleport(*id, world.spawn_location());
    }
    assert!(directory.exists());

    worlds.delete_world().unwrap();

    let lobby_spawn = fx.session.lobby().spawn_location();
    for id in &ids {
        assert_eq!(fx.host.with_player(*id, |p| p.location).unwrap(), lobby_spawn);
    }
    assert!(!directory.exists());
    assert!(fx.session.world().is_none());
}

#[test]
fn blocked_unload_leaves_the_world_retryable() {
    let (fx, _ids) = fixture(1);
    let worlds = WorldManager::new(&fx.session);

    let world = worlds.create_world(Some("doomed")).unwrap();
    let directory = world.directory.clone();

    // A bystander outside the roster keeps the world occupied.
    let bystander = fx.host.connect_player("bystander", world.spawn_location());

    assert!(worlds.delete_world().is_err());
    assert!(directory.exists());
    assert!(fx.session.world().is_some());

    fx.host.teleport(bystander, fx.session.lobby().spawn_location());
    worlds.delete_world().unwrap();
    assert!(!directory.exists());
}

#[test]
fn smelting_is_instant_only_in_the_running_session_world() {
    let (fx, _ids) = fixture(1);
    let smelting = InstantSmelting::new(&fx.session);
    fx.session.features().install_instant_smelting(smelting);
    fx.session.set_world(Some(Arc::clone(&fx.arena)));

    assert_ne!(fx.host.start_smelt(fx.arena.id, Material::IronIngot), 0);

    fx.session.set_running(true);
    assert_eq!(fx.host.start_smelt(fx.arena.id, Material::IronIngot), 0);

    let elsewhere = fx.host.create_world(Some("elsewhere"), false).unwrap();
    assert_ne!(fx.host.start_smelt(elsewhere.id, Material::IronIngot), 0);
}

#[test]
fn copper_ore_drops_iron_for_participants() {
    let (fx, ids) = fixture(1);
    fx.session.set_running(true);
    let feature = CopperDropIron::new(&fx.session);
    fx.session.features().install_copper_drop_iron(feature);

    let mut event = BlockBreakEvent {
        player: ids[0],
        material: Material::DeepslateCopperOre,
        position: Position::new(0.0, 12.0, 0.0),
        drops: vec![ItemStack::of(Material::CopperOre)],
    };
    fx.host.events.emit(&mut event);
    assert_eq!(event.drops, vec![ItemStack::of(Material::IronIngot)]);

    // Outsiders keep normal drops.
    let outsider = fx.host.connect_player("outsider", fx.arena.spawn_location());
    let mut event = BlockBreakEvent {
        player: outsider,
        material: Material::CopperOre,
        position: Position::new(0.0, 12.0, 0.0),
        drops: vec![ItemStack::of(Material::CopperOre)],
    };
    fx.host.events.emit(&mut event);
    assert_eq!(event.drops, vec![ItemStack::of(Material::CopperOre)]);
}

#[test]
fn reinstalling_a_capability_replaces_the_previous_instance() {
    let (fx, _ids) = fixture(1);

    let first = PlayerResetter::new(&fx.session);
    fx.session.features().install_player_resetter(Arc::clone(&first));
    let second = PlayerResetter::new(&fx.session);
    fx.session.features().install_player_resetter(Arc::clone(&second));

    let installed = fx.session.features().player_resetter().unwrap();
    assert!(Arc::ptr_eq(&installed, &second));
    assert!(!Arc::ptr_eq(&installed, &first));
}
