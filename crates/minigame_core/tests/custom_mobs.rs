//! Custom mob lifecycle against a live host.

use minigame_core::{
    BusinessVillager, CustomMob, CustomMobManager, DeathManager, InvincibleZombie, ItemFactories,
    CustomItemManager, Session, SpecialDog, BOSS_BAR_RADIUS,
};
use minigame_host::{Host, ItemStack, Location, Material, World};
use std::sync::Arc;

struct Fixture {
    host: Arc<Host>,
    session: Arc<Session>,
    arena: Arc<World>,
    _dir: tempfile::TempDir,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(Host::new(dir.path()));
    let lobby = host.create_world(Some("lobby"), false).unwrap();
    let arena = host.create_world(Some("arena"), true).unwrap();
    let session = Session::new(Arc::clone(&host), lobby);
    session.set_running(true);
    Fixture {
        host,
        session,
        arena,
        _dir: dir,
    }
}

#[test]
fn zombie_boss_bar_tracks_proximity() {
    let fx = fixture();
    let near = fx.host.connect_player("near", fx.arena.spawn_location());
    let far_spawn = Location::new(
        fx.arena.id,
        fx.arena.spawn_location().position.offset(BOSS_BAR_RADIUS * 2.0, 0.0, 0.0),
    );
    let far = fx.host.connect_player("far", far_spawn);
    fx.session.add_player(near);
    fx.session.add_player(far);

    let mobs = CustomMobManager::new(&fx.session);
    let zombie = InvincibleZombie::new();
    let entity = mobs
        .spawn(Arc::clone(&zombie) as _, fx.arena.spawn_location())
        .unwrap();

    // The zombie shrugs off everything.
    assert_eq!(fx.host.damage_entity(entity, None, 50.0), 0.0);

    fx.host.tick();
    let bar = zombie.boss_bar().unwrap();
    let viewers = fx.host.with_boss_bar(bar, |b| b.viewers.clone()).unwrap();
    assert!(viewers.contains(&near));
    assert!(!viewers.contains(&far));

    // Walking into range adds the bar; walking out removes it.
    fx.host.teleport(far, fx.arena.spawn_location());
    fx.host.tick();
    let viewers = fx.host.with_boss_bar(bar, |b| b.viewers.clone()).unwrap();
    assert!(viewers.contains(&far));

    // Matching coordinates in another world are not "nearby".
    let elsewhere = fx
        .host
        .connect_player("elsewhere", fx.session.lobby().spawn_location());
    fx.session.add_player(elsewhere);
    fx.host.tick();
    let viewers = fx.host.with_boss_bar(bar, |b| b.viewers.clone()).unwrap();
    assert!(!viewers.contains(&elsewhere));
}

#[test]
fn dog_death_takes_the_owner_with_it() {
    let fx = fixture();
    let owner = fx.host.connect_player("owner", fx.arena.spawn_location());
    fx.session.add_player(owner);

    let death = DeathManager::new(&fx.session);
    fx.session.features().install_death_manager(Arc::clone(&death));

    let mobs = CustomMobManager::new(&fx.session);
    let dog = SpecialDog::for_owner(owner);
    let entity = mobs
        .spawn(Arc::clone(&dog) as _, fx.arena.spawn_location())
        .unwrap();

    // Kill the dog; the 100-damage penalty is lethal, so the death manager
    // converts it into an elimination instead of a health drop.
    fx.host.damage_entity(entity, None, 1000.0);
    assert!(death.is_dead(owner));
    assert_eq!(mobs.spawned_count(), 0);
}

#[test]
fn unnamed_dog_defaults_after_the_deadline() {
    let fx = fixture();
    let owner = fx.host.connect_player("owner", fx.arena.spawn_location());
    fx.session.add_player(owner);

    let mobs = CustomMobManager::new(&fx.session);
    let dog = SpecialDog::new();
    let entity = mobs
        .spawn(Arc::clone(&dog) as _, fx.arena.spawn_location())
        .unwrap();
    assert_eq!(dog.owner(), Some(owner));

    for _ in 0..minigame_core::mobs::NAMING_DEADLINE_TICKS {
        fx.host.tick();
    }
    assert_eq!(
        fx.host.with_entity(entity, |e| e.custom_name.clone()).unwrap(),
        Some("Dog".to_string())
    );

    // Chat after the deadline is ordinary chat again.
    let chat = fx.host.player_chat(owner, "Rex");
    assert!(!chat.cancelled);
}

#[test]
fn naming_chat_is_consumed_and_renames_the_dog() {
    let fx = fixture();
    let owner = fx.host.connect_player("owner", fx.arena.spawn_location());
    fx.session.add_player(owner);

    let mobs = CustomMobManager::new(&fx.session);
    let dog = SpecialDog::new();
    let entity = mobs
        .spawn(Arc::clone(&dog) as _, fx.arena.spawn_location())
        .unwrap();

    let chat = fx.host.player_chat(owner, "Rex");
    assert!(chat.cancelled);
    assert_eq!(
        fx.host.with_entity(entity, |e| e.custom_name.clone()).unwrap(),
        Some("Rex".to_string())
    );
}

#[test]
fn merchant_suppresses_interaction_and_greets() {
    let fx = fixture();
    let player = fx.host.connect_player("customer", fx.arena.spawn_location());
    fx.session.add_player(player);

    let mobs = CustomMobManager::new(&fx.session);
    let merchant = mobs
        .spawn(BusinessVillager::new() as _, fx.arena.spawn_location())
        .unwrap();

    // Targeting is vetoed outright.
    assert!(!fx.host.entity_target(merchant, player));

    let interact = fx.host.player_interact_entity(player, merchant);
    assert!(interact.cancelled);
    let messages = fx.host.with_player(player, |p| p.messages.clone()).unwrap();
    assert!(!messages.is_empty());
}

#[test]
fn merchant_trades_flowers_for_a_custom_item() {
    let fx = fixture();
    let player = fx.host.connect_player("customer", fx.arena.spawn_location());
    fx.session.add_player(player);

    let items = CustomItemManager::new(&fx.session);
    struct NoChat;
    #[async_trait::async_trait]
    impl chat_client::ChatCompletion for NoChat {
        async fn request(&self, _p: &str) -> Result<String, chat_client::ChatError> {
            Err(chat_client::ChatError::EmptyResponse)
        }
    }
    items.install_all(&ItemFactories::standard(Arc::new(NoChat)));
    fx.session.features().install_item_manager(items);

    let mobs = CustomMobManager::new(&fx.session);
    let merchant = mobs
        .spawn(BusinessVillager::new() as _, fx.arena.spawn_location())
        .unwrap();

    fx.host.with_player_mut(player, |p| {
        p.inventory
            .set_main_hand(Some(ItemStack::with_count(Material::Poppy, 7)))
    });
    fx.host.player_interact_entity(player, merchant);

    let (flowers_left, custom_items) = fx
        .host
        .with_player(player, |p| {
            let flowers = p
                .inventory
                .main_hand()
                .map(|s| s.count)
                .unwrap_or(0);
            let custom = p
                .inventory
                .items()
                .filter(|s| s.custom_item_marker().is_some())
                .count();
            (flowers, custom)
        })
        .unwrap();
    assert_eq!(flowers_left, 2);
    assert_eq!(custom_items, 1);
}
