//! Session directory lifecycle: hosting, joining, starting, stopping.

use chat_client::{ChatCompletion, ChatError};
use group_hardcore::GroupHardcore;
use minigame_core::{ItemFactories, Minigame};
use minigame_host::{Host, PlayerId, World, WorldRegistry};
use minigame_server::{DirectoryError, SessionDirectory};
use std::sync::Arc;

struct NoChat;

#[async_trait::async_trait]
impl ChatCompletion for NoChat {
    async fn request(&self, _prompt: &str) -> Result<String, ChatError> {
        Err(ChatError::EmptyResponse)
    }
}

struct Fixture {
    host: Arc<Host>,
    lobby: Arc<World>,
    directory: SessionDirectory,
    _dir: tempfile::TempDir,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(Host::new(dir.path()));
    let lobby = host.create_world(Some("lobby"), false).unwrap();

    let directory = SessionDirectory::new();
    {
        let host = Arc::clone(&host);
        let lobby = Arc::clone(&lobby);
        directory.register_mode(
            "group_hardcore",
            Box::new(move || {
                GroupHardcore::with_event_window(
                    Arc::clone(&host),
                    Arc::clone(&lobby),
                    ItemFactories::standard(Arc::new(NoChat)),
                    3600..6000,
                ) as Arc<dyn Minigame>
            }),
        );
    }

    Fixture {
        host,
        lobby,
        directory,
        _dir: dir,
    }
}

fn connect(fx: &Fixture, name: &str) -> PlayerId {
    fx.host.connect_player(name, fx.lobby.spawn_location())
}

#[test]
fn hosting_and_starting_moves_the_code_through_the_directory() {
    let fx = fixture();
    let alice = connect(&fx, "alice");
    let bob = connect(&fx, "bob");

    let code = fx.directory.host_session("group_hardcore", alice).unwrap();
    assert_eq!(code.len(), 8);
    fx.directory.join(&code, bob).unwrap();

    let listed = fx.directory.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].code, code);
    assert_eq!(listed[0].kind, "group_hardcore");
    assert!(!listed[0].running);
    assert_eq!(listed[0].player_count, 2);

    fx.directory.start(&code).unwrap();
    let listed = fx.directory.list();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].running);

    // A started session can't be started again.
    assert!(matches!(
        fx.directory.start(&code),
        Err(DirectoryError::UnknownCode(_))
    ));

    fx.directory.stop(&code).unwrap();
    assert!(fx.directory.list().is_empty());
    assert!(matches!(
        fx.directory.join(&code, bob),
        Err(DirectoryError::UnknownCode(_))
    ));
}

#[test]
fn unknown_modes_and_codes_are_rejected() {
    let fx = fixture();
    let alice = connect(&fx, "alice");

    assert!(matches!(
        fx.directory.host_session("capture_the_flag", alice),
        Err(DirectoryError::UnknownMode(_))
    ));
    assert!(matches!(
        fx.directory.join("DEADBEEF", alice),
        Err(DirectoryError::UnknownCode(_))
    ));
    assert!(matches!(
        fx.directory.stop("DEADBEEF"),
        Err(DirectoryError::UnknownCode(_))
    ));
}

#[test]
fn a_failed_start_leaves_the_session_pending() {
    let dir = tempfile::tempdir().unwrap();
    // World creation fails: the worlds root is a plain file.
    let blocked = dir.path().join("blocked");
    std::fs::write(&blocked, b"").unwrap();
    let host = Arc::new(Host::new(&blocked));

    let side = WorldRegistry::new(dir.path());
    let lobby = side.create(Some("lobby"), false).unwrap();

    let directory = SessionDirectory::new();
    {
        let host = Arc::clone(&host);
        let lobby = Arc::clone(&lobby);
        directory.register_mode(
            "group_hardcore",
            Box::new(move || {
                GroupHardcore::with_event_window(
                    Arc::clone(&host),
                    Arc::clone(&lobby),
                    ItemFactories::standard(Arc::new(NoChat)),
                    3600..6000,
                ) as Arc<dyn Minigame>
            }),
        );
    }

    let alice = host.connect_player("alice", lobby.spawn_location());
    let code = directory.host_session("group_hardcore", alice).unwrap();

    assert!(matches!(
        directory.start(&code),
        Err(DirectoryError::Session(_))
    ));

    // The code survives the failure so the host can retry or discard it.
    let listed = directory.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].code, code);
    assert!(!listed[0].running);
    directory.stop(&code).unwrap();
}

#[test]
fn stopping_an_active_session_relocates_participants() {
    let fx = fixture();
    let alice = connect(&fx, "alice");
    let bob = connect(&fx, "bob");

    let code = fx.directory.host_session("group_hardcore", alice).unwrap();
    fx.directory.join(&code, bob).unwrap();
    fx.directory.start(&code).unwrap();

    // Participants are in the session world once started.
    let session_world = fx
        .host
        .with_player(alice, |p| p.location.world)
        .unwrap();
    assert_ne!(session_world, fx.lobby.id);

    fx.directory.stop(&code).unwrap();
    for _ in 0..(group_hardcore::GRACE_TICKS * 2) {
        fx.host.tick();
    }
    for player in [alice, bob] {
        assert_eq!(
            fx.host.with_player(player, |p| p.location).unwrap(),
            fx.lobby.spawn_location()
        );
    }
}
