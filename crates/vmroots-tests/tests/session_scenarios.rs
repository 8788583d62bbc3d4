//! End-to-end session tests
//!
//! An agent scanning a real temporary root registry talks to a listener
//! mirroring into a real temporary directory, connected by an in-memory
//! duplex stream.

use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio::io::{BufReader, DuplexStream};

use vmroots_core::{entry_name, GuestId, NullReporter, RootPair};
use vmroots_daemon::{
    Agent, AgentConfig, Listener, ListenerConfig, ListenerState, Message, MessageWriter,
    NoopNotifier,
};

const GUEST: [u8; 16] = [0x42; 16];

/// Guest and host filesystems for one session
struct World {
    _dir: TempDir,
    store: PathBuf,
    gcroots: PathBuf,
    mirror_root: PathBuf,
}

impl World {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("nix/store");
        let gcroots = dir.path().join("gcroots");
        let mirror_root = dir.path().join("per-vm");
        for pkg in ["xxx-a", "yyy-a", "xxx-b"] {
            fs::create_dir_all(store.join(pkg)).unwrap();
        }
        fs::create_dir_all(&gcroots).unwrap();
        Self {
            _dir: dir,
            store,
            gcroots,
            mirror_root,
        }
    }

    fn guest_dir(&self) -> PathBuf {
        self.mirror_root.join(GuestId::from_bytes(GUEST).to_hex())
    }

    fn root(&self, name: &str) -> PathBuf {
        self.gcroots.join(name)
    }

    fn link_root(&self, name: &str, pkg: &str) {
        let root = self.root(name);
        let _ = fs::remove_file(&root);
        symlink(self.store.join(pkg), root).unwrap();
    }

    fn mirror_entry(&self, name: &str) -> PathBuf {
        self.guest_dir().join(entry_name(&self.root(name)))
    }

    fn mirror_entries(&self) -> usize {
        fs::read_dir(self.guest_dir()).unwrap().count()
    }

    fn agent(&self) -> Agent {
        let config = AgentConfig {
            guest_id: Some(GuestId::from_bytes(GUEST)),
            store_dir: self.store.clone(),
            gcroots_dir: self.gcroots.clone(),
            interval_secs: 1,
            ..Default::default()
        };
        Agent::new(config, Arc::new(NullReporter)).unwrap()
    }

    fn listener(&self, stream: DuplexStream) -> Listener<BufReader<DuplexStream>> {
        let config = ListenerConfig {
            store_dir: self.store.clone(),
            mirror_root: self.mirror_root.clone(),
            notify: false,
        };
        Listener::new(
            config,
            BufReader::new(stream),
            Arc::new(NoopNotifier),
            Arc::new(NullReporter),
        )
    }

    /// Agent registered with a listener that has applied the registration
    async fn connected(&self) -> (Agent, Listener<BufReader<DuplexStream>>) {
        let (client, server) = tokio::io::duplex(1 << 20);
        let mut agent = self.agent();
        agent.attach(client);
        let mut listener = self.listener(server);

        agent.register().await.unwrap();
        listener.await_registration().await.unwrap();
        (agent, listener)
    }
}

fn link_target(path: &Path) -> PathBuf {
    fs::read_link(path).unwrap()
}

#[tokio::test]
async fn scenario_a_registration_creates_mirror_entry() {
    let world = World::new();
    world.link_root("a", "xxx-a");

    let (_agent, listener) = world.connected().await;

    assert_eq!(listener.state(), ListenerState::Active);
    assert_eq!(listener.mirror_dir(), Some(world.guest_dir().as_path()));
    assert_eq!(
        link_target(&world.mirror_entry("a")),
        world.store.join("xxx-a")
    );
    assert_eq!(world.mirror_entries(), 1);
}

#[tokio::test]
async fn scenario_b_changed_target_replaces_entry() {
    let world = World::new();
    world.link_root("a", "xxx-a");
    let (mut agent, mut listener) = world.connected().await;

    world.link_root("a", "yyy-a");
    let changes = agent.poll_once().await.unwrap().unwrap();
    assert_eq!(
        changes.added,
        vec![RootPair::new(world.root("a"), world.store.join("yyy-a"))]
    );
    assert_eq!(
        changes.removed,
        vec![RootPair::new(world.root("a"), world.store.join("xxx-a"))]
    );

    assert!(listener.process_next().await.unwrap());
    assert_eq!(
        link_target(&world.mirror_entry("a")),
        world.store.join("yyy-a")
    );
    assert_eq!(world.mirror_entries(), 1);
}

#[tokio::test]
async fn scenario_c_removed_root_deletes_entry() {
    let world = World::new();
    world.link_root("a", "xxx-a");
    world.link_root("b", "xxx-b");
    let (mut agent, mut listener) = world.connected().await;
    assert_eq!(world.mirror_entries(), 2);

    fs::remove_file(world.root("a")).unwrap();
    let changes = agent.poll_once().await.unwrap().unwrap();
    assert!(changes.added.is_empty());
    assert_eq!(
        changes.removed,
        vec![RootPair::new(world.root("a"), world.store.join("xxx-a"))]
    );

    assert!(listener.process_next().await.unwrap());
    assert!(fs::symlink_metadata(world.mirror_entry("a")).is_err());
    assert!(fs::symlink_metadata(world.mirror_entry("b")).is_ok());
}

#[tokio::test]
async fn scenario_d_targets_outside_store_are_ignored() {
    let world = World::new();
    let (client, server) = tokio::io::duplex(1 << 20);
    let mut writer = MessageWriter::new(client);
    let mut listener = world.listener(server);

    writer
        .send(&Message::Registration {
            id: GuestId::from_bytes(GUEST),
            roots: vec![RootPair::new(world.root("evil"), "/etc/passwd")],
        })
        .await
        .unwrap();
    writer
        .send(&Message::Update {
            added: vec![
                RootPair::new(world.root("evil2"), "/etc/shadow"),
                RootPair::new(world.root("b"), world.store.join("xxx-b")),
            ],
            removed: vec![],
        })
        .await
        .unwrap();

    listener.await_registration().await.unwrap();
    assert_eq!(world.mirror_entries(), 0);

    assert!(listener.process_next().await.unwrap());
    assert_eq!(world.mirror_entries(), 1);
    assert_eq!(
        link_target(&world.mirror_entry("b")),
        world.store.join("xxx-b")
    );
}

#[tokio::test]
async fn scenario_e_clean_close_keeps_entries() {
    let world = World::new();
    world.link_root("a", "xxx-a");
    let (agent, mut listener) = world.connected().await;

    drop(agent);
    listener.serve_updates().await.unwrap();

    assert_eq!(listener.state(), ListenerState::Closed);
    assert_eq!(
        link_target(&world.mirror_entry("a")),
        world.store.join("xxx-a")
    );
}

#[tokio::test]
async fn unchanged_rescan_sends_nothing() {
    let world = World::new();
    world.link_root("a", "xxx-a");
    let (mut agent, mut listener) = world.connected().await;

    assert!(agent.poll_once().await.unwrap().is_none());
    drop(agent);

    assert!(!listener.process_next().await.unwrap());
    assert_eq!(listener.updates_applied(), 0);
}

#[tokio::test]
async fn dangling_root_heals_on_next_scan() {
    let world = World::new();
    world.link_root("a", "xxx-a");
    symlink(world.root("missing"), world.root("stale")).unwrap();
    let (mut agent, mut listener) = world.connected().await;
    assert_eq!(world.mirror_entries(), 1);

    // The dangling root starts resolving once its target appears
    world.link_root("missing", "xxx-b");
    let changes = agent.poll_once().await.unwrap().unwrap();
    assert_eq!(changes.added.len(), 2);

    assert!(listener.process_next().await.unwrap());
    assert_eq!(
        link_target(&world.mirror_entry("stale")),
        world.store.join("xxx-b")
    );
    assert_eq!(world.mirror_entries(), 3);
}

#[tokio::test]
async fn reregistration_resets_guest_directory() {
    let world = World::new();
    world.link_root("a", "xxx-a");
    world.link_root("b", "xxx-b");
    let (agent, mut listener) = world.connected().await;
    drop(agent);
    listener.serve_updates().await.unwrap();
    assert_eq!(world.mirror_entries(), 2);

    // The guest reboots with fewer roots and registers again
    fs::remove_file(world.root("b")).unwrap();
    let (_agent, _listener) = world.connected().await;

    assert_eq!(world.mirror_entries(), 1);
    assert!(fs::symlink_metadata(world.mirror_entry("a")).is_ok());
}
