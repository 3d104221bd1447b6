/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use slotwire::prelude::*;
use slotwire_test::prelude::*;

use crate::setup::*;

mod setup;

type Events = Arc<Mutex<Vec<(String, Hash)>>>;

fn recorder() -> (Events, impl Fn(&str, &Hash) + Send + Sync + 'static) {
    let events: Events = Arc::default();
    let sink = events.clone();
    (events, move |instance_id: &str, info: &Hash| {
        sink.lock().push((instance_id.to_string(), info.clone()))
    })
}

fn ids(events: &Events) -> Vec<String> {
    events.lock().iter().map(|(id, _)| id.clone()).collect()
}

/// A peer that beats like the watcher but neither tracks nor announces.
fn quiet_peer_config() -> SlotwireConfig {
    let mut config = tracking_config();
    config.heartbeat.track_instances = false;
    config.behavior.announce_instance = false;
    config
}

/// Tests discovery of a silent peer through its heartbeats.
///
/// **Scenario:**
/// 1. A tracking `watcher` starts.
/// 2. `peer` starts without announcing itself.
///
/// **Verification:**
/// - The new-instance handler fires once for `peer` after its first beat.
/// - The reported info carries the peer's heartbeat interval.
#[slotwire_test(timeout_ms = 5000)]
async fn test_heartbeat_discovers_instance() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let watcher = instance_with("watcher", &broker, tracking_config())?;
    assert!(watcher.is_tracking());
    let (discovered, on_new) = recorder();
    watcher.on_instance_new(on_new);
    watcher.start().await?;

    let peer = instance_with("peer", &broker, quiet_peer_config())?;
    peer.start().await?;

    assert!(eventually(Duration::from_secs(1), || ids(&discovered) == ["peer"]).await);
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(ids(&discovered), ["peer"]);
    let info = discovered.lock()[0].1.clone();
    assert_eq!(info.get_as::<u64>("heartbeatInterval")?, 100);

    peer.stop().await?;
    watcher.stop().await?;
    Ok(())
}

/// Tests the gone notification of a peer that stops cleanly.
///
/// **Scenario:**
/// 1. A tracking `watcher` sees `peer` start and stop.
///
/// **Verification:**
/// - New and gone handlers fire once each for `peer`.
/// - `peer` leaves the list of available instances.
#[slotwire_test(timeout_ms = 5000)]
async fn test_stop_announces_departure() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let watcher = instance_with("watcher", &broker, tracking_config())?;
    let (appeared, on_new) = recorder();
    let (departed, on_gone) = recorder();
    watcher.on_instance_new(on_new);
    watcher.on_instance_gone(on_gone);
    watcher.start().await?;

    let peer = instance("peer", &broker)?;
    peer.start().await?;
    assert!(eventually(Duration::from_secs(1), || ids(&appeared) == ["peer"]).await);
    assert!(watcher.get_available_instances().await?.has("peer"));

    peer.stop().await?;
    assert!(eventually(Duration::from_secs(1), || ids(&departed) == ["peer"]).await);
    assert!(!watcher.get_available_instances().await?.has("peer"));

    watcher.stop().await?;
    Ok(())
}

/// Tests eviction of a peer whose heartbeats stop.
///
/// **Scenario:**
/// 1. A silent peer is discovered through its heartbeats.
/// 2. It stops without announcing its departure.
///
/// **Verification:**
/// - The gone handler fires once the missed beats exceed the tolerance.
#[slotwire_test(timeout_ms = 5000)]
async fn test_missed_heartbeats_evict_instance() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let watcher = instance_with("watcher", &broker, tracking_config())?;
    let (appeared, on_new) = recorder();
    let (departed, on_gone) = recorder();
    watcher.on_instance_new(on_new);
    watcher.on_instance_gone(on_gone);
    watcher.start().await?;

    let peer = instance_with("peer", &broker, quiet_peer_config())?;
    peer.start().await?;
    assert!(eventually(Duration::from_secs(1), || ids(&appeared) == ["peer"]).await);

    peer.stop().await?;
    let stopped = tokio::time::Instant::now();
    assert!(eventually(Duration::from_secs(2), || ids(&departed) == ["peer"]).await);
    assert!(stopped.elapsed() >= Duration::from_millis(50));

    watcher.stop().await?;
    Ok(())
}

/// Tests the list of available instances for a tracking instance.
///
/// **Scenario:**
/// 1. Start `b` and `a`, then a tracking `watcher`.
///
/// **Verification:**
/// - The watcher lists itself first, then the peers ordered by id, each
///   with its instance info.
#[slotwire_test(timeout_ms = 5000)]
async fn test_available_instances_from_topology() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let b = instance("b", &broker)?;
    let a = instance("a", &broker)?;
    b.start().await?;
    a.start().await?;

    let watcher = instance_with("watcher", &broker, tracking_config())?;
    watcher.start().await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let instances = watcher.get_available_instances().await?;
    assert_eq!(instances.keys().collect::<Vec<_>>(), ["watcher", "a", "b"]);
    assert!(instances.get::<Hash>("a")?.has("host"));

    watcher.stop().await?;
    a.stop().await?;
    b.stop().await?;
    Ok(())
}

/// Tests discovery without tracking.
///
/// **Scenario:**
/// 1. Start two peers and a non-tracking `client`.
/// 2. `client` asks for the available instances.
///
/// **Verification:**
/// - The answers collected in the discovery window include every instance.
#[slotwire_test(timeout_ms = 5000)]
async fn test_available_instances_by_discovery() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let mut peers = Vec::new();
    for id in ["left", "right"] {
        let peer = instance(id, &broker)?;
        peer.start().await?;
        peers.push(peer);
    }
    let client = instance("client", &broker)?;
    client.start().await?;
    assert!(!client.is_tracking());

    let instances = client.get_available_instances().await?;
    let mut found: Vec<&str> = instances.keys().collect();
    found.sort_unstable();
    assert_eq!(found, ["client", "left", "right"]);
    assert_eq!(instances.get::<Hash>("left")?.get::<String>("type")?, "signalslotable");

    client.stop().await?;
    for peer in peers {
        peer.stop().await?;
    }
    Ok(())
}

/// Tests overlapping discovery rounds on one instance.
///
/// **Scenario:**
/// 1. Start a peer and a non-tracking `client`.
/// 2. `client` asks for the available instances twice, the second query
///    starting while the first one is still collecting answers.
///
/// **Verification:**
/// - Both queries report every instance.
/// - A later query still works once both rounds are closed.
#[slotwire_test(timeout_ms = 5000)]
async fn test_overlapping_discovery_rounds() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let peer = instance("left", &broker)?;
    peer.start().await?;
    let client = instance("client", &broker)?;
    client.start().await?;

    let sorted = |instances: Hash| {
        let mut found: Vec<String> = instances.keys().map(str::to_string).collect();
        found.sort_unstable();
        found
    };
    let (first, second) = tokio::join!(client.get_available_instances(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        client.get_available_instances().await
    });
    assert_eq!(sorted(first?), ["client", "left"]);
    assert_eq!(sorted(second?), ["client", "left"]);
    assert_eq!(sorted(client.get_available_instances().await?), ["client", "left"]);

    client.stop().await?;
    peer.stop().await?;
    Ok(())
}

/// Tests introspection of a remote instance.
///
/// **Scenario:**
/// 1. `device` registers a slot and a signal.
/// 2. `client` asks for its slots and signals.
///
/// **Verification:**
/// - The user-defined entries and the built-in ones are listed, sorted.
#[slotwire_test(timeout_ms = 5000)]
async fn test_remote_introspection() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let device = instance("device", &broker)?;
    device.register_slot("slotMove", |_, (_target,): (f64,)| Ok(()))?;
    device.register_signal("signalMoved", 1)?;
    device.start().await?;
    let client = instance("client", &broker)?;
    client.start().await?;

    let slots = client.get_available_slots("device").await?;
    assert!(slots.contains(&"slotMove".to_string()));
    assert!(slots.contains(&"slotPing".to_string()));
    assert!(slots.windows(2).all(|pair| pair[0] <= pair[1]));

    let signals = client.get_available_signals("device").await?;
    assert!(signals.contains(&"signalMoved".to_string()));
    assert!(signals.contains(&"signalHeartbeat".to_string()));

    let missing = client.get_available_slots("nobody").await;
    assert!(matches!(missing, Err(ref e) if e.is_timeout()));

    client.stop().await?;
    device.stop().await?;
    Ok(())
}

/// Tests that instance info updates reach the other instances.
///
/// **Scenario:**
/// 1. A tracking `watcher` knows `peer`.
/// 2. `peer` merges `{"state": "ON"}` into its info.
///
/// **Verification:**
/// - The updated handler sees the new entry.
/// - The watcher's topology reflects the update.
#[slotwire_test(timeout_ms = 5000)]
async fn test_instance_info_update() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let watcher = instance_with("watcher", &broker, tracking_config())?;
    let (updated, on_updated) = recorder();
    watcher.on_instance_updated(on_updated);
    watcher.start().await?;
    let peer = instance("peer", &broker)?;
    peer.start().await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    peer.update_instance_info(&hash! { "state" => "ON" })?;
    assert_eq!(peer.instance_info().get::<String>("state")?, "ON");
    assert!(eventually(Duration::from_secs(1), || ids(&updated) == ["peer"]).await);
    assert_eq!(updated.lock()[0].1.get::<String>("state")?, "ON");

    let instances = watcher.get_available_instances().await?;
    assert_eq!(instances.get::<String>("peer.state")?, "ON");

    peer.stop().await?;
    watcher.stop().await?;
    Ok(())
}

/// Tests that tracking can only be enabled before start and that handlers
/// see announcements even without tracking.
///
/// **Scenario:**
/// 1. Enable tracking on a created instance, then try again after start.
/// 2. A non-tracking observer registers a new-instance handler.
///
/// **Verification:**
/// - Enabling after start fails with `InvalidState`.
/// - The observer's handler fires for an announced peer.
#[slotwire_test(timeout_ms = 5000)]
async fn test_tracking_switch_and_plain_handlers() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let tracker = instance("tracker", &broker)?;
    assert!(!tracker.is_tracking());
    tracker.track_all_instances()?;
    assert!(tracker.is_tracking());
    tracker.start().await?;
    assert!(matches!(
        tracker.track_all_instances(),
        Err(SignalSlotError::InvalidState { .. })
    ));

    let observer = instance("observer", &broker)?;
    let (announced, on_new) = recorder();
    observer.on_instance_new(on_new);
    observer.start().await?;
    let peer = instance("peer", &broker)?;
    peer.start().await?;
    assert!(eventually(Duration::from_secs(1), || ids(&announced) == ["peer"]).await);

    peer.stop().await?;
    observer.stop().await?;
    tracker.stop().await?;
    Ok(())
}
