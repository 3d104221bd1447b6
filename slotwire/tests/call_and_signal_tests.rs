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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use slotwire::prelude::*;
use slotwire::wire::Topic;
use slotwire_test::prelude::*;

use crate::setup::*;

mod setup;

/// Tests that a one-way call runs the slot exactly once.
///
/// **Scenario:**
/// 1. Start a sender and a receiver on one broker.
/// 2. The receiver registers a zero-argument slot counting its invocations.
/// 3. The sender calls the slot once.
///
/// **Verification:**
/// - The slot ran exactly once, even after waiting for stray deliveries.
#[slotwire_test(timeout_ms = 5000)]
async fn test_call_runs_slot_once() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let receiver = instance("receiver", &broker)?;
    let sender = instance("sender", &broker)?;

    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    receiver.register_slot("slotTick", move |_, (): ()| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })?;

    receiver.start().await?;
    sender.start().await?;

    sender.call("receiver", "slotTick", ())?;
    assert!(eventually(Duration::from_secs(1), || count.load(Ordering::SeqCst) == 1).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);

    sender.stop().await?;
    receiver.stop().await?;
    Ok(())
}

/// Tests that a call to `*` reaches every instance owning the slot.
///
/// **Scenario:**
/// 1. Start three instances; two of them register `slotReset`.
/// 2. The third calls `slotReset` on `*`.
///
/// **Verification:**
/// - Both owners ran the slot once; the instance without it is unaffected.
#[slotwire_test(timeout_ms = 5000)]
async fn test_global_call_reaches_all_owners() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let callers = Arc::new(Mutex::new(Vec::new()));

    let mut owners = Vec::new();
    for id in ["motor1", "motor2"] {
        let owner = instance(id, &broker)?;
        let seen = callers.clone();
        owner.register_slot("slotReset", move |ctx, (): ()| {
            seen.lock().push(ctx.instance().instance_id().to_string());
            Ok(())
        })?;
        owner.start().await?;
        owners.push(owner);
    }
    let controller = instance("controller", &broker)?;
    controller.start().await?;

    controller.call("*", "slotReset", ())?;
    assert!(eventually(Duration::from_secs(1), || callers.lock().len() == 2).await);

    let mut seen = callers.lock().clone();
    seen.sort();
    assert_eq!(seen, ["motor1", "motor2"]);

    controller.stop().await?;
    for owner in owners {
        owner.stop().await?;
    }
    Ok(())
}

/// Tests signal delivery to a slot on another instance.
///
/// **Scenario:**
/// 1. `sensor` registers `signalValue` with one argument.
/// 2. `logger` registers `slotRecord` and connects it to the signal.
/// 3. `sensor` emits three values.
///
/// **Verification:**
/// - The slot receives every value, in emission order.
/// - The caller id seen by the slot is the emitting instance.
#[slotwire_test(timeout_ms = 5000)]
async fn test_emit_reaches_connected_remote_slot() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let sensor = instance("sensor", &broker)?;
    let logger = instance("logger", &broker)?;

    sensor.register_signal("signalValue", 1)?;
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    logger.register_slot("slotRecord", move |ctx, (value,): (f64,)| {
        sink.lock().push((ctx.caller_id().to_string(), value));
        Ok(())
    })?;

    sensor.start().await?;
    logger.start().await?;
    logger.connect("sensor", "signalValue", "", "slotRecord").await?;

    for value in [1.5, 2.5, 3.5] {
        sensor.emit("signalValue", (value,))?;
    }
    assert!(eventually(Duration::from_secs(1), || received.lock().len() == 3).await);
    let received = received.lock().clone();
    assert_eq!(
        received,
        [
            ("sensor".to_string(), 1.5),
            ("sensor".to_string(), 2.5),
            ("sensor".to_string(), 3.5)
        ]
    );

    logger.stop().await?;
    sensor.stop().await?;
    Ok(())
}

/// Tests connecting a remote slot from the signal's side.
///
/// **Scenario:**
/// 1. `source` asks `sink` to connect `slotValue` to `source.signalCount`.
/// 2. `source` emits once.
/// 3. A second connect names a slot `sink` does not have.
///
/// **Verification:**
/// - The remote slot receives the emission.
/// - Connecting a missing slot fails with `SlotNotFound`.
#[slotwire_test(timeout_ms = 5000)]
async fn test_connect_asks_remote_slot_owner() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let source = instance("source", &broker)?;
    let sink = instance("sink", &broker)?;

    source.register_signal("signalCount", 1)?;
    let received = Arc::new(Mutex::new(Vec::new()));
    let values = received.clone();
    sink.register_slot("slotValue", move |_, (count,): (u32,)| {
        values.lock().push(count);
        Ok(())
    })?;

    source.start().await?;
    sink.start().await?;

    source.connect("", "signalCount", "sink", "slotValue").await?;
    source.emit("signalCount", (7_u32,))?;
    assert!(eventually(Duration::from_secs(1), || received.lock().as_slice() == [7]).await);

    let missing = source.connect("", "signalCount", "sink", "slotMissing").await;
    assert!(matches!(missing, Err(SignalSlotError::SlotNotFound { ref slot, .. }) if slot == "slotMissing"));

    sink.stop().await?;
    source.stop().await?;
    Ok(())
}

/// Tests that a signal connected to a slot on the same instance is delivered.
///
/// **Scenario:**
/// 1. One instance owns both `signalDone` and `slotDone`.
/// 2. It connects them with empty instance ids and emits.
///
/// **Verification:**
/// - The slot receives the emitted string.
#[slotwire_test(timeout_ms = 5000)]
async fn test_self_connection() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let device = instance("device", &broker)?;
    device.register_signal("signalDone", 1)?;
    let received = Arc::new(Mutex::new(None));
    let slot_value = received.clone();
    device.register_slot("slotDone", move |_, (what,): (String,)| {
        *slot_value.lock() = Some(what);
        Ok(())
    })?;
    device.start().await?;

    device.connect("", "signalDone", "", "slotDone").await?;
    device.emit("signalDone", ("move",))?;
    assert!(eventually(Duration::from_secs(1), || received.lock().is_some()).await);
    assert_eq!(received.lock().as_deref(), Some("move"));

    device.stop().await?;
    Ok(())
}

/// Tests that disconnecting stops delivery while other connections remain.
///
/// **Scenario:**
/// 1. Two slots of one receiver are connected to the same signal.
/// 2. One connection is removed, then the signal is emitted.
/// 3. The same connection is removed a second time.
///
/// **Verification:**
/// - Only the still connected slot runs.
/// - The first disconnect reports `true`, the second `false`.
/// - The signal topic keeps its subscriber until the last connection goes.
#[slotwire_test(timeout_ms = 5000)]
async fn test_disconnect_stops_delivery() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let emitter = instance("emitter", &broker)?;
    let receiver = instance("receiver", &broker)?;
    emitter.register_signal("signalPulse", 0)?;

    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let (a, b) = (first.clone(), second.clone());
    receiver.register_slot("slotFirst", move |_, (): ()| {
        a.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })?;
    receiver.register_slot("slotSecond", move |_, (): ()| {
        b.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })?;

    emitter.start().await?;
    receiver.start().await?;
    receiver.connect("emitter", "signalPulse", "", "slotFirst").await?;
    receiver.connect("emitter", "signalPulse", "", "slotSecond").await?;

    let topic = Topic::signal("emitter", "signalPulse");
    assert_eq!(broker.subscriber_count(&topic), 1);

    assert!(receiver.disconnect("emitter", "signalPulse", "", "slotFirst").await?);
    assert!(!receiver.disconnect("emitter", "signalPulse", "", "slotFirst").await?);
    assert_eq!(broker.subscriber_count(&topic), 1);

    emitter.emit("signalPulse", ())?;
    assert!(eventually(Duration::from_secs(1), || second.load(Ordering::SeqCst) == 1).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(first.load(Ordering::SeqCst), 0);

    assert!(receiver.disconnect("emitter", "signalPulse", "", "slotSecond").await?);
    assert_eq!(broker.subscriber_count(&topic), 0);

    receiver.stop().await?;
    emitter.stop().await?;
    Ok(())
}

/// Tests the checks `emit` performs before publishing.
///
/// **Scenario:**
/// 1. Emit a signal that was never registered.
/// 2. Emit a registered two-argument signal with one argument.
///
/// **Verification:**
/// - The first fails with `SignalNotFound`.
/// - The second fails with `ArityMismatch`.
#[slotwire_test(timeout_ms = 5000)]
async fn test_emit_validates_signal() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let emitter = instance("emitter", &broker)?;
    emitter.register_signal("signalPair", 2)?;
    emitter.start().await?;

    assert!(matches!(
        emitter.emit("signalUnknown", (1_i32,)),
        Err(SignalSlotError::SignalNotFound(ref name)) if name == "signalUnknown"
    ));
    assert!(matches!(
        emitter.emit("signalPair", (1_i32,)),
        Err(SignalSlotError::ArityMismatch { given: 1, .. })
    ));
    assert!(matches!(
        emitter.register_signal("signalPair", 2),
        Err(SignalSlotError::SignalAlreadyRegistered(_))
    ));

    emitter.stop().await?;
    Ok(())
}
