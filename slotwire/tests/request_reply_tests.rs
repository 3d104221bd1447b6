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

use futures::future::join_all;
use parking_lot::Mutex;
use slotwire::prelude::*;
use slotwire_test::prelude::*;
use tokio::sync::oneshot;

use crate::setup::*;

mod setup;

/// Starts `calc` with `slotSum(a, b, c)` answering `a + b + c`.
async fn calculator(broker: &Arc<InMemoryBroker>) -> anyhow::Result<SignalSlotable> {
    let calc = instance("calc", broker)?;
    calc.register_slot("slotSum", |_, (a, b, c): (i32, i32, i32)| Ok((a + b + c,)))?;
    calc.start().await?;
    Ok(calc)
}

/// Tests the basic request/reply round trip.
///
/// **Scenario:**
/// 1. `calc` answers `slotSum` with the sum of its three arguments.
/// 2. `client` requests `slotSum(1, 2, 3)`.
///
/// **Verification:**
/// - The reply unpacks into `(6,)`.
/// - The correlation id is a typed id with the `reply` prefix.
#[slotwire_test(timeout_ms = 5000)]
async fn test_request_returns_reply() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let calc = calculator(&broker).await?;
    let client = instance("client", &broker)?;
    client.start().await?;

    let requestor = client.request("calc", "slotSum", (1_i32, 2_i32, 3_i32))?;
    assert!(requestor.reply_id().starts_with("reply_"));
    let (sum,): (i32,) = requestor.wait_for_reply(Duration::from_secs(1)).await?;
    assert_eq!(sum, 6);

    client.stop().await?;
    calc.stop().await?;
    Ok(())
}

/// Tests that a request refused by a full inbox is answered at once.
///
/// **Scenario:**
/// 1. `busy` has an inbox of one message and a slot blocking for 250 ms.
/// 2. `client` sends a first request, which keeps the dispatch loop busy.
/// 3. A second request fills the inbox, a third finds it full.
///
/// **Verification:**
/// - The third request fails with a remote error long before its timeout.
/// - The first two requests are still answered.
#[slotwire_test(timeout_ms = 5000)]
async fn test_full_inbox_refuses_request() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let mut config = test_config();
    config.limits.inbox_capacity = 1;
    let busy = instance_with("busy", &broker, config)?;
    busy.register_slot("slotWork", |_, (n,): (i32,)| {
        std::thread::sleep(Duration::from_millis(250));
        Ok((n,))
    })?;
    busy.start().await?;
    let client = instance("client", &broker)?;
    client.start().await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let running = client.request("busy", "slotWork", (1_i32,))?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let queued = client.request("busy", "slotWork", (2_i32,))?;
    let refused = client.request("busy", "slotWork", (3_i32,))?;

    let started = tokio::time::Instant::now();
    let refusal = refused.wait_for_reply::<(i32,)>(Duration::from_secs(2)).await;
    assert!(started.elapsed() < Duration::from_millis(200));
    match refusal {
        Err(SignalSlotError::Remote { message, instance_id, .. }) => {
            assert!(message.contains("too busy"), "unexpected message: {message}");
            assert_eq!(instance_id, "busy");
        }
        other => anyhow::bail!("expected a remote error, got {other:?}"),
    }

    let (first,): (i32,) = running.wait_for_reply(Duration::from_secs(2)).await?;
    let (second,): (i32,) = queued.wait_for_reply(Duration::from_secs(2)).await?;
    assert_eq!((first, second), (1, 2));

    client.stop().await?;
    busy.stop().await?;
    Ok(())
}

/// Tests that an unanswered request times out.
///
/// **Scenario:**
/// 1. `slow` defers its reply and never completes it.
/// 2. `client` waits 100 ms for the reply.
///
/// **Verification:**
/// - The wait fails with `Timeout` naming target and slot.
/// - It took at least the timeout and not much longer.
#[slotwire_test(timeout_ms = 5000)]
async fn test_request_times_out() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let parked: Arc<Mutex<Vec<AsyncReply>>> = Arc::default();
    let slow = instance("slow", &broker)?;
    let keep = parked.clone();
    slow.register_slot("slotWait", move |ctx, (): ()| {
        keep.lock().push(ctx.async_reply()?);
        Ok(())
    })?;
    slow.start().await?;
    let client = instance("client", &broker)?;
    client.start().await?;

    let started = tokio::time::Instant::now();
    let result = client
        .request("slow", "slotWait", ())?
        .receive(Duration::from_millis(100))
        .await;
    let elapsed = started.elapsed();

    match result {
        Err(SignalSlotError::Timeout {
            instance_id,
            slot,
            timeout,
        }) => {
            assert_eq!(instance_id, "slow");
            assert_eq!(slot, "slotWait");
            assert_eq!(timeout, Duration::from_millis(100));
        }
        other => panic!("expected a timeout, got {other:?}"),
    }
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(1000));

    client.stop().await?;
    slow.stop().await?;
    Ok(())
}

/// Tests that a failing slot reports its error to the requester.
///
/// **Scenario:**
/// 1. `failing` registers a slot returning an error with details.
/// 2. `client` requests it.
///
/// **Verification:**
/// - The error arrives as `Remote` with message, details and origin.
#[slotwire_test(timeout_ms = 5000)]
async fn test_slot_error_becomes_remote_error() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let failing = instance("failing", &broker)?;
    failing.register_slot("slotFail", |_, (): ()| -> Result<(), SlotError> {
        Err(SlotError::new("bad").with_details("trace"))
    })?;
    failing.start().await?;
    let client = instance("client", &broker)?;
    client.start().await?;

    let error = client
        .request("failing", "slotFail", ())?
        .wait_for_reply::<()>(Duration::from_secs(1))
        .await
        .unwrap_err();
    match &error {
        SignalSlotError::Remote {
            message,
            details,
            instance_id,
        } => {
            assert_eq!(message, "bad");
            assert_eq!(details.as_deref(), Some("trace"));
            assert_eq!(instance_id, "failing");
        }
        other => panic!("expected a remote error, got {other:?}"),
    }
    assert_eq!(error.details(), Some("trace"));

    client.stop().await?;
    failing.stop().await?;
    Ok(())
}

/// Tests a request for a slot the target does not have.
///
/// **Scenario:**
/// 1. `client` requests `slotMissing` on `calc`.
///
/// **Verification:**
/// - The reply is an error naming the missing slot.
#[slotwire_test(timeout_ms = 5000)]
async fn test_missing_slot_is_reported() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let calc = calculator(&broker).await?;
    let client = instance("client", &broker)?;
    client.start().await?;

    let result = client
        .request("calc", "slotMissing", (1_i32,))?
        .receive(Duration::from_secs(1))
        .await;
    assert!(matches!(
        result,
        Err(SignalSlotError::Remote { ref message, .. }) if message.contains("slotMissing")
    ));

    client.stop().await?;
    calc.stop().await?;
    Ok(())
}

/// Tests the argument count limit and invalid request targets.
///
/// **Scenario:**
/// 1. Request with five arguments.
/// 2. Request the global target `*`.
///
/// **Verification:**
/// - Five arguments fail locally with `TooManyArguments(5)`.
/// - `*` fails with `InvalidTarget`.
#[slotwire_test(timeout_ms = 5000)]
async fn test_request_rejects_invalid_input() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let calc = calculator(&broker).await?;
    let client = instance("client", &broker)?;
    client.start().await?;

    let five = Args::new().arg(1_i32).arg(2_i32).arg(3_i32).arg(4_i32).arg(5_i32);
    assert!(matches!(
        client.request("calc", "slotSum", five),
        Err(SignalSlotError::TooManyArguments(5))
    ));
    assert!(matches!(
        client.request("*", "slotSum", (1_i32, 2_i32, 3_i32)),
        Err(SignalSlotError::InvalidTarget(_))
    ));

    client.stop().await?;
    calc.stop().await?;
    Ok(())
}

/// Tests that concurrent requests are matched by correlation id.
///
/// **Scenario:**
/// 1. `echo` answers each request after a delay that shrinks with the value,
///    so replies arrive in reverse order.
/// 2. `client` sends five requests and awaits them together.
///
/// **Verification:**
/// - Every requester receives the answer to its own request.
#[slotwire_test(timeout_ms = 5000)]
async fn test_concurrent_requests_are_correlated() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let echo = instance("echo", &broker)?;
    echo.register_slot("slotEcho", |ctx, (value,): (u32,)| {
        let reply = ctx.async_reply()?;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(u64::from(5 - value) * 20)).await;
            reply.send((value * 10,));
        });
        Ok(())
    })?;
    echo.start().await?;
    let client = instance("client", &broker)?;
    client.start().await?;

    let requests = (0..5_u32)
        .map(|value| client.request("echo", "slotEcho", (value,)))
        .collect::<Result<Vec<_>, _>>()?;
    let replies = join_all(
        requests
            .into_iter()
            .map(|requestor| requestor.wait_for_reply::<(u32,)>(Duration::from_secs(2))),
    )
    .await;

    let values = replies
        .into_iter()
        .map(|reply| reply.map(|(value,)| value))
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(values, [0, 10, 20, 30, 40]);

    client.stop().await?;
    echo.stop().await?;
    Ok(())
}

/// Tests a request whose reply is delivered to a named slot.
///
/// **Scenario:**
/// 1. `client` registers `slotResult`.
/// 2. It sends `slotSum(1, 2, 3)` to `calc`, naming itself and `slotResult`
///    as the reply destination.
///
/// **Verification:**
/// - `slotResult` runs with `6`, called by `calc`.
#[slotwire_test(timeout_ms = 5000)]
async fn test_request_no_wait_calls_reply_slot() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let calc = calculator(&broker).await?;
    let client = instance("client", &broker)?;
    let result = Arc::new(Mutex::new(None));
    let slot_result = result.clone();
    client.register_slot("slotResult", move |ctx, (sum,): (i32,)| {
        *slot_result.lock() = Some((ctx.caller_id().to_string(), sum));
        Ok(())
    })?;
    client.start().await?;

    client.request_no_wait("calc", "slotSum", "", "slotResult", (1_i32, 2_i32, 3_i32))?;
    assert!(eventually(Duration::from_secs(1), || result.lock().is_some()).await);
    assert_eq!(result.lock().clone(), Some(("calc".to_string(), 6)));

    client.stop().await?;
    calc.stop().await?;
    Ok(())
}

/// Tests replies whose value count differs from the expected one.
///
/// **Scenario:**
/// 1. `pair` answers with `(1, "x")`.
/// 2. `client` unpacks once into three values and once into one.
///
/// **Verification:**
/// - Too few values fail with `MalformedReply`.
/// - Extra values are ignored.
#[slotwire_test(timeout_ms = 5000)]
async fn test_reply_value_count() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let pair = instance("pair", &broker)?;
    pair.register_slot("slotPair", |_, (): ()| Ok((1_i32, "x")))?;
    pair.start().await?;
    let client = instance("client", &broker)?;
    client.start().await?;

    let short = client
        .request("pair", "slotPair", ())?
        .wait_for_reply::<(i32, String, bool)>(Duration::from_secs(1))
        .await;
    assert!(matches!(short, Err(SignalSlotError::MalformedReply(_))));

    let (first,): (i32,) = client
        .request("pair", "slotPair", ())?
        .wait_for_reply(Duration::from_secs(1))
        .await?;
    assert_eq!(first, 1);

    let raw = client
        .request("pair", "slotPair", ())?
        .receive(Duration::from_secs(1))
        .await?;
    assert_eq!(raw.len(), 2);
    assert_eq!(raw.get(1).and_then(Value::as_str), Some("x"));

    client.stop().await?;
    pair.stop().await?;
    Ok(())
}

/// Tests the callback flavour of waiting for a reply.
///
/// **Scenario:**
/// 1. `client` requests `slotSum(2, 3, 4)` with `receive_async`.
/// 2. It requests a slot that never answers with a 100 ms timeout.
///
/// **Verification:**
/// - The reply handler receives `9`.
/// - The error handler receives a timeout.
#[slotwire_test(timeout_ms = 5000)]
async fn test_receive_async_handlers() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let calc = calculator(&broker).await?;
    let parked: Arc<Mutex<Vec<AsyncReply>>> = Arc::default();
    let keep = parked.clone();
    calc.register_slot("slotNever", move |ctx, (): ()| {
        keep.lock().push(ctx.async_reply()?);
        Ok(())
    })?;
    let client = instance("client", &broker)?;
    client.start().await?;

    let (sum_tx, sum_rx) = oneshot::channel();
    client.request("calc", "slotSum", (2_i32, 3_i32, 4_i32))?.receive_async(
        move |(sum,): (i32,)| {
            let _ = sum_tx.send(sum);
        },
        |e| panic!("unexpected failure: {e}"),
        None,
    );
    assert_eq!(sum_rx.await?, 9);

    let (error_tx, error_rx) = oneshot::channel();
    client.request("calc", "slotNever", ())?.receive_async(
        |(): ()| panic!("no reply expected"),
        move |e| {
            let _ = error_tx.send(e);
        },
        Some(Duration::from_millis(100)),
    );
    assert!(error_rx.await?.is_timeout());

    client.stop().await?;
    calc.stop().await?;
    Ok(())
}

/// Tests that stopping an instance fails its outstanding requests.
///
/// **Scenario:**
/// 1. `client` requests a slot that never answers and waits in a task.
/// 2. `client` is stopped while the wait is in progress.
///
/// **Verification:**
/// - The wait ends with `Stopped` well before its timeout.
#[slotwire_test(timeout_ms = 5000)]
async fn test_stop_fails_pending_requests() -> anyhow::Result<()> {
    initialize_tracing();
    let broker = broker();
    let parked: Arc<Mutex<Vec<AsyncReply>>> = Arc::default();
    let slow = instance("slow", &broker)?;
    let keep = parked.clone();
    slow.register_slot("slotWait", move |ctx, (): ()| {
        keep.lock().push(ctx.async_reply()?);
        Ok(())
    })?;
    slow.start().await?;
    let client = instance("client", &broker)?;
    client.start().await?;

    let requestor = client.request("slow", "slotWait", ())?;
    let waiting = tokio::spawn(requestor.receive(Duration::from_secs(3)));
    assert!(eventually(Duration::from_secs(1), || parked.lock().len() == 1).await);

    client.stop().await?;
    let result = waiting.await?;
    assert!(matches!(result, Err(SignalSlotError::Stopped(ref id)) if id == "client"));

    slow.stop().await?;
    Ok(())
}
