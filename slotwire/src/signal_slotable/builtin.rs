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

//! Slots every instance registers on construction.

use slotwire_core::Hash;
use tracing::trace;

use crate::common::typed_invoker;
use crate::message::{Args, IntoArgs, Signal, SignalSlotError, SlotContext, SlotError, Topic};
use crate::signal_slotable::heartbeat::HEARTBEAT_SIGNAL;
use crate::signal_slotable::inner::InstanceEvent;
use crate::signal_slotable::Inner;

pub(crate) const SLOT_PING: &str = "slotPing";
pub(crate) const SLOT_PING_ANSWER: &str = "slotPingAnswer";
pub(crate) const SLOT_INSTANCE_NEW: &str = "slotInstanceNew";
pub(crate) const SLOT_INSTANCE_UPDATED: &str = "slotInstanceUpdated";
pub(crate) const SLOT_INSTANCE_GONE: &str = "slotInstanceGone";
pub(crate) const SLOT_CONNECT_TO_SIGNAL: &str = "slotConnectToSignal";
pub(crate) const SLOT_DISCONNECT_FROM_SIGNAL: &str = "slotDisconnectFromSignal";
pub(crate) const SLOT_HAS_SLOT: &str = "slotHasSlot";
pub(crate) const SLOT_GET_AVAILABLE_FUNCTIONS: &str = "slotGetAvailableFunctions";

/// `slotPing(pinger, token, track)`.
///
/// A request is answered with `(instance_id, instance_info)` unless it is
/// this instance's own uniqueness ping. A plain call answers through
/// `slotPingAnswer` on the pinger.
fn ping(ctx: &SlotContext, pinger: &str, token: u32) -> Result<Args, SlotError> {
    let inner = ctx.inner();
    if token == inner.ping_token {
        trace!(instance_id = %inner.instance_id, "Ignoring own ping");
        ctx.discard_reply();
        return Ok(Args::new());
    }
    let answer = (inner.instance_id.clone(), inner.instance_info()).into_args();
    if ctx.is_request() {
        return Ok(answer);
    }
    inner.send_call(pinger, SLOT_PING_ANSWER, answer)?;
    Ok(Args::new())
}

fn ping_answer(ctx: &SlotContext, peer: &str, info: &Hash) {
    let inner = ctx.inner();
    inner.collect_answer(peer, info);
    if inner.is_tracking() && peer != inner.instance_id && inner.track_if_unknown(peer, info) {
        inner.fire(InstanceEvent::New, peer, info);
    }
}

fn available_functions(inner: &Inner, kind: &str) -> Result<(Vec<String>,), SlotError> {
    match kind {
        "signals" => Ok((inner.signal_names(),)),
        "slots" => Ok((inner.slot_names(),)),
        other => Err(SlotError::new(format!("unknown function kind '{other}'"))
            .with_details("expected 'signals' or 'slots'")),
    }
}

impl Inner {
    pub(crate) fn register_builtins(&self) -> Result<(), SignalSlotError> {
        self.add_slot(
            SLOT_PING,
            3,
            typed_invoker(|ctx, (pinger, token, _track): (String, u32, bool)| ping(ctx, &pinger, token)),
        )?;
        self.add_slot(
            SLOT_PING_ANSWER,
            2,
            typed_invoker(|ctx, (peer, info): (String, Hash)| {
                ping_answer(ctx, &peer, &info);
                Ok(())
            }),
        )?;
        for (name, event) in [
            (SLOT_INSTANCE_NEW, InstanceEvent::New),
            (SLOT_INSTANCE_UPDATED, InstanceEvent::Updated),
            (SLOT_INSTANCE_GONE, InstanceEvent::Gone),
        ] {
            self.add_slot(
                name,
                2,
                typed_invoker(move |ctx, (peer, info): (String, Hash)| {
                    ctx.inner().on_announcement(event, &peer, &info);
                    Ok(())
                }),
            )?;
        }
        self.add_slot(
            SLOT_CONNECT_TO_SIGNAL,
            3,
            typed_invoker(|ctx, (signal_instance_id, signal, slot): (String, String, String)| {
                Ok((ctx.inner().connect_local(&signal_instance_id, &signal, &slot)?,))
            }),
        )?;
        self.add_slot(
            SLOT_DISCONNECT_FROM_SIGNAL,
            3,
            typed_invoker(|ctx, (signal_instance_id, signal, slot): (String, String, String)| {
                Ok((ctx.inner().disconnect_local(&signal_instance_id, &signal, &slot)?,))
            }),
        )?;
        self.add_slot(
            SLOT_HAS_SLOT,
            1,
            typed_invoker(|ctx, (slot,): (String,)| Ok((ctx.inner().slots.contains_key(&slot),))),
        )?;
        self.add_slot(
            SLOT_GET_AVAILABLE_FUNCTIONS,
            1,
            typed_invoker(|ctx, (kind,): (String,)| available_functions(ctx.inner(), &kind)),
        )?;

        let defaults = &self.config.defaults;
        let heartbeat = Signal::new(
            &self.instance_id,
            HEARTBEAT_SIGNAL,
            3,
            defaults.system_priority,
            defaults.system_ttl_ms,
        )
        .on_topic(Topic::heartbeats());
        self.add_signal(heartbeat)
    }
}
