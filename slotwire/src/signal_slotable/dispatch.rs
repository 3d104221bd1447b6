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

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, trace, warn};

use crate::message::{
    keys, now_ms, Args, BrokerMessage, MessageHeader, ReplyRoute, SignalSlotError, SlotContext, Topic,
};
use crate::signal_slotable::outbound::reply_result;
use crate::signal_slotable::Inner;
use crate::traits::DeliveryHandler;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

impl Inner {
    /// The single handler this instance registers with the broker.
    ///
    /// Replies complete their waiter right here; everything else is queued
    /// for the dispatch loop.
    pub(crate) fn delivery_handler(self: &Arc<Self>, inbox: mpsc::Sender<BrokerMessage>) -> DeliveryHandler {
        let weak = Arc::downgrade(self);
        Arc::new(move |message: BrokerMessage| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.resolve_reply(&message) {
                return;
            }
            match inbox.try_send(message) {
                Ok(()) => {}
                Err(TrySendError::Full(message)) => {
                    warn!(instance_id = %inner.instance_id, topic = %message.topic, "Inbox full, message dropped");
                    inner.refuse(&message);
                }
                Err(TrySendError::Closed(message)) => {
                    trace!(instance_id = %inner.instance_id, topic = %message.topic, "Inbox closed, message dropped");
                }
            }
        })
    }

    /// Answers a request that found the inbox full so its caller does not
    /// wait for the timeout.
    fn refuse(&self, message: &BrokerMessage) {
        let Some(route) = MessageHeader::from_hash(&message.header)
            .ok()
            .and_then(|header| ReplyRoute::from_header(&header))
        else {
            return;
        };
        let error = SignalSlotError::InboxFull(self.instance_id.clone());
        self.send_reply(&route, Err(error.into()));
    }

    /// Completes the waiter of a reply; `false` when `message` is no reply.
    fn resolve_reply(&self, message: &BrokerMessage) -> bool {
        let Some(reply_id) = message
            .header
            .entry(keys::REPLY_FROM)
            .and_then(|node| node.value().as_str())
        else {
            return false;
        };
        let header = match MessageHeader::from_hash(&message.header) {
            Ok(header) => header,
            Err(e) => {
                warn!(instance_id = %self.instance_id, %reply_id, error = %e, "Dropping malformed reply");
                return true;
            }
        };
        if header.is_expired(now_ms()) {
            warn!(instance_id = %self.instance_id, %reply_id, "Dropping expired reply");
            return true;
        }
        match self.pending.remove(reply_id) {
            Some((_, sender)) => {
                trace!(instance_id = %self.instance_id, %reply_id, from = %header.signal_instance_id, "Reply received");
                if sender.send(reply_result(&header, &message.body)).is_err() {
                    trace!(instance_id = %self.instance_id, %reply_id, "Requester is gone");
                }
            }
            None => {
                trace!(instance_id = %self.instance_id, %reply_id, "No pending request for reply");
            }
        }
        true
    }

    /// Starts the loop consuming the inbox until cancellation.
    pub(crate) fn spawn_dispatch(self: &Arc<Self>, mut inbox: mpsc::Receiver<BrokerMessage>) -> Result<(), SignalSlotError> {
        let inner = self.clone();
        let token = self.cancellation_token.clone();
        self.spawn(async move {
            loop {
                tokio::select! {
                    () = token.cancelled() => {
                        trace!(instance_id = %inner.instance_id, "Dispatch loop cancelled");
                        break;
                    }
                    message = inbox.recv() => match message {
                        Some(message) => inner.process(message),
                        None => break,
                    },
                }
            }
            if let Err(e) = inner.broker.unsubscribe_all(&inner.subscriber_id) {
                warn!(instance_id = %inner.instance_id, error = %e, "Failed to unsubscribe");
            }
            trace!(instance_id = %inner.instance_id, "Dispatch loop stopped");
        })
    }

    pub(crate) fn process(self: &Arc<Self>, message: BrokerMessage) {
        let header = match MessageHeader::from_hash(&message.header) {
            Ok(header) => header,
            Err(e) => {
                warn!(instance_id = %self.instance_id, topic = %message.topic, error = %e, "Dropping malformed message");
                return;
            }
        };
        if header.is_expired(now_ms()) {
            warn!(
                instance_id = %self.instance_id,
                from = %header.signal_instance_id,
                function = %header.signal_function,
                "Dropping expired message"
            );
            return;
        }
        let route = ReplyRoute::from_header(&header);
        let args = match Args::from_body(&message.body) {
            Ok(args) => args,
            Err(e) => {
                warn!(instance_id = %self.instance_id, from = %header.signal_instance_id, error = %e, "Malformed body");
                if let Some(route) = &route {
                    self.send_reply(route, Err(e.into()));
                }
                return;
            }
        };

        if message.topic == Topic::heartbeats() {
            self.on_heartbeat(&args);
            return;
        }

        let targets: Vec<(bool, String)> = header
            .slots_for(&self.instance_id)
            .map(|(global, slot)| (global, slot.to_string()))
            .collect();
        if targets.is_empty() {
            let slots = self
                .connections
                .slots_for(&header.signal_instance_id, &header.signal_function);
            if slots.is_empty() {
                trace!(instance_id = %self.instance_id, signal = %header.signal_function, "No slot connected");
            }
            for slot in slots {
                self.dispatch_slot(&header, &slot, None, false, &args);
            }
            return;
        }
        for (global, slot) in targets {
            self.dispatch_slot(&header, &slot, route.clone(), global, &args);
        }
    }

    /// Runs one slot and answers the caller when it waits for a reply.
    fn dispatch_slot(
        self: &Arc<Self>,
        header: &MessageHeader,
        slot_name: &str,
        route: Option<ReplyRoute>,
        global: bool,
        args: &Args,
    ) {
        let Some(slot) = self.slots.get(slot_name).map(|entry| entry.value().clone()) else {
            if global {
                trace!(instance_id = %self.instance_id, slot = slot_name, "Global call to a slot this instance lacks");
                return;
            }
            warn!(instance_id = %self.instance_id, slot = slot_name, from = %header.signal_instance_id, "Slot not found");
            if let Some(route) = &route {
                let error = SignalSlotError::SlotNotFound {
                    instance_id: self.instance_id.clone(),
                    slot: slot_name.to_string(),
                };
                self.send_reply(route, Err(error.into()));
            }
            return;
        };

        let guard = self.guard.read().clone();
        if let Some(guard) = guard {
            if let Err(e) = guard(slot_name, &header.signal_instance_id) {
                debug!(instance_id = %self.instance_id, slot = slot_name, error = %e, "Slot call rejected");
                if let Some(route) = &route {
                    self.send_reply(route, Err(e));
                }
                return;
            }
        }

        trace!(instance_id = %self.instance_id, slot = slot_name, from = %header.signal_instance_id, "Invoking slot");
        let ctx = SlotContext::new(self.clone(), header.clone(), slot_name, route.clone());
        let result = panic::catch_unwind(AssertUnwindSafe(|| slot.invoke(&ctx, args))).unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            error!(instance_id = %self.instance_id, slot = slot_name, %message, "Slot panicked");
            Err(SignalSlotError::Callback {
                slot: slot_name.to_string(),
                message,
            }
            .into())
        });

        if ctx.reply_taken() {
            if let Err(e) = result {
                debug!(instance_id = %self.instance_id, slot = slot_name, error = %e, "Slot failed after deferring its reply");
            }
            return;
        }
        match route {
            Some(route) => self.send_reply(&route, result),
            None => {
                if let Err(e) = result {
                    warn!(instance_id = %self.instance_id, slot = slot_name, error = %e, "Slot call failed");
                }
            }
        }
    }
}
