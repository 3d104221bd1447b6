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

use mti::prelude::*;
use slotwire_core::Hash;
use tokio::sync::oneshot;
use tracing::{trace, warn};

use crate::common::{ReplyResult, Requestor};
use crate::message::{
    functions, Args, BrokerMessage, MessageHeader, ReplyRoute, SignalSlotError, SlotError, Topic,
};
use crate::signal_slotable::Inner;

/// Topic on which slot traffic for `target` travels.
fn slot_topic(target: &str) -> Topic {
    if target == "*" {
        Topic::global()
    } else {
        Topic::instance(target)
    }
}

/// Body of an error reply: the message in `a1`, the details in `a2`.
fn error_body(error: &SlotError) -> Hash {
    let mut body = Hash::new();
    body.insert("a1", error.message());
    body.insert("a2", error.details().unwrap_or_default());
    body
}

/// Interprets a reply on the requester's side.
pub(crate) fn reply_result(header: &MessageHeader, body: &Hash) -> ReplyResult {
    if header.error {
        let text = |key: &str| body.entry(key).and_then(|node| node.value().as_str()).unwrap_or_default();
        let details = text("a2");
        return Err(SignalSlotError::Remote {
            message: text("a1").to_string(),
            details: (!details.is_empty()).then(|| details.to_string()),
            instance_id: header.signal_instance_id.clone(),
        });
    }
    Args::from_body(body).map_err(|e| SignalSlotError::MalformedReply(e.to_string()))
}

impl Inner {
    fn publish(&self, topic: Topic, header: &MessageHeader, body: Hash) -> Result<(), SignalSlotError> {
        trace!(instance_id = %self.instance_id, %topic, function = %header.signal_function, "Publishing");
        self.broker.publish(BrokerMessage::new(topic, header.to_hash(), body))?;
        Ok(())
    }

    /// One-way invocation of `slot` on `target`, or on every instance for `*`.
    pub(crate) fn send_call(&self, target: &str, slot: &str, args: Args) -> Result<(), SignalSlotError> {
        let target = self.resolve(target);
        let header = self.system_header(functions::CALL).targeting(target, slot);
        self.publish(slot_topic(target), &header, args.into_body()?)
    }

    /// Registers a correlation id, then sends the request.
    pub(crate) fn send_request(self: &Arc<Self>, target: &str, slot: &str, args: Args) -> Result<Requestor, SignalSlotError> {
        let target = self.resolve(target).to_string();
        if target == "*" {
            return Err(SignalSlotError::InvalidTarget(target));
        }
        let body = args.into_body()?;
        let reply_id = "reply".create_type_id::<V7>().to_string();
        let (sender, receiver) = oneshot::channel();
        self.pending.insert(reply_id.clone(), sender);
        // Created first so that a failed publish drops the pending entry.
        let requestor = Requestor::new(self.clone(), reply_id.clone(), receiver, &target, slot);

        let mut header = self.system_header(functions::REQUEST).targeting(&target, slot);
        header.reply_to = Some(reply_id);
        self.publish(Topic::instance(&target), &header, body)?;
        Ok(requestor)
    }

    /// Request whose reply is delivered as a call to `reply_slot`.
    pub(crate) fn send_request_no_wait(
        &self,
        target: &str,
        slot: &str,
        reply_instance_id: &str,
        reply_slot: &str,
        args: Args,
    ) -> Result<(), SignalSlotError> {
        let target = self.resolve(target);
        if target == "*" {
            return Err(SignalSlotError::InvalidTarget(target.to_string()));
        }
        let mut header = self.system_header(functions::REQUEST_NO_WAIT).targeting(target, slot);
        header.reply_instance_id = Some(self.resolve(reply_instance_id).to_string());
        header.reply_function = Some(reply_slot.to_string());
        self.publish(Topic::instance(target), &header, args.into_body()?)
    }

    pub(crate) fn emit(&self, signal: &str, args: Args) -> Result<(), SignalSlotError> {
        let message = {
            let registered = self
                .signals
                .get(signal)
                .ok_or_else(|| SignalSlotError::SignalNotFound(signal.to_string()))?;
            registered.message(args)?
        };
        trace!(instance_id = %self.instance_id, signal, topic = %message.topic, "Emitting");
        self.broker.publish(message)?;
        Ok(())
    }

    /// Answers an inbound request. Failures to send are logged; the caller
    /// then runs into its timeout.
    pub(crate) fn send_reply(&self, route: &ReplyRoute, result: Result<Args, SlotError>) {
        match route {
            ReplyRoute::Correlated { instance_id, reply_id } => {
                let mut header = self.system_header(functions::REPLY);
                header.reply_from = Some(reply_id.clone());
                let body = match result.and_then(|args| args.into_body().map_err(SlotError::from)) {
                    Ok(body) => body,
                    Err(e) => {
                        header.error = true;
                        error_body(&e)
                    }
                };
                if let Err(e) = self.publish(Topic::instance(instance_id), &header, body) {
                    warn!(instance_id = %self.instance_id, %reply_id, error = %e, "Failed to send reply");
                }
            }
            ReplyRoute::NamedSlot { instance_id, slot } => match result {
                Ok(args) => {
                    if let Err(e) = self.send_call(instance_id, slot, args) {
                        warn!(instance_id = %self.instance_id, %slot, error = %e, "Failed to forward reply");
                    }
                }
                Err(e) => {
                    warn!(instance_id = %self.instance_id, reply_slot = %slot, error = %e, "Request without waiter failed");
                }
            },
        }
    }
}
