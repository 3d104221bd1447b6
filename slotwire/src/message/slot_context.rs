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

use std::cell::Cell;
use std::sync::Arc;

use static_assertions::assert_impl_all;

use crate::common::AsyncReply;
use crate::message::{MessageHeader, SignalSlotError};
use crate::signal_slotable::{Inner, SignalSlotable};

/// Where the answer to an inbound slot invocation goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReplyRoute {
    /// A `request`: the reply carries the caller's correlation id.
    Correlated { instance_id: String, reply_id: String },
    /// A `request_no_wait`: the reply is a call to a named slot.
    NamedSlot { instance_id: String, slot: String },
}

impl ReplyRoute {
    pub(crate) fn from_header(header: &MessageHeader) -> Option<Self> {
        use crate::message::functions;

        match header.signal_function.as_str() {
            functions::REQUEST => header.reply_to.as_ref().map(|reply_id| Self::Correlated {
                instance_id: header.signal_instance_id.clone(),
                reply_id: reply_id.clone(),
            }),
            functions::REQUEST_NO_WAIT => header
                .reply_instance_id
                .as_ref()
                .zip(header.reply_function.as_ref())
                .map(|(instance_id, slot)| Self::NamedSlot {
                    instance_id: instance_id.clone(),
                    slot: slot.clone(),
                }),
            _ => None,
        }
    }
}

/// What a slot callback knows about the message that invoked it.
///
/// Unless [`async_reply`](Self::async_reply) is taken, the value the callback
/// returns is sent back to a requesting caller as soon as it returns.
pub struct SlotContext {
    inner: Arc<Inner>,
    header: MessageHeader,
    slot: String,
    route: Option<ReplyRoute>,
    reply_taken: Cell<bool>,
}

impl SlotContext {
    pub(crate) fn new(inner: Arc<Inner>, header: MessageHeader, slot: &str, route: Option<ReplyRoute>) -> Self {
        Self {
            inner,
            header,
            slot: slot.to_string(),
            route,
            reply_taken: Cell::new(false),
        }
    }

    /// Id of the instance that sent the call, request or signal.
    pub fn caller_id(&self) -> &str {
        &self.header.signal_instance_id
    }

    pub fn slot_name(&self) -> &str {
        &self.slot
    }

    pub const fn header(&self) -> &MessageHeader {
        &self.header
    }

    /// The caller waits for an answer.
    pub const fn is_request(&self) -> bool {
        self.route.is_some()
    }

    /// Takes over the reply.
    ///
    /// The automatic reply is suppressed; the returned token must be completed
    /// later, from any thread, with [`AsyncReply::send`] or
    /// [`AsyncReply::error`]. For a plain call the token completes silently.
    pub fn async_reply(&self) -> Result<AsyncReply, SignalSlotError> {
        if self.reply_taken.replace(true) {
            return Err(SignalSlotError::ReplyAlreadyTaken(self.slot.clone()));
        }
        Ok(AsyncReply::new(&self.inner, self.route.clone(), &self.slot))
    }

    /// A handle on the instance the slot belongs to.
    pub fn instance(&self) -> SignalSlotable {
        SignalSlotable::from_inner(self.inner.clone())
    }

    /// Suppresses the reply without handing out a token.
    pub(crate) fn discard_reply(&self) {
        self.reply_taken.set(true);
    }

    pub(crate) const fn inner(&self) -> &Arc<Inner> {
        &self.inner
    }

    pub(crate) fn reply_taken(&self) -> bool {
        self.reply_taken.get()
    }
}

assert_impl_all!(SlotContext: Send);
