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

use std::sync::{Arc, Weak};

use static_assertions::assert_impl_all;
use tracing::{error, trace};

use crate::message::{IntoArgs, ReplyRoute, SlotError};
use crate::signal_slotable::Inner;

/// Token that completes a request after its slot callback has returned.
///
/// Obtained from [`SlotContext::async_reply`](crate::prelude::SlotContext::async_reply).
/// [`send`](Self::send) and [`error`](Self::error) consume the token, so a
/// reply can be given at most once. A token dropped without either answers the
/// caller with an error instead of leaving it waiting.
#[derive(Debug)]
pub struct AsyncReply {
    inner: Weak<Inner>,
    route: Option<ReplyRoute>,
    slot: String,
    completed: bool,
}

impl AsyncReply {
    pub(crate) fn new(inner: &Arc<Inner>, route: Option<ReplyRoute>, slot: &str) -> Self {
        Self {
            inner: Arc::downgrade(inner),
            route,
            slot: slot.to_string(),
            completed: false,
        }
    }

    /// Whether anybody waits for this reply.
    pub const fn is_request(&self) -> bool {
        self.route.is_some()
    }

    /// Answers with up to four values.
    pub fn send(mut self, values: impl IntoArgs) {
        self.complete(Ok(values.into_args()));
    }

    /// Answers with an error; an empty `details` is sent as none.
    pub fn error(mut self, message: impl Into<String>, details: impl Into<String>) {
        let details = details.into();
        let failure = if details.is_empty() {
            SlotError::new(message)
        } else {
            SlotError::new(message).with_details(details)
        };
        self.complete(Err(failure));
    }

    fn complete(&mut self, result: Result<crate::message::Args, SlotError>) {
        self.completed = true;
        let Some(route) = &self.route else {
            trace!(slot = %self.slot, "Deferred reply to a call, nothing to send");
            return;
        };
        let Some(inner) = self.inner.upgrade() else {
            trace!(slot = %self.slot, "Instance is gone, deferred reply dropped");
            return;
        };
        inner.send_reply(route, result);
    }
}

impl Drop for AsyncReply {
    fn drop(&mut self) {
        if !self.completed {
            error!(slot = %self.slot, "Deferred reply dropped without answering");
            let message = format!("slot '{}' dropped its deferred reply", self.slot);
            self.complete(Err(SlotError::new(message)));
        }
    }
}

assert_impl_all!(AsyncReply: Send, Sync);
