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

use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::message::{Args, FromArgs, SignalSlotError};
use crate::signal_slotable::Inner;

/// What a reply resolves to once it reached the requester.
pub(crate) type ReplyResult = Result<Args, SignalSlotError>;

/// An entry in the pending-request table, removed when dropped.
struct PendingReply {
    inner: Arc<Inner>,
    reply_id: String,
    receiver: oneshot::Receiver<ReplyResult>,
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.inner.pending.remove(&self.reply_id);
    }
}

/// Caller side of one request.
///
/// The request is already on its way when a `Requestor` is handed out. Its
/// reply is taken exactly once, either by awaiting it
/// ([`wait_for_reply`](Self::wait_for_reply), [`receive`](Self::receive)) or
/// by registering continuations ([`receive_async`](Self::receive_async)).
/// Replies are matched by correlation id, so several requestors of one
/// instance complete independently of the order of their replies.
pub struct Requestor {
    target: String,
    slot: String,
    pending: PendingReply,
}

impl std::fmt::Debug for Requestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Requestor")
            .field("target", &self.target)
            .field("slot", &self.slot)
            .field("reply_id", &self.pending.reply_id)
            .finish()
    }
}

impl Requestor {
    pub(crate) fn new(
        inner: Arc<Inner>,
        reply_id: String,
        receiver: oneshot::Receiver<ReplyResult>,
        target: &str,
        slot: &str,
    ) -> Self {
        Self {
            target: target.to_string(),
            slot: slot.to_string(),
            pending: PendingReply {
                inner,
                reply_id,
                receiver,
            },
        }
    }

    /// Correlation id carried in the request header.
    pub fn reply_id(&self) -> &str {
        &self.pending.reply_id
    }

    /// Waits up to `timeout` for the reply and unpacks its values into `R`.
    ///
    /// An error reply becomes [`SignalSlotError::Remote`]; a reply with fewer
    /// values than `R` declares is [`SignalSlotError::MalformedReply`].
    pub async fn wait_for_reply<R: FromArgs>(self, timeout: Duration) -> Result<R, SignalSlotError> {
        let args = self.receive(timeout).await?;
        unpack(&args)
    }

    /// Waits up to `timeout` for the reply and returns its raw values.
    pub async fn receive(mut self, timeout: Duration) -> Result<Args, SignalSlotError> {
        match tokio::time::timeout(timeout, &mut self.pending.receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SignalSlotError::Stopped(self.pending.inner.instance_id.clone())),
            Err(_) => {
                debug!(target = %self.target, slot = %self.slot, ?timeout, "Request timed out");
                Err(SignalSlotError::Timeout {
                    instance_id: self.target.clone(),
                    slot: self.slot.clone(),
                    timeout,
                })
            }
        }
    }

    /// Returns at once; `on_reply` or `on_error` runs exactly once when the
    /// reply arrives, the timeout elapses or the instance stops.
    ///
    /// Without a timeout the configured request timeout applies.
    pub fn receive_async<R, F, E>(self, on_reply: F, on_error: E, timeout: Option<Duration>)
    where
        R: FromArgs + Send + 'static,
        F: FnOnce(R) + Send + 'static,
        E: FnOnce(SignalSlotError) + Send + 'static,
    {
        let inner = self.pending.inner.clone();
        let timeout = timeout.unwrap_or_else(|| inner.config.request_timeout());
        let handle = match inner.runtime_handle() {
            Ok(handle) => handle,
            Err(e) => {
                on_error(e);
                return;
            }
        };
        trace!(reply_id = %self.pending.reply_id, "Waiting for reply in background");
        inner.tracker.spawn_on(
            async move {
                match self.wait_for_reply::<R>(timeout).await {
                    Ok(values) => on_reply(values),
                    Err(e) => on_error(e),
                }
            },
            &handle,
        );
    }

    /// Like [`receive_async`](Self::receive_async) with failures logged.
    pub fn receive_async_or_log<R, F>(self, on_reply: F, timeout: Option<Duration>)
    where
        R: FromArgs + Send + 'static,
        F: FnOnce(R) + Send + 'static,
    {
        let target = self.target.clone();
        let slot = self.slot.clone();
        self.receive_async(
            on_reply,
            move |e| warn!(%target, %slot, error = %e, "Request failed"),
            timeout,
        );
    }
}

/// Unpacks the leading values of a reply; extra values are ignored.
pub(crate) fn unpack<R: FromArgs>(args: &Args) -> Result<R, SignalSlotError> {
    if args.len() < R::ARITY {
        return Err(SignalSlotError::MalformedReply(format!(
            "expected {} value(s), got {}",
            R::ARITY,
            args.len()
        )));
    }
    if args.len() > R::ARITY {
        debug!(expected = R::ARITY, got = args.len(), "Ignoring extra reply values");
    }
    R::from_values(&args.values()[..R::ARITY]).map_err(|e| SignalSlotError::MalformedReply(e.to_string()))
}
