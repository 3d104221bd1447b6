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

use std::fmt::Debug;
use std::sync::Arc;

use thiserror::Error;

use crate::message::{BrokerMessage, SubscriberId, Topic};

/// Callback through which a broker hands a delivered message to a subscriber.
///
/// Handlers run on the publisher's thread and must return quickly; the
/// runtime's own handler only forwards into a bounded inbox.
pub type DeliveryHandler = Arc<dyn Fn(BrokerMessage) + Send + Sync>;

/// Transport failures reported by a [`Broker`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("broker connection is closed")]
    Closed,
    #[error("delivery on '{topic}' failed: {reason}")]
    Delivery { topic: String, reason: String },
}

/// The publish/subscribe transport a `SignalSlotable` is built on.
///
/// Implementations route a published message to every handler subscribed to
/// its topic. The runtime treats the transport as opaque: it never inspects
/// how or where messages travel.
pub trait Broker: Debug + Send + Sync + 'static {
    /// Sends `message` to every subscriber of `message.topic`.
    fn publish(&self, message: BrokerMessage) -> Result<(), BrokerError>;

    /// Registers `handler` for `topic` under `subscriber`, replacing any handler
    /// the same subscriber registered for that topic before.
    fn subscribe(
        &self,
        topic: &Topic,
        subscriber: &SubscriberId,
        handler: DeliveryHandler,
    ) -> Result<(), BrokerError>;

    fn unsubscribe(&self, topic: &Topic, subscriber: &SubscriberId) -> Result<(), BrokerError>;

    /// Drops every registration of `subscriber`.
    fn unsubscribe_all(&self, subscriber: &SubscriberId) -> Result<(), BrokerError>;
}
