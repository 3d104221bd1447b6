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

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::message::{BrokerMessage, SubscriberId, Topic};
use crate::traits::{Broker, BrokerError, DeliveryHandler};

/// Topic -> subscriber -> handler.
type Subscriptions = Arc<DashMap<Topic, HashMap<SubscriberId, DeliveryHandler>>>;

/// A process-local [`Broker`] that delivers every publication synchronously to
/// the handlers subscribed to its topic.
///
/// Cloning yields another handle onto the same subscription table, so several
/// `SignalSlotable` instances built from clones of one broker can reach each
/// other.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    subscribers: Subscriptions,
    closed: Arc<AtomicBool>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subscribers currently registered for `topic`.
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.subscribers.get(topic).map_or(0, |entry| entry.len())
    }

    /// Refuses all further publications and subscriptions.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.subscribers.clear();
    }

    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(BrokerError::Closed)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for InMemoryBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryBroker")
            .field("topics", &self.subscribers.len())
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl Broker for InMemoryBroker {
    fn publish(&self, message: BrokerMessage) -> Result<(), BrokerError> {
        self.ensure_open()?;
        // Snapshot under the shard lock, deliver after it is released: a
        // handler may publish or subscribe in turn.
        let handlers: Vec<DeliveryHandler> = self
            .subscribers
            .get(&message.topic)
            .map(|entry| entry.values().cloned().collect())
            .unwrap_or_default();
        trace!(topic = %message.topic, count = handlers.len(), "Publishing");
        if let Some((last, rest)) = handlers.split_last() {
            for handler in rest {
                handler(message.clone());
            }
            last(message);
        }
        Ok(())
    }

    fn subscribe(
        &self,
        topic: &Topic,
        subscriber: &SubscriberId,
        handler: DeliveryHandler,
    ) -> Result<(), BrokerError> {
        self.ensure_open()?;
        trace!(%topic, %subscriber, "Subscribing");
        self.subscribers
            .entry(topic.clone())
            .or_default()
            .insert(subscriber.clone(), handler);
        Ok(())
    }

    fn unsubscribe(&self, topic: &Topic, subscriber: &SubscriberId) -> Result<(), BrokerError> {
        trace!(%topic, %subscriber, "Unsubscribing");
        if let Some(mut entry) = self.subscribers.get_mut(topic) {
            entry.remove(subscriber);
        }
        self.subscribers.remove_if(topic, |_, handlers| handlers.is_empty());
        Ok(())
    }

    fn unsubscribe_all(&self, subscriber: &SubscriberId) -> Result<(), BrokerError> {
        trace!(%subscriber, "Removing all subscriptions");
        self.subscribers.retain(|_, handlers| {
            handlers.remove(subscriber);
            !handlers.is_empty()
        });
        Ok(())
    }
}
