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

use std::time::Duration;

use crate::message::{Args, BrokerMessage, MessageHeader, SignalSlotError, Topic};

/// A named outbound event of fixed arity owned by one instance.
///
/// Emitting publishes one message on the signal's topic; every instance that
/// connected a slot to the signal is subscribed there and receives its own
/// copy. The signal itself does not know its receivers.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    instance_id: String,
    name: String,
    arity: usize,
    priority: u8,
    time_to_live_ms: u64,
    topic: Topic,
}

impl Signal {
    pub(crate) fn new(instance_id: &str, name: &str, arity: usize, priority: u8, time_to_live_ms: u64) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            name: name.to_string(),
            arity,
            priority,
            time_to_live_ms,
            topic: Topic::signal(instance_id, name),
        }
    }

    /// Publishes on `topic` instead of the signal's own topic.
    #[must_use]
    pub(crate) fn on_topic(mut self, topic: Topic) -> Self {
        self.topic = topic;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn arity(&self) -> usize {
        self.arity
    }

    pub const fn priority(&self) -> u8 {
        self.priority
    }

    pub const fn time_to_live(&self) -> Duration {
        Duration::from_millis(self.time_to_live_ms)
    }

    pub const fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Builds the message for one emission.
    pub(crate) fn message(&self, args: Args) -> Result<BrokerMessage, SignalSlotError> {
        if args.len() != self.arity {
            return Err(SignalSlotError::ArityMismatch {
                name: self.name.clone(),
                given: args.len(),
                registered: vec![self.arity],
            });
        }
        let header = MessageHeader::new(&self.instance_id, &self.name, self.priority, self.time_to_live_ms);
        Ok(BrokerMessage::new(self.topic.clone(), header.to_hash(), args.into_body()?))
    }
}
