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

use std::collections::{BTreeSet, HashMap};

use parking_lot::Mutex;
use tracing::debug;

use crate::message::{SignalSlotError, Topic};
use crate::signal_slotable::Inner;

/// Receiver-side routing table: `(signal instance, signal)` -> local slots.
#[derive(Debug, Default)]
pub(crate) struct Connections {
    table: Mutex<HashMap<(String, String), BTreeSet<String>>>,
}

/// Effect of changing one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Change {
    /// The table changed.
    pub(crate) changed: bool,
    /// The signal gained its first or lost its last local slot.
    pub(crate) edge: bool,
}

impl Connections {
    pub(crate) fn add(&self, signal_instance_id: &str, signal: &str, slot: &str) -> Change {
        let mut table = self.table.lock();
        let slots = table
            .entry((signal_instance_id.to_string(), signal.to_string()))
            .or_default();
        let edge = slots.is_empty();
        let changed = slots.insert(slot.to_string());
        Change {
            changed,
            edge: changed && edge,
        }
    }

    pub(crate) fn remove(&self, signal_instance_id: &str, signal: &str, slot: &str) -> Change {
        let mut table = self.table.lock();
        let key = (signal_instance_id.to_string(), signal.to_string());
        let Some(slots) = table.get_mut(&key) else {
            return Change {
                changed: false,
                edge: false,
            };
        };
        let changed = slots.remove(slot);
        let edge = slots.is_empty();
        if edge {
            table.remove(&key);
        }
        Change { changed, edge }
    }

    pub(crate) fn slots_for(&self, signal_instance_id: &str, signal: &str) -> Vec<String> {
        self.table
            .lock()
            .get(&(signal_instance_id.to_string(), signal.to_string()))
            .map(|slots| slots.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn clear(&self) {
        self.table.lock().clear();
    }
}

impl Inner {
    /// Routes `signal` of `signal_instance_id` to the local `slot`.
    ///
    /// Returns `false` when no such slot is registered. The first connection
    /// to a signal subscribes this instance to the signal's topic.
    pub(crate) fn connect_local(&self, signal_instance_id: &str, signal: &str, slot: &str) -> Result<bool, SignalSlotError> {
        if !self.slots.contains_key(slot) {
            return Ok(false);
        }
        let change = self.connections.add(signal_instance_id, signal, slot);
        if change.edge {
            let subscribed = self
                .delivery
                .lock()
                .clone()
                .ok_or_else(|| SignalSlotError::Stopped(self.instance_id.clone()))
                .and_then(|handler| {
                    self.broker
                        .subscribe(&Topic::signal(signal_instance_id, signal), &self.subscriber_id, handler)
                        .map_err(SignalSlotError::from)
                });
            if let Err(e) = subscribed {
                self.connections.remove(signal_instance_id, signal, slot);
                return Err(e);
            }
        }
        debug!(instance_id = %self.instance_id, %signal_instance_id, %signal, %slot, "Connected");
        Ok(true)
    }

    /// Removes a connection; `false` when it did not exist.
    pub(crate) fn disconnect_local(&self, signal_instance_id: &str, signal: &str, slot: &str) -> Result<bool, SignalSlotError> {
        let change = self.connections.remove(signal_instance_id, signal, slot);
        if change.edge {
            self.broker
                .unsubscribe(&Topic::signal(signal_instance_id, signal), &self.subscriber_id)?;
        }
        if change.changed {
            debug!(instance_id = %self.instance_id, %signal_instance_id, %signal, %slot, "Disconnected");
        }
        Ok(change.changed)
    }
}
