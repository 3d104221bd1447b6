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

use std::time::{SystemTime, UNIX_EPOCH};

use slotwire_core::{Hash, Value};

use crate::message::SignalSlotError;

/// Header keys as they appear on the wire.
pub mod keys {
    pub const SIGNAL_INSTANCE_ID: &str = "signalInstanceId";
    pub const SIGNAL_FUNCTION: &str = "signalFunction";
    pub const SLOT_INSTANCE_IDS: &str = "slotInstanceIds";
    pub const SLOT_FUNCTIONS: &str = "slotFunctions";
    pub const REPLY_TO: &str = "replyTo";
    pub const REPLY_FROM: &str = "replyFrom";
    pub const REPLY_INSTANCE_IDS: &str = "replyInstanceIds";
    pub const REPLY_FUNCTIONS: &str = "replyFunctions";
    pub const ERROR: &str = "error";
    pub const PRIORITY: &str = "priority";
    pub const TIME_TO_LIVE: &str = "timeToLive";
    pub const TIMESTAMP: &str = "MQTimestamp";
    pub const HOST_NAME: &str = "hostName";
    pub const USER_NAME: &str = "userName";
}

/// `signalFunction` values that mark slot traffic rather than a signal.
pub mod functions {
    pub const CALL: &str = "__call__";
    pub const REQUEST: &str = "__request__";
    pub const REQUEST_NO_WAIT: &str = "__requestNoWait__";
    pub const REPLY: &str = "__reply__";
}

/// Typed view of a message header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageHeader {
    pub signal_instance_id: String,
    pub signal_function: String,
    /// Target instances and the slots to invoke on each.
    pub slot_targets: Vec<(String, Vec<String>)>,
    pub reply_to: Option<String>,
    pub reply_from: Option<String>,
    pub reply_instance_id: Option<String>,
    pub reply_function: Option<String>,
    pub error: bool,
    pub priority: u8,
    pub time_to_live_ms: u64,
    pub timestamp_ms: u64,
    pub host_name: String,
    pub user_name: String,
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

pub(crate) fn host_name() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "localhost".to_string())
}

pub(crate) fn user_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_default()
}

impl MessageHeader {
    /// Header stamped with sender identity, priority, lifetime and send time.
    pub fn new(sender: &str, function: &str, priority: u8, time_to_live_ms: u64) -> Self {
        Self {
            signal_instance_id: sender.to_string(),
            signal_function: function.to_string(),
            priority,
            time_to_live_ms,
            timestamp_ms: now_ms(),
            host_name: host_name(),
            user_name: user_name(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn targeting(mut self, instance_id: &str, slot: &str) -> Self {
        self.slot_targets = vec![(instance_id.to_string(), vec![slot.to_string()])];
        self
    }

    /// Whether the message carries slot traffic for `instance_id`, either
    /// directly or through the `*` wildcard.
    pub fn slots_for<'h>(&'h self, instance_id: &'h str) -> impl Iterator<Item = (bool, &'h str)> + 'h {
        self.slot_targets
            .iter()
            .filter(move |(target, _)| target == instance_id || target == "*")
            .flat_map(|(target, slots)| slots.iter().map(move |slot| (target == "*", slot.as_str())))
    }

    pub fn is_reply(&self) -> bool {
        self.reply_from.is_some()
    }

    /// The message outlived its time-to-live at `now`.
    pub fn is_expired(&self, now: u64) -> bool {
        self.time_to_live_ms > 0 && now.saturating_sub(self.timestamp_ms) > self.time_to_live_ms
    }

    pub fn to_hash(&self) -> Hash {
        let mut h = Hash::new();
        h.insert(keys::SIGNAL_INSTANCE_ID, self.signal_instance_id.as_str());
        h.insert(keys::SIGNAL_FUNCTION, self.signal_function.as_str());
        if !self.slot_targets.is_empty() {
            let ids: String = self
                .slot_targets
                .iter()
                .map(|(id, _)| format!("|{id}|"))
                .collect();
            let functions: String = self
                .slot_targets
                .iter()
                .map(|(id, slots)| format!("|{id}:{}|", slots.join(",")))
                .collect();
            h.insert(keys::SLOT_INSTANCE_IDS, ids);
            h.insert(keys::SLOT_FUNCTIONS, functions);
        }
        if let Some(reply_to) = &self.reply_to {
            h.insert(keys::REPLY_TO, reply_to.as_str());
        }
        if let Some(reply_from) = &self.reply_from {
            h.insert(keys::REPLY_FROM, reply_from.as_str());
        }
        if let (Some(id), Some(function)) = (&self.reply_instance_id, &self.reply_function) {
            h.insert(keys::REPLY_INSTANCE_IDS, format!("|{id}|"));
            h.insert(keys::REPLY_FUNCTIONS, format!("|{id}:{function}|"));
        }
        h.insert(keys::ERROR, self.error);
        h.insert(keys::PRIORITY, self.priority);
        h.insert(keys::TIME_TO_LIVE, self.time_to_live_ms);
        h.insert(keys::TIMESTAMP, self.timestamp_ms);
        h.insert(keys::HOST_NAME, self.host_name.as_str());
        h.insert(keys::USER_NAME, self.user_name.as_str());
        h
    }

    pub fn from_hash(h: &Hash) -> Result<Self, SignalSlotError> {
        let text = |key: &str| -> Option<String> {
            h.entry(key).and_then(|node| node.value().as_str()).map(str::to_string)
        };
        let signal_instance_id = text(keys::SIGNAL_INSTANCE_ID).ok_or_else(|| {
            SignalSlotError::MalformedMessage(format!("header lacks '{}'", keys::SIGNAL_INSTANCE_ID))
        })?;
        let signal_function = text(keys::SIGNAL_FUNCTION).ok_or_else(|| {
            SignalSlotError::MalformedMessage(format!("header lacks '{}'", keys::SIGNAL_FUNCTION))
        })?;
        let slot_targets = text(keys::SLOT_FUNCTIONS)
            .map(|s| parse_slot_functions(&s))
            .unwrap_or_default();
        let (reply_instance_id, reply_function) = text(keys::REPLY_FUNCTIONS)
            .and_then(|s| parse_slot_functions(&s).into_iter().next())
            .and_then(|(id, mut slots)| slots.pop().map(|slot| (Some(id), Some(slot))))
            .unwrap_or((None, None));
        let number = |key: &str| -> u64 {
            h.entry(key)
                .and_then(|node| node.get_as::<u64>().ok())
                .unwrap_or(0)
        };
        Ok(Self {
            signal_instance_id,
            signal_function,
            slot_targets,
            reply_to: text(keys::REPLY_TO),
            reply_from: text(keys::REPLY_FROM),
            reply_instance_id,
            reply_function,
            error: h
                .entry(keys::ERROR)
                .is_some_and(|node| matches!(node.value(), Value::Bool(true))),
            priority: u8::try_from(number(keys::PRIORITY)).unwrap_or(u8::MAX),
            time_to_live_ms: number(keys::TIME_TO_LIVE),
            timestamp_ms: number(keys::TIMESTAMP),
            host_name: text(keys::HOST_NAME).unwrap_or_default(),
            user_name: text(keys::USER_NAME).unwrap_or_default(),
        })
    }
}

/// Parses `|id1:slotA,slotB||id2:slotC|` into its targets.
fn parse_slot_functions(text: &str) -> Vec<(String, Vec<String>)> {
    text.split('|')
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let (id, slots) = entry.split_once(':')?;
            let slots = slots
                .split(',')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            Some((id.to_string(), slots))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_survives_hash_form() {
        let mut header = MessageHeader::new("alice", functions::REQUEST, 4, 250).targeting("bob", "slotAdd");
        header.reply_to = Some("reply_1".to_string());
        let back = MessageHeader::from_hash(&header.to_hash()).unwrap();
        assert_eq!(back, header);
        assert_eq!(
            header.to_hash().get::<String>(keys::SLOT_FUNCTIONS).unwrap(),
            "|bob:slotAdd|"
        );
    }

    #[test]
    fn wildcard_targets_are_flagged_global() {
        let header = MessageHeader {
            slot_targets: parse_slot_functions("|*:slotPing||bob:slotA,slotB||carol:slotC|"),
            ..MessageHeader::default()
        };
        let own: Vec<_> = header.slots_for("bob").collect();
        assert_eq!(own, [(true, "slotPing"), (false, "slotA"), (false, "slotB")]);
    }

    #[test]
    fn expiry_uses_time_to_live() {
        let mut header = MessageHeader::new("a", functions::CALL, 4, 0);
        assert!(!header.is_expired(header.timestamp_ms + 1_000_000));
        header.time_to_live_ms = 100;
        assert!(!header.is_expired(header.timestamp_ms + 50));
        assert!(header.is_expired(header.timestamp_ms + 101));
    }
}
