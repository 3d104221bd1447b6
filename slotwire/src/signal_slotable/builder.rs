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

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use slotwire_core::{Hash, MergePolicy};

use crate::common::config::CONFIG;
use crate::common::SlotwireConfig;
use crate::message::{host_name, SignalSlotError};
use crate::signal_slotable::heartbeat::HEARTBEAT_INTERVAL_KEY;
use crate::signal_slotable::{Inner, SignalSlotable};
use crate::traits::Broker;

static GENERATED_IDS: AtomicU64 = AtomicU64::new(0);

/// Characters that cannot appear in an instance id because topics and
/// headers use them as delimiters.
const RESERVED: [char; 5] = ['.', '|', ':', '/', '*'];

pub(crate) fn validate_instance_id(id: &str) -> Result<(), SignalSlotError> {
    let invalid = |reason: String| SignalSlotError::InvalidInstanceId {
        id: id.to_string(),
        reason,
    };
    if id.is_empty() {
        return Err(invalid("the id is empty".to_string()));
    }
    match id.chars().find(|c| RESERVED.contains(c) || c.is_whitespace()) {
        Some(c) => Err(invalid(format!("'{c}' is reserved"))),
        None => Ok(()),
    }
}

/// An instance id unique within this process: `<prefix>_<host>_<pid>_<n>`.
///
/// Reserved characters are replaced by `-`; an empty prefix falls back to
/// the configured one.
pub(crate) fn generate_instance_id(prefix: &str) -> String {
    let prefix = if prefix.is_empty() {
        CONFIG.defaults.instance_prefix.as_str()
    } else {
        prefix
    };
    let n = GENERATED_IDS.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{}_{}_{n}", host_name(), std::process::id())
        .chars()
        .map(|c| if RESERVED.contains(&c) || c.is_whitespace() { '-' } else { c })
        .collect()
}

/// Configures a [`SignalSlotable`] before it is built.
#[derive(Debug)]
pub struct SignalSlotableBuilder {
    instance_id: String,
    broker: Arc<dyn Broker>,
    config: Option<SlotwireConfig>,
    instance_info: Hash,
    heartbeat_interval: Option<Duration>,
    track_instances: Option<bool>,
}

impl SignalSlotableBuilder {
    pub(crate) fn new(instance_id: String, broker: Arc<dyn Broker>) -> Self {
        Self {
            instance_id,
            broker,
            config: None,
            instance_info: Hash::new(),
            heartbeat_interval: None,
            track_instances: None,
        }
    }

    /// Uses `config` instead of the globally loaded configuration.
    #[must_use]
    pub fn config(mut self, config: SlotwireConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Extra entries announced with the instance.
    #[must_use]
    pub fn instance_info(mut self, info: Hash) -> Self {
        self.instance_info = info;
        self
    }

    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = Some(interval);
        self
    }

    /// Maintain a topology of peers from announcements and heartbeats.
    #[must_use]
    pub fn track_instances(mut self, track: bool) -> Self {
        self.track_instances = Some(track);
        self
    }

    /// Validates the id and registers the built-in slots.
    pub fn build(self) -> Result<SignalSlotable, SignalSlotError> {
        validate_instance_id(&self.instance_id)?;
        let mut config = self.config.unwrap_or_else(|| CONFIG.clone());
        if let Some(interval) = self.heartbeat_interval {
            config.heartbeat.interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        }
        if let Some(track) = self.track_instances {
            config.heartbeat.track_instances = track;
        }

        let mut info = Hash::new();
        info.insert("type", config.defaults.instance_type.as_str());
        info.insert("host", host_name());
        info.insert("pid", std::process::id());
        info.insert(HEARTBEAT_INTERVAL_KEY, config.heartbeat.interval_ms);
        info.merge(&self.instance_info, MergePolicy::default());

        let inner = Inner::new(self.instance_id, config, self.broker, info);
        inner.register_builtins()?;
        Ok(SignalSlotable::from_owned(Arc::new(inner)))
    }
}
