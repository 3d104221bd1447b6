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

use dashmap::mapref::entry::Entry;
use slotwire_core::Hash;
use tokio::time::{self, Instant};
use tracing::{info, trace, warn};

use crate::common::unpack;
use crate::message::{Args, IntoArgs, SignalSlotError};
use crate::signal_slotable::inner::{InstanceEvent, TrackedInstance};
use crate::signal_slotable::Inner;

/// Name of the signal carrying `(instance_id, interval_ms, instance_info)`.
pub(crate) const HEARTBEAT_SIGNAL: &str = "signalHeartbeat";

/// Instance info key holding the heartbeat interval in milliseconds.
pub(crate) const HEARTBEAT_INTERVAL_KEY: &str = "heartbeatInterval";

impl Inner {
    /// Emits a heartbeat every configured interval until cancellation.
    pub(crate) fn spawn_heartbeats(self: &Arc<Self>) -> Result<(), SignalSlotError> {
        let inner = self.clone();
        let token = self.cancellation_token.clone();
        let period = self.config.heartbeat_interval().max(Duration::from_millis(1));
        self.spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let args = (
                            inner.instance_id.clone(),
                            inner.config.heartbeat.interval_ms,
                            inner.instance_info(),
                        )
                            .into_args();
                        if let Err(e) = inner.emit(HEARTBEAT_SIGNAL, args) {
                            warn!(instance_id = %inner.instance_id, error = %e, "Failed to emit heartbeat");
                        }
                    }
                }
            }
            trace!(instance_id = %inner.instance_id, "Heartbeats stopped");
        })
    }

    /// Periodically evicts peers whose heartbeats stopped.
    pub(crate) fn spawn_tracking(self: &Arc<Self>) -> Result<(), SignalSlotError> {
        let inner = self.clone();
        let token = self.cancellation_token.clone();
        let period = Duration::from_millis(self.config.heartbeat.tracking_tick_ms.max(1));
        self.spawn(async move {
            let mut ticker = time::interval(period);
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => inner.evict_expired(),
                }
            }
        })
    }

    fn deadline(&self, interval_ms: u64) -> Instant {
        let tolerance = u64::from(self.config.heartbeat.missed_beats_tolerance.max(1));
        Instant::now() + Duration::from_millis(interval_ms.saturating_mul(tolerance))
    }

    fn deadline_from_info(&self, info: &Hash) -> Instant {
        let interval_ms = info
            .get_as::<u64>(HEARTBEAT_INTERVAL_KEY)
            .unwrap_or(self.config.heartbeat.interval_ms);
        self.deadline(interval_ms)
    }

    pub(crate) fn evict_expired(&self) {
        let now = Instant::now();
        let mut gone = Vec::new();
        self.topology.retain(|instance_id, tracked| {
            if tracked.deadline <= now {
                gone.push((instance_id.clone(), tracked.info.clone()));
                false
            } else {
                true
            }
        });
        for (instance_id, info) in gone {
            info!(instance_id = %self.instance_id, peer = %instance_id, "Instance missed its heartbeats");
            self.fire(InstanceEvent::Gone, &instance_id, &info);
        }
    }

    pub(crate) fn on_heartbeat(&self, args: &Args) {
        if !self.is_tracking() {
            return;
        }
        let (peer, interval_ms, info) = match unpack::<(String, u64, Hash)>(args) {
            Ok(beat) => beat,
            Err(e) => {
                warn!(instance_id = %self.instance_id, error = %e, "Malformed heartbeat");
                return;
            }
        };
        if peer == self.instance_id {
            return;
        }
        let deadline = self.deadline(interval_ms);
        let discovered = match self.topology.entry(peer.clone()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().deadline = deadline;
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(TrackedInstance {
                    info: info.clone(),
                    deadline,
                });
                true
            }
        };
        if discovered {
            info!(instance_id = %self.instance_id, %peer, "Instance discovered through its heartbeat");
            self.fire(InstanceEvent::New, &peer, &info);
        }
    }

    /// Adds a peer to the topology unless already present; `true` if added.
    pub(crate) fn track_if_unknown(&self, peer: &str, info: &Hash) -> bool {
        match self.topology.entry(peer.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(TrackedInstance {
                    info: info.clone(),
                    deadline: self.deadline_from_info(info),
                });
                true
            }
        }
    }

    /// Applies an announcement from `slotInstanceNew`, `slotInstanceUpdated`
    /// or `slotInstanceGone` and notifies the handlers.
    pub(crate) fn on_announcement(&self, event: InstanceEvent, peer: &str, info: &Hash) {
        if peer == self.instance_id {
            return;
        }
        let tracking = self.is_tracking();
        match event {
            InstanceEvent::New | InstanceEvent::Updated if tracking => {
                let tracked = TrackedInstance {
                    info: info.clone(),
                    deadline: self.deadline_from_info(info),
                };
                self.topology.insert(peer.to_string(), tracked);
            }
            InstanceEvent::Gone if tracking => {
                if self.topology.remove(peer).is_none() {
                    trace!(instance_id = %self.instance_id, %peer, "Gone instance was not tracked");
                    return;
                }
            }
            _ => {}
        }
        info!(instance_id = %self.instance_id, %peer, ?event, "Instance announcement");
        self.fire(event, peer, info);
    }
}
