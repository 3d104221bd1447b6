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

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use mti::prelude::*;
use parking_lot::{Mutex, RwLock};
use slotwire_core::Hash;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace};

use crate::common::{InstanceHandler, Slot, SlotCallGuard, SlotInvoker, SlotwireConfig};
use crate::message::{Args, MessageHeader, Signal, SignalSlotError, SubscriberId, MAX_ARITY};
use crate::signal_slotable::connections::Connections;
use crate::signal_slotable::InstanceState;
use crate::traits::{Broker, DeliveryHandler};

/// Completes one outstanding request.
pub(crate) type ReplySender = oneshot::Sender<Result<Args, SignalSlotError>>;

/// A peer known from announcements or heartbeats.
#[derive(Debug, Clone)]
pub(crate) struct TrackedInstance {
    pub(crate) info: Hash,
    pub(crate) deadline: Instant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum InstanceEvent {
    New,
    Updated,
    Gone,
}

#[derive(Default)]
pub(crate) struct InstanceHandlers {
    new: RwLock<Vec<InstanceHandler>>,
    updated: RwLock<Vec<InstanceHandler>>,
    gone: RwLock<Vec<InstanceHandler>>,
}

impl InstanceHandlers {
    fn list(&self, event: InstanceEvent) -> &RwLock<Vec<InstanceHandler>> {
        match event {
            InstanceEvent::New => &self.new,
            InstanceEvent::Updated => &self.updated,
            InstanceEvent::Gone => &self.gone,
        }
    }

    pub(crate) fn add(&self, event: InstanceEvent, handler: InstanceHandler) {
        self.list(event).write().push(handler);
    }

    pub(crate) fn snapshot(&self, event: InstanceEvent) -> Vec<InstanceHandler> {
        self.list(event).read().clone()
    }
}

/// Shared state of one `SignalSlotable`.
///
/// Every table is guarded on its own and locks are only held for a lookup or
/// mutation, never while a user callback runs.
pub(crate) struct Inner {
    pub(crate) instance_id: String,
    pub(crate) config: SlotwireConfig,
    pub(crate) broker: Arc<dyn Broker>,
    pub(crate) subscriber_id: SubscriberId,
    pub(crate) state: Mutex<InstanceState>,
    pub(crate) slots: DashMap<String, Arc<Slot>>,
    pub(crate) signals: DashMap<String, Signal>,
    pub(crate) connections: Connections,
    /// Outstanding requests keyed by correlation id.
    pub(crate) pending: DashMap<String, ReplySender>,
    pub(crate) instance_info: RwLock<Hash>,
    pub(crate) topology: DashMap<String, TrackedInstance>,
    /// Open discovery rounds; every `slotPingAnswer` lands in each of them.
    pub(crate) discovery: DashMap<String, Hash>,
    pub(crate) handlers: InstanceHandlers,
    pub(crate) guard: RwLock<Option<SlotCallGuard>>,
    pub(crate) tracking: AtomicBool,
    /// Distinguishes this instance's own uniqueness ping; never zero.
    pub(crate) ping_token: u32,
    pub(crate) cancellation_token: CancellationToken,
    pub(crate) tracker: TaskTracker,
    pub(crate) runtime: Mutex<Option<Handle>>,
    pub(crate) delivery: Mutex<Option<DeliveryHandler>>,
}

impl Inner {
    pub(crate) fn new(
        instance_id: String,
        config: SlotwireConfig,
        broker: Arc<dyn Broker>,
        instance_info: Hash,
    ) -> Self {
        let tracking = config.heartbeat.track_instances;
        Self {
            // Distinct per instance: two instances may claim the same id.
            subscriber_id: SubscriberId::new("subscriber".create_type_id::<V7>().to_string()),
            instance_id,
            config,
            broker,
            state: Mutex::new(InstanceState::Created),
            slots: DashMap::new(),
            signals: DashMap::new(),
            connections: Connections::default(),
            pending: DashMap::new(),
            instance_info: RwLock::new(instance_info),
            topology: DashMap::new(),
            discovery: DashMap::new(),
            handlers: InstanceHandlers::default(),
            guard: RwLock::new(None),
            tracking: AtomicBool::new(tracking),
            ping_token: rand::random_range(1..=u32::MAX),
            cancellation_token: CancellationToken::new(),
            tracker: TaskTracker::new(),
            runtime: Mutex::new(None),
            delivery: Mutex::new(None),
        }
    }

    pub(crate) fn state(&self) -> InstanceState {
        *self.state.lock()
    }

    pub(crate) fn set_state(&self, state: InstanceState) {
        trace!(instance_id = %self.instance_id, %state, "State change");
        *self.state.lock() = state;
    }

    /// Moves from `from` to `to`, failing when the instance is elsewhere.
    pub(crate) fn transition(&self, from: InstanceState, to: InstanceState) -> Result<(), SignalSlotError> {
        let mut state = self.state.lock();
        if *state != from {
            return Err(SignalSlotError::InvalidState {
                instance_id: self.instance_id.clone(),
                state: *state,
                expected: from,
            });
        }
        *state = to;
        Ok(())
    }

    pub(crate) fn ensure_running(&self) -> Result<(), SignalSlotError> {
        let state = self.state();
        if state == InstanceState::Running {
            Ok(())
        } else {
            Err(SignalSlotError::InvalidState {
                instance_id: self.instance_id.clone(),
                state,
                expected: InstanceState::Running,
            })
        }
    }

    pub(crate) fn is_tracking(&self) -> bool {
        self.tracking.load(Ordering::SeqCst)
    }

    pub(crate) fn instance_info(&self) -> Hash {
        self.instance_info.read().clone()
    }

    /// Adds an overload to the slot `name`, creating the slot on first use.
    pub(crate) fn add_slot(&self, name: &str, arity: usize, invoker: SlotInvoker) -> Result<(), SignalSlotError> {
        if arity > MAX_ARITY {
            return Err(SignalSlotError::TooManyArguments(arity));
        }
        let slot = self
            .slots
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Slot::new(name)))
            .clone();
        slot.add_overload(arity, invoker)?;
        debug!(instance_id = %self.instance_id, slot = name, arity, "Slot registered");
        Ok(())
    }

    pub(crate) fn add_signal(&self, signal: Signal) -> Result<(), SignalSlotError> {
        match self.signals.entry(signal.name().to_string()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                Err(SignalSlotError::SignalAlreadyRegistered(entry.key().clone()))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                debug!(instance_id = %self.instance_id, signal = signal.name(), arity = signal.arity(), "Signal registered");
                entry.insert(signal);
                Ok(())
            }
        }
    }

    pub(crate) fn slot_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub(crate) fn signal_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.signals.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Header for calls, requests, replies and heartbeats.
    pub(crate) fn system_header(&self, function: &str) -> MessageHeader {
        MessageHeader::new(
            &self.instance_id,
            function,
            self.config.defaults.system_priority,
            self.config.defaults.system_ttl_ms,
        )
    }

    /// An empty target addresses this instance.
    pub(crate) fn resolve<'a>(&'a self, target: &'a str) -> &'a str {
        if target.is_empty() {
            &self.instance_id
        } else {
            target
        }
    }

    /// The runtime this instance was started on, or the ambient one.
    pub(crate) fn runtime_handle(&self) -> Result<Handle, SignalSlotError> {
        self.runtime
            .lock()
            .clone()
            .or_else(|| Handle::try_current().ok())
            .ok_or_else(|| SignalSlotError::Stopped(self.instance_id.clone()))
    }

    /// Runs `future` as a tracked task so that `stop` can wait for it.
    pub(crate) fn spawn<F>(&self, future: F) -> Result<(), SignalSlotError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = self.runtime_handle()?;
        self.tracker.spawn_on(future, &handle);
        Ok(())
    }

    /// Opens a discovery round that collects answers until it is finished
    /// or dropped.
    pub(crate) fn open_discovery(&self) -> DiscoveryRound<'_> {
        let round_id = "discovery".create_type_id::<V7>().to_string();
        self.discovery.insert(round_id.clone(), Hash::new());
        DiscoveryRound { inner: self, round_id }
    }

    /// Records a ping answer in every open discovery round.
    pub(crate) fn collect_answer(&self, peer: &str, info: &Hash) {
        for mut round in self.discovery.iter_mut() {
            round.value_mut().insert(peer, info.clone());
        }
    }

    /// Notifies the registered handlers outside of every lock.
    pub(crate) fn fire(&self, event: InstanceEvent, instance_id: &str, info: &Hash) {
        let handlers = self.handlers.snapshot(event);
        trace!(instance_id = %self.instance_id, peer = instance_id, ?event, count = handlers.len(), "Instance event");
        for handler in handlers {
            handler(instance_id, info);
        }
    }
}

/// One caller's collection of ping answers.
pub(crate) struct DiscoveryRound<'a> {
    inner: &'a Inner,
    round_id: String,
}

impl DiscoveryRound<'_> {
    pub(crate) fn finish(self) -> Hash {
        self.inner
            .discovery
            .remove(&self.round_id)
            .map(|(_, found)| found)
            .unwrap_or_default()
    }
}

impl Drop for DiscoveryRound<'_> {
    fn drop(&mut self) {
        self.inner.discovery.remove(&self.round_id);
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}
