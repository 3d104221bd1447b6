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

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use slotwire_core::{Hash, MergePolicy};
use static_assertions::assert_impl_all;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::DropGuard;
use tracing::{error, info, instrument, warn};

use crate::common::{raw_invoker, typed_invoker, Requestor, SlotwireConfig};
use crate::message::{Args, FromArgs, IntoArgs, Signal, SignalSlotError, SlotContext, SlotError, Topic};
use crate::traits::Broker;

pub use builder::SignalSlotableBuilder;
pub(crate) use inner::Inner;
pub use state::InstanceState;

use builtin::{
    SLOT_CONNECT_TO_SIGNAL, SLOT_DISCONNECT_FROM_SIGNAL, SLOT_GET_AVAILABLE_FUNCTIONS, SLOT_INSTANCE_GONE,
    SLOT_INSTANCE_NEW, SLOT_INSTANCE_UPDATED, SLOT_PING,
};
use inner::InstanceEvent;

mod builder;
mod builtin;
mod connections;
mod dispatch;
mod heartbeat;
mod inner;
mod outbound;
mod state;

/// One participant of the signal/slot system.
///
/// An instance owns a unique id, its registered slots and signals, the
/// routing table of connections to remote signals, the table of outstanding
/// requests and the background tasks that dispatch inbound messages and emit
/// heartbeats. Clones are handles onto the same instance; when the last handle
/// obtained from the builder is dropped, the background tasks stop.
///
/// Slot callbacks run on the dispatch task, one message at a time. They must
/// not block it: a slot that needs another instance's answer takes an
/// [`AsyncReply`](crate::prelude::AsyncReply) and completes it from a
/// continuation. Callbacks reach their own instance through
/// [`SlotContext::instance`]; a handle captured by a callback keeps the
/// instance alive until it is stopped explicitly.
#[derive(Clone)]
pub struct SignalSlotable {
    inner: Arc<Inner>,
    /// Cancels the background tasks when the last owning handle goes away.
    _guard: Option<Arc<DropGuard>>,
}

impl fmt::Debug for SignalSlotable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalSlotable")
            .field("instance_id", &self.inner.instance_id)
            .field("state", &self.inner.state())
            .finish_non_exhaustive()
    }
}

impl SignalSlotable {
    pub fn builder(instance_id: impl Into<String>, broker: Arc<dyn Broker>) -> SignalSlotableBuilder {
        SignalSlotableBuilder::new(instance_id.into(), broker)
    }

    /// An instance with the global configuration.
    pub fn new(instance_id: impl Into<String>, broker: Arc<dyn Broker>) -> Result<Self, SignalSlotError> {
        Self::builder(instance_id, broker).build()
    }

    pub(crate) fn from_owned(inner: Arc<Inner>) -> Self {
        let guard = Arc::new(inner.cancellation_token.clone().drop_guard());
        Self {
            inner,
            _guard: Some(guard),
        }
    }

    /// A handle that does not keep the background tasks alive.
    pub(crate) fn from_inner(inner: Arc<Inner>) -> Self {
        Self { inner, _guard: None }
    }

    /// Derives an instance id unique within this process from `prefix`.
    pub fn generate_instance_id(prefix: &str) -> String {
        builder::generate_instance_id(prefix)
    }

    pub fn instance_id(&self) -> &str {
        &self.inner.instance_id
    }

    pub fn state(&self) -> InstanceState {
        self.inner.state()
    }

    pub fn config(&self) -> &SlotwireConfig {
        &self.inner.config
    }

    /// The info announced to peers.
    pub fn instance_info(&self) -> Hash {
        self.inner.instance_info()
    }

    pub fn is_tracking(&self) -> bool {
        self.inner.is_tracking()
    }

    /// Subscribes to the instance's topics, starts dispatching and announces
    /// the instance.
    ///
    /// Unless disabled in the configuration, an instance already running under
    /// the same id makes `start` fail with
    /// [`SignalSlotError::DuplicateInstanceId`]; the instance is then stopped.
    #[instrument(skip(self), fields(instance_id = %self.inner.instance_id))]
    pub async fn start(&self) -> Result<(), SignalSlotError> {
        let inner = &self.inner;
        inner.transition(InstanceState::Created, InstanceState::Starting)?;
        *inner.runtime.lock() = Some(Handle::current());

        if let Err(e) = self.connect_broker().await {
            error!(error = %e, "Start failed");
            self.abort_start();
            return Err(e);
        }
        inner.set_state(InstanceState::Running);
        info!("Instance running");

        if inner.config.behavior.announce_instance {
            let announcement = (inner.instance_id.clone(), inner.instance_info()).into_args();
            if let Err(e) = inner.send_call("*", SLOT_INSTANCE_NEW, announcement) {
                warn!(error = %e, "Failed to announce instance");
            }
        }
        inner.spawn_heartbeats()?;
        if inner.is_tracking() {
            inner.spawn_tracking()?;
            // Peers answer through slotPingAnswer and enter the topology.
            let ping = (inner.instance_id.clone(), 0_u32, true).into_args();
            if let Err(e) = inner.send_call("*", SLOT_PING, ping) {
                warn!(error = %e, "Failed to discover instances");
            }
        }
        Ok(())
    }

    async fn connect_broker(&self) -> Result<(), SignalSlotError> {
        let inner = &self.inner;
        let (sender, receiver) = mpsc::channel(inner.config.limits.inbox_capacity.max(1));
        let handler = inner.delivery_handler(sender);
        *inner.delivery.lock() = Some(handler.clone());

        let mut topics = vec![Topic::instance(&inner.instance_id), Topic::global()];
        if inner.is_tracking() {
            topics.push(Topic::heartbeats());
        }
        for topic in &topics {
            inner.broker.subscribe(topic, &inner.subscriber_id, handler.clone())?;
        }
        inner.spawn_dispatch(receiver)?;

        if inner.config.behavior.check_instance_id_unique {
            self.check_unique().await?;
        }
        Ok(())
    }

    /// Pings the own id; an answer means another instance holds it.
    async fn check_unique(&self) -> Result<(), SignalSlotError> {
        let inner = &self.inner;
        let ping = (inner.instance_id.clone(), inner.ping_token, false).into_args();
        let timeout = Duration::from_millis(inner.config.timeouts.instance_ping_ms);
        let answer = inner
            .send_request(&inner.instance_id, SLOT_PING, ping)?
            .wait_for_reply::<(String, Hash)>(timeout)
            .await;
        match answer {
            Err(e) if e.is_timeout() => Ok(()),
            Ok((_, info)) => {
                let host = info.get_as::<String>("host").unwrap_or_default();
                error!(%host, "Another instance with this id is running");
                Err(SignalSlotError::DuplicateInstanceId(inner.instance_id.clone()))
            }
            // Somebody answered, even if only with an error.
            Err(SignalSlotError::Remote { .. }) => Err(SignalSlotError::DuplicateInstanceId(inner.instance_id.clone())),
            Err(e) => Err(e),
        }
    }

    fn abort_start(&self) {
        let inner = &self.inner;
        inner.cancellation_token.cancel();
        inner.tracker.close();
        if let Err(e) = inner.broker.unsubscribe_all(&inner.subscriber_id) {
            warn!(instance_id = %inner.instance_id, error = %e, "Failed to unsubscribe");
        }
        *inner.delivery.lock() = None;
        inner.set_state(InstanceState::Stopped);
    }

    /// Announces the departure, fails outstanding requests with
    /// [`SignalSlotError::Stopped`] and waits for the background tasks.
    #[instrument(skip(self), fields(instance_id = %self.inner.instance_id))]
    pub async fn stop(&self) -> Result<(), SignalSlotError> {
        let inner = &self.inner;
        inner.transition(InstanceState::Running, InstanceState::Stopped)?;
        if inner.config.behavior.announce_instance {
            let announcement = (inner.instance_id.clone(), inner.instance_info()).into_args();
            if let Err(e) = inner.send_call("*", SLOT_INSTANCE_GONE, announcement) {
                warn!(error = %e, "Failed to announce departure");
            }
        }
        inner.pending.clear();
        inner.cancellation_token.cancel();
        inner.tracker.close();
        if tokio::time::timeout(inner.config.shutdown_timeout(), inner.tracker.wait())
            .await
            .is_err()
        {
            warn!(tasks = inner.tracker.len(), "Background tasks did not finish in time");
        }
        inner.broker.unsubscribe_all(&inner.subscriber_id)?;
        *inner.delivery.lock() = None;
        inner.connections.clear();
        inner.topology.clear();
        info!("Instance stopped");
        Ok(())
    }

    /// Enables topology tracking; only possible before `start`.
    pub fn track_all_instances(&self) -> Result<(), SignalSlotError> {
        let state = self.inner.state();
        if state != InstanceState::Created {
            return Err(SignalSlotError::InvalidState {
                instance_id: self.inner.instance_id.clone(),
                state,
                expected: InstanceState::Created,
            });
        }
        self.inner.tracking.store(true, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    /// Registers a slot whose arity and argument types follow the tuple `A`.
    ///
    /// Registering the same name with another arity adds an overload.
    ///
    /// ```rust,ignore
    /// instance.register_slot("slotAdd", |_, (a, b): (i32, i32)| Ok((a + b,)))?;
    /// ```
    pub fn register_slot<A, R, F>(&self, name: &str, callback: F) -> Result<(), SignalSlotError>
    where
        A: FromArgs + 'static,
        R: IntoArgs,
        F: Fn(&SlotContext, A) -> Result<R, SlotError> + Send + Sync + 'static,
    {
        self.inner.add_slot(name, A::ARITY, typed_invoker(callback))
    }

    /// Registers a slot overload receiving exactly `arity` untyped values.
    pub fn register_slot_with_arity<R, F>(&self, name: &str, arity: usize, callback: F) -> Result<(), SignalSlotError>
    where
        R: IntoArgs,
        F: Fn(&SlotContext, Args) -> Result<R, SlotError> + Send + Sync + 'static,
    {
        self.inner.add_slot(name, arity, raw_invoker(callback))
    }

    pub fn has_slot(&self, name: &str) -> bool {
        self.inner.slots.contains_key(name)
    }

    /// Registers a signal with the configured default priority and lifetime.
    pub fn register_signal(&self, name: &str, arity: usize) -> Result<(), SignalSlotError> {
        let defaults = &self.inner.config.defaults;
        self.register_signal_with(
            name,
            arity,
            defaults.signal_priority,
            Duration::from_millis(defaults.signal_ttl_ms),
        )
    }

    /// Registers a signal; a zero `time_to_live` never expires.
    pub fn register_signal_with(
        &self,
        name: &str,
        arity: usize,
        priority: u8,
        time_to_live: Duration,
    ) -> Result<(), SignalSlotError> {
        if arity > crate::message::MAX_ARITY {
            return Err(SignalSlotError::TooManyArguments(arity));
        }
        let ttl_ms = u64::try_from(time_to_live.as_millis()).unwrap_or(u64::MAX);
        self.inner
            .add_signal(Signal::new(&self.inner.instance_id, name, arity, priority, ttl_ms))
    }

    pub fn has_signal(&self, name: &str) -> bool {
        self.inner.signals.contains_key(name)
    }

    /// Publishes `signal` to every connected slot.
    pub fn emit(&self, signal: &str, args: impl IntoArgs) -> Result<(), SignalSlotError> {
        self.inner.ensure_running()?;
        self.inner.emit(signal, args.into_args())
    }

    /// Routes `signal` of `signal_instance_id` to `slot` of `slot_instance_id`.
    ///
    /// When the slot lives on another instance, that instance is asked to
    /// record the connection and the call waits for its acknowledgement. An
    /// empty id stands for this instance.
    #[instrument(skip(self), fields(instance_id = %self.inner.instance_id))]
    pub async fn connect(
        &self,
        signal_instance_id: &str,
        signal: &str,
        slot_instance_id: &str,
        slot: &str,
    ) -> Result<(), SignalSlotError> {
        self.inner.ensure_running()?;
        let signal_instance_id = self.inner.resolve(signal_instance_id).to_string();
        let slot_instance_id = self.inner.resolve(slot_instance_id).to_string();
        let connected = if slot_instance_id == self.inner.instance_id {
            self.inner.connect_local(&signal_instance_id, signal, slot)?
        } else {
            let args = (signal_instance_id, signal, slot).into_args();
            self.inner
                .send_request(&slot_instance_id, SLOT_CONNECT_TO_SIGNAL, args)?
                .wait_for_reply::<(bool,)>(Duration::from_millis(self.inner.config.timeouts.connect_ms))
                .await?
                .0
        };
        if connected {
            Ok(())
        } else {
            Err(SignalSlotError::SlotNotFound {
                instance_id: slot_instance_id,
                slot: slot.to_string(),
            })
        }
    }

    /// Removes a connection; `false` when there was none.
    #[instrument(skip(self), fields(instance_id = %self.inner.instance_id))]
    pub async fn disconnect(
        &self,
        signal_instance_id: &str,
        signal: &str,
        slot_instance_id: &str,
        slot: &str,
    ) -> Result<bool, SignalSlotError> {
        self.inner.ensure_running()?;
        let signal_instance_id = self.inner.resolve(signal_instance_id).to_string();
        let slot_instance_id = self.inner.resolve(slot_instance_id).to_string();
        if slot_instance_id == self.inner.instance_id {
            return self.inner.disconnect_local(&signal_instance_id, signal, slot);
        }
        let args = (signal_instance_id, signal, slot).into_args();
        let (disconnected,) = self
            .inner
            .send_request(&slot_instance_id, SLOT_DISCONNECT_FROM_SIGNAL, args)?
            .wait_for_reply::<(bool,)>(Duration::from_millis(self.inner.config.timeouts.connect_ms))
            .await?;
        Ok(disconnected)
    }

    /// One-way invocation of `slot` on `instance_id`; `*` reaches every
    /// instance that has the slot.
    pub fn call(&self, instance_id: &str, slot: &str, args: impl IntoArgs) -> Result<(), SignalSlotError> {
        self.inner.ensure_running()?;
        self.inner.send_call(instance_id, slot, args.into_args())
    }

    /// Sends a correlated request; the returned [`Requestor`] yields the reply.
    pub fn request(&self, instance_id: &str, slot: &str, args: impl IntoArgs) -> Result<Requestor, SignalSlotError> {
        self.inner.ensure_running()?;
        self.inner.send_request(instance_id, slot, args.into_args())
    }

    /// Sends a request whose reply arrives as a call to `reply_slot` on
    /// `reply_instance_id`.
    pub fn request_no_wait(
        &self,
        instance_id: &str,
        slot: &str,
        reply_instance_id: &str,
        reply_slot: &str,
        args: impl IntoArgs,
    ) -> Result<(), SignalSlotError> {
        self.inner.ensure_running()?;
        self.inner
            .send_request_no_wait(instance_id, slot, reply_instance_id, reply_slot, args.into_args())
    }

    /// Merges `update` into the instance info and, when running, tells the
    /// other instances.
    pub fn update_instance_info(&self, update: &Hash) -> Result<(), SignalSlotError> {
        let info = {
            let mut info = self.inner.instance_info.write();
            info.merge(update, MergePolicy::default());
            info.clone()
        };
        if self.inner.state() == InstanceState::Running {
            let announcement = (self.inner.instance_id.clone(), info).into_args();
            self.inner.send_call("*", SLOT_INSTANCE_UPDATED, announcement)?;
        }
        Ok(())
    }

    pub fn on_instance_new(&self, handler: impl Fn(&str, &Hash) + Send + Sync + 'static) {
        self.inner.handlers.add(InstanceEvent::New, Arc::new(handler));
    }

    pub fn on_instance_updated(&self, handler: impl Fn(&str, &Hash) + Send + Sync + 'static) {
        self.inner.handlers.add(InstanceEvent::Updated, Arc::new(handler));
    }

    pub fn on_instance_gone(&self, handler: impl Fn(&str, &Hash) + Send + Sync + 'static) {
        self.inner.handlers.add(InstanceEvent::Gone, Arc::new(handler));
    }

    /// Installs a hook run before every inbound slot dispatch with
    /// `(slot, caller_id)`. An error rejects the call and, for requests,
    /// becomes the error reply.
    pub fn set_slot_call_guard(&self, guard: impl Fn(&str, &str) -> Result<(), SlotError> + Send + Sync + 'static) {
        *self.inner.guard.write() = Some(Arc::new(guard));
    }

    pub fn clear_slot_call_guard(&self) {
        *self.inner.guard.write() = None;
    }

    /// Instance id -> instance info of every known instance, this one included.
    ///
    /// A tracking instance answers from its topology. Otherwise every instance
    /// is pinged and the answers arriving within the discovery window are
    /// collected.
    pub async fn get_available_instances(&self) -> Result<Hash, SignalSlotError> {
        let inner = &self.inner;
        inner.ensure_running()?;
        if inner.is_tracking() {
            let mut peers: Vec<(String, Hash)> = inner
                .topology
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().info.clone()))
                .collect();
            peers.sort_by(|a, b| a.0.cmp(&b.0));
            let mut instances = Hash::new();
            instances.insert(&inner.instance_id, inner.instance_info());
            for (instance_id, info) in peers {
                instances.insert(&instance_id, info);
            }
            return Ok(instances);
        }

        let round = inner.open_discovery();
        let ping = (inner.instance_id.clone(), 0_u32, false).into_args();
        inner.send_call("*", SLOT_PING, ping)?;
        tokio::time::sleep(Duration::from_millis(inner.config.timeouts.discovery_ms)).await;
        Ok(round.finish())
    }

    /// Names of the signals registered on `instance_id`.
    pub async fn get_available_signals(&self, instance_id: &str) -> Result<Vec<String>, SignalSlotError> {
        self.available_functions(instance_id, "signals").await
    }

    /// Names of the slots registered on `instance_id`.
    pub async fn get_available_slots(&self, instance_id: &str) -> Result<Vec<String>, SignalSlotError> {
        self.available_functions(instance_id, "slots").await
    }

    async fn available_functions(&self, instance_id: &str, kind: &str) -> Result<Vec<String>, SignalSlotError> {
        let timeout = Duration::from_millis(self.inner.config.timeouts.introspection_ms);
        let (names,) = self
            .request(instance_id, SLOT_GET_AVAILABLE_FUNCTIONS, (kind,))?
            .wait_for_reply::<(Vec<String>,)>(timeout)
            .await?;
        Ok(names)
    }
}

assert_impl_all!(SignalSlotable: Send, Sync);
