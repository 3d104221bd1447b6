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

#![forbid(unsafe_code)]

//! # Slotwire
//!
//! A broker-mediated signal/slot runtime. Instances expose named slots,
//! publish named signals and talk to each other through an injected
//! publish/subscribe [`Broker`](prelude::Broker). Every header, payload and
//! configuration is a [`Hash`](prelude::Hash) from `slotwire-core`.
//!
//! ## Key Concepts
//!
//! - **Instances (`SignalSlotable`)**: own a unique id, the slot and signal
//!   registries, the connection table, the pending-request table and the
//!   background tasks for dispatch and heartbeats.
//! - **Slots**: named inbound endpoints with one callback per arity (0 to 4
//!   positional arguments). A callback's error or panic becomes an error reply.
//! - **Signals**: named outbound events fanned out to every connected slot.
//! - **Requests (`Requestor`, `AsyncReply`)**: correlated two-way calls,
//!   awaited with a timeout or completed through continuations; a callee may
//!   defer its reply.
//! - **Tracking**: heartbeats and announcements maintain a topology of peers
//!   and raise new/updated/gone notifications.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use slotwire::prelude::*;
//!
//! let broker: Arc<dyn Broker> = Arc::new(InMemoryBroker::new());
//! let server = SignalSlotable::new("server", broker.clone())?;
//! server.register_slot("slotAdd", |_, (a, b): (i32, i32)| Ok((a + b,)))?;
//! server.start().await?;
//!
//! let client = SignalSlotable::new("client", broker)?;
//! client.start().await?;
//! let (sum,) = client
//!     .request("server", "slotAdd", (1, 2))?
//!     .wait_for_reply::<(i32,)>(Duration::from_secs(1))
//!     .await?;
//! assert_eq!(sum, 3);
//! ```

/// Shared runtime components, configuration and the in-memory broker.
pub(crate) mod common;

/// Defines wire messages, headers, arguments and errors.
pub(crate) mod message;

/// Defines the instance type and its internals.
pub(crate) mod signal_slotable;

/// Defines the broker and validator seams.
pub(crate) mod traits;

/// Runtime configuration.
pub mod config {
    pub use crate::common::config::{
        BehaviorConfig, DefaultsConfig, HeartbeatConfig, LimitsConfig, SlotwireConfig, TimeoutConfig, CONFIG,
    };
}

/// Wire-level names and helpers for custom broker implementations.
pub mod wire {
    pub use crate::message::{functions, keys, BrokerMessage, MessageHeader, SubscriberId, Topic, MAX_ARITY};
}

/// A prelude module for conveniently importing the most commonly used items.
///
/// # Re-exports
///
/// ## Data model (from `slotwire-core`)
/// *   [`slotwire_core::prelude`]: `Hash`, `Node`, `Value`, `MergePolicy` and
///     the `hash!` macro.
///
/// ## Core Types
/// *   [`crate::signal_slotable::SignalSlotable`]: a participant of the system.
/// *   [`crate::signal_slotable::SignalSlotableBuilder`]: configures an instance.
/// *   [`crate::common::Requestor`]: caller side of a request.
/// *   [`crate::common::AsyncReply`]: deferred reply token.
/// *   [`crate::message::SlotContext`]: what a slot callback knows about its call.
/// *   [`crate::message::Args`]: positional arguments.
/// *   [`crate::common::InMemoryBroker`]: process-local broker.
/// *   [`crate::common::ConfigurationGate`]: validating configuration holder.
///
/// ## Errors
/// *   [`crate::message::SignalSlotError`], [`crate::message::SlotError`],
///     [`crate::traits::BrokerError`] and `HashError`.
///
/// ## Traits
/// *   [`crate::traits::Broker`], [`crate::traits::Validator`],
///     [`crate::message::IntoArgs`], [`crate::message::FromArgs`].
pub mod prelude {
    pub use slotwire_core::prelude::*;

    pub use crate::common::config::SlotwireConfig;
    pub use crate::common::{
        AsyncReply, ConfigurationGate, InMemoryBroker, InstanceHandler, Requestor, SlotCallGuard,
    };
    pub use crate::message::{
        ArgMismatch, Args, FromArgs, IntoArgs, Signal, SignalSlotError, SlotContext, SlotError,
    };
    pub use crate::signal_slotable::{InstanceState, SignalSlotable, SignalSlotableBuilder};
    pub use crate::traits::{Broker, BrokerError, DeliveryHandler, ValidationOutcome, Validator};
}
