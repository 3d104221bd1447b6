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

//! Runtime building blocks shared by the signal/slot machinery.
//!
//! # Key Re-exported Components:
//!
//! *   [`Requestor`]: caller side of a request, awaited or completed through
//!     continuations.
//! *   [`AsyncReply`]: callee side token deferring a slot's reply.
//! *   [`InMemoryBroker`]: process-local [`Broker`](crate::traits::Broker).
//! *   [`ConfigurationGate`]: admits configuration through a validator.
//! *   [`SlotwireConfig`]: runtime configuration loaded from XDG locations.

// --- Public Re-exports ---
pub use async_reply::AsyncReply;
pub use config::SlotwireConfig;
pub use configuration_gate::ConfigurationGate;
pub use in_memory_broker::InMemoryBroker;
pub use requestor::Requestor;
pub use types::*;

// --- Crate-Internal Re-exports ---
pub(crate) use requestor::{unpack, ReplyResult};
pub(crate) use slot::{raw_invoker, typed_invoker, Slot};

// --- Submodules ---

/// Defines callback type aliases.
mod types;

/// Defines the deferred reply token.
mod async_reply;
/// Defines the validating configuration holder.
mod configuration_gate;
/// Defines the process-local broker.
mod in_memory_broker;
/// Defines the caller side of a request.
mod requestor;
/// Defines the slot overload table.
mod slot;
/// Defines the configuration system.
pub mod config;
