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

//! Crate-internal type aliases for stored callbacks.

use std::sync::Arc;

use slotwire_core::{Hash, Value};

use crate::message::{ArgMismatch, Args, SlotContext, SlotError};

/// Handler notified about a peer instance: `(instance_id, instance_info)`.
pub type InstanceHandler = Arc<dyn Fn(&str, &Hash) + Send + Sync>;

/// Hook run before every inbound slot dispatch with `(slot, caller_id)`.
/// Returning an error rejects the call.
pub type SlotCallGuard = Arc<dyn Fn(&str, &str) -> Result<(), SlotError> + Send + Sync>;

/// Outcome of trying one overload of a slot.
pub(crate) enum Invocation {
    /// The arguments matched and the callback ran.
    Done(Result<Args, SlotError>),
    /// The arguments do not fit this overload's parameter types.
    Mismatch(ArgMismatch),
}

/// One overload of a slot, called with exactly its arity in values.
pub(crate) type SlotInvoker = Arc<dyn Fn(&SlotContext, &[Value]) -> Invocation + Send + Sync>;
