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

pub use args::{ArgMismatch, Args, FromArgs, IntoArgs, MAX_ARITY};
pub use broker_message::{BrokerMessage, SubscriberId, Topic};
pub use header::{functions, keys, MessageHeader};
pub use message_error::{SignalSlotError, SlotError};
pub use signal::Signal;
pub use slot_context::SlotContext;

pub(crate) use header::{host_name, now_ms};
pub(crate) use slot_context::ReplyRoute;

mod args;
mod broker_message;
mod header;
mod message_error;
mod signal;
mod slot_context;
