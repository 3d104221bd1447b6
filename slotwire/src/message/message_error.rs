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

use std::time::Duration;

use slotwire_core::HashError;
use thiserror::Error;

use crate::signal_slotable::InstanceState;
use crate::traits::BrokerError;

/// Errors raised by the signal/slot runtime.
///
/// Dispatch failures (`SlotNotFound`, `ArityMismatch`, `Callback`) normally
/// happen on the callee and reach the caller as `Remote`; `Timeout` and
/// `MalformedReply` are detected on the caller side.
#[derive(Debug, Clone, Error)]
pub enum SignalSlotError {
    #[error(transparent)]
    Hash(#[from] HashError),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("slot '{slot}' not found on instance '{instance_id}'")]
    SlotNotFound { instance_id: String, slot: String },

    #[error("signal '{0}' is not registered")]
    SignalNotFound(String),

    #[error("'{name}' cannot take {given} argument(s); registered arities {registered:?}")]
    ArityMismatch {
        name: String,
        given: usize,
        registered: Vec<usize>,
    },

    #[error("slot '{slot}' already has a {arity}-argument handler")]
    SlotAlreadyRegistered { slot: String, arity: usize },

    #[error("signal '{0}' is already registered")]
    SignalAlreadyRegistered(String),

    /// A slot callback panicked.
    #[error("slot '{slot}' failed: {message}")]
    Callback { slot: String, message: String },

    /// The callee reported an error for a request.
    #[error("remote error from '{instance_id}': {message}")]
    Remote {
        message: String,
        details: Option<String>,
        instance_id: String,
    },

    #[error("no reply from '{instance_id}' for '{slot}' within {timeout:?}")]
    Timeout {
        instance_id: String,
        slot: String,
        timeout: Duration,
    },

    #[error("malformed reply: {0}")]
    MalformedReply(String),

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("{0} arguments given, at most 4 are supported")]
    TooManyArguments(usize),

    #[error("instance '{instance_id}' is {state}, expected {expected}")]
    InvalidState {
        instance_id: String,
        state: InstanceState,
        expected: InstanceState,
    },

    #[error("invalid instance id '{id}': {reason}")]
    InvalidInstanceId { id: String, reason: String },

    #[error("another instance with id '{0}' is already running")]
    DuplicateInstanceId(String),

    #[error("'{0}' cannot be the target of a request")]
    InvalidTarget(String),

    #[error("the reply of slot '{0}' has already been taken over")]
    ReplyAlreadyTaken(String),

    /// The callee's inbox had no room for the request.
    #[error("instance '{0}' is too busy to accept the request")]
    InboxFull(String),

    #[error("instance '{0}' stopped before the reply arrived")]
    Stopped(String),

    #[error("configuration rejected: {0}")]
    ValidationFailed(String),
}

impl SignalSlotError {
    /// Details attached by the remote side, if any.
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Remote { details, .. } => details.as_deref(),
            _ => None,
        }
    }

    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// The error a slot callback returns; travels back to a requester as an
/// error-flagged reply carrying `message` and optional `details`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SlotError {
    message: String,
    details: Option<String>,
}

impl SlotError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }
}

impl From<HashError> for SlotError {
    fn from(error: HashError) -> Self {
        Self::new(error.to_string())
    }
}

impl From<SignalSlotError> for SlotError {
    fn from(error: SignalSlotError) -> Self {
        match error {
            SignalSlotError::Remote {
                message, details, ..
            } => Self { message, details },
            other => Self::new(other.to_string()),
        }
    }
}

impl From<String> for SlotError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for SlotError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
