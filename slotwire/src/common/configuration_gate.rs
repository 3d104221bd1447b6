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

use parking_lot::RwLock;
use slotwire_core::{Hash, MergePolicy};
use tracing::{debug, warn};

use crate::message::SignalSlotError;
use crate::traits::Validator;

/// Holds the accepted configuration of a device-like consumer and admits
/// changes only through a [`Validator`].
pub struct ConfigurationGate<V: Validator> {
    validator: V,
    schema: V::Schema,
    current: RwLock<Hash>,
}

impl<V: Validator> ConfigurationGate<V> {
    pub fn new(validator: V, schema: V::Schema, initial: Hash) -> Self {
        Self {
            validator,
            schema,
            current: RwLock::new(initial),
        }
    }

    /// Snapshot of the accepted configuration.
    pub fn current(&self) -> Hash {
        self.current.read().clone()
    }

    pub fn schema(&self) -> &V::Schema {
        &self.schema
    }

    /// Validates `incoming` and merges the validated result into the current
    /// configuration, returning the merged snapshot.
    ///
    /// A rejected configuration leaves the current one untouched.
    pub fn apply(&self, incoming: &Hash) -> Result<Hash, SignalSlotError> {
        let outcome = self
            .validator
            .validate(&self.schema, incoming, Some(std::time::SystemTime::now()));
        if !outcome.ok {
            warn!(reason = %outcome.reason, "Configuration rejected");
            return Err(SignalSlotError::ValidationFailed(outcome.reason));
        }
        let mut current = self.current.write();
        current.merge(&outcome.validated, MergePolicy::default());
        debug!(keys = outcome.validated.len(), "Configuration accepted");
        Ok(current.clone())
    }
}
