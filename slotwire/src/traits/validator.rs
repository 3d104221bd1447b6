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

use std::time::SystemTime;

use derive_new::new;
use slotwire_core::Hash;

/// Result of validating a configuration against a schema.
#[derive(new, Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub ok: bool,
    pub reason: String,
    /// The configuration as accepted by the validator, possibly completed
    /// with defaults.
    pub validated: Hash,
}

impl ValidationOutcome {
    pub fn accepted(validated: Hash) -> Self {
        Self::new(true, String::new(), validated)
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::new(false, reason.into(), Hash::new())
    }
}

/// Schema-driven validation of externally supplied configuration.
///
/// The runtime never interprets schemas; it only passes configuration
/// hashes through this boundary before accepting them.
pub trait Validator: Send + Sync {
    type Schema: Send + Sync;

    fn validate(
        &self,
        schema: &Self::Schema,
        configuration: &Hash,
        timestamp: Option<SystemTime>,
    ) -> ValidationOutcome;
}
