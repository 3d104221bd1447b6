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

use derive_new::new;
use slotwire_core::Hash;

/// Name of a broker destination.
///
/// Calls, requests and replies addressed to one instance travel on
/// `instance/<id>`, calls to every instance on `global`, signals on
/// `signal/<instance>/<signal>` and heartbeats on `heartbeats`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic(String);

impl Topic {
    pub fn instance(instance_id: &str) -> Self {
        Self(format!("instance/{instance_id}"))
    }

    pub fn global() -> Self {
        Self("global".to_string())
    }

    pub fn signal(instance_id: &str, signal: &str) -> Self {
        Self(format!("signal/{instance_id}/{signal}"))
    }

    pub fn heartbeats() -> Self {
        Self("heartbeats".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identity under which a consumer registers its delivery handlers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(String);

impl SubscriberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One message on the wire: routing header plus positional body.
#[derive(new, Debug, Clone, PartialEq)]
pub struct BrokerMessage {
    pub topic: Topic,
    pub header: Hash,
    pub body: Hash,
}
