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

use serde::{Deserialize, Serialize};

use crate::error::HashError;
use crate::tree::convert::ValueAs;
use crate::tree::ordered_map::{Keyed, OrderedMap};
use crate::tree::{HashValue, Value, ValueType};

/// A single named attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    name: String,
    value: Value,
}

impl Attribute {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn value(&self) -> &Value {
        &self.value
    }
}

impl Keyed for Attribute {
    fn key(&self) -> &str {
        &self.name
    }
}

/// Ordered name-to-value metadata attached to exactly one [`Node`](crate::Node).
///
/// Attributes are never inherited by child nodes and never shared between
/// nodes; copying a node copies its attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes {
    entries: OrderedMap<Attribute>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains(name)
    }

    /// Sets an attribute, keeping its position when it already exists.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.entries.insert(Attribute {
            name: name.to_string(),
            value: value.into(),
        });
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.entries.get(name).map(|attr| &attr.value)
    }

    pub fn get<T: HashValue>(&self, name: &str) -> Result<&T, HashError> {
        let value = self
            .value(name)
            .ok_or_else(|| HashError::not_found(name))?;
        T::from_ref(value).ok_or_else(|| HashError::TypeMismatch {
            path: name.to_string(),
            expected: T::VALUE_TYPE,
            found: value.value_type(),
        })
    }

    pub fn get_as<T: ValueAs>(&self, name: &str) -> Result<T, HashError> {
        let value = self
            .value(name)
            .ok_or_else(|| HashError::not_found(name))?;
        T::value_as(value).map_err(|e| e.at(name))
    }

    pub fn value_type(&self, name: &str) -> Option<ValueType> {
        self.value(name).map(Value::value_type)
    }

    pub fn erase(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|attr| (attr.name.as_str(), &attr.value))
    }

    /// Copies every attribute of `other` into `self`, overwriting same-named ones.
    pub fn merge(&mut self, other: &Self) {
        for attr in other.entries.iter() {
            self.entries.insert(attr.clone());
        }
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Self::new();
        for (name, value) in iter {
            attrs.set(name.as_ref(), value);
        }
        attrs
    }
}
