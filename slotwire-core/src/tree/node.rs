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
use crate::tree::ordered_map::Keyed;
use crate::tree::{Attributes, HashValue, Value, ValueType};

/// One entry of a [`Hash`](crate::Hash): a key, a value and the attributes
/// that belong to this node alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    key: String,
    value: Value,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    attributes: Attributes,
}

impl Node {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            attributes: Attributes::new(),
        }
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub const fn value(&self) -> &Value {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    pub fn set_value(&mut self, value: impl Into<Value>) {
        self.value = value.into();
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn value_type(&self) -> ValueType {
        self.value.value_type()
    }

    pub fn is<T: HashValue>(&self) -> bool {
        T::from_ref(&self.value).is_some()
    }

    pub fn get<T: HashValue>(&self) -> Result<&T, HashError> {
        T::from_ref(&self.value).ok_or_else(|| HashError::TypeMismatch {
            path: self.key.clone(),
            expected: T::VALUE_TYPE,
            found: self.value.value_type(),
        })
    }

    pub fn get_as<T: ValueAs>(&self) -> Result<T, HashError> {
        T::value_as(&self.value).map_err(|e| e.at(&self.key))
    }

    pub const fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<Value>) {
        self.attributes.set(name, value);
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut Value, &mut Attributes) {
        (&mut self.value, &mut self.attributes)
    }
}

impl Keyed for Node {
    fn key(&self) -> &str {
        &self.key
    }
}
