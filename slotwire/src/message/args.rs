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

use slotwire_core::{Hash, HashValue, Value, ValueType};

use crate::message::SignalSlotError;

/// Largest number of positional arguments a message may carry.
pub const MAX_ARITY: usize = 4;

/// Ordered positional arguments of a call, request, reply or signal.
///
/// On the wire the arguments travel in the body hash under `a1`..`a4`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an argument, builder style.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.0.push(value.into());
        self
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.0.push(value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Value> {
        self.0.get(position)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }

    /// Packs the arguments into a message body.
    pub fn into_body(self) -> Result<Hash, SignalSlotError> {
        if self.0.len() > MAX_ARITY {
            return Err(SignalSlotError::TooManyArguments(self.0.len()));
        }
        let mut body = Hash::new();
        for (i, value) in self.0.into_iter().enumerate() {
            body.insert(&key(i), value);
        }
        Ok(body)
    }

    /// Unpacks a message body; its keys must be exactly `a1`..`an`.
    pub fn from_body(body: &Hash) -> Result<Self, SignalSlotError> {
        (0..body.len())
            .map(|i| {
                body.entry(&key(i))
                    .map(|node| node.value().clone())
                    .ok_or_else(|| {
                        SignalSlotError::MalformedMessage(format!(
                            "body keys {:?} are not positional",
                            body.keys().collect::<Vec<_>>()
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

fn key(position: usize) -> String {
    format!("a{}", position + 1)
}

impl FromIterator<Value> for Args {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Values that can be sent as positional arguments.
///
/// Implemented for `()`, tuples of up to four `Into<Value>` members and
/// [`Args`] itself.
pub trait IntoArgs {
    fn into_args(self) -> Args;
}

impl IntoArgs for Args {
    fn into_args(self) -> Args {
        self
    }
}

impl IntoArgs for () {
    fn into_args(self) -> Args {
        Args::new()
    }
}

/// Why a set of positional values did not fit a typed parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgMismatch {
    pub position: usize,
    pub expected: ValueType,
    pub found: Option<ValueType>,
}

impl std::fmt::Display for ArgMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.found {
            Some(found) => write!(
                f,
                "argument a{} is {found}, expected {}",
                self.position + 1,
                self.expected
            ),
            None => write!(f, "argument a{} ({}) is missing", self.position + 1, self.expected),
        }
    }
}

/// Typed parameter lists: tuples of up to four exact [`HashValue`] types.
pub trait FromArgs: Sized {
    const ARITY: usize;

    /// Converts the first `ARITY` values, which the caller guarantees exist.
    fn from_values(values: &[Value]) -> Result<Self, ArgMismatch>;
}

impl FromArgs for () {
    const ARITY: usize = 0;

    fn from_values(_values: &[Value]) -> Result<Self, ArgMismatch> {
        Ok(())
    }
}

fn take<T: HashValue + Clone>(values: &[Value], position: usize) -> Result<T, ArgMismatch> {
    let value = values.get(position);
    value
        .and_then(T::from_ref)
        .cloned()
        .ok_or_else(|| ArgMismatch {
            position,
            expected: T::VALUE_TYPE,
            found: value.map(Value::value_type),
        })
}

macro_rules! tuple_args {
    ($arity:literal => $($name:ident : $pos:tt),+) => {
        impl<$($name: Into<Value>),+> IntoArgs for ($($name,)+) {
            fn into_args(self) -> Args {
                Args(vec![$(self.$pos.into()),+])
            }
        }

        impl<$($name: HashValue + Clone),+> FromArgs for ($($name,)+) {
            const ARITY: usize = $arity;

            fn from_values(values: &[Value]) -> Result<Self, ArgMismatch> {
                Ok(($(take::<$name>(values, $pos)?,)+))
            }
        }
    };
}

tuple_args!(1 => A: 0);
tuple_args!(2 => A: 0, B: 1);
tuple_args!(3 => A: 0, B: 1, C: 2);
tuple_args!(4 => A: 0, B: 1, C: 2, D: 3);
