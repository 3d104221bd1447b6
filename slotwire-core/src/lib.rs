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

//! Slotwire Core: the `Hash` data model.
//!
//! A [`Hash`] is an insertion-ordered tree of [`Node`]s. Every node carries a
//! key, a [`Value`] drawn from a closed set of reference types, and its own
//! [`Attributes`]. Hashes are the payload of every message header and body in
//! the Slotwire runtime and the format of every configuration snapshot.
#![forbid(unsafe_code)]

mod error;
mod tree;

pub use error::HashError;
pub use tree::{
    ArrayData, Attribute, Attributes, Complex, Hash, HashPath, HashValue, MergePolicy, NdArray, Node,
    Value, ValueAs, ValueType, DEFAULT_SEPARATOR, MAX_SEQUENCE_GROWTH,
};

/// Builds a [`Hash`] from literal top-level keys.
///
/// Keys are taken verbatim; nest further `hash!` invocations for sub-trees.
///
/// ```
/// use slotwire_core::{hash, Hash};
///
/// let h = hash! {
///     "name" => "motor",
///     "limits" => hash! { "low" => -5_i32, "high" => 5_i32 },
/// };
/// assert_eq!(*h.get::<i32>("limits.high").unwrap(), 5);
/// ```
#[macro_export]
macro_rules! hash {
    () => {
        $crate::Hash::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut hash = $crate::Hash::new();
        $(hash.insert($key, $value);)+
        hash
    }};
}

/// Re-exports of the commonly used types.
pub mod prelude {
    pub use crate::hash;
    pub use crate::{
        Attributes, Complex, Hash, HashError, HashPath, HashValue, MergePolicy, NdArray, Node, Value,
        ValueAs, ValueType,
    };
}
