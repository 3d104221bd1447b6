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

use thiserror::Error;

use crate::tree::ValueType;

/// Errors raised by [`Hash`](crate::Hash) operations.
///
/// Every variant names the path it was raised for so that failures inside
/// deeply nested configuration trees stay traceable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashError {
    /// Nothing is stored under the requested path.
    #[error("path not found: '{path}'")]
    PathNotFound { path: String },

    /// A value exists but its stored type differs from the requested one.
    #[error("type mismatch at '{path}': requested {expected}, stored {found}")]
    TypeMismatch {
        path: String,
        expected: ValueType,
        found: ValueType,
    },

    /// A conversion requested through `get_as` is not representable.
    #[error("cannot convert '{path}' from {from} to {to}: {reason}")]
    Cast {
        path: String,
        from: ValueType,
        to: &'static str,
        reason: String,
    },

    /// The path (or the separator used to split it) is malformed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Traversal tried to descend through a node that holds no nested hash.
    #[error("cannot descend into '{path}': node holds {found}, not a hash")]
    NotAHash { path: String, found: ValueType },

    /// An index segment points past the end of a sequence of hashes.
    #[error("index {index} out of range at '{path}' (length {len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    /// Shape and element count of an array disagree.
    #[error("invalid array: {0}")]
    InvalidArray(String),
}

impl HashError {
    pub(crate) fn not_found(path: impl Into<String>) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    pub(crate) fn cast(
        path: impl Into<String>,
        from: ValueType,
        to: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::Cast {
            path: path.into(),
            from,
            to,
            reason: reason.into(),
        }
    }

    /// Rewrites the path carried by the error, used when a conversion helper
    /// that does not know its location reports back to a path-aware caller.
    pub(crate) fn at(self, path: &str) -> Self {
        match self {
            Self::Cast {
                from, to, reason, ..
            } => Self::Cast {
                path: path.to_string(),
                from,
                to,
                reason,
            },
            Self::TypeMismatch {
                expected, found, ..
            } => Self::TypeMismatch {
                path: path.to_string(),
                expected,
                found,
            },
            other => other,
        }
    }
}
