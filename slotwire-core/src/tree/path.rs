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

use crate::error::HashError;

/// Separator used when none is given.
pub const DEFAULT_SEPARATOR: char = '.';

/// A path into a [`Hash`](crate::Hash) together with the separator that splits it.
///
/// Every path-taking method of `Hash` accepts `impl Into<HashPath>`, so a plain
/// `&str` uses the default `.` separator while a `(&str, char)` pair selects
/// another one:
///
/// ```
/// use slotwire_core::Hash;
///
/// let mut h = Hash::new();
/// h.set(("motor/axis.x", '/'), 1.5_f64).unwrap();
/// assert!(h.has("motor"));
/// assert!(h.has(("motor/axis.x", '/')));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashPath<'a> {
    raw: &'a str,
    separator: char,
}

impl<'a> HashPath<'a> {
    pub const fn new(raw: &'a str, separator: char) -> Self {
        Self { raw, separator }
    }

    pub const fn as_str(&self) -> &'a str {
        self.raw
    }

    pub const fn separator(&self) -> char {
        self.separator
    }

    /// Splits the path into segments, validating separator and index syntax.
    pub(crate) fn segments(&self) -> Result<Vec<Segment<'a>>, HashError> {
        if matches!(self.separator, '[' | ']') {
            return Err(self.invalid(format!("'{}' cannot be used as separator", self.separator)));
        }
        if self.raw.is_empty() {
            return Err(self.invalid("empty path"));
        }
        self.raw
            .split(self.separator)
            .map(|part| Segment::parse(part).ok_or_else(|| self.invalid(format!("malformed segment '{part}'"))))
            .collect()
    }

    pub(crate) fn invalid(&self, reason: impl Into<String>) -> HashError {
        HashError::InvalidPath {
            path: self.raw.to_string(),
            reason: reason.into(),
        }
    }
}

impl<'a> From<&'a str> for HashPath<'a> {
    fn from(raw: &'a str) -> Self {
        Self::new(raw, DEFAULT_SEPARATOR)
    }
}

impl<'a> From<&'a String> for HashPath<'a> {
    fn from(raw: &'a String) -> Self {
        Self::new(raw, DEFAULT_SEPARATOR)
    }
}

impl<'a> From<(&'a str, char)> for HashPath<'a> {
    fn from((raw, separator): (&'a str, char)) -> Self {
        Self::new(raw, separator)
    }
}

impl<'a> From<(&'a String, char)> for HashPath<'a> {
    fn from((raw, separator): (&'a String, char)) -> Self {
        Self::new(raw, separator)
    }
}

/// One key of a path, optionally indexing into a sequence of hashes (`key[3]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Segment<'a> {
    pub(crate) key: &'a str,
    pub(crate) index: Option<usize>,
}

impl<'a> Segment<'a> {
    fn parse(part: &'a str) -> Option<Self> {
        if part.is_empty() {
            return None;
        }
        let Some(open) = part.find('[') else {
            return (!part.contains(']')).then_some(Self { key: part, index: None });
        };
        let key = &part[..open];
        let index = part[open + 1..].strip_suffix(']')?.parse::<usize>().ok()?;
        (!key.is_empty()).then_some(Self {
            key,
            index: Some(index),
        })
    }
}
