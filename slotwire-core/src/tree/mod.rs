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

//! The `Hash` container: an insertion-ordered tree of attributed, typed nodes.

mod attributes;
mod convert;
mod display;
mod merge;
mod nd_array;
mod node;
mod ordered_map;
mod path;
mod value;

pub use attributes::{Attribute, Attributes};
pub use convert::ValueAs;
pub use merge::MergePolicy;
pub use nd_array::{ArrayData, NdArray};
pub use node::Node;
pub use path::{HashPath, DEFAULT_SEPARATOR};
pub use value::{Complex, HashValue, Value, ValueType};

use serde::{Deserialize, Serialize};

use crate::error::HashError;
use ordered_map::OrderedMap;
use path::Segment;

/// An ordered mapping from key to [`Node`], addressable by separator-joined paths.
///
/// Insertion order is preserved and significant: it drives iteration,
/// [`paths`](Hash::paths), [`flatten`](Hash::flatten) and the textual form.
/// Nested hashes are plain values owned by their parent node.
///
/// ```
/// use slotwire_core::Hash;
///
/// let mut h = Hash::new();
/// h.set("motor.speed", 12_i32).unwrap();
/// h.set_attribute("motor.speed", "unit", "rpm").unwrap();
/// assert_eq!(*h.get::<i32>("motor.speed").unwrap(), 12);
/// assert_eq!(h.get_as::<f64>("motor.speed").unwrap(), 12.0);
/// assert_eq!(h.attribute::<String>("motor.speed", "unit").unwrap(), "rpm");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hash {
    nodes: OrderedMap<Node>,
}

/// What a path resolves to: a node, or a bare hash inside a sequence (`key[i]`).
enum Leaf<'h> {
    Node(&'h Node),
    Element(&'h Hash),
}

enum LeafMut<'h> {
    Node(&'h mut Node),
    Element(&'h mut Hash),
}

/// How far one indexed write may extend a sequence of hashes past its end.
pub const MAX_SEQUENCE_GROWTH: usize = 1 << 16;

fn not_a_hash(path: &HashPath<'_>, found: ValueType) -> HashError {
    HashError::NotAHash {
        path: path.as_str().to_string(),
        found,
    }
}

fn element_error(path: &HashPath<'_>, value: &Value, index: usize) -> HashError {
    match value.as_vec_hash() {
        Some(list) => HashError::IndexOutOfRange {
            path: path.as_str().to_string(),
            index,
            len: list.len(),
        },
        None => not_a_hash(path, value.value_type()),
    }
}

impl Hash {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Top-level keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(Node::key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Node> {
        self.nodes.iter_mut()
    }

    /// Inserts a top-level entry, taking `key` literally (no path parsing).
    ///
    /// An existing entry keeps its position and attributes; only its value is
    /// replaced.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) -> &mut Node {
        let value = value.into();
        let node = self
            .nodes
            .get_or_insert_with(key, || Node::new(key, Value::None));
        node.set_value(value);
        node
    }

    /// Top-level lookup by literal key.
    pub fn entry(&self, key: &str) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Removes a top-level entry by literal key.
    pub fn remove(&mut self, key: &str) -> Option<Node> {
        self.nodes.remove(key)
    }

    fn child<'h>(
        &'h self,
        segment: &Segment<'_>,
        path: &HashPath<'_>,
    ) -> Result<&'h Hash, HashError> {
        let node = self
            .nodes
            .get(segment.key)
            .ok_or_else(|| HashError::not_found(path.as_str()))?;
        match segment.index {
            None => node
                .value()
                .as_hash()
                .ok_or_else(|| not_a_hash(path, node.value_type())),
            Some(index) => node
                .value()
                .as_vec_hash()
                .and_then(|list| list.get(index))
                .ok_or_else(|| element_error(path, node.value(), index)),
        }
    }

    fn child_mut<'h>(
        &'h mut self,
        segment: &Segment<'_>,
        path: &HashPath<'_>,
    ) -> Result<&'h mut Hash, HashError> {
        if let Some(index) = segment.index {
            let len = self
                .nodes
                .get(segment.key)
                .and_then(|node| node.value().as_vec_hash())
                .map_or(0, Vec::len);
            if index >= len && index - len >= MAX_SEQUENCE_GROWTH {
                return Err(HashError::IndexOutOfRange {
                    path: path.as_str().to_string(),
                    index,
                    len,
                });
            }
        }
        let node = self
            .nodes
            .get_mut(segment.key)
            .ok_or_else(|| HashError::not_found(path.as_str()))?;
        let found = node.value_type();
        match segment.index {
            None => node
                .value_mut()
                .as_hash_mut()
                .ok_or_else(|| not_a_hash(path, found)),
            Some(index) => {
                let len = node.value().as_vec_hash().map(Vec::len);
                node.value_mut()
                    .as_vec_hash_mut()
                    .and_then(|list| list.get_mut(index))
                    .ok_or_else(|| match len {
                        Some(len) => HashError::IndexOutOfRange {
                            path: path.as_str().to_string(),
                            index,
                            len,
                        },
                        None => not_a_hash(path, found),
                    })
            }
        }
    }

    /// Walks to the hash holding the last segment, creating missing levels.
    ///
    /// Intermediate leaves are replaced by empty hashes, and index segments
    /// grow their sequence with empty hashes up to the requested position.
    fn child_for_write<'h>(
        &'h mut self,
        segment: &Segment<'_>,
        path: &HashPath<'_>,
    ) -> Result<&'h mut Hash, HashError> {
        let node = self
            .nodes
            .get_or_insert_with(segment.key, || Node::new(segment.key, Value::None));
        match segment.index {
            None => {
                if node.value().as_hash().is_none() {
                    node.set_value(Hash::new());
                }
                let found = node.value_type();
                node.value_mut()
                    .as_hash_mut()
                    .ok_or_else(|| not_a_hash(path, found))
            }
            Some(index) => {
                if node.value().as_vec_hash().is_none() {
                    node.set_value(Vec::<Hash>::new());
                }
                let found = node.value_type();
                let list = node
                    .value_mut()
                    .as_vec_hash_mut()
                    .ok_or_else(|| not_a_hash(path, found))?;
                if list.len() <= index {
                    let len = list.len();
                    let out_of_range = || HashError::IndexOutOfRange {
                        path: path.as_str().to_string(),
                        index,
                        len,
                    };
                    let wanted = index.checked_add(1).ok_or_else(out_of_range)?;
                    list.try_reserve(wanted - len).map_err(|_| out_of_range())?;
                    list.resize_with(wanted, Hash::new);
                }
                Ok(&mut list[index])
            }
        }
    }

    fn locate<'h>(&'h self, path: &HashPath<'_>) -> Result<Leaf<'h>, HashError> {
        let segments = path.segments()?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| path.invalid("empty path"))?;
        let mut current = self;
        for segment in parents {
            current = current.child(segment, path)?;
        }
        match last.index {
            None => current
                .nodes
                .get(last.key)
                .map(Leaf::Node)
                .ok_or_else(|| HashError::not_found(path.as_str())),
            Some(_) => current.child(last, path).map(Leaf::Element),
        }
    }

    fn locate_mut<'h>(&'h mut self, path: &HashPath<'_>) -> Result<LeafMut<'h>, HashError> {
        let segments = path.segments()?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| path.invalid("empty path"))?;
        let mut current = self;
        for segment in parents {
            current = current.child_mut(segment, path)?;
        }
        match last.index {
            None => current
                .nodes
                .get_mut(last.key)
                .map(LeafMut::Node)
                .ok_or_else(|| HashError::not_found(path.as_str())),
            Some(_) => current.child_mut(last, path).map(LeafMut::Element),
        }
    }

    /// Stores `value` at `path`, creating intermediate hashes as needed.
    ///
    /// Setting an existing node replaces its value and keeps its attributes.
    /// An indexed last segment (`list[2]`) only accepts a hash value.
    pub fn set<'p>(
        &mut self,
        path: impl Into<HashPath<'p>>,
        value: impl Into<Value>,
    ) -> Result<(), HashError> {
        let path = path.into();
        let value = value.into();
        let segments = path.segments()?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| path.invalid("empty path"))?;
        let mut current = self;
        for segment in parents {
            current = current.child_for_write(segment, &path)?;
        }
        match (last.index, value) {
            (None, value) => {
                current.insert(last.key, value);
            }
            (Some(_), Value::Hash(hash)) => {
                *current.child_for_write(last, &path)? = hash;
            }
            (Some(_), other) => {
                return Err(path.invalid(format!(
                    "an indexed element holds a hash, not {}",
                    other.value_type()
                )));
            }
        }
        Ok(())
    }

    /// Exact-type access; a stored value of another type is a mismatch.
    pub fn get<'p, T: HashValue>(&self, path: impl Into<HashPath<'p>>) -> Result<&T, HashError> {
        let path = path.into();
        match self.locate(&path)? {
            Leaf::Node(node) => T::from_ref(node.value()).ok_or_else(|| HashError::TypeMismatch {
                path: path.as_str().to_string(),
                expected: T::VALUE_TYPE,
                found: node.value_type(),
            }),
            Leaf::Element(hash) => T::from_hash(hash).ok_or_else(|| HashError::TypeMismatch {
                path: path.as_str().to_string(),
                expected: T::VALUE_TYPE,
                found: ValueType::Hash,
            }),
        }
    }

    pub fn get_mut<'p, T: HashValue>(
        &mut self,
        path: impl Into<HashPath<'p>>,
    ) -> Result<&mut T, HashError> {
        let path = path.into();
        match self.locate_mut(&path)? {
            LeafMut::Node(node) => {
                let found = node.value_type();
                T::from_mut(node.value_mut()).ok_or_else(|| HashError::TypeMismatch {
                    path: path.as_str().to_string(),
                    expected: T::VALUE_TYPE,
                    found,
                })
            }
            LeafMut::Element(hash) => T::from_hash_mut(hash).ok_or_else(|| HashError::TypeMismatch {
                path: path.as_str().to_string(),
                expected: T::VALUE_TYPE,
                found: ValueType::Hash,
            }),
        }
    }

    /// Reads the value at `path` converted to `T`; see [`ValueAs`] for the rules.
    pub fn get_as<'p, T: ValueAs>(&self, path: impl Into<HashPath<'p>>) -> Result<T, HashError> {
        let path = path.into();
        match self.locate(&path)? {
            Leaf::Node(node) => T::value_as(node.value()),
            Leaf::Element(hash) => T::value_as(&Value::Hash(hash.clone())),
        }
        .map_err(|e| e.at(path.as_str()))
    }

    /// Raw value stored at `path`.
    pub fn value<'p>(&self, path: impl Into<HashPath<'p>>) -> Result<&Value, HashError> {
        let path = path.into();
        match self.locate(&path)? {
            Leaf::Node(node) => Ok(node.value()),
            Leaf::Element(_) => Err(path.invalid("an indexed element is not a node")),
        }
    }

    pub fn has<'p>(&self, path: impl Into<HashPath<'p>>) -> bool {
        self.locate(&path.into()).is_ok()
    }

    /// Non-failing node lookup. Indexed elements are not nodes and yield `None`.
    pub fn find<'p>(&self, path: impl Into<HashPath<'p>>) -> Option<&Node> {
        match self.locate(&path.into()) {
            Ok(Leaf::Node(node)) => Some(node),
            _ => None,
        }
    }

    pub fn find_mut<'p>(&mut self, path: impl Into<HashPath<'p>>) -> Option<&mut Node> {
        match self.locate_mut(&path.into()) {
            Ok(LeafMut::Node(node)) => Some(node),
            _ => None,
        }
    }

    pub fn node<'p>(&self, path: impl Into<HashPath<'p>>) -> Result<&Node, HashError> {
        let path = path.into();
        match self.locate(&path)? {
            Leaf::Node(node) => Ok(node),
            Leaf::Element(_) => Err(path.invalid("an indexed element is not a node")),
        }
    }

    pub fn node_mut<'p>(&mut self, path: impl Into<HashPath<'p>>) -> Result<&mut Node, HashError> {
        let path = path.into();
        match self.locate_mut(&path)? {
            LeafMut::Node(node) => Ok(node),
            LeafMut::Element(_) => Err(path.invalid("an indexed element is not a node")),
        }
    }

    /// Places the value and attributes of `node` at `path`; the node's own key
    /// is replaced by the last path segment.
    pub fn set_node<'p>(
        &mut self,
        path: impl Into<HashPath<'p>>,
        node: Node,
    ) -> Result<&mut Node, HashError> {
        let path = path.into();
        let attributes = node.attributes().clone();
        self.set(path, node.into_value())?;
        let target = self.node_mut(path)?;
        *target.attributes_mut() = attributes;
        Ok(target)
    }

    pub fn value_type<'p>(&self, path: impl Into<HashPath<'p>>) -> Result<ValueType, HashError> {
        match self.locate(&path.into())? {
            Leaf::Node(node) => Ok(node.value_type()),
            Leaf::Element(_) => Ok(ValueType::Hash),
        }
    }

    pub fn is<'p, T: HashValue>(&self, path: impl Into<HashPath<'p>>) -> bool {
        self.value_type(path)
            .map(|found| found == T::VALUE_TYPE)
            .unwrap_or(false)
    }

    /// Removes the leaf or subtree at `path`; an indexed path removes that
    /// element from its sequence. Returns whether anything was removed.
    pub fn erase<'p>(&mut self, path: impl Into<HashPath<'p>>) -> bool {
        let path = path.into();
        let Ok(segments) = path.segments() else {
            return false;
        };
        let Some((last, parents)) = segments.split_last() else {
            return false;
        };
        let mut current = self;
        for segment in parents {
            match current.child_mut(segment, &path) {
                Ok(next) => current = next,
                Err(_) => return false,
            }
        }
        match last.index {
            None => current.nodes.remove(last.key).is_some(),
            Some(index) => match current
                .nodes
                .get_mut(last.key)
                .and_then(|node| node.value_mut().as_vec_hash_mut())
            {
                Some(list) if index < list.len() => {
                    list.remove(index);
                    true
                }
                _ => false,
            },
        }
    }

    /// Erases `path` and then every ancestor the removal left empty.
    pub fn erase_path<'p>(&mut self, path: impl Into<HashPath<'p>>) -> bool {
        let path = path.into();
        if !self.erase(path) {
            return false;
        }
        let separator = path.separator();
        let parts: Vec<&str> = path.as_str().split(separator).collect();
        for depth in (1..parts.len()).rev() {
            let prefix = parts[..depth].join(&separator.to_string());
            let prefix = HashPath::new(&prefix, separator);
            let emptied = self.get::<Hash>(prefix).map(Hash::is_empty).unwrap_or(false);
            if !emptied || !self.erase(prefix) {
                break;
            }
        }
        true
    }

    pub fn attributes<'p>(&self, path: impl Into<HashPath<'p>>) -> Result<&Attributes, HashError> {
        self.node(path).map(Node::attributes)
    }

    pub fn attributes_mut<'p>(
        &mut self,
        path: impl Into<HashPath<'p>>,
    ) -> Result<&mut Attributes, HashError> {
        self.node_mut(path).map(Node::attributes_mut)
    }

    pub fn set_attributes<'p>(
        &mut self,
        path: impl Into<HashPath<'p>>,
        attributes: Attributes,
    ) -> Result<(), HashError> {
        *self.attributes_mut(path)? = attributes;
        Ok(())
    }

    /// Sets attribute `name` on the existing node at `path`.
    pub fn set_attribute<'p>(
        &mut self,
        path: impl Into<HashPath<'p>>,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), HashError> {
        self.attributes_mut(path)?.set(name, value);
        Ok(())
    }

    pub fn attribute<'p, T: HashValue>(
        &self,
        path: impl Into<HashPath<'p>>,
        name: &str,
    ) -> Result<&T, HashError> {
        let path = path.into();
        self.attributes(path)?
            .get(name)
            .map_err(|e| attribute_error(e, &path, name))
    }

    pub fn attribute_as<'p, T: ValueAs>(
        &self,
        path: impl Into<HashPath<'p>>,
        name: &str,
    ) -> Result<T, HashError> {
        let path = path.into();
        self.attributes(path)?
            .get_as(name)
            .map_err(|e| attribute_error(e, &path, name))
    }

    pub fn has_attribute<'p>(&self, path: impl Into<HashPath<'p>>, name: &str) -> bool {
        self.attributes(path).map(|a| a.has(name)).unwrap_or(false)
    }

    /// Paths of all leaves, joined with `.`; see [`paths_with_separator`](Self::paths_with_separator).
    pub fn paths(&self) -> Vec<String> {
        self.paths_with_separator(DEFAULT_SEPARATOR)
    }

    /// Paths of all leaves in insertion order.
    ///
    /// Empty hashes and empty sequences of hashes count as leaves. Elements of
    /// a non-empty sequence of hashes are addressed as `key[i]`.
    pub fn paths_with_separator(&self, separator: char) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_paths("", separator, &mut out);
        out
    }

    fn collect_paths(&self, prefix: &str, separator: char, out: &mut Vec<String>) {
        for node in self.nodes.iter() {
            let path = join_path(prefix, node.key(), separator);
            match node.value() {
                Value::Hash(sub) if !sub.is_empty() => sub.collect_paths(&path, separator, out),
                Value::VecHash(list) if !list.is_empty() => {
                    for (i, element) in list.iter().enumerate() {
                        let indexed = format!("{path}[{i}]");
                        if element.is_empty() {
                            out.push(indexed);
                        } else {
                            element.collect_paths(&indexed, separator, out);
                        }
                    }
                }
                _ => out.push(path),
            }
        }
    }

    /// Single-level copy keyed by full leaf paths joined with `separator`.
    ///
    /// Leaves keep their attributes. Sequences of hashes and empty hashes are
    /// carried as leaf values, so [`unflatten`](Self::unflatten) restores the
    /// tree; attributes of intermediate hashes have no place to live and are
    /// dropped.
    pub fn flatten(&self, separator: char) -> Hash {
        let mut flat = Hash::new();
        self.flatten_into("", separator, &mut flat);
        flat
    }

    fn flatten_into(&self, prefix: &str, separator: char, flat: &mut Hash) {
        for node in self.nodes.iter() {
            let path = join_path(prefix, node.key(), separator);
            match node.value() {
                Value::Hash(sub) if !sub.is_empty() => sub.flatten_into(&path, separator, flat),
                value => {
                    let leaf = flat.insert(&path, value.clone());
                    *leaf.attributes_mut() = node.attributes().clone();
                }
            }
        }
    }

    /// Rebuilds the tree from a hash produced by [`flatten`](Self::flatten).
    pub fn unflatten(&self, separator: char) -> Result<Hash, HashError> {
        let mut tree = Hash::new();
        for node in self.nodes.iter() {
            let path = HashPath::new(node.key(), separator);
            tree.set(path, node.value().clone())?;
            if !node.attributes().is_empty() {
                tree.set_attributes(path, node.attributes().clone())?;
            }
        }
        Ok(tree)
    }

    /// Equality that optionally ignores the order of keys and attributes.
    pub fn fully_equals(&self, other: &Hash, order_matters: bool) -> bool {
        if self.len() != other.len() {
            return false;
        }
        if order_matters && !self.keys().eq(other.keys()) {
            return false;
        }
        self.nodes.iter().all(|mine| {
            other.nodes.get(mine.key()).is_some_and(|theirs| {
                attributes_equal(mine.attributes(), theirs.attributes(), order_matters)
                    && values_equal(mine.value(), theirs.value(), order_matters)
            })
        })
    }
}

fn attribute_error(error: HashError, path: &HashPath<'_>, name: &str) -> HashError {
    let located = format!("{}@{name}", path.as_str());
    match error {
        HashError::PathNotFound { .. } => HashError::not_found(located),
        other => other.at(&located),
    }
}

fn join_path(prefix: &str, key: &str, separator: char) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}{separator}{key}")
    }
}

fn attributes_equal(a: &Attributes, b: &Attributes, order_matters: bool) -> bool {
    if order_matters {
        return a == b;
    }
    a.len() == b.len() && a.iter().all(|(name, value)| b.value(name) == Some(value))
}

fn values_equal(a: &Value, b: &Value, order_matters: bool) -> bool {
    match (a, b) {
        (Value::Hash(x), Value::Hash(y)) => x.fully_equals(y, order_matters),
        (Value::VecHash(x), Value::VecHash(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y.iter())
                    .all(|(p, q)| p.fully_equals(q, order_matters))
        }
        _ => a == b,
    }
}

impl<'a> IntoIterator for &'a Hash {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for Hash {
    type Item = Node;
    type IntoIter = std::vec::IntoIter<Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_entries().into_iter()
    }
}

impl FromIterator<Node> for Hash {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash;

    fn nested() -> Hash {
        let mut h = Hash::new();
        h.set("a.b.c", 1_i32).unwrap();
        h.set("a.b.d", vec![1.0_f64, 2.0]).unwrap();
        h.set("a.e", "text").unwrap();
        h.set("f", Hash::new()).unwrap();
        h.set("g[1].x", true).unwrap();
        h.set("h", Vec::<Hash>::new()).unwrap();
        h.set_attribute("a.e", "unit", "m").unwrap();
        h
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut h = Hash::new();
        h.set("x.y", 42_u16).unwrap();
        assert!(h.has("x.y"));
        assert_eq!(*h.get::<u16>("x.y").unwrap(), 42);
        *h.get_mut::<u16>("x.y").unwrap() += 1;
        assert_eq!(*h.get::<u16>("x.y").unwrap(), 43);
        assert!(h.is::<Hash>("x"));
    }

    #[test]
    fn get_reports_missing_paths_and_mismatches() {
        let h = nested();
        assert!(matches!(h.get::<i32>("a.zz"), Err(HashError::PathNotFound { .. })));
        assert!(matches!(
            h.get::<String>("a.b.c"),
            Err(HashError::TypeMismatch { expected: ValueType::String, found: ValueType::Int32, .. })
        ));
        assert!(matches!(h.get::<i32>("a.e.deeper"), Err(HashError::NotAHash { .. })));
        assert!(matches!(h.get::<Hash>("g[7]"), Err(HashError::IndexOutOfRange { len: 2, .. })));
        assert!(h.find("a.zz").is_none());
        assert!(h.find("a.b").is_some());
    }

    #[test]
    fn custom_separator_applies_to_every_operation() {
        let mut h = Hash::new();
        h.set(("dev/motor.1/speed", '/'), 3_i32).unwrap();
        assert_eq!(h.keys().collect::<Vec<_>>(), ["dev"]);
        assert_eq!(h.get_as::<f64>(("dev/motor.1/speed", '/')).unwrap(), 3.0);
        assert_eq!(h.paths_with_separator('/'), ["dev/motor.1/speed"]);
        assert!(h.erase(("dev/motor.1", '/')));
        assert!(h.get::<Hash>("dev").unwrap().is_empty());
        assert!(matches!(
            h.set(("a[b", '['), 1_i32),
            Err(HashError::InvalidPath { .. })
        ));
    }

    #[test]
    fn set_keeps_attributes_and_position() {
        let mut h = nested();
        h.set("a.e", "other").unwrap();
        assert_eq!(h.attribute::<String>("a.e", "unit").unwrap(), "m");
        assert_eq!(h.get::<Hash>("a").unwrap().keys().collect::<Vec<_>>(), ["b", "e"]);
        assert!(h.has_attribute("a.e", "unit"));
        assert!(!h.has_attribute("a.e", "scale"));
        assert!(matches!(
            h.attribute::<i32>("a.e", "scale"),
            Err(HashError::PathNotFound { path }) if path == "a.e@scale"
        ));
        assert!(h.set_attribute("nowhere", "unit", "s").is_err());
    }

    #[test]
    fn indexed_paths_extend_and_shrink_sequences() {
        let mut h = Hash::new();
        h.set("list[2].v", 3_i32).unwrap();
        assert_eq!(h.get::<Vec<Hash>>("list").unwrap().len(), 3);
        assert!(h.get::<Hash>("list[0]").unwrap().is_empty());
        assert_eq!(h.value_type("list[2]").unwrap(), ValueType::Hash);
        h.set("list[0]", hash! { "w" => 1_i8 }).unwrap();
        assert_eq!(*h.get::<i8>("list[0].w").unwrap(), 1);
        assert!(h.set("list[1]", 5_i32).is_err());
        assert!(h.erase("list[1]"));
        assert_eq!(*h.get::<i32>("list[1].v").unwrap(), 3);
        assert!(!h.erase("list[5]"));
    }

    #[test]
    fn indexed_paths_refuse_unbounded_growth() {
        let mut h = Hash::new();
        assert!(matches!(
            h.set("k[18446744073709551615]", Hash::new()),
            Err(HashError::IndexOutOfRange { len: 0, .. })
        ));
        assert!(matches!(
            h.set("k[100000000000].v", 1_i32),
            Err(HashError::IndexOutOfRange { len: 0, .. })
        ));
        assert!(!h.has("k"));

        h.set("k[1]", Hash::new()).unwrap();
        let far = format!("k[{}]", 2 + MAX_SEQUENCE_GROWTH);
        assert!(matches!(h.set(far.as_str(), Hash::new()), Err(HashError::IndexOutOfRange { len: 2, .. })));
        let near = format!("k[{}]", 1 + MAX_SEQUENCE_GROWTH);
        h.set(near.as_str(), Hash::new()).unwrap();
        assert_eq!(h.get::<Vec<Hash>>("k").unwrap().len(), 2 + MAX_SEQUENCE_GROWTH);
    }

    #[test]
    fn paths_list_leaves_in_order() {
        let h = nested();
        assert_eq!(
            h.paths(),
            ["a.b.c", "a.b.d", "a.e", "f", "g[0]", "g[1].x", "h"]
        );
    }

    #[test]
    fn flatten_unflatten_round_trip() {
        let h = nested();
        let flat = h.flatten('/');
        assert_eq!(flat.keys().collect::<Vec<_>>(), ["a/b/c", "a/b/d", "a/e", "f", "g", "h"]);
        assert_eq!(flat.entry("a/e").unwrap().attributes().len(), 1);
        assert_eq!(flat.unflatten('/').unwrap(), h);
    }

    #[test]
    fn erase_path_prunes_empty_parents() {
        let mut h = nested();
        assert!(h.erase("a.b"));
        assert!(!h.has("a.b"));
        assert!(h.has("a.e"));
        assert!(!h.erase("a.b"));

        let mut h = Hash::new();
        h.set("x.y.z", 1_i32).unwrap();
        h.set("x.w", 2_i32).unwrap();
        assert!(h.erase_path("x.y.z"));
        assert_eq!(h.paths(), ["x.w"]);
        assert!(h.erase_path("x.w"));
        assert!(h.is_empty());
    }

    #[test]
    fn nodes_move_between_hashes() {
        let source = nested();
        let node = source.node("a.e").unwrap().clone();
        let mut target = Hash::new();
        target.set_node("copy.e", node).unwrap();
        assert_eq!(target.get::<String>("copy.e").unwrap(), "text");
        assert_eq!(target.node("copy.e").unwrap().key(), "e");
        assert_eq!(target.attribute::<String>("copy.e", "unit").unwrap(), "m");
        assert!(target.node("missing").is_err());
    }

    #[test]
    fn fully_equals_can_ignore_order() {
        let a = hash! { "x" => 1_i32, "y" => hash! { "z" => "s" } };
        let b = hash! { "y" => hash! { "z" => "s" }, "x" => 1_i32 };
        assert_ne!(a, b);
        assert!(a.fully_equals(&b, false));
        assert!(!a.fully_equals(&b, true));
        assert!(!a.fully_equals(&hash! { "x" => 1_i32 }, false));
    }

    #[test]
    fn serde_round_trip_through_json() {
        let h = nested();
        let json = serde_json::to_string(&h).unwrap();
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }
}
