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

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Entries stored in an [`OrderedMap`] expose their own key.
pub(crate) trait Keyed {
    fn key(&self) -> &str;
}

/// Insertion-ordered map with O(1) key lookup.
///
/// Entries live in a `Vec` to keep their order; a side index maps each key to
/// its position. Removal rebuilds the index for the shifted tail.
#[derive(Clone, Debug)]
pub(crate) struct OrderedMap<V> {
    entries: Vec<V>,
    index: HashMap<String, usize>,
}

impl<V: Keyed> OrderedMap<V> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub(crate) fn get(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&pos| &self.entries[pos])
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        match self.index.get(key) {
            Some(&pos) => self.entries.get_mut(pos),
            None => None,
        }
    }

    /// Inserts `entry`, replacing an existing entry with the same key in place.
    pub(crate) fn insert(&mut self, entry: V) -> &mut V {
        let pos = match self.index.get(entry.key()) {
            Some(&pos) => {
                self.entries[pos] = entry;
                pos
            }
            None => {
                let pos = self.entries.len();
                self.index.insert(entry.key().to_string(), pos);
                self.entries.push(entry);
                pos
            }
        };
        &mut self.entries[pos]
    }

    pub(crate) fn get_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> V) -> &mut V {
        let pos = match self.index.get(key) {
            Some(&pos) => pos,
            None => {
                let pos = self.entries.len();
                self.index.insert(key.to_string(), pos);
                self.entries.push(make());
                pos
            }
        };
        &mut self.entries[pos]
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<V> {
        let pos = self.index.remove(key)?;
        let removed = self.entries.remove(pos);
        for entry in &self.entries[pos..] {
            if let Some(slot) = self.index.get_mut(entry.key()) {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, V> {
        self.entries.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, V> {
        self.entries.iter_mut()
    }

    pub(crate) fn into_entries(self) -> Vec<V> {
        self.entries
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V: Keyed> FromIterator<V> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let mut map = Self::new();
        for entry in iter {
            map.insert(entry);
        }
        map
    }
}

impl<V: Keyed + PartialEq> PartialEq for OrderedMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl<'de, V: Keyed + Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<V>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry(String, i32);

    impl Keyed for Entry {
        fn key(&self) -> &str {
            &self.0
        }
    }

    fn entry(key: &str, value: i32) -> Entry {
        Entry(key.to_string(), value)
    }

    #[test]
    fn keeps_insertion_order_and_replaces_in_place() {
        let mut map = OrderedMap::new();
        map.insert(entry("b", 1));
        map.insert(entry("a", 2));
        map.insert(entry("b", 3));
        let keys: Vec<_> = map.iter().map(|e| e.0.as_str()).collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(map.get("b").map(|e| e.1), Some(3));
    }

    #[test]
    fn remove_reindexes_tail() {
        let mut map: OrderedMap<Entry> = ["x", "y", "z"].iter().map(|k| entry(k, 0)).collect();
        assert!(map.remove("x").is_some());
        assert!(map.remove("x").is_none());
        assert_eq!(map.get("z").map(|e| e.0.as_str()), Some("z"));
        if let Some(e) = map.get_mut("y") {
            e.1 = 7;
        }
        assert_eq!(map.iter().next().map(|e| e.1), Some(7));
        assert_eq!(map.len(), 2);
    }
}
