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

use crate::tree::{Hash, Node, Value, DEFAULT_SEPARATOR};

/// How [`Hash::merge`] treats entries present on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MergePolicy {
    /// Top-level entries of the source replace existing ones wholesale.
    ReplaceExisting,
    /// Deep merge; attributes of the source replace those of existing nodes.
    #[default]
    ReplaceAttributes,
    /// Deep merge; attributes are merged name by name.
    MergeAttributes,
}

/// How a source path relates to the selection given to a merge.
#[derive(PartialEq)]
enum Selection {
    All,
    Partial,
    Excluded,
}

struct Selector<'s> {
    paths: &'s [&'s str],
    separator: char,
}

impl Selector<'_> {
    fn classify(&self, path: &str) -> Selection {
        let mut partial = false;
        for selected in self.paths {
            if *selected == path || is_below(path, selected, self.separator) {
                return Selection::All;
            }
            if is_below(selected, path, self.separator) {
                partial = true;
            }
        }
        if partial {
            Selection::Partial
        } else {
            Selection::Excluded
        }
    }
}

/// `path` lies inside the subtree rooted at `root`.
fn is_below(path: &str, root: &str, separator: char) -> bool {
    path.strip_prefix(root)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c == separator || c == '[')
}

impl Hash {
    /// Merges `other` into `self`.
    ///
    /// Deep policies descend into hashes present on both sides; every other
    /// value, sequences of hashes included, is replaced. Merging an empty
    /// hash onto an existing subtree leaves that subtree untouched.
    pub fn merge(&mut self, other: &Hash, policy: MergePolicy) {
        self.merge_level(other, policy, "", None);
    }

    /// Like [`merge`](Self::merge) but only for source paths in `selected`
    /// (and their subtrees), split with `separator`.
    pub fn merge_selected(
        &mut self,
        other: &Hash,
        policy: MergePolicy,
        selected: &[&str],
        separator: char,
    ) {
        let selector = Selector {
            paths: selected,
            separator,
        };
        self.merge_level(other, policy, "", Some(&selector));
    }

    fn merge_level(
        &mut self,
        other: &Hash,
        policy: MergePolicy,
        prefix: &str,
        selector: Option<&Selector<'_>>,
    ) {
        let separator = selector.map_or(DEFAULT_SEPARATOR, |s| s.separator);
        for source in other {
            let path = if prefix.is_empty() {
                source.key().to_string()
            } else {
                format!("{prefix}{separator}{}", source.key())
            };
            let selection = selector.map_or(Selection::All, |s| s.classify(&path));
            let narrowing = match selection {
                Selection::Excluded => continue,
                Selection::Partial if source.value().as_hash().is_none() => continue,
                Selection::Partial => selector,
                Selection::All => None,
            };

            if policy == MergePolicy::ReplaceExisting && narrowing.is_none() {
                self.nodes.insert(source.clone());
                continue;
            }

            let exists = self.nodes.contains(source.key());
            let target = self
                .nodes
                .get_or_insert_with(source.key(), || Node::new(source.key(), Hash::new()));
            let (value, attributes) = target.parts_mut();
            if !exists || policy != MergePolicy::MergeAttributes {
                *attributes = source.attributes().clone();
            } else {
                attributes.merge(source.attributes());
            }

            match (value, source.value()) {
                (Value::Hash(mine), Value::Hash(theirs)) => {
                    mine.merge_level(theirs, policy, &path, narrowing);
                }
                (value, Value::Hash(theirs)) if narrowing.is_some() => {
                    let mut fresh = Hash::new();
                    fresh.merge_level(theirs, policy, &path, narrowing);
                    *value = Value::Hash(fresh);
                }
                (value, theirs) => *value = theirs.clone(),
            }
        }
    }

    /// Removes from `self` every leaf present in `other`; hashes emptied by
    /// the removal are removed as well.
    pub fn subtract(&mut self, other: &Hash) {
        for theirs in other {
            let Some(mine) = self.nodes.get_mut(theirs.key()) else {
                continue;
            };
            let remove = match (mine.value_mut(), theirs.value()) {
                (Value::Hash(sub), Value::Hash(sub_other)) if !sub_other.is_empty() => {
                    sub.subtract(sub_other);
                    sub.is_empty()
                }
                _ => true,
            };
            if remove {
                self.nodes.remove(theirs.key());
            }
        }
    }
}
