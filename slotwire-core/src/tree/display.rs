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

use crate::tree::{Attributes, Hash, Value};

fn write_attributes(f: &mut fmt::Formatter<'_>, attributes: &Attributes) -> fmt::Result {
    for (name, value) in attributes.iter() {
        write!(f, " {name}=\"{value}\"")?;
    }
    Ok(())
}

impl Hash {
    fn write_level(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        for node in self {
            write!(f, "{indent}'{}'", node.key())?;
            write_attributes(f, node.attributes())?;
            match node.value() {
                Value::Hash(sub) => {
                    writeln!(f, " +")?;
                    sub.write_level(f, depth + 1)?;
                }
                Value::VecHash(list) => {
                    writeln!(f, " @")?;
                    for (i, element) in list.iter().enumerate() {
                        writeln!(f, "{indent}[{i}]")?;
                        element.write_level(f, depth + 1)?;
                    }
                }
                value => writeln!(f, " => {value} {}", value.value_type())?,
            }
        }
        Ok(())
    }
}

/// Indented tree form: one node per line, `+` opens a nested hash and `@`
/// a sequence of hashes.
impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_level(f, 0)
    }
}
