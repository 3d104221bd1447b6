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
use crate::tree::ValueType;

/// Typed element buffer of an [`NdArray`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
    Bool(Vec<bool>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! array_data {
    ($($ty:ty => $variant:ident, $value_type:ident;)*) => {
        $(
            impl From<Vec<$ty>> for ArrayData {
                fn from(v: Vec<$ty>) -> Self {
                    ArrayData::$variant(v)
                }
            }
        )*

        impl ArrayData {
            pub fn len(&self) -> usize {
                match self {
                    $(ArrayData::$variant(v) => v.len(),)*
                }
            }

            /// Type of a single element, reported with its scalar name.
            pub const fn element_type(&self) -> ValueType {
                match self {
                    $(ArrayData::$variant(_) => ValueType::$value_type,)*
                }
            }
        }
    };
}

array_data! {
    bool => Bool, Bool;
    i8 => I8, Int8;
    i16 => I16, Int16;
    i32 => I32, Int32;
    i64 => I64, Int64;
    u8 => U8, UInt8;
    u16 => U16, UInt16;
    u32 => U32, UInt32;
    u64 => U64, UInt64;
    f32 => F32, Float;
    f64 => F64, Double;
}

impl ArrayData {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A raw N-dimensional numeric array: a flat, row-major element buffer plus
/// its shape. No arithmetic is offered; the type only travels inside a Hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdArray {
    data: ArrayData,
    shape: Vec<usize>,
}

impl NdArray {
    /// Creates an array, checking that `shape` accounts for every element.
    pub fn new(data: impl Into<ArrayData>, shape: Vec<usize>) -> Result<Self, HashError> {
        let data = data.into();
        let expected: usize = shape.iter().product();
        if shape.is_empty() || expected != data.len() {
            return Err(HashError::InvalidArray(format!(
                "shape {shape:?} describes {expected} elements, buffer holds {}",
                data.len()
            )));
        }
        Ok(Self { data, shape })
    }

    /// One-dimensional array over the whole buffer.
    pub fn from_vec(data: impl Into<ArrayData>) -> Self {
        let data = data.into();
        let shape = vec![data.len()];
        Self { data, shape }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub const fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub const fn element_type(&self) -> ValueType {
        self.data.element_type()
    }

    pub fn reshape(&mut self, shape: Vec<usize>) -> Result<(), HashError> {
        let expected: usize = shape.iter().product();
        if shape.is_empty() || expected != self.data.len() {
            return Err(HashError::InvalidArray(format!(
                "cannot reshape {} elements into {shape:?}",
                self.data.len()
            )));
        }
        self.shape = shape;
        Ok(())
    }
}
