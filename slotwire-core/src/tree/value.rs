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

use serde::{Deserialize, Serialize};

use crate::tree::{Hash, NdArray};

/// A complex number with real part `re` and imaginary part `im`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Complex<T> {
    pub re: T,
    pub im: T,
}

impl<T> Complex<T> {
    pub const fn new(re: T, im: T) -> Self {
        Self { re, im }
    }
}

impl<T: fmt::Display> fmt::Display for Complex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.re, self.im)
    }
}

/// The closed set of reference types a [`Value`] can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    None,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    ComplexFloat,
    ComplexDouble,
    String,
    Hash,
    VectorBool,
    VectorInt8,
    VectorInt16,
    VectorInt32,
    VectorInt64,
    VectorUInt8,
    VectorUInt16,
    VectorUInt32,
    VectorUInt64,
    VectorFloat,
    VectorDouble,
    VectorComplexFloat,
    VectorComplexDouble,
    VectorString,
    VectorHash,
    NdArray,
}

impl ValueType {
    /// Upper-case wire name of the type, e.g. `INT32` or `VECTOR_HASH`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Bool => "BOOL",
            Self::Int8 => "INT8",
            Self::Int16 => "INT16",
            Self::Int32 => "INT32",
            Self::Int64 => "INT64",
            Self::UInt8 => "UINT8",
            Self::UInt16 => "UINT16",
            Self::UInt32 => "UINT32",
            Self::UInt64 => "UINT64",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::ComplexFloat => "COMPLEX_FLOAT",
            Self::ComplexDouble => "COMPLEX_DOUBLE",
            Self::String => "STRING",
            Self::Hash => "HASH",
            Self::VectorBool => "VECTOR_BOOL",
            Self::VectorInt8 => "VECTOR_INT8",
            Self::VectorInt16 => "VECTOR_INT16",
            Self::VectorInt32 => "VECTOR_INT32",
            Self::VectorInt64 => "VECTOR_INT64",
            Self::VectorUInt8 => "VECTOR_UINT8",
            Self::VectorUInt16 => "VECTOR_UINT16",
            Self::VectorUInt32 => "VECTOR_UINT32",
            Self::VectorUInt64 => "VECTOR_UINT64",
            Self::VectorFloat => "VECTOR_FLOAT",
            Self::VectorDouble => "VECTOR_DOUBLE",
            Self::VectorComplexFloat => "VECTOR_COMPLEX_FLOAT",
            Self::VectorComplexDouble => "VECTOR_COMPLEX_DOUBLE",
            Self::VectorString => "VECTOR_STRING",
            Self::VectorHash => "VECTOR_HASH",
            Self::NdArray => "ND_ARRAY",
        }
    }

    pub const fn is_sequence(self) -> bool {
        matches!(
            self,
            Self::VectorBool
                | Self::VectorInt8
                | Self::VectorInt16
                | Self::VectorInt32
                | Self::VectorInt64
                | Self::VectorUInt8
                | Self::VectorUInt16
                | Self::VectorUInt32
                | Self::VectorUInt64
                | Self::VectorFloat
                | Self::VectorDouble
                | Self::VectorComplexFloat
                | Self::VectorComplexDouble
                | Self::VectorString
                | Self::VectorHash
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dynamically typed value stored in a [`Hash`] node or attribute.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    ComplexF32(Complex<f32>),
    ComplexF64(Complex<f64>),
    String(String),
    Hash(Hash),
    VecBool(Vec<bool>),
    VecI8(Vec<i8>),
    VecI16(Vec<i16>),
    VecI32(Vec<i32>),
    VecI64(Vec<i64>),
    VecU8(Vec<u8>),
    VecU16(Vec<u16>),
    VecU32(Vec<u32>),
    VecU64(Vec<u64>),
    VecF32(Vec<f32>),
    VecF64(Vec<f64>),
    VecComplexF32(Vec<Complex<f32>>),
    VecComplexF64(Vec<Complex<f64>>),
    VecString(Vec<String>),
    VecHash(Vec<Hash>),
    NdArray(NdArray),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::None => ValueType::None,
            Self::Bool(_) => ValueType::Bool,
            Self::I8(_) => ValueType::Int8,
            Self::I16(_) => ValueType::Int16,
            Self::I32(_) => ValueType::Int32,
            Self::I64(_) => ValueType::Int64,
            Self::U8(_) => ValueType::UInt8,
            Self::U16(_) => ValueType::UInt16,
            Self::U32(_) => ValueType::UInt32,
            Self::U64(_) => ValueType::UInt64,
            Self::F32(_) => ValueType::Float,
            Self::F64(_) => ValueType::Double,
            Self::ComplexF32(_) => ValueType::ComplexFloat,
            Self::ComplexF64(_) => ValueType::ComplexDouble,
            Self::String(_) => ValueType::String,
            Self::Hash(_) => ValueType::Hash,
            Self::VecBool(_) => ValueType::VectorBool,
            Self::VecI8(_) => ValueType::VectorInt8,
            Self::VecI16(_) => ValueType::VectorInt16,
            Self::VecI32(_) => ValueType::VectorInt32,
            Self::VecI64(_) => ValueType::VectorInt64,
            Self::VecU8(_) => ValueType::VectorUInt8,
            Self::VecU16(_) => ValueType::VectorUInt16,
            Self::VecU32(_) => ValueType::VectorUInt32,
            Self::VecU64(_) => ValueType::VectorUInt64,
            Self::VecF32(_) => ValueType::VectorFloat,
            Self::VecF64(_) => ValueType::VectorDouble,
            Self::VecComplexF32(_) => ValueType::VectorComplexFloat,
            Self::VecComplexF64(_) => ValueType::VectorComplexDouble,
            Self::VecString(_) => ValueType::VectorString,
            Self::VecHash(_) => ValueType::VectorHash,
            Self::NdArray(_) => ValueType::NdArray,
        }
    }

    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub const fn as_hash(&self) -> Option<&Hash> {
        match self {
            Self::Hash(hash) => Some(hash),
            _ => None,
        }
    }

    pub fn as_hash_mut(&mut self) -> Option<&mut Hash> {
        match self {
            Self::Hash(hash) => Some(hash),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub const fn as_vec_hash(&self) -> Option<&Vec<Hash>> {
        match self {
            Self::VecHash(hashes) => Some(hashes),
            _ => None,
        }
    }

    pub fn as_vec_hash_mut(&mut self) -> Option<&mut Vec<Hash>> {
        match self {
            Self::VecHash(hashes) => Some(hashes),
            _ => None,
        }
    }
}

fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Bool(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::ComplexF32(v) => write!(f, "{v}"),
            Self::ComplexF64(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
            Self::Hash(h) => write!(f, "Hash({} keys)", h.len()),
            Self::VecBool(v) => join(f, v),
            Self::VecI8(v) => join(f, v),
            Self::VecI16(v) => join(f, v),
            Self::VecI32(v) => join(f, v),
            Self::VecI64(v) => join(f, v),
            Self::VecU8(v) => join(f, v),
            Self::VecU16(v) => join(f, v),
            Self::VecU32(v) => join(f, v),
            Self::VecU64(v) => join(f, v),
            Self::VecF32(v) => join(f, v),
            Self::VecF64(v) => join(f, v),
            Self::VecComplexF32(v) => join(f, v),
            Self::VecComplexF64(v) => join(f, v),
            Self::VecString(v) => join(f, v),
            Self::VecHash(v) => write!(f, "[{} hashes]", v.len()),
            Self::NdArray(a) => write!(f, "NDArray{:?}", a.shape()),
        }
    }
}

/// Rust types that map one-to-one onto a [`Value`] variant.
///
/// This is the exact-type access used by `Hash::get`: no conversion is ever
/// attempted, a differently typed value is a mismatch.
pub trait HashValue: Sized + Into<Value> {
    const VALUE_TYPE: ValueType;

    fn from_ref(value: &Value) -> Option<&Self>;

    fn from_mut(value: &mut Value) -> Option<&mut Self>;

    /// Takes ownership of the payload, handing the value back on mismatch.
    fn from_value(value: Value) -> Result<Self, Value>;

    /// Projection used for indexed paths (`list[2]`), which address a bare
    /// hash inside a sequence rather than a value.
    fn from_hash(_hash: &Hash) -> Option<&Self> {
        None
    }

    fn from_hash_mut(_hash: &mut Hash) -> Option<&mut Self> {
        None
    }
}

macro_rules! hash_value {
    ($($ty:ty => $variant:ident, $value_type:ident;)*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }

            impl HashValue for $ty {
                const VALUE_TYPE: ValueType = ValueType::$value_type;

                fn from_ref(value: &Value) -> Option<&Self> {
                    match value {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn from_mut(value: &mut Value) -> Option<&mut Self> {
                    match value {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn from_value(value: Value) -> Result<Self, Value> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

hash_value! {
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
    Complex<f32> => ComplexF32, ComplexFloat;
    Complex<f64> => ComplexF64, ComplexDouble;
    String => String, String;
    Vec<bool> => VecBool, VectorBool;
    Vec<i8> => VecI8, VectorInt8;
    Vec<i16> => VecI16, VectorInt16;
    Vec<i32> => VecI32, VectorInt32;
    Vec<i64> => VecI64, VectorInt64;
    Vec<u8> => VecU8, VectorUInt8;
    Vec<u16> => VecU16, VectorUInt16;
    Vec<u32> => VecU32, VectorUInt32;
    Vec<u64> => VecU64, VectorUInt64;
    Vec<f32> => VecF32, VectorFloat;
    Vec<f64> => VecF64, VectorDouble;
    Vec<Complex<f32>> => VecComplexF32, VectorComplexFloat;
    Vec<Complex<f64>> => VecComplexF64, VectorComplexDouble;
    Vec<String> => VecString, VectorString;
    Vec<Hash> => VecHash, VectorHash;
    NdArray => NdArray, NdArray;
}

impl From<Hash> for Value {
    fn from(v: Hash) -> Self {
        Self::Hash(v)
    }
}

impl HashValue for Hash {
    const VALUE_TYPE: ValueType = ValueType::Hash;

    fn from_ref(value: &Value) -> Option<&Self> {
        value.as_hash()
    }

    fn from_mut(value: &mut Value) -> Option<&mut Self> {
        value.as_hash_mut()
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Hash(hash) => Ok(hash),
            other => Err(other),
        }
    }

    fn from_hash(hash: &Hash) -> Option<&Self> {
        Some(hash)
    }

    fn from_hash_mut(hash: &mut Hash) -> Option<&mut Self> {
        Some(hash)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Self::String(v.clone())
    }
}

impl From<Vec<&str>> for Value {
    fn from(v: Vec<&str>) -> Self {
        Self::VecString(v.into_iter().map(str::to_string).collect())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Self::None
    }
}
