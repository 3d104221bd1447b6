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

//! Conversions behind `get_as`.
//!
//! Integer targets are range checked and never wrap. Float sources are
//! truncated toward zero when converted to integers; NaN and infinity are
//! rejected. Strings are parsed after trimming, and sequences can be read
//! from comma separated strings.

use crate::error::HashError;
use crate::tree::{Complex, Value, ValueType};

/// Types that can be produced from a stored [`Value`] by conversion.
pub trait ValueAs: Sized {
    /// Name of the target used in cast errors.
    const TARGET: &'static str;

    fn value_as(value: &Value) -> Result<Self, HashError>;
}

/// Intermediate numeric form every convertible scalar reduces to.
enum Scalar {
    Int(i128),
    Float(f64),
}

fn fail(value: &Value, to: &'static str, reason: impl Into<String>) -> HashError {
    HashError::cast("", value.value_type(), to, reason)
}

fn parse_scalar(value: &Value, text: &str, to: &'static str) -> Result<Scalar, HashError> {
    let text = text.trim();
    if let Ok(i) = text.parse::<i128>() {
        return Ok(Scalar::Int(i));
    }
    text.parse::<f64>()
        .map(Scalar::Float)
        .map_err(|_| fail(value, to, format!("'{text}' is not a number")))
}

fn scalar(value: &Value, to: &'static str) -> Result<Scalar, HashError> {
    Ok(match value {
        Value::Bool(b) => Scalar::Int(i128::from(*b)),
        Value::I8(v) => Scalar::Int(i128::from(*v)),
        Value::I16(v) => Scalar::Int(i128::from(*v)),
        Value::I32(v) => Scalar::Int(i128::from(*v)),
        Value::I64(v) => Scalar::Int(i128::from(*v)),
        Value::U8(v) => Scalar::Int(i128::from(*v)),
        Value::U16(v) => Scalar::Int(i128::from(*v)),
        Value::U32(v) => Scalar::Int(i128::from(*v)),
        Value::U64(v) => Scalar::Int(i128::from(*v)),
        Value::F32(v) => Scalar::Float(f64::from(*v)),
        Value::F64(v) => Scalar::Float(*v),
        Value::String(s) => return parse_scalar(value, s, to),
        _ => return Err(fail(value, to, "not a scalar number")),
    })
}

macro_rules! integer_as {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl ValueAs for $ty {
                const TARGET: &'static str = $name;

                fn value_as(value: &Value) -> Result<Self, HashError> {
                    let wide = match scalar(value, Self::TARGET)? {
                        Scalar::Int(i) => i,
                        Scalar::Float(f) => {
                            if !f.is_finite() {
                                return Err(fail(value, Self::TARGET, format!("{f} is not finite")));
                            }
                            let t = f.trunc();
                            if t < <$ty>::MIN as f64 || t > <$ty>::MAX as f64 {
                                return Err(fail(value, Self::TARGET, format!("{f} is out of range")));
                            }
                            t as i128
                        }
                    };
                    <$ty>::try_from(wide)
                        .map_err(|_| fail(value, Self::TARGET, format!("{wide} is out of range")))
                }
            }
        )*
    };
}

integer_as! {
    i8 => "INT8",
    i16 => "INT16",
    i32 => "INT32",
    i64 => "INT64",
    u8 => "UINT8",
    u16 => "UINT16",
    u32 => "UINT32",
    u64 => "UINT64",
}

impl ValueAs for f64 {
    const TARGET: &'static str = "DOUBLE";

    fn value_as(value: &Value) -> Result<Self, HashError> {
        Ok(match scalar(value, Self::TARGET)? {
            Scalar::Int(i) => i as f64,
            Scalar::Float(f) => f,
        })
    }
}

impl ValueAs for f32 {
    const TARGET: &'static str = "FLOAT";

    fn value_as(value: &Value) -> Result<Self, HashError> {
        match scalar(value, Self::TARGET)? {
            Scalar::Int(i) => Ok(i as f32),
            Scalar::Float(f) if f.is_nan() => Err(fail(value, Self::TARGET, format!("{f} is not finite"))),
            Scalar::Float(f) if f.abs() > f64::from(f32::MAX) => {
                Err(fail(value, Self::TARGET, format!("{f} exceeds the float range")))
            }
            Scalar::Float(f) => Ok(f as f32),
        }
    }
}

impl ValueAs for bool {
    const TARGET: &'static str = "BOOL";

    fn value_as(value: &Value) -> Result<Self, HashError> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "y" => Ok(true),
                "false" | "0" | "no" | "n" => Ok(false),
                other => Err(fail(value, Self::TARGET, format!("'{other}' is not a boolean"))),
            },
            Value::F32(_) | Value::F64(_) => Err(fail(value, Self::TARGET, "floats do not convert to bool")),
            _ => match scalar(value, Self::TARGET)? {
                Scalar::Int(0) => Ok(false),
                Scalar::Int(1) => Ok(true),
                Scalar::Int(i) => Err(fail(value, Self::TARGET, format!("{i} is neither 0 nor 1"))),
                Scalar::Float(_) => Err(fail(value, Self::TARGET, "floats do not convert to bool")),
            },
        }
    }
}

fn join<T>(items: &[T], f: impl Fn(&T) -> String) -> String {
    items.iter().map(f).collect::<Vec<_>>().join(",")
}

impl ValueAs for String {
    const TARGET: &'static str = "STRING";

    fn value_as(value: &Value) -> Result<Self, HashError> {
        let bool_text = |b: &bool| if *b { "1" } else { "0" }.to_string();
        Ok(match value {
            Value::None => String::new(),
            Value::Bool(b) => bool_text(b),
            Value::String(s) => s.clone(),
            Value::Hash(h) => h.to_string(),
            Value::VecBool(v) => join(v, bool_text),
            Value::VecString(v) => v.join(","),
            Value::VecHash(_) | Value::NdArray(_) => {
                return Err(fail(value, Self::TARGET, "no textual form"));
            }
            other => other.to_string(),
        })
    }
}

fn parse_complex(value: &Value, text: &str, to: &'static str) -> Result<Complex<f64>, HashError> {
    let inner = text.trim().trim_start_matches('(').trim_end_matches(')');
    let mut parts = inner.split(',').map(str::trim);
    let mut next = || -> Result<f64, HashError> {
        parts
            .next()
            .and_then(|p| p.parse::<f64>().ok())
            .ok_or_else(|| fail(value, to, format!("'{text}' is not a complex number")))
    };
    let re = next()?;
    let im = next()?;
    Ok(Complex::new(re, im))
}

impl ValueAs for Complex<f64> {
    const TARGET: &'static str = "COMPLEX_DOUBLE";

    fn value_as(value: &Value) -> Result<Self, HashError> {
        match value {
            Value::ComplexF64(c) => Ok(*c),
            Value::ComplexF32(c) => Ok(Complex::new(f64::from(c.re), f64::from(c.im))),
            Value::String(s) if s.contains(',') => parse_complex(value, s, Self::TARGET),
            _ => Ok(Complex::new(f64::value_as(value)?, 0.0)),
        }
    }
}

impl ValueAs for Complex<f32> {
    const TARGET: &'static str = "COMPLEX_FLOAT";

    fn value_as(value: &Value) -> Result<Self, HashError> {
        let wide = Complex::<f64>::value_as(value)?;
        let narrow = |part: f64| {
            f32::value_as(&Value::F64(part)).map_err(|_| fail(value, Self::TARGET, "exceeds the float range"))
        };
        Ok(Complex::new(narrow(wide.re)?, narrow(wide.im)?))
    }
}

/// Splits a stored value into element values for sequence conversions.
fn elements(value: &Value, to: &'static str) -> Result<Vec<Value>, HashError> {
    fn each<T: Clone + Into<Value>>(items: &[T]) -> Vec<Value> {
        items.iter().cloned().map(Into::into).collect()
    }
    Ok(match value {
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        Value::String(s) => s.split(',').map(|p| Value::String(p.trim().to_string())).collect(),
        Value::VecBool(v) => each(v),
        Value::VecI8(v) => each(v),
        Value::VecI16(v) => each(v),
        Value::VecI32(v) => each(v),
        Value::VecI64(v) => each(v),
        Value::VecU8(v) => each(v),
        Value::VecU16(v) => each(v),
        Value::VecU32(v) => each(v),
        Value::VecU64(v) => each(v),
        Value::VecF32(v) => each(v),
        Value::VecF64(v) => each(v),
        Value::VecComplexF32(v) => each(v),
        Value::VecComplexF64(v) => each(v),
        Value::VecString(v) => each(v),
        _ => return Err(fail(value, to, "not a sequence")),
    })
}

macro_rules! sequence_as {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl ValueAs for Vec<$ty> {
                const TARGET: &'static str = $name;

                fn value_as(value: &Value) -> Result<Self, HashError> {
                    elements(value, Self::TARGET)?
                        .iter()
                        .map(|element| {
                            <$ty>::value_as(element).map_err(|e| match e {
                                HashError::Cast { reason, .. } => fail(value, Self::TARGET, reason),
                                other => other,
                            })
                        })
                        .collect()
                }
            }
        )*
    };
}

sequence_as! {
    bool => "VECTOR_BOOL",
    i8 => "VECTOR_INT8",
    i16 => "VECTOR_INT16",
    i32 => "VECTOR_INT32",
    i64 => "VECTOR_INT64",
    u8 => "VECTOR_UINT8",
    u16 => "VECTOR_UINT16",
    u32 => "VECTOR_UINT32",
    u64 => "VECTOR_UINT64",
    f32 => "VECTOR_FLOAT",
    f64 => "VECTOR_DOUBLE",
    String => "VECTOR_STRING",
}

impl ValueAs for Value {
    const TARGET: &'static str = "ANY";

    fn value_as(value: &Value) -> Result<Self, HashError> {
        Ok(value.clone())
    }
}

impl ValueType {
    /// Whether a value of this type can be read as a number through `get_as`.
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Bool
                | Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::UInt8
                | Self::UInt16
                | Self::UInt32
                | Self::UInt64
                | Self::Float
                | Self::Double
        )
    }
}
