//! Typed tensors for the KServe v2 JSON protocol.
//!
//! A tensor is a shape plus a flat row-major element buffer. The buffer is
//! held in a typed `Vec` matching one of the protocol datatypes, so a tensor
//! built locally cannot disagree with the datatype string it is sent under.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::error::{InferError, Result};

// ── Datatypes ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Fp16,
    Fp32,
    Fp64,
    Bf16,
    Bytes,
}

impl DataType {
    /// Wire name of the datatype.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "BOOL",
            Self::Uint8 => "UINT8",
            Self::Uint16 => "UINT16",
            Self::Uint32 => "UINT32",
            Self::Uint64 => "UINT64",
            Self::Int8 => "INT8",
            Self::Int16 => "INT16",
            Self::Int32 => "INT32",
            Self::Int64 => "INT64",
            Self::Fp16 => "FP16",
            Self::Fp32 => "FP32",
            Self::Fp64 => "FP64",
            Self::Bf16 => "BF16",
            Self::Bytes => "BYTES",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = InferError;

    fn from_str(s: &str) -> Result<Self> {
        let dt = match s.trim().to_ascii_uppercase().as_str() {
            "BOOL" => Self::Bool,
            "UINT8" => Self::Uint8,
            "UINT16" => Self::Uint16,
            "UINT32" => Self::Uint32,
            "UINT64" => Self::Uint64,
            "INT8" => Self::Int8,
            "INT16" => Self::Int16,
            "INT32" => Self::Int32,
            "INT64" => Self::Int64,
            "FP16" => Self::Fp16,
            "FP32" => Self::Fp32,
            "FP64" => Self::Fp64,
            "BF16" => Self::Bf16,
            "BYTES" => Self::Bytes,
            _ => return Err(InferError::UnsupportedDataType(s.to_string())),
        };
        Ok(dt)
    }
}

// ── Element buffers ───────────────────────────────────────────────────────

/// Flat element buffer, one variant per datatype with a JSON representation.
///
/// Serializes as a bare JSON array, which is the `data` field of a request
/// input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TensorData {
    Bool(Vec<bool>),
    Uint8(Vec<u8>),
    Uint16(Vec<u16>),
    Uint32(Vec<u32>),
    Uint64(Vec<u64>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Fp32(Vec<f32>),
    Fp64(Vec<f64>),
    Bytes(Vec<String>),
}

impl TensorData {
    pub fn datatype(&self) -> DataType {
        match self {
            Self::Bool(_) => DataType::Bool,
            Self::Uint8(_) => DataType::Uint8,
            Self::Uint16(_) => DataType::Uint16,
            Self::Uint32(_) => DataType::Uint32,
            Self::Uint64(_) => DataType::Uint64,
            Self::Int8(_) => DataType::Int8,
            Self::Int16(_) => DataType::Int16,
            Self::Int32(_) => DataType::Int32,
            Self::Int64(_) => DataType::Int64,
            Self::Fp32(_) => DataType::Fp32,
            Self::Fp64(_) => DataType::Fp64,
            Self::Bytes(_) => DataType::Bytes,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::Uint8(v) => v.len(),
            Self::Uint16(v) => v.len(),
            Self::Uint32(v) => v.len(),
            Self::Uint64(v) => v.len(),
            Self::Int8(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Fp32(v) => v.len(),
            Self::Fp64(v) => v.len(),
            Self::Bytes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse textual elements (as given on the command line) into a buffer
    /// of the requested datatype.
    pub fn parse<S: AsRef<str>>(datatype: DataType, values: &[S]) -> Result<Self> {
        let data = match datatype {
            DataType::Bool => Self::Bool(
                values
                    .iter()
                    .map(|v| match v.as_ref().trim().to_ascii_lowercase().as_str() {
                        "true" | "1" => Ok(true),
                        "false" | "0" => Ok(false),
                        other => Err(invalid(datatype, other)),
                    })
                    .collect::<Result<_>>()?,
            ),
            DataType::Uint8 => Self::Uint8(parse_all(datatype, values)?),
            DataType::Uint16 => Self::Uint16(parse_all(datatype, values)?),
            DataType::Uint32 => Self::Uint32(parse_all(datatype, values)?),
            DataType::Uint64 => Self::Uint64(parse_all(datatype, values)?),
            DataType::Int8 => Self::Int8(parse_all(datatype, values)?),
            DataType::Int16 => Self::Int16(parse_all(datatype, values)?),
            DataType::Int32 => Self::Int32(parse_all(datatype, values)?),
            DataType::Int64 => Self::Int64(parse_all(datatype, values)?),
            DataType::Fp32 => Self::Fp32(parse_all(datatype, values)?),
            DataType::Fp64 => Self::Fp64(parse_all(datatype, values)?),
            DataType::Bytes => {
                Self::Bytes(values.iter().map(|v| v.as_ref().to_string()).collect())
            }
            DataType::Fp16 | DataType::Bf16 => {
                return Err(InferError::UnsupportedDataType(datatype.to_string()));
            }
        };
        Ok(data)
    }

    /// Decode the `data` array of a response output. Nested arrays are
    /// flattened in row-major order.
    pub fn from_json(datatype: DataType, data: &Value) -> Result<Self> {
        let mut flat = Vec::new();
        flatten(data, &mut flat);

        let decoded = match datatype {
            DataType::Bool => Self::Bool(decode_all(datatype, &flat, Value::as_bool)?),
            DataType::Uint8 => Self::Uint8(decode_all(datatype, &flat, as_uint)?),
            DataType::Uint16 => Self::Uint16(decode_all(datatype, &flat, as_uint)?),
            DataType::Uint32 => Self::Uint32(decode_all(datatype, &flat, as_uint)?),
            DataType::Uint64 => Self::Uint64(decode_all(datatype, &flat, Value::as_u64)?),
            DataType::Int8 => Self::Int8(decode_all(datatype, &flat, as_int)?),
            DataType::Int16 => Self::Int16(decode_all(datatype, &flat, as_int)?),
            DataType::Int32 => Self::Int32(decode_all(datatype, &flat, as_int)?),
            DataType::Int64 => Self::Int64(decode_all(datatype, &flat, Value::as_i64)?),
            DataType::Fp32 => {
                Self::Fp32(decode_all(datatype, &flat, |v| v.as_f64().map(|f| f as f32))?)
            }
            DataType::Fp64 => Self::Fp64(decode_all(datatype, &flat, Value::as_f64)?),
            DataType::Bytes => Self::Bytes(decode_all(datatype, &flat, |v| {
                v.as_str().map(str::to_string)
            })?),
            DataType::Fp16 | DataType::Bf16 => {
                return Err(InferError::UnsupportedDataType(datatype.to_string()));
            }
        };
        Ok(decoded)
    }

    fn element_strings(&self) -> Vec<String> {
        fn each<T>(v: &[T], f: impl Fn(&T) -> String) -> Vec<String> {
            v.iter().map(f).collect()
        }
        match self {
            Self::Bool(v) => each(v, ToString::to_string),
            Self::Uint8(v) => each(v, ToString::to_string),
            Self::Uint16(v) => each(v, ToString::to_string),
            Self::Uint32(v) => each(v, ToString::to_string),
            Self::Uint64(v) => each(v, ToString::to_string),
            Self::Int8(v) => each(v, ToString::to_string),
            Self::Int16(v) => each(v, ToString::to_string),
            Self::Int32(v) => each(v, ToString::to_string),
            Self::Int64(v) => each(v, ToString::to_string),
            Self::Fp32(v) => each(v, |x| format!("{x:?}")),
            Self::Fp64(v) => each(v, |x| format!("{x:?}")),
            Self::Bytes(v) => each(v, |s| format!("'{s}'")),
        }
    }
}

fn invalid(datatype: DataType, value: impl fmt::Display) -> InferError {
    InferError::InvalidElement {
        datatype: datatype.to_string(),
        value: value.to_string(),
    }
}

fn parse_all<T: FromStr, S: AsRef<str>>(datatype: DataType, values: &[S]) -> Result<Vec<T>> {
    values
        .iter()
        .map(|v| {
            let v = v.as_ref().trim();
            v.parse::<T>().map_err(|_| invalid(datatype, v))
        })
        .collect()
}

fn decode_all<T>(
    datatype: DataType,
    values: &[&Value],
    decode: impl Fn(&Value) -> Option<T>,
) -> Result<Vec<T>> {
    values
        .iter()
        .map(|&v| decode(v).ok_or_else(|| invalid(datatype, v)))
        .collect()
}

fn as_int<T: TryFrom<i64>>(v: &Value) -> Option<T> {
    v.as_i64().and_then(|n| T::try_from(n).ok())
}

fn as_uint<T: TryFrom<u64>>(v: &Value) -> Option<T> {
    v.as_u64().and_then(|n| T::try_from(n).ok())
}

fn flatten<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| flatten(item, out)),
        other => out.push(other),
    }
}

// ── Tensor ────────────────────────────────────────────────────────────────

/// A shaped, typed tensor. The element count always matches the shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<i64>,
    data: TensorData,
}

impl Tensor {
    pub fn new(shape: Vec<i64>, data: TensorData) -> Result<Self> {
        let expected = element_count(&shape)?;
        if expected != data.len() {
            return Err(InferError::ShapeMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &[i64] {
        &self.shape
    }

    pub fn datatype(&self) -> DataType {
        self.data.datatype()
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }

    pub fn into_parts(self) -> (Vec<i64>, TensorData) {
        (self.shape, self.data)
    }
}

/// Number of elements a shape holds. An empty shape is a scalar.
///
/// Fails with `InvalidShape` on a negative dimension, or when the product of
/// a shape with no zero dimension does not fit in `usize`.
pub fn element_count(shape: &[i64]) -> Result<usize> {
    let invalid = || InferError::InvalidShape(shape.to_vec());
    let dims = shape
        .iter()
        .map(|&dim| usize::try_from(dim).map_err(|_| invalid()))
        .collect::<Result<Vec<_>>>()?;
    if dims.contains(&0) {
        return Ok(0);
    }
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(invalid)
}

/// numpy-style rendering: nested brackets, space-separated elements padded
/// to a common width.
impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // numpy prints every empty array the same way, whatever its shape.
        if !self.shape.is_empty() && self.data.is_empty() {
            return f.write_str("[]");
        }
        let elements = self.data.element_strings();
        let width = elements.iter().map(String::len).max().unwrap_or(0);
        // Shape was validated at construction and holds a non-zero count.
        let dims: Vec<usize> = self.shape.iter().map(|&d| d as usize).collect();
        write_nested(f, &elements, &dims, width, 0)
    }
}

fn write_nested(
    f: &mut fmt::Formatter<'_>,
    elements: &[String],
    dims: &[usize],
    width: usize,
    depth: usize,
) -> fmt::Result {
    let Some((&len, rest)) = dims.split_first() else {
        return match elements.first() {
            Some(e) => write!(f, "{e:>width$}"),
            None => Ok(()),
        };
    };

    let stride: usize = rest.iter().product();
    f.write_str("[")?;
    for i in 0..len {
        if i > 0 {
            if rest.is_empty() {
                f.write_str(" ")?;
            } else {
                for _ in 0..rest.len() {
                    f.write_str("\n")?;
                }
                write!(f, "{:indent$}", "", indent = depth + 1)?;
            }
        }
        let chunk = &elements[i * stride..(i + 1) * stride];
        write_nested(f, chunk, rest, width, depth + 1)?;
    }
    f.write_str("]")
}
