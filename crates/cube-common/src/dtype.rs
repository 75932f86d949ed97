//! Output data types and checked casting.
//!
//! The merge engine accumulates everything in f64; the assembler casts each
//! finished band to its configured output type. Strict casting refuses any
//! conversion that would silently corrupt values (overflow, NaN into an
//! integer type, dropped fractional parts).

use num_traits::{Bounded, NumCast};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output data type for a cube band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    U8,
    I16,
    I32,
    F32,
    #[default]
    F64,
}

impl DataType {
    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Result<Self, DtypeParseError> {
        match s.to_lowercase().as_str() {
            "u8" | "uint8" => Ok(DataType::U8),
            "i16" | "int16" => Ok(DataType::I16),
            "i32" | "int32" => Ok(DataType::I32),
            "f32" | "float32" => Ok(DataType::F32),
            "f64" | "float64" => Ok(DataType::F64),
            _ => Err(DtypeParseError::UnsupportedType(s.to_string())),
        }
    }

    /// Whether this type can represent NaN.
    pub fn is_float(&self) -> bool {
        matches!(self, DataType::F32 | DataType::F64)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::U8 => "u8",
            DataType::I16 => "i16",
            DataType::I32 => "i32",
            DataType::F32 => "f32",
            DataType::F64 => "f64",
        };
        write!(f, "{}", name)
    }
}

/// A typed, flat array of band values.
#[derive(Debug, Clone, PartialEq)]
pub enum DataArray {
    U8(Vec<u8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl DataArray {
    /// The data type of this array.
    pub fn dtype(&self) -> DataType {
        match self {
            DataArray::U8(_) => DataType::U8,
            DataArray::I16(_) => DataType::I16,
            DataArray::I32(_) => DataType::I32,
            DataArray::F32(_) => DataType::F32,
            DataArray::F64(_) => DataType::F64,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            DataArray::U8(v) => v.len(),
            DataArray::I16(v) => v.len(),
            DataArray::I32(v) => v.len(),
            DataArray::F32(v) => v.len(),
            DataArray::F64(v) => v.len(),
        }
    }

    /// Check if the array is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read an element back as f64.
    pub fn get(&self, index: usize) -> Option<f64> {
        match self {
            DataArray::U8(v) => v.get(index).map(|&x| x as f64),
            DataArray::I16(v) => v.get(index).map(|&x| x as f64),
            DataArray::I32(v) => v.get(index).map(|&x| x as f64),
            DataArray::F32(v) => v.get(index).map(|&x| x as f64),
            DataArray::F64(v) => v.get(index).copied(),
        }
    }
}

/// Cast a slice of f64 values to the target data type.
///
/// In strict mode the cast fails on overflow, on NaN into an integer type,
/// and on fractional values into an integer type. In lenient mode integer
/// targets round and saturate, and NaN falls back to the band's nodata
/// value.
pub fn cast_values(
    values: &[f64],
    dtype: DataType,
    nodata: f64,
    strict: bool,
) -> Result<DataArray, CastError> {
    match dtype {
        DataType::F64 => Ok(DataArray::F64(values.to_vec())),
        DataType::F32 => {
            let mut out = Vec::with_capacity(values.len());
            for &v in values {
                let cast = v as f32;
                if strict && v.is_finite() && !cast.is_finite() {
                    return Err(CastError::Overflow { value: v, dtype });
                }
                out.push(cast);
            }
            Ok(DataArray::F32(out))
        }
        DataType::U8 => cast_integer::<u8>(values, dtype, nodata, strict).map(DataArray::U8),
        DataType::I16 => cast_integer::<i16>(values, dtype, nodata, strict).map(DataArray::I16),
        DataType::I32 => cast_integer::<i32>(values, dtype, nodata, strict).map(DataArray::I32),
    }
}

fn cast_integer<T>(
    values: &[f64],
    dtype: DataType,
    nodata: f64,
    strict: bool,
) -> Result<Vec<T>, CastError>
where
    T: NumCast + Bounded + Copy,
{
    let min = <T as Bounded>::min_value();
    let max = <T as Bounded>::max_value();
    let min_f: f64 = NumCast::from(min).unwrap_or(f64::MIN);
    let max_f: f64 = NumCast::from(max).unwrap_or(f64::MAX);

    let fallback = nodata.round().clamp(min_f, max_f);
    let fallback: T = NumCast::from(fallback).unwrap_or(min);

    let mut out = Vec::with_capacity(values.len());
    for &v in values {
        if v.is_nan() {
            if strict {
                return Err(CastError::NanIntoInteger { dtype });
            }
            out.push(fallback);
            continue;
        }
        let rounded = v.round();
        if strict && (v - rounded).abs() > f64::EPSILON * v.abs().max(1.0) {
            return Err(CastError::PrecisionLoss { value: v, dtype });
        }
        if rounded < min_f || rounded > max_f {
            if strict {
                return Err(CastError::Overflow { value: v, dtype });
            }
            out.push(if rounded < min_f { min } else { max });
            continue;
        }
        // Safe: range-checked above
        out.push(NumCast::from(rounded).unwrap_or(fallback));
    }
    Ok(out)
}

#[derive(Debug, thiserror::Error)]
pub enum CastError {
    #[error("value {value} overflows {dtype}")]
    Overflow { value: f64, dtype: DataType },

    #[error("NaN cannot be represented as {dtype}")]
    NanIntoInteger { dtype: DataType },

    #[error("value {value} loses precision when cast to {dtype}")]
    PrecisionLoss { value: f64, dtype: DataType },
}

#[derive(Debug, thiserror::Error)]
pub enum DtypeParseError {
    #[error("Unsupported data type: {0}")]
    UnsupportedType(String),
}
