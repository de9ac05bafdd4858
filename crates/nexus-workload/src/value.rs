//! Typed scalar values and rowkeys.
//!
//! # Encoding Format
//!
//! Values and rowkeys are part of the mutator encoding:
//! - Value: type tag (1 byte) + payload
//!   - Int / Double: 8 bytes big-endian
//!   - Float: 4 bytes big-endian
//!   - Varchar: length (4 bytes) + data
//! - Rowkey: kind tag (1 byte), then for typed keys a value count (4 bytes)
//!   followed by the values, for binary keys a length (4 bytes) + data

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::catalog::ColumnType;

/// Type tags for the binary encoding.
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
enum ValueTag {
    Null = 0,
    Int = 1,
    Float = 2,
    Double = 3,
    Varchar = 4,
}

/// Rowkey kind tags.
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
enum RowkeyTag {
    Min = 0,
    Max = 1,
    Typed = 2,
    Binary = 3,
}

/// A typed scalar produced by the generator.
///
/// Varchar payloads are views into the scratch arena of the invocation that
/// produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// 64-bit signed integer.
    Int(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// Variable-length string.
    Varchar(Bytes),
}

impl Value {
    /// Returns the column type this value conforms to, or `None` for NULL.
    #[must_use]
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::Int(_) => Some(ColumnType::Int),
            Value::Float(_) => Some(ColumnType::Float),
            Value::Double(_) => Some(ColumnType::Double),
            Value::Varchar(_) => Some(ColumnType::Varchar),
        }
    }

    /// Returns true if the value conforms to `ty`.
    #[must_use]
    pub fn conforms_to(&self, ty: ColumnType) -> bool {
        self.column_type() == Some(ty)
    }

    /// Returns the integer payload, if any.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the number of bytes [`Value::encode_into`] writes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        1 + match self {
            Value::Null => 0,
            Value::Int(_) | Value::Double(_) => 8,
            Value::Float(_) => 4,
            Value::Varchar(s) => 4 + s.len(),
        }
    }

    /// Appends the binary encoding of this value.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        match self {
            Value::Null => buf.put_u8(ValueTag::Null as u8),
            Value::Int(v) => {
                buf.put_u8(ValueTag::Int as u8);
                buf.put_i64(*v);
            }
            Value::Float(v) => {
                buf.put_u8(ValueTag::Float as u8);
                buf.put_f32(*v);
            }
            Value::Double(v) => {
                buf.put_u8(ValueTag::Double as u8);
                buf.put_f64(*v);
            }
            Value::Varchar(s) => {
                buf.put_u8(ValueTag::Varchar as u8);
                put_len(buf, s.len());
                buf.put_slice(s);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Varchar(s) => write!(f, "'{}'", String::from_utf8_lossy(s)),
        }
    }
}

/// A rowkey: the ordered values identifying one row.
#[derive(Debug, Clone, PartialEq)]
pub enum Rowkey {
    /// Absolute lower bound marker.
    Min,
    /// Absolute upper bound marker.
    Max,
    /// Composite key, one value per rowkey column in declared order.
    Typed(Vec<Value>),
    /// Single binary key (legacy rowkey mode).
    Binary(Bytes),
}

impl Rowkey {
    /// Returns true for the `Min` or `Max` markers.
    #[must_use]
    pub fn is_bound_marker(&self) -> bool {
        matches!(self, Rowkey::Min | Rowkey::Max)
    }

    /// Returns the typed values, if this is a composite key.
    #[must_use]
    pub fn values(&self) -> Option<&[Value]> {
        match self {
            Rowkey::Typed(values) => Some(values),
            _ => None,
        }
    }

    /// Returns the number of bytes [`Rowkey::encode_into`] writes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        1 + match self {
            Rowkey::Min | Rowkey::Max => 0,
            Rowkey::Typed(values) => 4 + values.iter().map(Value::encoded_len).sum::<usize>(),
            Rowkey::Binary(bytes) => 4 + bytes.len(),
        }
    }

    /// Appends the binary encoding of this rowkey.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        match self {
            Rowkey::Min => buf.put_u8(RowkeyTag::Min as u8),
            Rowkey::Max => buf.put_u8(RowkeyTag::Max as u8),
            Rowkey::Typed(values) => {
                buf.put_u8(RowkeyTag::Typed as u8);
                put_len(buf, values.len());
                for value in values {
                    value.encode_into(buf);
                }
            }
            Rowkey::Binary(bytes) => {
                buf.put_u8(RowkeyTag::Binary as u8);
                put_len(buf, bytes.len());
                buf.put_slice(bytes);
            }
        }
    }
}

impl fmt::Display for Rowkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rowkey::Min => write!(f, "MIN"),
            Rowkey::Max => write!(f, "MAX"),
            Rowkey::Typed(values) => {
                write!(f, "(")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
            Rowkey::Binary(bytes) => write!(f, "0x{}", hex::encode(bytes)),
        }
    }
}

/// Writes a 4-byte length prefix. Lengths are bounded by the scratch arena,
/// far below `u32::MAX`.
pub(crate) fn put_len(buf: &mut BytesMut, len: usize) {
    #[allow(clippy::cast_possible_truncation)]
    buf.put_u32(len as u32);
}
