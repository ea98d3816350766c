//! Typed values and variables.
//!
//! A [`Variable`] is an [`Address`] plus an optional name, comment and
//! [`Value`]. Without a value it is a *read descriptor*; with one it is a
//! *write descriptor*.
//!
//! Value shapes follow the address:
//!
//! | Address | Value |
//! |---------|-------|
//! | `Bit`, no count | [`Value::Bit`] |
//! | `Bit`, count `n` | [`Value::Bits`] of length `n` |
//! | other type, no count | [`Value::Scalar`] of that type |
//! | other type, count `n` | [`Value::Array`] of `n` scalars of that type |
//!
//! [`BitValue::Toggle`] is write-only: reads never produce it.

use crate::address::Address;
use crate::types::DataType;

/// State written to (or read from) a single bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BitValue {
    /// Bit cleared (code 0).
    Off,
    /// Bit set (code 1).
    On,
    /// Invert the current bit (code 2, write only).
    Toggle,
}

impl BitValue {
    /// Maps the numeric codes 0, 1, 2 to a bit value.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_access::BitValue;
    ///
    /// assert_eq!(BitValue::from_code(2), Some(BitValue::Toggle));
    /// assert_eq!(BitValue::from_code(3), None);
    /// ```
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(BitValue::Off),
            1 => Some(BitValue::On),
            2 => Some(BitValue::Toggle),
            _ => None,
        }
    }

    /// Numeric code of this value.
    pub fn code(self) -> u8 {
        match self {
            BitValue::Off => 0,
            BitValue::On => 1,
            BitValue::Toggle => 2,
        }
    }

    /// Returns `true` only for `On`.
    pub fn is_on(self) -> bool {
        matches!(self, BitValue::On)
    }
}

impl From<bool> for BitValue {
    fn from(value: bool) -> Self {
        if value {
            BitValue::On
        } else {
            BitValue::Off
        }
    }
}

/// Single non-bit element.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum Scalar {
    UInt8(u8),
    Int8(i8),
    UInt16(u16),
    Int16(i16),
    UInt32(u32),
    Int32(i32),
    UInt64(u64),
    Int64(i64),
    Float32(f32),
    Float64(f64),
}

impl Scalar {
    /// Type of this element.
    pub fn data_type(&self) -> DataType {
        match self {
            Scalar::UInt8(_) => DataType::UInt8,
            Scalar::Int8(_) => DataType::Int8,
            Scalar::UInt16(_) => DataType::UInt16,
            Scalar::Int16(_) => DataType::Int16,
            Scalar::UInt32(_) => DataType::UInt32,
            Scalar::Int32(_) => DataType::Int32,
            Scalar::UInt64(_) => DataType::UInt64,
            Scalar::Int64(_) => DataType::Int64,
            Scalar::Float32(_) => DataType::Float32,
            Scalar::Float64(_) => DataType::Float64,
        }
    }

    /// Lossy conversion to `f64`, handy for display and scaling.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Scalar::UInt8(v) => f64::from(v),
            Scalar::Int8(v) => f64::from(v),
            Scalar::UInt16(v) => f64::from(v),
            Scalar::Int16(v) => f64::from(v),
            Scalar::UInt32(v) => f64::from(v),
            Scalar::Int32(v) => f64::from(v),
            Scalar::UInt64(v) => v as f64,
            Scalar::Int64(v) => v as f64,
            Scalar::Float32(v) => f64::from(v),
            Scalar::Float64(v) => v,
        }
    }
}

macro_rules! impl_scalar_from {
    ($($num_type:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$num_type> for Scalar {
                fn from(value: $num_type) -> Self {
                    Scalar::$variant(value)
                }
            }

            impl From<$num_type> for Value {
                fn from(value: $num_type) -> Self {
                    Value::Scalar(Scalar::$variant(value))
                }
            }
        )*
    };
}

impl_scalar_from!(
    u8 => UInt8,
    i8 => Int8,
    u16 => UInt16,
    i16 => Int16,
    u32 => UInt32,
    i32 => Int32,
    u64 => UInt64,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
);

/// Value carried by a [`Variable`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Single bit.
    Bit(BitValue),
    /// Consecutive bits.
    Bits(Vec<BitValue>),
    /// Single non-bit element.
    Scalar(Scalar),
    /// Consecutive non-bit elements.
    Array(Vec<Scalar>),
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bit(value.into())
    }
}

impl From<BitValue> for Value {
    fn from(value: BitValue) -> Self {
        Value::Bit(value)
    }
}

impl Value {
    /// Checks that this value has the shape required by `address`.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_access::{parse_address, Value};
    ///
    /// let addr = parse_address("DB1,INT2")?;
    /// assert!(Value::from(5i16).check_shape(&addr).is_ok());
    /// assert!(Value::from(5u16).check_shape(&addr).is_err());
    /// # Ok::<(), s7_access::S7Error>(())
    /// ```
    pub fn check_shape(&self, address: &Address) -> std::result::Result<(), String> {
        let ty = address.data_type();
        match (self, address.count()) {
            (Value::Bit(_), None) if ty.is_bit() => Ok(()),
            (Value::Bits(bits), Some(count)) if ty.is_bit() => {
                expect_len(bits.len(), count)
            }
            (Value::Scalar(s), None) => expect_type(s.data_type(), ty),
            (Value::Array(items), Some(count)) if !ty.is_bit() => {
                expect_len(items.len(), count)?;
                items
                    .iter()
                    .try_for_each(|s| expect_type(s.data_type(), ty))
            }
            (value, _) => Err(format!(
                "{} value does not fit address {}",
                value.kind(),
                address
            )),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Bit(_) => "bit",
            Value::Bits(_) => "bit array",
            Value::Scalar(_) => "scalar",
            Value::Array(_) => "array",
        }
    }

    /// Returns the single scalar, if this is one.
    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Value::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    /// Returns the single bit, if this is one.
    pub fn as_bit(&self) -> Option<BitValue> {
        match self {
            Value::Bit(b) => Some(*b),
            _ => None,
        }
    }
}

fn expect_len(len: usize, count: u32) -> std::result::Result<(), String> {
    if len as u64 == u64::from(count) {
        Ok(())
    } else {
        Err(format!("expected {} elements, got {}", count, len))
    }
}

fn expect_type(got: DataType, want: DataType) -> std::result::Result<(), String> {
    if got == want {
        Ok(())
    } else {
        Err(format!("expected {} value, got {}", want, got))
    }
}

/// An address with optional name, comment and value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Variable {
    /// Location in controller memory.
    pub address: Address,
    /// Symbolic name, `/`-separated for nested data-block fields.
    pub name: Option<String>,
    /// Free-text comment.
    pub comment: Option<String>,
    /// Value to write, or value read.
    pub value: Option<Value>,
}

impl Variable {
    /// Creates a read descriptor.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            name: None,
            comment: None,
            value: None,
        }
    }

    /// Sets the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Sets the value, turning this into a write descriptor.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_access::{parse_address, BitValue, Variable};
    ///
    /// let var = Variable::new(parse_address("M0.3")?).with_value(BitValue::Toggle);
    /// assert!(var.is_write());
    /// # Ok::<(), s7_access::S7Error>(())
    /// ```
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Returns whether a value is set.
    pub fn is_write(&self) -> bool {
        self.value.is_some()
    }
}

impl From<Address> for Variable {
    fn from(address: Address) -> Self {
        Variable::new(address)
    }
}
