//! Encoding of scalar values to and from controller bytes.
//!
//! S7 controllers store multi-byte values big-endian. Every encode and decode
//! in this crate goes through this module, so the byte order is fixed in one
//! place.
//!
//! # Example
//!
//! ```
//! use s7_access::codec::{decode, encode};
//! use s7_access::{DataType, Scalar};
//!
//! assert_eq!(encode(&Scalar::Int16(-2)), vec![0xFF, 0xFE]);
//! assert_eq!(decode(&[0x41, 0x20, 0x00, 0x00], DataType::Float32)?, Scalar::Float32(10.0));
//! # Ok::<(), s7_access::S7Error>(())
//! ```

use crate::error::{Result, S7Error};
use crate::types::DataType;
use crate::value::Scalar;

/// Big-endian fixed-width conversion for one primitive type.
trait BigEndian: Sized {
    fn decode_be(bytes: &[u8]) -> Option<Self>;
    fn encode_be(self) -> Vec<u8>;
}

macro_rules! impl_big_endian {
    ($($num_type:ty),*) => {
        $(
            impl BigEndian for $num_type {
                fn decode_be(bytes: &[u8]) -> Option<Self> {
                    let array = bytes.try_into().ok()?;
                    Some(<$num_type>::from_be_bytes(array))
                }

                fn encode_be(self) -> Vec<u8> {
                    self.to_be_bytes().to_vec()
                }
            }
        )*
    };
}

impl_big_endian!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Encodes a scalar to its big-endian bytes.
pub fn encode(value: &Scalar) -> Vec<u8> {
    match *value {
        Scalar::UInt8(v) => v.encode_be(),
        Scalar::Int8(v) => v.encode_be(),
        Scalar::UInt16(v) => v.encode_be(),
        Scalar::Int16(v) => v.encode_be(),
        Scalar::UInt32(v) => v.encode_be(),
        Scalar::Int32(v) => v.encode_be(),
        Scalar::UInt64(v) => v.encode_be(),
        Scalar::Int64(v) => v.encode_be(),
        Scalar::Float32(v) => v.encode_be(),
        Scalar::Float64(v) => v.encode_be(),
    }
}

/// Encodes consecutive scalars into one buffer.
pub fn encode_array(values: &[Scalar]) -> Vec<u8> {
    values.iter().flat_map(encode).collect()
}

/// Decodes exactly one element of `data_type` from `bytes`.
///
/// # Errors
///
/// Returns `Codec` if `data_type` is `Bit` or `bytes` has the wrong length.
pub fn decode(bytes: &[u8], data_type: DataType) -> Result<Scalar> {
    let value = match data_type {
        DataType::Bit => {
            return Err(S7Error::codec("bits are not decoded as scalars"));
        }
        DataType::UInt8 => u8::decode_be(bytes).map(Scalar::UInt8),
        DataType::Int8 => i8::decode_be(bytes).map(Scalar::Int8),
        DataType::UInt16 => u16::decode_be(bytes).map(Scalar::UInt16),
        DataType::Int16 => i16::decode_be(bytes).map(Scalar::Int16),
        DataType::UInt32 => u32::decode_be(bytes).map(Scalar::UInt32),
        DataType::Int32 => i32::decode_be(bytes).map(Scalar::Int32),
        DataType::UInt64 => u64::decode_be(bytes).map(Scalar::UInt64),
        DataType::Int64 => i64::decode_be(bytes).map(Scalar::Int64),
        DataType::Float32 => f32::decode_be(bytes).map(Scalar::Float32),
        DataType::Float64 => f64::decode_be(bytes).map(Scalar::Float64),
    };
    value.ok_or_else(|| {
        S7Error::codec(format!(
            "{} needs {} bytes, got {}",
            data_type,
            data_type.size(),
            bytes.len()
        ))
    })
}

/// Decodes `count` consecutive elements of `data_type`.
///
/// # Errors
///
/// Returns `Codec` if `bytes` does not hold exactly `count` elements.
pub fn decode_array(bytes: &[u8], data_type: DataType, count: u32) -> Result<Vec<Scalar>> {
    let size = data_type.size() as usize;
    if bytes.len() as u64 != size as u64 * u64::from(count) {
        return Err(S7Error::codec(format!(
            "{} x {} needs {} bytes, got {}",
            count,
            data_type,
            size as u64 * u64::from(count),
            bytes.len()
        )));
    }
    bytes
        .chunks_exact(size)
        .map(|chunk| decode(chunk, data_type))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_big_endian() {
        assert_eq!(encode(&Scalar::UInt16(0x1234)), vec![0x12, 0x34]);
        assert_eq!(encode(&Scalar::Int32(-1)), vec![0xFF; 4]);
        assert_eq!(
            encode(&Scalar::Float64(1.0)),
            hex::decode("3ff0000000000000").unwrap()
        );
        assert_eq!(encode(&Scalar::Int8(-128)), vec![0x80]);
    }

    #[test]
    fn test_decode() {
        assert_eq!(
            decode(&hex::decode("fffe").unwrap(), DataType::Int16).unwrap(),
            Scalar::Int16(-2)
        );
        assert_eq!(
            decode(&hex::decode("00000000000003e8").unwrap(), DataType::UInt64).unwrap(),
            Scalar::UInt64(1000)
        );
        assert!(decode(&[0x00], DataType::Int16).is_err());
        assert!(decode(&[0x00], DataType::Bit).is_err());
    }

    #[test]
    fn test_array() {
        let values = [Scalar::Int16(1), Scalar::Int16(-1), Scalar::Int16(256)];
        let bytes = encode_array(&values);
        assert_eq!(hex::encode(&bytes), "0001ffff0100");
        assert_eq!(decode_array(&bytes, DataType::Int16, 3).unwrap(), values);
        assert!(decode_array(&bytes, DataType::Int16, 2).is_err());
    }
}
