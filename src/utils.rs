//! Bit manipulation helpers for controller byte buffers.
//!
//! S7 bit addresses count bits from the least significant bit of a byte, and
//! bit runs continue into the next byte: bit 7 of byte `n` is followed by
//! bit 0 of byte `n + 1`. The cursor helpers here work on absolute bit
//! positions `byte * 8 + bit` within a buffer.
//!
//! # Example
//!
//! ```
//! use s7_access::utils::{get_bit, read_bits, set_bit};
//!
//! let byte = set_bit(0, 5, true);
//! assert!(get_bit(byte, 5));
//!
//! // Three bits starting at bit 7 of byte 0 cross into byte 1.
//! let bits = read_bits(&[0b1000_0000, 0b0000_0010], 7, 3);
//! assert_eq!(bits, vec![true, false, true]);
//! ```

use crate::value::BitValue;

/// Gets a single bit from a byte.
///
/// # Example
///
/// ```
/// use s7_access::utils::get_bit;
///
/// let value: u8 = 0b0000_0101;
/// assert!(get_bit(value, 0));
/// assert!(!get_bit(value, 1));
/// assert!(get_bit(value, 2));
/// ```
#[inline]
pub fn get_bit(value: u8, bit: u8) -> bool {
    (value & (1 << bit)) != 0
}

/// Sets or clears a single bit in a byte.
#[inline]
pub fn set_bit(value: u8, bit: u8, state: bool) -> u8 {
    if state {
        value | (1 << bit)
    } else {
        value & !(1 << bit)
    }
}

/// Toggles a single bit in a byte.
///
/// # Example
///
/// ```
/// use s7_access::utils::toggle_bit;
///
/// let value = toggle_bit(0b0000_0001, 0);
/// assert_eq!(value, 0);
/// assert_eq!(toggle_bit(value, 0), 1);
/// ```
#[inline]
pub fn toggle_bit(value: u8, bit: u8) -> u8 {
    value ^ (1 << bit)
}

/// Applies a [`BitValue`] to one bit of a byte.
#[inline]
pub fn apply_bit(value: u8, bit: u8, op: BitValue) -> u8 {
    match op {
        BitValue::Off => set_bit(value, bit, false),
        BitValue::On => set_bit(value, bit, true),
        BitValue::Toggle => toggle_bit(value, bit),
    }
}

/// Reads `count` consecutive bits starting at absolute bit `start_bit`.
///
/// Bits past the end of `buf` read as `false`.
pub fn read_bits(buf: &[u8], start_bit: usize, count: usize) -> Vec<bool> {
    (start_bit..start_bit + count)
        .map(|pos| {
            buf.get(pos / 8)
                .map(|byte| get_bit(*byte, (pos % 8) as u8))
                .unwrap_or(false)
        })
        .collect()
}

/// Applies `values` to consecutive bits starting at absolute bit `start_bit`.
///
/// Bits past the end of `buf` are ignored.
pub fn apply_bits(buf: &mut [u8], start_bit: usize, values: &[BitValue]) {
    for (offset, op) in values.iter().enumerate() {
        let pos = start_bit + offset;
        if let Some(byte) = buf.get_mut(pos / 8) {
            *byte = apply_bit(*byte, (pos % 8) as u8, *op);
        }
    }
}

/// Formats bytes as space-separated upper-case hex, for log output.
///
/// # Example
///
/// ```
/// use s7_access::utils::format_hex;
///
/// assert_eq!(format_hex(&[0x01, 0xAB]), "01 AB");
/// assert_eq!(format_hex(&[]), "");
/// ```
pub fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_bit() {
        let value: u8 = 0b1000_0101;
        assert!(get_bit(value, 0));
        assert!(!get_bit(value, 1));
        assert!(get_bit(value, 2));
        assert!(get_bit(value, 7));
    }

    #[test]
    fn test_set_bit() {
        assert_eq!(set_bit(0, 0, true), 1);
        assert_eq!(set_bit(1, 0, false), 0);
        assert_eq!(set_bit(0, 7, true), 0x80);
        assert_eq!(set_bit(0xFF, 3, false), 0xF7);
    }

    #[test]
    fn test_apply_bit() {
        assert_eq!(apply_bit(0x00, 1, BitValue::On), 0x02);
        assert_eq!(apply_bit(0x02, 1, BitValue::Off), 0x00);
        assert_eq!(apply_bit(0x02, 1, BitValue::Toggle), 0x00);
        assert_eq!(apply_bit(0x00, 1, BitValue::Toggle), 0x02);
    }

    #[test]
    fn test_read_bits_across_bytes() {
        let buf = [0b1100_0000, 0b0000_0001];
        assert_eq!(read_bits(&buf, 6, 3), vec![true, true, true]);
        assert_eq!(read_bits(&buf, 5, 5), vec![false, true, true, true, false]);
        assert_eq!(read_bits(&buf, 15, 2), vec![false, false]);
    }

    #[test]
    fn test_apply_bits_across_bytes() {
        let mut buf = [0x00, 0xFF];
        apply_bits(
            &mut buf,
            6,
            &[BitValue::On, BitValue::On, BitValue::Off, BitValue::Toggle],
        );
        assert_eq!(buf, [0b1100_0000, 0b1111_1100]);
    }

    #[test]
    fn test_double_toggle_restores() {
        let mut buf = [0b0101_0101];
        apply_bits(&mut buf, 0, &[BitValue::Toggle; 8]);
        assert_eq!(buf, [0b1010_1010]);
        apply_bits(&mut buf, 0, &[BitValue::Toggle; 8]);
        assert_eq!(buf, [0b0101_0101]);
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0x00, 0x7F, 0xFF]), "00 7F FF");
    }
}
