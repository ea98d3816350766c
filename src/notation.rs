//! Textual address notation.
//!
//! Addresses are written as
//!
//! ```text
//! [DB<n>,]<area letter?><type token><byte>[.<bit>][.<count>]
//! ```
//!
//! | Text | Meaning |
//! |------|---------|
//! | `DB1,X14.0` | bit 0 of byte 14 in DB1 |
//! | `DB1,X14.0.8` | 8 bits starting at DB1 byte 14 bit 0 |
//! | `DB1,INT4` | `Int16` at DB1 byte 4 |
//! | `DB1,REAL8.3` | three `Float32` starting at DB1 byte 8 |
//! | `M4.2` | marker bit 4.2 (no type letter means `Bit`) |
//! | `MW10`, `IB0`, `EB0`, `QD4` | marker word, input byte (two spellings), output dword |
//!
//! Type tokens are matched longest first, so `DINT`, `DI` and `D` can coexist.
//! A `Bit` address must carry a bit index; any other type must not.
//!
//! Parsing is case-insensitive. Formatting always produces the canonical
//! spelling, and `parse_address(&format_address(a)) == a` holds for every
//! valid address.

use std::str::FromStr;

use crate::address::Address;
use crate::area::Area;
use crate::error::{Result, S7Error};
use crate::types::DataType;

/// Parses address text into an [`Address`].
///
/// # Errors
///
/// - `MalformedAddress` if the text does not follow the notation, or the bit
///   qualifier rules are broken (bit type without bit index, other types with one)
/// - `UnknownType` if the type token is not recognized
///
/// # Example
///
/// ```
/// use s7_access::{parse_address, Area, DataType};
///
/// let addr = parse_address("DB1,X14.0.8")?;
/// assert_eq!(addr.area(), Area::DataBlock(1));
/// assert_eq!(addr.byte_index(), 14);
/// assert_eq!(addr.bit_index(), Some(0));
/// assert_eq!(addr.count(), Some(8));
/// assert_eq!(addr.data_type(), DataType::Bit);
///
/// let addr = parse_address("M4.2")?;
/// assert_eq!(addr.area(), Area::Marker);
/// assert_eq!(addr.data_type(), DataType::Bit);
/// # Ok::<(), s7_access::S7Error>(())
/// ```
pub fn parse_address(input: &str) -> Result<Address> {
    let text = input.trim().to_ascii_uppercase();
    if text.is_empty() {
        return Err(S7Error::malformed_address(input, "empty address"));
    }

    let (area, spec) = split_area(input, &text)?;

    let (data_type, numbers) = if spec.starts_with(|c: char| c.is_ascii_digit()) {
        if area.is_data_block() {
            return Err(S7Error::malformed_address(
                input,
                "data block address requires a type",
            ));
        }
        (DataType::Bit, spec)
    } else {
        match DataType::match_address_token(spec) {
            Some(found) => found,
            None => {
                let token: String = spec
                    .chars()
                    .take_while(|c| c.is_ascii_alphabetic())
                    .collect();
                if token.is_empty() {
                    return Err(S7Error::malformed_address(input, "missing type token"));
                }
                return Err(S7Error::unknown_type(token));
            }
        }
    };

    let parts = numbers
        .split('.')
        .map(|part| parse_number(input, part))
        .collect::<Result<Vec<u32>>>()?;

    let address = match (data_type, parts.as_slice()) {
        (DataType::Bit, [byte, bit]) => Address::bit(area, *byte, bit_index(input, *bit)?)?,
        (DataType::Bit, [byte, bit, count]) => {
            Address::bit(area, *byte, bit_index(input, *bit)?)?.with_count(*count)?
        }
        (DataType::Bit, _) => {
            return Err(S7Error::malformed_address(
                input,
                "bit address requires '<byte>.<bit>'",
            ))
        }
        (ty, [byte]) => Address::new(area, *byte, ty)?,
        (ty, [byte, count]) => Address::new(area, *byte, ty)?.with_count(*count)?,
        (ty, _) => {
            return Err(S7Error::malformed_address(
                input,
                format!("{} address does not take a bit index", ty),
            ))
        }
    };
    Ok(address)
}

/// Formats an [`Address`] in canonical notation.
///
/// # Example
///
/// ```
/// use s7_access::{format_address, Address, Area, DataType};
///
/// let addr = Address::new(Area::DataBlock(3), 8, DataType::Float32)?.with_count(4)?;
/// assert_eq!(format_address(&addr), "DB3,REAL8.4");
///
/// let addr = Address::bit(Area::Input, 0, 5)?;
/// assert_eq!(format_address(&addr), "I0.5");
/// # Ok::<(), s7_access::S7Error>(())
/// ```
pub fn format_address(address: &Address) -> String {
    let ty = address.data_type();
    let mut out = match address.area() {
        Area::DataBlock(n) => format!("DB{},{}", n, ty.address_token()),
        area => {
            let letter = area.letter().unwrap_or('M');
            if ty.is_bit() {
                letter.to_string()
            } else {
                format!("{}{}", letter, ty.address_token())
            }
        }
    };
    out.push_str(&address.byte_index().to_string());
    if let Some(bit) = address.bit_index() {
        out.push('.');
        out.push_str(&bit.to_string());
    }
    if let Some(count) = address.count() {
        out.push('.');
        out.push_str(&count.to_string());
    }
    out
}

fn split_area<'a>(input: &str, text: &'a str) -> Result<(Area, &'a str)> {
    if let Some(after) = text.strip_prefix("DB") {
        let (number, spec) = after.split_once(',').ok_or_else(|| {
            S7Error::malformed_address(input, "missing ',' after data block number")
        })?;
        let number = number
            .parse::<u16>()
            .ok()
            .filter(|_| number.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| S7Error::malformed_address(input, "invalid data block number"))?;
        return Ok((Area::DataBlock(number), spec));
    }

    let mut chars = text.chars();
    let area = chars
        .next()
        .and_then(Area::from_letter)
        .ok_or_else(|| S7Error::malformed_address(input, "unknown memory area"))?;
    Ok((area, chars.as_str()))
}

fn parse_number(input: &str, part: &str) -> Result<u32> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(S7Error::malformed_address(
            input,
            format!("expected a number, found '{}'", part),
        ));
    }
    part.parse::<u32>()
        .map_err(|_| S7Error::malformed_address(input, format!("number '{}' out of range", part)))
}

fn bit_index(input: &str, bit: u32) -> Result<u8> {
    u8::try_from(bit)
        .ok()
        .filter(|b| *b <= 7)
        .ok_or_else(|| S7Error::malformed_address(input, "bit index must be 0-7"))
}

impl FromStr for Address {
    type Err = S7Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_address(s)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_address(self))
    }
}
