//! The address model: one addressable location in controller memory.
//!
//! An [`Address`] combines an [`Area`], a byte offset, an optional bit offset,
//! an optional element count and a [`DataType`]. Constructors enforce the
//! model's invariants:
//!
//! - a `Bit` address always has a bit index in `0..=7`, no other type has one,
//! - a count, when present, is at least 1,
//! - data blocks always carry their number (see [`Area::DataBlock`]).
//!
//! # Example
//!
//! ```
//! use s7_access::{Address, Area, DataType};
//!
//! let word = Address::new(Area::DataBlock(1), 4, DataType::Int16)?;
//! assert_eq!(word.size(), 2);
//!
//! let bits = Address::bit(Area::DataBlock(1), 0, 6)?.with_count(9)?;
//! assert_eq!(bits.size(), 2);
//! # Ok::<(), s7_access::S7Error>(())
//! ```

use crate::area::Area;
use crate::error::{Result, S7Error};
use crate::types::DataType;

/// One addressable location (or array of locations) in controller memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    area: Area,
    byte_index: u32,
    bit_index: Option<u8>,
    count: Option<u32>,
    data_type: DataType,
}

impl Address {
    /// Creates a non-bit scalar address.
    ///
    /// # Errors
    ///
    /// Returns `MalformedAddress` if `data_type` is `Bit`; use [`Address::bit`].
    pub fn new(area: Area, byte_index: u32, data_type: DataType) -> Result<Self> {
        if data_type.is_bit() {
            return Err(S7Error::malformed_address(
                format!("{}.{}", area, byte_index),
                "bit address requires a bit index",
            ));
        }
        Ok(Self {
            area,
            byte_index,
            bit_index: None,
            count: None,
            data_type,
        })
    }

    /// Creates a bit address.
    ///
    /// # Errors
    ///
    /// Returns `MalformedAddress` if `bit_index > 7`.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_access::{Address, Area};
    ///
    /// let addr = Address::bit(Area::Marker, 4, 2).unwrap();
    /// assert_eq!(addr.bit_index(), Some(2));
    /// assert!(Address::bit(Area::Marker, 4, 8).is_err());
    /// ```
    pub fn bit(area: Area, byte_index: u32, bit_index: u8) -> Result<Self> {
        if bit_index > 7 {
            return Err(S7Error::malformed_address(
                format!("{}.{}.{}", area, byte_index, bit_index),
                "bit index must be 0-7",
            ));
        }
        Ok(Self {
            area,
            byte_index,
            bit_index: Some(bit_index),
            count: None,
            data_type: DataType::Bit,
        })
    }

    /// Builds an address from parts already known to satisfy the invariants.
    pub(crate) fn from_parts(
        area: Area,
        byte_index: u32,
        bit_index: Option<u8>,
        count: Option<u32>,
        data_type: DataType,
    ) -> Self {
        Self {
            area,
            byte_index,
            bit_index,
            count,
            data_type,
        }
    }

    /// Turns the address into an array of `count` consecutive elements.
    ///
    /// For `Bit` the elements are consecutive bits starting at the bit index,
    /// which may run across byte boundaries.
    ///
    /// # Errors
    ///
    /// Returns `MalformedAddress` if `count` is 0 or the array size does not
    /// fit in `u32`.
    pub fn with_count(mut self, count: u32) -> Result<Self> {
        if count == 0 {
            return Err(S7Error::malformed_address(
                self.to_string(),
                "count must be at least 1",
            ));
        }
        let input = self.to_string();
        self.count = Some(count);
        if self.checked_size().is_none() {
            return Err(S7Error::malformed_address(
                format!("{}.{}", input, count),
                "count overflows the address range",
            ));
        }
        Ok(self)
    }

    /// Returns a copy placed in a different area.
    pub fn in_area(mut self, area: Area) -> Self {
        self.area = area;
        self
    }

    /// Memory area.
    pub fn area(&self) -> Area {
        self.area
    }

    /// Byte offset within the area.
    pub fn byte_index(&self) -> u32 {
        self.byte_index
    }

    /// Bit offset, present exactly for `Bit` addresses.
    pub fn bit_index(&self) -> Option<u8> {
        self.bit_index
    }

    /// Element count for array addresses.
    pub fn count(&self) -> Option<u32> {
        self.count
    }

    /// Element type.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Number of elements, 1 for scalars.
    pub fn element_count(&self) -> u32 {
        self.count.unwrap_or(1)
    }

    /// Size in bytes.
    ///
    /// - `Bit` without count: 1
    /// - `Bit` with count: `ceil((bit_index + count) / 8)`
    /// - otherwise: `type size * max(count, 1)`
    ///
    /// Saturates at `u32::MAX` for addresses that fail [`Address::validate`].
    pub fn size(&self) -> u32 {
        self.checked_size().unwrap_or(u32::MAX)
    }

    fn checked_size(&self) -> Option<u32> {
        match (self.data_type, self.count) {
            (DataType::Bit, None) => Some(1),
            (DataType::Bit, Some(count)) => {
                let bit = u32::from(self.bit_index.unwrap_or(0));
                bit.checked_add(count).map(|bits| bits.div_ceil(8))
            }
            (ty, count) => ty.size().checked_mul(count.unwrap_or(1).max(1)),
        }
    }

    /// One past the last byte covered by this address.
    pub fn end(&self) -> u32 {
        self.byte_index.saturating_add(self.size())
    }

    /// Checks the model invariants.
    ///
    /// Addresses built through the constructors always pass; this guards
    /// values that bypassed them (deserialized input).
    pub fn validate(&self) -> std::result::Result<(), String> {
        match (self.data_type, self.bit_index) {
            (DataType::Bit, None) => return Err("bit address without bit index".into()),
            (DataType::Bit, Some(bit)) if bit > 7 => {
                return Err(format!("bit index {} out of range 0-7", bit))
            }
            (ty, Some(_)) if !ty.is_bit() => {
                return Err(format!("{} address must not carry a bit index", ty))
            }
            _ => {}
        }
        if self.count == Some(0) {
            return Err("count must be at least 1".into());
        }
        let end = self
            .checked_size()
            .and_then(|size| self.byte_index.checked_add(size));
        if end.is_none() {
            return Err("address range overflows".into());
        }
        Ok(())
    }
}

/// Returns `(min byte_index, max end)` over a set of addresses, `None` when empty.
///
/// # Example
///
/// ```
/// use s7_access::{bounds_of, Address, Area, DataType};
///
/// let a = Address::new(Area::DataBlock(1), 4, DataType::Int32)?;
/// let b = Address::new(Area::DataBlock(1), 0, DataType::UInt8)?;
/// assert_eq!(bounds_of([&a, &b]), Some((0, 8)));
/// # Ok::<(), s7_access::S7Error>(())
/// ```
pub fn bounds_of<'a, I>(addresses: I) -> Option<(u32, u32)>
where
    I: IntoIterator<Item = &'a Address>,
{
    addresses.into_iter().fold(None, |acc, addr| {
        let (start, end) = (addr.byte_index(), addr.end());
        Some(match acc {
            None => (start, end),
            Some((lo, hi)) => (lo.min(start), hi.max(end)),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_size_with_count() {
        let addr = Address::bit(Area::DataBlock(1), 0, 6)
            .unwrap()
            .with_count(9)
            .unwrap();
        assert_eq!(addr.size(), 2);
        assert_eq!(addr.end(), 2);
    }

    #[test]
    fn test_scalar_sizes() {
        let addr = Address::bit(Area::Marker, 3, 7).unwrap();
        assert_eq!(addr.size(), 1);

        let addr = Address::new(Area::DataBlock(1), 10, DataType::Float64).unwrap();
        assert_eq!(addr.size(), 8);

        let addr = addr.with_count(3).unwrap();
        assert_eq!(addr.size(), 24);
        assert_eq!(addr.end(), 34);
    }

    #[test]
    fn test_constructor_invariants() {
        assert!(Address::new(Area::Marker, 0, DataType::Bit).is_err());
        assert!(Address::bit(Area::Marker, 0, 8).is_err());
        let addr = Address::new(Area::Output, 0, DataType::UInt8).unwrap();
        assert!(addr.with_count(0).is_err());
        assert!(addr.validate().is_ok());
        assert_eq!(addr.bit_index(), None);
        assert_eq!(addr.element_count(), 1);
    }

    #[test]
    fn test_validate_overflow() {
        let addr = Address::new(Area::DataBlock(1), u32::MAX - 1, DataType::Int32).unwrap();
        assert!(addr.validate().is_err());
    }

    #[test]
    fn test_count_overflow() {
        let bit = Address::bit(Area::DataBlock(1), 0, 7).unwrap();
        assert!(bit.with_count(u32::MAX - 7).is_ok());
        assert!(matches!(
            bit.with_count(u32::MAX),
            Err(S7Error::MalformedAddress { .. })
        ));

        let real = Address::new(Area::DataBlock(1), 0, DataType::Float64).unwrap();
        assert!(real.with_count(u32::MAX / 8).is_ok());
        assert!(real.with_count(u32::MAX / 8 + 1).is_err());

        let bits = Address::from_parts(Area::Marker, 0, Some(3), Some(u32::MAX), DataType::Bit);
        assert_eq!(bits.validate(), Err("address range overflows".to_string()));
    }

    #[test]
    fn test_bounds_of() {
        let addrs = [
            Address::new(Area::DataBlock(1), 10, DataType::Int16).unwrap(),
            Address::bit(Area::DataBlock(1), 2, 3).unwrap(),
            Address::new(Area::DataBlock(1), 6, DataType::Float32).unwrap(),
        ];
        assert_eq!(bounds_of(&addrs), Some((2, 12)));
        assert_eq!(bounds_of(&[] as &[Address]), None);
    }

    #[test]
    fn test_in_area() {
        let addr = Address::new(Area::DataBlock(1), 0, DataType::Int16)
            .unwrap()
            .in_area(Area::DataBlock(9));
        assert_eq!(addr.area(), Area::DataBlock(9));
    }
}
