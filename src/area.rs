//! Memory area definitions for S7 controllers.
//!
//! This module defines the [`Area`] enum which represents the memory regions
//! addressable on an S7 controller. Data blocks carry their block number in
//! the variant itself, so an area is always complete on its own.
//!
//! # Memory Areas Overview
//!
//! | Area | Description | Letters | S7 code |
//! |------|-------------|:-------:|:-------:|
//! | DataBlock(n) | Numbered, structured user data | `DB<n>,` | 0x84 |
//! | Marker | Internal flags (merker) | `M` | 0x83 |
//! | Input | Process image of inputs | `I`, `E` | 0x81 |
//! | Output | Process image of outputs | `Q`, `A` | 0x82 |
//!
//! # Example
//!
//! ```
//! use s7_access::Area;
//!
//! assert_eq!(Area::DataBlock(1).to_string(), "DB1");
//! assert_eq!(Area::from_letter('E'), Some(Area::Input));
//! assert_eq!(Area::Input.db_number(), None);
//! ```

/// Memory areas available on S7 controllers.
///
/// `Input` has two accepted spellings in address text (`I`, and the legacy
/// German `E`); both normalize to the same variant and format back as `I`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Area {
    /// Data block with its number.
    DataBlock(u16),
    /// Marker (flag) memory.
    Marker,
    /// Input process image.
    Input,
    /// Output process image.
    Output,
}

impl Area {
    /// Returns the S7 protocol area code used on the wire.
    pub fn code(self) -> u8 {
        match self {
            Area::DataBlock(_) => 0x84,
            Area::Marker => 0x83,
            Area::Input => 0x81,
            Area::Output => 0x82,
        }
    }

    /// Returns the data-block number for `DataBlock` areas.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_access::Area;
    ///
    /// assert_eq!(Area::DataBlock(7).db_number(), Some(7));
    /// assert_eq!(Area::Marker.db_number(), None);
    /// ```
    pub fn db_number(self) -> Option<u16> {
        match self {
            Area::DataBlock(n) => Some(n),
            _ => None,
        }
    }

    /// Returns whether this is a data block.
    pub fn is_data_block(self) -> bool {
        matches!(self, Area::DataBlock(_))
    }

    /// Maps a single area letter of address text to an area.
    ///
    /// Data blocks are not letter-addressed and yield `None`.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'M' => Some(Area::Marker),
            'I' | 'E' => Some(Area::Input),
            'Q' | 'A' => Some(Area::Output),
            _ => None,
        }
    }

    /// Returns the canonical area letter, `None` for data blocks.
    pub fn letter(self) -> Option<char> {
        match self {
            Area::DataBlock(_) => None,
            Area::Marker => Some('M'),
            Area::Input => Some('I'),
            Area::Output => Some('Q'),
        }
    }
}

impl std::fmt::Display for Area {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Area::DataBlock(n) => write!(f, "DB{}", n),
            Area::Marker => write!(f, "M"),
            Area::Input => write!(f, "I"),
            Area::Output => write!(f, "Q"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_codes() {
        assert_eq!(Area::DataBlock(1).code(), 0x84);
        assert_eq!(Area::Marker.code(), 0x83);
        assert_eq!(Area::Input.code(), 0x81);
        assert_eq!(Area::Output.code(), 0x82);
    }

    #[test]
    fn test_legacy_input_spelling() {
        assert_eq!(Area::from_letter('I'), Some(Area::Input));
        assert_eq!(Area::from_letter('e'), Some(Area::Input));
        assert_eq!(Area::from_letter('A'), Some(Area::Output));
        assert_eq!(Area::from_letter('D'), None);
    }

    #[test]
    fn test_db_number() {
        assert_eq!(Area::DataBlock(12).db_number(), Some(12));
        assert!(Area::DataBlock(12).is_data_block());
        assert!(!Area::Output.is_data_block());
        assert_eq!(Area::Output.letter(), Some('Q'));
        assert_eq!(Area::DataBlock(1).letter(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Area::DataBlock(100).to_string(), "DB100");
        assert_eq!(Area::Marker.to_string(), "M");
        assert_eq!(Area::Input.to_string(), "I");
        assert_eq!(Area::Output.to_string(), "Q");
    }
}
