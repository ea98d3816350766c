//! Error types for S7 addressing, data-block parsing and request execution.
//!
//! Errors fall into three tiers:
//!
//! - **construction-time validation** (malformed address text, invalid
//!   variables, write descriptors without a value), always reported before any
//!   transport I/O,
//! - **parse errors** from the data-block source parser, which never yield a
//!   partial result,
//! - **transport errors**, reported once per logical request and carrying the
//!   byte bounds of the group or span that failed.
//!
//! Writes are dispatched span by span. When a write request fails, other spans
//! of the same request may already have landed on the controller; callers must
//! not assume a failed write left memory untouched.

use thiserror::Error;

use crate::area::Area;
use crate::transport::TransportError;

/// Result type alias for S7 operations.
pub type Result<T> = std::result::Result<T, S7Error>;

/// Errors that can occur while addressing, parsing or executing requests.
#[derive(Debug, Error)]
pub enum S7Error {
    /// Address text does not follow `[DB<n>,]<type><byte>[.<bit>][.<count>]`.
    #[error("Malformed address '{input}': {reason}")]
    MalformedAddress {
        /// Offending address text.
        input: String,
        /// What rule the text violates.
        reason: String,
    },

    /// Type token of an address is neither a full type name nor a shorthand.
    #[error("Unknown type '{token}' in address")]
    UnknownType {
        /// Unrecognized token.
        token: String,
    },

    /// Data-block source has no top level `STRUCT` marker.
    #[error("No STRUCT found in data-block source")]
    NoStructureFound,

    /// Input ended before the matching `END_STRUCT`.
    #[error("Unterminated STRUCT: no END_STRUCT found")]
    UnterminatedStruct,

    /// Leaf line without a `name : type` separator.
    #[error("Missing ':' type separator in line '{line}'")]
    MissingTypeSeparator {
        /// Line after whitespace stripping.
        line: String,
    },

    /// Array bounds are empty, non-numeric or reversed.
    #[error("Invalid array bounds '{bounds}'")]
    InvalidArrayBounds {
        /// Raw bounds text.
        bounds: String,
    },

    /// Data-block field type that has no address model counterpart.
    #[error("Unknown type token '{token}' in data-block source")]
    UnknownTypeToken {
        /// Unrecognized type token.
        token: String,
    },

    /// Field would end past the last addressable byte of a data block.
    #[error("Data-block layout overflows the address range at field '{field}'")]
    LayoutOverflow {
        /// Path of the field that does not fit.
        field: String,
    },

    /// Variables requested from a layout with no data-block number to stamp.
    #[error("No data-block number given and none found in the source header")]
    MissingDbNumber,

    /// Variable handed to a request violates the address model.
    #[error("Invalid variable at index {index}: {reason}")]
    InvalidVariable {
        /// Position of the variable in the caller's list.
        index: usize,
        /// Which invariant is broken.
        reason: String,
    },

    /// Write descriptor without a value.
    #[error("Variable at index {index} has no value to write")]
    MissingValue {
        /// Position of the variable in the caller's list.
        index: usize,
    },

    /// Transport failed while reading bytes `[start, end)`.
    #[error("Read of {area} bytes {start}..{end} failed: {source}")]
    TransportRead {
        /// Area that was read.
        area: Area,
        /// First byte requested.
        start: u32,
        /// One past the last byte requested.
        end: u32,
        /// Error reported by the transport.
        #[source]
        source: TransportError,
    },

    /// Transport failed while writing bytes `[start, end)`.
    #[error("Write of {area} bytes {start}..{end} failed: {source}")]
    TransportWrite {
        /// Area that was written.
        area: Area,
        /// First byte written.
        start: u32,
        /// One past the last byte written.
        end: u32,
        /// Error reported by the transport.
        #[source]
        source: TransportError,
    },

    /// Transport returned a different number of bytes than requested.
    #[error("Short read of {area} at byte {start}: expected {expected} bytes, received {received}")]
    ShortRead {
        /// Area that was read.
        area: Area,
        /// First byte requested.
        start: u32,
        /// Requested length.
        expected: usize,
        /// Returned length.
        received: usize,
    },

    /// Value does not fit the type it is encoded to or decoded from.
    #[error("Codec error: {reason}")]
    Codec {
        /// Description of the mismatch.
        reason: String,
    },
}

impl S7Error {
    /// Creates a new `MalformedAddress` error.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_access::S7Error;
    ///
    /// let err = S7Error::malformed_address("DB1,X4", "bit address requires a bit index");
    /// assert!(err.to_string().contains("DB1,X4"));
    /// ```
    pub fn malformed_address(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedAddress {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `UnknownType` error.
    pub fn unknown_type(token: impl Into<String>) -> Self {
        Self::UnknownType {
            token: token.into(),
        }
    }

    /// Creates a new `InvalidVariable` error.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_access::S7Error;
    ///
    /// let err = S7Error::invalid_variable(3, "count must be at least 1");
    /// assert_eq!(
    ///     err.to_string(),
    ///     "Invalid variable at index 3: count must be at least 1"
    /// );
    /// ```
    pub fn invalid_variable(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidVariable {
            index,
            reason: reason.into(),
        }
    }

    /// Creates a new `Codec` error.
    pub fn codec(reason: impl Into<String>) -> Self {
        Self::Codec {
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors raised before any transport I/O took place.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            S7Error::MalformedAddress { .. }
                | S7Error::UnknownType { .. }
                | S7Error::InvalidVariable { .. }
                | S7Error::MissingValue { .. }
        )
    }

    /// Returns the underlying transport error, if this error came from the transport.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            S7Error::TransportRead { source, .. } | S7Error::TransportWrite { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_address_display() {
        let err = S7Error::malformed_address("DB1,INT4.0.2", "bit index on non-bit type");
        assert_eq!(
            err.to_string(),
            "Malformed address 'DB1,INT4.0.2': bit index on non-bit type"
        );
    }

    #[test]
    fn test_transport_read_display() {
        let err = S7Error::TransportRead {
            area: Area::DataBlock(3),
            start: 4,
            end: 12,
            source: TransportError::Timeout,
        };
        assert_eq!(
            err.to_string(),
            "Read of DB3 bytes 4..12 failed: Transport timeout"
        );
        assert!(matches!(err.transport_error(), Some(TransportError::Timeout)));
    }

    #[test]
    fn test_short_read_display() {
        let err = S7Error::ShortRead {
            area: Area::Marker,
            start: 0,
            expected: 8,
            received: 6,
        };
        assert_eq!(
            err.to_string(),
            "Short read of M at byte 0: expected 8 bytes, received 6"
        );
    }

    #[test]
    fn test_layout_overflow_display() {
        let err = S7Error::LayoutOverflow {
            field: "axis/2/pos".into(),
        };
        assert_eq!(
            err.to_string(),
            "Data-block layout overflows the address range at field 'axis/2/pos'"
        );
    }

    #[test]
    fn test_is_validation() {
        assert!(S7Error::MissingValue { index: 0 }.is_validation());
        assert!(S7Error::unknown_type("FOO").is_validation());
        assert!(!S7Error::UnterminatedStruct.is_validation());
        assert!(S7Error::UnterminatedStruct.transport_error().is_none());
    }
}
