//! Primitive element types of the address model.

/// Element type of an address.
///
/// The variant names describe the machine representation; the S7 names used in
/// address text and data-block sources map onto them (`INT` is `Int16`, `REAL`
/// is `Float32`, ...). All multi-byte types are big-endian on the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    /// Single bit (`BOOL`).
    Bit,
    /// `BYTE` / `USINT`.
    UInt8,
    /// `SINT`.
    Int8,
    /// `WORD` / `UINT`.
    UInt16,
    /// `INT`.
    Int16,
    /// `DWORD` / `UDINT`.
    UInt32,
    /// `DINT`.
    Int32,
    /// `LWORD` / `ULINT`.
    UInt64,
    /// `LINT`.
    Int64,
    /// `REAL`.
    Float32,
    /// `LREAL`.
    Float64,
}

/// Address-text type tokens, longest first so that prefixes never shadow
/// longer tokens (`DINT` before `DI` before `D`).
const ADDRESS_TOKENS: &[(&str, DataType)] = &[
    ("LREAL", DataType::Float64),
    ("LWORD", DataType::UInt64),
    ("UDINT", DataType::UInt32),
    ("ULINT", DataType::UInt64),
    ("USINT", DataType::UInt8),
    ("DWORD", DataType::UInt32),
    ("BOOL", DataType::Bit),
    ("BYTE", DataType::UInt8),
    ("CHAR", DataType::UInt8),
    ("SINT", DataType::Int8),
    ("WORD", DataType::UInt16),
    ("UINT", DataType::UInt16),
    ("DINT", DataType::Int32),
    ("LINT", DataType::Int64),
    ("REAL", DataType::Float32),
    ("BIT", DataType::Bit),
    ("INT", DataType::Int16),
    ("DW", DataType::UInt32),
    ("DI", DataType::Int32),
    ("X", DataType::Bit),
    ("B", DataType::UInt8),
    ("W", DataType::UInt16),
    ("D", DataType::UInt32),
    ("I", DataType::Int16),
    ("R", DataType::Float32),
];

impl DataType {
    /// Size of one element in bytes. `Bit` occupies one byte on its own.
    pub fn size(self) -> u32 {
        match self {
            DataType::Bit | DataType::UInt8 | DataType::Int8 => 1,
            DataType::UInt16 | DataType::Int16 => 2,
            DataType::UInt32 | DataType::Int32 | DataType::Float32 => 4,
            DataType::UInt64 | DataType::Int64 | DataType::Float64 => 8,
        }
    }

    /// Returns whether this is the `Bit` type.
    pub fn is_bit(self) -> bool {
        matches!(self, DataType::Bit)
    }

    /// Canonical token used when formatting addresses.
    pub fn address_token(self) -> &'static str {
        match self {
            DataType::Bit => "X",
            DataType::UInt8 => "BYTE",
            DataType::Int8 => "SINT",
            DataType::UInt16 => "WORD",
            DataType::Int16 => "INT",
            DataType::UInt32 => "DWORD",
            DataType::Int32 => "DINT",
            DataType::UInt64 => "LWORD",
            DataType::Int64 => "LINT",
            DataType::Float32 => "REAL",
            DataType::Float64 => "LREAL",
        }
    }

    /// Matches the leading type token of upper-cased address text and returns
    /// the type together with the remaining text.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_access::DataType;
    ///
    /// assert_eq!(DataType::match_address_token("DINT8"), Some((DataType::Int32, "8")));
    /// assert_eq!(DataType::match_address_token("DI8"), Some((DataType::Int32, "8")));
    /// assert_eq!(DataType::match_address_token("D8"), Some((DataType::UInt32, "8")));
    /// assert_eq!(DataType::match_address_token("Z8"), None);
    /// ```
    pub fn match_address_token(text: &str) -> Option<(DataType, &str)> {
        ADDRESS_TOKENS
            .iter()
            .find_map(|(tok, ty)| text.strip_prefix(tok).map(|rest| (*ty, rest)))
    }

    /// Maps a data-block source type name (`Bool`, `Int`, `LReal`, ...) to a type.
    ///
    /// Matching is case-insensitive. Only the exact S7 names are accepted here;
    /// the one and two letter shorthands belong to address text.
    pub fn from_source_name(name: &str) -> Option<DataType> {
        let ty = match name.to_ascii_uppercase().as_str() {
            "BOOL" => DataType::Bit,
            "BYTE" | "USINT" | "CHAR" => DataType::UInt8,
            "SINT" => DataType::Int8,
            "WORD" | "UINT" => DataType::UInt16,
            "INT" => DataType::Int16,
            "DWORD" | "UDINT" => DataType::UInt32,
            "DINT" => DataType::Int32,
            "LWORD" | "ULINT" => DataType::UInt64,
            "LINT" => DataType::Int64,
            "REAL" => DataType::Float32,
            "LREAL" => DataType::Float64,
            _ => return None,
        };
        Some(ty)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataType::Bit => "Bit",
            DataType::UInt8 => "UInt8",
            DataType::Int8 => "Int8",
            DataType::UInt16 => "UInt16",
            DataType::Int16 => "Int16",
            DataType::UInt32 => "UInt32",
            DataType::Int32 => "Int32",
            DataType::UInt64 => "UInt64",
            DataType::Int64 => "Int64",
            DataType::Float32 => "Float32",
            DataType::Float64 => "Float64",
        };
        f.write_str(name)
    }
}
