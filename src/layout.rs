//! Data-block layout: byte and bit offsets for a lexed field tree.
//!
//! This is the second stage of data-block parsing. It walks a [`DbObject`]
//! depth-first, left to right, and reproduces the controller's memory layout
//! rules for non-optimized blocks:
//!
//! - consecutive `Bool` fields share a byte, bit 0 upwards; a ninth bit opens
//!   the next byte
//! - any non-`Bool` field closes an open bit field, which reserves the rest of
//!   that byte
//! - single bytes (`Byte`, `SInt`, `Char`, ...) are placed without alignment
//! - every other field, every array and every struct starts on an even byte;
//!   arrays and structs also end on an even byte
//!
//! Field names are the `/`-joined path of field keys; struct array instances
//! contribute their index as a path segment (`axis/1/pos`).
//!
//! # Example
//!
//! ```
//! use s7_access::{parse_db_source, DataType};
//!
//! let layout = parse_db_source(
//!     "STRUCT\n v1 : Bool; //c1\n v2 : Byte; //c2\n v3 : Int; //c3\n END_STRUCT",
//! )?;
//! let fields = layout.fields();
//! assert_eq!((fields[0].byte_index, fields[0].bit_index), (0, Some(0)));
//! assert_eq!((fields[1].byte_index, fields[1].data_type), (1, DataType::UInt8));
//! assert_eq!((fields[2].byte_index, fields[2].data_type), (2, DataType::Int16));
//! assert_eq!(fields[2].comment.as_deref(), Some("c3"));
//! # Ok::<(), s7_access::S7Error>(())
//! ```

use tracing::debug;

use crate::address::Address;
use crate::area::Area;
use crate::error::{Result, S7Error};
use crate::source::{find_unquoted, parse_bounds, parse_source, DbNode, DbObject};
use crate::types::DataType;
use crate::value::Variable;

/// Running layout position, threaded through the traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Cursor {
    /// Current byte.
    pub(crate) byte: u32,
    /// Last bit used in `byte`, `None` when no bit field is open.
    pub(crate) bit: Option<u8>,
}

impl Cursor {
    /// Reserves the rest of an open bit field's byte.
    fn close_bits(self) -> Option<Self> {
        match self.bit {
            Some(_) => Some(Cursor {
                byte: self.byte.checked_add(1)?,
                bit: None,
            }),
            None => Some(self),
        }
    }

    /// Rounds up to an even byte.
    fn align(self) -> Option<Self> {
        Some(Cursor {
            byte: self.byte.checked_add(self.byte & 1)?,
            bit: self.bit,
        })
    }

    /// Position of the next bit in a bit field.
    fn next_bit(self) -> Option<Self> {
        match self.bit {
            None => Some(Cursor {
                byte: self.byte,
                bit: Some(0),
            }),
            Some(7) => Some(Cursor {
                byte: self.byte.checked_add(1)?,
                bit: Some(0),
            }),
            Some(bit) => Some(Cursor {
                byte: self.byte,
                bit: Some(bit + 1),
            }),
        }
    }

    fn advance(self, bytes: u32) -> Option<Self> {
        Some(Cursor {
            byte: self.byte.checked_add(bytes)?,
            bit: None,
        })
    }
}

/// One field of a data block at its computed position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbField {
    /// `/`-joined field path.
    pub name: String,
    /// Comment after `//`, trimmed.
    pub comment: Option<String>,
    /// Byte offset within the block.
    pub byte_index: u32,
    /// Bit offset for `Bool` fields.
    pub bit_index: Option<u8>,
    /// Element count for array fields.
    pub count: Option<u32>,
    /// Element type.
    pub data_type: DataType,
}

impl DbField {
    /// Address of this field in `area`.
    pub fn address(&self, area: Area) -> Address {
        Address::from_parts(
            area,
            self.byte_index,
            self.bit_index,
            self.count,
            self.data_type,
        )
    }

    /// Read descriptor for this field in `area`, carrying name and comment.
    pub fn to_variable(&self, area: Area) -> Variable {
        Variable {
            address: self.address(area),
            name: Some(self.name.clone()),
            comment: self.comment.clone(),
            value: None,
        }
    }
}

/// Flat, positioned field list of one data block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbLayout {
    db_number: Option<u16>,
    fields: Vec<DbField>,
    size: u32,
}

impl DbLayout {
    /// Fields in source order.
    pub fn fields(&self) -> &[DbField] {
        &self.fields
    }

    /// Looks up a field by its path.
    pub fn get(&self, name: &str) -> Option<&DbField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Block size in bytes, up to the even byte after the last field.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Block number configured on the parser or found in the source header.
    pub fn db_number(&self) -> Option<u16> {
        self.db_number
    }

    /// Read descriptors for every field, stamped with `db_number`.
    pub fn to_variables(&self, db_number: u16) -> Vec<Variable> {
        let area = Area::DataBlock(db_number);
        self.fields.iter().map(|f| f.to_variable(area)).collect()
    }

    /// Read descriptors for every field, stamped with the layout's own block number.
    ///
    /// # Errors
    ///
    /// Returns `MissingDbNumber` if the layout has no block number.
    pub fn into_variables(self) -> Result<Vec<Variable>> {
        let db_number = self.db_number.ok_or(S7Error::MissingDbNumber)?;
        Ok(self.to_variables(db_number))
    }
}

/// Parser for exported data-block sources.
///
/// # Example
///
/// ```
/// use s7_access::{Area, DbSourceParser};
///
/// let vars = DbSourceParser::new()
///     .with_db_number(5)
///     .parse_variables("STRUCT\n speed : Int;\n on : Bool;\nEND_STRUCT;")?;
/// assert_eq!(vars[0].name.as_deref(), Some("speed"));
/// assert_eq!(vars[1].address.area(), Area::DataBlock(5));
/// assert_eq!(vars[1].address.to_string(), "DB5,X2.0");
/// # Ok::<(), s7_access::S7Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct DbSourceParser {
    db_number: Option<u16>,
}

impl DbSourceParser {
    /// Creates a parser that takes the block number from the source header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps `db_number` on every result, overriding any header.
    pub fn with_db_number(mut self, db_number: u16) -> Self {
        self.db_number = Some(db_number);
        self
    }

    /// Parses source text into a positioned layout.
    ///
    /// # Errors
    ///
    /// Any lexing error of [`crate::source::parse_source`], plus
    /// `InvalidArrayBounds` and `UnknownTypeToken` for unusable leaf types and
    /// `LayoutOverflow` for a field ending past byte `u32::MAX`.
    /// A failed parse yields no fields at all.
    pub fn parse(&self, text: &str) -> Result<DbLayout> {
        let source = parse_source(text)?;
        let (fields, end) = layout_struct(&source.root, "", Cursor::default())?;
        let size = end
            .close_bits()
            .and_then(Cursor::align)
            .ok_or_else(|| S7Error::LayoutOverflow {
                field: fields.last().map(|f| f.name.clone()).unwrap_or_default(),
            })?
            .byte;
        let layout = DbLayout {
            db_number: self.db_number.or(source.db_number),
            fields,
            size,
        };
        debug!(
            fields = layout.fields.len(),
            size = layout.size,
            db = ?layout.db_number,
            "parsed data-block source"
        );
        Ok(layout)
    }

    /// Parses source text straight into read descriptors.
    ///
    /// # Errors
    ///
    /// As [`DbSourceParser::parse`], plus `MissingDbNumber` when neither the
    /// parser nor the source header provides a block number.
    pub fn parse_variables(&self, text: &str) -> Result<Vec<Variable>> {
        self.parse(text)?.into_variables()
    }
}

/// Parses source text into a positioned layout, block number from the header.
pub fn parse_db_source(text: &str) -> Result<DbLayout> {
    DbSourceParser::new().parse(text)
}

struct LeafSpec {
    data_type: DataType,
    count: Option<u32>,
    comment: Option<String>,
}

fn parse_leaf(payload: &str) -> Result<LeafSpec> {
    let (code, comment) = match find_unquoted(payload, "//") {
        Some(at) => (&payload[..at], Some(payload[at + 2..].trim())),
        None => (payload, None),
    };
    let comment = comment.filter(|c| !c.is_empty()).map(str::to_string);

    let ty = code.split(';').next().unwrap_or_default();
    let ty = ty.split(":=").next().unwrap_or_default();
    let unknown = |token: &str| S7Error::UnknownTypeToken {
        token: token.to_string(),
    };

    let upper = ty.to_ascii_uppercase();
    if upper.starts_with("ARRAY[") {
        let close = upper.find("]OF").ok_or_else(|| unknown(ty))?;
        let bounds = &ty["ARRAY[".len()..close];
        let element = &ty[close + "]OF".len()..];
        let (lower, upper) = parse_bounds(bounds)?;
        let count = u32::try_from(i64::from(upper) - i64::from(lower) + 1).map_err(|_| {
            S7Error::InvalidArrayBounds {
                bounds: bounds.to_string(),
            }
        })?;
        let data_type = DataType::from_source_name(element).ok_or_else(|| unknown(element))?;
        return Ok(LeafSpec {
            data_type,
            count: Some(count),
            comment,
        });
    }

    let data_type = DataType::from_source_name(ty).ok_or_else(|| unknown(ty))?;
    Ok(LeafSpec {
        data_type,
        count: None,
        comment,
    })
}

/// Places one leaf and returns `(byte, bit, cursor after the leaf)`.
///
/// `None` when the leaf would end past the last addressable byte.
fn place_leaf(
    cursor: Cursor,
    data_type: DataType,
    count: Option<u32>,
) -> Option<(u32, Option<u8>, Cursor)> {
    match (data_type, count) {
        (DataType::Bit, None) => {
            let at = cursor.next_bit()?;
            at.byte.checked_add(1)?;
            Some((at.byte, at.bit, at))
        }
        (DataType::Bit, Some(count)) => {
            let at = cursor.close_bits()?;
            let next = at.advance(count.div_ceil(8))?.align()?;
            Some((at.byte, Some(0), next))
        }
        (ty, None) if ty.size() == 1 => {
            let at = cursor.close_bits()?;
            Some((at.byte, None, at.advance(1)?))
        }
        (ty, count) => {
            let at = cursor.close_bits()?.align()?;
            let next = at.advance(ty.size().checked_mul(count.unwrap_or(1))?)?;
            let next = if count.is_some() { next.align()? } else { next };
            Some((at.byte, None, next))
        }
    }
}

fn layout_struct(
    object: &DbObject,
    prefix: &str,
    cursor: Cursor,
) -> Result<(Vec<DbField>, Cursor)> {
    let mut fields = Vec::new();
    let mut cursor = cursor;

    for (name, node) in object.entries() {
        let path = join_path(prefix, name);
        match node {
            DbNode::Leaf(payload) => {
                let leaf = parse_leaf(payload)?;
                let overflow = || S7Error::LayoutOverflow {
                    field: path.clone(),
                };
                let (byte_index, bit_index, next) =
                    place_leaf(cursor, leaf.data_type, leaf.count).ok_or_else(overflow)?;
                fields.push(DbField {
                    name: path,
                    comment: leaf.comment,
                    byte_index,
                    bit_index,
                    count: leaf.count,
                    data_type: leaf.data_type,
                });
                cursor = next;
            }
            DbNode::Struct(child) => {
                cursor = layout_nested(child, &path, cursor, &mut fields)?;
            }
            DbNode::StructArray(instances) => {
                for (index, child) in instances {
                    let instance_path = join_path(&path, &index.to_string());
                    cursor = layout_nested(child, &instance_path, cursor, &mut fields)?;
                }
            }
        }
    }

    Ok((fields, cursor))
}

fn layout_nested(
    child: &DbObject,
    path: &str,
    cursor: Cursor,
    fields: &mut Vec<DbField>,
) -> Result<Cursor> {
    let overflow = || S7Error::LayoutOverflow {
        field: path.to_string(),
    };
    let start = cursor
        .close_bits()
        .and_then(Cursor::align)
        .ok_or_else(overflow)?;
    let (nested, end) = layout_struct(child, path, start)?;
    fields.extend(nested);
    end.close_bits().and_then(Cursor::align).ok_or_else(overflow)
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::parse_address;

    fn layout(body: &str) -> DbLayout {
        parse_db_source(&format!("STRUCT\n{}\nEND_STRUCT;", body)).unwrap()
    }

    fn positions(layout: &DbLayout) -> Vec<(&str, u32, Option<u8>)> {
        layout
            .fields()
            .iter()
            .map(|f| (f.name.as_str(), f.byte_index, f.bit_index))
            .collect()
    }

    #[test]
    fn test_cursor_rules() {
        let c = Cursor::default();
        assert_eq!(c.next_bit(), Some(Cursor { byte: 0, bit: Some(0) }));
        let c = Cursor { byte: 3, bit: Some(7) };
        assert_eq!(c.next_bit(), Some(Cursor { byte: 4, bit: Some(0) }));
        assert_eq!(c.close_bits(), Some(Cursor { byte: 4, bit: None }));
        assert_eq!(Cursor { byte: 5, bit: None }.align().map(|c| c.byte), Some(6));
        assert_eq!(Cursor { byte: 6, bit: None }.align().map(|c| c.byte), Some(6));

        let last = Cursor { byte: u32::MAX, bit: Some(7) };
        assert_eq!(last.next_bit(), None);
        assert_eq!(last.close_bits(), None);
        assert_eq!(Cursor { byte: u32::MAX, bit: None }.align(), None);
        assert_eq!(Cursor { byte: 4, bit: None }.advance(u32::MAX), None);
    }

    fn overflow_field(body: &str) -> String {
        match parse_db_source(&format!("STRUCT\n{}\nEND_STRUCT;", body)) {
            Err(S7Error::LayoutOverflow { field }) => field,
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_layout_overflow() {
        assert_eq!(
            overflow_field("a : Array[0..1073741823] of LReal;\n b : Int;\n c : Int;"),
            "a"
        );
        // 1073741823 DInts end at byte 4294967292, the next LReal does not fit
        assert_eq!(overflow_field("a : Array[0..1073741822] of DInt;\n b : LReal;"), "b");
        assert_eq!(
            overflow_field(
                "a : Array[0..1073741822] of DInt;\n s : Struct\n x : LReal;\n END_STRUCT;"
            ),
            "s/x"
        );
    }

    #[test]
    fn test_end_to_end_example() {
        let layout = parse_db_source(
            "STRUCT\n v1 : Bool; //c1\n v2 : Byte; //c2\n v3 : Int; //c3\n END_STRUCT",
        )
        .unwrap();
        let fields = layout.fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(
            fields[0],
            DbField {
                name: "v1".into(),
                comment: Some("c1".into()),
                byte_index: 0,
                bit_index: Some(0),
                count: None,
                data_type: DataType::Bit,
            }
        );
        assert_eq!(
            (fields[1].name.as_str(), fields[1].byte_index, fields[1].data_type),
            ("v2", 1, DataType::UInt8)
        );
        assert_eq!(
            (fields[2].name.as_str(), fields[2].byte_index, fields[2].data_type),
            ("v3", 2, DataType::Int16)
        );
        assert_eq!(layout.size(), 4);
    }

    #[test]
    fn test_word_alignment_after_byte() {
        let layout = layout("a : Byte;\n b : Word;");
        assert_eq!(positions(&layout), vec![("a", 0, None), ("b", 2, None)]);
    }

    #[test]
    fn test_bit_packing() {
        let mut body = String::new();
        for i in 0..9 {
            body.push_str(&format!("b{} : Bool;\n", i));
        }
        body.push_str("after : Byte;");
        let layout = layout(&body);
        let pos = positions(&layout);
        for (i, bit) in (0..8).enumerate() {
            assert_eq!(pos[i].1, 0);
            assert_eq!(pos[i].2, Some(bit));
        }
        assert_eq!((pos[8].1, pos[8].2), (1, Some(0)));
        assert_eq!(pos[9], ("after", 2, None));
    }

    #[test]
    fn test_struct_array() {
        let layout = layout("arr : Array[1..3] of Struct\n b : Byte;\n i : Int;\n END_STRUCT;");
        assert_eq!(
            positions(&layout),
            vec![
                ("arr/1/b", 0, None),
                ("arr/1/i", 2, None),
                ("arr/2/b", 4, None),
                ("arr/2/i", 6, None),
                ("arr/3/b", 8, None),
                ("arr/3/i", 10, None),
            ]
        );
        assert_eq!(layout.size(), 12);
    }

    #[test]
    fn test_nested_struct_alignment() {
        let layout = layout(
            "flag : Bool;\n s : Struct\n x : Byte;\n y : Bool;\n END_STRUCT;\n z : Byte;",
        );
        assert_eq!(
            positions(&layout),
            vec![
                ("flag", 0, Some(0)),
                ("s/x", 2, None),
                ("s/y", 3, Some(0)),
                ("z", 4, None),
            ]
        );
    }

    #[test]
    fn test_arrays() {
        let layout = layout(
            "b : Byte;\n bits : Array[0..9] of Bool;\n c : Byte;\n \
             bytes : Array[1..3] of Byte;\n r : Real;",
        );
        let fields = layout.fields();
        assert_eq!((fields[1].byte_index, fields[1].count), (1, Some(10)));
        assert_eq!(fields[1].bit_index, Some(0));
        // 1 + ceil(10 / 8) = 3, rounded to 4
        assert_eq!(fields[2].byte_index, 4);
        // byte arrays still start and end even
        assert_eq!((fields[3].byte_index, fields[3].count), (6, Some(3)));
        assert_eq!(fields[4].byte_index, 10);
        assert_eq!(layout.size(), 14);
    }

    #[test]
    fn test_bit_array_closes_open_bits() {
        let layout = layout("a : Bool;\n bits : Array[0..3] of Bool;");
        assert_eq!(positions(&layout), vec![("a", 0, Some(0)), ("bits", 1, Some(0))]);
    }

    #[test]
    fn test_defaults_and_types() {
        let layout = layout("a : LReal := 1.5;\n b : DInt;\n c : SInt;\n d : UDInt;");
        let types: Vec<DataType> = layout.fields().iter().map(|f| f.data_type).collect();
        assert_eq!(
            types,
            vec![DataType::Float64, DataType::Int32, DataType::Int8, DataType::UInt32]
        );
        assert_eq!(layout.fields()[3].byte_index, 14);
    }

    #[test]
    fn test_unknown_type_token() {
        let err = parse_db_source("STRUCT\n s : String[20];\nEND_STRUCT").unwrap_err();
        assert!(matches!(err, S7Error::UnknownTypeToken { token } if token == "String[20]"));

        let err = parse_db_source("STRUCT\n s : Array[0..2] of \"Udt\";\nEND_STRUCT").unwrap_err();
        assert!(matches!(err, S7Error::UnknownTypeToken { .. }));
    }

    #[test]
    fn test_comment_and_quoted_name() {
        let layout = layout("\"a//b\" : Int; // gain: 2\n c : Bool;");
        let field = layout.get("a//b").unwrap();
        assert_eq!(field.data_type, DataType::Int16);
        assert_eq!(field.comment.as_deref(), Some("gain: 2"));
        assert_eq!(layout.get("c").map(|f| f.byte_index), Some(2));

        let err = parse_db_source("STRUCT\n a Int; // note: x\nEND_STRUCT").unwrap_err();
        assert!(matches!(err, S7Error::MissingTypeSeparator { .. }));
    }

    #[test]
    fn test_invalid_leaf_bounds() {
        let err = parse_db_source("STRUCT\n s : Array[0..n] of Int;\nEND_STRUCT").unwrap_err();
        assert!(matches!(err, S7Error::InvalidArrayBounds { .. }));
    }

    #[test]
    fn test_db_number_stamping() {
        let text = "DATA_BLOCK \"DB9\"\nSTRUCT\n a : Int;\nEND_STRUCT;";
        let vars = parse_db_source(text).unwrap().into_variables().unwrap();
        assert_eq!(vars[0].address.area(), Area::DataBlock(9));

        let vars = DbSourceParser::new()
            .with_db_number(2)
            .parse_variables(text)
            .unwrap();
        assert_eq!(vars[0].address.area(), Area::DataBlock(2));

        let err = parse_db_source("STRUCT\n a : Int;\nEND_STRUCT;")
            .unwrap()
            .into_variables()
            .unwrap_err();
        assert!(matches!(err, S7Error::MissingDbNumber));
    }

    #[test]
    fn test_layout_addresses_roundtrip() {
        let layout = layout(
            "a : Bool;\n b : Bool;\n c : Array[0..11] of Bool;\n d : Int;\n \
             e : Array[0..4] of Real;\n s : Struct\n f : LInt;\n END_STRUCT;",
        );
        for var in layout.to_variables(17) {
            assert!(var.address.validate().is_ok());
            let text = var.address.to_string();
            assert_eq!(parse_address(&text).unwrap(), var.address, "{}", text);
        }
        assert_eq!(layout.get("s/f").map(|f| f.byte_index), Some(26));
    }
}
