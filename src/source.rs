//! Data-block source lexing: exported source text to a nested field tree.
//!
//! This is the first stage of data-block parsing. It turns the text of an
//! exported data block (or UDT) into a [`DbObject`]: an ordered mapping from
//! field names to raw leaf payloads, nested structs and struct arrays. The
//! second stage, in [`crate::layout`], assigns byte and bit offsets.
//!
//! # Source shape
//!
//! ```text
//! DATA_BLOCK "DB7"
//! VERSION : 0.1
//! STRUCT
//!    speed : Int;   // rpm
//!    motor : Struct
//!       on : Bool;
//!    END_STRUCT;
//!    axis : Array[1..2] of Struct
//!       pos : Real;
//!    END_STRUCT;
//! END_STRUCT;
//! BEGIN
//! END_DATA_BLOCK
//! ```
//!
//! Whitespace is removed from the code part of each line (outside double
//! quotes); comments after `//` keep their inner spacing. Everything up to and
//! including the first `STRUCT` line is skipped, apart from an optional
//! `DATA_BLOCK` header naming the block number. `{ ... }` attribute blocks are
//! dropped.

use crate::error::{Result, S7Error};

/// A node of the field tree.
#[derive(Debug, Clone, PartialEq)]
pub enum DbNode {
    /// Raw `type[:=default];//comment` payload of a leaf field.
    Leaf(String),
    /// Nested struct.
    Struct(DbObject),
    /// Array of structs, one entry per index from lower to upper bound.
    StructArray(Vec<(i32, DbObject)>),
}

/// Ordered mapping from field names to nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbObject {
    entries: Vec<(String, DbNode)>,
}

impl DbObject {
    /// Fields in source order.
    pub fn entries(&self) -> &[(String, DbNode)] {
        &self.entries
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&DbNode> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, node)| node)
    }

    /// Number of direct fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the struct has no fields.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, name: String, node: DbNode) {
        self.entries.push((name, node));
    }
}

/// Result of lexing a data-block source.
#[derive(Debug, Clone, PartialEq)]
pub struct DbSource {
    /// Block number from a `DATA_BLOCK "DB<n>"` header, if present.
    pub db_number: Option<u16>,
    /// Top level struct.
    pub root: DbObject,
}

/// Lexes data-block source text into a field tree.
///
/// # Errors
///
/// - `NoStructureFound` if there is no `STRUCT` line
/// - `UnterminatedStruct` if the input ends before a matching `END_STRUCT`
/// - `MissingTypeSeparator` for a field line without `:`
/// - `InvalidArrayBounds` for a struct array with unusable bounds
///
/// # Example
///
/// ```
/// use s7_access::source::{parse_source, DbNode};
///
/// let src = parse_source("DATA_BLOCK DB3\nSTRUCT\n a : Int; // first\nEND_STRUCT;")?;
/// assert_eq!(src.db_number, Some(3));
/// assert_eq!(src.root.get("a"), Some(&DbNode::Leaf("Int;//first".to_string())));
/// # Ok::<(), s7_access::S7Error>(())
/// ```
pub fn parse_source(text: &str) -> Result<DbSource> {
    let mut lines = text
        .lines()
        .map(normalize_line)
        .filter(|l| !code_part(l).is_empty());

    let mut db_number = None;
    loop {
        let line = lines.next().ok_or(S7Error::NoStructureFound)?;
        let code = code_part(&line).to_ascii_uppercase();
        if code == "STRUCT" {
            break;
        }
        if let Some(header) = code.strip_prefix("DATA_BLOCK") {
            db_number = header_db_number(header);
        }
    }

    let root = parse_struct(&mut lines)?;
    Ok(DbSource { db_number, root })
}

fn parse_struct<I>(lines: &mut I) -> Result<DbObject>
where
    I: Iterator<Item = String>,
{
    let mut object = DbObject::default();
    loop {
        let line = lines.next().ok_or(S7Error::UnterminatedStruct)?;
        let code = code_part(&line);
        let upper = code.to_ascii_uppercase();

        if upper.starts_with("END_STRUCT") {
            return Ok(object);
        }

        let colon = find_unquoted(code, ":").ok_or_else(|| S7Error::MissingTypeSeparator {
            line: line.clone(),
        })?;
        let (name, ty) = (&code[..colon], &code[colon + 1..]);
        let ty_upper = ty.to_ascii_uppercase();
        if ty_upper.starts_with("ARRAY[") && ty_upper.ends_with("]OFSTRUCT") {
            let bounds = &ty["ARRAY[".len()..ty.len() - "]OFSTRUCT".len()];
            let (lower, upper) = parse_bounds(bounds)?;
            let body = parse_struct(lines)?;
            let instances = (lower..=upper).map(|i| (i, body.clone())).collect();
            object.push(unquote(name), DbNode::StructArray(instances));
            continue;
        }
        if ty_upper == "STRUCT" {
            let body = parse_struct(lines)?;
            object.push(unquote(name), DbNode::Struct(body));
            continue;
        }

        let comment = &line[code.len()..];
        object.push(unquote(name), DbNode::Leaf(format!("{}{}", ty, comment)));
    }
}

/// Parses `lower..upper` array bounds.
pub(crate) fn parse_bounds(bounds: &str) -> Result<(i32, i32)> {
    let invalid = || S7Error::InvalidArrayBounds {
        bounds: bounds.to_string(),
    };
    let (lower, upper) = bounds.split_once("..").ok_or_else(invalid)?;
    let lower = lower.parse::<i32>().map_err(|_| invalid())?;
    let upper = upper.parse::<i32>().map_err(|_| invalid())?;
    if upper < lower {
        return Err(invalid());
    }
    Ok((lower, upper))
}

/// Removes whitespace and `{...}` attribute blocks from the code part of a
/// line, keeps the trimmed comment.
fn normalize_line(line: &str) -> String {
    let (code, comment) = match find_unquoted(line, "//") {
        Some(at) => (&line[..at], Some(line[at + 2..].trim())),
        None => (line, None),
    };

    let mut out = String::with_capacity(line.len());
    let mut in_quotes = false;
    let mut brace_depth = 0usize;
    for c in code.chars() {
        match c {
            '"' if brace_depth == 0 => {
                in_quotes = !in_quotes;
                out.push(c);
            }
            '{' if !in_quotes => brace_depth += 1,
            '}' if !in_quotes && brace_depth > 0 => brace_depth -= 1,
            _ if brace_depth > 0 => {}
            c if c.is_whitespace() && !in_quotes => {}
            c => out.push(c),
        }
    }

    if let Some(comment) = comment {
        out.push_str("//");
        out.push_str(comment);
    }
    out
}

/// Code part of a normalized line, without a trailing comment.
fn code_part(line: &str) -> &str {
    find_unquoted(line, "//").map_or(line, |at| &line[..at])
}

/// Byte offset of the first `pattern` outside double quotes.
pub(crate) fn find_unquoted(line: &str, pattern: &str) -> Option<usize> {
    let mut in_quotes = false;
    for (at, c) in line.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if !in_quotes && line[at..].starts_with(pattern) {
            return Some(at);
        }
    }
    None
}

fn unquote(name: &str) -> String {
    name.trim_matches('"').to_string()
}

/// Reads `n` from a `"DB<n>"` or `DB<n>` header tail.
fn header_db_number(header: &str) -> Option<u16> {
    header.trim_matches('"').strip_prefix("DB")?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = r#"
DATA_BLOCK "DB12"
{ S7_Optimized_Access := 'FALSE' }
VERSION : 0.1
NON_RETAIN
   STRUCT
      // flags
      "run flag" : Bool;   // machine running
      motor : Struct   // drive data
         speed { ExternalAccessible := 'False'} : Int := 5;
         on : Bool;
      END_STRUCT;
      axis : Array[1..2] of Struct
         pos : Real;
      END_STRUCT;
   END_STRUCT;

BEGIN
   motor.speed := 5;
END_DATA_BLOCK
"#;

    #[test]
    fn test_nested_tree() {
        let src = parse_source(NESTED).unwrap();
        assert_eq!(src.db_number, Some(12));

        let names: Vec<&str> = src.root.entries().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["run flag", "motor", "axis"]);

        assert_eq!(
            src.root.get("run flag"),
            Some(&DbNode::Leaf("Bool;//machine running".to_string()))
        );

        match src.root.get("motor") {
            Some(DbNode::Struct(motor)) => {
                assert_eq!(motor.len(), 2);
                assert_eq!(motor.get("speed"), Some(&DbNode::Leaf("Int:=5;".to_string())));
            }
            other => panic!("unexpected node: {:?}", other),
        }

        match src.root.get("axis") {
            Some(DbNode::StructArray(instances)) => {
                let keys: Vec<i32> = instances.iter().map(|(i, _)| *i).collect();
                assert_eq!(keys, vec![1, 2]);
                assert_eq!(instances[0].1, instances[1].1);
                assert!(instances[0].1.get("pos").is_some());
            }
            other => panic!("unexpected node: {:?}", other),
        }
    }

    #[test]
    fn test_no_structure() {
        assert!(matches!(
            parse_source("DATA_BLOCK DB1\nBEGIN\nEND_DATA_BLOCK"),
            Err(S7Error::NoStructureFound)
        ));
        assert!(matches!(parse_source(""), Err(S7Error::NoStructureFound)));
    }

    #[test]
    fn test_unterminated() {
        assert!(matches!(
            parse_source("STRUCT\n a : Int;\n s : Struct\n b : Bool;\nEND_STRUCT;"),
            Err(S7Error::UnterminatedStruct)
        ));
    }

    #[test]
    fn test_missing_separator() {
        match parse_source("STRUCT\n a Int;\nEND_STRUCT") {
            Err(S7Error::MissingTypeSeparator { line }) => assert_eq!(line, "aInt;"),
            other => panic!("unexpected result: {:?}", other),
        }
        // a colon in the comment is not a separator
        match parse_source("STRUCT\n a Int; // note: x\nEND_STRUCT") {
            Err(S7Error::MissingTypeSeparator { line }) => assert_eq!(line, "aInt;//note: x"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_quoted_names() {
        let src = parse_source(
            "STRUCT\n \"a//b\" : Int; // c: d\n \"x:y\" : Bool;\n \
             \"s//t\" : Struct\n v : Byte;\n END_STRUCT;\nEND_STRUCT",
        )
        .unwrap();
        let names: Vec<&str> = src.root.entries().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["a//b", "x:y", "s//t"]);
        assert_eq!(src.root.get("a//b"), Some(&DbNode::Leaf("Int;//c: d".to_string())));
        assert_eq!(src.root.get("x:y"), Some(&DbNode::Leaf("Bool;".to_string())));
    }

    #[test]
    fn test_find_unquoted() {
        assert_eq!(find_unquoted("a:Int;//x:y", ":"), Some(1));
        assert_eq!(find_unquoted("\"a//b\":Int;//c", "//"), Some(11));
        assert_eq!(find_unquoted("\"a:b\"", ":"), None);
    }

    #[test]
    fn test_struct_array_bounds() {
        assert!(matches!(
            parse_source("STRUCT\n a : Array[x..2] of Struct\n b : Byte;\nEND_STRUCT;\nEND_STRUCT"),
            Err(S7Error::InvalidArrayBounds { .. })
        ));
        assert!(matches!(
            parse_source("STRUCT\n a : Array[3..2] of Struct\n b : Byte;\nEND_STRUCT;\nEND_STRUCT"),
            Err(S7Error::InvalidArrayBounds { .. })
        ));
    }

    #[test]
    fn test_parse_bounds() {
        assert_eq!(parse_bounds("0..7").unwrap(), (0, 7));
        assert_eq!(parse_bounds("-2..2").unwrap(), (-2, 2));
        assert!(parse_bounds("..2").is_err());
        assert!(parse_bounds("0..1,0..2").is_err());
    }

    #[test]
    fn test_header_variants() {
        assert_eq!(header_db_number("\"DB5\""), Some(5));
        assert_eq!(header_db_number("DB17"), Some(17));
        assert_eq!(header_db_number("\"Settings\""), None);
    }
}
