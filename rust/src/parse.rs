//! Recognizers for the four GUID surface syntaxes.
//!
//! ```text
//! GUID text   {XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}
//! definition  DEFINE_GUID(NAME, l, w1, w2, b1, b2, b3, b4, b5, b6, b7, b8);
//! struct      { l, w1, w2, { b1, b2, b3, b4, b5, b6, b7, b8 } }
//! hex         F9 14 02 00 00 00 00 00 C0 00 00 00 00 00 00 46
//! ```
//!
//! A mismatch is never an error: every parser returns `None` and has no side
//! effects. [`parse`] tries the grammars in [`Format::PRIORITY`] order.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::guid::Guid;
use crate::text;

/// `Data4` of every `DEFINE_OLEGUID`: the COM reserved suffix `C0 00 .. 00 46`.
pub const OLE_GUID_TAIL: [u8; 8] = [0xC0, 0, 0, 0, 0, 0, 0, 0x46];

/// Storage class decorator that may precede the name in `const GUID` lines.
pub const RESERVED_DECORATOR: &str = "OLEDBDECLSPEC";

static GUID_TEXT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\{([0-9A-Fa-f]{8})-([0-9A-Fa-f]{4})-([0-9A-Fa-f]{4})-([0-9A-Fa-f]{4})-([0-9A-Fa-f]{12})\}$",
    )
    .unwrap()
});

static NAMED_STRUCT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)^(?:const\s+GUID\s+(?:OLEDBDECLSPEC\s+)?)?([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(\{.*\})\s*;?$",
    )
    .unwrap()
});

static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Surface syntax of a GUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    GuidText,
    Definition,
    Struct,
    Hex,
}

impl Format {
    /// Disambiguation order. Stricter grammars come first; hex accepts any
    /// 32 hex digits and must stay last.
    pub const PRIORITY: [Format; 4] = [
        Format::GuidText,
        Format::Definition,
        Format::Struct,
        Format::Hex,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GuidText => "guid",
            Self::Definition => "definition",
            Self::Struct => "struct",
            Self::Hex => "hex",
        }
    }

    /// Run this format's parser alone.
    pub fn try_parse(self, text: &str) -> Option<Guid> {
        match self {
            Self::GuidText => from_guid_text(text),
            Self::Definition => from_definition(text).map(|(guid, _)| guid),
            Self::Struct => from_struct_text(text),
            Self::Hex => from_hex_text(text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    /// `DEFINE_GUID` / `EXTERN_GUID`
    Plain,
    /// `DEFINE_CODECAPI_GUID(name, "string", ...)`
    CodecApi,
    /// `MIDL_DEFINE_GUID(type, name, ...)`
    Midl,
    /// `DEFINE_OLEGUID(name, l, w1, w2)`
    Ole,
}

/// Definition macro keywords. No keyword is a prefix of another.
const DEFINITION_KEYWORDS: [(&str, Dialect); 5] = [
    ("DEFINE_GUID", Dialect::Plain),
    ("EXTERN_GUID", Dialect::Plain),
    ("DEFINE_CODECAPI_GUID", Dialect::CodecApi),
    ("MIDL_DEFINE_GUID", Dialect::Midl),
    ("DEFINE_OLEGUID", Dialect::Ole),
];

/// Keywords that open a definition macro.
pub fn definition_keywords() -> impl Iterator<Item = &'static str> {
    DEFINITION_KEYWORDS.iter().map(|(keyword, _)| *keyword)
}

/// Parse a C unsigned integer literal the way `strtoul(s, &end, 0)` would,
/// requiring that nothing but an optional `L` suffix is left over.
///
/// `0x`/`0X` selects hexadecimal, a leading `0` octal, anything else decimal.
/// Unlike `strtoul`, a leading `-` is rejected rather than negated, and a
/// value that overflows `u64` is rejected rather than saturated.
pub fn parse_value(field: &str) -> Option<u64> {
    let literal = text::trim(field);
    let literal = literal.strip_suffix('L').unwrap_or(literal);
    let literal = literal.strip_prefix('+').unwrap_or(literal);

    let (digits, radix) = if let Some(hex) = literal
        .strip_prefix("0x")
        .or_else(|| literal.strip_prefix("0X"))
    {
        (hex, 16)
    } else if literal.len() > 1 && literal.starts_with('0') {
        (&literal[1..], 8)
    } else {
        (literal, 10)
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}

/// Whether `field` is a complete integer literal (see [`parse_value`]).
pub fn is_valid_value(field: &str) -> bool {
    parse_value(field).is_some()
}

/// Build a GUID from exactly 11 numeric fields, truncating each to its width.
fn guid_from_fields(fields: &[&str]) -> Option<Guid> {
    if fields.len() != 11 {
        return None;
    }
    let values = fields
        .iter()
        .map(|field| parse_value(field))
        .collect::<Option<Vec<u64>>>()?;
    Some(guid_from_values(&values))
}

fn guid_from_values(values: &[u64]) -> Guid {
    let mut data4 = [0u8; 8];
    for (byte, value) in data4.iter_mut().zip(&values[3..]) {
        *byte = *value as u8;
    }
    Guid::from_fields(values[0] as u32, values[1] as u16, values[2] as u16, data4)
}

/// Parse the braced canonical form. No surrounding whitespace is accepted.
pub fn from_guid_text(text: &str) -> Option<Guid> {
    let caps = GUID_TEXT_PATTERN.captures(text)?;

    let data1 = u32::from_str_radix(&caps[1], 16).ok()?;
    let data2 = u16::from_str_radix(&caps[2], 16).ok()?;
    let data3 = u16::from_str_radix(&caps[3], 16).ok()?;
    let mut data4 = [0u8; 8];
    hex::decode_to_slice(&caps[4], &mut data4[..2]).ok()?;
    hex::decode_to_slice(&caps[5], &mut data4[2..]).ok()?;

    Some(Guid::from_fields(data1, data2, data3, data4))
}

/// Parse a definition macro, returning the GUID and its symbolic name.
pub fn from_definition(text: &str) -> Option<(Guid, String)> {
    let cleaned = text::remove_comments(text::trim(text));
    let body = text::trim(&cleaned);

    let (dialect, rest) = DEFINITION_KEYWORDS
        .iter()
        .find_map(|&(keyword, dialect)| body.strip_prefix(keyword).map(|rest| (dialect, rest)))?;

    let rest = text::trim(rest).strip_prefix('(')?;
    let rest = text::trim(rest);
    let rest = rest.strip_suffix(';').unwrap_or(rest);
    let rest = text::trim(rest).strip_suffix(')')?;

    let compact = text::remove_chars(text::trim(rest), &[' ', '\t']);
    let mut items = text::split(&compact, &[',']);

    match dialect {
        Dialect::Plain | Dialect::Ole => {}
        Dialect::CodecApi => {
            if items.len() < 2 {
                return None;
            }
            items.remove(1);
        }
        Dialect::Midl => {
            if items.is_empty() {
                return None;
            }
            items.remove(0);
        }
    }

    let name = text::trim(items.first()?);
    if name.is_empty() {
        return None;
    }

    let guid = if dialect == Dialect::Ole && items.len() == 4 {
        let mut values = items[1..]
            .iter()
            .map(|field| parse_value(field))
            .collect::<Option<Vec<u64>>>()?;
        values.extend(OLE_GUID_TAIL.iter().map(|&b| u64::from(b)));
        guid_from_values(&values)
    } else if items.len() == 12 {
        guid_from_fields(&items[1..])?
    } else {
        return None;
    };

    Some((guid, name.to_string()))
}

/// Whether every `}` closes an earlier `{` and nothing is left open.
fn braces_balanced(text: &str) -> bool {
    let mut depth = 0usize;
    for ch in text.chars() {
        match ch {
            '{' => depth += 1,
            '}' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

/// Parse an anonymous struct initializer: `{ l, w1, w2, { b1, ..., b8 } }`.
///
/// Inner braces are flattened, so `{ l, w1, w2, b1, ..., b8 }` is accepted
/// as well. One trailing `;` is allowed.
pub fn from_struct_text(text: &str) -> Option<Guid> {
    let cleaned = text::remove_comments(text::trim(text));
    let body = text::trim(&cleaned);

    if !braces_balanced(body) {
        return None;
    }

    let body = body.strip_suffix(';').unwrap_or(body);
    let body = text::trim(body).strip_prefix('{')?;
    let body = text::trim(body).strip_suffix('}')?;

    let compact = text::remove_chars(body, &['{', '}', ' ', '\t']);
    let fields = text::split(&compact, &[',']);
    guid_from_fields(&fields)
}

/// Parse a named struct declaration: `[const GUID] NAME = { ... }[;]`.
pub fn from_struct_definition(text: &str) -> Option<(Guid, String)> {
    let cleaned = text::remove_comments(text::trim(text));
    let caps = NAMED_STRUCT_PATTERN.captures(text::trim(&cleaned))?;
    let guid = from_struct_text(&caps[2])?;
    Some((guid, caps[1].to_string()))
}

/// Parse 32 hex digits in storage order. `0x` prefixes, commas and
/// whitespace are ignored; any other character rejects the input.
pub fn from_hex_text(text: &str) -> Option<Guid> {
    let stripped = text::trim(text).replace("0x", "").replace("0X", "");
    let digits = text::remove_chars(&stripped, &[',', ' ', '\t', '\r', '\n']);

    if digits.len() != 32 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let mut bytes = [0u8; 16];
    hex::decode_to_slice(&digits, &mut bytes).ok()?;
    Some(Guid::from_bytes(bytes))
}

pub fn is_guid_text(text: &str) -> bool {
    from_guid_text(text).is_some()
}

pub fn is_definition(text: &str) -> bool {
    from_definition(text).is_some()
}

pub fn is_struct_text(text: &str) -> bool {
    from_struct_text(text).is_some()
}

pub fn is_hex_text(text: &str) -> bool {
    from_hex_text(text).is_some()
}

/// C identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(text: &str) -> bool {
    IDENTIFIER_PATTERN.is_match(text)
}

/// Try every grammar in priority order and report which one matched.
pub fn parse_format(text: &str) -> Option<(Format, Guid)> {
    Format::PRIORITY
        .iter()
        .find_map(|&format| format.try_parse(text).map(|guid| (format, guid)))
}

/// Parse `text` in whichever surface syntax it is written in.
pub fn parse(text: &str) -> Option<Guid> {
    parse_format(text).map(|(_, guid)| guid)
}

/// Like [`parse`], but keeps the symbolic name carried by definition macros
/// and named struct declarations.
pub fn parse_named(text: &str) -> Option<(Guid, Option<String>)> {
    if let Some(guid) = from_guid_text(text) {
        return Some((guid, None));
    }
    if let Some((guid, name)) = from_definition(text) {
        return Some((guid, Some(name)));
    }
    if let Some((guid, name)) = from_struct_definition(text) {
        return Some((guid, Some(name)));
    }
    from_struct_text(text)
        .or_else(|| from_hex_text(text))
        .map(|guid| (guid, None))
}
