//! Source buffer scanner.
//!
//! Finds every GUID declared in a C/C++/IDL source buffer:
//!
//! - sweep A: `DEFINE_GUID`-family macros and `const GUID NAME = { ... };`
//! - sweep B: anonymous `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}` strings
//!
//! The buffer encoding is detected once from its byte-order mark (or a
//! zero-byte heuristic), the whole buffer is decoded, and the merged results
//! are sorted and deduplicated.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use encoding_rs::{UTF_8, UTF_16LE};
use tracing::{debug, trace};

use crate::guid::{GuidError, NamedEntry};
use crate::parse::{self, RESERVED_DECORATOR};

/// Text encoding of a scanned buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl SourceEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf16Le => "utf-16le",
            Self::Utf16Be => "utf-16be",
        }
    }
}

/// Detect the encoding and return it with the length of the byte-order mark.
///
/// Without a mark, a zero in byte 1 (but not byte 0) means UTF-16LE and a
/// zero in byte 0 (but not byte 1) means UTF-16BE. Everything else is UTF-8.
pub fn detect_encoding(bytes: &[u8]) -> (SourceEncoding, usize) {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return (SourceEncoding::Utf8, 3);
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return (SourceEncoding::Utf16Le, 2);
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return (SourceEncoding::Utf16Be, 2);
    }
    match bytes {
        [first, 0, ..] if *first != 0 => (SourceEncoding::Utf16Le, 0),
        [0, second, ..] if *second != 0 => (SourceEncoding::Utf16Be, 0),
        _ => (SourceEncoding::Utf8, 0),
    }
}

/// Swap each byte pair, turning UTF-16BE into UTF-16LE. An odd trailing
/// byte is dropped.
fn swap_byte_pairs(bytes: &[u8]) -> Vec<u8> {
    bytes
        .chunks_exact(2)
        .flat_map(|pair| [pair[1], pair[0]])
        .collect()
}

/// Decode `bytes` (without its byte-order mark) as `encoding`.
///
/// Invalid sequences become U+FFFD; an odd trailing byte in UTF-16 input is
/// ignored.
pub fn decode_as(bytes: &[u8], encoding: SourceEncoding) -> String {
    match encoding {
        SourceEncoding::Utf8 => UTF_8.decode_without_bom_handling(bytes).0.into_owned(),
        SourceEncoding::Utf16Le => {
            let even = &bytes[..bytes.len() - bytes.len() % 2];
            UTF_16LE.decode_without_bom_handling(even).0.into_owned()
        }
        SourceEncoding::Utf16Be => decode_as(&swap_byte_pairs(bytes), SourceEncoding::Utf16Le),
    }
}

/// Detect the encoding of `bytes` and decode the text after the mark.
pub fn decode(bytes: &[u8]) -> (SourceEncoding, String) {
    let (encoding, mark_len) = detect_encoding(bytes);
    (encoding, decode_as(&bytes[mark_len..], encoding))
}

/// Sort by name then bytes and drop repeated `(name, guid)` pairs.
pub fn sort_and_unique(entries: &mut Vec<NamedEntry>) {
    entries.sort();
    entries.dedup();
}

/// Tracks the next occurrence of each keyword so a failed candidate does not
/// force a rescan for every keyword.
struct KeywordFinder<'a> {
    text: &'a str,
    keywords: Vec<&'static str>,
    next: Vec<Option<usize>>,
}

impl<'a> KeywordFinder<'a> {
    fn new(text: &'a str, keywords: Vec<&'static str>) -> Self {
        let next = keywords.iter().map(|kw| text.find(kw)).collect();
        Self {
            text,
            keywords,
            next,
        }
    }

    /// Leftmost keyword occurrence at or after `from`.
    fn find(&mut self, from: usize) -> Option<(usize, &'static str)> {
        for (slot, keyword) in self.next.iter_mut().zip(&self.keywords) {
            if let Some(pos) = *slot
                && pos < from
            {
                *slot = self.text[from..].find(keyword).map(|i| from + i);
            }
        }
        self.next
            .iter()
            .zip(&self.keywords)
            .filter_map(|(slot, keyword)| slot.map(|pos| (pos, *keyword)))
            .min_by_key(|(pos, _)| *pos)
    }
}

/// Outcome of matching the braces of a `const GUID` initializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BraceState {
    /// Ran out of text before the braces closed.
    Scanning,
    /// Byte offset of the closing `}`.
    Found(usize),
    /// Byte offset of a `;` or `=` met before the braces closed.
    Aborted(usize),
}

fn match_braces(text: &str, open: usize) -> BraceState {
    let mut depth = 0usize;
    for (i, &b) in text.as_bytes()[open..].iter().enumerate() {
        match b {
            b';' | b'=' => return BraceState::Aborted(open + i),
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return BraceState::Found(open + i);
                }
            }
            _ => {}
        }
    }
    BraceState::Scanning
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while bytes.get(pos).is_some_and(u8::is_ascii_whitespace) {
        pos += 1;
    }
    pos
}

/// Read a C identifier starting at `pos`, returning it and the offset after it.
fn read_identifier(text: &str, pos: usize) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    let first = *bytes.get(pos)?;
    if !first.is_ascii_alphabetic() && first != b'_' {
        return None;
    }
    let mut end = pos + 1;
    while bytes
        .get(end)
        .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_')
    {
        end += 1;
    }
    Some((&text[pos..end], end))
}

/// Walk `const GUID [OLEDBDECLSPEC] NAME = { ... }` starting at the `const`
/// at `start`.
///
/// Returns the entry and the offset after its closing brace, or the offset
/// the sweep should resume from. The resume offset is always past `start`.
fn scan_const_declaration(text: &str, start: usize) -> Result<(NamedEntry, usize), usize> {
    let bytes = text.as_bytes();
    let after_const = start + "const".len();

    if !bytes.get(after_const).is_some_and(u8::is_ascii_whitespace) {
        return Err(after_const);
    }

    let mut pos = skip_whitespace(bytes, after_const);
    if !text[pos..].starts_with("GUID") || !bytes.get(pos + 4).is_some_and(u8::is_ascii_whitespace) {
        return Err(after_const);
    }
    pos = skip_whitespace(bytes, pos + 4);

    let (mut name, mut end) = read_identifier(text, pos).ok_or(after_const)?;
    while name == RESERVED_DECORATOR {
        (name, end) = read_identifier(text, skip_whitespace(bytes, end)).ok_or(after_const)?;
    }

    pos = skip_whitespace(bytes, end);
    if bytes.get(pos) != Some(&b'=') {
        return Err(after_const);
    }
    pos = skip_whitespace(bytes, pos + 1);
    if bytes.get(pos) != Some(&b'{') {
        return Err(after_const);
    }

    match match_braces(text, pos) {
        BraceState::Found(close) => match parse::from_struct_text(&text[pos..=close]) {
            Some(guid) => Ok((NamedEntry::new(name, guid), close + 1)),
            None => {
                trace!(name, "const GUID initializer rejected");
                Err(pos)
            }
        },
        BraceState::Aborted(at) => {
            trace!(name, "const GUID initializer aborted");
            Err(at)
        }
        BraceState::Scanning => {
            trace!(name, "const GUID initializer truncated");
            Err(pos)
        }
    }
}

/// Sweep A: definition macros and `const GUID` declarations.
fn scan_declarations(text: &str, found: &mut Vec<NamedEntry>) {
    let keywords = parse::definition_keywords()
        .chain(std::iter::once("const"))
        .collect();
    let mut finder = KeywordFinder::new(text, keywords);
    let mut cursor = 0;

    while let Some((start, keyword)) = finder.find(cursor) {
        if keyword == "const" {
            cursor = match scan_const_declaration(text, start) {
                Ok((entry, resume)) => {
                    found.push(entry);
                    resume
                }
                Err(resume) => resume,
            };
            continue;
        }

        let Some(close) = text[start..].find(')').map(|i| start + i) else {
            cursor = start + 1;
            continue;
        };

        match parse::from_definition(&text[start..=close]) {
            Some((guid, name)) => {
                found.push(NamedEntry::new(name, guid));
                cursor = close + 1;
            }
            None => {
                trace!(keyword, offset = start, "definition candidate rejected");
                cursor = start + 1;
            }
        }
    }
}

/// Sweep B: braced GUID strings.
fn scan_guid_texts(text: &str, found: &mut Vec<NamedEntry>) {
    let mut cursor = 0;

    while let Some(open) = text[cursor..].find('{').map(|i| cursor + i) {
        let Some(close) = text[open..].find('}').map(|i| open + i) else {
            break;
        };

        match parse::from_guid_text(&text[open..=close]) {
            Some(guid) => {
                found.push(NamedEntry::anonymous(guid));
                cursor = close + 1;
            }
            None => cursor = open + 1,
        }
    }
}

/// Scan decoded text for every GUID, sorted and deduplicated.
pub fn scan_text(text: &str) -> Vec<NamedEntry> {
    let mut found = Vec::new();
    scan_declarations(text, &mut found);
    let declared = found.len();
    scan_guid_texts(text, &mut found);
    debug!(
        declared,
        braced = found.len() - declared,
        "scanned {} chars",
        text.len()
    );
    sort_and_unique(&mut found);
    found
}

/// Detect the encoding of a raw buffer, decode it and scan it.
pub fn scan_bytes(bytes: &[u8]) -> Vec<NamedEntry> {
    let (encoding, text) = decode(bytes);
    debug!(encoding = encoding.as_str(), bytes = bytes.len(), "decoded source");
    scan_text(&text)
}

/// Read everything from `reader` and scan it.
pub fn scan_reader<R: Read>(mut reader: R) -> Result<Vec<NamedEntry>, GuidError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(scan_bytes(&bytes))
}

/// Scan a source file.
pub fn scan_file(path: &Path) -> Result<Vec<NamedEntry>, GuidError> {
    let file = File::open(path)?;
    scan_reader(file)
}
