//! rguid: GUID analyzer.
//!
//! Recognizes, converts and locates GUIDs written in any of the surface
//! syntaxes found in C/C++/IDL sources and registry dumps.
//!
//! # Formats
//!
//! ```text
//! GUID text   {000214F9-0000-0000-C000-000000000046}
//! definition  DEFINE_GUID(IID_IShellLinkW, 0x000214F9, 0x0000, 0x0000, 0xC0, ..., 0x46);
//! struct      { 0x000214F9, 0x0000, 0x0000, { 0xC0, 0x00, ..., 0x46 } }
//! hex         F9 14 02 00 00 00 00 00 C0 00 00 00 00 00 00 46
//! ```
//!
//! # Example
//!
//! ```
//! use rguid::{parse, to_hex_text};
//!
//! let guid = parse("{000214F9-0000-0000-C000-000000000046}").expect("valid GUID text");
//! assert_eq!(to_hex_text(&guid), "F9 14 02 00 00 00 00 00 C0 00 00 00 00 00 00 46");
//!
//! let found = rguid::scan_text("DEFINE_OLEGUID(IID_IShellLinkW, 0x000214F9, 0, 0);");
//! assert_eq!(found[0].name(), Some("IID_IShellLinkW"));
//! assert_eq!(found[0].guid, guid);
//! ```

mod database;
mod guid;
mod parse;
mod render;
mod scan;
pub mod text;

pub use database::{GuidDatabase, search_by_name, search_by_substring, search_by_value};
pub use guid::{Guid, GuidError, NamedEntry};
pub use parse::{
    Format, OLE_GUID_TAIL, RESERVED_DECORATOR, from_definition, from_guid_text, from_hex_text,
    from_struct_definition, from_struct_text, is_definition, is_guid_text, is_hex_text,
    is_identifier, is_struct_text, is_valid_value, parse, parse_format, parse_named, parse_value,
};
pub use render::{NAME_PLACEHOLDER, dump, to_definition, to_guid_text, to_hex_text, to_struct_text};
pub use scan::{
    SourceEncoding, decode, detect_encoding, scan_bytes, scan_file, scan_reader, scan_text,
    sort_and_unique,
};
