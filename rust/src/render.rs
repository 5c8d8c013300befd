//! Renderers for the four GUID surface syntaxes, plus a combined dump.
//!
//! Hex fields are uppercase and zero-padded to their field width.

use crate::guid::Guid;

/// Name written by [`to_definition`] when none is supplied.
pub const NAME_PLACEHOLDER: &str = "<Name>";

fn non_empty(name: Option<&str>) -> Option<&str> {
    name.filter(|n| !n.is_empty())
}

fn data4_list(guid: &Guid) -> String {
    guid.data4()
        .iter()
        .map(|b| format!("0x{b:02X}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}`
pub fn to_guid_text(guid: &Guid) -> String {
    guid.to_string()
}

/// `DEFINE_GUID(NAME, 0x........, 0x...., 0x...., 0x.., ...);`
pub fn to_definition(guid: &Guid, name: Option<&str>) -> String {
    format!(
        "DEFINE_GUID({}, 0x{:08X}, 0x{:04X}, 0x{:04X}, {});",
        non_empty(name).unwrap_or(NAME_PLACEHOLDER),
        guid.data1(),
        guid.data2(),
        guid.data3(),
        data4_list(guid)
    )
}

/// `{ 0x........, 0x...., 0x...., { 0x.., ... } }`, or with a name
/// `const GUID NAME = { ... };`.
pub fn to_struct_text(guid: &Guid, name: Option<&str>) -> String {
    let body = format!(
        "{{ 0x{:08X}, 0x{:04X}, 0x{:04X}, {{ {} }} }}",
        guid.data1(),
        guid.data2(),
        guid.data3(),
        data4_list(guid)
    );
    match non_empty(name) {
        Some(name) => format!("const GUID {name} = {body};"),
        None => body,
    }
}

/// Sixteen space-separated byte pairs in storage order.
pub fn to_hex_text(guid: &Guid) -> String {
    guid.as_bytes()
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Human-readable listing of every rendering. Not meant to be parsed back.
pub fn dump(guid: &Guid, name: Option<&str>) -> String {
    let name = non_empty(name);
    let mut out = String::new();

    out.push_str(&to_definition(guid, name));
    out.push_str("\n\n");

    out.push_str("GUID: ");
    out.push_str(&to_guid_text(guid));
    out.push_str("\n\n");

    out.push_str("Hex: ");
    out.push_str(&to_hex_text(guid));
    out.push_str("\n\n");

    if name.is_none() {
        out.push_str("Struct: ");
    }
    out.push_str(&to_struct_text(guid, name));
    out.push('\n');

    out
}
