//! The 16-byte GUID value, named entries, and the crate error type.
//!
//! Bytes are kept in the in-memory order of the C `GUID` struct on a
//! little-endian machine: `Data1` (4 bytes LE), `Data2` (2 bytes LE),
//! `Data3` (2 bytes LE), then the eight `Data4` bytes in order.

use std::fmt;
use std::str::FromStr;

use rand::random_range;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors that can occur during GUID operations.
#[derive(Error, Debug)]
pub enum GuidError {
    #[error("Invalid GUID format: {0}")]
    InvalidFormat(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A 128-bit identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Guid([u8; 16]);

impl Guid {
    /// Wrap 16 bytes in storage order.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// The all-zero GUID.
    pub const fn nil() -> Self {
        Self([0; 16])
    }

    /// Build a GUID from its four C struct fields.
    pub fn from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..4].copy_from_slice(&data1.to_le_bytes());
        bytes[4..6].copy_from_slice(&data2.to_le_bytes());
        bytes[6..8].copy_from_slice(&data3.to_le_bytes());
        bytes[8..16].copy_from_slice(&data4);
        Self(bytes)
    }

    /// Generate a random RFC 4122 version 4 GUID.
    pub fn random() -> Self {
        let mut bytes = [0u8; 16];
        for byte in &mut bytes {
            *byte = random_range(0..=u8::MAX);
        }
        // high byte of Data3 carries the version nibble
        bytes[7] = (bytes[7] & 0x0F) | 0x40;
        bytes[8] = (bytes[8] & 0x3F) | 0x80;
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn data1(&self) -> u32 {
        u32::from_le_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    pub fn data2(&self) -> u16 {
        u16::from_le_bytes([self.0[4], self.0[5]])
    }

    pub fn data3(&self) -> u16 {
        u16::from_le_bytes([self.0[6], self.0[7]])
    }

    pub fn data4(&self) -> [u8; 8] {
        let mut data4 = [0u8; 8];
        data4.copy_from_slice(&self.0[8..16]);
        data4
    }
}

/// Renders the canonical `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}` form.
impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data4 = self.data4();
        write!(
            f,
            "{{{:08X}-{:04X}-{:04X}-{}-{}}}",
            self.data1(),
            self.data2(),
            self.data3(),
            hex::encode_upper(&data4[..2]),
            hex::encode_upper(&data4[2..])
        )
    }
}

/// Accepts any of the four surface syntaxes, in disambiguation order.
impl FromStr for Guid {
    type Err = GuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parse::parse(s).ok_or_else(|| GuidError::InvalidFormat(s.to_string()))
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Guid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

/// A GUID with an optional symbolic name.
///
/// Ordering is by name (anonymous entries first), then by raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamedEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub guid: Guid,
}

impl NamedEntry {
    pub fn new(name: impl Into<String>, guid: Guid) -> Self {
        Self {
            name: Some(name.into()),
            guid,
        }
    }

    pub fn anonymous(guid: Guid) -> Self {
        Self { name: None, guid }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
