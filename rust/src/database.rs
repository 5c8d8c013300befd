//! Flat-file database of named GUIDs.
//!
//! One `DEFINE_GUID(...)` per line; lines that do not parse are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, warn};

use crate::guid::{Guid, GuidError, NamedEntry};
use crate::parse;
use crate::render;
use crate::text::{self, Codec};

/// First entry whose name matches `name`, ignoring case.
pub fn search_by_name<'a>(entries: &'a [NamedEntry], name: &str) -> Option<&'a NamedEntry> {
    let wanted = text::fold_case(name);
    entries
        .iter()
        .find(|entry| entry.name().is_some_and(|n| text::fold_case(n) == wanted))
}

/// Every entry with value `guid`.
pub fn search_by_value<'a>(entries: &'a [NamedEntry], guid: &Guid) -> Vec<&'a NamedEntry> {
    entries.iter().filter(|entry| entry.guid == *guid).collect()
}

/// Every entry whose definition, GUID text, struct or hex rendering contains
/// `needle`, ignoring case.
pub fn search_by_substring<'a>(entries: &'a [NamedEntry], needle: &str) -> Vec<&'a NamedEntry> {
    let needle = text::fold_case(needle);
    entries
        .iter()
        .filter(|entry| {
            let guid = &entry.guid;
            [
                render::to_definition(guid, entry.name()),
                render::to_guid_text(guid),
                render::to_struct_text(guid, None),
                render::to_hex_text(guid),
            ]
            .iter()
            .any(|rendering| text::fold_case(rendering).contains(&needle))
        })
        .collect()
}

/// In-memory GUID database.
#[derive(Debug, Clone, Default)]
pub struct GuidDatabase {
    entries: Vec<NamedEntry>,
}

impl GuidDatabase {
    pub fn new(entries: Vec<NamedEntry>) -> Self {
        Self { entries }
    }

    /// Load a database file, decoding lines with the locale codec.
    pub fn load(path: &Path) -> Result<Self, GuidError> {
        let codec = text::codec_from_env();
        Self::load_with_codec(path, codec.as_ref())
    }

    pub fn load_with_codec(path: &Path, codec: &dyn Codec) -> Result<Self, GuidError> {
        let file = File::open(path)?;
        let db = Self::from_reader(BufReader::new(file), codec)?;
        debug!(
            path = %path.display(),
            entries = db.len(),
            codec = codec.name(),
            "loaded GUID database"
        );
        Ok(db)
    }

    /// Read one definition per line from `reader`.
    pub fn from_reader<R: BufRead>(mut reader: R, codec: &dyn Codec) -> Result<Self, GuidError> {
        let mut entries = Vec::new();
        let mut raw = Vec::new();
        let mut line_no = 0usize;

        loop {
            raw.clear();
            if reader.read_until(b'\n', &mut raw)? == 0 {
                break;
            }
            line_no += 1;

            let line = codec.decode(&raw);
            let line = text::trim(&line);
            if line.is_empty() {
                continue;
            }

            match parse::from_definition(line) {
                Some((guid, name)) => entries.push(NamedEntry::new(name, guid)),
                None if line.contains("GUID") => {
                    warn!(line = line_no, "skipping unparsable definition")
                }
                None => {}
            }
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[NamedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn search_by_name(&self, name: &str) -> Option<&NamedEntry> {
        search_by_name(&self.entries, name)
    }

    pub fn search_by_guid(&self, guid: &Guid) -> Vec<&NamedEntry> {
        search_by_value(&self.entries, guid)
    }

    pub fn search_by_text(&self, needle: &str) -> Vec<&NamedEntry> {
        search_by_substring(&self.entries, needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::AsciiCodec;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    const DATA: &str = "\
DEFINE_GUID(IID_IShellLinkW, 0x000214F9, 0x0000, 0x0000, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46);\r
DEFINE_GUID(IID_IDeskBand, 0xEB0FE172, 0x1A3A, 0x11D0, 0x89, 0xB3, 0x00, 0xA0, 0xC9, 0x0A, 0x90, 0xAC);
# comment line

DEFINE_GUID(IID_Broken, 0xZZ, 0x0000, 0x0000, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46);
DEFINE_GUID(CLSID_ShellLinkAlias, 0x000214F9, 0x0000, 0x0000, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46);
";

    fn tmp_path(name: &str) -> PathBuf {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "rguid_db_{}_{}_{}",
            std::process::id(),
            ts,
            name
        ))
    }

    fn db() -> GuidDatabase {
        GuidDatabase::from_reader(DATA.as_bytes(), &AsciiCodec).unwrap()
    }

    #[test]
    fn test_from_reader_skips_bad_lines() {
        let db = db();
        assert_eq!(db.len(), 3);
        let names: Vec<_> = db.entries().iter().filter_map(NamedEntry::name).collect();
        assert_eq!(
            names,
            vec!["IID_IShellLinkW", "IID_IDeskBand", "CLSID_ShellLinkAlias"]
        );
    }

    #[test]
    fn test_search_by_name_is_case_insensitive() {
        let db = db();
        let entry = db.search_by_name("iid_ishelllinkw").unwrap();
        assert_eq!(entry.name(), Some("IID_IShellLinkW"));
        assert_eq!(
            entry.guid.to_string(),
            "{000214F9-0000-0000-C000-000000000046}"
        );
        assert!(db.search_by_name("IID_Missing").is_none());
    }

    #[test]
    fn test_search_by_guid_returns_all_names() {
        let db = db();
        let guid = parse::parse("{000214F9-0000-0000-C000-000000000046}").unwrap();
        let found: Vec<_> = db
            .search_by_guid(&guid)
            .into_iter()
            .filter_map(NamedEntry::name)
            .collect();
        assert_eq!(found, vec!["IID_IShellLinkW", "CLSID_ShellLinkAlias"]);
        assert!(db.search_by_guid(&Guid::nil()).is_empty());
    }

    #[test]
    fn test_search_by_text_over_every_rendering() {
        let db = db();
        // name fragment
        assert_eq!(db.search_by_text("deskband").len(), 1);
        // canonical fragment
        assert_eq!(db.search_by_text("1a3a-11d0").len(), 1);
        // hex fragment
        assert_eq!(db.search_by_text("F9 14 02").len(), 2);
        // struct fragment
        assert_eq!(db.search_by_text("0xEB0FE172, 0x1A3A").len(), 1);
        assert_eq!(db.search_by_text("shelllink").len(), 2);
        assert!(db.search_by_text("nothing like this").is_empty());
    }

    #[test]
    fn test_load_file() {
        let path = tmp_path("guid.dat");
        fs::write(&path, DATA).unwrap();
        let db = GuidDatabase::load_with_codec(&path, &AsciiCodec).unwrap();
        assert_eq!(db.len(), 3);
        let _ = fs::remove_file(&path);

        assert!(matches!(
            GuidDatabase::load_with_codec(&path, &AsciiCodec),
            Err(GuidError::Io(_))
        ));
    }

    #[test]
    fn test_free_functions_on_slices() {
        let entries = vec![
            NamedEntry::new("A", Guid::nil()),
            NamedEntry::anonymous(Guid::nil()),
        ];
        assert_eq!(search_by_name(&entries, "a"), Some(&entries[0]));
        assert_eq!(search_by_value(&entries, &Guid::nil()).len(), 2);
        assert_eq!(search_by_substring(&entries, "<name>").len(), 1);
        assert!(GuidDatabase::default().is_empty());
    }
}
