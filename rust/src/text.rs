//! Text helpers shared by every parser: trimming, comment stripping,
//! splitting, case folding, and single-byte codecs.
//!
//! Every helper is total; empty input gives an empty result.

use std::env;

use encoding_rs::Encoding;

/// Characters treated as surrounding whitespace by the parsers.
pub const SPACES: &[char] = &[' ', '\t', '\r', '\n'];

pub fn trim(text: &str) -> &str {
    text.trim_matches(SPACES)
}

/// Remove `/* ... */` block comments, then `// ...` line comments.
///
/// Block comments do not nest. An unterminated block comment stops block
/// stripping and is left in place. Line comments are removed up to, not
/// including, the newline.
pub fn remove_comments(text: &str) -> String {
    let mut out = text.to_string();

    let mut from = 0;
    while let Some(start) = out[from..].find("/*").map(|i| from + i) {
        let Some(end) = out[start + 2..].find("*/").map(|i| start + 2 + i) else {
            break;
        };
        out.replace_range(start..end + 2, "");
        from = start;
    }

    from = 0;
    while let Some(start) = out[from..].find("//").map(|i| from + i) {
        let end = out[start..].find('\n').map_or(out.len(), |i| start + i);
        out.replace_range(start..end, "");
        from = start;
    }

    out
}

/// Split on any of `delimiters`, keeping empty pieces between adjacent ones.
pub fn split<'a>(text: &'a str, delimiters: &[char]) -> Vec<&'a str> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split(delimiters).collect()
}

pub fn remove_chars(text: &str, chars: &[char]) -> String {
    text.chars().filter(|c| !chars.contains(c)).collect()
}

/// Uppercased copy for case-insensitive comparison.
pub fn fold_case(text: &str) -> String {
    text.to_uppercase()
}

/// Conversion between a single-byte locale encoding and Rust strings.
pub trait Codec {
    fn name(&self) -> &'static str;
    fn decode(&self, bytes: &[u8]) -> String;
    fn encode(&self, text: &str) -> Vec<u8>;
}

/// Codec backed by an `encoding_rs` encoding chosen from the locale.
#[derive(Debug, Clone, Copy)]
pub struct LocaleCodec {
    encoding: &'static Encoding,
}

impl LocaleCodec {
    pub fn new(encoding: &'static Encoding) -> Self {
        Self { encoding }
    }

    /// Look up a codeset label such as `UTF-8` or `ISO-8859-1`.
    pub fn for_label(label: &str) -> Option<Self> {
        Encoding::for_label(label.trim().as_bytes()).map(Self::new)
    }
}

impl Codec for LocaleCodec {
    fn name(&self) -> &'static str {
        self.encoding.name()
    }

    fn decode(&self, bytes: &[u8]) -> String {
        let (text, _) = self.encoding.decode_without_bom_handling(bytes);
        text.into_owned()
    }

    fn encode(&self, text: &str) -> Vec<u8> {
        let (bytes, _, _) = self.encoding.encode(text);
        bytes.into_owned()
    }
}

/// Fallback codec: ASCII is exact, other bytes pass through as U+0080..U+00FF.
///
/// Encoding maps anything above U+00FF to `?`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiCodec;

impl Codec for AsciiCodec {
    fn name(&self) -> &'static str {
        "ascii"
    }

    fn decode(&self, bytes: &[u8]) -> String {
        bytes.iter().map(|&b| char::from(b)).collect()
    }

    fn encode(&self, text: &str) -> Vec<u8> {
        text.chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect()
    }
}

/// Pick the codec for a POSIX locale string like `en_US.UTF-8@euro`.
///
/// Locales without a codeset (`C`, `POSIX`) and unknown codesets get the
/// ASCII fallback.
pub fn codec_for_locale(locale: &str) -> Box<dyn Codec> {
    let codeset = locale
        .split_once('.')
        .map(|(_, rest)| rest.split('@').next().unwrap_or(rest));

    match codeset.and_then(LocaleCodec::for_label) {
        Some(codec) => Box::new(codec),
        None => Box::new(AsciiCodec),
    }
}

/// Pick the codec from `LC_ALL`, `LC_CTYPE` or `LANG`, first non-empty wins.
pub fn codec_from_env() -> Box<dyn Codec> {
    let locale = ["LC_ALL", "LC_CTYPE", "LANG"]
        .iter()
        .find_map(|key| env::var(key).ok().filter(|v| !v.is_empty()))
        .unwrap_or_default();
    codec_for_locale(&locale)
}
