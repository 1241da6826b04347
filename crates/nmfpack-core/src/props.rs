//! Flat key-value text codec for the manifest entry.
//!
//! ## Format
//!
//! ```text
//! key=value
//! ```
//!
//! One pair per LF-terminated line, UTF-8 throughout. The writer emits keys
//! in lexicographic order over the raw key strings, so the same logical map
//! always produces byte-identical output -- manifests stay diffable and
//! builds reproducible. The reader accepts pairs in any order, skips blank
//! lines, and skips comment lines starting with `#` or `!` (manifests
//! written by earlier generations of the tool carry a comment header).
//!
//! Backslash escapes keep arbitrary strings on a single line: `\n`, `\r`
//! and `\\` in keys and values, plus `\=`, `\#` and `\!` in keys. The
//! reader resolves unknown escapes to the escaped character itself.
//!
//! Duplicate keys are legal on the read side; the last occurrence wins.

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors raised while reading manifest text.
///
/// These are the structural failures of the codec: the byte stream cannot
/// be interpreted as flat key-value text at all. Missing keys are not an
/// error at this layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropsError {
    /// The byte stream is not valid UTF-8.
    #[error("manifest text is not valid UTF-8")]
    NotUtf8,

    /// A non-blank, non-comment line has no key-value separator.
    #[error("line {line}: no key-value separator")]
    MissingSeparator {
        /// One-based line number of the offending line.
        line: usize,
    },
}

/// Serialize a key-value map to canonical manifest text.
///
/// Output is deterministic: keys are emitted in lexicographic order and
/// every pair is escaped the same way regardless of how the map was built.
pub fn write(props: &BTreeMap<String, String>) -> String {
    let mut out = String::new();

    for (key, value) in props {
        out.push_str(&escape_key(key));
        out.push('=');
        out.push_str(&escape_value(value));
        out.push('\n');
    }

    out
}

/// Parse manifest text into a key-value map.
///
/// Tolerant of any key set, comment lines, blank lines, and CRLF line
/// endings. Duplicate keys resolve to the last occurrence.
///
/// # Errors
///
/// Returns [`PropsError::NotUtf8`] for non-UTF-8 input and
/// [`PropsError::MissingSeparator`] for a line that is neither blank, nor
/// a comment, nor a `key=value` pair.
pub fn read(bytes: &[u8]) -> Result<BTreeMap<String, String>, PropsError> {
    let text = std::str::from_utf8(bytes).map_err(|_| PropsError::NotUtf8)?;
    let mut map = BTreeMap::new();

    for (idx, line) in text.lines().enumerate() {
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let Some((key, value)) = split_pair(line) else {
            return Err(PropsError::MissingSeparator { line: idx + 1 });
        };

        map.insert(unescape(key), unescape(value));
    }

    Ok(map)
}

/// Split a line at the first unescaped `=`.
fn split_pair(line: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' => return Some((&line[..i], &line[i + 1..])),
            _ => {}
        }
    }
    None
}

fn escape_key(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '=' => out.push_str("\\="),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '#' => out.push_str("\\#"),
            '!' => out.push_str("\\!"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_value(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn write_is_sorted_and_deterministic() {
        let text = write(&map(&[("b.key", "2"), ("a.key", "1"), ("c.key", "3")]));
        assert_eq!(text, "a.key=1\nb.key=2\nc.key=3\n");
    }

    #[test]
    fn read_skips_comments_and_blanks() {
        let text = "# header comment\n\n! bang comment\ninfo.name=demo\n";
        let parsed = read(text.as_bytes()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed["info.name"], "demo");
    }

    #[test]
    fn read_accepts_crlf() {
        let parsed = read(b"info.name=demo\r\ninfo.version=1.0\r\n").unwrap();
        assert_eq!(parsed["info.name"], "demo");
        assert_eq!(parsed["info.version"], "1.0");
    }

    #[test]
    fn last_duplicate_wins() {
        let parsed = read(b"k=first\nk=second\n").unwrap();
        assert_eq!(parsed["k"], "second");
    }

    #[test]
    fn value_keeps_everything_after_first_separator() {
        let parsed = read(b"k=a=b=c\n").unwrap();
        assert_eq!(parsed["k"], "a=b=c");
    }

    #[test]
    fn missing_separator_reports_line_number() {
        let err = read(b"a=1\nnot a pair\n").unwrap_err();
        assert_eq!(err, PropsError::MissingSeparator { line: 2 });
    }

    #[test]
    fn not_utf8_is_rejected() {
        let err = read(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert_eq!(err, PropsError::NotUtf8);
    }

    #[test]
    fn awkward_characters_round_trip() {
        let original = map(&[
            ("key=with#separator", "value\nwith\nnewlines"),
            ("#leading.hash", "back\\slash"),
            ("", ""),
        ]);
        let parsed = read(write(&original).as_bytes()).unwrap();
        assert_eq!(parsed, original);
    }

    proptest! {
        #[test]
        fn any_map_round_trips(original in prop::collection::btree_map(
            any::<String>(),
            any::<String>(),
            0..8,
        )) {
            let parsed = read(write(&original).as_bytes()).unwrap();
            prop_assert_eq!(parsed, original);
        }

        #[test]
        fn writing_twice_is_byte_identical(original in prop::collection::btree_map(
            any::<String>(),
            any::<String>(),
            0..8,
        )) {
            prop_assert_eq!(write(&original), write(&original));
        }
    }
}
