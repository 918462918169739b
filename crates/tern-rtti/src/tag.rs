//! Struct field tags.
//!
//! A tag is the raw string following a field declaration. By convention it
//! holds space-separated `key:"value"` pairs; [`StructTag::get`] and
//! [`StructTag::lookup`] decode that convention without allocating unless a
//! value contains escapes.

use std::borrow::Cow;
use std::fmt;

/// The tag string of a struct field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructTag<'a>(&'a str);

impl<'a> StructTag<'a> {
    pub(crate) fn new(raw: &'a str) -> StructTag<'a> {
        StructTag(raw)
    }

    /// The raw tag text.
    pub fn as_str(&self) -> &'a str {
        self.0
    }

    /// The value associated with `key` in the tag, or the empty string when
    /// the key is absent or the tag is malformed.
    pub fn get(&self, key: &str) -> Cow<'a, str> {
        self.lookup(key).unwrap_or(Cow::Borrowed(""))
    }

    /// The value associated with `key` in the tag, if present and well
    /// formed.
    pub fn lookup(&self, key: &str) -> Option<Cow<'a, str>> {
        let mut tag = self.0;
        while !tag.is_empty() {
            tag = tag.trim_start_matches(' ');
            if tag.is_empty() {
                break;
            }

            // Scan to the colon. A space, quote, or control character is a
            // syntax error.
            let bytes = tag.as_bytes();
            let mut i = 0;
            while i < bytes.len()
                && bytes[i] > b' '
                && bytes[i] != b':'
                && bytes[i] != b'"'
                && bytes[i] != 0x7f
            {
                i += 1;
            }
            if i == 0 || i + 1 >= bytes.len() || bytes[i] != b':' || bytes[i + 1] != b'"' {
                break;
            }
            let name = &tag[..i];
            tag = &tag[i + 1..];

            // Scan the quoted value.
            let bytes = tag.as_bytes();
            let mut i = 1;
            while i < bytes.len() && bytes[i] != b'"' {
                if bytes[i] == b'\\' {
                    i += 1;
                }
                i += 1;
            }
            if i >= bytes.len() {
                break;
            }
            let quoted = &tag[..i + 1];
            tag = &tag[i + 1..];

            if name == key {
                return unquote(quoted);
            }
        }
        None
    }
}

impl fmt::Display for StructTag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Undo the double-quoting of a tag value. Borrows when the value contains
/// no escapes.
fn unquote(quoted: &str) -> Option<Cow<'_, str>> {
    let inner = quoted.strip_prefix('"')?.strip_suffix('"')?;
    if !inner.contains('\\') {
        return Some(Cow::Borrowed(inner));
    }
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            _ => return None,
        }
    }
    Some(Cow::Owned(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_single_pair() {
        let tag = StructTag::new(r#"json:"name,omitempty""#);
        assert_eq!(tag.lookup("json").unwrap(), "name,omitempty");
        assert_eq!(tag.lookup("xml"), None);
    }

    #[test]
    fn test_lookup_multiple_pairs() {
        let tag = StructTag::new(r#"json:"a" xml:"b"  env:"C""#);
        assert_eq!(tag.get("json"), "a");
        assert_eq!(tag.get("xml"), "b");
        assert_eq!(tag.get("env"), "C");
        assert_eq!(tag.get("toml"), "");
    }

    #[test]
    fn test_lookup_escaped_value() {
        let tag = StructTag::new(r#"msg:"say \"hi\"""#);
        assert_eq!(tag.lookup("msg").unwrap(), r#"say "hi""#);
    }

    #[test]
    fn test_malformed_tags() {
        assert_eq!(StructTag::new("not a tag").lookup("not"), None);
        assert_eq!(StructTag::new(r#"json:"unterminated"#).lookup("json"), None);
        assert_eq!(StructTag::new(r#":"empty-key""#).lookup(""), None);
    }

    #[test]
    fn test_borrowed_when_unescaped() {
        let tag = StructTag::new(r#"json:"plain""#);
        assert!(matches!(tag.lookup("json").unwrap(), Cow::Borrowed("plain")));
    }
}
