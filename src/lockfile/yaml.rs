//! Reader and writer for the YAML subset used by Podfile.lock
//!
//! The lockfile is at most three levels deep:
//! - column 0: section headers (`PODS:`, `PODFILE CHECKSUM: abc`)
//! - column 2: entries (`  - Name (1.0):` or `  Name: value`)
//! - column 4: children (`    - Dep (~> 1.0)` or `    :git: url`)
//!
//! Every entry keeps the raw lines it was read from.

use crate::error::LockfileError;

/// A column-4 line under an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
    Item(String),
    Pair(String, String),
}

/// A column-2 line and everything nested under it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// List item text or mapping key, unquoted
    pub key: String,
    /// Scalar value of a `key: value` entry
    pub value: Option<String>,
    pub is_item: bool,
    pub children: Vec<Child>,
    pub raw: Vec<String>,
    /// 1-based line number of the entry line
    pub line: usize,
}

impl Entry {
    /// Child items of a list-valued entry
    pub fn items(&self) -> Vec<&str> {
        self.children
            .iter()
            .filter_map(|c| match c {
                Child::Item(item) => Some(item.as_str()),
                Child::Pair(..) => None,
            })
            .collect()
    }

    /// Value of a nested `key: value` child
    pub fn pair(&self, key: &str) -> Option<&str> {
        self.children.iter().find_map(|c| match c {
            Child::Pair(k, v) if k == key => Some(v.as_str()),
            _ => None,
        })
    }
}

/// A top-level key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub key: String,
    pub value: Option<String>,
    pub entries: Vec<Entry>,
    pub raw: Vec<String>,
}

/// Split a document into sections
pub fn parse(text: &str) -> Result<Vec<Section>, LockfileError> {
    let mut sections: Vec<Section> = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let number = index + 1;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        if line.starts_with('\t') {
            return Err(LockfileError::parse(number, "tabs are not allowed for indentation"));
        }

        let indent = line.len() - line.trim_start_matches(' ').len();
        let content = &line[indent..];

        match indent {
            0 => {
                let (key, value) = split_key_value(content)
                    .ok_or_else(|| LockfileError::parse(number, "expected a section header"))?;
                sections.push(Section {
                    key: unquote(key),
                    value: value.map(unquote),
                    entries: Vec::new(),
                    raw: vec![line.to_string()],
                });
            }
            2 => {
                let section = sections
                    .last_mut()
                    .ok_or_else(|| LockfileError::parse(number, "entry outside of a section"))?;
                let mut entry = parse_entry(content, number)?;
                entry.raw.push(line.to_string());
                section.entries.push(entry);
                section.raw.push(line.to_string());
            }
            4 => {
                let section = sections
                    .last_mut()
                    .ok_or_else(|| LockfileError::parse(number, "entry outside of a section"))?;
                let entry = section
                    .entries
                    .last_mut()
                    .ok_or_else(|| LockfileError::parse(number, "nested line without a parent"))?;
                entry.children.push(parse_child(content, number)?);
                entry.raw.push(line.to_string());
                section.raw.push(line.to_string());
            }
            n if n > 4 => {
                // Deeper nesting is carried verbatim
                let section = sections
                    .last_mut()
                    .ok_or_else(|| LockfileError::parse(number, "entry outside of a section"))?;
                if let Some(entry) = section.entries.last_mut() {
                    entry.raw.push(line.to_string());
                }
                section.raw.push(line.to_string());
            }
            _ => {
                return Err(LockfileError::parse(
                    number,
                    format!("unexpected indentation of {} spaces", indent),
                ))
            }
        }
    }

    Ok(sections)
}

fn parse_entry(content: &str, number: usize) -> Result<Entry, LockfileError> {
    if let Some(item) = list_item(content) {
        let text = strip_trailing_colon(item).unwrap_or(item);
        return Ok(Entry {
            key: unquote(text),
            value: None,
            is_item: true,
            children: Vec::new(),
            raw: Vec::new(),
            line: number,
        });
    }

    let (key, value) = split_key_value(content)
        .ok_or_else(|| LockfileError::parse(number, "expected `- item` or `key: value`"))?;
    Ok(Entry {
        key: unquote(key),
        value: value.map(unquote),
        is_item: false,
        children: Vec::new(),
        raw: Vec::new(),
        line: number,
    })
}

fn parse_child(content: &str, number: usize) -> Result<Child, LockfileError> {
    if let Some(item) = list_item(content) {
        return Ok(Child::Item(unquote(item)));
    }
    match split_key_value(content) {
        Some((key, Some(value))) => Ok(Child::Pair(unquote(key), unquote(value))),
        _ => Err(LockfileError::parse(number, "expected `- item` or `key: value`")),
    }
}

fn list_item(content: &str) -> Option<&str> {
    if content == "-" {
        return Some("");
    }
    content.strip_prefix("- ").map(str::trim)
}

/// Split `key: value` or `key:` at the first separator outside quotes
fn split_key_value(content: &str) -> Option<(&str, Option<&str>)> {
    let bytes = content.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if q == b'"' && b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' if i == 0 => quote = Some(b),
                b':' if i > 0 && (i + 1 == bytes.len() || bytes[i + 1] == b' ') => {
                    let key = content[..i].trim();
                    let value = content[i + 1..].trim();
                    return Some((key, (!value.is_empty()).then_some(value)));
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Text before a trailing `:` that opens a nested block
fn strip_trailing_colon(item: &str) -> Option<&str> {
    let (key, value) = split_key_value(item)?;
    match value {
        None if item.trim_end().ends_with(':') => Some(key),
        _ => None,
    }
}

/// Decode a plain, single-quoted or double-quoted scalar
pub fn unquote(text: &str) -> String {
    let text = text.trim();
    if text.len() >= 2 && text.starts_with('\'') && text.ends_with('\'') {
        return text[1..text.len() - 1].replace("''", "'");
    }
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        let inner = &text[1..text.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('u') => {
                    let code: String = chars.by_ref().take(4).collect();
                    if let Some(decoded) =
                        u32::from_str_radix(&code, 16).ok().and_then(char::from_u32)
                    {
                        out.push(decoded);
                    }
                }
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        }
        return out;
    }
    text.to_string()
}

/// Render a scalar, quoting only when plain style would change its meaning
pub fn quote(text: &str) -> String {
    if needs_quotes(text) {
        let mut out = String::with_capacity(text.len() + 2);
        out.push('"');
        for c in text.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                c => out.push(c),
            }
        }
        out.push('"');
        out
    } else {
        text.to_string()
    }
}

fn needs_quotes(text: &str) -> bool {
    if text.is_empty() || text.trim() != text {
        return true;
    }
    let first = text.chars().next().unwrap_or(' ');
    if "!&*%@`'\"#|>[]{},".contains(first) {
        return true;
    }
    let mut chars = text.chars();
    if matches!(chars.next(), Some('-' | '?' | ':'))
        && matches!(chars.next(), None | Some(' '))
    {
        return true;
    }
    if text.contains(": ") || text.contains(" #") || text.ends_with(':') {
        return true;
    }
    if text.contains(['\n', '\t', '"', '\\']) {
        return true;
    }
    matches!(
        text.to_ascii_lowercase().as_str(),
        "true" | "false" | "yes" | "no" | "on" | "off" | "null" | "~"
    )
}
