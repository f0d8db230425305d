//! Tokenizer for `pod` declaration lines
//!
//! A declaration is a line of the form
//! `pod 'Name', 'req', 'req', :option => 'value', option: 'value'  # comment`.
//! Spans are byte offsets into the line so callers can splice in place.

use std::ops::Range;

/// A quoted string argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringToken {
    /// Byte span including the quotes
    pub span: Range<usize>,
    pub quote: char,
    pub value: String,
}

/// A parsed `pod` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: StringToken,
    /// Positional requirement strings following the name
    pub requirements: Vec<StringToken>,
    /// `(key, value)` options; quoted values are unquoted
    pub options: Vec<(String, String)>,
}

impl Declaration {
    /// Parse a single Podfile line, returning `None` for anything but a
    /// `pod` declaration with a quoted name
    pub fn parse(line: &str) -> Option<Declaration> {
        let code = &line[..comment_start(line)];
        let indent = code.len() - code.trim_start().len();
        let rest = code[indent..].strip_prefix("pod")?;

        let mut offset = indent + "pod".len();
        let after = rest.trim_start();
        if after.len() == rest.len() && !after.starts_with('(') {
            // `podspec`, `pods_project`, ...
            return None;
        }
        offset += rest.len() - after.len();

        let parenthesized = after.starts_with('(');
        if parenthesized {
            offset += 1;
        }

        let mut args = split_args(code, offset, parenthesized).into_iter();
        let name = string_token(code, args.next()?)?;

        let mut requirements = Vec::new();
        let mut options = Vec::new();
        for span in args {
            if options.is_empty() {
                if let Some(token) = string_token(code, span.clone()) {
                    requirements.push(token);
                    continue;
                }
            }
            if let Some(option) = parse_option(&code[span]) {
                options.push(option);
            }
        }

        Some(Declaration {
            name,
            requirements,
            options,
        })
    }

    /// Requirement tokens joined the way a compound requirement is written
    pub fn requirement(&self) -> Option<String> {
        if self.requirements.is_empty() {
            None
        } else {
            Some(
                self.requirements
                    .iter()
                    .map(|t| t.value.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        }
    }

    /// Value of an option such as `git` or `commit`
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Byte offset of a `#` comment outside string literals, or the line length
pub fn comment_start(line: &str) -> usize {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                '#' => return i,
                _ => {}
            },
        }
    }
    line.len()
}

/// Split arguments at top-level commas, returning trimmed spans
fn split_args(code: &str, from: usize, parenthesized: bool) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut start = from;
    let mut end = code.len();

    for (i, c) in code[from..].char_indices() {
        let i = from + i;
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '[' | '{' | '(' => depth += 1,
            ')' if depth == 0 && parenthesized => {
                end = i;
                break;
            }
            ']' | '}' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                spans.push(start..i);
                start = i + 1;
            }
            _ => {}
        }
    }
    spans.push(start..end);

    spans
        .into_iter()
        .filter_map(|span| trim_span(code, span))
        .collect()
}

fn trim_span(code: &str, span: Range<usize>) -> Option<Range<usize>> {
    let text = &code[span.clone()];
    let leading = text.len() - text.trim_start().len();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let start = span.start + leading;
    Some(start..start + trimmed.len())
}

/// Interpret a span as a complete string literal
fn string_token(code: &str, span: Range<usize>) -> Option<StringToken> {
    let text = &code[span.clone()];
    let quote = text.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    if text.len() < 2 || !text.ends_with(quote) {
        return None;
    }
    let inner = &text[1..text.len() - 1];

    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => value.push(chars.next()?),
            c if c == quote => return None,
            c => value.push(c),
        }
    }

    Some(StringToken { span, quote, value })
}

/// `:key => value` or `key: value`
fn parse_option(text: &str) -> Option<(String, String)> {
    let (key, value) = if let Some(stripped) = text.strip_prefix(':') {
        let (key, value) = stripped.split_once("=>")?;
        (key.trim(), value.trim())
    } else {
        let (key, value) = text.split_once(':')?;
        (key.trim(), value.trim())
    };
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let value = match string_token(value, 0..value.len()) {
        Some(token) => token.value,
        None => value.to_string(),
    };
    Some((key.to_string(), value))
}
