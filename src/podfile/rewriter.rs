//! In-place requirement rewriting
//!
//! Only the requirement tokens of the target declaration change; every other
//! byte of the Podfile, line endings included, is kept.

use super::declaration::Declaration;
use crate::error::UpdateError;

/// Rewrite the requirement of `name` from `old` to `new`.
///
/// Fails with `AmbiguousDeclaration` unless exactly one `pod` line declares
/// `name`. A `None` requirement means unconstrained.
pub fn rewrite(
    text: &str,
    name: &str,
    old: Option<&str>,
    new: Option<&str>,
) -> Result<String, UpdateError> {
    let mut matches = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if let Some(decl) = Declaration::parse(line) {
            if decl.name.value == name {
                matches.push((offset, decl));
            }
        }
        offset += line.len();
    }

    if matches.len() != 1 {
        return Err(UpdateError::ambiguous(name, matches.len()));
    }
    let (line_start, decl) = matches.remove(0);

    let wanted = split_requirement(new);
    let current: Vec<&str> = decl.requirements.iter().map(|t| t.value.as_str()).collect();
    if current == wanted {
        log::debug!("{} already declares the requested requirement", name);
        return Ok(text.to_string());
    }

    if let Some(old) = old {
        let previous = split_requirement(Some(old));
        if current != previous {
            log::warn!(
                "{} is declared as {:?}, expected {:?}; rewriting anyway",
                name,
                decl.requirement(),
                old
            );
        }
    }

    let quote = decl
        .requirements
        .first()
        .map(|t| t.quote)
        .unwrap_or(decl.name.quote);
    let tokens = wanted
        .iter()
        .map(|r| format!("{q}{r}{q}", q = quote))
        .collect::<Vec<_>>()
        .join(", ");

    let (range, replacement) = match (decl.requirements.first(), decl.requirements.last()) {
        (Some(first), Some(last)) if !wanted.is_empty() => (first.span.start..last.span.end, tokens),
        // Drop the tokens together with the comma that precedes them
        (Some(_), Some(last)) => (decl.name.span.end..last.span.end, String::new()),
        _ => (
            decl.name.span.end..decl.name.span.end,
            format!(", {}", tokens),
        ),
    };

    let mut output = String::with_capacity(text.len() + replacement.len());
    output.push_str(&text[..line_start + range.start]);
    output.push_str(&replacement);
    output.push_str(&text[line_start + range.end..]);
    Ok(output)
}

/// Individual constraints of a requirement string
fn split_requirement(requirement: Option<&str>) -> Vec<&str> {
    requirement
        .map(|r| {
            r.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PODFILE: &str = "source 'https://cdn.cocoapods.org/'\n\
                           platform :ios, '9.0'\n\
                           \n\
                           target 'App' do\n\
                           \x20 pod 'Alamofire', '~> 3.0.0' # networking\n\
                           \x20 pod 'Nimble', '~> 2.0.0'\n\
                           end\n";

    #[test]
    fn test_rewrite_requirement() {
        let out = rewrite(PODFILE, "Alamofire", Some("~> 3.0.0"), Some("~> 4.0.0")).unwrap();
        assert!(out.contains("  pod 'Alamofire', '~> 4.0.0' # networking\n"));
        assert!(out.contains("  pod 'Nimble', '~> 2.0.0'\n"));
        assert_eq!(out.len(), PODFILE.len());
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let once = rewrite(PODFILE, "Alamofire", Some("~> 3.0.0"), Some("~> 4.0.0")).unwrap();
        let twice = rewrite(&once, "Alamofire", Some("~> 4.0.0"), Some("~> 4.0.0")).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rewrite_unconstrained_to_unconstrained_is_noop() {
        let text = "pod \"Quick\"\r\npod 'Nimble'\r\n";
        assert_eq!(rewrite(text, "Quick", None, None).unwrap(), text);
    }

    #[test]
    fn test_rewrite_adds_requirement_with_name_quote() {
        let text = "pod \"Quick\", :inhibit_warnings => true\n";
        let out = rewrite(text, "Quick", None, Some("~> 1.0")).unwrap();
        assert_eq!(out, "pod \"Quick\", \"~> 1.0\", :inhibit_warnings => true\n");
    }

    #[test]
    fn test_rewrite_removes_requirement() {
        let text = "pod 'Quick', '~> 1.0', '>= 1.0.2'\n";
        let out = rewrite(text, "Quick", Some("~> 1.0, >= 1.0.2"), None).unwrap();
        assert_eq!(out, "pod 'Quick'\n");
    }

    #[test]
    fn test_rewrite_compound_requirement() {
        let text = "pod 'Result', \"~> 2.0\"\n";
        let out = rewrite(text, "Result", Some("~> 2.0"), Some(">= 2.1, < 4.0")).unwrap();
        assert_eq!(out, "pod 'Result', \">= 2.1\", \"< 4.0\"\n");
    }

    #[test]
    fn test_rewrite_keeps_options() {
        let text = "pod 'Alamofire', '~> 3.0', :source => 'https://github.com/dependabot/Specs.git'\n";
        let out = rewrite(text, "Alamofire", Some("~> 3.0"), Some("~> 4.3")).unwrap();
        assert_eq!(
            out,
            "pod 'Alamofire', '~> 4.3', :source => 'https://github.com/dependabot/Specs.git'\n"
        );
    }

    #[test]
    fn test_rewrite_missing_declaration() {
        let err = rewrite(PODFILE, "Quick", None, Some("~> 1.0")).unwrap_err();
        assert!(matches!(
            err,
            UpdateError::AmbiguousDeclaration { matches: 0, .. }
        ));
    }

    #[test]
    fn test_rewrite_duplicate_declaration() {
        let text = "target 'A' do\n  pod 'Nimble'\nend\ntarget 'B' do\n  pod 'Nimble'\nend\n";
        let err = rewrite(text, "Nimble", None, Some("~> 2.0")).unwrap_err();
        assert!(matches!(
            err,
            UpdateError::AmbiguousDeclaration { matches: 2, .. }
        ));
    }

    #[test]
    fn test_name_match_is_case_sensitive() {
        let err = rewrite(PODFILE, "alamofire", None, Some("~> 4.0")).unwrap_err();
        assert!(matches!(err, UpdateError::AmbiguousDeclaration { .. }));
    }

    #[test]
    fn test_commented_declaration_is_ignored() {
        let text = "# pod 'Nimble', '~> 1.0'\npod 'Nimble', '~> 2.0.0'\n";
        let out = rewrite(text, "Nimble", Some("~> 2.0.0"), Some("~> 3.0.0")).unwrap();
        assert_eq!(out, "# pod 'Nimble', '~> 1.0'\npod 'Nimble', '~> 3.0.0'\n");
    }
}
