//! Version requirements
//!
//! Handles CocoaPods requirement strings:
//! - Pessimistic constraints: `~> 4.0`, `~> 4.0.0`
//! - Comparison operators: `=`, `!=`, `>`, `<`, `>=`, `<=`
//! - Bare versions (treated as `=`)
//! - Compound constraints joined by AND: `>= 1.0, < 2.0`

use super::version::{PodVersion, VersionParseError};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

// Operator followed by optional whitespace and the version
static CONSTRAINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(~>|>=|<=|!=|=|>|<)?\s*(\S+)$").unwrap());

/// Comparison operator of a single constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    Pessimistic,
}

impl Operator {
    fn from_symbol(symbol: &str) -> Operator {
        match symbol {
            "~>" => Operator::Pessimistic,
            ">=" => Operator::GreaterOrEqual,
            "<=" => Operator::LessOrEqual,
            "!=" => Operator::NotEqual,
            ">" => Operator::Greater,
            "<" => Operator::Less,
            _ => Operator::Equal,
        }
    }

    /// The operator as written in a Podfile.lock
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::Greater => ">",
            Operator::Less => "<",
            Operator::GreaterOrEqual => ">=",
            Operator::LessOrEqual => "<=",
            Operator::Pessimistic => "~>",
        }
    }
}

/// One `operator version` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub operator: Operator,
    pub version: PodVersion,
}

impl Constraint {
    /// Returns true if `version` satisfies this constraint
    pub fn matches(&self, version: &PodVersion) -> bool {
        match self.operator {
            Operator::Equal => version == &self.version,
            Operator::NotEqual => version != &self.version,
            Operator::Greater => version > &self.version,
            Operator::Less => version < &self.version,
            Operator::GreaterOrEqual => version >= &self.version,
            Operator::LessOrEqual => version <= &self.version,
            Operator::Pessimistic => version >= &self.version && version < &self.version.bump(),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operator.symbol(), self.version)
    }
}

/// A set of constraints that must all hold
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Requirement {
    constraints: Vec<Constraint>,
}

impl Requirement {
    /// A requirement that accepts any version
    pub fn any() -> Self {
        Self::default()
    }

    /// Parse an optional requirement string; `None` means unconstrained
    pub fn parse_optional(input: Option<&str>) -> Result<Self, VersionParseError> {
        match input {
            Some(text) => text.parse(),
            None => Ok(Self::any()),
        }
    }

    /// Returns true if no constraint is present
    pub fn is_any(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Returns true if `version` satisfies every constraint
    pub fn matches(&self, version: &PodVersion) -> bool {
        self.constraints.iter().all(|c| c.matches(version))
    }

    /// Returns true if any constraint names a pre-release version.
    ///
    /// Pre-release candidates are only eligible when this holds.
    pub fn mentions_prerelease(&self) -> bool {
        self.constraints.iter().any(|c| c.version.is_prerelease())
    }
}

impl FromStr for Requirement {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::any());
        }

        let mut constraints = Vec::new();
        for part in trimmed.split(',') {
            let part = part.trim();
            let caps = CONSTRAINT_RE.captures(part).ok_or_else(|| VersionParseError {
                input: s.to_string(),
                message: format!("malformed constraint '{}'", part),
            })?;
            let operator = caps
                .get(1)
                .map(|m| Operator::from_symbol(m.as_str()))
                .unwrap_or(Operator::Equal);
            let version: PodVersion = caps[2].parse()?;
            constraints.push(Constraint { operator, version });
        }

        Ok(Self { constraints })
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.constraints.iter().map(|c| c.to_string()).collect();
        f.write_str(&parts.join(", "))
    }
}
