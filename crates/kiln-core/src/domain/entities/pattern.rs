//! Match patterns used by patch and substitute steps.

use std::fmt;
use std::ops::Range;

use regex::Regex;

use crate::domain::{error::DomainError, value_objects::Occurrence};

/// Something to look for in a generated file.
///
/// `Literal` matches the exact text. `Regex` is compiled once at recipe
/// construction; an invalid expression never reaches apply time.
#[derive(Clone)]
pub enum Pattern {
    Literal(String),
    Regex(Regex),
}

impl Pattern {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    pub fn regex(expr: &str) -> Result<Self, DomainError> {
        Regex::new(expr)
            .map(Self::Regex)
            .map_err(|e| DomainError::InvalidPattern {
                pattern: expr.to_string(),
                reason: e.to_string(),
            })
    }

    /// The pattern's source text.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(s) => s,
            Self::Regex(r) => r.as_str(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Literal(_) => "literal",
            Self::Regex(_) => "regex",
        }
    }

    /// Byte range of the first match.
    pub fn find(&self, haystack: &str) -> Option<Range<usize>> {
        match self {
            Self::Literal(needle) => haystack
                .find(needle.as_str())
                .map(|start| start..start + needle.len()),
            Self::Regex(re) => re.find(haystack).map(|m| m.range()),
        }
    }

    /// Number of non-overlapping matches.
    pub fn count(&self, haystack: &str) -> usize {
        match self {
            Self::Literal(needle) => haystack.matches(needle.as_str()).count(),
            Self::Regex(re) => re.find_iter(haystack).count(),
        }
    }

    /// Replace matches, returning the new text and how many were rewritten.
    ///
    /// Literal replacement text is inserted verbatim. Regex replacements may
    /// reference capture groups (`$1`, `${name}`).
    pub fn replace(
        &self,
        haystack: &str,
        replacement: &str,
        occurrence: Occurrence,
    ) -> (String, usize) {
        let found = self.count(haystack);
        if found == 0 {
            return (haystack.to_string(), 0);
        }
        let limit = match occurrence {
            Occurrence::First => 1,
            Occurrence::All => 0,
        };
        let replaced = match self {
            Self::Literal(needle) if limit == 1 => {
                haystack.replacen(needle.as_str(), replacement, 1)
            }
            Self::Literal(needle) => haystack.replace(needle.as_str(), replacement),
            Self::Regex(re) => re.replacen(haystack, limit, replacement).into_owned(),
        };
        let rewritten = if limit == 1 { 1 } else { found };
        (replaced, rewritten)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            Self::Regex(r) => f.debug_tuple("Regex").field(&r.as_str()).finish(),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "{s:?}"),
            Self::Regex(r) => write!(f, "/{}/", r.as_str()),
        }
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.as_str() == other.as_str()
    }
}
