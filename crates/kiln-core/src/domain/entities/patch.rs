//! Declarative text patches.
//!
//! A patch is validated against the file's actual contents when it is
//! applied. A missing anchor or pattern is a hard failure, never a silent
//! no-op.

use crate::domain::{
    entities::pattern::Pattern,
    error::DomainError,
    value_objects::{Occurrence, Position},
};

/// Insert `text` next to the first match of `anchor`.
#[derive(Debug, Clone, PartialEq)]
pub struct Insertion {
    pub anchor: Pattern,
    pub text: String,
    pub position: Position,
}

impl Insertion {
    pub fn before(anchor: Pattern, text: impl Into<String>) -> Self {
        Self {
            anchor,
            text: text.into(),
            position: Position::Before,
        }
    }

    pub fn after(anchor: Pattern, text: impl Into<String>) -> Self {
        Self {
            anchor,
            text: text.into(),
            position: Position::After,
        }
    }

    /// Apply to `content`. `path` is only used for error reporting.
    pub fn apply(&self, path: &str, content: &str) -> Result<String, DomainError> {
        let range = self
            .anchor
            .find(content)
            .ok_or_else(|| DomainError::AnchorNotFound {
                path: path.to_string(),
                anchor: self.anchor.to_string(),
            })?;

        let at = match self.position {
            Position::Before => range.start,
            Position::After => range.end,
        };

        let mut out = String::with_capacity(content.len() + self.text.len());
        out.push_str(&content[..at]);
        out.push_str(&self.text);
        out.push_str(&content[at..]);
        Ok(out)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.anchor.is_empty() {
            return Err(DomainError::MissingRequiredField { field: "anchor" });
        }
        Ok(())
    }
}

/// Replace matches of `pattern` with `replacement`.
#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    pub pattern: Pattern,
    pub replacement: String,
    pub occurrence: Occurrence,
}

impl Substitution {
    pub fn new(pattern: Pattern, replacement: impl Into<String>) -> Self {
        Self {
            pattern,
            replacement: replacement.into(),
            occurrence: Occurrence::First,
        }
    }

    pub fn all(mut self) -> Self {
        self.occurrence = Occurrence::All;
        self
    }

    /// Apply to `content`. `path` is only used for error reporting.
    pub fn apply(&self, path: &str, content: &str) -> Result<String, DomainError> {
        let (out, rewritten) = self
            .pattern
            .replace(content, &self.replacement, self.occurrence);
        if rewritten == 0 {
            return Err(DomainError::PatternNotFound {
                path: path.to_string(),
                pattern: self.pattern.to_string(),
            });
        }
        Ok(out)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.pattern.is_empty() {
            return Err(DomainError::MissingRequiredField { field: "pattern" });
        }
        Ok(())
    }
}
