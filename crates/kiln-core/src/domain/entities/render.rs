//! `{{VARIABLE}}` substitution for recipe text.
//!
//! Step payloads (insertion text, replacements, tool arguments, messages)
//! are written against placeholders and rendered once per run.

use std::collections::HashMap;

use chrono::Datelike;

/// Context for rendering recipe text.
///
/// A **Value Object**: immutable after creation; `with_variable` returns a
/// new instance.
///
/// ## Built-in Variables
///
/// | Variable | Example | Source |
/// |----------|---------|--------|
/// | `APP_NAME` | "my shop" | User input |
/// | `APP_NAME_SNAKE` | "my_shop" | Computed |
/// | `APP_NAME_KEBAB` | "my-shop" | Computed |
/// | `APP_NAME_PASCAL` | "MyShop" | Computed |
/// | `YEAR` | "2026" | System clock |
#[derive(Debug, Clone)]
pub struct RenderContext {
    app_name: String,
    variables: HashMap<String, String>,
}

impl RenderContext {
    pub fn new(app_name: impl Into<String>) -> Self {
        let name = app_name.into();
        let mut vars = HashMap::new();

        vars.insert("APP_NAME".to_string(), name.clone());
        vars.insert("APP_NAME_SNAKE".to_string(), to_snake_case(&name));
        vars.insert("APP_NAME_KEBAB".to_string(), to_kebab_case(&name));
        vars.insert("APP_NAME_PASCAL".to_string(), to_pascal_case(&name));
        vars.insert(
            "YEAR".to_string(),
            chrono::Local::now().year().to_string(),
        );

        Self {
            app_name: name,
            variables: vars,
        }
    }

    /// Add a custom variable. User variables may shadow built-ins.
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(|s| s.as_str())
    }

    /// Replace every `{{KEY}}` with its value, in one left-to-right pass.
    ///
    /// - `{{UNKNOWN}}` stays as written
    /// - `{{{APP_NAME}}}` keeps the outer braces
    /// - substituted values are never expanded again
    pub fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let inner = &rest[open + 2..];
            let Some(close) = inner.find("}}") else {
                out.push_str(&rest[open..]);
                return out;
            };
            match self.get(&inner[..close]) {
                Some(value) => {
                    out.push_str(value);
                    rest = &inner[close + 2..];
                }
                None => {
                    out.push('{');
                    rest = &rest[open + 1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn to_snake_case(s: &str) -> String {
    split_words(s).join("_")
}

fn to_kebab_case(s: &str) -> String {
    split_words(s).join("-")
}

fn to_pascal_case(s: &str) -> String {
    split_words(s)
        .iter()
        .flat_map(|word| {
            let mut chars = word.chars();
            chars
                .next()
                .into_iter()
                .flat_map(char::to_uppercase)
                .chain(chars)
        })
        .collect()
}

/// Split on `_`, `-`, whitespace, camelCase transitions and acronym
/// boundaries (`HTTPServer` → `http`, `server`).
fn split_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(current.to_lowercase());
                current.clear();
            }
            continue;
        }

        if let Some(&next) = chars.peek() {
            if c.is_lowercase() && next.is_uppercase() {
                current.push(c);
                words.push(current.to_lowercase());
                current.clear();
                continue;
            }

            if c.is_uppercase()
                && next.is_uppercase()
                && chars.clone().nth(1).is_some_and(|n| n.is_lowercase())
            {
                current.push(c);
                words.push(current.to_lowercase());
                current.clear();
                continue;
            }
        }

        current.push(c);
    }

    if !current.is_empty() {
        words.push(current.to_lowercase());
    }

    words
}
