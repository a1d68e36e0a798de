// src/recipe/template.rs

//! Build-option templates with `$name$` placeholders
//!
//! A template is expanded once per engine variant. Substitution consumes an
//! owned copy, so clones of a shared base template never leak replacements
//! into each other; placeholders with no matching value stay untouched for
//! a later expansion pass.

use std::fmt;

/// A build-option string containing `$name$` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    text: String,
}

impl Template {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Replace every occurrence of `$name$` with the given value
    pub fn substitute(mut self, name: &str, value: &str) -> Self {
        let placeholder = format!("${name}$");
        self.text = self.text.replace(&placeholder, value);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Split the expanded option string into whitespace-separated words
    pub fn words(&self) -> Vec<String> {
        self.text.split_whitespace().map(str::to_string).collect()
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
