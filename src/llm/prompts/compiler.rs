// ABOUTME: Renders prompt templates with a placeholder completeness check
// ABOUTME: Structured substitution first, literal `{name}` token replacement when the template is malformed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, warn};

use super::{PromptVars, TemplateId};
use crate::errors::{AppError, AppResult};

/// Matches brace escapes and `{identifier}` placeholders, escapes first
static PLACEHOLDER_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").ok());

/// Which substitution produced the rendered text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Format-by-name substitution with brace escapes honoured
    Structured,
    /// Literal `{name}` token replacement after the structured pass failed
    LiteralFallback,
}

/// A rendered prompt and how it was produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Final prompt text
    pub text: String,
    /// Substitution that produced `text`
    pub strategy: RenderOutcome,
}

/// Placeholder names referenced by `template`, ignoring `{{`/`}}` escapes
#[must_use]
pub fn placeholders(template: &str) -> BTreeSet<String> {
    let Some(pattern) = PLACEHOLDER_PATTERN.as_ref() else {
        return BTreeSet::new();
    };
    pattern
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_owned()))
        .collect()
}

/// Why the structured pass rejected a template
#[derive(Debug, Clone, PartialEq, Eq)]
enum FormatError {
    UnmatchedOpen(usize),
    UnmatchedClose(usize),
    InvalidField(usize),
}

fn is_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Format-by-name: `{{` and `}}` are literal braces, `{name}` is substituted,
/// any other brace is an error
fn render_structured(template: &str, vars: &PromptVars) -> Result<String, FormatError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template.char_indices().peekable();

    while let Some((pos, c)) = rest.next() {
        match c {
            '{' if rest.peek().map(|&(_, n)| n) == Some('{') => {
                rest.next();
                out.push('{');
            }
            '{' => {
                let start = pos + 1;
                let end = template[start..]
                    .find('}')
                    .map(|offset| start + offset)
                    .ok_or(FormatError::UnmatchedOpen(pos))?;
                let name = &template[start..end];
                if !is_field_name(name) {
                    return Err(FormatError::InvalidField(pos));
                }
                out.push_str(vars.get(name).ok_or(FormatError::InvalidField(pos))?);
                while rest.peek().is_some_and(|&(i, _)| i <= end) {
                    rest.next();
                }
            }
            '}' if rest.peek().map(|&(_, n)| n) == Some('}') => {
                rest.next();
                out.push('}');
            }
            '}' => return Err(FormatError::UnmatchedClose(pos)),
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Replace each `{name}` token that has a value, leave everything else untouched
fn render_literal(template: &str, vars: &PromptVars) -> String {
    let Some(pattern) = PLACEHOLDER_PATTERN.as_ref() else {
        return template.to_owned();
    };
    pattern
        .replace_all(template, |caps: &Captures<'_>| {
            caps.get(1)
                .and_then(|name| vars.get(name.as_str()))
                .map_or_else(|| caps[0].to_owned(), ToOwned::to_owned)
        })
        .into_owned()
}

/// Renders the coach's templates, with optional per-template overrides
#[derive(Debug, Clone, Default)]
pub struct PromptCompiler {
    overrides: HashMap<TemplateId, Cow<'static, str>>,
}

impl PromptCompiler {
    /// Compiler using the built-in templates
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the wording of one template
    #[must_use]
    pub fn with_template(mut self, id: TemplateId, text: impl Into<Cow<'static, str>>) -> Self {
        self.overrides.insert(id, text.into());
        self
    }

    /// Template text currently in effect for `id`
    #[must_use]
    pub fn template(&self, id: TemplateId) -> &str {
        self.overrides.get(&id).map_or_else(|| id.source(), AsRef::as_ref)
    }

    /// Render `id` and return only the text
    ///
    /// # Errors
    ///
    /// Returns `MISSING_PLACEHOLDER` naming every placeholder without a value.
    pub fn render(&self, id: TemplateId, vars: &PromptVars) -> AppResult<String> {
        self.render_detailed(id, vars).map(|rendered| rendered.text)
    }

    /// Render `id`, reporting which substitution was used
    ///
    /// # Errors
    ///
    /// Returns `MISSING_PLACEHOLDER` naming every placeholder without a value.
    pub fn render_detailed(&self, id: TemplateId, vars: &PromptVars) -> AppResult<Rendered> {
        let template = self.template(id);

        let missing: Vec<String> = placeholders(template)
            .into_iter()
            .filter(|name| !vars.contains(name))
            .collect();
        if !missing.is_empty() {
            return Err(AppError::missing_placeholders(id.as_str(), &missing));
        }

        match render_structured(template, vars) {
            Ok(text) => {
                debug!(template = %id, chars = text.len(), "Rendered prompt");
                Ok(Rendered {
                    text,
                    strategy: RenderOutcome::Structured,
                })
            }
            Err(reason) => {
                warn!(template = %id, ?reason, "Structured rendering failed, using literal substitution");
                Ok(Rendered {
                    text: render_literal(template, vars),
                    strategy: RenderOutcome::LiteralFallback,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_handles_escapes() {
        let vars = PromptVars::new().text("name", "Ana");
        assert_eq!(
            render_structured("{{\"hi\": \"{name}\"}}", &vars).unwrap(),
            "{\"hi\": \"Ana\"}"
        );
    }

    #[test]
    fn test_structured_rejects_stray_braces() {
        let vars = PromptVars::new().text("x", "1");
        assert_eq!(
            render_structured("a } {x}", &vars),
            Err(FormatError::UnmatchedClose(2))
        );
        assert_eq!(
            render_structured("{x} {", &vars),
            Err(FormatError::UnmatchedOpen(4))
        );
        assert_eq!(
            render_structured("{\"k\": 1} {x}", &vars),
            Err(FormatError::InvalidField(0))
        );
    }

    #[test]
    fn test_literal_leaves_unknown_tokens() {
        let vars = PromptVars::new().text("x", "{y}");
        assert_eq!(render_literal("{x} {y} {", &vars), "{y} {y} {");
    }
}
