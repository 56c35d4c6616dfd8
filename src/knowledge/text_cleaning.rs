// ABOUTME: Cleans extracted book text before it is chunked into the knowledge base
// ABOUTME: Strips CSS blocks and selectors, figure caption lines, punctuation and redundant whitespace
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use super::Chunk;

static CSS_BLOCK_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{[^}]*\}").ok());

static CSS_SELECTOR_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:body|h1|h2|h3|h4|h5|h6|p|div|span|figure|figcaption|section|article|header|footer|nav|aside|table|th|tr|td|ul|ol|li|a|img|button|input|textarea|form|label)\b",
    )
    .ok()
});

static HORIZONTAL_SPACE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[ \t]+").ok());

static BLANK_LINES_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").ok());

static FIGURE_LINE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^Figure\s+\d+:\s+\w+.*$").ok());

fn replace_all(pattern: &LazyLock<Option<Regex>>, text: &str, with: &str) -> String {
    pattern.as_ref().map_or_else(
        || text.to_owned(),
        |re| re.replace_all(text, with).into_owned(),
    )
}

/// Collapse runs of blank lines into a single paragraph break
fn collapse_blank_lines(text: &str) -> String {
    replace_all(&BLANK_LINES_PATTERN, text, "\n\n")
}

/// Remove CSS rule bodies and common selector names, then normalise spacing
///
/// Line breaks are kept; runs of blank lines collapse to one paragraph break.
#[must_use]
pub fn remove_css_styles(input: &str) -> String {
    let without_blocks = replace_all(&CSS_BLOCK_PATTERN, input, "");
    let without_selectors = replace_all(&CSS_SELECTOR_PATTERN, &without_blocks, "");
    let spaced = replace_all(&HORIZONTAL_SPACE_PATTERN, &without_selectors, " ");
    collapse_blank_lines(&spaced).trim().to_owned()
}

/// Remove caption lines of the form `Figure 3: ...`
#[must_use]
pub fn remove_figure_references(input: &str) -> String {
    let without_figures = replace_all(&FIGURE_LINE_PATTERN, input, "");
    collapse_blank_lines(&without_figures).trim().to_owned()
}

/// Full cleaning pass for book text: CSS, periods and commas, figure captions
#[must_use]
pub fn clean_knowledge_text(input: &str) -> String {
    let styled = remove_css_styles(input).replace(['.', ','], "");
    remove_figure_references(&styled)
}

/// Clean pre-segmented passages and assign each a fresh id
///
/// Passages that are empty after cleaning are dropped.
#[must_use]
pub fn prepare_chunks<I, S>(segments: I) -> Vec<Chunk>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    segments
        .into_iter()
        .map(|segment| clean_knowledge_text(segment.as_ref()))
        .filter(|content| !content.is_empty())
        .map(|content| Chunk::new(Uuid::new_v4().to_string(), content))
        .collect()
}
