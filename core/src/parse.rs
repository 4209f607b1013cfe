//! Response segmentation.
//!
//! Model output only loosely follows the requested format, so this is a
//! tolerant line classifier rather than a grammar. Each non-blank line is one
//! of:
//!
//! - a **label line**: `[TAG] text`, or `<hint label>: text`. Opens a new
//!   labeled block whose text is the rest of the line.
//! - a **back-translation**: a line wrapped in `(…)`/`（…）`, or
//!   `<hint back label>: text`. Attaches to the open block and closes it.
//! - a **heading**: a short line ending in a colon. Opens a new block labeled
//!   with the heading.
//! - **text**: appended to the open block, or starts a new block when the open
//!   one is already closed by a back-translation.
//!
//! Label, back-translation and heading forms are also recognized behind a
//! Markdown list or heading marker and with bold emphasis around the label,
//! e.g. `1. パターン1: …` or `**戻し訳1**: …`.
//!
//! Blank lines are skipped. A block without primary text is dropped when it is
//! flushed. If none of the structured forms appears, or every block was
//! dropped, the whole raw text comes back as one unlabeled block, untouched.

use std::sync::OnceLock;

use regex::Regex;

use jifra_types::{DisplayBlock, Style};

const MAX_BRACKET_TAG_CHARS: usize = 24;
const MAX_HEADING_CHARS: usize = 40;
const EMPHASIS: [char; 2] = ['*', '_'];

/// Label prefixes the current prompt asked the model to use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaHints {
    pub labels: Vec<String>,
    pub back_labels: Vec<String>,
}

impl SchemaHints {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn for_style(style: Style) -> Self {
        match style {
            Style::Casual | Style::Formal => Self {
                labels: ["パターン1", "パターン2", "Pattern 1", "Pattern 2"]
                    .map(String::from)
                    .to_vec(),
                back_labels: ["戻し訳1", "戻し訳2", "Back 1", "Back 2"]
                    .map(String::from)
                    .to_vec(),
            },
            Style::Sns | Style::PromptGen => Self::none(),
        }
    }
}

/// Line role, as decided by [`classify`].
#[derive(Debug, PartialEq, Eq)]
enum LineKind<'a> {
    Blank,
    Label { label: &'a str, text: &'a str },
    Back(&'a str),
    Heading(&'a str),
    Text(&'a str),
}

/// Parser state between lines.
enum State {
    NoBlock,
    Open(DisplayBlock),
    Closed(DisplayBlock),
}

/// Split raw model output into display blocks. Never fails.
#[must_use]
pub fn parse_blocks(raw: &str, hints: &SchemaHints) -> Vec<DisplayBlock> {
    let mut blocks = Vec::new();
    let mut state = State::NoBlock;
    let mut structured = false;

    for line in raw.lines() {
        let kind = classify(line, hints);
        if !matches!(kind, LineKind::Blank | LineKind::Text(_)) {
            structured = true;
        }

        state = match (kind, state) {
            (LineKind::Blank, state) => state,
            (LineKind::Label { label, text }, state) => {
                flush(state, &mut blocks);
                State::Open(DisplayBlock::labeled(label, text))
            }
            (LineKind::Heading(label), state) => {
                flush(state, &mut blocks);
                State::Open(DisplayBlock::labeled(label, ""))
            }
            (LineKind::Back(back), State::Open(mut block)) => {
                block.back_translation = Some(back.to_string());
                State::Closed(block)
            }
            (LineKind::Back(back), state) => {
                flush(state, &mut blocks);
                tracing::debug!(back, "back-translation without an open block");
                State::NoBlock
            }
            (LineKind::Text(text), State::Open(mut block)) => {
                if !block.text.is_empty() {
                    block.text.push('\n');
                }
                block.text.push_str(text);
                State::Open(block)
            }
            (LineKind::Text(text), state) => {
                flush(state, &mut blocks);
                State::Open(DisplayBlock::unlabeled(text))
            }
        };
    }
    flush(state, &mut blocks);

    if !structured || blocks.is_empty() {
        if structured {
            tracing::debug!("structured response produced no content; using raw text");
        }
        return vec![DisplayBlock::unlabeled(raw)];
    }
    blocks
}

fn flush(state: State, blocks: &mut Vec<DisplayBlock>) {
    if let State::Open(block) | State::Closed(block) = state
        && block.has_content()
    {
        blocks.push(block);
    }
}

fn classify<'a>(line: &'a str, hints: &SchemaHints) -> LineKind<'a> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    let bare = strip_decoration(trimmed);

    if let Some((label, text)) = bracket_tag(bare) {
        return LineKind::Label { label, text };
    }
    if let Some((label, text)) = hinted_prefix(bare, &hints.labels) {
        return LineKind::Label { label, text };
    }
    if let Some((_, text)) = hinted_prefix(bare, &hints.back_labels) {
        return LineKind::Back(text);
    }
    if is_parenthesized(bare) {
        return LineKind::Back(bare);
    }
    if let Some(heading) = heading(bare) {
        return LineKind::Heading(heading);
    }
    LineKind::Text(trimmed)
}

/// Drop a leading list or heading marker and opening emphasis.
fn strip_decoration(line: &str) -> &str {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    let re = MARKER.get_or_init(|| {
        Regex::new(r"^(?:#{1,6}\s+|[-*+•]\s+|\d{1,2}[.)]\s+)")
            .expect("list marker pattern is valid")
    });
    let rest = re.find(line).map_or(line, |m| &line[m.end()..]);
    rest.trim_start_matches(EMPHASIS).trim_start()
}

fn bracket_tag(line: &str) -> Option<(&str, &str)> {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let re = TAG.get_or_init(|| {
        Regex::new(r"^[\[【]([^\]】]+)[\]】]\s*(.*)$").expect("bracket tag pattern is valid")
    });
    let caps = re.captures(line)?;
    let label = caps.get(1)?.as_str().trim();
    let text = caps.get(2)?.as_str();
    if label.is_empty() || label.chars().count() > MAX_BRACKET_TAG_CHARS {
        return None;
    }
    Some((label, text))
}

/// `<label>: rest` or `<label>：rest` for any label in `labels`. Closing
/// emphasis on either side of the colon is skipped.
fn hinted_prefix<'a>(line: &'a str, labels: &[String]) -> Option<(&'a str, &'a str)> {
    labels.iter().find_map(|label| {
        let rest = line.strip_prefix(label.as_str())?;
        let rest = rest.trim_start_matches(EMPHASIS).trim_start();
        let rest = rest
            .strip_prefix(':')
            .or_else(|| rest.strip_prefix('：'))?
            .trim_start();
        let rest = rest
            .strip_prefix("**")
            .or_else(|| rest.strip_prefix("__"))
            .unwrap_or(rest);
        Some((&line[..label.len()], rest.trim()))
    })
}

fn is_parenthesized(line: &str) -> bool {
    let ascii = line.starts_with('(') && line.ends_with(')');
    let wide = line.starts_with('（') && line.ends_with('）');
    (ascii || wide) && line.chars().count() >= 2
}

fn heading(line: &str) -> Option<&str> {
    let line = line.trim_end_matches(EMPHASIS);
    if line.chars().count() > MAX_HEADING_CHARS {
        return None;
    }
    let label = line
        .strip_suffix(':')
        .or_else(|| line.strip_suffix('：'))?
        .trim_end_matches(EMPHASIS)
        .trim();
    (!label.is_empty()).then_some(label)
}
