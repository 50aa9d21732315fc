// src/text_fit.rs
//! Text fitting: clamp or word-wrap strings so they never overflow a fixed-layout slot.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

pub const ELLIPSIS: char = '…';

/// Delimiters accepted when a list is supplied as a single free-text field.
pub const ITEM_DELIMITERS: &[char] = &['\n', '\r', ',', ';', '•'];

/// Space budget attached to a schema key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fit {
    /// Whitespace-normalized only, never truncated.
    Raw,
    Plain {
        max_chars: usize,
    },
    Wrapped {
        chars_per_line: usize,
        max_lines: usize,
    },
}

/// Applies fits with a global on/off switch, so call sites never change when clamping is disabled.
#[derive(Debug, Clone, Copy)]
pub struct TextFitter {
    enabled: bool,
}

impl TextFitter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn clamp_plain(&self, text: &str, max_chars: usize) -> String {
        if !self.enabled {
            return normalize_whitespace(text);
        }
        clamp_plain(text, max_chars)
    }

    pub fn clamp_wrapped(&self, text: &str, chars_per_line: usize, max_lines: usize) -> String {
        if !self.enabled {
            return normalize_whitespace(text);
        }
        clamp_wrapped(text, chars_per_line, max_lines)
    }

    pub fn fit(&self, text: &str, fit: Fit) -> String {
        match fit {
            Fit::Raw => normalize_whitespace(text),
            Fit::Plain { max_chars } => self.clamp_plain(text, max_chars),
            Fit::Wrapped {
                chars_per_line,
                max_lines,
            } => self.clamp_wrapped(text, chars_per_line, max_lines),
        }
    }
}

impl Default for TextFitter {
    fn default() -> Self {
        Self::new(true)
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// NFC-compose, collapse whitespace runs to single spaces and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    let composed: String = text.nfc().collect();
    composed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to `max_chars` characters, ending with an ellipsis when cut.
///
/// A zero budget disables truncation.
pub fn clamp_plain(text: &str, max_chars: usize) -> String {
    let normalized = normalize_whitespace(text);
    if max_chars == 0 || char_len(&normalized) <= max_chars {
        return normalized;
    }

    let kept: String = normalized.chars().take(max_chars - 1).collect();
    let mut out = kept.trim_end().to_string();
    out.push(ELLIPSIS);
    out
}

/// Greedily pack words into at most `max_lines` lines of `chars_per_line` characters.
///
/// Words are never split; a word longer than the line budget sits alone on its line.
/// When words had to be dropped the last line ends with an ellipsis. If that line is a
/// single word exactly `chars_per_line` long, the word loses its last character to make room.
pub fn clamp_wrapped(text: &str, chars_per_line: usize, max_lines: usize) -> String {
    let normalized = normalize_whitespace(text);
    if normalized.is_empty() || chars_per_line == 0 || max_lines == 0 {
        return normalized;
    }

    let words: Vec<&str> = normalized.split(' ').collect();
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut placed = 0usize;

    for word in &words {
        if current.is_empty() {
            current.push_str(word);
            placed += 1;
            continue;
        }

        if char_len(&current) + 1 + char_len(word) <= chars_per_line {
            current.push(' ');
            current.push_str(word);
            placed += 1;
            continue;
        }

        lines.push(std::mem::take(&mut current));
        if lines.len() == max_lines {
            break;
        }
        current.push_str(word);
        placed += 1;
    }

    if !current.is_empty() && lines.len() < max_lines {
        lines.push(current);
    }

    if placed < words.len() {
        if let Some(last) = lines.last_mut() {
            *last = with_ellipsis(last, chars_per_line);
        }
    }

    lines.join("\n")
}

/// Append an ellipsis to a wrapped line without pushing it past the line budget.
fn with_ellipsis(line: &str, chars_per_line: usize) -> String {
    let mut words: Vec<&str> = line.split(' ').collect();
    loop {
        let joined = words.join(" ");
        let len = char_len(&joined);
        if len < chars_per_line || (words.len() == 1 && len > chars_per_line) {
            return format!("{}{}", joined, ELLIPSIS);
        }
        if words.len() == 1 {
            let kept: String = joined.chars().take(chars_per_line - 1).collect();
            return format!("{}{}", kept, ELLIPSIS);
        }
        words.pop();
    }
}

/// Split a free-text list on newlines, commas, semicolons and bullets.
pub fn split_items(text: &str) -> Vec<String> {
    text.split(ITEM_DELIMITERS)
        .map(normalize_whitespace)
        .filter(|item| !item.is_empty())
        .collect()
}
