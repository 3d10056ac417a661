//! Display-width measurement for colored, emoji-bearing text.

use regex::Regex;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

/// Remove ANSI SGR escape sequences.
pub fn strip_ansi(text: &str) -> String {
    static ANSI: OnceLock<Regex> = OnceLock::new();
    let re = ANSI.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]").unwrap());
    re.replace_all(text, "").into_owned()
}

/// Number of glyphs once escape codes are dropped.
///
/// Each grapheme cluster counts once, so a multi-codepoint emoji is one glyph.
pub fn display_width(text: &str) -> usize {
    strip_ansi(text).graphemes(true).count()
}

/// Pad `text` on the right with spaces up to `width` glyphs.
pub fn pad_right(text: &str, width: usize) -> String {
    let len = display_width(text);
    let mut out = String::with_capacity(text.len() + width.saturating_sub(len));
    out.push_str(text);
    out.extend(std::iter::repeat(' ').take(width.saturating_sub(len)));
    out
}

/// `n` spaces.
pub fn spaces(n: usize) -> String {
    " ".repeat(n)
}
