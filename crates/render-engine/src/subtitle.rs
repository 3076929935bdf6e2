//! Subtitle layout and filter-graph escaping.
//!
//! The two-line wrap below is the single source of truth for subtitle text:
//! both the burn-in stage and any preview surface must call it, so the
//! rendered frame never diverges from what an editor showed.

use std::path::Path;

/// Maximum characters per subtitle line before a break is inserted.
pub const MAX_LINE_CHARS: usize = 18;

/// How far the split-point probe walks away from the midpoint, in
/// characters, each direction.
pub const PROBE_STEPS: usize = 6;

/// Characters a line may break after: spaces plus common East-Asian
/// sentence punctuation.
const BREAK_CHARS: &[char] = &[' ', '　', '、', '。', '，', '．', '！', '？'];

fn is_breakable(c: char) -> bool {
    BREAK_CHARS.contains(&c)
}

/// Wrap subtitle text into at most two lines.
pub fn wrap_subtitle(text: &str) -> String {
    wrap_subtitle_at(text, MAX_LINE_CHARS)
}

/// Wrap with an explicit per-line limit (character count, not bytes).
///
/// Text at or under the limit is returned unchanged. Longer text is split
/// once: starting at the midpoint, probe alternately after and before it up
/// to [`PROBE_STEPS`] characters; the first breakable character found ends
/// the first line. With no breakable character in the window, split exactly
/// at the midpoint.
pub fn wrap_subtitle_at(text: &str, max_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text.to_string();
    }

    let mid = chars.len() / 2;
    let mut split = mid;
    'probe: for step in 0..=PROBE_STEPS {
        let after = mid + step;
        if after < chars.len() && is_breakable(chars[after]) {
            split = after + 1;
            break 'probe;
        }
        if step > 0 && mid >= step && is_breakable(chars[mid - step]) {
            split = mid - step + 1;
            break 'probe;
        }
    }

    let first: String = chars[..split].iter().collect();
    let second: String = chars[split..].iter().collect();
    let first = first.trim();
    let second = second.trim();

    match (first.is_empty(), second.is_empty()) {
        (_, true) => first.to_string(),
        (true, false) => second.to_string(),
        (false, false) => format!("{first}\n{second}"),
    }
}

/// Escape a value for the encoder's filter-graph syntax.
///
/// The filter language quotes strings with single quotes and separates
/// fields with colons, so backslash, colon, and single quote must each be
/// backslash-prefixed. Drive-letter paths (`C:\...`) hit both rules. Every
/// call site that embeds user text or a path in a filter goes through here.
pub fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

/// Format a filesystem path for use inside a filter graph: forward slashes,
/// then the standard escaping.
pub fn escape_filter_path(path: &Path) -> String {
    let forward = path.to_string_lossy().replace('\\', "/");
    escape_filter_value(&forward)
}
