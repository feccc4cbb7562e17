//! Cleanup of generated answers before they go back to the platform: emphasis stripping,
//! truncation and splitting into transport-sized segments. All lengths are in characters.

use crate::config::{Overflow, ReplyConfig};

/// A maximal run of one emphasis character (`*` or `_`).
struct Run {
    ch: char,
    start: usize,
    len: usize,
    can_open: bool,
    can_close: bool,
}

fn emphasis_runs(chars: &[char]) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if ch != '*' && ch != '_' {
            i += 1;
            continue;
        }
        let mut j = i;
        while j < chars.len() && chars[j] == ch {
            j += 1;
        }
        let prev = if i > 0 { Some(chars[i - 1]) } else { None };
        let next = chars.get(j).copied();
        runs.push(Run {
            ch,
            start: i,
            len: j - i,
            can_open: next.is_some_and(|n| !n.is_whitespace())
                && !prev.is_some_and(|p| p.is_alphanumeric()),
            can_close: prev.is_some_and(|p| !p.is_whitespace())
                && !next.is_some_and(|n| n.is_alphanumeric()),
        });
        i = j;
    }
    runs
}

/// Remove markdown bold/italic markers (`*`, `**`, `***` and the `_` forms) that wrap text.
/// A marker is dropped only when an opening run (not preceded by a word character, followed
/// by a non-space) pairs with a closing run of the same kind. Arithmetic (`2*3`, `5 * 4`),
/// bullets and `snake_case` are left alone.
pub fn strip_emphasis(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let runs = emphasis_runs(&chars);
    let mut hidden = vec![false; chars.len()];
    let mut openers: Vec<usize> = Vec::new();
    for (idx, run) in runs.iter().enumerate() {
        if run.len > 3 {
            continue;
        }
        if run.can_close {
            let matched = openers
                .iter()
                .rposition(|&o| runs[o].ch == run.ch && runs[o].len == run.len);
            if let Some(pos) = matched {
                let opener = &runs[openers[pos]];
                hidden[opener.start..opener.start + opener.len].fill(true);
                hidden[run.start..run.start + run.len].fill(true);
                openers.truncate(pos);
                continue;
            }
        }
        if run.can_open {
            openers.push(idx);
        }
    }
    let out: String = chars
        .iter()
        .zip(hidden)
        .filter(|(_, h)| !h)
        .map(|(c, _)| *c)
        .collect();
    out.trim().to_string()
}

/// Cut `s` to at most `max_chars - len(marker)` characters and append the marker.
fn cut_with_marker(s: &str, max_chars: usize, marker: &str) -> String {
    let marker_len = marker.chars().count();
    if max_chars <= marker_len {
        return marker.chars().take(max_chars).collect();
    }
    let kept: String = s.chars().take(max_chars - marker_len).collect();
    let mut out = kept.trim_end().to_string();
    out.push_str(marker);
    out
}

/// Truncate to `max_chars`, marker included. Text that already fits is returned unchanged.
pub fn truncate(s: &str, max_chars: usize, marker: &str) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    cut_with_marker(s, max_chars, marker)
}

/// Split into segments of at most `max_chars`, breaking at whitespace when one falls in
/// the second half of the window. Text without whitespace splits into ⌈len/max⌉ pieces.
pub fn split_segments(s: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut segments = Vec::new();
    let mut rest = s.trim();
    while !rest.is_empty() {
        let Some((boundary, _)) = rest.char_indices().nth(max_chars) else {
            segments.push(rest.to_string());
            break;
        };
        let window = &rest[..boundary];
        let soft_break = window
            .rfind(char::is_whitespace)
            .filter(|&i| i > 0 && window[..i].chars().count() >= max_chars / 2);
        let (segment, next) = match soft_break {
            Some(i) => (window[..i].trim_end(), rest[i..].trim_start()),
            None => (window, &rest[boundary..]),
        };
        if !segment.is_empty() {
            segments.push(segment.to_string());
        }
        rest = next;
    }
    segments
}

/// Apply the reply policy to a generated answer: optional emphasis stripping, then
/// truncation or splitting. Returns no segments when nothing printable is left.
pub fn shape_answer(answer: &str, reply: &ReplyConfig) -> Vec<String> {
    let cleaned = if reply.strip_markdown {
        strip_emphasis(answer)
    } else {
        answer.trim().to_string()
    };
    if cleaned.is_empty() {
        return Vec::new();
    }
    match reply.overflow {
        Overflow::Truncate => vec![truncate(&cleaned, reply.max_chars, &reply.truncation_marker)],
        Overflow::Split => {
            let mut segments = split_segments(&cleaned, reply.max_chars);
            let limit = reply.max_segments.max(1);
            if segments.len() > limit {
                segments.truncate(limit);
                if let Some(last) = segments.last_mut() {
                    *last = cut_with_marker(last, reply.max_chars, &reply.truncation_marker);
                }
            }
            segments
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bold_and_italic() {
        assert_eq!(
            strip_emphasis("**Library** hours are *8 AM* to __6 PM__, _Mon-Sat_."),
            "Library hours are 8 AM to 6 PM, Mon-Sat."
        );
    }

    #[test]
    fn keeps_underscores_inside_words() {
        assert_eq!(strip_emphasis("use the student_id field"), "use the student_id field");
    }

    #[test]
    fn keeps_literal_asterisks() {
        assert_eq!(
            strip_emphasis("Total = 2*3 = 6, and 5 * 4 = 20."),
            "Total = 2*3 = 6, and 5 * 4 = 20."
        );
        assert_eq!(strip_emphasis("* first\n* second"), "* first\n* second");
        assert_eq!(strip_emphasis("rated 4* overall"), "rated 4* overall");
    }

    #[test]
    fn strips_nested_and_unpaired_markers() {
        assert_eq!(strip_emphasis("***Note:*** read *this*"), "Note: read this");
        assert_eq!(strip_emphasis("**open only"), "**open only");
    }

    #[test]
    fn strip_trims_and_leaves_plain_text_alone() {
        assert_eq!(strip_emphasis("  The library opens at 8 AM.  "), "The library opens at 8 AM.");
    }

    #[test]
    fn truncate_leaves_short_text() {
        assert_eq!(truncate("short", 10, "…"), "short");
        assert_eq!(truncate("exactly10!", 10, "…"), "exactly10!");
    }

    #[test]
    fn truncate_appends_marker_within_limit() {
        let long = "a".repeat(5000);
        let out = truncate(&long, 1500, "…");
        assert_eq!(out.chars().count(), 1500);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let s = "₹".repeat(20);
        let out = truncate(&s, 10, "...");
        assert_eq!(out, format!("{}...", "₹".repeat(7)));
    }

    #[test]
    fn truncate_trims_before_marker() {
        assert_eq!(truncate("hello world again", 7, "…"), "hello…");
    }

    #[test]
    fn split_without_whitespace_uses_ceiling_count() {
        let long = "x".repeat(5000);
        let parts = split_segments(&long, 1500);
        assert_eq!(parts.len(), 4);
        assert!(parts.iter().all(|p| p.chars().count() <= 1500));
        assert_eq!(parts.concat(), long);
    }

    #[test]
    fn split_prefers_whitespace() {
        let parts = split_segments("alpha beta gamma delta", 12);
        assert_eq!(parts, vec!["alpha beta", "gamma delta"]);
    }

    #[test]
    fn split_empty_is_empty() {
        assert!(split_segments("   ", 10).is_empty());
    }

    #[test]
    fn shape_truncate_policy() {
        let reply = ReplyConfig::default();
        let answer = format!("**{}**", "word ".repeat(1000).trim_end());
        let segments = shape_answer(&answer, &reply);
        assert_eq!(segments.len(), 1);
        assert!(segments[0].chars().count() <= 1500);
        assert!(segments[0].ends_with('…'));
        assert!(!segments[0].contains('*'));
    }

    #[test]
    fn shape_split_policy() {
        let reply = ReplyConfig {
            overflow: Overflow::Split,
            ..ReplyConfig::default()
        };
        let segments = shape_answer(&"y".repeat(5000), &reply);
        assert_eq!(segments.len(), 4);
        assert!(segments.iter().all(|s| s.chars().count() <= 1500));
        assert!(!segments[3].ends_with('…'));
    }

    #[test]
    fn shape_split_caps_segments_with_marker() {
        let reply = ReplyConfig {
            overflow: Overflow::Split,
            max_chars: 100,
            max_segments: 2,
            ..ReplyConfig::default()
        };
        let segments = shape_answer(&"z".repeat(1000), &reply);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].chars().count(), 100);
        assert!(segments[1].ends_with('…'));
    }

    #[test]
    fn shape_keeps_markdown_when_disabled() {
        let reply = ReplyConfig {
            strip_markdown: false,
            ..ReplyConfig::default()
        };
        assert_eq!(shape_answer("**hi**", &reply), vec!["**hi**"]);
    }

    #[test]
    fn shape_blank_answer_is_empty() {
        assert!(shape_answer(" \n\t ", &ReplyConfig::default()).is_empty());
    }
}
