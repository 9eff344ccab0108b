//! Greedy word wrapping against a pixel width.

use super::{DeterministicTextMeasurer, TextMeasurer, TextStyle};
use std::collections::VecDeque;

/// Splits `line` into word and single-space tokens, keeping spaces as separate tokens.
pub fn split_line_to_words(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    for ch in line.chars() {
        if ch.is_whitespace() {
            if !cur.is_empty() {
                out.push(std::mem::take(&mut cur));
            }
            out.push(" ".to_string());
        } else {
            cur.push(ch);
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

/// Wraps every input line to `max_width_px`. Tokens wider than a whole line are broken at a
/// character boundary. `None` (or a non-positive width) disables wrapping.
pub fn wrap_text_lines(
    text: &str,
    measurer: &dyn TextMeasurer,
    style: &TextStyle,
    max_width_px: Option<f64>,
) -> Vec<String> {
    let lines = DeterministicTextMeasurer::normalized_text_lines(text);
    let Some(max_width_px) = max_width_px.filter(|w| w.is_finite() && *w > 0.0) else {
        return lines;
    };

    let width_of = |s: &str| measurer.measure(s, style).width;

    fn split_token_to_width(
        tok: &str,
        max_width_px: f64,
        width_of: &dyn Fn(&str) -> f64,
    ) -> (String, String) {
        let chars = tok.chars().collect::<Vec<_>>();
        let mut split_at = 0usize;
        for idx in 1..=chars.len() {
            let head: String = chars[..idx].iter().collect();
            if width_of(&head) > max_width_px {
                break;
            }
            split_at = idx;
        }
        if split_at == 0 {
            split_at = 1.min(chars.len());
        }
        let head = chars[..split_at].iter().collect::<String>();
        let tail = chars[split_at..].iter().collect::<String>();
        (head, tail)
    }

    let mut out: Vec<String> = Vec::new();
    for line in lines {
        let mut tokens = VecDeque::from(split_line_to_words(&line));
        let mut wrapped: Vec<String> = Vec::new();
        let mut cur = String::new();

        while let Some(tok) = tokens.pop_front() {
            if cur.is_empty() && tok == " " {
                continue;
            }

            let candidate = format!("{cur}{tok}");
            if width_of(candidate.trim_end()) <= max_width_px {
                cur = candidate;
                continue;
            }

            if !cur.trim().is_empty() {
                wrapped.push(cur.trim_end().to_string());
                cur.clear();
                tokens.push_front(tok);
                continue;
            }

            if tok == " " {
                continue;
            }

            let (head, tail) = split_token_to_width(&tok, max_width_px, &width_of);
            wrapped.push(head);
            if !tail.is_empty() {
                tokens.push_front(tail);
            }
        }

        if !cur.trim().is_empty() {
            wrapped.push(cur.trim_end().to_string());
        }
        if wrapped.is_empty() {
            wrapped.push(String::new());
        }
        out.extend(wrapped);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_on_word_boundaries() {
        let m = DeterministicTextMeasurer::default();
        let style = TextStyle::default();
        // 9.6px per column at 16px: 10 columns fit in 100px, 16 do not.
        let lines = wrap_text_lines("alpha beta gamma", &m, &style, Some(100.0));
        assert_eq!(lines, vec!["alpha beta", "gamma"]);
    }

    #[test]
    fn breaks_tokens_longer_than_a_line() {
        let m = DeterministicTextMeasurer::default();
        let style = TextStyle::default();
        let lines = wrap_text_lines("abcdefghijkl", &m, &style, Some(50.0));
        assert_eq!(lines, vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn no_width_means_no_wrapping() {
        let m = DeterministicTextMeasurer::default();
        let style = TextStyle::default();
        let lines = wrap_text_lines("a b c\nd", &m, &style, None);
        assert_eq!(lines, vec!["a b c", "d"]);
    }
}
