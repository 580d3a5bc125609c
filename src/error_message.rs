//! Best-effort extraction of classifier details from error messages.
//!
//! A rejected upload usually carries a message such as
//! `"Species mismatch (400): dog_prob: 0.91, cat_prob: 0.09"`. Each field is
//! searched for independently and a miss yields `None`; parsing never fails.

use std::fmt;

/// Fields found in an error message
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParsedError {
    pub dog_prob: Option<f64>,
    pub cat_prob: Option<f64>,
    /// First standalone three-digit number
    pub error_code: Option<u16>,
}

/// Display wrapper rendering a missing probability as `N/A`
pub struct Probability(pub Option<f64>);

impl fmt::Display for Probability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(p) => write!(f, "{}", p),
            None => write!(f, "N/A"),
        }
    }
}

impl ParsedError {
    pub fn dog(&self) -> Probability {
        Probability(self.dog_prob)
    }

    pub fn cat(&self) -> Probability {
        Probability(self.cat_prob)
    }
}

/// Parse `dog_prob`, `cat_prob` and a three-digit code out of `message`
pub fn parse_error_message(message: &str) -> ParsedError {
    ParsedError {
        dog_prob: find_probability(message, "dog_prob:"),
        cat_prob: find_probability(message, "cat_prob:"),
        error_code: words(message).find_map(three_digit_code),
    }
}

/// Whether `code` appears in `message` as a standalone word
pub fn mentions_code(message: &str, code: u16) -> bool {
    words(message).any(|w| three_digit_code(w) == Some(code))
}

/// Value after the first occurrence of `key` that is followed by an optional
/// single whitespace and a run of digits and dots.
fn find_probability(message: &str, key: &str) -> Option<f64> {
    message.match_indices(key).find_map(|(idx, _)| {
        let rest = &message[idx + key.len()..];
        let rest = match rest.chars().next() {
            Some(c) if c.is_whitespace() => &rest[c.len_utf8()..],
            _ => rest,
        };
        let run_len = rest
            .bytes()
            .take_while(|b| b.is_ascii_digit() || *b == b'.')
            .count();
        if run_len == 0 {
            return None;
        }
        Some(leading_float(&rest[..run_len]))
    })
    .flatten()
}

/// Longest numeric prefix of a digits-and-dots run, e.g. "0.12.3" -> 0.12.
/// A run with no digits before its second dot (".") yields `None`.
fn leading_float(run: &str) -> Option<f64> {
    let end = run
        .char_indices()
        .filter(|(_, c)| *c == '.')
        .nth(1)
        .map_or(run.len(), |(i, _)| i);
    run[..end].parse().ok()
}

/// Maximal runs of ASCII word characters (`[A-Za-z0-9_]`)
fn words(message: &str) -> impl Iterator<Item = &str> {
    message
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
}

fn three_digit_code(word: &str) -> Option<u16> {
    if word.len() == 3 && word.bytes().all(|b| b.is_ascii_digit()) {
        word.parse().ok()
    } else {
        None
    }
}
