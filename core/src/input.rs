//! Interpretation of free-text user replies.

use std::sync::LazyLock;

use regex::Regex;

use crate::catalog::Event;

static EVENT_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3}$").expect("static regex"));

const AFFIRMATIVE: [&str; 7] = ["sì", "si", "yes", "y", "ok", "certo", "procedi"];
const NEGATIVE: [&str; 4] = ["no", "n", "annulla", "indietro"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Yes,
    No,
    Other,
}

fn words(input: &str) -> impl Iterator<Item = String> + '_ {
    input
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Any whole word of `input` is one of `candidates`.
pub fn mentions(input: &str, candidates: &[&str]) -> bool {
    words(input).any(|w| candidates.contains(&w.as_str()))
}

pub fn classify_reply(input: &str) -> Reply {
    if mentions(input, &AFFIRMATIVE) {
        Reply::Yes
    } else if mentions(input, &NEGATIVE) {
        Reply::No
    } else {
        Reply::Other
    }
}

/// Resolve an event pick: exact 3-digit code, then 1-based position, then a
/// case-insensitive substring of the display name.
pub fn resolve_event<'a>(input: &str, events: &'a [Event]) -> Option<&'a Event> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if EVENT_CODE.is_match(input) {
        if let Some(event) = events.iter().find(|e| e.code == input) {
            return Some(event);
        }
    }
    if let Ok(position) = input.parse::<usize>() {
        if let Some(event) = position.checked_sub(1).and_then(|i| events.get(i)) {
            return Some(event);
        }
    }
    let needle = input.to_lowercase();
    events
        .iter()
        .find(|e| e.name.to_lowercase().contains(&needle))
}

/// 0-based option index for a 1-based numeric answer in `1..=option_count`.
pub fn parse_option_index(input: &str, option_count: usize) -> Option<usize> {
    let n: usize = input.trim().parse().ok()?;
    (1..=option_count).contains(&n).then(|| n - 1)
}
