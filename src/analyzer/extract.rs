use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref POLITE_IMPERATIVE: Regex = Regex::new(
        r"(?i)\b(?:please|kindly|could you|would you|can you)\s+([^.!?\n]+)"
    )
    .unwrap();
    static ref OBLIGATION: Regex = Regex::new(
        r"(?i)\b(?:need(?:s)? to|must|should|have to)\s+([^.!?\n]*?\b(?:by|before|due)\b[^.!?\n]*)"
    )
    .unwrap();
    static ref LEADING_VERB: Regex = Regex::new(
        r"(?im)^\s*((?:review|update|send|prepare|complete|finish|submit|create|schedule|confirm|share|draft)\b[^.!?\n]*)"
    )
    .unwrap();
}

/// Split the body into sentences and keep the ones ending in a question
/// mark, verbatim and trimmed.
pub fn questions(body: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut current = String::new();
    for ch in body.chars() {
        match ch {
            '.' | '!' | '\n' => current.clear(),
            '?' => {
                let sentence = current.trim();
                if !sentence.is_empty() {
                    found.push(format!("{sentence}?"));
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    found
}

/// Collect action-item fragments from the three pattern families,
/// de-duplicated case-insensitively in first-seen order.
pub fn action_items(body: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    let mut push = |fragment: &str| {
        let trimmed = fragment.trim().trim_end_matches(',').to_string();
        if trimmed.is_empty() {
            return;
        }
        let key = trimmed.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            items.push(trimmed);
        }
    };

    for caps in POLITE_IMPERATIVE.captures_iter(body) {
        push(&caps[1]);
    }
    for caps in OBLIGATION.captures_iter(body) {
        push(&caps[1]);
    }
    for caps in LEADING_VERB.captures_iter(body) {
        push(&caps[1]);
    }
    items
}
