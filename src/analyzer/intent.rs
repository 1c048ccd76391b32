use crate::types::Intent;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref REQUEST: Regex = Regex::new(
        r"(?i)\b(?:could you|can you|would you|please|kindly|i need|we need|need you to|requesting|request(?:ed)?|asking you)\b"
    )
    .unwrap();
    static ref INFORMATION: Regex = Regex::new(
        r"(?i)\b(?:fyi|for your information|heads up|letting you know|wanted to (?:share|inform)|informing|announcement|announcing|to notify|update you on)\b"
    )
    .unwrap();
    static ref FOLLOW_UP: Regex = Regex::new(
        r"(?i)\b(?:follow(?:ing)? up|checking in|circling back|any update|status update|touching base|touch base|as discussed|per (?:our|my) (?:conversation|last email)|reminder)\b"
    )
    .unwrap();
    static ref INTRODUCTION: Regex = Regex::new(
        r"(?i)\b(?:introduc(?:e|ing|tion)|nice to meet|pleasure to meet|my name is|reaching out for the first time|connecting you with|i(?:'m| am) with)\b"
    )
    .unwrap();
    static ref MEETING: Regex = Regex::new(
        r"(?i)\b(?:meeting|schedule a (?:call|chat|sync)|calendar|appointment|availability|available (?:to meet|for a call)|zoom|teams call|catch up|get together|book a (?:slot|time))\b"
    )
    .unwrap();
}

/// Classify intent by total keyword matches per category. Ties keep the
/// first-encountered maximum; no matches at all defaults to Information.
pub fn classify(body: &str) -> (Intent, usize) {
    let candidates = [
        (Intent::Request, &*REQUEST),
        (Intent::Information, &*INFORMATION),
        (Intent::FollowUp, &*FOLLOW_UP),
        (Intent::Introduction, &*INTRODUCTION),
        (Intent::Meeting, &*MEETING),
    ];

    let mut best = Intent::Information;
    let mut best_count = 0usize;
    for (intent, pattern) in candidates {
        let count = pattern.find_iter(body).count();
        if count > best_count {
            best = intent;
            best_count = count;
        }
    }
    (best, best_count)
}
