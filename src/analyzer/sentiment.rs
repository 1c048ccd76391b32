use crate::types::{SentimentScore, Tone, Urgency};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref POSITIVE: Regex = Regex::new(
        r"(?i)\b(?:thanks|thank you|great|appreciate|appreciated|excellent|wonderful|pleased|happy|glad|good|awesome|love|perfect|fantastic|congratulations|well done)\b"
    )
    .unwrap();
    static ref NEGATIVE: Regex = Regex::new(
        r"(?i)\b(?:unfortunately|problem|problems|issue|issues|concern|concerned|disappointed|disappointing|frustrated|frustrating|unacceptable|complaint|angry|upset|wrong|failed|failure|delay|delayed|sorry|bad|terrible|mistake)\b"
    )
    .unwrap();
    static ref HIGH_URGENCY: Regex = Regex::new(
        r"(?i)\b(?:urgent(?:ly)?|asap|as soon as possible|emergency|immediate(?:ly)?|critical|right away|end of day today)\b"
    )
    .unwrap();
    static ref MEDIUM_URGENCY: Regex = Regex::new(
        r"(?i)\b(?:soon|quickly|prompt(?:ly)?|timely|priority|time.sensitive|at your earliest convenience|this week)\b"
    )
    .unwrap();
}

/// Bag-of-words sentiment over fixed keyword lists. Confidence scales with
/// match density, capped at 1.0 and normalized against at most 100 words.
pub fn score(body: &str) -> SentimentScore {
    let positive = POSITIVE.find_iter(body).count();
    let negative = NEGATIVE.find_iter(body).count();
    let tone = if positive > negative {
        Tone::Positive
    } else if negative > positive {
        Tone::Negative
    } else {
        Tone::Neutral
    };

    let word_count = body.split_whitespace().count().max(1);
    let density = (positive + negative) as f64 / word_count.min(100) as f64;
    SentimentScore {
        tone,
        confidence: (density * 2.0).min(1.0),
    }
}

/// High on any high-urgency keyword, medium on a medium keyword or when a
/// deadline was extracted, low otherwise.
pub fn urgency(body: &str, has_deadline: bool) -> Urgency {
    if HIGH_URGENCY.is_match(body) {
        Urgency::High
    } else if MEDIUM_URGENCY.is_match(body) || has_deadline {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}
