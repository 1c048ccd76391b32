pub mod deadlines;
pub mod extract;
pub mod intent;
pub mod sentiment;

use crate::config::ReviewConfig;
use crate::types::{
    AnalysisMetadata, EmailAnalysis, ParsedEmail, ReviewReason, Tone, Urgency,
};
use chrono::{DateTime, Utc};

/// Rule-based email analyzer. Deterministic and side-effect free: the same
/// parsed email and reference time always produce the same analysis.
pub struct Analyzer {
    review: ReviewConfig,
}

impl Analyzer {
    pub fn new(review: ReviewConfig) -> Self {
        Analyzer { review }
    }

    pub fn analyze(&self, parsed: &ParsedEmail) -> EmailAnalysis {
        self.analyze_at(parsed, Utc::now())
    }

    /// Deterministic variant: `now` anchors relative deadline resolution.
    pub fn analyze_at(&self, parsed: &ParsedEmail, now: DateTime<Utc>) -> EmailAnalysis {
        let (intent, intent_matches) = intent::classify(&parsed.body);
        let questions = extract::questions(&parsed.body);
        let action_items = extract::action_items(&parsed.body);
        let deadlines = deadlines::extract(&parsed.body, now);
        let urgency = sentiment::urgency(&parsed.body, !deadlines.is_empty());
        let sentiment = sentiment::score(&parsed.body);

        let confidence = self.confidence(
            parsed,
            !questions.is_empty(),
            !action_items.is_empty(),
            !deadlines.is_empty(),
            intent_matches > 0,
        );
        let (requires_human_review, review_reason) = review_verdict(
            &self.review,
            urgency,
            sentiment.tone,
            questions.len(),
            action_items.len(),
            confidence,
        );

        log::debug!(
            "Analyzed email from {}: intent={intent:?} urgency={urgency:?} confidence={confidence:.2}",
            parsed.sender.email
        );

        EmailAnalysis {
            sender: parsed.sender.clone(),
            subject: parsed.subject.clone(),
            intent,
            questions,
            action_items,
            deadlines,
            urgency,
            sentiment,
            has_attachments: parsed.has_attachments,
            timestamp: parsed.timestamp,
            metadata: AnalysisMetadata {
                confidence,
                requires_human_review,
                review_reason,
            },
        }
    }

    /// Additive score over binary extraction signals, bounded by
    /// construction: 3 x 0.2 + 4 x 0.1 = 1.0.
    fn confidence(
        &self,
        parsed: &ParsedEmail,
        has_questions: bool,
        has_action_items: bool,
        has_deadlines: bool,
        intent_matched: bool,
    ) -> f64 {
        let mut score = 0.0;
        if !parsed.subject.is_empty() {
            score += 0.2;
        }
        if parsed.sender.email != "unknown@example.com" {
            score += 0.2;
        }
        if !parsed.body.is_empty() {
            score += 0.2;
        }
        if has_questions {
            score += 0.1;
        }
        if has_deadlines {
            score += 0.1;
        }
        if has_action_items {
            score += 0.1;
        }
        if intent_matched {
            score += 0.1;
        }
        score
    }
}

/// Shared review verdict: first true condition wins, in this exact
/// priority order. The composer applies the same logic to its input
/// analysis so both metadata blocks agree.
pub fn review_verdict(
    review: &ReviewConfig,
    urgency: Urgency,
    tone: Tone,
    question_count: usize,
    action_item_count: usize,
    confidence: f64,
) -> (bool, Option<ReviewReason>) {
    let reason = if urgency == Urgency::High {
        Some(ReviewReason::HighUrgency)
    } else if tone == Tone::Negative {
        Some(ReviewReason::NegativeSentiment)
    } else if question_count > review.max_questions {
        Some(ReviewReason::MultipleQuestions)
    } else if action_item_count > review.max_action_items {
        Some(ReviewReason::MultipleActionItems)
    } else if confidence < review.min_confidence {
        Some(ReviewReason::LowConfidence)
    } else {
        None
    };
    (reason.is_some(), reason)
}
