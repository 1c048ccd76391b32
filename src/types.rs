use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sender identity extracted from headers. `name` is the display name when
/// the header carried one, `email` is always present (placeholder when the
/// parser could not find an address).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sender {
    pub name: Option<String>,
    pub email: String,
}

impl Sender {
    pub fn unknown() -> Self {
        Sender {
            name: None,
            email: "unknown@example.com".to_string(),
        }
    }

    /// First word of the display name, used for greetings.
    pub fn first_name(&self) -> Option<&str> {
        self.name.as_deref().and_then(|n| n.split_whitespace().next())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedEmail {
    pub sender: Sender,
    pub subject: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub has_attachments: bool,
    /// True when header extraction fell back to placeholder values, so
    /// callers can tell "genuinely empty" from "extraction failed".
    pub degraded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Intent {
    Request,
    Information,
    FollowUp,
    Introduction,
    Meeting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub tone: Tone,
    pub confidence: f64,
}

/// A deadline mention. `text` is the verbatim source fragment; `date` is
/// None when no concrete date could be resolved from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deadline {
    pub text: String,
    pub date: Option<DateTime<Utc>>,
}

/// Why an analysis or reply was flagged for human review. Ordered by
/// priority: the first matching condition wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReviewReason {
    HighUrgency,
    NegativeSentiment,
    MultipleQuestions,
    MultipleActionItems,
    LowConfidence,
}

impl ReviewReason {
    pub fn describe(&self) -> &'static str {
        match self {
            ReviewReason::HighUrgency => "high urgency email",
            ReviewReason::NegativeSentiment => "negative sentiment detected",
            ReviewReason::MultipleQuestions => "multiple questions require answers",
            ReviewReason::MultipleActionItems => "multiple action items to address",
            ReviewReason::LowConfidence => "low analysis confidence",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    pub confidence: f64,
    pub requires_human_review: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_reason: Option<ReviewReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAnalysis {
    pub sender: Sender,
    pub subject: String,
    pub intent: Intent,
    pub questions: Vec<String>,
    pub action_items: Vec<String>,
    pub deadlines: Vec<Deadline>,
    pub urgency: Urgency,
    pub sentiment: SentimentScore,
    pub has_attachments: bool,
    pub timestamp: DateTime<Utc>,
    pub metadata: AnalysisMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyTone {
    Formal,
    Friendly,
    Assertive,
    Concise,
    Persuasive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyLength {
    Short,
    Medium,
    Long,
}

/// Caller-supplied knobs for reply generation. Tones and lengths are closed
/// enums; free-form strings are rejected at deserialization time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyOptions {
    pub tone: ReplyTone,
    pub length: ReplyLength,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub include_intro: bool,
    pub include_outro: bool,
    pub include_action_items: bool,
    pub include_deadlines: bool,
}

impl Default for ReplyOptions {
    fn default() -> Self {
        ReplyOptions {
            tone: ReplyTone::Friendly,
            length: ReplyLength::Medium,
            context: None,
            include_intro: true,
            include_outro: true,
            include_action_items: true,
            include_deadlines: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyMetadata {
    pub questions_addressed: Vec<String>,
    pub action_items_included: Vec<String>,
    pub deadlines_referenced: Vec<Deadline>,
    pub confidence: f64,
    pub requires_human_review: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_reason: Option<ReviewReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedReply {
    pub text: String,
    pub metadata: ReplyMetadata,
}
