use crate::config::ResilienceConfig;
use crate::store::Store;
use crate::types::{
    AnalysisMetadata, EmailAnalysis, GeneratedReply, ReplyMetadata, ReviewReason,
    SentimentScore, Tone, Urgency,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;

const STORE_KEY: &str = "error-tracking";

/// Named operations the resilience layer tracks independently. Closed enum
/// so new operations get compiler-enforced handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    AnalyzeEmail,
    GenerateSmartReplies,
    GenerateFullReply,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::AnalyzeEmail => "analyzeEmail",
            Operation::GenerateSmartReplies => "generateSmartReplies",
            Operation::GenerateFullReply => "generateFullReply",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ErrorRecord {
    count: u64,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TrackerState {
    records: HashMap<String, ErrorRecord>,
    last_error: Option<String>,
}

/// Per-operation rolling error bookkeeping, persisted through the store
/// seam so fallback mode survives restarts. Records idle past the retention
/// window are purged on every write, which is the only way an operation
/// leaves fallback mode short of a manual reset.
pub struct ErrorTracker {
    state: TrackerState,
    config: ResilienceConfig,
    store: Box<dyn Store>,
}

impl ErrorTracker {
    pub fn new(config: ResilienceConfig, store: Box<dyn Store>) -> Self {
        let state = match store.get(STORE_KEY) {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                log::warn!("Discarding unreadable error-tracking state: {e}");
                TrackerState::default()
            }),
            Ok(None) => TrackerState::default(),
            Err(e) => {
                log::warn!("Failed to load error-tracking state: {e}");
                TrackerState::default()
            }
        };
        ErrorTracker { state, config, store }
    }

    pub fn record_failure(&mut self, operation: Operation, message: &str, now: DateTime<Utc>) {
        self.purge_stale(now);
        let key = format!("{operation}:{message}");
        let record = self.state.records.entry(key).or_insert(ErrorRecord {
            count: 0,
            first_seen: now,
            last_seen: now,
        });
        record.count += 1;
        record.last_seen = now;
        self.state.last_error = Some(message.to_string());
        log::warn!("{operation} failed: {message}");
        self.persist();
    }

    /// An operation is in fallback mode when its live error count has
    /// reached the configured threshold.
    pub fn in_fallback(&self, operation: Operation, now: DateTime<Utc>) -> bool {
        self.live_count(operation, now) >= self.config.fallback_threshold
    }

    pub fn live_count(&self, operation: Operation, now: DateTime<Utc>) -> u64 {
        let prefix = format!("{operation}:");
        let retention = Duration::seconds(self.config.error_retention_seconds as i64);
        self.state
            .records
            .iter()
            .filter(|(key, record)| {
                key.starts_with(&prefix) && now - record.last_seen < retention
            })
            .map(|(_, record)| record.count)
            .sum()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.state.last_error.as_deref()
    }

    pub fn reset(&mut self) {
        self.state = TrackerState::default();
        self.persist();
    }

    fn purge_stale(&mut self, now: DateTime<Utc>) {
        let retention = Duration::seconds(self.config.error_retention_seconds as i64);
        self.state
            .records
            .retain(|_, record| now - record.last_seen < retention);
    }

    fn persist(&mut self) {
        match serde_json::to_string(&self.state) {
            Ok(json) => {
                if let Err(e) = self.store.set(STORE_KEY, &json) {
                    log::warn!("Failed to persist error-tracking state: {e}");
                }
            }
            Err(e) => log::warn!("Failed to serialize error-tracking state: {e}"),
        }
    }
}

/// Retry/fallback wrapper around fragile generation calls. Failures never
/// propagate: the caller always receives a value of the success type.
pub struct Resilience {
    tracker: ErrorTracker,
    config: ResilienceConfig,
}

impl Resilience {
    pub fn new(config: ResilienceConfig, store: Box<dyn Store>) -> Self {
        let tracker = ErrorTracker::new(config.clone(), store);
        Resilience { tracker, config }
    }

    pub fn tracker(&self) -> &ErrorTracker {
        &self.tracker
    }

    pub fn reset(&mut self) {
        self.tracker.reset();
    }

    /// Invoke `call` with retry and backoff; on exhaustion or while the
    /// operation is in fallback mode, return `fallback()` instead.
    pub async fn safely_invoke<T, F, Fut>(
        &mut self,
        operation: Operation,
        call: F,
        fallback: impl FnOnce() -> T,
    ) -> T
    where
        F: Fn() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if self.tracker.in_fallback(operation, Utc::now()) {
            log::info!("{operation} is in fallback mode, skipping call");
            return fallback();
        }

        let mut last_message = String::new();
        for attempt in 0..self.config.max_attempts {
            if attempt > 0 {
                let delay = self.config.base_delay_ms * 2u64.pow(attempt - 1);
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }
            match call().await {
                Ok(value) => return value,
                Err(e) => {
                    last_message = e.to_string();
                    log::debug!(
                        "{operation} attempt {}/{} failed: {last_message}",
                        attempt + 1,
                        self.config.max_attempts
                    );
                }
            }
        }

        self.tracker.record_failure(operation, &last_message, Utc::now());
        fallback()
    }
}

/// Minimal low-confidence analysis for fallback mode, rebuilt with the
/// cheap header regexes only. Always flagged for human review.
pub fn fallback_analysis(raw: &str) -> EmailAnalysis {
    let parser = crate::parser::EmailParser::new();
    let parsed = parser.parse(raw);
    let questions = crate::analyzer::extract::questions(&parsed.body);
    EmailAnalysis {
        sender: parsed.sender,
        subject: parsed.subject,
        intent: crate::types::Intent::Information,
        questions,
        action_items: Vec::new(),
        deadlines: Vec::new(),
        urgency: Urgency::Medium,
        sentiment: SentimentScore {
            tone: Tone::Neutral,
            confidence: 0.0,
        },
        has_attachments: parsed.has_attachments,
        timestamp: parsed.timestamp,
        metadata: AnalysisMetadata {
            confidence: 0.3,
            requires_human_review: true,
            review_reason: Some(ReviewReason::LowConfidence),
        },
    }
}

/// Three generic one-line replies for fallback mode.
pub fn fallback_suggestions() -> Vec<String> {
    vec![
        "Thank you for your email. I will review it and get back to you soon.".to_string(),
        "Thanks for reaching out. Let me look into this and follow up shortly.".to_string(),
        "I received your message and will respond with details as soon as I can.".to_string(),
    ]
}

/// One generic reply for fallback mode, flagged for human review.
pub fn fallback_reply() -> GeneratedReply {
    GeneratedReply {
        text: "Thank you for your email. I want to give your message the attention it deserves, \
               so I will review it carefully and send you a complete reply shortly."
            .to_string(),
        metadata: ReplyMetadata {
            questions_addressed: Vec::new(),
            action_items_included: Vec::new(),
            deadlines_referenced: Vec::new(),
            confidence: 0.3,
            requires_human_review: true,
            review_reason: Some(ReviewReason::LowConfidence),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_config() -> ResilienceConfig {
        ResilienceConfig {
            base_delay_ms: 1,
            ..Default::default()
        }
    }

    fn resilience() -> Resilience {
        Resilience::new(fast_config(), Box::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let mut r = resilience();
        let value = r
            .safely_invoke(
                Operation::AnalyzeEmail,
                || async { Ok::<_, anyhow::Error>(5) },
                || 0,
            )
            .await;
        assert_eq!(value, 5);
    }

    #[tokio::test]
    async fn test_retries_exactly_three_times_then_falls_back() {
        let mut r = resilience();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let value = r
            .safely_invoke(
                Operation::GenerateFullReply,
                move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Err::<u32, _>(anyhow::anyhow!("upstream down"))
                    }
                },
                || 99,
            )
            .await;
        assert_eq!(value, 99);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(r.tracker().last_error(), Some("upstream down"));
    }

    #[tokio::test]
    async fn test_transient_failure_recovers() {
        let mut r = resilience();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let value = r
            .safely_invoke(
                Operation::AnalyzeEmail,
                move || {
                    let counter = counter.clone();
                    async move {
                        if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                            Err(anyhow::anyhow!("flaky"))
                        } else {
                            Ok(7u32)
                        }
                    }
                },
                || 0,
            )
            .await;
        assert_eq!(value, 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fallback_mode_short_circuits() {
        let mut r = resilience();
        let now = Utc::now();
        for _ in 0..3 {
            r.tracker
                .record_failure(Operation::GenerateSmartReplies, "upstream down", now);
        }
        assert!(r.tracker().in_fallback(Operation::GenerateSmartReplies, now));

        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let value = r
            .safely_invoke(
                Operation::GenerateSmartReplies,
                move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(vec!["real".to_string()])
                    }
                },
                fallback_suggestions,
            )
            .await;
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
        assert_eq!(value.len(), 3);
    }

    #[tokio::test]
    async fn test_fallback_mode_is_per_operation() {
        let mut r = resilience();
        let now = Utc::now();
        for _ in 0..3 {
            r.tracker.record_failure(Operation::AnalyzeEmail, "down", now);
        }
        assert!(r.tracker().in_fallback(Operation::AnalyzeEmail, now));
        assert!(!r.tracker().in_fallback(Operation::GenerateFullReply, now));
    }

    #[test]
    fn test_error_counts_decay_with_time() {
        let mut tracker = ErrorTracker::new(fast_config(), Box::new(MemoryStore::new()));
        let old = Utc::now() - Duration::hours(25);
        for _ in 0..3 {
            tracker.record_failure(Operation::AnalyzeEmail, "down", old);
        }
        assert!(tracker.in_fallback(Operation::AnalyzeEmail, old));
        // A day later the records are stale and the next write purges them
        let now = Utc::now();
        assert!(!tracker.in_fallback(Operation::AnalyzeEmail, now));
        tracker.record_failure(Operation::AnalyzeEmail, "down again", now);
        assert_eq!(tracker.live_count(Operation::AnalyzeEmail, now), 1);
    }

    #[test]
    fn test_state_persists_across_restarts() {
        let mut first = ErrorTracker::new(fast_config(), Box::new(MemoryStore::new()));
        let now = Utc::now();
        first.record_failure(Operation::AnalyzeEmail, "down", now);
        let json = first.store.get(STORE_KEY).unwrap().unwrap();

        let mut seeded = MemoryStore::new();
        seeded.set(STORE_KEY, &json).unwrap();
        let second = ErrorTracker::new(fast_config(), Box::new(seeded));
        assert_eq!(second.live_count(Operation::AnalyzeEmail, now), 1);
        assert_eq!(second.last_error(), Some("down"));
    }

    #[test]
    fn test_manual_reset_clears_state() {
        let mut tracker = ErrorTracker::new(fast_config(), Box::new(MemoryStore::new()));
        let now = Utc::now();
        for _ in 0..3 {
            tracker.record_failure(Operation::AnalyzeEmail, "down", now);
        }
        tracker.reset();
        assert!(!tracker.in_fallback(Operation::AnalyzeEmail, now));
        assert_eq!(tracker.last_error(), None);
    }

    #[test]
    fn test_fallback_values_require_review() {
        let analysis = fallback_analysis("From: a@b.co\nSubject: Hello\n\nAre you there?");
        assert!(analysis.metadata.requires_human_review);
        assert_eq!(analysis.subject, "Hello");
        assert_eq!(analysis.questions, vec!["Are you there?"]);

        let reply = fallback_reply();
        assert!(reply.metadata.requires_human_review);
        assert_eq!(fallback_suggestions().len(), 3);
    }
}
