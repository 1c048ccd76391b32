use crate::config::{QualityLogConfig, ReviewConfig};
use crate::store::Store;
use crate::types::{EmailAnalysis, GeneratedReply};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

const STORE_KEY: &str = "quality-log";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub rating: Option<u8>,
    pub comments: Option<String>,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub email_content: String,
    pub email_subject: Option<String>,
    pub email_sender: Option<String>,
    pub analysis: EmailAnalysis,
    pub generated_reply: GeneratedReply,
    pub was_used: bool,
    pub was_edited: bool,
    pub time_taken_ms: u64,
    pub user_feedback: Option<Feedback>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityStats {
    pub total: usize,
    pub used: usize,
    pub edited: usize,
    pub needing_attention: usize,
    pub average_confidence: f64,
    pub average_rating: Option<f64>,
}

/// Append-only journal of generated replies and their later usage outcome,
/// bounded by entry count and age. Off the hot path: callers record after
/// generation and report usage whenever it happens.
pub struct QualityLog {
    entries: Vec<QualityEntry>,
    config: QualityLogConfig,
    attention_confidence: f64,
    store: Box<dyn Store>,
    next_id: u64,
}

impl QualityLog {
    pub fn new(config: QualityLogConfig, review: &ReviewConfig, store: Box<dyn Store>) -> Self {
        let entries: Vec<QualityEntry> = match store.get(STORE_KEY) {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                log::warn!("Discarding unreadable quality log: {e}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("Failed to load quality log: {e}");
                Vec::new()
            }
        };
        QualityLog {
            entries,
            config,
            attention_confidence: review.attention_confidence,
            store,
            next_id: 0,
        }
    }

    pub fn record(
        &mut self,
        email_content: &str,
        analysis: &EmailAnalysis,
        reply: &GeneratedReply,
        subject: Option<&str>,
        sender: Option<&str>,
        time_taken_ms: u64,
    ) -> String {
        self.record_at(email_content, analysis, reply, subject, sender, time_taken_ms, Utc::now())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn record_at(
        &mut self,
        email_content: &str,
        analysis: &EmailAnalysis,
        reply: &GeneratedReply,
        subject: Option<&str>,
        sender: Option<&str>,
        time_taken_ms: u64,
        now: DateTime<Utc>,
    ) -> String {
        let id = format!("{}-{}", now.timestamp_millis(), self.next_id);
        self.next_id += 1;

        let entry = QualityEntry {
            id: id.clone(),
            timestamp: now,
            email_content: email_content.to_string(),
            email_subject: subject.map(str::to_string),
            email_sender: sender.map(str::to_string),
            analysis: analysis.clone(),
            generated_reply: reply.clone(),
            was_used: false,
            was_edited: false,
            time_taken_ms,
            user_feedback: None,
        };
        // Newest first
        self.entries.insert(0, entry);
        self.trim(now);
        self.persist();
        id
    }

    pub fn mark_used(&mut self, id: &str, was_edited: bool) {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.was_used = true;
                entry.was_edited = was_edited;
                self.persist();
            }
            None => log::warn!("mark_used: no quality log entry with id {id}"),
        }
    }

    pub fn add_feedback(
        &mut self,
        id: &str,
        rating: Option<u8>,
        comments: Option<String>,
        suggestion: Option<String>,
    ) {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.user_feedback = Some(Feedback {
                    rating,
                    comments,
                    suggestion,
                });
                self.persist();
            }
            None => log::warn!("add_feedback: no quality log entry with id {id}"),
        }
    }

    pub fn entries(&self) -> &[QualityEntry] {
        &self.entries
    }

    /// Entries a reviewer should look at: flagged analyses or replies the
    /// composer was not confident about.
    pub fn needing_attention(&self) -> Vec<&QualityEntry> {
        self.entries
            .iter()
            .filter(|e| {
                e.analysis.metadata.requires_human_review
                    || e.generated_reply.metadata.confidence < self.attention_confidence
            })
            .collect()
    }

    pub fn stats(&self) -> QualityStats {
        let total = self.entries.len();
        let used = self.entries.iter().filter(|e| e.was_used).count();
        let edited = self.entries.iter().filter(|e| e.was_edited).count();
        let needing_attention = self.needing_attention().len();
        let average_confidence = if total == 0 {
            0.0
        } else {
            self.entries
                .iter()
                .map(|e| e.generated_reply.metadata.confidence)
                .sum::<f64>()
                / total as f64
        };
        let ratings: Vec<f64> = self
            .entries
            .iter()
            .filter_map(|e| e.user_feedback.as_ref()?.rating.map(f64::from))
            .collect();
        let average_rating = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
        };

        QualityStats {
            total,
            used,
            edited,
            needing_attention,
            average_confidence,
            average_rating,
        }
    }

    fn trim(&mut self, now: DateTime<Utc>) {
        let max_age = Duration::seconds(self.config.max_age_seconds as i64);
        self.entries.retain(|e| now - e.timestamp < max_age);
        self.entries.truncate(self.config.max_entries);
    }

    fn persist(&mut self) {
        match serde_json::to_string(&self.entries) {
            Ok(json) => {
                if let Err(e) = self.store.set(STORE_KEY, &json) {
                    log::warn!("Failed to persist quality log: {e}");
                }
            }
            Err(e) => log::warn!("Failed to serialize quality log: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::composer::ReplyComposer;
    use crate::parser::EmailParser;
    use crate::store::MemoryStore;
    use crate::types::ReplyOptions;
    use chrono::TimeZone;

    fn log() -> QualityLog {
        QualityLog::new(
            QualityLogConfig::default(),
            &ReviewConfig::default(),
            Box::new(MemoryStore::new()),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 2, 12, 0, 0).unwrap()
    }

    fn sample_pair(raw: &str) -> (EmailAnalysis, GeneratedReply) {
        let parsed = EmailParser::new().parse_at(raw, now());
        let analysis = Analyzer::new(ReviewConfig::default()).analyze_at(&parsed, now());
        let reply = ReplyComposer::new(ReviewConfig::default()).compose_at(
            &analysis,
            &ReplyOptions::default(),
            now(),
        );
        (analysis, reply)
    }

    #[test]
    fn test_record_and_mark_used() {
        let mut log = log();
        let (analysis, reply) = sample_pair("From: a@b.co\nSubject: Hi\n\nAll is well.");
        let id = log.record("raw", &analysis, &reply, Some("Hi"), Some("a@b.co"), 12);
        assert_eq!(log.entries().len(), 1);
        assert!(!log.entries()[0].was_used);

        log.mark_used(&id, true);
        assert!(log.entries()[0].was_used);
        assert!(log.entries()[0].was_edited);
    }

    #[test]
    fn test_newest_first_and_count_bound() {
        let mut log = QualityLog::new(
            QualityLogConfig {
                max_entries: 2,
                ..Default::default()
            },
            &ReviewConfig::default(),
            Box::new(MemoryStore::new()),
        );
        let (analysis, reply) = sample_pair("From: a@b.co\nSubject: Hi\n\nAll is well.");
        log.record_at("first", &analysis, &reply, None, None, 0, now());
        log.record_at("second", &analysis, &reply, None, None, 0, now());
        log.record_at("third", &analysis, &reply, None, None, 0, now());
        assert_eq!(log.entries().len(), 2);
        assert_eq!(log.entries()[0].email_content, "third");
        assert_eq!(log.entries()[1].email_content, "second");
    }

    #[test]
    fn test_age_bound_drops_old_entries() {
        let mut log = log();
        let (analysis, reply) = sample_pair("From: a@b.co\nSubject: Hi\n\nAll is well.");
        let old = now() - Duration::days(40);
        log.record_at("stale", &analysis, &reply, None, None, 0, old);
        log.record_at("fresh", &analysis, &reply, None, None, 0, now());
        assert_eq!(log.entries().len(), 1);
        assert_eq!(log.entries()[0].email_content, "fresh");
    }

    #[test]
    fn test_needing_attention_and_stats() {
        let mut log = log();
        let (calm_analysis, calm_reply) =
            sample_pair("From: a@b.co\nSubject: Hi\n\nAll is well.");
        let (urgent_analysis, urgent_reply) =
            sample_pair("From: a@b.co\nSubject: Down\n\nThis is urgent, the site failed!");
        let calm_id = log.record("calm", &calm_analysis, &calm_reply, None, None, 5);
        log.record("urgent", &urgent_analysis, &urgent_reply, None, None, 5);

        assert!(urgent_analysis.metadata.requires_human_review);
        assert_eq!(log.needing_attention().len(), 1);

        log.mark_used(&calm_id, false);
        log.add_feedback(&calm_id, Some(4), Some("good draft".to_string()), None);
        let stats = log.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.used, 1);
        assert_eq!(stats.edited, 0);
        assert_eq!(stats.needing_attention, 1);
        assert_eq!(stats.average_rating, Some(4.0));
        assert!(stats.average_confidence > 0.0);
    }

    #[test]
    fn test_unknown_id_is_a_warned_noop() {
        let mut log = log();
        log.mark_used("missing", true);
        log.add_feedback("missing", Some(1), None, None);
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_persists_through_store() {
        let mut seeded = MemoryStore::new();
        {
            let mut log = QualityLog::new(
                QualityLogConfig::default(),
                &ReviewConfig::default(),
                Box::new(MemoryStore::new()),
            );
            let (analysis, reply) = sample_pair("From: a@b.co\nSubject: Hi\n\nAll is well.");
            log.record("raw", &analysis, &reply, None, None, 0);
            let json = log.store.get(STORE_KEY).unwrap().unwrap();
            seeded.set(STORE_KEY, &json).unwrap();
        }
        let reloaded = QualityLog::new(
            QualityLogConfig::default(),
            &ReviewConfig::default(),
            Box::new(seeded),
        );
        assert_eq!(reloaded.entries().len(), 1);
    }
}
