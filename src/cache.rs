use crate::config::CacheConfig;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::collections::HashSet;

struct CacheEntry<T> {
    value: T,
    written_at: DateTime<Utc>,
}

/// TTL cache keyed by normalized input text plus serialized options, with a
/// fuzzy fallback lookup for near-identical inputs. One instance per cache
/// class (analysis, reply, suggestions), each with its own TTL.
pub struct ResponseCache<T: Clone> {
    name: &'static str,
    ttl: Duration,
    max_entries: usize,
    fuzzy_threshold: f64,
    fuzzy_min_length: usize,
    entries: HashMap<String, CacheEntry<T>>,
}

impl<T: Clone> ResponseCache<T> {
    pub fn new(name: &'static str, ttl_seconds: u64, config: &CacheConfig) -> Self {
        ResponseCache {
            name,
            ttl: Duration::seconds(ttl_seconds as i64),
            max_entries: config.max_entries,
            fuzzy_threshold: config.fuzzy_threshold,
            fuzzy_min_length: config.fuzzy_min_length,
            entries: HashMap::new(),
        }
    }

    pub fn for_analysis(config: &CacheConfig) -> Self {
        Self::new("analysis", config.analysis_ttl_seconds, config)
    }

    pub fn for_replies(config: &CacheConfig) -> Self {
        Self::new("reply", config.reply_ttl_seconds, config)
    }

    pub fn for_suggestions(config: &CacheConfig) -> Self {
        Self::new("suggestion", config.suggestion_ttl_seconds, config)
    }

    pub fn get<O: Serialize>(&self, text: &str, options: Option<&O>) -> Option<T> {
        self.get_at(text, options, Utc::now())
    }

    pub fn put<O: Serialize>(&mut self, text: &str, value: T, options: Option<&O>) {
        self.put_at(text, value, options, Utc::now());
    }

    pub fn get_at<O: Serialize>(
        &self,
        text: &str,
        options: Option<&O>,
        now: DateTime<Utc>,
    ) -> Option<T> {
        let normalized = normalize(text);
        let suffix = options_suffix(options);
        let key = full_key(&normalized, &suffix);

        if let Some(entry) = self.entries.get(&key) {
            if self.is_live(entry, now) {
                log::debug!("{} cache hit (exact)", self.name);
                return Some(entry.value.clone());
            }
        }

        // Fuzzy fallback: skipped for short inputs where word overlap is
        // too coarse a signal
        if normalized.chars().count() < self.fuzzy_min_length {
            return None;
        }
        let words: HashSet<&str> = normalized.split(' ').collect();
        for (stored_key, entry) in &self.entries {
            if !self.is_live(entry, now) {
                continue;
            }
            let Some(stored_text) = stored_key.strip_suffix(&suffix) else {
                continue;
            };
            if similarity(&words, stored_text) > self.fuzzy_threshold {
                log::debug!("{} cache hit (fuzzy)", self.name);
                return Some(entry.value.clone());
            }
        }
        None
    }

    pub fn put_at<O: Serialize>(
        &mut self,
        text: &str,
        value: T,
        options: Option<&O>,
        now: DateTime<Utc>,
    ) {
        let key = full_key(&normalize(text), &options_suffix(options));
        self.entries.insert(key, CacheEntry { value, written_at: now });

        if self.entries.len() > self.max_entries {
            let ttl = self.ttl;
            let before = self.entries.len();
            self.entries.retain(|_, entry| now - entry.written_at < ttl);
            log::debug!(
                "{} cache pruned {} expired entries",
                self.name,
                before - self.entries.len()
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn is_live(&self, entry: &CacheEntry<T>, now: DateTime<Utc>) -> bool {
        now - entry.written_at < self.ttl
    }
}

/// Trim, case-fold and collapse whitespace.
fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn options_suffix<O: Serialize>(options: Option<&O>) -> String {
    match options {
        Some(o) => match serde_json::to_string(o) {
            Ok(json) => format!("|{json}"),
            Err(e) => {
                log::warn!("Failed to serialize cache options: {e}");
                "|".to_string()
            }
        },
        None => String::new(),
    }
}

fn full_key(normalized: &str, suffix: &str) -> String {
    format!("{normalized}{suffix}")
}

/// Word-set overlap ratio: common words over the smaller set.
fn similarity(words: &HashSet<&str>, stored_text: &str) -> f64 {
    let stored_words: HashSet<&str> = stored_text.split(' ').collect();
    let smaller = words.len().min(stored_words.len());
    if smaller == 0 {
        return 0.0;
    }
    let common = words.intersection(&stored_words).count();
    common as f64 / smaller as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config() -> CacheConfig {
        CacheConfig::default()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 2, 12, 0, 0).unwrap()
    }

    const NO_OPTS: Option<&()> = None;

    #[test]
    fn test_round_trip() {
        let mut cache: ResponseCache<String> = ResponseCache::for_analysis(&config());
        cache.put_at("Hello World", "value".to_string(), NO_OPTS, t0());
        assert_eq!(
            cache.get_at("  hello   world ", NO_OPTS, t0()),
            Some("value".to_string())
        );
    }

    #[test]
    fn test_ttl_expiry() {
        let mut cache: ResponseCache<u32> = ResponseCache::for_replies(&config());
        cache.put_at("some text", 7, NO_OPTS, t0());
        let within = t0() + Duration::minutes(29);
        let beyond = t0() + Duration::minutes(31);
        assert_eq!(cache.get_at("some text", NO_OPTS, within), Some(7));
        assert_eq!(cache.get_at("some text", NO_OPTS, beyond), None);
    }

    #[test]
    fn test_options_distinguish_entries() {
        let mut cache: ResponseCache<u32> = ResponseCache::for_replies(&config());
        cache.put_at("text", 1, Some(&"formal"), t0());
        cache.put_at("text", 2, Some(&"friendly"), t0());
        assert_eq!(cache.get_at("text", Some(&"formal"), t0()), Some(1));
        assert_eq!(cache.get_at("text", Some(&"friendly"), t0()), Some(2));
        assert_eq!(cache.get_at("text", NO_OPTS, t0()), None);
    }

    #[test]
    fn test_fuzzy_hit_on_near_identical_text() {
        let mut cache: ResponseCache<u32> = ResponseCache::for_analysis(&config());
        let original = "could you please send the quarterly report before the end of next week";
        let variant = "could you please send the quarterly report before the end of next week thanks again";
        cache.put_at(original, 42, NO_OPTS, t0());
        assert_eq!(cache.get_at(variant, NO_OPTS, t0()), Some(42));
    }

    #[test]
    fn test_fuzzy_skipped_for_short_inputs() {
        let mut cache: ResponseCache<u32> = ResponseCache::for_analysis(&config());
        cache.put_at("send the report now", 1, NO_OPTS, t0());
        // Near-identical but under the 50-char floor: no fuzzy scan
        assert_eq!(cache.get_at("send the report now please", NO_OPTS, t0()), None);
    }

    #[test]
    fn test_fuzzy_rejects_dissimilar_text() {
        let mut cache: ResponseCache<u32> = ResponseCache::for_analysis(&config());
        let original = "could you please send the quarterly report before the end of next week";
        let unrelated = "the annual offsite venue needs a catering headcount from every team lead";
        cache.put_at(original, 42, NO_OPTS, t0());
        assert_eq!(cache.get_at(unrelated, NO_OPTS, t0()), None);
    }

    #[test]
    fn test_prune_on_overflow_is_age_based() {
        let mut config = config();
        config.max_entries = 3;
        let mut cache: ResponseCache<u32> = ResponseCache::new("analysis", 3600, &config);
        let old = t0() - Duration::hours(2);
        cache.put_at("first old entry", 1, NO_OPTS, old);
        cache.put_at("second old entry", 2, NO_OPTS, old);
        cache.put_at("a fresh entry", 3, NO_OPTS, t0());
        assert_eq!(cache.len(), 3);
        // Fourth write exceeds the cap and prunes the expired entries only
        cache.put_at("another fresh entry", 4, NO_OPTS, t0());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_at("a fresh entry", NO_OPTS, t0()), Some(3));
        assert_eq!(cache.get_at("another fresh entry", NO_OPTS, t0()), Some(4));
    }
}
