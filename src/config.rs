use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Engine configuration. Every heuristic threshold the engine uses lives
/// here so tests and deployments can tune them without code changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub review: ReviewConfig,
    pub cache: CacheConfig,
    pub resilience: ResilienceConfig,
    pub quality_log: QualityLogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// More questions than this flags the email for human review.
    pub max_questions: usize,
    /// More action items than this flags the email for human review.
    pub max_action_items: usize,
    /// Analysis confidence below this flags the email for human review.
    pub min_confidence: f64,
    /// Reply confidence below this surfaces the entry in the quality log's
    /// needs-attention view.
    pub attention_confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub analysis_ttl_seconds: u64,
    pub reply_ttl_seconds: u64,
    pub suggestion_ttl_seconds: u64,
    /// Writes past this entry count trigger an age-based prune pass.
    pub max_entries: usize,
    /// Word-set overlap ratio a stored key must exceed for a fuzzy hit.
    pub fuzzy_threshold: f64,
    /// Inputs shorter than this (normalized chars) skip the fuzzy scan.
    pub fuzzy_min_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Total attempts per wrapped call (1 initial + retries).
    pub max_attempts: u32,
    /// Backoff between attempts is base_delay_ms * 2^attempt.
    pub base_delay_ms: u64,
    /// Live error count at which an operation enters fallback mode.
    pub fallback_threshold: u64,
    /// Error records untouched for this long are purged on every write.
    pub error_retention_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityLogConfig {
    pub max_entries: usize,
    pub max_age_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            review: ReviewConfig::default(),
            cache: CacheConfig::default(),
            resilience: ResilienceConfig::default(),
            quality_log: QualityLogConfig::default(),
        }
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        ReviewConfig {
            max_questions: 3,
            max_action_items: 3,
            min_confidence: 0.4,
            attention_confidence: 0.7,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            analysis_ttl_seconds: 60 * 60,
            reply_ttl_seconds: 30 * 60,
            suggestion_ttl_seconds: 30 * 60,
            max_entries: 100,
            fuzzy_threshold: 0.8,
            fuzzy_min_length: 50,
        }
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        ResilienceConfig {
            max_attempts: 3,
            base_delay_ms: 500,
            fallback_threshold: 3,
            error_retention_seconds: 24 * 60 * 60,
        }
    }
}

impl Default for QualityLogConfig {
    fn default() -> Self {
        QualityLogConfig {
            max_entries: 100,
            max_age_seconds: 30 * 24 * 60 * 60,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn generate_default(path: &str) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(&Config::default())?;
        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {path}"))?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.cache.fuzzy_threshold) {
            anyhow::bail!(
                "cache.fuzzy_threshold must be in [0, 1], got {}",
                self.cache.fuzzy_threshold
            );
        }
        if !(0.0..=1.0).contains(&self.review.min_confidence) {
            anyhow::bail!(
                "review.min_confidence must be in [0, 1], got {}",
                self.review.min_confidence
            );
        }
        if self.resilience.max_attempts == 0 {
            anyhow::bail!("resilience.max_attempts must be at least 1");
        }
        Ok(())
    }
}
