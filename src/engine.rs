use crate::analyzer::Analyzer;
use crate::cache::ResponseCache;
use crate::composer::ReplyComposer;
use crate::config::Config;
use crate::parser::EmailParser;
use crate::types::{EmailAnalysis, GeneratedReply, ParsedEmail, ReplyOptions};
use chrono::{DateTime, Utc};

/// Owns one instance of every hot-path component. Callers construct an
/// engine per logical context instead of sharing process-wide state, so
/// isolated instances are cheap in tests and embedders decide the
/// sharing/locking story themselves.
pub struct Engine {
    parser: EmailParser,
    analyzer: Analyzer,
    composer: ReplyComposer,
    analysis_cache: ResponseCache<EmailAnalysis>,
    reply_cache: ResponseCache<GeneratedReply>,
}

impl Engine {
    pub fn new(config: &Config) -> Self {
        Engine {
            parser: EmailParser::new(),
            analyzer: Analyzer::new(config.review.clone()),
            composer: ReplyComposer::new(config.review.clone()),
            analysis_cache: ResponseCache::for_analysis(&config.cache),
            reply_cache: ResponseCache::for_replies(&config.cache),
        }
    }

    pub fn parse(&self, raw: &str) -> ParsedEmail {
        self.parser.parse(raw)
    }

    /// Cache-backed analysis of raw email text.
    pub fn analyze(&mut self, raw: &str) -> EmailAnalysis {
        self.analyze_at(raw, Utc::now())
    }

    pub fn analyze_at(&mut self, raw: &str, now: DateTime<Utc>) -> EmailAnalysis {
        if let Some(hit) = self.analysis_cache.get_at::<()>(raw, None, now) {
            return hit;
        }
        let parsed = self.parser.parse_at(raw, now);
        let analysis = self.analyzer.analyze_at(&parsed, now);
        self.analysis_cache.put_at::<()>(raw, analysis.clone(), None, now);
        analysis
    }

    /// Cache-backed end-to-end draft: analyze the raw text, then compose a
    /// reply for it with the given options.
    pub fn draft_reply(&mut self, raw: &str, options: &ReplyOptions) -> (EmailAnalysis, GeneratedReply) {
        self.draft_reply_at(raw, options, Utc::now())
    }

    pub fn draft_reply_at(
        &mut self,
        raw: &str,
        options: &ReplyOptions,
        now: DateTime<Utc>,
    ) -> (EmailAnalysis, GeneratedReply) {
        let analysis = self.analyze_at(raw, now);
        if let Some(hit) = self.reply_cache.get_at(raw, Some(options), now) {
            return (analysis, hit);
        }
        let reply = self.composer.compose_at(&analysis, options, now);
        self.reply_cache.put_at(raw, reply.clone(), Some(options), now);
        (analysis, reply)
    }

    pub fn compose(&self, analysis: &EmailAnalysis, options: &ReplyOptions) -> GeneratedReply {
        self.composer.compose(analysis, options)
    }

    pub fn clear_caches(&mut self) {
        self.analysis_cache.clear();
        self.reply_cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Intent, ReplyTone};
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 2, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_end_to_end_draft() {
        let mut engine = Engine::new(&Config::default());
        let raw = "From: Alex Smith <alex@example.com>\nSubject: Report\n\n\
                   Hi, could you send the report by Friday?";
        let options = ReplyOptions {
            tone: ReplyTone::Formal,
            ..Default::default()
        };
        let (analysis, reply) = engine.draft_reply_at(raw, &options, fixed_now());
        assert_eq!(analysis.intent, Intent::Request);
        assert!(reply.text.starts_with("Dear Alex,"));
        assert!(reply.text.contains("could you send the report by Friday?"));
    }

    #[test]
    fn test_analysis_cache_hit_is_identical() {
        let mut engine = Engine::new(&Config::default());
        let raw = "From: a@b.co\nSubject: Sync\n\nCan we schedule a call by Tuesday?";
        let first = engine.analyze_at(raw, fixed_now());
        let second = engine.analyze_at(raw, fixed_now());
        assert_eq!(first, second);
    }

    #[test]
    fn test_reply_cache_distinguishes_options() {
        let mut engine = Engine::new(&Config::default());
        let raw = "From: Alex Smith <alex@example.com>\nSubject: Report\n\nCould you review it?";
        let formal = ReplyOptions {
            tone: ReplyTone::Formal,
            ..Default::default()
        };
        let friendly = ReplyOptions {
            tone: ReplyTone::Friendly,
            ..Default::default()
        };
        let (_, formal_reply) = engine.draft_reply_at(raw, &formal, fixed_now());
        let (_, friendly_reply) = engine.draft_reply_at(raw, &friendly, fixed_now());
        assert!(formal_reply.text.starts_with("Dear Alex,"));
        assert!(friendly_reply.text.starts_with("Hi Alex,"));
    }
}
