pub mod analyzer;
pub mod cache;
pub mod composer;
pub mod config;
pub mod engine;
pub mod parser;
pub mod quality_log;
pub mod resilience;
pub mod store;
pub mod types;

pub use analyzer::Analyzer;
pub use cache::ResponseCache;
pub use composer::ReplyComposer;
pub use config::Config;
pub use engine::Engine;
pub use parser::EmailParser;
pub use quality_log::{QualityEntry, QualityLog, QualityStats};
pub use resilience::{fallback_analysis, fallback_reply, fallback_suggestions, Operation, Resilience};
pub use store::{JsonFileStore, MemoryStore, Store};
pub use types::{
    Deadline, EmailAnalysis, GeneratedReply, Intent, ParsedEmail, ReplyLength, ReplyOptions,
    ReplyTone, ReviewReason, Sender, SentimentScore, Tone, Urgency,
};
