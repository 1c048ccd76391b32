use crate::types::{ParsedEmail, Sender};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use regex::Regex;

/// Header-oriented email text parser. Never fails: unusable input produces a
/// well-formed placeholder record with `degraded` set so callers can tell
/// the two apart.
pub struct EmailParser {
    from_header: Regex,
    bare_address: Regex,
    subject_header: Regex,
    date_header: Regex,
    attachment_hint: Regex,
    signoff_line: Regex,
}

impl Default for EmailParser {
    fn default() -> Self {
        Self::new()
    }
}

impl EmailParser {
    pub fn new() -> Self {
        EmailParser {
            // "From: Display Name <user@host>" with the display name and
            // brackets both optional
            from_header: Regex::new(
                r"(?im)^(?:from|sender)\s*:\s*(?:\x22?([^\x22<\r\n]*?)\x22?\s*)?<?([A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,})>?\s*$",
            )
            .unwrap(),
            bare_address: Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap(),
            subject_header: Regex::new(r"(?im)^subject\s*:\s*(.+)$").unwrap(),
            date_header: Regex::new(r"(?im)^(?:date|sent)\s*:\s*(.+)$").unwrap(),
            attachment_hint: Regex::new(
                r"(?i)\battach(?:ed|ment|ments|ing)?\b|\benclos(?:ed|ure)\b|\.(?:pdf|docx?|xlsx?|pptx?|zip|csv|png|jpe?g)\b",
            )
            .unwrap(),
            signoff_line: Regex::new(
                r"(?i)^\s*(?:best(?:\s+(?:regards|wishes))?|regards|kind\s+regards|warm\s+regards|sincerely|thank\s+you|thanks|cheers)\s*,?\s*$",
            )
            .unwrap(),
        }
    }

    pub fn parse(&self, raw: &str) -> ParsedEmail {
        self.parse_at(raw, Utc::now())
    }

    /// Deterministic variant: `now` supplies the timestamp fallback.
    pub fn parse_at(&self, raw: &str, now: DateTime<Utc>) -> ParsedEmail {
        let normalized = normalize_text(raw);
        if normalized.trim().is_empty() {
            log::debug!("Empty email input, returning placeholder record");
            return ParsedEmail {
                sender: Sender::unknown(),
                subject: String::new(),
                body: String::new(),
                timestamp: now,
                has_attachments: false,
                degraded: true,
            };
        }

        let sender = self.extract_sender(&normalized);
        let subject = self.extract_subject(&normalized);
        let timestamp = self.extract_timestamp(&normalized, now);
        let body = self.extract_body(&normalized);
        let has_attachments = self.attachment_hint.is_match(&normalized);
        let degraded = sender.is_none();

        ParsedEmail {
            sender: sender.unwrap_or_else(Sender::unknown),
            subject,
            body,
            timestamp,
            has_attachments,
            degraded,
        }
    }

    fn extract_sender(&self, text: &str) -> Option<Sender> {
        if let Some(caps) = self.from_header.captures(text) {
            let name = caps
                .get(1)
                .map(|m| m.as_str().trim().to_string())
                .filter(|n| !n.is_empty());
            let email = caps.get(2)?.as_str().to_string();
            return Some(Sender { name, email });
        }
        // No header; settle for the first bare address anywhere in the text
        self.bare_address.find(text).map(|m| Sender {
            name: None,
            email: m.as_str().to_string(),
        })
    }

    fn extract_subject(&self, text: &str) -> String {
        let Some(caps) = self.subject_header.captures(text) else {
            return String::new();
        };
        strip_reply_prefixes(caps[1].trim()).to_string()
    }

    fn extract_timestamp(&self, text: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        let Some(caps) = self.date_header.captures(text) else {
            return now;
        };
        let value = caps[1].trim();
        if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
            return dt.with_timezone(&Utc);
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return dt.with_timezone(&Utc);
        }
        for format in ["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M", "%B %d, %Y"] {
            if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(value, format) {
                return Utc.from_utc_datetime(&dt);
            }
            if let Ok(d) = NaiveDate::parse_from_str(value, format) {
                if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                    return Utc.from_utc_datetime(&dt);
                }
            }
        }
        log::debug!("Unparseable date header {value:?}, falling back to now");
        now
    }

    fn extract_body(&self, text: &str) -> String {
        // Body starts after the first blank line; if there is none, treat
        // everything that is not a recognizable header line as body
        let body = match text.split_once("\n\n") {
            Some((_, rest)) => rest.to_string(),
            None => text
                .lines()
                .filter(|line| !is_header_line(line))
                .collect::<Vec<_>>()
                .join("\n"),
        };
        self.strip_signature(&body).trim().to_string()
    }

    /// Drop everything from a signature divider or sign-off line onward.
    fn strip_signature(&self, body: &str) -> String {
        let mut kept = Vec::new();
        for line in body.lines() {
            let trimmed = line.trim();
            if trimmed == "--" || trimmed == "__" || trimmed.starts_with("-- ") {
                break;
            }
            if self.signoff_line.is_match(line) {
                break;
            }
            kept.push(line);
        }
        kept.join("\n")
    }
}

/// Strip stacked "Re:"/"Fwd:"/"Fw:" prefixes, case-insensitively.
fn strip_reply_prefixes(mut subject: &str) -> &str {
    loop {
        subject = subject.trim_start();
        let mut stripped = false;
        for prefix in ["re:", "fwd:", "fw:"] {
            let matches = subject
                .get(..prefix.len())
                .map_or(false, |head| head.eq_ignore_ascii_case(prefix));
            if matches {
                subject = &subject[prefix.len()..];
                stripped = true;
                break;
            }
        }
        if !stripped {
            return subject;
        }
    }
}

fn is_header_line(line: &str) -> bool {
    let lower = line.trim_start().to_lowercase();
    ["from:", "sender:", "to:", "cc:", "subject:", "date:", "sent:"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Normalize line endings and collapse runs of blank lines.
fn normalize_text(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(unified.len());
    let mut blank_run = 0;
    for line in unified.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
            out.push('\n');
        } else {
            blank_run = 0;
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "From: Alex Smith <alex@example.com>\r\n\
                          Subject: Re: Quarterly report\r\n\
                          Date: Tue, 1 Jul 2025 09:30:00 +0000\r\n\
                          \r\n\
                          Hi, could you send the report by Friday?\r\n\
                          \r\n\
                          Thanks,\r\n\
                          Sam";

    #[test]
    fn test_parse_full_headers() {
        let parser = EmailParser::new();
        let parsed = parser.parse(SAMPLE);
        assert_eq!(parsed.sender.name.as_deref(), Some("Alex Smith"));
        assert_eq!(parsed.sender.email, "alex@example.com");
        assert_eq!(parsed.subject, "Quarterly report");
        assert_eq!(parsed.timestamp.to_rfc2822(), "Tue, 1 Jul 2025 09:30:00 +0000");
        assert!(parsed.body.contains("send the report"));
        assert!(!parsed.degraded);
    }

    #[test]
    fn test_parse_empty_input_never_fails() {
        let parser = EmailParser::new();
        for input in ["", "   ", "\r\n\r\n"] {
            let parsed = parser.parse(input);
            assert_eq!(parsed.sender.email, "unknown@example.com");
            assert!(parsed.subject.is_empty());
            assert!(parsed.body.is_empty());
            assert!(parsed.degraded);
        }
    }

    #[test]
    fn test_bare_address_fallback() {
        let parser = EmailParser::new();
        let parsed = parser.parse("please reply to sam@corp.io about the invoice");
        assert_eq!(parsed.sender.email, "sam@corp.io");
        assert!(parsed.sender.name.is_none());
    }

    #[test]
    fn test_stacked_subject_prefixes_stripped() {
        let parser = EmailParser::new();
        let parsed = parser.parse("Subject: Re: Fwd: Budget sign-off\n\nbody text");
        assert_eq!(parsed.subject, "Budget sign-off");
    }

    #[test]
    fn test_signature_block_stripped() {
        let parser = EmailParser::new();
        let raw = "From: a@b.co\n\nSee agenda below.\n--\nAlex Smith\nVP of Widgets";
        let parsed = parser.parse(raw);
        assert!(parsed.body.contains("agenda"));
        assert!(!parsed.body.contains("VP of Widgets"));
    }

    #[test]
    fn test_signoff_keyword_stripped() {
        let parser = EmailParser::new();
        let parsed = parser.parse(SAMPLE);
        assert!(!parsed.body.contains("Sam"));
    }

    #[test]
    fn test_attachment_detection() {
        let parser = EmailParser::new();
        assert!(parser.parse("From: a@b.co\n\nI attached the budget.xlsx").has_attachments);
        assert!(!parser.parse("From: a@b.co\n\nno files here").has_attachments);
    }

    #[test]
    fn test_bad_date_falls_back_to_now() {
        let parser = EmailParser::new();
        let now = Utc::now();
        let parsed = parser.parse_at("Date: not a date\nFrom: a@b.co\n\nhello", now);
        assert_eq!(parsed.timestamp, now);
    }
}
