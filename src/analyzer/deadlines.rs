use crate::types::Deadline;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DEADLINE_PHRASE: Regex = Regex::new(
        r"(?ix)\b(?:due|by|before|deadline(?:\s+is)?|no\s+later\s+than|until)\s+
          ( tomorrow | today | next\s+week | next\s+month
          | end\s+of\s+(?:day|week|month)
          | (?:monday|tuesday|wednesday|thursday|friday|saturday|sunday)
          | (?:january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2}(?:st|nd|rd|th)?(?:,?\s+\d{4})?
          | \d{4}-\d{2}-\d{2}
          | \d{1,2}/\d{1,2}(?:/\d{2,4})?
          )"
    )
    .unwrap();
    static ref URGENCY_PHRASE: Regex = Regex::new(
        r"(?i)\b(?:asap|as soon as possible|urgent(?:ly)?|immediate(?:ly)?|right away)\b"
    )
    .unwrap();
    static ref MONTH_DAY: Regex = Regex::new(
        r"(?i)^(january|february|march|april|may|june|july|august|september|october|november|december)\s+(\d{1,2})(?:st|nd|rd|th)?(?:,?\s+(\d{4}))?$"
    )
    .unwrap();
    static ref NUMERIC_DATE: Regex =
        Regex::new(r"^(\d{1,2})/(\d{1,2})(?:/(\d{2,4}))?$").unwrap();
    static ref ISO_DATE: Regex = Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap();
}

/// Capture deadline and urgency fragments from the body and resolve each to
/// a concrete date where possible. De-duplicated, first-seen order.
pub fn extract(body: &str, now: DateTime<Utc>) -> Vec<Deadline> {
    let mut fragments: Vec<String> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    for caps in DEADLINE_PHRASE.captures_iter(body) {
        let fragment = caps[0].trim().to_string();
        let key = fragment.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            fragments.push(fragment);
        }
    }
    for m in URGENCY_PHRASE.find_iter(body) {
        let fragment = m.as_str().trim().to_string();
        let key = fragment.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            fragments.push(fragment);
        }
    }

    fragments
        .into_iter()
        .map(|text| {
            let date = resolve(&text, now);
            Deadline { text, date }
        })
        .collect()
}

/// Resolve a captured fragment to a concrete date. Returns None when the
/// fragment carries no resolvable date (pure urgency terms).
pub fn resolve(fragment: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let lower = fragment.to_lowercase();
    // The capture includes the leading marker word; strip it for matching
    let term = lower
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_string();
    let term = ["due ", "by ", "before ", "deadline is ", "deadline ", "no later than ", "until "]
        .iter()
        .find_map(|prefix| term.strip_prefix(prefix))
        .unwrap_or(&term)
        .trim();

    let today = now.date_naive();
    match term {
        "today" | "end of day" => return Some(end_of(today)),
        "tomorrow" => return Some(end_of(today + Duration::days(1))),
        "next week" | "end of week" => return Some(end_of(today + Duration::days(7))),
        "next month" | "end of month" => return Some(end_of(today + Duration::days(30))),
        _ => {}
    }

    if let Some(weekday) = parse_weekday(term) {
        let mut date = today;
        while date.weekday() != weekday {
            date += Duration::days(1);
        }
        return Some(end_of(date));
    }

    if let Some(caps) = MONTH_DAY.captures(term) {
        let month = parse_month(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;
        let year = caps
            .get(3)
            .and_then(|y| y.as_str().parse::<i32>().ok())
            .unwrap_or(today.year());
        return NaiveDate::from_ymd_opt(year, month, day).map(|d| adjust_past(d, today));
    }

    if let Some(caps) = ISO_DATE.captures(term) {
        let date = NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        )?;
        return Some(adjust_past(date, today));
    }

    if let Some(caps) = NUMERIC_DATE.captures(term) {
        let a: u32 = caps[1].parse().ok()?;
        let b: u32 = caps[2].parse().ok()?;
        // Month-first when plausible, otherwise day-first
        let (month, day) = if a <= 12 { (a, b) } else { (b, a) };
        let year = match caps.get(3) {
            Some(y) => {
                let y: i32 = y.as_str().parse().ok()?;
                if y < 100 {
                    2000 + y
                } else {
                    y
                }
            }
            None => today.year(),
        };
        return NaiveDate::from_ymd_opt(year, month, day).map(|d| adjust_past(d, today));
    }

    None
}

/// A parsed date already behind us is assumed to mean the next year. This
/// mirrors the upstream behavior and can misfire for genuinely past-due
/// deadlines mentioned retrospectively.
fn adjust_past(date: NaiveDate, today: NaiveDate) -> DateTime<Utc> {
    if date < today {
        let advanced = NaiveDate::from_ymd_opt(date.year() + 1, date.month(), date.day())
            .unwrap_or(date);
        end_of(advanced)
    } else {
        end_of(date)
    }
}

fn end_of(date: NaiveDate) -> DateTime<Utc> {
    // Deadlines land at the end of the named day
    Utc.from_utc_datetime(&date.and_hms_opt(23, 59, 59).unwrap_or_default())
}

fn parse_weekday(term: &str) -> Option<Weekday> {
    match term {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn parse_month(name: &str) -> Option<u32> {
    match name.to_lowercase().as_str() {
        "january" => Some(1),
        "february" => Some(2),
        "march" => Some(3),
        "april" => Some(4),
        "may" => Some(5),
        "june" => Some(6),
        "july" => Some(7),
        "august" => Some(8),
        "september" => Some(9),
        "october" => Some(10),
        "november" => Some(11),
        "december" => Some(12),
        _ => None,
    }
}
