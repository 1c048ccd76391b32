use crate::analyzer::review_verdict;
use crate::config::ReviewConfig;
use crate::types::{
    Deadline, EmailAnalysis, GeneratedReply, Intent, ReplyLength, ReplyMetadata, ReplyOptions,
    ReplyTone, Urgency,
};
use chrono::{DateTime, Datelike, Duration, Utc, Weekday};

/// Template-driven reply drafter. Deterministic given the same analysis,
/// options and reference time.
pub struct ReplyComposer {
    review: ReviewConfig,
}

impl ReplyComposer {
    pub fn new(review: ReviewConfig) -> Self {
        ReplyComposer { review }
    }

    pub fn compose(&self, analysis: &EmailAnalysis, options: &ReplyOptions) -> GeneratedReply {
        self.compose_at(analysis, options, Utc::now())
    }

    /// Deterministic variant: `now` anchors proposed meeting slots.
    pub fn compose_at(
        &self,
        analysis: &EmailAnalysis,
        options: &ReplyOptions,
        now: DateTime<Utc>,
    ) -> GeneratedReply {
        let mut sections: Vec<String> = Vec::new();

        if options.include_intro {
            sections.push(greeting(analysis, options.tone));
        }
        sections.push(acknowledgment(analysis));

        let main = self.main_response(analysis, options, now);
        if !main.is_empty() {
            sections.push(main);
        }

        if options.include_action_items && !analysis.action_items.is_empty() {
            let mut block = String::from("I will take care of the following:");
            for item in &analysis.action_items {
                block.push_str(&format!("\n- {item}"));
            }
            sections.push(block);
        }

        if options.include_deadlines && !analysis.deadlines.is_empty() {
            let rendered: Vec<String> = analysis
                .deadlines
                .iter()
                .map(|d| match d.date {
                    Some(date) => date.format("%A, %B %-d, %Y").to_string(),
                    None => d.text.clone(),
                })
                .collect();
            sections.push(format!(
                "I have noted the deadline: {}.",
                rendered.join(" and ")
            ));
        }

        if options.include_outro {
            sections.push(closing(options.tone).to_string());
        }

        let text = sections
            .iter()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n\n")
            .trim()
            .to_string();

        let metadata = self.metadata(analysis, options, &text);
        GeneratedReply { text, metadata }
    }

    fn main_response(
        &self,
        analysis: &EmailAnalysis,
        options: &ReplyOptions,
        now: DateTime<Utc>,
    ) -> String {
        let mut paragraphs: Vec<String> = Vec::new();

        if !analysis.questions.is_empty() {
            paragraphs.push(question_block(&analysis.questions, options.length));
        }

        let intent_paragraph = match analysis.intent {
            Intent::Request => match analysis.urgency {
                Urgency::High => {
                    "I understand the urgency and will prioritize this right away.".to_string()
                }
                Urgency::Medium => {
                    "I will look into this and get back to you shortly.".to_string()
                }
                Urgency::Low => "I will review this and follow up.".to_string(),
            },
            Intent::Meeting => meeting_slots(now, options.length),
            Intent::FollowUp => {
                "Here is where things stand: I am still working through the details and will send a full status update soon."
                    .to_string()
            }
            Intent::Information | Intent::Introduction => {
                "I appreciate you keeping me informed and will review the details.".to_string()
            }
        };
        paragraphs.push(intent_paragraph);

        if let Some(context) = &options.context {
            if !context.is_empty() {
                paragraphs.push(format!("For context: {context}"));
            }
        }

        paragraphs.join("\n\n")
    }

    fn metadata(
        &self,
        analysis: &EmailAnalysis,
        options: &ReplyOptions,
        text: &str,
    ) -> ReplyMetadata {
        let normalized_reply = normalize(text);
        let covered = |fragment: &str| normalized_reply.contains(&normalize(fragment));

        let questions_addressed: Vec<String> = analysis
            .questions
            .iter()
            .filter(|q| covered(q))
            .cloned()
            .collect();
        let action_items_included: Vec<String> = analysis
            .action_items
            .iter()
            .filter(|item| covered(item))
            .cloned()
            .collect();
        let deadlines_referenced: Vec<Deadline> = if options.include_deadlines {
            analysis.deadlines.clone()
        } else {
            Vec::new()
        };

        let mut confidence = 1.0f64;
        if analysis.questions.len() > 2 {
            confidence *= 0.9;
        }
        if analysis.action_items.len() > 2 {
            confidence *= 0.9;
        }
        if analysis.deadlines.len() > 1 {
            confidence *= 0.9;
        }
        if analysis.urgency == Urgency::High {
            confidence *= 0.8;
        }
        if analysis.sentiment.tone == crate::types::Tone::Negative {
            confidence *= 0.7;
        }
        let full_coverage = questions_addressed.len() == analysis.questions.len()
            && action_items_included.len() == analysis.action_items.len();
        if !full_coverage {
            confidence *= 0.8;
        }
        let confidence = confidence.clamp(0.0, 1.0);

        let (requires_human_review, review_reason) = review_verdict(
            &self.review,
            analysis.urgency,
            analysis.sentiment.tone,
            analysis.questions.len(),
            analysis.action_items.len(),
            analysis.metadata.confidence,
        );

        ReplyMetadata {
            questions_addressed,
            action_items_included,
            deadlines_referenced,
            confidence,
            requires_human_review,
            review_reason,
        }
    }
}

fn greeting(analysis: &EmailAnalysis, tone: ReplyTone) -> String {
    let first_name = analysis.sender.first_name();
    match tone {
        ReplyTone::Formal | ReplyTone::Persuasive => {
            format!("Dear {},", first_name.unwrap_or("Sir/Madam"))
        }
        _ => format!("Hi {},", first_name.unwrap_or("there")),
    }
}

fn acknowledgment(analysis: &EmailAnalysis) -> String {
    let subject = if analysis.subject.is_empty() {
        "your email".to_string()
    } else {
        analysis.subject.clone()
    };
    match analysis.intent {
        Intent::Request => format!("Thank you for your request regarding {subject}."),
        Intent::Information => format!("Thank you for the information about {subject}."),
        Intent::FollowUp => format!("Thank you for following up on {subject}."),
        Intent::Introduction => format!("Thank you for reaching out about {subject}."),
        Intent::Meeting => format!("Thank you for your message about {subject}."),
    }
}

fn question_block(questions: &[String], length: ReplyLength) -> String {
    match length {
        ReplyLength::Short => questions
            .iter()
            .map(|q| format!("On \"{q}\": noted, answer to follow."))
            .collect::<Vec<_>>()
            .join("\n"),
        ReplyLength::Medium => questions
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{}. {q} I will confirm this point and follow up.", i + 1))
            .collect::<Vec<_>>()
            .join("\n"),
        ReplyLength::Long => questions
            .iter()
            .map(|q| {
                format!(
                    "**{q}**\nLet me address this in detail: I am gathering the relevant information and will include a complete answer in my next update."
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

/// Propose 1-3 time slots on consecutive business days, starting from the
/// next business day after `now`.
fn meeting_slots(now: DateTime<Utc>, length: ReplyLength) -> String {
    let slot_count = match length {
        ReplyLength::Short => 1,
        ReplyLength::Medium => 2,
        ReplyLength::Long => 3,
    };
    let mut slots = Vec::with_capacity(slot_count);
    let mut day = now.date_naive();
    while slots.len() < slot_count {
        day += Duration::days(1);
        if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            continue;
        }
        slots.push(format!("{} at 10:00 AM", day.format("%A, %B %-d")));
    }
    format!("Would any of these times work for you: {}?", slots.join(", "))
}

fn closing(tone: ReplyTone) -> &'static str {
    match tone {
        ReplyTone::Formal => "Sincerely,",
        ReplyTone::Friendly => "Best wishes,",
        ReplyTone::Assertive => "Regards,",
        ReplyTone::Concise => "Thanks,",
        ReplyTone::Persuasive => "Looking forward to your reply,",
    }
}

/// Case-fold and strip punctuation for substring coverage checks.
fn normalize(text: &str) -> String {
    let lowered: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}
