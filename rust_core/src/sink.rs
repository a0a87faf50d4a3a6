//! Terminal actions for a selected candidate and the records they leave behind.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::clients::x::{char_weight, weighted_len, PollPublisher, PollSpec, POST_MAX_CHARS};
use crate::models::{Candidate, FeedEntry, NormalizedMarket, ProcessedMarker};

pub const CALL_TO_ACTION: &str = "👇 What do you think? Vote below!";

/// Where a selected candidate ends up.
#[derive(Clone)]
pub enum Sink {
    /// Post a poll to the social platform.
    Publish(Arc<dyn PollPublisher>),
    /// Append a feed entry for the dashboard.
    Log,
}

impl std::fmt::Debug for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sink::Publish(_) => f.write_str("Sink::Publish"),
            Sink::Log => f.write_str("Sink::Log"),
        }
    }
}

/// Build the post body: headline, optional commentary, odds and call to action.
/// The title is shortened when the whole post would exceed the platform limit.
pub fn compose_post(title: &str, commentary: &str, prob_yes: u8) -> String {
    let render = |title: &str| {
        let mut text = format!("🔥 TRENDING: {}\n\n", title);
        if !commentary.is_empty() {
            text.push_str(&format!("💡 {}\n\n", commentary));
        }
        text.push_str(&format!("📊 Market Odds: {}% Chance\n{}", prob_yes, CALL_TO_ACTION));
        text
    };

    let full = render(title);
    let overflow = weighted_len(&full).saturating_sub(POST_MAX_CHARS);
    if overflow == 0 {
        return full;
    }

    // Drop trailing title characters until the overflow and the ellipsis fit.
    let mut short: Vec<char> = title.chars().collect();
    let mut freed = 0;
    while freed < overflow + char_weight('…') {
        match short.pop() {
            Some(c) => freed += char_weight(c),
            None => break,
        }
    }
    let short: String = short.into_iter().collect();
    render(&format!("{}…", short.trim_end()))
}

/// Publish the candidate as a poll. Returns the post id.
pub async fn publish(
    publisher: &dyn PollPublisher,
    candidate: &Candidate,
    market: &NormalizedMarket,
    commentary: &str,
) -> Result<String> {
    let text = compose_post(&candidate.title, commentary, market.prob_yes());
    let poll = PollSpec::binary(&market.outcomes[0], &market.outcomes[1]);
    publisher.publish(&text, &poll).await
}

pub fn processed_marker(candidate: &Candidate, now: DateTime<Utc>) -> ProcessedMarker {
    ProcessedMarker {
        event_id: candidate.id.clone(),
        title: candidate.title.clone(),
        created_at: now,
    }
}

pub fn feed_entry(
    candidate: &Candidate,
    market: &NormalizedMarket,
    commentary: &str,
    now: DateTime<Utc>,
) -> FeedEntry {
    FeedEntry {
        market_id: candidate.id.clone(),
        market_title: candidate.title.clone(),
        market_slug: candidate.slug.clone(),
        commentary: commentary.to_string(),
        odds: market.prob_yes(),
        created_at: now,
    }
}
