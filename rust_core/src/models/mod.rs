// Shared models for the Polypulse pipeline
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ============================================================================
// Upstream feed (Gamma /events)
// ============================================================================

/// A trending event as returned by the market feed, before validation or dedup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Candidate {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub slug: String,
    #[serde(default)]
    pub markets: Option<Vec<Market>>,
}

impl Candidate {
    /// The market the pipeline works with. Events with several markets are
    /// represented by their first one.
    pub fn primary_market(&self) -> Option<&Market> {
        self.markets.as_ref().and_then(|m| m.first())
    }
}

/// Raw market payload nested in a [`Candidate`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Market {
    #[serde(default)]
    pub outcomes: Option<Value>, // Can be array or JSON string
    #[serde(rename = "outcomePrices", default)]
    pub outcome_prices: Option<Value>, // Can be array or JSON string
}

/// A market that passed validation: exactly two outcomes with parsed prices.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMarket {
    pub outcomes: [String; 2],
    pub prices: [f64; 2],
}

impl NormalizedMarket {
    /// Probability of the first outcome as a whole percentage.
    pub fn prob_yes(&self) -> u8 {
        probability_pct(self.prices[0])
    }
}

/// Convert a price in `[0, 1]` to a rounded percentage in `[0, 100]`.
pub fn probability_pct(price: f64) -> u8 {
    (price * 100.0).round().clamp(0.0, 100.0) as u8
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Persisted records
// ============================================================================

/// Permanent dedup record written after a successful publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedMarker {
    pub event_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Feed record written in batch-log mode and read by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub market_id: String,
    pub market_title: String,
    pub market_slug: String,
    pub commentary: String,
    pub odds: u8,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_pct_rounds() {
        assert_eq!(probability_pct(0.654), 65);
        assert_eq!(probability_pct(0.72), 72);
        assert_eq!(probability_pct(0.0), 0);
        assert_eq!(probability_pct(1.0), 100);
    }

    #[test]
    fn test_probability_pct_stays_in_range() {
        for i in 0..=1000 {
            let p = i as f64 / 1000.0;
            assert!(probability_pct(p) <= 100);
        }
        assert_eq!(probability_pct(1.7), 100);
        assert_eq!(probability_pct(-0.2), 0);
    }

    #[test]
    fn test_candidate_accepts_numeric_id() {
        let c: Candidate = serde_json::from_value(serde_json::json!({
            "id": 16167,
            "title": "Fed cuts in March?",
            "slug": "fed-cuts-march",
            "markets": [{"outcomes": "[\"Yes\",\"No\"]", "outcomePrices": "[\"0.31\",\"0.69\"]"}]
        }))
        .unwrap();
        assert_eq!(c.id, "16167");
        assert!(c.primary_market().is_some());
    }

    #[test]
    fn test_candidate_without_markets() {
        let c: Candidate =
            serde_json::from_value(serde_json::json!({"id": "a", "title": "t", "markets": null}))
                .unwrap();
        assert!(c.primary_market().is_none());
        assert_eq!(c.slug, "");
    }

    #[test]
    fn test_candidate_null_text_fields() {
        let c: Candidate = serde_json::from_value(serde_json::json!({
            "id": "bad", "title": null, "slug": null, "markets": []
        }))
        .unwrap();
        assert_eq!(c.title, "");
        assert_eq!(c.slug, "");
        assert!(c.primary_market().is_none());
    }
}
