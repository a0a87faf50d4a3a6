//! Market shape validation.
//!
//! Gamma returns `outcomes` and `outcomePrices` either as JSON arrays or as
//! JSON-encoded strings holding an array. Both forms normalize to the same
//! [`NormalizedMarket`]; malformed text skips the candidate and never fails
//! the run.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::models::{Candidate, Market, NormalizedMarket};

/// Why a candidate was rejected before the dedup check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoMarketData,
    OutcomeParseError,
    OutcomeCountMismatch,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NoMarketData => "no_market_data",
            SkipReason::OutcomeParseError => "outcome_parse_error",
            SkipReason::OutcomeCountMismatch => "outcome_count_mismatch",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate the primary market of a candidate.
pub fn validate_candidate(candidate: &Candidate) -> Result<NormalizedMarket, SkipReason> {
    validate_market(candidate.primary_market())
}

/// Normalize a raw market into exactly two outcomes and two prices.
pub fn validate_market(market: Option<&Market>) -> Result<NormalizedMarket, SkipReason> {
    let market = market.ok_or(SkipReason::NoMarketData)?;
    let (Some(outcomes_val), Some(prices_val)) = (&market.outcomes, &market.outcome_prices)
    else {
        return Err(SkipReason::NoMarketData);
    };

    let outcomes = parse_outcomes(outcomes_val)?;
    let [yes, no]: [String; 2] = outcomes
        .try_into()
        .map_err(|_| SkipReason::OutcomeCountMismatch)?;

    let prices = parse_prices(prices_val)?;
    let prices: [f64; 2] = prices
        .try_into()
        .map_err(|_| SkipReason::OutcomeCountMismatch)?;

    Ok(NormalizedMarket {
        outcomes: [yes, no],
        prices,
    })
}

/// Decode a value that is either a JSON array or a string holding one.
fn decode_array(v: &Value) -> Result<Vec<Value>, SkipReason> {
    match v {
        Value::Array(arr) => Ok(arr.clone()),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(arr)) => Ok(arr),
            _ => Err(SkipReason::OutcomeParseError),
        },
        _ => Err(SkipReason::OutcomeParseError),
    }
}

fn parse_outcomes(v: &Value) -> Result<Vec<String>, SkipReason> {
    decode_array(v)?
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            _ => Err(SkipReason::OutcomeParseError),
        })
        .collect()
}

fn parse_prices(v: &Value) -> Result<Vec<f64>, SkipReason> {
    decode_array(v)?
        .iter()
        .map(|item| {
            let price = match item {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            price
                .filter(|p| p.is_finite())
                .ok_or(SkipReason::OutcomeParseError)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn market(outcomes: Value, prices: Value) -> Market {
        Market {
            outcomes: Some(outcomes),
            outcome_prices: Some(prices),
        }
    }

    #[test]
    fn test_string_and_array_forms_normalize_identically() {
        let from_string = validate_market(Some(&market(
            json!("[\"Yes\",\"No\"]"),
            json!("[\"0.654\",\"0.346\"]"),
        )))
        .unwrap();
        let from_array = validate_market(Some(&market(json!(["Yes", "No"]), json!([0.654, 0.346]))))
            .unwrap();

        assert_eq!(from_string, from_array);
        assert_eq!(from_string.outcomes, ["Yes".to_string(), "No".to_string()]);
        assert_eq!(from_string.prob_yes(), 65);
    }

    #[test]
    fn test_three_outcomes_is_count_mismatch() {
        let result = validate_market(Some(&market(
            json!(["A", "B", "C"]),
            json!([0.2, 0.3, 0.5]),
        )));
        assert_eq!(result, Err(SkipReason::OutcomeCountMismatch));

        let encoded = validate_market(Some(&market(
            json!("[\"A\",\"B\",\"C\"]"),
            json!("[\"0.2\",\"0.3\",\"0.5\"]"),
        )));
        assert_eq!(encoded, Err(SkipReason::OutcomeCountMismatch));
    }

    #[test]
    fn test_price_count_must_match() {
        let result = validate_market(Some(&market(json!(["Yes", "No"]), json!([0.4]))));
        assert_eq!(result, Err(SkipReason::OutcomeCountMismatch));
    }

    #[test]
    fn test_malformed_text_is_parse_error() {
        let bad_outcomes = validate_market(Some(&market(json!("[\"Yes\",\"No\""), json!([0.5, 0.5]))));
        assert_eq!(bad_outcomes, Err(SkipReason::OutcomeParseError));

        let bad_prices = validate_market(Some(&market(json!(["Yes", "No"]), json!("not json"))));
        assert_eq!(bad_prices, Err(SkipReason::OutcomeParseError));

        let non_numeric = validate_market(Some(&market(json!(["Yes", "No"]), json!(["abc", "0.5"]))));
        assert_eq!(non_numeric, Err(SkipReason::OutcomeParseError));

        let object = validate_market(Some(&market(json!({"yes": 1}), json!([0.5, 0.5]))));
        assert_eq!(object, Err(SkipReason::OutcomeParseError));
    }

    #[test]
    fn test_missing_market_data() {
        assert_eq!(validate_market(None), Err(SkipReason::NoMarketData));

        let partial = Market {
            outcomes: Some(json!(["Yes", "No"])),
            outcome_prices: None,
        };
        assert_eq!(validate_market(Some(&partial)), Err(SkipReason::NoMarketData));
    }

    #[test]
    fn test_candidate_uses_first_market() {
        let candidate: Candidate = serde_json::from_value(json!({
            "id": "a",
            "title": "t",
            "slug": "s",
            "markets": [
                {"outcomes": ["Yes", "No"], "outcomePrices": [0.72, 0.28]},
                {"outcomes": ["A", "B", "C"], "outcomePrices": [0.1, 0.2, 0.7]}
            ]
        }))
        .unwrap();
        let normalized = validate_candidate(&candidate).unwrap();
        assert_eq!(normalized.prob_yes(), 72);
    }

    #[test]
    fn test_skip_reason_labels() {
        assert_eq!(SkipReason::NoMarketData.to_string(), "no_market_data");
        assert_eq!(SkipReason::OutcomeParseError.as_str(), "outcome_parse_error");
        assert_eq!(
            serde_json::to_value(SkipReason::OutcomeCountMismatch).unwrap(),
            json!("outcome_count_mismatch")
        );
    }
}
