use lcm_common::Won;
use serde::{Deserialize, Deserializer};
use serde_json::Number;

use crate::IamportApiError;

/// The gateway reports amounts as JSON numbers, which may arrive with a trailing `.0`. Won has no minor unit, so any
/// amount with a fractional part is rejected rather than rounded.
pub fn parse_gateway_amount(n: &Number) -> Result<Won, IamportApiError> {
    if let Some(v) = n.as_i64() {
        return Ok(Won::from(v));
    }
    if let Some(v) = n.as_u64() {
        return Won::try_from(v).map_err(|e| IamportApiError::InvalidCurrencyAmount(e.to_string()));
    }
    let text = n.to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    if !fraction.chars().all(|c| c == '0') {
        return Err(IamportApiError::InvalidCurrencyAmount(format!("{text} is not a whole number of won")));
    }
    whole
        .parse::<i64>()
        .map(Won::from)
        .map_err(|e| IamportApiError::InvalidCurrencyAmount(format!("{text} is not a valid amount. {e}")))
}

pub fn deserialize_won<'de, D>(deserializer: D) -> Result<Won, D::Error>
where D: Deserializer<'de> {
    let n = Number::deserialize(deserializer)?;
    parse_gateway_amount(&n).map_err(serde::de::Error::custom)
}
