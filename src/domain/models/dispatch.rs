//! Structural validation of the untyped dispatcher payload.
//!
//! The dispatcher boundary returns raw JSON. A payload is usable only when
//! every required field is present with a finite, in-range numeric value;
//! anything else is a dispatch failure, never a zero-impact success.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::task::TaskOutput;

/// A dispatch result that passed structural validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub result_data: String,
    pub confidence_score: f64,
    pub actual_impact: f64,
    pub execution_time_ms: u64,
}

impl DispatchResult {
    /// Validate a raw payload from the dispatcher.
    ///
    /// Wire field names follow the dispatch contract: `resultData`,
    /// `confidenceScore`, `actualImpact`, `executionTime` (milliseconds).
    pub fn from_payload(payload: &Value) -> Result<Self, String> {
        let obj = payload
            .as_object()
            .ok_or_else(|| "payload is not an object".to_string())?;

        let result_data = obj
            .get("resultData")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing or non-string resultData".to_string())?
            .to_string();

        let confidence_score = finite_number(obj.get("confidenceScore"), "confidenceScore")?;
        if !(0.0..=1.0).contains(&confidence_score) {
            return Err(format!(
                "confidenceScore {confidence_score} outside [0, 1]"
            ));
        }

        let actual_impact = finite_number(obj.get("actualImpact"), "actualImpact")?;
        if actual_impact < 0.0 {
            return Err(format!("actualImpact {actual_impact} is negative"));
        }

        let execution_time = finite_number(obj.get("executionTime"), "executionTime")?;
        if execution_time < 0.0 {
            return Err(format!("executionTime {execution_time} is negative"));
        }

        Ok(Self {
            result_data,
            confidence_score,
            actual_impact,
            execution_time_ms: execution_time as u64,
        })
    }

    pub fn into_output(self) -> TaskOutput {
        TaskOutput {
            result_data: self.result_data,
            confidence_score: self.confidence_score,
            actual_impact: self.actual_impact,
            execution_time_ms: self.execution_time_ms,
        }
    }
}

fn finite_number(value: Option<&Value>, field: &str) -> Result<f64, String> {
    let n = value
        .and_then(Value::as_f64)
        .ok_or_else(|| format!("missing or non-numeric {field}"))?;
    if !n.is_finite() {
        return Err(format!("{field} is not finite"));
    }
    Ok(n)
}
