//! Per-form descriptors. Each module implements [`crate::pipeline::FormSpec`]
//! for one grant form: its extraction payload types, prompt, caps, formula
//! chain, rate selection and cell map. The pipeline machinery itself is
//! form-agnostic.

pub mod budgetary;
pub mod commercialization;
pub mod data;
pub mod patenting;
pub mod revenue;
pub mod staff;
pub mod summary;
pub mod tabs;

pub use budgetary::{BudgetaryForm, BudgetaryVariant};
pub use commercialization::CommercializationForm;
pub use data::DataForm;
pub use patenting::PatentingForm;
pub use revenue::RevenueForm;
pub use staff::StaffForm;
pub use summary::SummaryForm;
pub use tabs::ExpenditureTab;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{FormFillError, Result};

/// Appends the payload's generated JSON schema to a prompt so the model
/// sees the exact shape it must return.
pub(crate) fn prompt_with_schema<T: JsonSchema>(instructions: &str) -> String {
    let schema = schemars::schema_for!(T);
    let rendered = serde_json::to_string_pretty(&schema)
        .unwrap_or_else(|_| "{}".to_string());
    format!(
        "{}\n\nRespond with ONLY a JSON object matching this schema (no prose, no Markdown):\n{}",
        instructions.trim(),
        rendered
    )
}

/// Deserializes the cleaned extraction JSON into a form's payload type.
pub(crate) fn payload_from<T: DeserializeOwned>(extracted: &Value) -> Result<T> {
    serde_json::from_value(extracted.clone()).map_err(|e| FormFillError::MalformedResponse {
        details: format!("payload does not match expected shape: {}", e),
    })
}

/// Lenient numeric deserializers for extraction payloads. Models quote
/// numbers ("26.5") or leave arithmetic in strings often enough that strict
/// `f64` fields would reject otherwise usable responses.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use crate::expr;

    fn to_f64(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => expr::evaluate(s),
            _ => None,
        }
    }

    pub fn f64_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(to_f64(&value).unwrap_or(0.0))
    }

    pub fn u32_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(to_f64(&value)
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map_or(0, |v| v.round() as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct Probe {
        #[serde(deserialize_with = "lenient::f64_or_zero")]
        amount: f64,
        #[serde(deserialize_with = "lenient::u32_or_zero")]
        months: u32,
    }

    #[test]
    fn test_prompt_with_schema_embeds_properties() {
        let prompt = prompt_with_schema::<Probe>("Extract the probe.");
        assert!(prompt.starts_with("Extract the probe."));
        assert!(prompt.contains("\"amount\""));
        assert!(prompt.contains("\"months\""));
    }

    #[test]
    fn test_lenient_deserializers() {
        let probe: Probe =
            serde_json::from_value(serde_json::json!({"amount": "26.5", "months": 11.7})).unwrap();
        assert_eq!(probe.amount, 26.5);
        assert_eq!(probe.months, 12);

        let probe: Probe =
            serde_json::from_value(serde_json::json!({"amount": null, "months": "n/a"})).unwrap();
        assert_eq!(probe.amount, 0.0);
        assert_eq!(probe.months, 0);
    }
}
