//! Contractor data sheet (annex 1A): four fixed rows for the project
//! participants (applicant and up to three partners) plus a lookup table
//! listing every contractor with its legal entity.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{lenient, payload_from, prompt_with_schema};
use crate::error::Result;
use crate::pipeline::{FormSpec, ParsedForm};
use crate::prompts;
use crate::rates::FUNDING_INTENSITY_RATE;
use crate::schema::{Category, FormRates, FormulaStep, LineItem, SubtotalPolicy, QUOTE_CHAIN};
use crate::workbook::FormOutput;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct Contractor {
    #[schemars(description = "\"Applicant\"/\"Partner No 1\"-\"Partner No 3\" for participants, otherwise the contractor's role.")]
    #[serde(default)]
    pub type_of_contractor: String,
    #[schemars(description = "Legal form of the contractor (e.g. \"Private Company\", \"University\").")]
    #[serde(default)]
    pub legal_entity: String,
    #[schemars(description = "Eligible costs attributed to the contractor, EUR.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub eligible_costs: f64,
    #[schemars(description = "Funding requested for the contractor, EUR.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub funding_requested: f64,
}

impl Contractor {
    /// Funding can never exceed the eligible costs; an over-claim is capped
    /// at the standard funding intensity.
    fn capped_funding(&self) -> f64 {
        if self.eligible_costs > 0.0 && self.funding_requested > self.eligible_costs {
            self.eligible_costs * FUNDING_INTENSITY_RATE
        } else {
            self.funding_requested
        }
    }

    fn to_line_item(&self) -> LineItem {
        LineItem {
            label: self.type_of_contractor.clone(),
            base_amount: self.eligible_costs,
            ..LineItem::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct DataPayload {
    #[schemars(description = "One entry per contractor, project participants first.")]
    #[serde(default)]
    pub contractors: Vec<Contractor>,
}

/// Fixed participant rows; each holds the matching contractor or zeros.
const MAIN_ROWS: [(&str, u32); 4] = [
    ("Applicant", 3),
    ("Partner No 1", 4),
    ("Partner No 2", 5),
    ("Partner No 3", 6),
];

const LOOKUP_START_ROW: u32 = 9;
const LOOKUP_CAP: usize = 10;

const REQUIRED_KEYS: &[&str] = &["contractors"];

#[derive(Debug, Default)]
pub struct DataForm;

impl DataForm {
    pub fn new() -> Self {
        Self
    }
}

impl FormSpec for DataForm {
    fn name(&self) -> &str {
        "contractor-data"
    }

    fn sheet_name(&self) -> &str {
        "DATA"
    }

    fn system_prompt(&self) -> &str {
        prompts::SYSTEM_PROMPT
    }

    fn user_prompt(&self) -> String {
        prompt_with_schema::<DataPayload>(prompts::DATA_PROMPT)
    }

    fn required_keys(&self) -> &[&str] {
        REQUIRED_KEYS
    }

    fn rates(&self, _extracted: &Value) -> FormRates {
        FormRates::non_budgetary()
    }

    fn chain(&self) -> &[FormulaStep] {
        QUOTE_CHAIN
    }

    fn parse(&self, extracted: &Value) -> Result<ParsedForm> {
        let payload: DataPayload = payload_from(extracted)?;
        let items = payload.contractors.iter().map(Contractor::to_line_item).collect();

        Ok(ParsedForm {
            categories: vec![Category::with_items(
                "Contractors",
                LOOKUP_CAP,
                SubtotalPolicy::Sum,
                items,
            )],
            extracted: extracted.clone(),
        })
    }

    fn place(
        &self,
        parsed: &ParsedForm,
        _totals: &crate::schema::ProjectTotals,
        output: &mut FormOutput,
    ) {
        let payload: DataPayload = match payload_from(&parsed.extracted) {
            Ok(payload) => payload,
            Err(_) => return,
        };

        // Participant rows: matched by contractor type, zero-filled when the
        // project has no such partner. Column H feeds the sheet's lookups.
        for (participant, row) in MAIN_ROWS {
            let matched = payload
                .contractors
                .iter()
                .find(|c| c.type_of_contractor == participant);
            match matched {
                Some(contractor) => {
                    output.number(format!("C{}", row), contractor.eligible_costs);
                    output.number(format!("D{}", row), contractor.capped_funding());
                    output.text(format!("H{}", row), contractor.type_of_contractor.clone());
                }
                None => {
                    output.number(format!("C{}", row), 0.0);
                    output.number(format!("D{}", row), 0.0);
                    output.text(format!("H{}", row), participant);
                }
            }
        }

        // Lookup table: every contractor with its legal entity.
        for (index, contractor) in payload.contractors.iter().take(LOOKUP_CAP).enumerate() {
            let row = LOOKUP_START_ROW + index as u32;
            output.text(format!("B{}", row), contractor.type_of_contractor.clone());
            output.number(format!("C{}", row), contractor.eligible_costs);
            output.number(format!("D{}", row), contractor.capped_funding());
            output.text(format!("H{}", row), contractor.type_of_contractor.clone());
            output.text(format!("I{}", row), contractor.legal_entity.clone());
        }
    }
}
