//! R&D cost summary form (annex 1A): impact rows, the eight expenditure
//! categories, the indirect-rate block and the partner breakdown. This is
//! the one form where the overhead rate may legitimately be zero.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{lenient, payload_from, prompt_with_schema};
use crate::error::Result;
use crate::extract::num_field;
use crate::pipeline::{FormSpec, ParsedForm};
use crate::prompts;
use crate::rates::INDIRECT_COST_RATE;
use crate::schema::{Category, FormRates, FormulaStep, LineItem, SubtotalPolicy, QUOTE_CHAIN};
use crate::workbook::FormOutput;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct ImpactEntry {
    #[schemars(description = "Row number of the impact (1-based).")]
    #[serde(default, deserialize_with = "lenient::u32_or_zero")]
    pub serial_no: u32,
    #[schemars(description = "Name of the R&D activity or impact.")]
    #[serde(default)]
    pub impact_name: String,
    #[schemars(description = "Direct eligible costs, EUR.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub direct_costs: f64,
    #[schemars(description = "Indirect costs, EUR.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub indirect_costs: f64,
    #[schemars(description = "Total costs, EUR.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub total_costs: f64,
    #[schemars(description = "Funding requested, EUR.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub funding_requested: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct ExpenditureCategory {
    #[schemars(description = "Category number 1-8, in the form's fixed order.")]
    #[serde(default, deserialize_with = "lenient::u32_or_zero")]
    pub category_id: u32,
    #[schemars(description = "Direct eligible costs for the category, EUR.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub direct_costs: f64,
    #[schemars(description = "Funding requested for the category, EUR.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub funding_requested: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct PartnerShare {
    #[schemars(description = "Applicant or partner organization name.")]
    #[serde(default)]
    pub organization_name: String,
    #[schemars(description = "Eligible costs attributed to the organization, EUR.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub eligible_costs: f64,
    #[schemars(description = "Funding requested by the organization, EUR.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub funding_requested: f64,
    #[schemars(description = "Organization's share of the budget, percent.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct SummaryPayload {
    #[schemars(description = "One row per R&D impact (max 10).")]
    #[serde(default)]
    pub impact_entries: Vec<ImpactEntry>,
    #[schemars(description = "The form's eight expenditure categories in order.")]
    #[serde(default)]
    pub expenditure_categories: Vec<ExpenditureCategory>,
    #[schemars(description = "Per-organization cost breakdown (max 4).")]
    #[serde(default)]
    pub partner_breakdown: Vec<PartnerShare>,
    #[schemars(description = "Applied overhead rate: 0.07, or 0.0 when no indirect costs are claimed.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub indirect_cost_rate: f64,
    #[schemars(description = "Combined R&D services and contractual research amount (lines 4 and 5), EUR.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub lines_4_5_amount: f64,
    #[schemars(description = "Lines 4 and 5 as a percentage of direct costs.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub lines_4_5_percentage: f64,
    #[schemars(description = "Building and premises rental amount (heading 8), EUR.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub heading_8_amount: f64,
    #[schemars(description = "Heading 8 as a percentage of direct costs.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub heading_8_percentage: f64,
}

const IMPACT_CAP: usize = 10;
const IMPACT_START_ROW: u32 = 5;
const IMPACT_TOTAL_ROW: u32 = 15;
const CATEGORY_CAP: usize = 8;
const CATEGORY_START_ROW: u32 = 19;
const CATEGORY_TOTAL_ROW: u32 = 27;
const PARTNER_CAP: usize = 4;
const PARTNER_ROWS: [u32; 4] = [41, 43, 45, 47];

const REQUIRED_KEYS: &[&str] = &[
    "impact_entries",
    "expenditure_categories",
    "partner_breakdown",
];

#[derive(Debug, Default)]
pub struct SummaryForm;

impl SummaryForm {
    pub fn new() -> Self {
        Self
    }
}

impl FormSpec for SummaryForm {
    fn name(&self) -> &str {
        "rd-summary"
    }

    fn sheet_name(&self) -> &str {
        "Summary"
    }

    fn system_prompt(&self) -> &str {
        prompts::SYSTEM_PROMPT
    }

    fn user_prompt(&self) -> String {
        prompt_with_schema::<SummaryPayload>(prompts::SUMMARY_PROMPT)
    }

    fn required_keys(&self) -> &[&str] {
        REQUIRED_KEYS
    }

    /// The summary declares its own overhead rate; absent means the
    /// standard 7%, an explicit 0.0 means the project claims no indirect
    /// costs.
    fn rates(&self, extracted: &Value) -> FormRates {
        let rate = match extracted.get("indirect_cost_rate") {
            Some(value) if !value.is_null() => num_field(extracted, "indirect_cost_rate", 0.0),
            _ => INDIRECT_COST_RATE,
        };
        FormRates::non_budgetary().with_indirect_rate(rate)
    }

    fn chain(&self) -> &[FormulaStep] {
        QUOTE_CHAIN
    }

    fn parse(&self, extracted: &Value) -> Result<ParsedForm> {
        let payload: SummaryPayload = payload_from(extracted)?;
        let items = payload
            .impact_entries
            .iter()
            .map(|entry| LineItem {
                label: entry.impact_name.clone(),
                base_amount: entry.direct_costs,
                ..LineItem::default()
            })
            .collect();

        Ok(ParsedForm {
            categories: vec![Category::with_items(
                "R&D impacts",
                IMPACT_CAP,
                SubtotalPolicy::Sum,
                items,
            )],
            extracted: extracted.clone(),
        })
    }

    fn place(
        &self,
        parsed: &ParsedForm,
        totals: &crate::schema::ProjectTotals,
        output: &mut FormOutput,
    ) {
        let payload: SummaryPayload = match payload_from(&parsed.extracted) {
            Ok(payload) => payload,
            Err(_) => return,
        };
        let rates = self.rates(&parsed.extracted);

        // Table 1: impacts, one row each, then the totals row.
        let mut total_indirect = 0.0;
        let mut total_combined = 0.0;
        let mut total_funding = 0.0;
        for (index, entry) in payload.impact_entries.iter().take(IMPACT_CAP).enumerate() {
            let row = IMPACT_START_ROW + index as u32;
            let serial = if entry.serial_no > 0 {
                entry.serial_no
            } else {
                index as u32 + 1
            };
            output.number(format!("A{}", row), f64::from(serial));
            output.text(format!("B{}", row), entry.impact_name.clone());
            output.number(format!("C{}", row), entry.direct_costs);
            output.number(format!("D{}", row), entry.indirect_costs);
            output.number(format!("E{}", row), entry.total_costs);
            output.number(format!("F{}", row), entry.funding_requested);
            total_indirect += entry.indirect_costs;
            total_combined += entry.total_costs;
            total_funding += entry.funding_requested;
        }
        output.number(format!("C{}", IMPACT_TOTAL_ROW), totals.direct_costs);
        output.number(format!("D{}", IMPACT_TOTAL_ROW), total_indirect);
        output.number(format!("E{}", IMPACT_TOTAL_ROW), total_combined);
        output.number(format!("F{}", IMPACT_TOTAL_ROW), total_funding);

        // Table 2: the eight expenditure categories and the rate block.
        let mut category_direct = 0.0;
        let mut category_funding = 0.0;
        for (index, category) in payload
            .expenditure_categories
            .iter()
            .take(CATEGORY_CAP)
            .enumerate()
        {
            let row = CATEGORY_START_ROW + index as u32;
            output.number(format!("C{}", row), category.direct_costs);
            output.number(format!("D{}", row), category.funding_requested);
            category_direct += category.direct_costs;
            category_funding += category.funding_requested;
        }
        output.number(format!("C{}", CATEGORY_TOTAL_ROW), category_direct);
        output.number(format!("D{}", CATEGORY_TOTAL_ROW), category_funding);

        output.text("B29", format!("{:.1}%", rates.indirect_rate * 100.0));
        output.number("C31", totals.indirect_costs);
        output.number("D31", totals.indirect_costs * rates.funding_rate);
        output.number("C33", totals.total_costs);
        output.number("D33", totals.funding_requested);

        // Statistics block: R&D services + contractual research (lines 4-5)
        // and premises rental (heading 8), amount plus share of direct costs.
        output.number("C36", payload.lines_4_5_amount);
        output.text("D36", format!("{:.1}%", payload.lines_4_5_percentage));
        output.number("C37", payload.heading_8_amount);
        output.text("D37", format!("{:.1}%", payload.heading_8_percentage));

        // Table 3: partner breakdown, eligible/funding row then percentage
        // row per organization.
        let mut eligible_sum = 0.0;
        let mut funding_sum = 0.0;
        let mut percentage_sum = 0.0;
        for (row, partner) in PARTNER_ROWS
            .iter()
            .zip(payload.partner_breakdown.iter().take(PARTNER_CAP))
        {
            output.text(format!("B{}", row), partner.organization_name.clone());
            output.number(format!("C{}", row), partner.eligible_costs);
            output.number(format!("D{}", row), partner.funding_requested);
            output.text(format!("C{}", row + 1), format!("{:.1}%", partner.percentage));
            eligible_sum += partner.eligible_costs;
            funding_sum += partner.funding_requested;
            percentage_sum += partner.percentage;
        }
        output.text("C49", format!("{:.1}%", percentage_sum));
        output.number("C50", eligible_sum);
        output.number("D50", funding_sum);
    }
}
