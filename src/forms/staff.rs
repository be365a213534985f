//! R&D staff wage form (annex 1A): one block of up to 20 staff rows per
//! participating organization, cost = planned hours x hourly rate.

use log::info;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{lenient, payload_from, prompt_with_schema};
use crate::aggregate::category_subtotal;
use crate::error::Result;
use crate::pipeline::{FormSpec, ParsedForm};
use crate::prompts;
use crate::schema::{
    Category, FormRates, FormulaStep, LineItem, SubtotalPolicy, HOURS_TIMES_RATE_CHAIN,
};
use crate::workbook::FormOutput;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct StaffMember {
    #[schemars(description = "Name and surname if known, otherwise empty.")]
    #[serde(default)]
    pub name_surname: String,
    #[schemars(description = "Role in the project.")]
    #[serde(default)]
    pub position: String,
    #[schemars(description = "Hours planned over the whole project.")]
    #[serde(default, deserialize_with = "lenient::u32_or_zero")]
    pub total_hours: u32,
    #[schemars(description = "Wage rate in euros per hour.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub hourly_rate: f64,
    #[schemars(description = "Justification for the planned cost.")]
    #[serde(default)]
    pub cost_justification: String,
}

impl StaffMember {
    fn to_line_item(&self) -> LineItem {
        LineItem {
            label: if self.name_surname.is_empty() {
                self.position.clone()
            } else {
                self.name_surname.clone()
            },
            base_amount: self.hourly_rate,
            duration: f64::from(self.total_hours),
            ..LineItem::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct StaffPayload {
    #[schemars(description = "Applicant organization staff (max 20).")]
    #[serde(default)]
    pub applicant_staff: Vec<StaffMember>,
    #[schemars(description = "Partner No 1 staff (max 20), empty if no such partner.")]
    #[serde(default)]
    pub partner1_staff: Vec<StaffMember>,
    #[schemars(description = "Partner No 2 staff (max 20), empty if no such partner.")]
    #[serde(default)]
    pub partner2_staff: Vec<StaffMember>,
    #[schemars(description = "Partner No 3 staff (max 20), empty if no such partner.")]
    #[serde(default)]
    pub partner3_staff: Vec<StaffMember>,
}

const ORGANIZATION_CAP: usize = 20;

/// Each organization owns a 20-row block; columns are shared.
const ORGANIZATIONS: [(&str, u32); 4] = [
    ("Applicant", 7),
    ("Partner No 1", 27),
    ("Partner No 2", 47),
    ("Partner No 3", 67),
];

const REQUIRED_KEYS: &[&str] = &[
    "applicant_staff",
    "partner1_staff",
    "partner2_staff",
    "partner3_staff",
];

#[derive(Debug, Default)]
pub struct StaffForm;

impl StaffForm {
    pub fn new() -> Self {
        Self
    }
}

impl FormSpec for StaffForm {
    fn name(&self) -> &str {
        "staff-wages"
    }

    fn sheet_name(&self) -> &str {
        "Staff"
    }

    fn system_prompt(&self) -> &str {
        prompts::SYSTEM_PROMPT
    }

    fn user_prompt(&self) -> String {
        prompt_with_schema::<StaffPayload>(prompts::STAFF_PROMPT)
    }

    fn required_keys(&self) -> &[&str] {
        REQUIRED_KEYS
    }

    fn rates(&self, _extracted: &Value) -> FormRates {
        FormRates::non_budgetary()
    }

    fn chain(&self) -> &[FormulaStep] {
        HOURS_TIMES_RATE_CHAIN
    }

    fn parse(&self, extracted: &Value) -> Result<ParsedForm> {
        let payload: StaffPayload = payload_from(extracted)?;
        let groups = [
            payload.applicant_staff,
            payload.partner1_staff,
            payload.partner2_staff,
            payload.partner3_staff,
        ];

        let categories = ORGANIZATIONS
            .iter()
            .zip(groups)
            .map(|((name, _), members)| {
                Category::with_items(
                    *name,
                    ORGANIZATION_CAP,
                    SubtotalPolicy::Sum,
                    members.iter().map(StaffMember::to_line_item).collect(),
                )
            })
            .collect();

        Ok(ParsedForm {
            categories,
            extracted: extracted.clone(),
        })
    }

    fn place(
        &self,
        parsed: &ParsedForm,
        _totals: &crate::schema::ProjectTotals,
        output: &mut FormOutput,
    ) {
        let payload: StaffPayload = match payload_from(&parsed.extracted) {
            Ok(payload) => payload,
            Err(_) => return,
        };
        let groups = [
            &payload.applicant_staff,
            &payload.partner1_staff,
            &payload.partner2_staff,
            &payload.partner3_staff,
        ];

        for (((name, start_row), members), category) in
            ORGANIZATIONS.iter().zip(groups).zip(&parsed.categories)
        {
            for (index, (member, item)) in
                members.iter().zip(&category.items).enumerate()
            {
                let row = start_row + index as u32;
                output.text(format!("C{}", row), member.name_surname.clone());
                output.text(format!("D{}", row), member.position.clone());
                output.number(format!("E{}", row), item.duration);
                output.number(format!("F{}", row), item.base_amount);
                output.text(format!("G{}", row), member.cost_justification.clone());
            }
            if !category.is_empty() {
                info!(
                    "[staff-wages] {}: {} staff, {:.2} EUR",
                    name,
                    category.len(),
                    category_subtotal(category)
                );
            }
        }
    }
}
