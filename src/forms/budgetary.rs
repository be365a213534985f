//! Planned-remuneration forms: the certificate for budgetary authorizations
//! and the non-budgetary wage form. Both run the full remuneration chain;
//! they differ in row layout, position cap and which classification picks
//! the employer contribution rate.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{lenient, payload_from, prompt_with_schema};
use crate::cells::sum_formula;
use crate::error::Result;
use crate::extract::str_field;
use crate::pipeline::{FormSpec, ParsedForm};
use crate::prompts;
use crate::schema::{
    Category, FormRates, FormulaStep, LineItem, SubtotalPolicy, REMUNERATION_CHAIN,
};
use crate::workbook::FormOutput;

fn default_week() -> u32 {
    5
}

fn default_leave_days() -> u32 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct ProjectInfo {
    #[schemars(description = "Project or joint project code.")]
    #[serde(default)]
    pub project_code: String,
    #[schemars(description = "Name of the applicant, joint applicant or project partner.")]
    #[serde(default)]
    pub organization_name: String,
    #[schemars(description = "Project duration in months.")]
    #[serde(default, deserialize_with = "lenient::u32_or_zero")]
    pub project_duration_months: u32,
    #[schemars(description = "Type of organization (university, institute, SME...).")]
    #[serde(default)]
    pub organization_type: String,
    #[schemars(description = "'budgetary' for public budgetary institutions, 'business' otherwise.")]
    #[serde(default)]
    pub budgetary_classification: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct JobPosition {
    #[schemars(description = "Post title.")]
    #[serde(default)]
    pub position_function: String,
    #[schemars(description = "Duties within the project.")]
    #[serde(default)]
    pub duties: String,
    #[schemars(description = "Employee name if already known, otherwise empty.")]
    #[serde(default)]
    pub employee_name: String,
    #[schemars(description = "Project impact number the position belongs to (e.g. 1.2).")]
    #[serde(default)]
    pub project_impact_no: String,
    #[schemars(description = "Action/expenditure type number (e.g. 1.2.1).")]
    #[serde(default)]
    pub action_expenditure_type: String,
    #[schemars(description = "Employment contract kind: 'time-limited' or 'indefinite'.")]
    #[serde(default)]
    pub employment_contract: String,
    #[schemars(description = "Planned recruitment year, empty when the salary year applies.")]
    #[serde(default)]
    pub recruitment_year: String,
    #[schemars(description = "Year the remuneration applies to.")]
    #[serde(default)]
    pub remuneration_year: String,
    #[schemars(description = "Number of posts planned for this position.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub planned_posts: f64,
    #[schemars(description = "Months of employment planned.")]
    #[serde(default, deserialize_with = "lenient::u32_or_zero")]
    pub months_planned: u32,
    #[schemars(description = "Monthly base salary rate, EUR.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub planned_salary_rate: f64,
    #[schemars(description = "Flat monthly allowances and bonuses, EUR.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub allowances: f64,
    #[schemars(description = "Planned increase as a decimal (0.05 for 5%), 0 if none.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub increase_percentage: f64,
    #[schemars(description = "Amount of that increase, EUR.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub increase_amount: f64,
    #[schemars(description = "Working week length in DAYS (5 or 6).")]
    #[serde(default = "default_week", deserialize_with = "lenient::u32_or_zero")]
    pub working_week_length: u32,
    #[schemars(description = "Annual leave entitlement in days.")]
    #[serde(default = "default_leave_days", deserialize_with = "lenient::u32_or_zero")]
    pub annual_leave_days: u32,
    #[schemars(description = "Annual leave allowance rate if stated, else 0.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub annual_leave_rate: f64,
    #[schemars(description = "Why the position and rate are justified.")]
    #[serde(default)]
    pub justification: String,
}

impl JobPosition {
    fn to_line_item(&self) -> LineItem {
        LineItem {
            label: self.position_function.clone(),
            base_amount: self.planned_salary_rate,
            allowances: self.allowances,
            increase_percentage: if self.increase_percentage != 0.0 {
                Some(self.increase_percentage)
            } else {
                None
            },
            increase_amount: self.increase_amount,
            quantity: if self.planned_posts > 0.0 {
                self.planned_posts
            } else {
                1.0
            },
            duration: f64::from(self.months_planned.max(1)),
            working_week_length: self.working_week_length,
            annual_leave_days: self.annual_leave_days,
            annual_leave_rate: self.annual_leave_rate,
            ..LineItem::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct BudgetaryPayload {
    pub project_info: ProjectInfo,
    #[schemars(description = "One entry per planned position.")]
    #[serde(default)]
    pub job_positions: Vec<JobPosition>,
}

const REQUIRED_KEYS: &[&str] = &["project_info", "job_positions"];

const DATA_START_ROW: u32 = 15;

/// Which of the two remuneration layouts the form targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetaryVariant {
    /// Certificate for budgetary authorizations: 14 position rows, sums in
    /// row 29, posts and salary years broken out per position.
    Certificate,
    /// Non-budgetary wage form: 18 position rows, sums in row 33, duties
    /// and employee names broken out per position.
    WageForm,
}

impl BudgetaryVariant {
    fn cap(self) -> usize {
        match self {
            Self::Certificate => 14,
            Self::WageForm => 18,
        }
    }

    fn sum_row(self) -> u32 {
        match self {
            Self::Certificate => 29,
            Self::WageForm => 33,
        }
    }

    fn sum_columns(self) -> &'static [&'static str] {
        match self {
            Self::Certificate => &["J", "K", "L", "M", "N", "O", "P", "Q", "U", "V"],
            Self::WageForm => &["J", "K", "L", "M", "N", "O", "S", "T", "U"],
        }
    }

    /// Column holding the header values next to the B-column labels.
    fn header_column(self) -> &'static str {
        match self {
            Self::Certificate => "H",
            Self::WageForm => "I",
        }
    }
}

pub struct BudgetaryForm {
    variant: BudgetaryVariant,
}

impl BudgetaryForm {
    pub fn certificate() -> Self {
        Self {
            variant: BudgetaryVariant::Certificate,
        }
    }

    pub fn wage_form() -> Self {
        Self {
            variant: BudgetaryVariant::WageForm,
        }
    }

    fn place_header(&self, info: &ProjectInfo, rates: &FormRates, output: &mut FormOutput) {
        let value_col = self.variant.header_column();
        output.text("B4", "Project/Joint project code");
        output.text(format!("{}4", value_col), info.project_code.clone());
        output.text("B5", "Name of the applicant/joint applicant/project partner");
        output.text(format!("{}5", value_col), info.organization_name.clone());
        output.text("B6", "Project duration, months");
        output.number(format!("{}6", value_col), f64::from(info.project_duration_months));

        output.text("B9", "Type of organization");
        output.text("H9", info.organization_type.clone());
        output.text(
            "I9",
            if is_budgetary(&info.budgetary_classification) {
                "Budgetary"
            } else {
                "Non-budgetary"
            },
        );
        output.text("J9", format!("{:.3}", rates.contribution_rate));
    }

    fn place_certificate_row(row: u32, position: &JobPosition, item: &LineItem, output: &mut FormOutput) {
        // Recruitment year defaults to the salary year when not stated
        // separately.
        let recruitment_year = if position.recruitment_year.is_empty() {
            position.remuneration_year.clone()
        } else {
            position.recruitment_year.clone()
        };
        output.number(format!("B{}", row), f64::from(row - DATA_START_ROW + 1));
        output.text(format!("C{}", row), position.project_impact_no.clone());
        output.text(format!("D{}", row), position.action_expenditure_type.clone());
        output.text(format!("E{}", row), position.position_function.clone());
        output.number(format!("F{}", row), item.quantity);
        output.text(format!("G{}", row), position.employment_contract.clone());
        output.text(format!("H{}", row), recruitment_year);
        output.text(format!("I{}", row), position.remuneration_year.clone());
        output.number(format!("J{}", row), item.duration);
        output.number(format!("K{}", row), item.base_amount);
        output.number(format!("L{}", row), item.allowances);
        output.number(format!("M{}", row), item.increase_percentage.unwrap_or(0.0));
        output.number(format!("N{}", row), item.increase_amount);
        output.number(format!("O{}", row), item.excl_contribution);
        output.number(format!("P{}", row), item.incl_contribution);
        output.number(format!("Q{}", row), item.period_cost);
        output.number(format!("R{}", row), f64::from(item.working_week_length));
        output.number(format!("S{}", row), f64::from(item.annual_leave_days));
        output.number(format!("T{}", row), item.annual_leave_rate);
        output.number(format!("U{}", row), item.leave_cost);
        output.number(format!("V{}", row), item.grand_total);
        output.text(format!("W{}", row), position.justification.clone());
    }

    fn place_wage_row(row: u32, position: &JobPosition, item: &LineItem, output: &mut FormOutput) {
        output.number(format!("B{}", row), f64::from(row - DATA_START_ROW + 1));
        output.text(format!("E{}", row), position.duties.clone());
        output.text(format!("F{}", row), position.position_function.clone());
        output.text(format!("G{}", row), position.employee_name.clone());
        output.text(format!("I{}", row), position.remuneration_year.clone());
        output.number(format!("J{}", row), item.duration);
        output.number(format!("K{}", row), item.base_amount);
        output.number(format!("L{}", row), item.increase_percentage.unwrap_or(0.0));
        output.number(format!("M{}", row), item.increase_amount);
        output.number(format!("N{}", row), item.excl_contribution);
        output.number(format!("O{}", row), item.incl_contribution);
        output.number(format!("P{}", row), f64::from(item.working_week_length));
        output.number(format!("Q{}", row), f64::from(item.annual_leave_days));
        output.number(format!("R{}", row), item.annual_leave_rate);
        output.number(format!("S{}", row), item.leave_cost);
        output.number(format!("T{}", row), item.period_cost);
        output.number(format!("U{}", row), item.grand_total);
        output.text(format!("V{}", row), position.justification.clone());
    }
}

fn is_budgetary(classification: &str) -> bool {
    classification.trim().eq_ignore_ascii_case("budgetary")
}

impl FormSpec for BudgetaryForm {
    fn name(&self) -> &str {
        match self.variant {
            BudgetaryVariant::Certificate => "budgetary-certificate",
            BudgetaryVariant::WageForm => "wage-form",
        }
    }

    fn sheet_name(&self) -> &str {
        match self.variant {
            BudgetaryVariant::Certificate => "Certificate",
            BudgetaryVariant::WageForm => "Wage form",
        }
    }

    fn system_prompt(&self) -> &str {
        prompts::SYSTEM_PROMPT
    }

    fn user_prompt(&self) -> String {
        prompt_with_schema::<BudgetaryPayload>(prompts::BUDGETARY_PROMPT)
    }

    fn required_keys(&self) -> &[&str] {
        REQUIRED_KEYS
    }

    fn rates(&self, extracted: &Value) -> FormRates {
        let classification = extracted
            .get("project_info")
            .map(|info| str_field(info, "budgetary_classification"))
            .unwrap_or_default();
        if is_budgetary(&classification) {
            FormRates::budgetary()
        } else {
            FormRates::non_budgetary()
        }
    }

    fn chain(&self) -> &[FormulaStep] {
        REMUNERATION_CHAIN
    }

    fn parse(&self, extracted: &Value) -> Result<ParsedForm> {
        let payload: BudgetaryPayload = payload_from(extracted)?;
        let items = payload
            .job_positions
            .iter()
            .map(JobPosition::to_line_item)
            .collect();

        Ok(ParsedForm {
            categories: vec![Category::with_items(
                "Job positions",
                self.variant.cap(),
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
        // Header fields and descriptive columns come from the payload; the
        // numeric columns come from the reconciled items, zipped in input
        // order (both sides were truncated to the same cap).
        let payload: BudgetaryPayload = match payload_from(&parsed.extracted) {
            Ok(payload) => payload,
            Err(_) => return,
        };
        let rates = self.rates(&parsed.extracted);
        self.place_header(&payload.project_info, &rates, output);

        let category = match parsed.categories.first() {
            Some(category) => category,
            None => return,
        };

        for (index, (position, item)) in payload
            .job_positions
            .iter()
            .zip(&category.items)
            .enumerate()
        {
            let row = DATA_START_ROW + index as u32;
            match self.variant {
                BudgetaryVariant::Certificate => {
                    Self::place_certificate_row(row, position, item, output)
                }
                BudgetaryVariant::WageForm => Self::place_wage_row(row, position, item, output),
            }
        }

        let count = category.len() as u32;
        for column in self.variant.sum_columns() {
            output.formula(
                format!("{}{}", column, self.variant.sum_row()),
                sum_formula(column, DATA_START_ROW, count),
            );
        }
    }
}
