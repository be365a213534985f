//! Generic descriptor for the ten additional expenditure tabs of annex 1A.
//! The tabs share one layout (project info block, staff costs, missions,
//! equipment depreciation, R&D services, materials, rentals), so a single
//! data-driven form covers all of them. Payloads stay as raw JSON here;
//! the section tables are too heterogeneous for one typed struct.

use serde_json::Value;

use crate::error::Result;
use crate::extract::{num_field, str_field};
use crate::pipeline::{FormSpec, ParsedForm};
use crate::prompts;
use crate::schema::{Category, FormRates, FormulaStep, LineItem, SubtotalPolicy, QUOTE_CHAIN};
use crate::workbook::FormOutput;

/// Project info fields and their fixed cells.
const PROJECT_INFO_CELLS: &[(&str, &str)] = &[
    ("type_of_rd", "D1"),
    ("project_impact_no", "D2"),
    ("impact_name", "D3"),
    ("legal_entity_name", "D4"),
    ("applicant_partner", "D5"),
    ("funding_intensity", "H5"),
];

/// One capped expenditure table: JSON key, first data row, row cap, and
/// the field-to-column map for each entry.
struct SectionLayout {
    key: &'static str,
    label: &'static str,
    start_row: u32,
    cap: usize,
    columns: &'static [(&'static str, &'static str)],
    /// Field feeding the section's cost line items.
    amount_field: &'static str,
}

const LIST_COLUMNS: &[(&str, &str)] = &[
    ("service_name", "B"),
    ("units", "D"),
    ("quantity", "E"),
    ("unit_price", "F"),
    ("eligible_costs", "G"),
    ("funding_requested", "H"),
    ("supporting_docs", "I"),
];

const SECTIONS: &[SectionLayout] = &[
    SectionLayout {
        key: "staff_costs",
        label: "Staff costs",
        start_row: 10,
        cap: 20,
        columns: &[
            ("position", "B"),
            ("monthly_salary", "C"),
            ("employer_costs", "D"),
            ("duration_months", "E"),
            ("hourly_rate", "F"),
            ("eligible_costs", "G"),
            ("funding_requested", "H"),
            ("supporting_docs", "I"),
        ],
        amount_field: "eligible_costs",
    },
    SectionLayout {
        key: "equipment_depreciation",
        label: "Equipment depreciation",
        start_row: 102,
        cap: 20,
        columns: &[
            ("equipment_name", "B"),
            ("acquisition_date", "K"),
            ("acquisition_value", "L"),
            ("depreciation_period_months", "M"),
            ("residual_value", "N"),
            ("monthly_depreciation", "O"),
            ("project_usage_months", "P"),
            ("usage_percentage", "Q"),
            ("project_depreciation_amount", "R"),
        ],
        amount_field: "project_depreciation_amount",
    },
    SectionLayout {
        key: "rd_services",
        label: "R&D services",
        start_row: 123,
        cap: 10,
        columns: LIST_COLUMNS,
        amount_field: "eligible_costs",
    },
    SectionLayout {
        key: "materials_supplies",
        label: "Materials and supplies",
        start_row: 145,
        cap: 25,
        columns: &[
            ("item_name", "B"),
            ("units", "D"),
            ("quantity", "E"),
            ("unit_price", "F"),
            ("eligible_costs", "G"),
            ("funding_requested", "H"),
            ("supporting_docs", "I"),
        ],
        amount_field: "eligible_costs",
    },
    SectionLayout {
        key: "equipment_rental",
        label: "Equipment rental",
        start_row: 171,
        cap: 10,
        columns: &[
            ("equipment_name", "B"),
            ("units", "D"),
            ("quantity", "E"),
            ("unit_price", "F"),
            ("eligible_costs", "G"),
            ("funding_requested", "H"),
            ("monthly_rental_cost", "K"),
            ("usage_duration_months", "L"),
        ],
        amount_field: "eligible_costs",
    },
    SectionLayout {
        key: "premises_rental",
        label: "Premises rental",
        start_row: 182,
        cap: 5,
        columns: &[
            ("premises_address", "B"),
            ("units", "D"),
            ("quantity", "E"),
            ("unit_price", "F"),
            ("eligible_costs", "G"),
            ("funding_requested", "H"),
            ("monthly_rental_cost", "K"),
            ("usage_duration_months", "L"),
        ],
        amount_field: "eligible_costs",
    },
];

/// Missions nest under `mission_expenses`: section totals plus one
/// seven-row block per mission.
const MISSION_CAP: usize = 10;
const MISSION_START_ROW: u32 = 31;
const MISSION_BLOCK_HEIGHT: u32 = 7;

const REQUIRED_KEYS: &[&str] = &["project_info"];

/// One of the ten numbered expenditure tabs.
pub struct ExpenditureTab {
    name: String,
    sheet: String,
}

impl ExpenditureTab {
    /// Descriptor for tab `number` (1 through 10).
    pub fn tab(number: u8) -> Self {
        Self {
            name: format!("tab{}", number),
            sheet: format!("Tab {}", number),
        }
    }

    /// All ten tab descriptors in order.
    pub fn all() -> Vec<Self> {
        (1..=10).map(Self::tab).collect()
    }

    fn entries<'a>(extracted: &'a Value, key: &str) -> &'a [Value] {
        extracted
            .get(key)
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }

    /// Writes a payload value the way the sheet expects it: numbers as
    /// numbers, everything else as text.
    fn write_value(output: &mut FormOutput, coordinate: String, value: &Value) {
        match value {
            Value::Number(n) => {
                if let Some(number) = n.as_f64() {
                    output.number(coordinate, number);
                }
            }
            Value::String(s) if !s.is_empty() => output.text(coordinate, s.clone()),
            _ => {}
        }
    }

    fn place_missions(extracted: &Value, output: &mut FormOutput) {
        let missions = match extracted.get("mission_expenses") {
            Some(expenses) => {
                if let Some(total) = expenses.get("total_eligible_costs") {
                    Self::write_value(output, "G30".to_string(), total);
                }
                if let Some(total) = expenses.get("total_funding_requested") {
                    Self::write_value(output, "H30".to_string(), total);
                }
                Self::entries(expenses, "missions")
            }
            None => &[],
        };

        for (index, mission) in missions.iter().take(MISSION_CAP).enumerate() {
            let base_row = MISSION_START_ROW + index as u32 * MISSION_BLOCK_HEIGHT;
            output.text(format!("B{}", base_row), str_field(mission, "mission_name"));
            output.text(
                format!("J{}", base_row),
                str_field(mission, "destination_country"),
            );
            output.number(
                format!("J{}", base_row + 1),
                num_field(mission, "duration_days", 0.0),
            );
            output.number(
                format!("J{}", base_row + 2),
                num_field(mission, "travelers_count", 0.0),
            );
        }
    }
}

impl FormSpec for ExpenditureTab {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_name(&self) -> &str {
        &self.sheet
    }

    fn system_prompt(&self) -> &str {
        prompts::SYSTEM_PROMPT
    }

    fn user_prompt(&self) -> String {
        let mut prompt = String::from(
            "Extract the expenditure breakdown for this project cost tab.\n\n\
             Provide `project_info` with: type_of_rd, project_impact_no, impact_name, \
             legal_entity_name, applicant_partner, funding_intensity.\n\
             Provide `mission_expenses` with total_eligible_costs, total_funding_requested \
             and a `missions` array (mission_name, destination_country, duration_days, \
             travelers_count; max 10).\n\nProvide these expenditure arrays:\n",
        );
        for section in SECTIONS {
            let fields: Vec<&str> = section.columns.iter().map(|(field, _)| *field).collect();
            prompt.push_str(&format!(
                "- `{}` (max {}): {}\n",
                section.key,
                section.cap,
                fields.join(", ")
            ));
        }
        prompt.push_str(
            "\nAmounts are euros as plain numbers. Leave arrays empty when the text has \
             nothing for them. Respond with ONLY a JSON object holding these keys.",
        );
        prompt
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
        let categories = SECTIONS
            .iter()
            .map(|section| {
                let items = Self::entries(extracted, section.key)
                    .iter()
                    .map(|entry| LineItem {
                        label: section
                            .columns
                            .first()
                            .map(|(field, _)| str_field(entry, field))
                            .unwrap_or_default(),
                        base_amount: num_field(entry, section.amount_field, 0.0),
                        ..LineItem::default()
                    })
                    .collect();
                Category::with_items(section.label, section.cap, SubtotalPolicy::Sum, items)
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
        if let Some(info) = parsed.extracted.get("project_info") {
            for (field, cell) in PROJECT_INFO_CELLS {
                if let Some(value) = info.get(field) {
                    Self::write_value(output, (*cell).to_string(), value);
                }
            }
        }

        Self::place_missions(&parsed.extracted, output);

        for section in SECTIONS {
            let entries = Self::entries(&parsed.extracted, section.key);
            for (index, entry) in entries.iter().take(section.cap).enumerate() {
                let row = section.start_row + index as u32;
                for (field, column) in section.columns {
                    if let Some(value) = entry.get(field) {
                        Self::write_value(output, format!("{}{}", column, row), value);
                    }
                }
            }
        }
    }
}
