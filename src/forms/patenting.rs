//! Patenting expenditure form (annex 1B): four quote tables across two
//! patenting phases, summed into a fixed-amount block.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{lenient, payload_from, prompt_with_schema};
use crate::aggregate::category_subtotal;
use crate::error::Result;
use crate::pipeline::{FormSpec, ParsedForm};
use crate::prompts;
use crate::schema::{Category, FormRates, FormulaStep, LineItem, SubtotalPolicy, QUOTE_CHAIN};
use crate::workbook::FormOutput;

/// One supplier quote row shared by the patenting and commercialization
/// forms.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct QuoteEntry {
    #[schemars(description = "What the quoted money is for.")]
    #[serde(default)]
    pub expenditure_type: String,
    #[schemars(description = "Supplier or authority name and identifying details.")]
    #[serde(default)]
    pub supplier_info: String,
    #[schemars(description = "Quoted price in euros.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub price_eur: f64,
}

impl QuoteEntry {
    pub(crate) fn into_line_item(self) -> LineItem {
        LineItem {
            label: if self.expenditure_type.is_empty() {
                self.supplier_info.clone()
            } else {
                self.expenditure_type.clone()
            },
            base_amount: self.price_eur,
            annual_leave_days: 0,
            ..LineItem::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct PatentingPayload {
    #[schemars(description = "Application-phase patent attorney service quotes (max 3).")]
    #[serde(default)]
    pub phase1_attorney_services: Vec<QuoteEntry>,
    #[schemars(description = "Application-phase official fees and taxes (max 3).")]
    #[serde(default)]
    pub phase1_taxes: Vec<QuoteEntry>,
    #[schemars(description = "Examination/grant-phase attorney service quotes (max 3).")]
    #[serde(default)]
    pub phase2_attorney_services: Vec<QuoteEntry>,
    #[schemars(description = "Examination/grant-phase official fees and taxes (max 4).")]
    #[serde(default)]
    pub phase2_taxes: Vec<QuoteEntry>,
}

/// Table layout: data rows plus the subtotal cell beneath them. Supplier
/// text goes in B (merged B:C on the sheet), prices in D.
struct QuoteTable {
    rows: &'static [u32],
    subtotal_cell: &'static str,
}

const TABLES: [QuoteTable; 4] = [
    QuoteTable {
        rows: &[7, 8, 9],
        subtotal_cell: "D10",
    },
    QuoteTable {
        rows: &[13, 14, 15],
        subtotal_cell: "D16",
    },
    QuoteTable {
        rows: &[22, 23, 24],
        subtotal_cell: "D25",
    },
    QuoteTable {
        rows: &[28, 29, 30, 31],
        subtotal_cell: "D32",
    },
];

const REQUIRED_KEYS: &[&str] = &[
    "phase1_attorney_services",
    "phase1_taxes",
    "phase2_attorney_services",
    "phase2_taxes",
];

#[derive(Debug, Default)]
pub struct PatentingForm;

impl PatentingForm {
    pub fn new() -> Self {
        Self
    }
}

impl FormSpec for PatentingForm {
    fn name(&self) -> &str {
        "patenting"
    }

    fn sheet_name(&self) -> &str {
        "Patenting"
    }

    fn system_prompt(&self) -> &str {
        prompts::SYSTEM_PROMPT
    }

    fn user_prompt(&self) -> String {
        prompt_with_schema::<PatentingPayload>(prompts::PATENTING_PROMPT)
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
        let payload: PatentingPayload = payload_from(extracted)?;
        let category = |name: &str, cap: usize, entries: Vec<QuoteEntry>| {
            Category::with_items(
                name,
                cap,
                SubtotalPolicy::Sum,
                entries.into_iter().map(QuoteEntry::into_line_item).collect(),
            )
        };

        Ok(ParsedForm {
            categories: vec![
                category("Phase I attorney services", 3, payload.phase1_attorney_services),
                category("Phase I taxes", 3, payload.phase1_taxes),
                category("Phase II attorney services", 3, payload.phase2_attorney_services),
                category("Phase II taxes", 4, payload.phase2_taxes),
            ],
            extracted: extracted.clone(),
        })
    }

    fn place(
        &self,
        parsed: &ParsedForm,
        totals: &crate::schema::ProjectTotals,
        output: &mut FormOutput,
    ) {
        let mut subtotals = [0.0; 4];
        for ((table, category), slot) in TABLES
            .iter()
            .zip(&parsed.categories)
            .zip(subtotals.iter_mut())
        {
            for (row, item) in table.rows.iter().zip(&category.items) {
                output.text(format!("B{}", row), item.label.clone());
                output.number(format!("D{}", row), item.grand_total);
            }
            *slot = category_subtotal(category);
            output.number(table.subtotal_cell, *slot);
        }

        // Fixed amounts per phase, then the eligible-cost block.
        output.number("D17", subtotals[0] + subtotals[1]);
        output.number("D34", subtotals[2] + subtotals[3]);
        output.number("D36", totals.direct_costs);
        output.number("D37", totals.indirect_costs);
        output.number("D38", totals.total_costs);
        output.number("D39", totals.funding_requested);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::reconcile::Reconciler;
    use serde_json::json;

    fn sample_payload() -> Value {
        json!({
            "phase1_attorney_services": [
                {"expenditure_type": "EPO filing", "supplier_info": "Patent Bureau A", "price_eur": 3200.0},
                {"expenditure_type": "EPO filing", "supplier_info": "Patent Bureau B", "price_eur": 3500.0}
            ],
            "phase1_taxes": [
                {"expenditure_type": "Filing fee", "supplier_info": "EPO", "price_eur": 130.0}
            ],
            "phase2_attorney_services": [],
            "phase2_taxes": [
                {"expenditure_type": "Examination fee", "supplier_info": "EPO", "price_eur": 1840.0},
                {"expenditure_type": "Grant fee", "supplier_info": "EPO", "price_eur": 1040.0}
            ]
        })
    }

    #[test]
    fn test_parse_builds_four_categories() {
        let form = PatentingForm::new();
        let parsed = form.parse(&sample_payload()).unwrap();
        assert_eq!(parsed.categories.len(), 4);
        assert_eq!(parsed.categories[0].len(), 2);
        assert_eq!(parsed.categories[0].cap, 3);
        assert_eq!(parsed.categories[3].cap, 4);
        assert!(parsed.categories[2].is_empty());
    }

    #[test]
    fn test_place_writes_subtotal_and_total_block() {
        let form = PatentingForm::new();
        let mut parsed = form.parse(&sample_payload()).unwrap();
        let rates = form.rates(&parsed.extracted);
        let reconciler = Reconciler::new(form.chain(), rates);
        reconciler.reconcile_categories(&mut parsed.categories);
        let totals = aggregate(&parsed.categories, &rates);

        let mut output = FormOutput::new(form.sheet_name());
        form.place(&parsed, &totals, &mut output);

        let cell = |coord: &str| {
            output
                .writes()
                .iter()
                .find(|(c, _)| c == coord)
                .map(|(_, content)| content.clone())
        };

        use crate::workbook::CellContent;
        assert_eq!(cell("D7"), Some(CellContent::Number(3200.0)));
        assert_eq!(cell("D10"), Some(CellContent::Number(6700.0)));
        assert_eq!(cell("D16"), Some(CellContent::Number(130.0)));
        assert_eq!(cell("D17"), Some(CellContent::Number(6830.0)));
        assert_eq!(cell("D32"), Some(CellContent::Number(2880.0)));
        assert_eq!(cell("D34"), Some(CellContent::Number(2880.0)));
        assert_eq!(cell("D36"), Some(CellContent::Number(9710.0)));
        let direct = 9710.0;
        assert_eq!(cell("D37"), Some(CellContent::Number(direct * 0.07)));
        assert_eq!(cell("D38"), Some(CellContent::Number(direct * 1.07)));
        assert_eq!(cell("D39"), Some(CellContent::Number(direct * 1.07 * 0.85)));
    }
}
