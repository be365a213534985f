//! Market development (commercialization) form (annex 1B): five expenditure
//! tables of competitive offers. All offers are listed but each table's
//! subtotal is the cheapest offer only.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::patenting::QuoteEntry;
use super::{payload_from, prompt_with_schema};
use crate::aggregate::category_subtotal;
use crate::error::Result;
use crate::pipeline::{FormSpec, ParsedForm};
use crate::prompts;
use crate::schema::{Category, FormRates, FormulaStep, SubtotalPolicy, QUOTE_CHAIN};
use crate::workbook::FormOutput;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct CommercializationPayload {
    #[schemars(description = "Offers for expenditure type 1 (max 3).")]
    #[serde(default)]
    pub table1_entries: Vec<QuoteEntry>,
    #[schemars(description = "Offers for expenditure type 2 (max 3).")]
    #[serde(default)]
    pub table2_entries: Vec<QuoteEntry>,
    #[schemars(description = "Offers for expenditure type 3 (max 3).")]
    #[serde(default)]
    pub table3_entries: Vec<QuoteEntry>,
    #[schemars(description = "Offers for expenditure type 4 (max 3).")]
    #[serde(default)]
    pub table4_entries: Vec<QuoteEntry>,
    #[schemars(description = "Offers for expenditure type 5 (max 3).")]
    #[serde(default)]
    pub table5_entries: Vec<QuoteEntry>,
}

struct OfferTable {
    rows: [u32; 3],
    subtotal_cell: &'static str,
}

const TABLES: [OfferTable; 5] = [
    OfferTable {
        rows: [7, 8, 9],
        subtotal_cell: "D10",
    },
    OfferTable {
        rows: [13, 14, 15],
        subtotal_cell: "D16",
    },
    OfferTable {
        rows: [19, 20, 21],
        subtotal_cell: "D22",
    },
    OfferTable {
        rows: [25, 26, 27],
        subtotal_cell: "D28",
    },
    OfferTable {
        rows: [31, 32, 33],
        subtotal_cell: "D34",
    },
];

const REQUIRED_KEYS: &[&str] = &[
    "table1_entries",
    "table2_entries",
    "table3_entries",
    "table4_entries",
    "table5_entries",
];

#[derive(Debug, Default)]
pub struct CommercializationForm;

impl CommercializationForm {
    pub fn new() -> Self {
        Self
    }
}

impl FormSpec for CommercializationForm {
    fn name(&self) -> &str {
        "commercialization"
    }

    fn sheet_name(&self) -> &str {
        "Commercialization"
    }

    fn system_prompt(&self) -> &str {
        prompts::SYSTEM_PROMPT
    }

    fn user_prompt(&self) -> String {
        prompt_with_schema::<CommercializationPayload>(prompts::COMMERCIALIZATION_PROMPT)
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
        let payload: CommercializationPayload = payload_from(extracted)?;
        let tables = [
            payload.table1_entries,
            payload.table2_entries,
            payload.table3_entries,
            payload.table4_entries,
            payload.table5_entries,
        ];

        let categories = tables
            .into_iter()
            .enumerate()
            .map(|(index, entries)| {
                Category::with_items(
                    format!("Expenditure type {}", index + 1),
                    3,
                    SubtotalPolicy::LowestQuote,
                    entries.into_iter().map(QuoteEntry::into_line_item).collect(),
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
        totals: &crate::schema::ProjectTotals,
        output: &mut FormOutput,
    ) {
        for (table, category) in TABLES.iter().zip(&parsed.categories) {
            for (row, item) in table.rows.iter().zip(&category.items) {
                output.text(format!("B{}", row), item.label.clone());
                output.number(format!("D{}", row), item.grand_total);
            }
            output.number(table.subtotal_cell, category_subtotal(category));
        }

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
    use crate::workbook::CellContent;
    use serde_json::json;

    fn offers(prices: &[f64]) -> Value {
        json!(prices
            .iter()
            .map(|p| json!({
                "expenditure_type": "Market study",
                "supplier_info": "Vendor",
                "price_eur": p
            }))
            .collect::<Vec<_>>())
    }

    #[test]
    fn test_subtotal_is_lowest_offer() {
        let form = CommercializationForm::new();
        let extracted = json!({
            "table1_entries": offers(&[1000.0, 1200.0, 900.0]),
            "table2_entries": offers(&[450.0]),
            "table3_entries": [],
            "table4_entries": [],
            "table5_entries": []
        });

        let mut parsed = form.parse(&extracted).unwrap();
        let rates = form.rates(&extracted);
        Reconciler::new(form.chain(), rates).reconcile_categories(&mut parsed.categories);
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

        // All three offers are listed; the subtotal keeps only the cheapest.
        assert_eq!(cell("D7"), Some(CellContent::Number(1000.0)));
        assert_eq!(cell("D9"), Some(CellContent::Number(900.0)));
        assert_eq!(cell("D10"), Some(CellContent::Number(900.0)));
        assert_eq!(cell("D16"), Some(CellContent::Number(450.0)));
        assert_eq!(cell("D36"), Some(CellContent::Number(1350.0)));
        assert_eq!(cell("D38"), Some(CellContent::Number(1350.0 * 1.07)));
    }

    #[test]
    fn test_fourth_offer_dropped() {
        let form = CommercializationForm::new();
        let extracted = json!({
            "table1_entries": offers(&[100.0, 200.0, 300.0, 50.0]),
            "table2_entries": [],
            "table3_entries": [],
            "table4_entries": [],
            "table5_entries": []
        });
        let parsed = form.parse(&extracted).unwrap();
        assert_eq!(parsed.categories[0].len(), 3);
        // The dropped fourth offer does not influence the subtotal.
        assert_eq!(
            parsed.categories[0]
                .items
                .iter()
                .map(|i| i.base_amount)
                .fold(f64::INFINITY, f64::min),
            100.0
        );
    }
}
