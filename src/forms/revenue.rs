//! Post-project revenue forecast (financial plan): up to 16 products, each
//! occupying a five-row block (name, quantities, unit prices, revenues),
//! across four forecast periods.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{lenient, payload_from, prompt_with_schema};
use crate::error::Result;
use crate::pipeline::{FormSpec, ParsedForm};
use crate::prompts;
use crate::schema::{Category, FormRates, FormulaStep, LineItem, SubtotalPolicy, QUOTE_CHAIN};
use crate::workbook::FormOutput;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct ProductForecast {
    #[schemars(description = "Product or service name.")]
    #[serde(default)]
    pub product_name: String,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub sales_quantity_during: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub sales_quantity_n1: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub sales_quantity_n2: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub sales_quantity_n3: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub unit_price_during: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub unit_price_n1: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub unit_price_n2: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub unit_price_n3: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub total_revenue_during: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub total_revenue_n1: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub total_revenue_n2: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub total_revenue_n3: f64,
}

impl ProductForecast {
    fn total_revenue(&self) -> f64 {
        self.total_revenue_during
            + self.total_revenue_n1
            + self.total_revenue_n2
            + self.total_revenue_n3
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct RevenuePayload {
    #[schemars(description = "Forecast per product (max 16).")]
    #[serde(default)]
    pub products: Vec<ProductForecast>,
    #[schemars(description = "Total projected project income during the project, EUR.")]
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub total_income_during: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub total_income_n1: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub total_income_n2: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub total_income_n3: f64,
}

const PRODUCT_CAP: usize = 16;

/// Products sit in five-row blocks: name row, then quantity, price and
/// revenue rows, with a blank separator.
const PRODUCT_BLOCK_HEIGHT: u32 = 5;
const FIRST_NAME_ROW: u32 = 6;

/// Forecast-period columns, project period first.
const PERIOD_COLUMNS: [&str; 4] = ["B", "C", "D", "E"];

const REQUIRED_KEYS: &[&str] = &["products"];

#[derive(Debug, Default)]
pub struct RevenueForm;

impl RevenueForm {
    pub fn new() -> Self {
        Self
    }

    fn write_period_row(output: &mut FormOutput, row: u32, values: [f64; 4]) {
        for (column, value) in PERIOD_COLUMNS.iter().zip(values) {
            output.number(format!("{}{}", column, row), value);
        }
    }
}

impl FormSpec for RevenueForm {
    fn name(&self) -> &str {
        "revenue-forecast"
    }

    fn sheet_name(&self) -> &str {
        "Revenue"
    }

    fn system_prompt(&self) -> &str {
        prompts::SYSTEM_PROMPT
    }

    fn user_prompt(&self) -> String {
        prompt_with_schema::<RevenuePayload>(prompts::REVENUE_PROMPT)
    }

    fn required_keys(&self) -> &[&str] {
        REQUIRED_KEYS
    }

    fn rates(&self, _extracted: &Value) -> FormRates {
        // Revenue is income, not a cost claim; the overhead and funding
        // rates never apply here.
        FormRates::non_budgetary()
            .with_indirect_rate(0.0)
    }

    fn chain(&self) -> &[FormulaStep] {
        QUOTE_CHAIN
    }

    fn parse(&self, extracted: &Value) -> Result<ParsedForm> {
        let payload: RevenuePayload = payload_from(extracted)?;
        let items = payload
            .products
            .iter()
            .map(|product| LineItem {
                label: product.product_name.clone(),
                base_amount: product.total_revenue(),
                ..LineItem::default()
            })
            .collect();

        Ok(ParsedForm {
            categories: vec![Category::with_items(
                "Products",
                PRODUCT_CAP,
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
        let payload: RevenuePayload = match payload_from(&parsed.extracted) {
            Ok(payload) => payload,
            Err(_) => return,
        };

        Self::write_period_row(
            output,
            4,
            [
                payload.total_income_during,
                payload.total_income_n1,
                payload.total_income_n2,
                payload.total_income_n3,
            ],
        );

        for (index, product) in payload.products.iter().take(PRODUCT_CAP).enumerate() {
            let name_row = FIRST_NAME_ROW + index as u32 * PRODUCT_BLOCK_HEIGHT;
            output.text(format!("A{}", name_row), product.product_name.clone());
            Self::write_period_row(
                output,
                name_row + 1,
                [
                    product.sales_quantity_during,
                    product.sales_quantity_n1,
                    product.sales_quantity_n2,
                    product.sales_quantity_n3,
                ],
            );
            Self::write_period_row(
                output,
                name_row + 2,
                [
                    product.unit_price_during,
                    product.unit_price_n1,
                    product.unit_price_n2,
                    product.unit_price_n3,
                ],
            );
            Self::write_period_row(
                output,
                name_row + 3,
                [
                    product.total_revenue_during,
                    product.total_revenue_n1,
                    product.total_revenue_n2,
                    product.total_revenue_n3,
                ],
            );
        }
    }
}
