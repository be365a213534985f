//! # Grant Form Filler
//!
//! A library for filling EU grant-application Excel forms from free-text
//! project descriptions. An LLM extracts the figures, a reconciliation
//! engine recomputes every derived field from the documented formula
//! chains, and the corrected values are placed into the forms' fixed cell
//! layouts.
//!
//! ## Core concepts
//!
//! - **Form descriptor** ([`FormSpec`]): prompt, JSON shape, row caps,
//!   formula chain, rate constants and cell map for one grant form
//! - **Reconciliation**: extracted values that drift beyond tolerance from
//!   the recomputed formula results are overwritten, surfaced as advisory
//!   notes, never as errors
//! - **Aggregation**: category subtotals (sum, or lowest competitive quote)
//!   rolled up into direct/indirect/total/funding figures
//! - **Placement**: `(sheet, coordinate)` writes plus spreadsheet-native
//!   SUM formulas over the dynamic row ranges
//!
//! ## Example
//!
//! ```rust,ignore
//! use grant_form_filler::*;
//!
//! let config = LlmConfig::from_env().expect("GROQ_API_KEY not set");
//! let client = GroqClient::new(config);
//!
//! let mut workbook = XlsxWorkbook::open_template("patenting_template.xlsx".as_ref())?;
//! let pipeline = FormPipeline::new(PatentingForm::new(), &client);
//! let report = pipeline.run_file(
//!     "project_description.txt".as_ref(),
//!     &mut workbook,
//!     "patenting_filled.xlsx".as_ref(),
//! );
//!
//! if report.success {
//!     println!("{} cells written", report.cells_written);
//! }
//! ```

pub mod aggregate;
pub mod batch;
pub mod cells;
pub mod config;
pub mod error;
pub mod expr;
pub mod extract;
pub mod forms;
pub mod pipeline;
pub mod prompts;
pub mod rates;
pub mod reconcile;
pub mod schema;
pub mod workbook;

#[cfg(feature = "groq")]
pub mod llm;

pub use aggregate::{aggregate, category_subtotal};
pub use batch::{run_with_pacing, BatchJob};
pub use config::{BatchPacing, LlmConfig};
pub use error::{FormFillError, Result};
pub use forms::*;
pub use pipeline::{FormPipeline, FormSpec, LanguageModel, ParsedForm, PipelineState, RunReport};
pub use reconcile::Reconciler;
pub use schema::*;
pub use workbook::{merge_workbooks, CellStore, FormOutput, MemoryWorkbook, XlsxWorkbook};

#[cfg(feature = "groq")]
pub use llm::GroqClient;

use std::path::Path;

/// Runs one form pipeline over already-read project text. Thin wrapper for
/// callers that do not need to hold on to the pipeline.
pub fn fill_form<F: FormSpec>(
    form: F,
    llm: &dyn LanguageModel,
    text: &str,
    store: &mut dyn CellStore,
    output_path: &Path,
) -> RunReport {
    FormPipeline::new(form, llm).run(text, store, output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    struct ScriptedModel {
        response: String,
    }

    impl LanguageModel for ScriptedModel {
        fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
            Ok(self.response.clone())
        }
    }

    #[test]
    fn test_fill_form_end_to_end() {
        let model = ScriptedModel {
            response: r#"```json
{
    "table1_entries": [
        {"expenditure_type": "Market study", "supplier_info": "Alpha Ltd", "price_eur": 1200.0},
        {"expenditure_type": "Market study", "supplier_info": "Beta Ltd", "price_eur": 900.0}
    ],
    "table2_entries": [],
    "table3_entries": [],
    "table4_entries": [],
    "table5_entries": []
}
```"#
                .to_string(),
        };

        let mut store = MemoryWorkbook::new();
        let report = fill_form(
            CommercializationForm::new(),
            &model,
            "Two market study offers were received.",
            &mut store,
            Path::new("out.xlsx"),
        );

        assert!(report.success);
        assert_eq!(report.final_state, PipelineState::Saved);
        assert_eq!(report.line_items, 2);
        assert_eq!(store.saved_to(), Some(Path::new("out.xlsx")));
        // Lowest offer wins the subtotal.
        assert_eq!(store.number("Commercialization", "D10"), Some(900.0));
        let totals = report.totals.unwrap();
        assert!((totals.direct_costs - 900.0).abs() < 1e-6);
    }

    #[test]
    fn test_fill_form_malformed_response() {
        let model = ScriptedModel {
            response: "I could not find any cost figures in the text.".to_string(),
        };

        let mut store = MemoryWorkbook::new();
        let report = fill_form(
            PatentingForm::new(),
            &model,
            "irrelevant",
            &mut store,
            Path::new("out.xlsx"),
        );

        assert!(!report.success);
        assert_eq!(report.final_state, PipelineState::Failed);
        assert!(!report.errors.is_empty());
        assert_eq!(store.cell_count(), 0);
        assert!(store.saved_to().is_none());
    }
}
