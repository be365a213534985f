//! The per-form pipeline: raw text -> LLM extraction -> reconciliation ->
//! aggregation -> cell placement -> save.
//!
//! Every form runs the same machine; forms differ only in their descriptor
//! (prompt, JSON shape, caps, formula chain, rates, cell map). A failure at
//! any step discards the run's work and lands in the report; there is no
//! rollback, retry, or resumption from a partial state.

use std::path::Path;

use log::{error, info};
use serde::Serialize;
use serde_json::Value;

use crate::aggregate::aggregate;
use crate::error::{FormFillError, Result};
use crate::extract::parse_response;
use crate::reconcile::Reconciler;
use crate::schema::{Category, FormRates, FormulaStep, ProjectTotals};
use crate::workbook::{CellStore, FormOutput};

/// The external text-in/text-out LLM collaborator. Blocking by design: the
/// whole system is sequential and a run has nothing else to do while it
/// waits.
pub trait LanguageModel {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Pipeline progress states. `Failed` is terminal and reachable from any
/// step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Idle,
    TextRead,
    Extracted,
    Reconciled,
    Aggregated,
    Placed,
    Saved,
    Failed,
}

/// Structured result of one pipeline run. Returned instead of raised:
/// the batch orchestrator continues to the next form on failure.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub form: String,
    pub success: bool,
    pub final_state: PipelineState,
    pub steps_completed: Vec<PipelineState>,
    pub errors: Vec<String>,
    /// Reconciliation corrections; informational, never blocking.
    pub advisories: Vec<String>,
    pub totals: Option<ProjectTotals>,
    pub line_items: usize,
    pub cells_written: usize,
}

impl RunReport {
    /// Pretty JSON rendering for result files and logs.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn new(form: &str) -> Self {
        Self {
            form: form.to_string(),
            success: false,
            final_state: PipelineState::Idle,
            steps_completed: Vec::new(),
            errors: Vec::new(),
            advisories: Vec::new(),
            totals: None,
            line_items: 0,
            cells_written: 0,
        }
    }

    fn advance(&mut self, state: PipelineState) {
        self.final_state = state;
        self.steps_completed.push(state);
    }

    fn fail(&mut self, error: impl ToString) {
        error!("{}: {}", self.form, error.to_string());
        self.errors.push(error.to_string());
        self.final_state = PipelineState::Failed;
    }
}

/// The categories plus the raw extracted JSON a form needs during
/// placement (header fields, free-text justifications and the like).
pub struct ParsedForm {
    pub categories: Vec<Category>,
    pub extracted: Value,
}

/// Per-form descriptor: everything that distinguishes one grant form from
/// another. One implementation per form lives in [`crate::forms`].
pub trait FormSpec {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &str;

    /// Target sheet in the output workbook.
    fn sheet_name(&self) -> &str;

    fn system_prompt(&self) -> &str;

    /// Extraction instructions; the project text is appended by the
    /// pipeline.
    fn user_prompt(&self) -> String;

    /// Top-level JSON keys that must be present in the LLM response.
    fn required_keys(&self) -> &[&str];

    /// Rate constants, possibly chosen from the extracted payload (e.g.
    /// contribution rate from the budgetary classification).
    fn rates(&self, extracted: &Value) -> FormRates;

    /// The subset of the derived-cost chain this form reconciles.
    fn chain(&self) -> &[FormulaStep];

    /// Converts the cleaned JSON into capped categories.
    fn parse(&self, extracted: &Value) -> Result<ParsedForm>;

    /// Maps reconciled data and totals to fixed cell addresses.
    fn place(&self, parsed: &ParsedForm, totals: &ProjectTotals, output: &mut FormOutput);
}

/// Drives one form through the state machine.
pub struct FormPipeline<'a, F: FormSpec> {
    form: F,
    llm: &'a dyn LanguageModel,
}

impl<'a, F: FormSpec> FormPipeline<'a, F> {
    pub fn new(form: F, llm: &'a dyn LanguageModel) -> Self {
        Self { form, llm }
    }

    /// Runs the full pipeline over already-read project text, placing into
    /// `store` and saving to `output_path`. Never panics; all failure modes
    /// end up in the report.
    pub fn run(&self, text: &str, store: &mut dyn CellStore, output_path: &Path) -> RunReport {
        let mut report = RunReport::new(self.form.name());

        info!("[{}] starting pipeline", self.form.name());
        report.advance(PipelineState::TextRead);

        // TextRead -> Extracted
        let extracted = match self.extract(text) {
            Ok(value) => value,
            Err(e) => {
                report.fail(e);
                return report;
            }
        };
        report.advance(PipelineState::Extracted);

        // Extracted -> Reconciled
        let mut parsed = match self.form.parse(&extracted) {
            Ok(parsed) => parsed,
            Err(e) => {
                report.fail(e);
                return report;
            }
        };
        let rates = self.form.rates(&extracted);
        let reconciler = Reconciler::new(self.form.chain(), rates);
        report.advisories = reconciler.reconcile_categories(&mut parsed.categories);
        report.line_items = parsed.categories.iter().map(Category::len).sum();
        report.advance(PipelineState::Reconciled);

        // Reconciled -> Aggregated
        let totals = aggregate(&parsed.categories, &rates);
        report.totals = Some(totals);
        report.advance(PipelineState::Aggregated);

        // Aggregated -> Placed
        let mut output = FormOutput::new(self.form.sheet_name());
        self.form.place(&parsed, &totals, &mut output);
        report.cells_written = output.len();
        if let Err(e) = store.apply(&output) {
            report.fail(e);
            return report;
        }
        report.advance(PipelineState::Placed);

        // Placed -> Saved
        if let Err(e) = store.save(output_path) {
            report.fail(e);
            return report;
        }
        report.advance(PipelineState::Saved);
        report.success = true;

        info!(
            "[{}] completed: {} line items, {} cells, funding requested {:.2}",
            self.form.name(),
            report.line_items,
            report.cells_written,
            totals.funding_requested
        );
        report
    }

    /// Reads the project text from a file first; IO failures fail the run
    /// the same way extraction failures do.
    pub fn run_file(
        &self,
        input_path: &Path,
        store: &mut dyn CellStore,
        output_path: &Path,
    ) -> RunReport {
        match std::fs::read_to_string(input_path) {
            Ok(text) => self.run(&text, store, output_path),
            Err(e) => {
                let mut report = RunReport::new(self.form.name());
                report.fail(format!("cannot read {:?}: {}", input_path, e));
                report
            }
        }
    }

    fn extract(&self, text: &str) -> Result<Value> {
        let prompt = format!("{}\n\nText to analyze:\n{}", self.form.user_prompt(), text);
        let raw = self.llm.complete(self.form.system_prompt(), &prompt)?;
        parse_response(&raw, self.form.required_keys()).map_err(|e| {
            FormFillError::ExtractionFailed {
                form: self.form.name().to_string(),
                details: e.to_string(),
            }
        })
    }
}
