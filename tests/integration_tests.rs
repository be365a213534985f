use std::path::Path;
use std::time::Duration;

use grant_form_filler::*;

/// Returns a fixed response regardless of the prompt, like a recorded LLM
/// session.
struct ScriptedModel(&'static str);

impl LanguageModel for ScriptedModel {
    fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        Ok(self.0.to_string())
    }
}

const WAGE_FORM_RESPONSE: &str = r#"```json
{
    "project_info": {
        "project_code": "01-2024/7",
        "organization_name": "ACME Research UAB",
        "project_duration_months": 24,
        "organization_type": "Private research company",
        "budgetary_classification": "business"
    },
    "job_positions": [
        {
            "position_function": "Senior researcher",
            "duties": "Lead work package 2",
            "employee_name": "",
            "remuneration_year": "2024 - 2026",
            "months_planned": 12,
            "planned_salary_rate": 2650,
            "allowances": 0,
            "increase_percentage": 0.05,
            "increase_amount": "2650 * 0.05",
            "working_week_length": 40,
            "annual_leave_days": 20,
            "annual_leave_rate": 0.5,
            "justification": "Market rate for the role"
        },
        {
            "position_function": "Laboratory technician",
            "duties": "Sample preparation",
            "employee_name": "J. Doe",
            "remuneration_year": "2025",
            "months_planned": 18,
            "planned_salary_rate": 1800,
            "allowances": 100,
            "increase_percentage": 0,
            "increase_amount": 0,
            "working_week_length": 5,
            "annual_leave_days": 25,
            "annual_leave_rate": 0.1044,
            "justification": "Standard technician rate"
        }
    ]
}
```"#;

#[test]
fn test_wage_form_full_pipeline() {
    let model = ScriptedModel(WAGE_FORM_RESPONSE);
    let form = BudgetaryForm::wage_form();
    let pipeline = FormPipeline::new(form, &model);

    let mut store = MemoryWorkbook::new();
    let report = pipeline.run(
        "Project staffing plan as described above.",
        &mut store,
        Path::new("wage_form_filled.xlsx"),
    );

    assert!(report.success, "errors: {:?}", report.errors);
    assert_eq!(report.final_state, PipelineState::Saved);
    assert_eq!(report.line_items, 2);
    assert_eq!(
        report.steps_completed,
        vec![
            PipelineState::TextRead,
            PipelineState::Extracted,
            PipelineState::Reconciled,
            PipelineState::Aggregated,
            PipelineState::Placed,
            PipelineState::Saved,
        ]
    );

    // The 40-day week and the off-table leave rate were both corrected.
    assert!(report
        .advisories
        .iter()
        .any(|a| a.contains("working week 40")));
    assert!(report
        .advisories
        .iter()
        .any(|a| a.contains("annual leave rate 0.5")));

    let sheet = "Wage form";

    // The spaced year range is a legitimate string value, not arithmetic.
    assert_eq!(
        store.get(sheet, "I15"),
        Some(&workbook::CellContent::Text("2024 - 2026".to_string()))
    );

    // Row 15: senior researcher, with the quoted arithmetic evaluated.
    let excl = 2650.0 + 132.5;
    let incl = excl * 1.046;
    let period = 12.0 * incl;
    let leave = period * 0.0863;
    assert_eq!(store.number(sheet, "K15"), Some(2650.0));
    assert_eq!(store.number(sheet, "M15"), Some(132.5));
    let n15 = store.number(sheet, "N15").unwrap();
    assert!((n15 - excl).abs() < 1e-6);
    let s15 = store.number(sheet, "S15").unwrap();
    assert!((s15 - leave).abs() < 1e-6);
    let u15 = store.number(sheet, "U15").unwrap();
    assert!((u15 - (period + leave)).abs() < 1e-6);

    // Row 16: the technician's supplied leave rate matches the table and
    // is kept as-is.
    let tech_excl = 1800.0 + 100.0;
    let tech_period = 18.0 * tech_excl * 1.046;
    let tech_leave = tech_period * 0.1044;
    let u16 = store.number(sheet, "U16").unwrap();
    assert!((u16 - (tech_period + tech_leave)).abs() < 1e-6);

    // Sum formulas cover exactly the two filled rows.
    assert_eq!(
        store.get(sheet, "J33"),
        Some(&workbook::CellContent::Formula("=SUM(J15:J16)".to_string()))
    );

    // Form totals hold the documented identities.
    let totals = report.totals.unwrap();
    assert!((totals.direct_costs - (u15 + u16)).abs() < 1e-6);
    assert!((totals.total_costs - totals.direct_costs * 1.07).abs() < 1e-6);
    assert!((totals.funding_requested - totals.total_costs * 0.85).abs() < 1e-6);
    assert!(totals.funding_requested <= totals.total_costs);
}

#[test]
fn test_batch_survives_a_failing_form() {
    let good_model = ScriptedModel(
        r#"{"phase1_attorney_services": [{"expenditure_type": "Filing", "supplier_info": "Bureau", "price_eur": 3000.0}],
            "phase1_taxes": [], "phase2_attorney_services": [], "phase2_taxes": []}"#,
    );
    let bad_model = ScriptedModel("No JSON here, sorry.");

    let pacing = BatchPacing {
        delay: Duration::from_millis(0),
        interval: 2,
    };

    let jobs: Vec<BatchJob> = vec![
        Box::new(|| {
            let mut store = MemoryWorkbook::new();
            FormPipeline::new(PatentingForm::new(), &good_model).run(
                "text",
                &mut store,
                Path::new("patenting.xlsx"),
            )
        }),
        Box::new(|| {
            let mut store = MemoryWorkbook::new();
            FormPipeline::new(SummaryForm::new(), &bad_model).run(
                "text",
                &mut store,
                Path::new("summary.xlsx"),
            )
        }),
    ];

    let reports = run_with_pacing(jobs, pacing);
    assert_eq!(reports.len(), 2);
    assert!(reports[0].success);
    assert!(!reports[1].success);
    assert!(!reports[1].errors.is_empty());
    assert_eq!(reports[1].final_state, PipelineState::Failed);
}

#[test]
fn test_expenditure_tab_pipeline() {
    let model = ScriptedModel(
        r#"{"project_info": {"type_of_rd": "Applied research", "impact_name": "Prototype",
                "legal_entity_name": "ACME", "applicant_partner": "Applicant", "funding_intensity": 0.85},
            "mission_expenses": {"total_eligible_costs": 4200.0, "total_funding_requested": 3570.0,
                "missions": [{"mission_name": "Field trial", "destination_country": "Estonia",
                              "duration_days": 4, "travelers_count": 3}]},
            "staff_costs": [{"position": "Engineer", "eligible_costs": 36000.0, "funding_requested": 30600.0}],
            "rd_services": [], "equipment_depreciation": [], "materials_supplies": [],
            "equipment_rental": [], "premises_rental": []}"#,
    );

    let mut store = MemoryWorkbook::new();
    let report = FormPipeline::new(ExpenditureTab::tab(3), &model).run(
        "tab text",
        &mut store,
        Path::new("tab3.xlsx"),
    );

    assert!(report.success, "errors: {:?}", report.errors);
    assert_eq!(store.number("Tab 3", "H5"), Some(0.85));
    assert_eq!(store.number("Tab 3", "G30"), Some(4200.0));
    assert_eq!(store.number("Tab 3", "J32"), Some(4.0));
    assert_eq!(store.number("Tab 3", "G10"), Some(36_000.0));
    let totals = report.totals.unwrap();
    assert!((totals.direct_costs - 36_000.0).abs() < 1e-6);
}

#[test]
fn test_merge_workbooks_one_sheet_per_source() -> anyhow::Result<()> {
    let dir = std::env::temp_dir();
    let first = dir.join("grant_form_filler_merge_a.xlsx");
    let second = dir.join("grant_form_filler_merge_b.xlsx");
    let combined = dir.join("grant_form_filler_merge_out.xlsx");

    let write_source = |path: &Path, sheet_name: &str, cell: &str, value: f64| {
        let mut book = umya_spreadsheet::new_file();
        let sheet = book
            .get_sheet_by_name_mut("Sheet1")
            .expect("fresh workbook has Sheet1");
        sheet.set_name(sheet_name);
        sheet.get_cell_mut(cell).set_value_number(value);
        umya_spreadsheet::writer::xlsx::write(&book, path)
    };

    write_source(&first, "Patenting", "D36", 9710.0)?;
    write_source(&second, "Commercialization", "D36", 1350.0)?;

    merge_workbooks(&[first.clone(), second.clone()], &combined)?;

    let book = umya_spreadsheet::reader::xlsx::read(&combined)?;
    let patenting = book.get_sheet_by_name("Patenting").expect("merged sheet");
    assert_eq!(patenting.get_value("D36"), "9710");
    let commercialization = book
        .get_sheet_by_name("Commercialization")
        .expect("merged sheet");
    assert_eq!(commercialization.get_value("D36"), "1350");

    for path in [&first, &second, &combined] {
        let _ = std::fs::remove_file(path);
    }
    Ok(())
}
