//! Prompt templates for the per-form extraction calls.
//!
//! Each form appends the expected JSON schema (generated from its payload
//! types) and the project text to its template at call time, so the
//! constants here only carry the domain instructions.

pub const SYSTEM_PROMPT: &str = "You are an expert data analyst specializing in extracting \
structured information from European Union project funding documents. You have deep knowledge \
of grant budgeting rules, salary structures, and eligible cost categories. Always respond with \
valid JSON when requested and pay extreme attention to numerical accuracy. Never output \
arithmetic expressions in place of numbers; compute the final value.";

pub const PATENTING_PROMPT: &str = r#"
Extract the planned patenting expenditures from the project description.

The patenting form has four quote tables:
1. `phase1_attorney_services` - patent attorney services for the application
   phase (up to 3 competitive supplier quotes)
2. `phase1_taxes` - application-phase official fees and taxes (up to 3 entries)
3. `phase2_attorney_services` - attorney services for the examination/grant
   phase (up to 3 quotes)
4. `phase2_taxes` - examination/grant-phase fees and taxes (up to 4 entries)

For each entry provide:
- `expenditure_type`: what the money is for
- `supplier_info`: supplier or authority name and identifying details
- `price_eur`: the quoted price in euros (a plain number)

Only extract figures explicitly present in the text. Leave a table as an
empty array when the text has nothing for it.
"#;

pub const COMMERCIALIZATION_PROMPT: &str = r#"
Extract the market development (commercialization) service expenditures from
the project description.

The form has five expenditure tables, `table1_entries` through
`table5_entries`, one per expenditure type. Each table holds up to 3
competitive commercial offers for the same service; the grant only funds the
cheapest offer, but all offers must be listed.

For each entry provide:
- `expenditure_type`: the service being procured
- `supplier_info`: supplier name and identifying details
- `price_eur`: the offered price in euros (a plain number)

List the offers in the order they appear in the text. Leave a table as an
empty array when the text has no offers for that expenditure type.
"#;

pub const BUDGETARY_PROMPT: &str = r#"
Extract the project staffing plan for the planned-remuneration certificate.

Provide `project_info` with:
- `project_code`, `organization_name`
- `project_duration_months` (integer)
- `organization_type` (e.g. university, research institute, SME)
- `budgetary_classification`: "budgetary" for public budgetary institutions,
  "business" otherwise

Provide `job_positions`, an array with one object per planned position:
- `position_function`: the post title
- `duties`: duties within the project
- `employee_name`: if named, otherwise empty string
- `project_impact_no`: project impact number (e.g. "1.2"), empty if unknown
- `action_expenditure_type`: action/expenditure type number (e.g. "1.2.1"),
  empty if unknown
- `employment_contract`: "time-limited" or "indefinite", empty if unknown
- `recruitment_year`: planned recruitment year, empty when it equals the
  salary year
- `remuneration_year`
- `months_planned` (integer): months of employment planned
- `planned_salary_rate`: monthly base salary in euros
- `allowances`: flat monthly allowances in euros, 0 if none
- `increase_percentage`: planned increase as a decimal (0.05 for 5%), 0 if none
- `increase_amount`: the increase in euros, 0 if unknown
- `working_week_length`: 5 or 6 (days per week, NOT hours)
- `annual_leave_days` (integer)
- `justification`: why the position and rate are justified

Use 0 for genuinely unknown numeric values; the derived columns are
recomputed downstream, so never invent totals.
"#;

pub const STAFF_PROMPT: &str = r#"
Extract the research and development staff wage plan.

Provide four arrays: `applicant_staff`, `partner1_staff`, `partner2_staff`
and `partner3_staff` (empty when the project has no such partner). Each
holds up to 20 staff members with:
- `name_surname`: if named, otherwise empty string
- `position`: role in the project
- `total_hours` (integer): hours planned over the whole project
- `hourly_rate`: wage rate in euros per hour

Assign each person to the organization that employs them. Do not compute
totals; they are derived downstream.
"#;

pub const SUMMARY_PROMPT: &str = r#"
Extract the R&D cost summary breakdown.

Provide:
- `impact_entries`: up to 10 rows, one per R&D activity/impact, each with
  `serial_no`, `impact_name`, `direct_costs`, `indirect_costs`,
  `total_costs`, `funding_requested` (euros; 0 when unknown)
- `expenditure_categories`: exactly the form's 8 cost categories in order
  (staff, missions, equipment depreciation, R&D services, materials,
  equipment rental, premises rental, other), each with `category_id`,
  `direct_costs`, `funding_requested`
- `partner_breakdown`: one object per applicant/partner with
  `organization_name`, `eligible_costs`, `funding_requested`, `percentage`
- `indirect_cost_rate`: the applied overhead rate as a decimal; use 0.07
  unless the text states the project claims no indirect costs, then 0.0
- `lines_4_5_amount` and `lines_4_5_percentage`: combined R&D services and
  contractual research costs (lines 4 and 5), euros and share of direct costs
- `heading_8_amount` and `heading_8_percentage`: building/premises rental
  costs (heading 8), euros and share of direct costs

Only use figures stated in or directly attributable to the text.
"#;

pub const DATA_PROMPT: &str = r#"
Extract the project contractor breakdown for the contractor data sheet.

Provide `contractors`, an array with one object per contractor:
- `type_of_contractor`: "Applicant", "Partner No 1", "Partner No 2" or
  "Partner No 3" for the project participants themselves; otherwise the
  contractor's role (e.g. "Patent Attorney", "Translation Service")
- `legal_entity`: the contractor's legal form (e.g. "Private Company",
  "University", "Research Institute")
- `eligible_costs`: eligible costs attributed to the contractor, euros
- `funding_requested`: funding requested for the contractor, euros

Funding requested can never exceed eligible costs. Use 0 for unknown
amounts; list the project participants first.
"#;

pub const REVENUE_PROMPT: &str = r#"
Extract the post-project revenue forecast.

Provide:
- `products`: up to 16 products/services. Each has `product_name` plus, for
  the four forecast periods (`during` the project, then years `n1`, `n2`,
  `n3` after project end): `sales_quantity_<period>`,
  `unit_price_<period>` and `total_revenue_<period>` (euros). Ensure
  quantity x unit price equals total revenue for every period.
- `total_income_during`, `total_income_n1`, `total_income_n2`,
  `total_income_n3`: total projected project income per period, euros

Use 0 for periods with no projected revenue. Plain numbers only.
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_mention_their_sections() {
        assert!(PATENTING_PROMPT.contains("phase1_attorney_services"));
        assert!(COMMERCIALIZATION_PROMPT.contains("table5_entries"));
        assert!(BUDGETARY_PROMPT.contains("job_positions"));
        assert!(STAFF_PROMPT.contains("partner3_staff"));
        assert!(SUMMARY_PROMPT.contains("expenditure_categories"));
        assert!(DATA_PROMPT.contains("contractors"));
        assert!(REVENUE_PROMPT.contains("total_income_n3"));
    }

    #[test]
    fn test_system_prompt_requests_json() {
        assert!(SYSTEM_PROMPT.contains("valid JSON"));
    }
}
