use serde::{Deserialize, Serialize};

use crate::rates::{
    CONTRIBUTION_RATE_BUDGETARY, CONTRIBUTION_RATE_NON_BUDGETARY, FUNDING_INTENSITY_RATE,
    INDIRECT_COST_RATE,
};

/// The fixed percentage constants a form applies during aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormRates {
    /// Employer contribution added on top of gross remuneration.
    pub contribution_rate: f64,
    /// Overhead applied to direct costs.
    pub indirect_rate: f64,
    /// Share of total eligible costs claimed from the grant.
    pub funding_rate: f64,
}

impl FormRates {
    pub fn budgetary() -> Self {
        Self {
            contribution_rate: CONTRIBUTION_RATE_BUDGETARY,
            indirect_rate: INDIRECT_COST_RATE,
            funding_rate: FUNDING_INTENSITY_RATE,
        }
    }

    pub fn non_budgetary() -> Self {
        Self {
            contribution_rate: CONTRIBUTION_RATE_NON_BUDGETARY,
            indirect_rate: INDIRECT_COST_RATE,
            funding_rate: FUNDING_INTENSITY_RATE,
        }
    }

    /// The R&D summary form allows the overhead to be switched off.
    pub fn with_indirect_rate(mut self, rate: f64) -> Self {
        self.indirect_rate = rate;
        self
    }
}

impl Default for FormRates {
    fn default() -> Self {
        Self::non_budgetary()
    }
}

/// How a category turns its line items into a subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubtotalPolicy {
    /// Sum of every item's grand total.
    Sum,
    /// The lowest grand total among the entered competitive quotes. Used by
    /// the commercialization form, where three supplier offers are listed
    /// but only the cheapest one is funded.
    LowestQuote,
}

/// One stage of the derived-cost formula chain. Each form reconciles a
/// documented subset of these, always in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormulaStep {
    /// excl_contribution = base + allowances + increase_amount
    ExclContribution,
    /// incl_contribution = excl_contribution * (1 + contribution_rate)
    InclContribution,
    /// period_cost = quantity * duration * incl_contribution
    PeriodCost,
    /// leave_cost = period_cost * annual_leave_rate
    LeaveCost,
    /// grand_total = period_cost + leave_cost
    GrandTotal,
}

/// The full remuneration chain used by the budgetary-authorization forms.
pub const REMUNERATION_CHAIN: &[FormulaStep] = &[
    FormulaStep::ExclContribution,
    FormulaStep::InclContribution,
    FormulaStep::PeriodCost,
    FormulaStep::LeaveCost,
    FormulaStep::GrandTotal,
];

/// Quote-style forms carry a single price per item: the chain collapses to
/// the base amount.
pub const QUOTE_CHAIN: &[FormulaStep] = &[FormulaStep::ExclContribution, FormulaStep::GrandTotal];

/// Staff-wage forms multiply hours by an hourly rate with no contribution
/// or leave component.
pub const HOURS_TIMES_RATE_CHAIN: &[FormulaStep] = &[
    FormulaStep::ExclContribution,
    FormulaStep::PeriodCost,
    FormulaStep::GrandTotal,
];

/// One funded expenditure or staffing record, as extracted by the LLM and
/// corrected by the reconciler. Monetary fields default to zero, multipliers
/// to one, so a partially extracted record still reconciles cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Human-readable label (position, expenditure type, supplier...).
    pub label: String,
    /// Base monetary amount: salary rate, quoted price, hourly rate.
    pub base_amount: f64,
    /// Flat allowances added to the base before any increase.
    pub allowances: f64,
    /// Optional percentage increase over base + allowances (0.05 = 5%).
    pub increase_percentage: Option<f64>,
    /// The monetary amount of that increase.
    pub increase_amount: f64,
    /// Quantity multiplier (e.g. number of employees or units).
    pub quantity: f64,
    /// Duration multiplier (months or hours planned).
    pub duration: f64,
    /// Working-week length in days; 5 and 6 are the only meaningful values.
    pub working_week_length: u32,
    /// Annual leave entitlement in days.
    pub annual_leave_days: u32,
    /// Leave allowance rate; recomputed from the rate table on reconcile.
    pub annual_leave_rate: f64,
    /// Remuneration excluding employer contribution.
    pub excl_contribution: f64,
    /// Remuneration including employer contribution.
    pub incl_contribution: f64,
    /// Cost over the planned period (quantity x duration x incl).
    pub period_cost: f64,
    /// Planned cost of annual leave over the period.
    pub leave_cost: f64,
    /// Final per-item total placed into the output cells.
    pub grand_total: f64,
}

impl Default for LineItem {
    fn default() -> Self {
        Self {
            label: String::new(),
            base_amount: 0.0,
            allowances: 0.0,
            increase_percentage: None,
            increase_amount: 0.0,
            quantity: 1.0,
            duration: 1.0,
            working_week_length: 5,
            annual_leave_days: 20,
            annual_leave_rate: 0.0,
            excl_contribution: 0.0,
            incl_contribution: 0.0,
            period_cost: 0.0,
            leave_cost: 0.0,
            grand_total: 0.0,
        }
    }
}

/// A fixed-capacity group of line items corresponding to one spreadsheet
/// sub-table. Entries beyond the cap are dropped silently; the form layout
/// has no rows for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub cap: usize,
    pub policy: SubtotalPolicy,
    pub items: Vec<LineItem>,
}

impl Category {
    pub fn new(name: impl Into<String>, cap: usize, policy: SubtotalPolicy) -> Self {
        Self {
            name: name.into(),
            cap,
            policy,
            items: Vec::new(),
        }
    }

    /// Builds a category from extracted items, keeping the first `cap` in
    /// input order.
    pub fn with_items(
        name: impl Into<String>,
        cap: usize,
        policy: SubtotalPolicy,
        mut items: Vec<LineItem>,
    ) -> Self {
        items.truncate(cap);
        Self {
            name: name.into(),
            cap,
            policy,
            items,
        }
    }

    /// Adds an item unless the category is already at capacity.
    pub fn push(&mut self, item: LineItem) {
        if self.items.len() < self.cap {
            self.items.push(item);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Rollup of all categories for one form.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectTotals {
    pub direct_costs: f64,
    pub indirect_costs: f64,
    pub total_costs: f64,
    pub funding_requested: f64,
}
