//! Field reconciliation: recompute every derived field of a line item from
//! its inputs and overwrite extracted values that drifted beyond tolerance.
//!
//! LLMs are good at finding figures and bad at arithmetic. Placement and
//! human reviewers rely on the exact formula relationships between columns,
//! so each form's documented chain is recomputed here in a fixed order and
//! any deviation is corrected silently, surfaced only as an advisory note.
//! Out-of-range inputs are defaulted or clamped, never rejected.

use log::debug;

use crate::rates::annual_leave_rate;
use crate::schema::{Category, FormRates, FormulaStep, LineItem};

/// Supplied leave rates within this distance of the table rate are kept.
const RATE_TOLERANCE: f64 = 0.001;

/// Supplied monetary amounts within this distance of the recomputed value
/// are kept.
const AMOUNT_TOLERANCE: f64 = 0.01;

/// A raw working week of 40 is a known extraction error: the model reads
/// "40-hour week" where the form wants days.
const HOURS_MISTAKEN_FOR_DAYS: u32 = 40;

/// Applies a form's formula chain to extracted line items.
pub struct Reconciler<'a> {
    chain: &'a [FormulaStep],
    rates: FormRates,
}

impl<'a> Reconciler<'a> {
    pub fn new(chain: &'a [FormulaStep], rates: FormRates) -> Self {
        Self { chain, rates }
    }

    /// Returns the corrected item plus advisory notes for every correction
    /// made. Pure: the input item is left untouched.
    pub fn reconcile_item(&self, item: &LineItem) -> (LineItem, Vec<String>) {
        let mut item = item.clone();
        let mut advisories = Vec::new();

        if item.working_week_length == HOURS_MISTAKEN_FOR_DAYS {
            advisories.push(format!(
                "'{}': working week 40 normalized to 5",
                item.label
            ));
            item.working_week_length = 5;
        }
        if !matches!(item.working_week_length, 5 | 6) {
            advisories.push(format!(
                "'{}': unusual working week {} treated as 5-day for rate lookup",
                item.label, item.working_week_length
            ));
        }

        if self.chain.contains(&FormulaStep::LeaveCost) {
            let table_rate = annual_leave_rate(item.working_week_length, item.annual_leave_days);
            if (item.annual_leave_rate - table_rate).abs() > RATE_TOLERANCE {
                advisories.push(format!(
                    "'{}': annual leave rate {} corrected to {}",
                    item.label, item.annual_leave_rate, table_rate
                ));
                item.annual_leave_rate = table_rate;
            }
        }

        if let Some(percentage) = item.increase_percentage {
            let expected = (item.base_amount + item.allowances) * percentage;
            if (item.increase_amount - expected).abs() > AMOUNT_TOLERANCE {
                advisories.push(format!(
                    "'{}': increase amount {} corrected to {}",
                    item.label, item.increase_amount, expected
                ));
                item.increase_amount = expected;
            }
        }

        self.apply_chain(&mut item, &mut advisories);

        for advisory in &advisories {
            debug!("reconcile: {}", advisory);
        }

        (item, advisories)
    }

    /// Runs the chain stages in their fixed order, carrying each stage's
    /// result into the next.
    fn apply_chain(&self, item: &mut LineItem, advisories: &mut Vec<String>) {
        let mut carry = 0.0;
        let mut leave = 0.0;
        let has_leave = self.chain.contains(&FormulaStep::LeaveCost);

        for step in self.chain {
            match step {
                FormulaStep::ExclContribution => {
                    carry = item.base_amount + item.allowances + item.increase_amount;
                    Self::correct(
                        &item.label,
                        "total excluding contribution",
                        &mut item.excl_contribution,
                        carry,
                        advisories,
                    );
                    carry = item.excl_contribution;
                }
                FormulaStep::InclContribution => {
                    let expected = carry * (1.0 + self.rates.contribution_rate);
                    Self::correct(
                        &item.label,
                        "total including contribution",
                        &mut item.incl_contribution,
                        expected,
                        advisories,
                    );
                    carry = item.incl_contribution;
                }
                FormulaStep::PeriodCost => {
                    let expected = item.quantity * item.duration * carry;
                    Self::correct(
                        &item.label,
                        "period cost",
                        &mut item.period_cost,
                        expected,
                        advisories,
                    );
                    carry = item.period_cost;
                }
                FormulaStep::LeaveCost => {
                    let expected = carry * item.annual_leave_rate;
                    Self::correct(
                        &item.label,
                        "annual leave cost",
                        &mut item.leave_cost,
                        expected,
                        advisories,
                    );
                    leave = item.leave_cost;
                }
                FormulaStep::GrandTotal => {
                    let expected = carry + if has_leave { leave } else { 0.0 };
                    Self::correct(
                        &item.label,
                        "grand total",
                        &mut item.grand_total,
                        expected,
                        advisories,
                    );
                }
            }
        }
    }

    fn correct(
        label: &str,
        field: &str,
        current: &mut f64,
        expected: f64,
        advisories: &mut Vec<String>,
    ) {
        if (*current - expected).abs() > AMOUNT_TOLERANCE {
            advisories.push(format!(
                "'{}': {} {} corrected to {}",
                label, field, current, expected
            ));
            *current = expected;
        }
    }

    /// Reconciles every item of every category in place, collecting all
    /// advisory notes.
    pub fn reconcile_categories(&self, categories: &mut [Category]) -> Vec<String> {
        let mut advisories = Vec::new();
        for category in categories.iter_mut() {
            for item in category.items.iter_mut() {
                let (corrected, mut notes) = self.reconcile_item(item);
                *item = corrected;
                advisories.append(&mut notes);
            }
        }
        advisories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SubtotalPolicy, HOURS_TIMES_RATE_CHAIN, QUOTE_CHAIN, REMUNERATION_CHAIN};

    fn budgetary_reconciler() -> Reconciler<'static> {
        Reconciler::new(REMUNERATION_CHAIN, FormRates::budgetary())
    }

    #[test]
    fn test_week_40_normalized_with_table_rate() {
        let item = LineItem {
            label: "Researcher".to_string(),
            working_week_length: 40,
            annual_leave_days: 20,
            annual_leave_rate: 0.5,
            base_amount: 2650.0,
            ..LineItem::default()
        };

        let (corrected, advisories) = budgetary_reconciler().reconcile_item(&item);
        assert_eq!(corrected.working_week_length, 5);
        assert_eq!(corrected.annual_leave_rate, 0.0863);
        assert!(!advisories.is_empty());
    }

    #[test]
    fn test_rate_within_tolerance_kept() {
        let item = LineItem {
            annual_leave_days: 20,
            annual_leave_rate: 0.0863 + 0.0005,
            ..LineItem::default()
        };
        let (corrected, _) = budgetary_reconciler().reconcile_item(&item);
        assert_eq!(corrected.annual_leave_rate, 0.0863 + 0.0005);
    }

    #[test]
    fn test_increase_amount_recomputed() {
        let item = LineItem {
            base_amount: 2650.0,
            allowances: 265.0,
            increase_percentage: Some(0.05),
            increase_amount: 999.0,
            ..LineItem::default()
        };
        let (corrected, _) = budgetary_reconciler().reconcile_item(&item);
        assert!((corrected.increase_amount - 145.75).abs() < 1e-9);
    }

    #[test]
    fn test_full_remuneration_chain() {
        let rates = FormRates::budgetary();
        let item = LineItem {
            label: "Coordinator".to_string(),
            base_amount: 2000.0,
            allowances: 0.0,
            increase_amount: 100.0,
            quantity: 1.0,
            duration: 12.0,
            annual_leave_days: 25,
            annual_leave_rate: 0.1044,
            ..LineItem::default()
        };

        let reconciler = Reconciler::new(REMUNERATION_CHAIN, rates);
        let (corrected, _) = reconciler.reconcile_item(&item);

        let excl = 2100.0;
        let incl = excl * 1.014;
        let period = 12.0 * incl;
        let leave = period * 0.1044;
        assert!((corrected.excl_contribution - excl).abs() < 1e-6);
        assert!((corrected.incl_contribution - incl).abs() < 1e-6);
        assert!((corrected.period_cost - period).abs() < 1e-6);
        assert!((corrected.leave_cost - leave).abs() < 1e-6);
        assert!((corrected.grand_total - (period + leave)).abs() < 1e-6);
    }

    #[test]
    fn test_quote_chain_grand_total_is_price() {
        let item = LineItem {
            base_amount: 1200.0,
            ..LineItem::default()
        };
        let reconciler = Reconciler::new(QUOTE_CHAIN, FormRates::non_budgetary());
        let (corrected, _) = reconciler.reconcile_item(&item);
        assert_eq!(corrected.grand_total, 1200.0);
    }

    #[test]
    fn test_hours_times_rate_chain() {
        let item = LineItem {
            base_amount: 26.5,
            duration: 160.0,
            ..LineItem::default()
        };
        let reconciler = Reconciler::new(HOURS_TIMES_RATE_CHAIN, FormRates::non_budgetary());
        let (corrected, _) = reconciler.reconcile_item(&item);
        assert!((corrected.grand_total - 4240.0).abs() < 1e-9);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let item = LineItem {
            label: "Analyst".to_string(),
            base_amount: 1800.0,
            allowances: 90.0,
            increase_percentage: Some(0.1),
            increase_amount: 0.0,
            quantity: 1.0,
            duration: 10.0,
            working_week_length: 40,
            annual_leave_days: 28,
            annual_leave_rate: 0.0,
            ..LineItem::default()
        };

        let reconciler = budgetary_reconciler();
        let (once, _) = reconciler.reconcile_item(&item);
        let (twice, advisories) = reconciler.reconcile_item(&once);
        assert_eq!(once, twice);
        // Second pass finds nothing to change beyond tolerance.
        assert!(advisories.is_empty());
    }

    #[test]
    fn test_reconcile_categories_collects_advisories() {
        let mut categories = vec![Category::with_items(
            "Positions",
            10,
            SubtotalPolicy::Sum,
            vec![
                LineItem {
                    label: "A".to_string(),
                    working_week_length: 40,
                    ..LineItem::default()
                },
                LineItem {
                    label: "B".to_string(),
                    ..LineItem::default()
                },
            ],
        )];

        let advisories = budgetary_reconciler().reconcile_categories(&mut categories);
        assert!(advisories.iter().any(|a| a.contains("'A'")));
        assert_eq!(categories[0].items[0].working_week_length, 5);
    }
}
