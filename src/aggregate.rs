//! Rollup of reconciled categories into form-level totals.

use log::debug;

use crate::schema::{Category, FormRates, ProjectTotals, SubtotalPolicy};

/// Subtotal of one category under its policy. An empty category contributes
/// zero; a missing subtotal is never a blocking error.
pub fn category_subtotal(category: &Category) -> f64 {
    let totals = category.items.iter().map(|item| item.grand_total);
    match category.policy {
        SubtotalPolicy::Sum => totals.sum(),
        SubtotalPolicy::LowestQuote => totals.fold(f64::NAN, f64::min).max(0.0),
    }
}

/// Rolls category subtotals up into direct/indirect/total/funding figures.
pub fn aggregate(categories: &[Category], rates: &FormRates) -> ProjectTotals {
    let direct_costs: f64 = categories.iter().map(category_subtotal).sum();
    let indirect_costs = direct_costs * rates.indirect_rate;
    let total_costs = direct_costs + indirect_costs;
    let funding_requested = total_costs * rates.funding_rate;

    debug!(
        "aggregate: direct={:.2} indirect={:.2} total={:.2} funding={:.2}",
        direct_costs, indirect_costs, total_costs, funding_requested
    );

    ProjectTotals {
        direct_costs,
        indirect_costs,
        total_costs,
        funding_requested,
    }
}
