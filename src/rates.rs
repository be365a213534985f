//! Fixed rate tables and constants used across the grant forms.
//!
//! The annual-leave rate table reproduces the reference sheet shipped with
//! the budgetary remuneration workbook: one band of rates per working-week
//! length, keyed by the number of annual leave days.

/// Employer contribution rate for budgetary institutions.
pub const CONTRIBUTION_RATE_BUDGETARY: f64 = 0.014;

/// Employer contribution rate for non-budgetary (business) organizations.
pub const CONTRIBUTION_RATE_NON_BUDGETARY: f64 = 0.046;

/// Indirect-cost overhead applied to direct costs.
pub const INDIRECT_COST_RATE: f64 = 0.07;

/// Funding intensity: share of total eligible costs claimed from the grant.
pub const FUNDING_INTENSITY_RATE: f64 = 0.85;

/// (leave_days, rate) pairs for a 5-day working week, ascending by days.
const LEAVE_RATES_5_DAY: &[(u32, f64)] = &[
    (20, 0.0863),
    (21, 0.1044),
    (22, 0.1044),
    (23, 0.1044),
    (24, 0.1044),
    (25, 0.1044),
    (26, 0.1235),
    (27, 0.1235),
    (28, 0.1235),
    (29, 0.1235),
    (30, 0.1235),
    (31, 0.1499),
    (32, 0.1499),
    (33, 0.1499),
    (34, 0.1499),
    (35, 0.1499),
    (36, 0.1499),
    (37, 0.1725),
    (38, 0.1725),
    (39, 0.1725),
    (40, 0.1889),
    (41, 0.2002),
    (42, 0.2002),
    (43, 0.2002),
    (44, 0.2002),
    (45, 0.2002),
    (46, 0.2002),
    (47, 0.2002),
    (48, 0.2002),
    (49, 0.2002),
    (50, 0.2002),
];

/// (leave_days, rate) pairs for a 6-day working week, ascending by days.
const LEAVE_RATES_6_DAY: &[(u32, f64)] = &[
    (24, 0.0863),
    (25, 0.1044),
    (26, 0.1044),
    (27, 0.1044),
    (28, 0.1044),
    (29, 0.1044),
    (30, 0.1044),
    (31, 0.1235),
    (32, 0.1235),
    (33, 0.1235),
    (34, 0.1235),
    (35, 0.1235),
    (36, 0.1235),
    (37, 0.1499),
    (38, 0.1499),
    (39, 0.1499),
    (40, 0.1499),
    (41, 0.1499),
    (42, 0.1499),
    (43, 0.1725),
    (44, 0.1725),
    (45, 0.1725),
    (46, 0.1725),
    (47, 0.1725),
    (48, 0.1889),
    (49, 0.2002),
    (50, 0.2002),
];

/// Returns the annual-leave allowance rate for a working-week length and a
/// number of annual leave days.
///
/// Working weeks other than 5 or 6 days fall back to the 5-day table. An
/// exact match on `leave_days` wins; otherwise the nearest key by absolute
/// difference is used, ties resolved by the lower key (keys are scanned in
/// ascending order). Always returns a rate.
pub fn annual_leave_rate(working_week: u32, leave_days: u32) -> f64 {
    let table = match working_week {
        6 => LEAVE_RATES_6_DAY,
        _ => LEAVE_RATES_5_DAY,
    };

    if let Some(&(_, rate)) = table.iter().find(|(days, _)| *days == leave_days) {
        return rate;
    }

    let mut best = table[0];
    for &(days, rate) in table {
        let dist = days.abs_diff(leave_days);
        if dist < best.0.abs_diff(leave_days) {
            best = (days, rate);
        }
    }
    best.1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert_eq!(annual_leave_rate(5, 20), 0.0863);
        assert_eq!(annual_leave_rate(5, 40), 0.1889);
        assert_eq!(annual_leave_rate(6, 24), 0.0863);
        assert_eq!(annual_leave_rate(6, 48), 0.1889);
    }

    #[test]
    fn test_banded_rates() {
        assert_eq!(annual_leave_rate(5, 23), 0.1044);
        assert_eq!(annual_leave_rate(5, 24), 0.1044);
        assert_eq!(annual_leave_rate(5, 25), 0.1044);
    }

    #[test]
    fn test_nearest_below_table() {
        // 19 days is below the smallest key (20); nearest is 20.
        assert_eq!(annual_leave_rate(5, 19), 0.0863);
        assert_eq!(annual_leave_rate(6, 10), 0.0863);
    }

    #[test]
    fn test_nearest_above_table() {
        // 100 days is above the largest key (50); nearest is 50.
        assert_eq!(annual_leave_rate(5, 100), 0.2002);
        assert_eq!(annual_leave_rate(6, 60), 0.2002);
    }

    #[test]
    fn test_unknown_week_falls_back_to_five_day() {
        assert_eq!(annual_leave_rate(7, 20), annual_leave_rate(5, 20));
        assert_eq!(annual_leave_rate(0, 30), annual_leave_rate(5, 30));
        assert_eq!(annual_leave_rate(40, 20), annual_leave_rate(5, 20));
    }

    #[test]
    fn test_tie_breaks_toward_lower_key() {
        // The 6-day table has no 23 key; 22 is absent too, so 24 is the only
        // candidate at distance 1. Check a genuine tie instead: for the
        // 5-day table every integer 20..=50 is a key, so construct the tie
        // below the table: distance from 19 to 20 is 1, no other key closer.
        assert_eq!(annual_leave_rate(6, 23), 0.0863);
    }

    #[test]
    fn test_tables_ascending() {
        for table in [LEAVE_RATES_5_DAY, LEAVE_RATES_6_DAY] {
            for pair in table.windows(2) {
                assert!(pair[0].0 < pair[1].0);
            }
        }
    }
}
