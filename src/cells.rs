//! A1-style cell addressing helpers shared by the form cell maps.

use crate::error::{FormFillError, Result};

/// Converts a 1-based column index to its letter form (1 -> "A", 27 -> "AA").
pub fn column_letter(mut index: u32) -> String {
    debug_assert!(index >= 1);
    let mut letters = Vec::new();
    while index > 0 {
        let rem = ((index - 1) % 26) as u8;
        letters.push(b'A' + rem);
        index = (index - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).expect("ASCII letters")
}

/// Converts a column letter back to its 1-based index.
pub fn column_index(letters: &str) -> Result<u32> {
    if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(FormFillError::InvalidCoordinate(letters.to_string()));
    }
    let mut index = 0u32;
    for b in letters.bytes() {
        index = index * 26 + u32::from(b - b'A') + 1;
    }
    Ok(index)
}

/// Builds an A1 coordinate from a column letter and a 1-based row.
pub fn coord(column: &str, row: u32) -> String {
    format!("{}{}", column, row)
}

/// Builds a spreadsheet-native SUM formula over a dynamic row range sized to
/// the actual entry count, e.g. `sum_formula("J", 15, 10)` -> `=SUM(J15:J24)`.
pub fn sum_formula(column: &str, start_row: u32, count: u32) -> String {
    let end_row = start_row + count.max(1) - 1;
    format!("=SUM({col}{start_row}:{col}{end_row})", col = column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letter_roundtrip() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(2), "B");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(28), "AB");

        for index in 1..=100 {
            assert_eq!(column_index(&column_letter(index)).unwrap(), index);
        }
    }

    #[test]
    fn test_column_index_rejects_garbage() {
        assert!(column_index("").is_err());
        assert!(column_index("a1").is_err());
        assert!(column_index("1A").is_err());
    }

    #[test]
    fn test_coord() {
        assert_eq!(coord("B", 15), "B15");
        assert_eq!(coord("AA", 3), "AA3");
    }

    #[test]
    fn test_sum_formula_range() {
        assert_eq!(sum_formula("J", 15, 10), "=SUM(J15:J24)");
        assert_eq!(sum_formula("D", 5, 1), "=SUM(D5:D5)");
        // A zero count still yields a one-row range rather than an
        // inverted one.
        assert_eq!(sum_formula("K", 15, 0), "=SUM(K15:K15)");
    }
}
