//! A1 Notation Helpers
//!
//! Converts 1-based grid coordinates into the A1 ranges the Sheets API
//! expects.

/// Convert a 1-based column index to its letter form (1 → A, 27 → AA).
pub fn column_letter(mut index: usize) -> String {
    debug_assert!(index >= 1, "column indices are 1-based");
    let mut letters = Vec::new();
    while index > 0 {
        index -= 1;
        letters.push(b'A' + (index % 26) as u8);
        index /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Quote a worksheet title for use in a range ('...' with '' escaping).
pub fn quote_sheet(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Range for a single cell, e.g. `'Blog'!A5`.
pub fn cell_range(sheet: &str, column: usize, row: usize) -> String {
    format!("{}!{}{}", quote_sheet(sheet), column_letter(column), row)
}

/// Range covering `rows` cells of one column starting at row 1,
/// e.g. `'Blog'!C1:C100`.
pub fn column_range(sheet: &str, column: usize, rows: usize) -> String {
    let letter = column_letter(column);
    format!("{}!{}1:{}{}", quote_sheet(sheet), letter, letter, rows.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letter_single() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(2), "B");
        assert_eq!(column_letter(26), "Z");
    }

    #[test]
    fn test_column_letter_multi() {
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(52), "AZ");
        assert_eq!(column_letter(53), "BA");
        assert_eq!(column_letter(702), "ZZ");
        assert_eq!(column_letter(703), "AAA");
    }

    #[test]
    fn test_cell_range() {
        assert_eq!(cell_range("Blog", 1, 5), "'Blog'!A5");
    }

    #[test]
    fn test_column_range() {
        assert_eq!(column_range("Blog", 3, 100), "'Blog'!C1:C100");
    }

    #[test]
    fn test_sheet_title_quoting() {
        assert_eq!(cell_range("It's Blog", 1, 1), "'It''s Blog'!A1");
        assert_eq!(column_range("会社ブログ", 2, 3), "'会社ブログ'!B1:B3");
    }
}
