//! Column letters and column-name normalization
//!
//! Column letters are bijective base-26 numerals: there is no zero digit, so
//! `A` = 1, `Z` = 26, `AA` = 27, `AZ` = 52, `BA` = 53.

use crate::error::{SheetError, SheetResult};
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Convert column letters to a 1-based column number (`A` → 1, `AA` → 27)
pub fn column_letters_to_number(letters: &str) -> SheetResult<u32> {
    if letters.is_empty() {
        return Err(SheetError::InvalidColumnName(letters.to_string()));
    }

    let mut number: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_uppercase() {
            return Err(SheetError::InvalidColumnName(letters.to_string()));
        }
        let digit = u32::from(c as u8 - b'A') + 1;
        number = number
            .checked_mul(26)
            .and_then(|n| n.checked_add(digit))
            .ok_or_else(|| SheetError::InvalidColumnName(letters.to_string()))?;
    }

    Ok(number)
}

/// Convert a 1-based column number to column letters (1 → `A`, 27 → `AA`)
pub fn column_number_to_letters(number: u32) -> SheetResult<String> {
    if number == 0 {
        return Err(SheetError::InvalidColumnNumber(number));
    }

    let mut result = String::new();
    let mut dividend = number;
    while dividend > 0 {
        let modulo = (dividend - 1) % 26;
        result.insert(0, (b'A' + modulo as u8) as char);
        dividend = (dividend - modulo) / 26;
    }

    Ok(result)
}

/// Transliterate to `[A-Za-z0-9._-]`: diacritics are stripped and every other
/// run of characters collapses to a single `_`. Leading/trailing `_` are trimmed.
pub fn to_ascii(value: &str) -> SheetResult<String> {
    Ok(transliterate(value, &disallowed_chars()?))
}

fn disallowed_chars() -> SheetResult<Regex> {
    Regex::new(r"[^A-Za-z0-9._-]+").map_err(|e| SheetError::Config(format!("Regex error: {}", e)))
}

fn transliterate(value: &str, disallowed: &Regex) -> String {
    let stripped: String = value.nfd().filter(|c| !is_combining_mark(*c)).collect();
    let replaced = disallowed.replace_all(&stripped, "_");
    replaced.trim_matches('_').to_string()
}

/// Normalize raw header cells into unique column names.
///
/// Empty names become `column-<n>` (1-based position); repeated names get
/// `-1`, `-2`, ... suffixes in left-to-right order.
pub fn normalize_columns<S: AsRef<str>>(raw: &[S]) -> SheetResult<Vec<String>> {
    let disallowed = disallowed_chars()?;
    let mut output: Vec<String> = Vec::with_capacity(raw.len());

    for (index, cell) in raw.iter().enumerate() {
        let mut name = transliterate(cell.as_ref(), &disallowed);
        if name.is_empty() {
            name = format!("column-{}", index + 1);
        }

        let original = name.clone();
        let mut suffix = 1;
        while output.contains(&name) {
            name = format!("{}-{}", original, suffix);
            suffix += 1;
        }

        output.push(name);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_to_number() {
        assert_eq!(column_letters_to_number("A").unwrap(), 1);
        assert_eq!(column_letters_to_number("B").unwrap(), 2);
        assert_eq!(column_letters_to_number("Z").unwrap(), 26);
        assert_eq!(column_letters_to_number("AA").unwrap(), 27);
        assert_eq!(column_letters_to_number("AZ").unwrap(), 52);
        assert_eq!(column_letters_to_number("BA").unwrap(), 53);
        assert_eq!(column_letters_to_number("ZZ").unwrap(), 702);
        assert_eq!(column_letters_to_number("AAA").unwrap(), 703);
        assert_eq!(column_letters_to_number("XFD").unwrap(), 16384);
    }

    #[test]
    fn test_letters_to_number_invalid() {
        assert!(matches!(
            column_letters_to_number(""),
            Err(SheetError::InvalidColumnName(_))
        ));
        assert!(matches!(
            column_letters_to_number("a"),
            Err(SheetError::InvalidColumnName(_))
        ));
        assert!(matches!(
            column_letters_to_number("A1"),
            Err(SheetError::InvalidColumnName(_))
        ));
        assert!(matches!(
            column_letters_to_number("Č"),
            Err(SheetError::InvalidColumnName(_))
        ));
    }

    #[test]
    fn test_letters_to_number_overflow() {
        let long = "Z".repeat(10);
        assert!(matches!(
            column_letters_to_number(&long),
            Err(SheetError::InvalidColumnName(_))
        ));
    }

    #[test]
    fn test_number_to_letters() {
        assert_eq!(column_number_to_letters(1).unwrap(), "A");
        assert_eq!(column_number_to_letters(26).unwrap(), "Z");
        assert_eq!(column_number_to_letters(27).unwrap(), "AA");
        assert_eq!(column_number_to_letters(52).unwrap(), "AZ");
        assert_eq!(column_number_to_letters(53).unwrap(), "BA");
        assert_eq!(column_number_to_letters(702).unwrap(), "ZZ");
        assert_eq!(column_number_to_letters(703).unwrap(), "AAA");
        assert!(matches!(
            column_number_to_letters(0),
            Err(SheetError::InvalidColumnNumber(0))
        ));
    }

    #[test]
    fn test_round_trip_numbers() {
        for n in 1..=20_000u32 {
            let letters = column_number_to_letters(n).unwrap();
            assert_eq!(column_letters_to_number(&letters).unwrap(), n);
        }
    }

    #[test]
    fn test_normalize_matches_to_ascii_per_cell() {
        let raw = ["Col 1", "Žluťoučký kůň", "  (price) ", "a.b-c_d", "Discount Band"];
        let expected: Vec<String> = raw.iter().map(|cell| to_ascii(cell).unwrap()).collect();
        assert_eq!(normalize_columns(&raw).unwrap(), expected);
    }

    #[test]
    fn test_to_ascii() {
        assert_eq!(to_ascii("Col 1").unwrap(), "Col_1");
        assert_eq!(to_ascii("Discount Band").unwrap(), "Discount_Band");
        assert_eq!(to_ascii("Žluťoučký kůň").unwrap(), "Zlutoucky_kun");
        assert_eq!(to_ascii("  (price) ").unwrap(), "price");
        assert_eq!(to_ascii("a.b-c_d").unwrap(), "a.b-c_d");
        assert_eq!(to_ascii("###").unwrap(), "");
    }

    #[test]
    fn test_normalize_empty_names() {
        assert_eq!(
            normalize_columns(&["", "b", ""]).unwrap(),
            vec!["column-1", "b", "column-3"]
        );
    }

    #[test]
    fn test_normalize_duplicates() {
        assert_eq!(
            normalize_columns(&["col1", "col1", "col1"]).unwrap(),
            vec!["col1", "col1-1", "col1-2"]
        );
    }

    #[test]
    fn test_normalize_duplicate_after_transliteration() {
        assert_eq!(
            normalize_columns(&["Duplicate", "Duplicate", "Dúplicate"]).unwrap(),
            vec!["Duplicate", "Duplicate-1", "Duplicate-2"]
        );
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let raw = ["Segment", "", "Country", "Units Sold"];
        assert_eq!(
            normalize_columns(&raw).unwrap(),
            normalize_columns(&raw).unwrap()
        );
    }
}
