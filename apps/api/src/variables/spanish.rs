//! Spanish formatting used by legal documents: grouped amounts and dates in words.
//!
//! The day and month tables are the canonical wording printed on court documents.
//! Do not change a single accent without checking the templates that rely on them.

use chrono::{Datelike, NaiveDate};

/// Day-of-month names, index 0 = day 1.
const DAY_NAMES: [&str; 31] = [
    "primero",
    "dos",
    "tres",
    "cuatro",
    "cinco",
    "seis",
    "siete",
    "ocho",
    "nueve",
    "diez",
    "once",
    "doce",
    "trece",
    "catorce",
    "quince",
    "dieciséis",
    "diecisiete",
    "dieciocho",
    "diecinueve",
    "veinte",
    "veintiuno",
    "veintidós",
    "veintitrés",
    "veinticuatro",
    "veinticinco",
    "veintiséis",
    "veintisiete",
    "veintiocho",
    "veintinueve",
    "treinta",
    "treinta y uno",
];

/// Month names, index 0 = January.
const MONTH_NAMES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

const UNITS: [&str; 10] = [
    "cero", "uno", "dos", "tres", "cuatro", "cinco", "seis", "siete", "ocho", "nueve",
];

const TEENS: [&str; 10] = [
    "diez",
    "once",
    "doce",
    "trece",
    "catorce",
    "quince",
    "dieciséis",
    "diecisiete",
    "dieciocho",
    "diecinueve",
];

const TWENTIES: [&str; 10] = [
    "veinte",
    "veintiuno",
    "veintidós",
    "veintitrés",
    "veinticuatro",
    "veinticinco",
    "veintiséis",
    "veintisiete",
    "veintiocho",
    "veintinueve",
];

// index = tens digit; 0..=2 are handled by the tables above
const TENS: [&str; 10] = [
    "", "", "", "treinta", "cuarenta", "cincuenta", "sesenta", "setenta", "ochenta", "noventa",
];

const HUNDREDS: [&str; 10] = [
    "",
    "ciento",
    "doscientos",
    "trescientos",
    "cuatrocientos",
    "quinientos",
    "seiscientos",
    "setecientos",
    "ochocientos",
    "novecientos",
];

/// Formats an integer amount with `.` thousands separators and no decimals.
///
/// `12000` → `"12.000"`, `1234567` → `"1.234.567"`, `0` → `"0"`.
pub fn format_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Spells out a non-negative integer below one million.
pub fn number_to_words(n: u32) -> String {
    if n < 1000 {
        return below_thousand(n);
    }
    if n >= 1_000_000 {
        // Amounts this large are never spelled out on our documents.
        return n.to_string();
    }
    let thousands = n / 1000;
    let rest = n % 1000;
    let head = if thousands == 1 {
        "mil".to_string()
    } else {
        format!("{} mil", apocopate(&below_thousand(thousands)))
    };
    if rest == 0 {
        head
    } else {
        format!("{head} {}", below_thousand(rest))
    }
}

/// Spells out a date: `2024-03-05` → `"cinco de marzo de dos mil veinticuatro"`.
pub fn date_in_words(date: NaiveDate) -> String {
    let day = DAY_NAMES[date.day0() as usize];
    let month = MONTH_NAMES[date.month0() as usize];
    let year = u32::try_from(date.year())
        .map(number_to_words)
        .unwrap_or_else(|_| date.year().to_string());
    format!("{day} de {month} de {year}")
}

fn below_thousand(n: u32) -> String {
    debug_assert!(n < 1000);
    if n == 100 {
        return "cien".to_string();
    }
    let hundreds = (n / 100) as usize;
    let rest = n % 100;
    match (hundreds, rest) {
        (0, r) => below_hundred(r),
        (h, 0) => HUNDREDS[h].to_string(),
        (h, r) => format!("{} {}", HUNDREDS[h], below_hundred(r)),
    }
}

fn below_hundred(n: u32) -> String {
    debug_assert!(n < 100);
    let n = n as usize;
    match n {
        0..=9 => UNITS[n].to_string(),
        10..=19 => TEENS[n - 10].to_string(),
        20..=29 => TWENTIES[n - 20].to_string(),
        _ if n % 10 == 0 => TENS[n / 10].to_string(),
        _ => format!("{} y {}", TENS[n / 10], UNITS[n % 10]),
    }
}

/// "uno" shortens before "mil": veintiún mil, treinta y un mil.
fn apocopate(words: &str) -> String {
    if let Some(stem) = words.strip_suffix("veintiuno") {
        format!("{stem}veintiún")
    } else if let Some(stem) = words.strip_suffix("uno") {
        format!("{stem}un")
    } else {
        words.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount_groups_thousands() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(999), "999");
        assert_eq!(format_amount(1000), "1.000");
        assert_eq!(format_amount(12000), "12.000");
        assert_eq!(format_amount(1234567), "1.234.567");
        assert_eq!(format_amount(-45000), "-45.000");
    }

    #[test]
    fn test_number_to_words_small_numbers() {
        assert_eq!(number_to_words(0), "cero");
        assert_eq!(number_to_words(16), "dieciséis");
        assert_eq!(number_to_words(22), "veintidós");
        assert_eq!(number_to_words(31), "treinta y uno");
        assert_eq!(number_to_words(100), "cien");
        assert_eq!(number_to_words(101), "ciento uno");
        assert_eq!(number_to_words(580), "quinientos ochenta");
    }

    #[test]
    fn test_number_to_words_thousands() {
        assert_eq!(number_to_words(1000), "mil");
        assert_eq!(number_to_words(1999), "mil novecientos noventa y nueve");
        assert_eq!(number_to_words(2024), "dos mil veinticuatro");
        assert_eq!(number_to_words(21000), "veintiún mil");
        assert_eq!(number_to_words(31500), "treinta y un mil quinientos");
    }

    #[test]
    fn test_date_in_words_uses_canonical_tables() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(date_in_words(date), "cinco de marzo de dos mil veinticuatro");

        let first = NaiveDate::from_ymd_opt(2023, 9, 1).unwrap();
        assert_eq!(date_in_words(first), "primero de septiembre de dos mil veintitrés");

        let last = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        assert_eq!(
            date_in_words(last),
            "treinta y uno de diciembre de dos mil veinticinco"
        );
    }
}
