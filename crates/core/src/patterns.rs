//! Recognizers shared by receipt extraction: date formats, currency amounts,
//! total-line indicators and the line-item stoplist.
//!
//! Every pattern is compiled once on first use and reused for the lifetime of
//! the process.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::money::Money;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_amount, r"\$?[0-9]+\.[0-9]{2}");

// ── Dates ────────────────────────────────────────────────────────────────────

/// Field order of a date format as written on the receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOrder {
    MonthDayYear,
    YearMonthDay,
}

#[derive(Debug, Clone, Copy)]
pub struct DateFormat {
    pub label: &'static str,
    pub pattern: &'static str,
    pub order: FieldOrder,
}

/// Tried in this order; the first format matching anywhere in the text wins.
/// Only ASCII digits are recognized.
pub const DATE_FORMATS: &[DateFormat] = &[
    DateFormat { label: "MM/DD/YYYY", pattern: r"([0-9]{2})/([0-9]{2})/([0-9]{4})", order: FieldOrder::MonthDayYear },
    DateFormat { label: "MM-DD-YYYY", pattern: r"([0-9]{2})-([0-9]{2})-([0-9]{4})", order: FieldOrder::MonthDayYear },
    DateFormat { label: "YYYY/MM/DD", pattern: r"([0-9]{4})/([0-9]{2})/([0-9]{2})", order: FieldOrder::YearMonthDay },
    DateFormat { label: "YYYY-MM-DD", pattern: r"([0-9]{4})-([0-9]{2})-([0-9]{2})", order: FieldOrder::YearMonthDay },
];

fn date_recognizers() -> &'static [(DateFormat, Regex)] {
    static R: OnceLock<Vec<(DateFormat, Regex)>> = OnceLock::new();
    R.get_or_init(|| {
        DATE_FORMATS
            .iter()
            .map(|f| (*f, Regex::new(f.pattern).expect("invalid date regex")))
            .collect()
    })
}

/// A receipt date in canonical year-month-day order.
///
/// Components are kept exactly as read: month 13 or day 45 are representable.
/// Use [`ReceiptDate::to_naive_date`] to get a calendar-checked date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReceiptDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl ReceiptDate {
    pub fn new(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    /// `None` if the components do not name a real calendar day.
    pub fn to_naive_date(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(i32::from(self.year), u32::from(self.month), u32::from(self.day))
    }

    fn from_parts(order: FieldOrder, a: &str, b: &str, c: &str) -> Option<Self> {
        match order {
            FieldOrder::MonthDayYear => Some(Self::new(c.parse().ok()?, a.parse().ok()?, b.parse().ok()?)),
            FieldOrder::YearMonthDay => Some(Self::new(a.parse().ok()?, b.parse().ok()?, c.parse().ok()?)),
        }
    }
}

impl fmt::Display for ReceiptDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for ReceiptDate {
    type Err = String;

    /// Parses the canonical `YYYY-MM-DD` form without calendar validation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(3, '-');
        let (Some(y), Some(m), Some(d)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(format!("Invalid date: '{s}'"));
        };
        ReceiptDate::from_parts(FieldOrder::YearMonthDay, y, m, d)
            .ok_or_else(|| format!("Invalid date: '{s}'"))
    }
}

impl Serialize for ReceiptDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReceiptDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Finds the first date in `text`, trying [`DATE_FORMATS`] in priority order.
/// A match whose digits cannot be read falls through to the next format.
pub fn find_date(text: &str) -> Option<ReceiptDate> {
    date_recognizers().iter().find_map(|(format, re)| {
        let c = re.captures(text)?;
        ReceiptDate::from_parts(format.order, c.get(1)?.as_str(), c.get(2)?.as_str(), c.get(3)?.as_str())
    })
}

// ── Amounts ──────────────────────────────────────────────────────────────────

/// Every amount token in `line`, left to right. Thousands separators are not
/// understood: `1,234.56` yields `234.56`.
pub fn amount_tokens(line: &str) -> impl Iterator<Item = &str> {
    re_amount().find_iter(line).map(|m| m.as_str())
}

/// Parse an amount token such as `$12.50` or `12.50`.
pub fn parse_amount(token: &str) -> Option<Money> {
    let digits = token.strip_prefix('$').unwrap_or(token);
    Decimal::from_str(digits).ok().map(Money::from_decimal)
}

// ── Line classification ──────────────────────────────────────────────────────

/// Substrings marking a line as stating the payment total. Compared case-insensitively.
pub const TOTAL_INDICATORS: &[&str] = &["TOTAL", "Total:", "Amount Due:", "AMOUNT"];

/// Lines containing any of these (case-insensitive) are never line items.
pub const ITEM_STOPLIST: &[&str] = &["TOTAL", "SUBTOTAL", "TAX", "DATE", "TIME"];

/// Only this many leading lines are considered when looking for the merchant.
pub const MERCHANT_SCAN_LINES: usize = 5;

/// A merchant candidate must be longer than this many characters.
pub const MERCHANT_MIN_CHARS: usize = 3;

fn contains_any_upper(line: &str, needles: &[&str]) -> bool {
    let upper = line.to_uppercase();
    needles.iter().any(|n| upper.contains(&n.to_uppercase()))
}

pub fn is_total_line(line: &str) -> bool {
    contains_any_upper(line, TOTAL_INDICATORS)
}

pub fn is_item_excluded(line: &str) -> bool {
    contains_any_upper(line, ITEM_STOPLIST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_us_slash_reordered() {
        assert_eq!(find_date("Visit 03/15/2024 thanks"), Some(ReceiptDate::new(2024, 3, 15)));
    }

    #[test]
    fn date_us_dash_reordered() {
        assert_eq!(find_date("03-15-2024").unwrap().to_string(), "2024-03-15");
    }

    #[test]
    fn date_iso_unchanged() {
        assert_eq!(find_date("2024-03-15").unwrap().to_string(), "2024-03-15");
    }

    #[test]
    fn date_year_first_slash_canonicalized() {
        assert_eq!(find_date("2024/03/15").unwrap().to_string(), "2024-03-15");
    }

    #[test]
    fn date_priority_beats_position() {
        // The ISO date comes first in the text but MM/DD/YYYY is tried first.
        let text = "2023-12-31\n01/02/2024";
        assert_eq!(find_date(text), Some(ReceiptDate::new(2024, 1, 2)));
    }

    #[test]
    fn date_month_out_of_range_is_kept() {
        let d = find_date("13/45/2024").unwrap();
        assert_eq!(d.to_string(), "2024-13-45");
        assert!(d.to_naive_date().is_none());
    }

    #[test]
    fn date_absent() {
        assert_eq!(find_date("no date here 1/2/24"), None);
    }

    #[test]
    fn receipt_date_serde_as_string() {
        let d = ReceiptDate::new(2024, 3, 5);
        assert_eq!(serde_json::to_string(&d).unwrap(), "\"2024-03-05\"");
        let back: ReceiptDate = serde_json::from_str("\"2024-03-05\"").unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn amount_tokens_in_order() {
        let tokens: Vec<_> = amount_tokens("2 @ $3.50 = 7.00").collect();
        assert_eq!(tokens, vec!["$3.50", "7.00"]);
    }

    #[test]
    fn amount_thousands_separator_not_atomic() {
        let tokens: Vec<_> = amount_tokens("$1,234.56").collect();
        assert_eq!(tokens, vec!["234.56"]);
    }

    #[test]
    fn amount_requires_two_fraction_digits() {
        assert_eq!(amount_tokens("$5 and 4.5").count(), 0);
    }

    #[test]
    fn parse_amount_strips_symbol() {
        assert_eq!(parse_amount("$1234.56"), Some(Money::from_cents(123456)));
        assert_eq!(parse_amount("0.99"), Some(Money::from_cents(99)));
    }

    #[test]
    fn total_line_case_insensitive() {
        assert!(is_total_line("Grand total 9.99"));
        assert!(is_total_line("Amount due: 9.99"));
        assert!(is_total_line("SUBTOTAL 9.99"));
        assert!(!is_total_line("Coffee 3.50"));
    }

    #[test]
    fn stoplist_matches_substrings() {
        assert!(is_item_excluded("Sales Tax 0.80"));
        assert!(is_item_excluded("Time: 12:30"));
        assert!(!is_item_excluded("Bagel 2.25"));
    }

    #[test]
    fn non_ascii_digits_are_not_recognized() {
        assert_eq!(find_date("\u{0661}\u{0662}/\u{0662}\u{0665}/\u{0662}\u{0660}\u{0662}\u{0664}"), None);
        assert_eq!(amount_tokens("Total \u{0661}\u{0662}.\u{0665}\u{0660}").count(), 0);
        assert_eq!(amount_tokens("Total \u{0661}\u{0662}.\u{0665}\u{0660} 12.50").collect::<Vec<_>>(), vec!["12.50"]);
    }
}
