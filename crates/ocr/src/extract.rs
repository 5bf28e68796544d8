use ledgerlens_core::patterns::{
    self, amount_tokens, is_item_excluded, is_total_line, parse_amount, MERCHANT_MIN_CHARS,
    MERCHANT_SCAN_LINES,
};
use ledgerlens_core::{Money, ReceiptDate};

use crate::types::{LineItem, ReceiptFields};

// ── Public extraction API ─────────────────────────────────────────────────────

pub struct Extractor;

impl Extractor {
    /// Extract structured fields from raw OCR text.
    ///
    /// Never fails: each field independently falls back to "absent".
    pub fn extract(ocr_text: &str) -> ReceiptFields {
        let fields = ReceiptFields {
            date: Self::extract_date(ocr_text),
            total_amount: Self::extract_total(ocr_text),
            merchant: Self::extract_merchant(ocr_text),
            line_items: Self::extract_line_items(ocr_text),
            raw_text: ocr_text.to_string(),
        };

        tracing::debug!(
            date = fields.date.is_some(),
            total = fields.total_amount.is_some(),
            merchant = fields.merchant.is_some(),
            items = fields.line_items.len(),
            "Extracted receipt fields"
        );
        fields
    }

    // ── Date ─────────────────────────────────────────────────────────────────

    fn extract_date(text: &str) -> Option<ReceiptDate> {
        patterns::find_date(text)
    }

    // ── Total ─────────────────────────────────────────────────────────────────

    fn extract_total(text: &str) -> Option<Money> {
        // First indicator line carrying a readable amount wins; the rightmost
        // amount on that line is taken.
        let labeled = text
            .lines()
            .filter(|l| is_total_line(l))
            .find_map(|line| parse_amount(amount_tokens(line).last()?));
        if labeled.is_some() {
            return labeled;
        }

        // Fall back to the largest amount anywhere on the receipt.
        text.lines()
            .flat_map(amount_tokens)
            .filter_map(parse_amount)
            .max()
    }

    // ── Line items ────────────────────────────────────────────────────────────

    fn extract_line_items(text: &str) -> Vec<LineItem> {
        text.lines()
            .filter(|l| !l.trim().is_empty())
            .filter(|l| !is_item_excluded(l))
            .filter_map(|line| {
                let token = amount_tokens(line).last()?;
                let amount = parse_amount(token)?;
                let description = line.replace(token, "").trim().to_string();
                if description.is_empty() {
                    return None;
                }
                Some(LineItem { description, amount })
            })
            .collect()
    }

    // ── Merchant ──────────────────────────────────────────────────────────────

    fn extract_merchant(text: &str) -> Option<String> {
        text.lines()
            .take(MERCHANT_SCAN_LINES)
            .map(str::trim)
            .find(|l| l.chars().count() > MERCHANT_MIN_CHARS && !l.chars().any(char::is_numeric))
            .map(str::to_string)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(c: i64) -> Option<Money> {
        Some(Money::from_cents(c))
    }

    // ── Empty / garbage ───────────────────────────────────────────────────────

    #[test]
    fn empty_text_yields_all_absent() {
        let r = Extractor::extract("");
        assert!(r.is_blank());
        assert_eq!(r.raw_text, "");
    }

    #[test]
    fn no_panic_on_garbage_input() {
        let r = Extractor::extract("!@#$%^&*()\n\0\x01\x02\n$.\n..00");
        assert_eq!(r.raw_text, "!@#$%^&*()\n\0\x01\x02\n$.\n..00");
    }

    #[test]
    fn raw_text_is_retained() {
        let text = "CORNER CAFE\nLatte 4.50\n";
        assert_eq!(Extractor::extract(text).raw_text, text);
    }

    // ── Date ─────────────────────────────────────────────────────────────────

    #[test]
    fn date_dash_us_is_canonicalized() {
        let r = Extractor::extract("CORNER CAFE\n03-15-2024\nTotal 4.50");
        assert_eq!(r.date.unwrap().to_string(), "2024-03-15");
    }

    #[test]
    fn date_iso_passes_through() {
        let r = Extractor::extract("AMAZON\nOrder 2024-03-15\nTotal $49.99");
        assert_eq!(r.date.unwrap().to_string(), "2024-03-15");
    }

    // ── Total ─────────────────────────────────────────────────────────────────

    #[test]
    fn total_labeled_exact_decimal() {
        let r = Extractor::extract("STORE\nTotal: $1234.56");
        assert_eq!(r.total_amount, cents(123456));
    }

    #[test]
    fn total_thousands_separator_is_not_atomic() {
        let r = Extractor::extract("STORE\nTotal: $1,234.56");
        assert_eq!(r.total_amount, cents(23456));
    }

    #[test]
    fn total_takes_last_amount_on_line() {
        let r = Extractor::extract("TOTAL 2 items 10.00 12.50");
        assert_eq!(r.total_amount, cents(1250));
    }

    #[test]
    fn total_first_indicator_line_wins() {
        // SUBTOTAL contains TOTAL, so it is the first candidate.
        let r = Extractor::extract("Subtotal 10.00\nTax 0.80\nTotal 10.80");
        assert_eq!(r.total_amount, cents(1000));
    }

    #[test]
    fn total_skips_indicator_line_without_amount() {
        let r = Extractor::extract("TOTAL\nAmount due: 8.00\nChange 92.00");
        assert_eq!(r.total_amount, cents(800));
    }

    #[test]
    fn total_falls_back_to_largest_amount() {
        let r = Extractor::extract("STORE\nCoffee 12.00\nSandwich 45.50\nCookie 3.25");
        assert_eq!(r.total_amount, cents(4550));
    }

    #[test]
    fn total_fallback_when_indicator_has_no_amount() {
        let r = Extractor::extract("TOTAL\n5.00\n7.00");
        assert_eq!(r.total_amount, cents(700));
    }

    #[test]
    fn total_absent_without_amounts() {
        assert_eq!(Extractor::extract("THANK YOU\nCome again").total_amount, None);
    }

    // ── Line items ────────────────────────────────────────────────────────────

    #[test]
    fn line_items_skip_stoplist_lines() {
        let text = "Coffee $3.50\nBagel 2.25\n\nSUBTOTAL 5.75\nTAX 0.46\nTOTAL 6.21";
        let items = Extractor::extract(text).line_items;
        assert_eq!(
            items,
            vec![
                LineItem { description: "Coffee".into(), amount: Money::from_cents(350) },
                LineItem { description: "Bagel".into(), amount: Money::from_cents(225) },
            ]
        );
    }

    #[test]
    fn line_item_without_description_is_skipped() {
        let items = Extractor::extract("$3.50\n   \nMuffin 2.00").line_items;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "Muffin");
    }

    #[test]
    fn line_item_removes_every_copy_of_amount_token() {
        let items = Extractor::extract("5.00 x2 5.00").line_items;
        assert_eq!(items[0].description, "x2");
        assert_eq!(items[0].amount, Money::from_cents(500));
    }

    #[test]
    fn line_item_uses_last_amount() {
        let items = Extractor::extract("Eggs 2 @ 1.50 3.00").line_items;
        assert_eq!(items[0].description, "Eggs 2 @ 1.50");
        assert_eq!(items[0].amount, Money::from_cents(300));
    }

    // ── Merchant ──────────────────────────────────────────────────────────────

    #[test]
    fn merchant_first_qualifying_line() {
        let r = Extractor::extract("\n123 Main St\nJOE'S DINER\nSTARBUCKS\nTotal 5.00");
        assert_eq!(r.merchant.as_deref(), Some("JOE'S DINER"));
    }

    #[test]
    fn merchant_requires_more_than_three_chars() {
        let r = Extractor::extract("ABC\nDELI\n");
        assert_eq!(r.merchant.as_deref(), Some("DELI"));
    }

    #[test]
    fn merchant_on_fifth_line_is_found() {
        let text = "1\n2\n3\n4\nFIFTH STREET MARKET\nTotal 1.00";
        assert_eq!(Extractor::extract(text).merchant.as_deref(), Some("FIFTH STREET MARKET"));
    }

    #[test]
    fn merchant_on_sixth_line_is_ignored() {
        let text = "1\n2\n3\n4\n5\nSIXTH STREET MARKET";
        assert_eq!(Extractor::extract(text).merchant, None);
    }

    #[test]
    fn merchant_is_trimmed() {
        let r = Extractor::extract("   Blue Bottle Coffee   \n");
        assert_eq!(r.merchant.as_deref(), Some("Blue Bottle Coffee"));
    }

    // ── Whole receipt ─────────────────────────────────────────────────────────

    #[test]
    fn typical_receipt() {
        let text = "\
GREEN LEAF GROCERY
42 Elm Street
Date: 01/15/2024  Time: 14:02
Apples 3.99
Milk 2.49
SUBTOTAL 6.48
TAX 0.52
TOTAL $7.00
";
        let r = Extractor::extract(text);
        assert_eq!(r.merchant.as_deref(), Some("GREEN LEAF GROCERY"));
        assert_eq!(r.date.unwrap().to_string(), "2024-01-15");
        // SUBTOTAL is the first indicator line.
        assert_eq!(r.total_amount, cents(648));
        assert_eq!(r.line_items.len(), 2);
        assert_eq!(r.line_items[1].amount, Money::from_cents(249));
    }
}
