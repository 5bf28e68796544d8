use ledgerlens_core::{Money, ReceiptDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub amount: Money,
}

/// Structured fields pulled from one receipt's OCR text.
///
/// Every field is independently optional; a missing field means nothing
/// usable was found, not that extraction failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptFields {
    pub date: Option<ReceiptDate>,
    /// Inferred payment total.
    pub total_amount: Option<Money>,
    pub merchant: Option<String>,
    pub line_items: Vec<LineItem>,
    /// The OCR text this record was extracted from, kept verbatim.
    pub raw_text: String,
}

impl ReceiptFields {
    pub fn empty(raw_text: impl Into<String>) -> Self {
        Self {
            date: None,
            total_amount: None,
            merchant: None,
            line_items: vec![],
            raw_text: raw_text.into(),
        }
    }

    /// True when no field at all could be extracted.
    pub fn is_blank(&self) -> bool {
        self.date.is_none()
            && self.total_amount.is_none()
            && self.merchant.is_none()
            && self.line_items.is_empty()
    }
}
