use ledgerlens_categorize::{CategorizationService, CategoryDecision, TransactionRecord};
use ledgerlens_core::{Money, ReceiptDate};
use ledgerlens_ocr::ReceiptFields;
use serde::{Deserialize, Serialize};

const UNKNOWN_MERCHANT: &str = "Unknown Merchant";

/// A transaction ready to be stored by whatever owns persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub description: String,
    pub amount: Money,
    pub date: Option<ReceiptDate>,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptAnalysis {
    pub receipt: ReceiptFields,
    pub category: CategoryDecision,
    pub category_name: Option<String>,
    /// Earlier transactions in the receipt's category.
    pub similar_transactions: Vec<TransactionRecord>,
    pub budget_impact: Option<Money>,
    pub draft: Option<TransactionDraft>,
}

/// Categorize a receipt by its merchant and total, and pick out the
/// transactions in `history` that share its category.
pub async fn analyze_receipt(
    receipt: ReceiptFields,
    service: &CategorizationService,
    history: &[TransactionRecord],
) -> ReceiptAnalysis {
    let description = receipt.merchant.as_deref().unwrap_or_default();
    let amount = receipt.total_amount.unwrap_or_default();

    let category = service.categorize(description, amount).await;
    let category_name = service.taxonomy().display_name(&category.category).map(str::to_string);
    tracing::info!(
        category = %category.category,
        source = ?category.source,
        confidence = category.confidence,
        "Receipt categorized"
    );

    let similar_transactions = service
        .related(history, &category.category)
        .into_iter()
        .cloned()
        .collect();
    let draft = draft_transaction(&receipt, &category);
    ReceiptAnalysis {
        budget_impact: receipt.total_amount,
        receipt,
        category,
        category_name,
        similar_transactions,
        draft,
    }
}

/// Only receipts with a total become transactions.
pub fn draft_transaction(receipt: &ReceiptFields, decision: &CategoryDecision) -> Option<TransactionDraft> {
    let amount = receipt.total_amount?;
    let merchant = receipt.merchant.as_deref().unwrap_or(UNKNOWN_MERCHANT);
    Some(TransactionDraft {
        description: format!("Receipt from {merchant}"),
        amount,
        date: receipt.date,
        category: decision.category.clone(),
    })
}

/// Transactions similar to the record with `id`, or `None` if `history` has no such record.
pub fn similar_in_history(
    service: &CategorizationService,
    history: &[TransactionRecord],
    id: i64,
) -> Option<Vec<TransactionRecord>> {
    let target = history.iter().find(|tx| tx.id == id)?;
    Some(service.similar(history, target).into_iter().cloned().collect())
}
