use std::sync::Arc;

use ledgerlens_core::{Category, CategoryTaxonomy, Money, OTHER_CATEGORY};
use serde::{Deserialize, Serialize};

/// Keyword hits at which confidence saturates at 1.0.
pub const SATURATION_HITS: usize = 3;

/// Most records returned by [`KeywordCategorizer::similar_transactions`].
pub const MAX_SIMILAR: usize = 3;

/// Result of rule-based categorization.
///
/// `confidence` is keyword-match density, not a probability. It is 0.0
/// exactly when no keyword matched, in which case `category` is `other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPrediction {
    pub category: String,
    pub confidence: f32,
}

impl CategoryPrediction {
    pub fn other() -> Self {
        Self { category: OTHER_CATEGORY.to_string(), confidence: 0.0 }
    }

    pub fn is_other(&self) -> bool {
        self.category == OTHER_CATEGORY
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub description: String,
    pub amount: Money,
}

pub struct KeywordCategorizer {
    taxonomy: Arc<CategoryTaxonomy>,
}

impl Default for KeywordCategorizer {
    fn default() -> Self {
        Self::new(CategoryTaxonomy::builtin())
    }
}

impl KeywordCategorizer {
    pub fn new(taxonomy: Arc<CategoryTaxonomy>) -> Self {
        Self { taxonomy }
    }

    pub fn taxonomy(&self) -> &Arc<CategoryTaxonomy> {
        &self.taxonomy
    }

    /// Pick the category whose keywords occur most often in `description`.
    ///
    /// Ties go to the category declared first. `amount` does not affect scoring.
    pub fn predict_category(&self, description: &str, _amount: Money) -> CategoryPrediction {
        if description.is_empty() {
            return CategoryPrediction::other();
        }

        let text = description.to_lowercase();
        let mut best: Option<(&Category, usize)> = None;
        for category in self.taxonomy.categories() {
            let hits = category.count_matches(&text);
            if hits > best.map_or(0, |(_, top)| top) {
                best = Some((category, hits));
            }
        }

        match best {
            Some((category, hits)) => CategoryPrediction {
                category: category.id.clone(),
                confidence: confidence_for(hits),
            },
            None => CategoryPrediction::other(),
        }
    }

    /// Up to [`MAX_SIMILAR`] records from `history` predicted into the same
    /// category as `target`, in history order. Empty when `target` is `other`.
    pub fn similar_transactions<'a>(
        &self,
        history: &'a [TransactionRecord],
        target: &TransactionRecord,
    ) -> Vec<&'a TransactionRecord> {
        let wanted = self.predict_category(&target.description, target.amount);
        self.matching(history, &wanted.category, Some(target.id))
    }

    /// Up to [`MAX_SIMILAR`] records from `history` predicted into `category`.
    /// Empty for `other`.
    pub fn in_category<'a>(&self, history: &'a [TransactionRecord], category: &str) -> Vec<&'a TransactionRecord> {
        self.matching(history, category, None)
    }

    fn matching<'a>(
        &self,
        history: &'a [TransactionRecord],
        category: &str,
        skip_id: Option<i64>,
    ) -> Vec<&'a TransactionRecord> {
        if category == OTHER_CATEGORY {
            return vec![];
        }
        history
            .iter()
            .filter(|tx| Some(tx.id) != skip_id)
            .filter(|tx| self.predict_category(&tx.description, tx.amount).category == category)
            .take(MAX_SIMILAR)
            .collect()
    }
}

fn confidence_for(hits: usize) -> f32 {
    (hits as f32 / SATURATION_HITS as f32).min(1.0)
}
