use std::sync::Arc;

use ledgerlens_core::{CategoryTaxonomy, Money, OTHER_CATEGORY};
use serde::{Deserialize, Serialize};

use crate::keyword::{CategoryPrediction, KeywordCategorizer, TransactionRecord};
use crate::model::{CompletionBackend, ModelCategorizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// Local keyword matching.
    Keyword,
    /// The external model named a known category.
    Model,
    /// Neither produced a category.
    Fallback,
}

/// Final categorization outcome. `confidence` is the keyword confidence, so
/// it is 0.0 for anything not decided by keywords.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDecision {
    pub category: String,
    pub confidence: f32,
    pub source: DecisionSource,
}

impl CategoryDecision {
    fn fallback() -> Self {
        Self { category: OTHER_CATEGORY.to_string(), confidence: 0.0, source: DecisionSource::Fallback }
    }
}

/// Keyword categorization with optional escalation to an external model
/// when no keyword matched.
pub struct CategorizationService {
    keywords: KeywordCategorizer,
    model: Option<ModelCategorizer>,
}

impl CategorizationService {
    pub fn new(taxonomy: Arc<CategoryTaxonomy>) -> Self {
        Self { keywords: KeywordCategorizer::new(taxonomy), model: None }
    }

    #[must_use]
    pub fn with_model(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        let taxonomy = Arc::clone(self.keywords.taxonomy());
        self.model = Some(ModelCategorizer::new(backend, taxonomy));
        self
    }

    pub fn taxonomy(&self) -> &Arc<CategoryTaxonomy> {
        self.keywords.taxonomy()
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Keyword-only prediction; never suspends.
    pub fn predict(&self, description: &str, amount: Money) -> CategoryPrediction {
        self.keywords.predict_category(description, amount)
    }

    pub fn similar<'a>(
        &self,
        history: &'a [TransactionRecord],
        target: &TransactionRecord,
    ) -> Vec<&'a TransactionRecord> {
        self.keywords.similar_transactions(history, target)
    }

    /// History records that keyword matching puts in `category`.
    pub fn related<'a>(&self, history: &'a [TransactionRecord], category: &str) -> Vec<&'a TransactionRecord> {
        self.keywords.in_category(history, category)
    }

    pub async fn categorize(&self, description: &str, amount: Money) -> CategoryDecision {
        let prediction = self.predict(description, amount);
        if prediction.confidence > 0.0 {
            return CategoryDecision {
                category: prediction.category,
                confidence: prediction.confidence,
                source: DecisionSource::Keyword,
            };
        }

        let Some(model) = &self.model else {
            return CategoryDecision::fallback();
        };
        if description.trim().is_empty() {
            return CategoryDecision::fallback();
        }

        tracing::info!("No keyword match, escalating to model");
        let category = model.categorize(description, amount).await;
        if category == OTHER_CATEGORY {
            CategoryDecision::fallback()
        } else {
            CategoryDecision { category, confidence: 0.0, source: DecisionSource::Model }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::ScriptedBackend;

    fn service() -> CategorizationService {
        CategorizationService::new(CategoryTaxonomy::builtin())
    }

    #[tokio::test]
    async fn keyword_hit_does_not_escalate() {
        let backend = ScriptedBackend::answering("travel");
        let s = service().with_model(backend.clone());
        let d = s.categorize("Starbucks Coffee", Money::from_cents(550)).await;
        assert_eq!(d.category, "food_dining");
        assert_eq!(d.source, DecisionSource::Keyword);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn no_model_means_fallback() {
        let d = service().categorize("xyz123", Money::zero()).await;
        assert_eq!(d, CategoryDecision::fallback());
    }

    #[tokio::test]
    async fn escalates_on_zero_confidence() {
        let backend = ScriptedBackend::answering("travel");
        let s = service().with_model(backend.clone());
        let d = s.categorize("Delta 0062", Money::from_cents(32000)).await;
        assert_eq!(d.category, "travel");
        assert_eq!(d.source, DecisionSource::Model);
        assert_eq!(d.confidence, 0.0);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn model_failure_is_fallback() {
        let s = service().with_model(ScriptedBackend::failing("timeout"));
        let d = s.categorize("Delta 0062", Money::zero()).await;
        assert_eq!(d, CategoryDecision::fallback());
    }

    #[tokio::test]
    async fn blank_description_never_escalates() {
        let backend = ScriptedBackend::answering("travel");
        let s = service().with_model(backend.clone());
        assert_eq!(s.categorize("   ", Money::zero()).await, CategoryDecision::fallback());
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn decision_source_serializes_snake_case() {
        let json = serde_json::to_string(&DecisionSource::Fallback).unwrap();
        assert_eq!(json, "\"fallback\"");
    }
}
