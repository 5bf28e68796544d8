use std::fmt;
use std::sync::Arc;

use ledgerlens_core::Money;
use serde::{Deserialize, Serialize};

use crate::model::{CompletionBackend, CompletionRequest};

pub const ADVICE_UNAVAILABLE: &str = "Unable to generate budget suggestions at this time.";
pub const NOTHING_TO_ANALYZE: &str = "No transactions found for analysis";

const ADVICE_MAX_TOKENS: u32 = 200;
const ADVICE_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpending {
    pub category: String,
    pub total: Money,
    pub count: usize,
    pub average: Money,
}

/// Per-category totals, in the order categories were first seen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpendingSummary {
    pub categories: Vec<CategorySpending>,
}

impl SpendingSummary {
    pub fn from_records<I, S>(records: I) -> Self
    where
        I: IntoIterator<Item = (S, Money)>,
        S: AsRef<str>,
    {
        let mut categories: Vec<CategorySpending> = vec![];
        for (category, amount) in records {
            let category = category.as_ref();
            match categories.iter_mut().find(|c| c.category == category) {
                Some(c) => match c.total.checked_add(amount) {
                    Some(total) => {
                        c.total = total;
                        c.count += 1;
                    }
                    None => tracing::warn!(category, %amount, "Amount overflows category total, skipping"),
                },
                None => categories.push(CategorySpending {
                    category: category.to_string(),
                    total: amount,
                    count: 1,
                    average: Money::zero(),
                }),
            }
        }
        for c in &mut categories {
            c.average = c.total.average(c.count);
        }
        Self { categories }
    }

    pub fn transaction_count(&self) -> usize {
        self.categories.iter().map(|c| c.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl fmt::Display for SpendingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Transaction Summary:")?;
        for c in &self.categories {
            writeln!(
                f,
                "{}: {} total, {} transactions, {} average",
                c.category, c.total, c.count, c.average
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAdvice {
    pub message: String,
    pub suggestions: Vec<String>,
    pub transaction_count: usize,
}

pub struct BudgetAdvisor {
    backend: Arc<dyn CompletionBackend>,
}

impl BudgetAdvisor {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Ask the model for three suggestions. Never fails: a backend error
    /// yields [`ADVICE_UNAVAILABLE`] as the only suggestion.
    pub async fn suggest(&self, summary: &SpendingSummary) -> BudgetAdvice {
        let transaction_count = summary.transaction_count();
        if summary.is_empty() {
            return BudgetAdvice {
                message: NOTHING_TO_ANALYZE.to_string(),
                suggestions: vec![],
                transaction_count,
            };
        }

        let request = CompletionRequest {
            prompt: advice_prompt(summary),
            max_tokens: ADVICE_MAX_TOKENS,
            temperature: ADVICE_TEMPERATURE,
        };
        let text = match self.backend.complete(&request).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Budget advice generation failed");
                ADVICE_UNAVAILABLE.to_string()
            }
        };

        BudgetAdvice {
            message: "Budget analysis completed".to_string(),
            suggestions: text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            transaction_count,
        }
    }
}

fn advice_prompt(summary: &SpendingSummary) -> String {
    format!(
        "{summary}\n\
         Based on this spending pattern, provide 3 specific suggestions for budget improvement.\n\
         Focus on practical ways to reduce expenses and optimize spending.\n\
         Keep the response concise and actionable."
    )
}
