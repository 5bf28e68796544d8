pub mod budget;
pub mod keyword;
pub mod model;
pub mod openai;
pub mod service;

pub use budget::{BudgetAdvice, BudgetAdvisor, CategorySpending, SpendingSummary};
pub use keyword::{CategoryPrediction, KeywordCategorizer, TransactionRecord};
pub use model::{CompletionBackend, CompletionError, CompletionRequest, ModelCategorizer};
pub use openai::OpenAiCompletion;
pub use service::{CategorizationService, CategoryDecision, DecisionSource};
