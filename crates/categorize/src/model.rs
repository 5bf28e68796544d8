use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use ledgerlens_core::{CategoryTaxonomy, Money, OTHER_CATEGORY};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Completion service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),
    #[error("Completion backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A text-completion service: one prompt out, one text back.
///
/// Implementations must not retry; a failed call is reported as-is.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

const CATEGORY_MAX_TOKENS: u32 = 10;
const CATEGORY_TEMPERATURE: f32 = 0.3;

/// Asks an external model for a category when keywords say nothing.
///
/// Never fails: transport errors and unrecognized answers both become `other`.
pub struct ModelCategorizer {
    backend: Arc<dyn CompletionBackend>,
    taxonomy: Arc<CategoryTaxonomy>,
}

impl ModelCategorizer {
    pub fn new(backend: Arc<dyn CompletionBackend>, taxonomy: Arc<CategoryTaxonomy>) -> Self {
        Self { backend, taxonomy }
    }

    pub async fn categorize(&self, description: &str, amount: Money) -> String {
        let request = CompletionRequest {
            prompt: category_prompt(&self.taxonomy, description, amount),
            max_tokens: CATEGORY_MAX_TOKENS,
            temperature: CATEGORY_TEMPERATURE,
        };

        match self.backend.complete(&request).await {
            Ok(answer) => {
                let answer = answer.trim().to_lowercase();
                if self.taxonomy.is_known(&answer) {
                    tracing::debug!(category = %answer, "Model categorized transaction");
                    answer
                } else {
                    tracing::warn!(answer = %answer, "Model returned an unknown category");
                    OTHER_CATEGORY.to_string()
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Model categorization failed");
                OTHER_CATEGORY.to_string()
            }
        }
    }
}

/// Fixed prompt listing every known category id and its description.
pub fn category_prompt(taxonomy: &CategoryTaxonomy, description: &str, amount: Money) -> String {
    let categories = taxonomy.descriptions();
    let ids: Vec<&str> = categories.iter().map(|(id, _)| *id).collect();

    let mut prompt = format!(
        "Given the following transaction:\nDescription: {description}\nAmount: {amount}\n\n\
         Categorize this transaction into one of these categories:\n{}\n\n\
         Category descriptions:\n",
        ids.join(", ")
    );
    for (id, desc) in &categories {
        let _ = writeln!(prompt, "- {id}: {desc}");
    }
    prompt.push_str("\nReturn only the category name, nothing else.");
    prompt
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Replays a fixed answer (or failure) and records every request.
    pub struct ScriptedBackend {
        answer: Result<String, String>,
        pub requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedBackend {
        pub fn answering(text: &str) -> Arc<Self> {
            Arc::new(Self { answer: Ok(text.to_string()), requests: Mutex::new(vec![]) })
        }

        pub fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self { answer: Err(message.to_string()), requests: Mutex::new(vec![]) })
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
            self.requests.lock().unwrap().push(request.clone());
            self.answer.clone().map_err(CompletionError::Unavailable)
        }
    }
}
