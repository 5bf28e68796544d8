pub mod analysis;
pub mod config;

pub use analysis::{analyze_receipt, draft_transaction, similar_in_history, ReceiptAnalysis, TransactionDraft};
pub use config::{AppConfig, ConfigError};
