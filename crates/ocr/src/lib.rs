pub mod extract;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod types;

pub use extract::Extractor;
pub use pipeline::{PipelineError, ReceiptPipeline, ScanResult};
pub use preprocess::{enhance, enhance_with, EnhanceOptions, PreprocessError};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError};
pub use types::{LineItem, ReceiptFields};

#[cfg(feature = "tesseract")]
pub use recognizer::tesseract_backend::TesseractRecognizer;
