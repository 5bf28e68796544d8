use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::extract::Extractor;
use crate::preprocess::{self, EnhanceOptions, PreprocessError};
use crate::recognizer::{OcrBackend, OcrError};
use crate::types::ReceiptFields;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
    #[error("Receipt worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// The result of a single receipt processing run.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Size of the image as received.
    pub source_bytes: usize,
    /// Size of the enhanced PNG handed to OCR.
    pub enhanced_bytes: usize,
    /// Structured fields; `fields.raw_text` is the OCR output.
    pub fields: ReceiptFields,
}

/// Orchestrates: enhance → OCR → extract.
pub struct ReceiptPipeline<R: OcrBackend> {
    recognizer: Arc<R>,
    options: EnhanceOptions,
}

impl<R: OcrBackend + 'static> ReceiptPipeline<R> {
    pub fn new(recognizer: R) -> Self {
        Self { recognizer: Arc::new(recognizer), options: EnhanceOptions::default() }
    }

    pub fn with_options(mut self, options: EnhanceOptions) -> Self {
        self.options = options;
        self
    }

    /// Process a file on disk.
    pub async fn process_file(&self, path: &Path) -> Result<ScanResult, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "Processing receipt file");
        self.process_bytes(bytes).await
    }

    /// Process raw image bytes (camera capture, upload, file read).
    pub async fn process_bytes(&self, data: Vec<u8>) -> Result<ScanResult, PipelineError> {
        let source_bytes = data.len();
        let recognizer = Arc::clone(&self.recognizer);
        let options = self.options;

        // 1 + 2. Image decode and OCR are CPU/FFI bound; keep them off the async workers.
        let (enhanced_bytes, ocr_text) =
            tokio::task::spawn_blocking(move || -> Result<(usize, String), PipelineError> {
                let image = preprocess::enhance_with(&data, &options)?;
                let text = recognizer.recognize(&image)?;
                Ok((image.len(), text))
            })
            .await??;

        // 3. Extract structured fields.
        let fields = Extractor::extract(&ocr_text);
        if fields.is_blank() {
            tracing::warn!(source_bytes, ocr_chars = ocr_text.len(), "No receipt fields recognized");
        }

        Ok(ScanResult { source_bytes, enhanced_bytes, fields })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
