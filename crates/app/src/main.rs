use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use ledgerlens::{analyze_receipt, similar_in_history, AppConfig};
use ledgerlens_categorize::{BudgetAdvisor, KeywordCategorizer, SpendingSummary, TransactionRecord};
use ledgerlens_core::Money;
use ledgerlens_ocr::{enhance_with, Extractor, MockRecognizer, OcrBackend, ReceiptPipeline};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ledgerlens")]
#[command(about = "Receipt scanning and transaction categorization", long_about = None)]
struct Cli {
    /// Config file (defaults to the per-user config.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enhance, recognize and analyze a receipt image
    Scan {
        image: PathBuf,

        /// Use this file as the recognized text instead of running OCR
        #[arg(long)]
        text_file: Option<PathBuf>,

        /// JSON list of earlier transactions to search for similar ones
        #[arg(long)]
        history: Option<PathBuf>,
    },
    /// Extract receipt fields from OCR text ("-" reads stdin)
    Extract { input: PathBuf },
    /// Categorize a transaction description
    Categorize {
        description: String,

        #[arg(short, long, default_value = "0.00")]
        amount: String,
    },
    /// Write the OCR-ready version of an image as PNG
    Enhance { input: PathBuf, output: PathBuf },
    /// List the active category taxonomy
    Taxonomy,
    /// Summarize a JSON list of transactions and ask for budget suggestions
    Advise { transactions: PathBuf },
    /// List transactions similar to the one with the given id
    Similar { transactions: PathBuf, id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let (config, config_path) = AppConfig::load(cli.config.as_deref())?;
    match &config_path {
        Some(path) => tracing::info!(path = %path.display(), "Using config file"),
        None => tracing::debug!("No config file, using defaults"),
    }

    match cli.command {
        Commands::Scan { image, text_file, history } => {
            let history = match history {
                Some(path) => read_records(&path).await?,
                None => vec![],
            };
            let recognizer = recognizer(&config, text_file.as_deref())?;
            let pipeline = ReceiptPipeline::new(recognizer).with_options(config.preprocess);
            let scan = pipeline
                .process_file(&image)
                .await
                .with_context(|| format!("Failed to scan {}", image.display()))?;
            tracing::info!(
                source_bytes = scan.source_bytes,
                enhanced_bytes = scan.enhanced_bytes,
                "Receipt scanned"
            );

            let service = config.categorization_service()?;
            print_json(&analyze_receipt(scan.fields, &service, &history).await)?;
        }
        Commands::Extract { input } => {
            let text = read_text(&input)?;
            print_json(&Extractor::extract(&text))?;
        }
        Commands::Categorize { description, amount } => {
            let amount: Money = amount
                .parse()
                .with_context(|| format!("Invalid amount: {amount}"))?;
            let service = config.categorization_service()?;
            let decision = service.categorize(&description, amount).await;
            let category_name = service.taxonomy().display_name(&decision.category).map(str::to_string);
            print_json(&serde_json::json!({
                "description": description,
                "amount": amount,
                "category": decision.category,
                "category_name": category_name,
                "confidence": decision.confidence,
                "source": decision.source,
            }))?;
        }
        Commands::Enhance { input, output } => {
            let data = tokio::fs::read(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let enhanced = enhance_with(&data, &config.preprocess)?;
            tokio::fs::write(&output, &enhanced)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            tracing::info!(bytes = enhanced.len(), path = %output.display(), "Enhanced image written");
        }
        Commands::Taxonomy => {
            let taxonomy = config.load_taxonomy()?;
            print_json(taxonomy.categories())?;
        }
        Commands::Advise { transactions } => {
            let records = read_records(&transactions).await?;

            let categorizer = KeywordCategorizer::new(config.load_taxonomy()?);
            let summary = SpendingSummary::from_records(
                records
                    .iter()
                    .map(|r| (categorizer.predict_category(&r.description, r.amount).category, r.amount)),
            );

            let advice = match config.completion_backend()? {
                Some(backend) => Some(BudgetAdvisor::new(backend).suggest(&summary).await),
                None => {
                    tracing::info!("Model disabled, skipping budget suggestions");
                    None
                }
            };
            print_json(&serde_json::json!({ "summary": summary, "advice": advice }))?;
        }
        Commands::Similar { transactions, id } => {
            let records = read_records(&transactions).await?;
            let service = config.categorization_service()?;
            let similar = similar_in_history(&service, &records, id)
                .with_context(|| format!("No transaction with id {id} in {}", transactions.display()))?;
            print_json(&similar)?;
        }
    }

    Ok(())
}

fn recognizer(config: &AppConfig, text_file: Option<&Path>) -> anyhow::Result<Box<dyn OcrBackend>> {
    match text_file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(Box::new(MockRecognizer::new(text)))
        }
        None => tesseract(config),
    }
}

#[cfg(feature = "tesseract")]
fn tesseract(config: &AppConfig) -> anyhow::Result<Box<dyn OcrBackend>> {
    Ok(Box::new(ledgerlens_ocr::TesseractRecognizer::new(
        config.ocr.tesseract_data_path.clone(),
        &config.ocr.language,
    )))
}

#[cfg(not(feature = "tesseract"))]
fn tesseract(_config: &AppConfig) -> anyhow::Result<Box<dyn OcrBackend>> {
    Err(ledgerlens_ocr::OcrError::NotAvailable.into())
}

async fn read_records(path: &Path) -> anyhow::Result<Vec<TransactionRecord>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid transaction list in {}", path.display()))
}

fn read_text(input: &Path) -> anyhow::Result<String> {
    if input == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
