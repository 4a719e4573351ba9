//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use docent_core::DocType;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docent")]
#[command(
    author,
    version,
    about = "Ask questions of your lab's protocols, papers, theses, and notes"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Config file path (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest a document or a directory of documents
    Ingest(IngestArgs),

    /// Ask a question against the corpus
    Ask(AskArgs),

    /// Show corpus status and per-document ingestion state
    Status,

    /// Remove a document and its index entries
    Rm(RmArgs),
}

#[derive(Args)]
pub struct IngestArgs {
    /// File or directory (.txt, .md, .pdf)
    pub path: PathBuf,

    /// Document type
    #[arg(long, value_enum, default_value = "note")]
    pub doc_type: DocTypeArg,

    /// Title (defaults to the file stem)
    #[arg(long)]
    pub title: Option<String>,

    /// Author
    #[arg(long, default_value = "unknown")]
    pub author: String,

    /// Publication year (defaults to the current year)
    #[arg(long)]
    pub year: Option<i32>,
}

#[derive(Args)]
pub struct AskArgs {
    /// The question
    pub query: Vec<String>,

    /// Restrict retrieval to one document type
    #[arg(long, value_enum)]
    pub doc_type: Option<DocTypeArg>,
}

#[derive(Args)]
pub struct RmArgs {
    /// Document id (see `docent status`)
    pub doc_id: i64,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DocTypeArg {
    Protocol,
    Paper,
    Thesis,
    Note,
}

impl From<DocTypeArg> for DocType {
    fn from(arg: DocTypeArg) -> Self {
        match arg {
            DocTypeArg::Protocol => DocType::Protocol,
            DocTypeArg::Paper => DocType::Paper,
            DocTypeArg::Thesis => DocType::Thesis,
            DocTypeArg::Note => DocType::Note,
        }
    }
}
