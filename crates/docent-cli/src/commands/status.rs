//! Status command

use crate::app::OutputFormat;
use anyhow::Result;
use docent_core::Assistant;
use serde::Serialize;

pub async fn run(assistant: &Assistant, format: OutputFormat) -> Result<()> {
    let stats = assistant.stats().await?;
    let documents = assistant.documents().await?;

    if format == OutputFormat::Json {
        #[derive(Serialize)]
        struct StatusReport<'a> {
            stats: &'a docent_core::db::CorpusStats,
            documents: Vec<DocumentLine<'a>>,
        }

        #[derive(Serialize)]
        struct DocumentLine<'a> {
            id: i64,
            title: &'a str,
            doc_type: &'a str,
            author: &'a str,
            year: i32,
            version: i64,
            status: &'a str,
            unstructured: bool,
            error: Option<&'a str>,
        }

        let report = StatusReport {
            stats: &stats,
            documents: documents
                .iter()
                .map(|d| DocumentLine {
                    id: d.id,
                    title: &d.title,
                    doc_type: d.doc_type.as_str(),
                    author: &d.author,
                    year: d.year,
                    version: d.version,
                    status: d.status.as_str(),
                    unstructured: d.unstructured,
                    error: d.error.as_deref(),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Documents:        {}", stats.total_documents);
    println!("Chunks:           {}", stats.total_chunks);
    println!("Cached vectors:   {}", stats.cached_embeddings);
    if stats.unstructured_documents > 0 {
        println!("Needs review:     {} (unstructured theses)", stats.unstructured_documents);
    }
    if !stats.documents_by_status.is_empty() {
        println!();
        println!("By status:");
        for (status, count) in &stats.documents_by_status {
            println!("  {status:<10} {count}");
        }
    }

    if !documents.is_empty() {
        println!();
        for doc in &documents {
            let flag = if doc.unstructured { " [unstructured]" } else { "" };
            println!(
                "  #{} v{} {:<8} {:<9} {} ({}, {}){flag}",
                doc.id, doc.version, doc.doc_type, doc.status, doc.title, doc.author, doc.year
            );
            if let Some(error) = &doc.error {
                println!("      error: {error}");
            }
        }
    }
    Ok(())
}
