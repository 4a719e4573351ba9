//! Ask command

use crate::app::{AskArgs, OutputFormat};
use anyhow::{bail, Result};
use docent_core::{AnswerStatus, Assistant};

pub async fn run(args: AskArgs, assistant: &Assistant, format: OutputFormat) -> Result<()> {
    let query = args.query.join(" ");
    if query.trim().is_empty() {
        bail!("empty question");
    }

    let answer = assistant.ask(&query, args.doc_type.map(Into::into)).await;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    match answer.status {
        AnswerStatus::Ok => {
            println!("{}", answer.text);
            println!();
            println!("Sources:");
            for citation in &answer.citations {
                match &citation.chapter {
                    Some(chapter) => println!(
                        "  document {} chunk {} ({chapter})",
                        citation.document_id, citation.chunk_index
                    ),
                    None => println!(
                        "  document {} chunk {}",
                        citation.document_id, citation.chunk_index
                    ),
                }
            }
            println!();
            println!("confidence: {:.2}", answer.confidence);
        }
        AnswerStatus::LowConfidence => {
            if answer.text.is_empty() {
                println!("(low confidence, no answer text)");
            } else {
                println!("{}", answer.text);
            }
            println!();
            println!(
                "note: low confidence ({:.2}); treat this answer with caution",
                answer.confidence
            );
        }
        AnswerStatus::NoResults => {
            println!("Nothing in the corpus matches that question.");
        }
        AnswerStatus::Error => {
            bail!(
                "query failed: {}",
                answer
                    .diagnostics
                    .error
                    .unwrap_or_else(|| "unknown".to_string())
            );
        }
    }
    Ok(())
}
