//! Ingest command: files and directories into the corpus

use crate::app::IngestArgs;
use anyhow::{bail, Context, Result};
use chrono::Datelike;
use docent_core::{Assistant, DocumentIntake};
use std::path::Path;
use walkdir::WalkDir;

const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "pdf"];

pub async fn run(args: IngestArgs, assistant: &Assistant) -> Result<()> {
    let files = collect_files(&args.path)?;
    if files.is_empty() {
        bail!("no ingestible files (.txt, .md, .pdf) at {}", args.path.display());
    }

    let year = args.year.unwrap_or_else(|| chrono::Utc::now().year());
    let mut failures = 0usize;

    for file in &files {
        let text = extract_text(file)
            .with_context(|| format!("extracting text from {}", file.display()))?;
        let title = match (&args.title, files.len()) {
            // An explicit title only makes sense for a single file
            (Some(title), 1) => title.clone(),
            _ => file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string()),
        };

        let handle = assistant
            .ingest(DocumentIntake {
                title: title.clone(),
                text,
                doc_type: args.doc_type.into(),
                author: args.author.clone(),
                year,
            })
            .await?;

        match handle.wait().await {
            Ok(doc_id) => println!("ingested \"{title}\" as document {doc_id}"),
            Err(e) => {
                eprintln!("failed to ingest \"{title}\": {e}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} documents failed to ingest", files.len());
    }
    Ok(())
}

fn collect_files(path: &Path) -> Result<Vec<std::path::PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!("no such file or directory: {}", path.display());
    }

    let mut files: Vec<_> = WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn extract_text(path: &Path) -> Result<String> {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        pdf_extract::extract_text(path).map_err(|e| anyhow::anyhow!("pdf extraction failed: {e}"))
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}
