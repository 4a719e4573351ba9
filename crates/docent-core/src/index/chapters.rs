//! Chapter heading detection for theses
//!
//! Heuristic, regex-based. Detection failure is a fallback path (the
//! document is chunked whole and flagged unstructured), never an error.

use regex::Regex;
use std::sync::OnceLock;

/// A detected chapter: heading line plus the text under it
#[derive(Debug, Clone)]
pub struct Chapter {
    pub title: String,
    pub text: String,
}

/// Detected thesis structure: abstract/acknowledgements/front matter
/// before the first heading, then the chapters in order
#[derive(Debug)]
pub struct ThesisOutline {
    pub front_matter: Option<String>,
    pub chapters: Vec<Chapter>,
}

fn heading_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // "Chapter 3", "CHAPTER IV", optionally followed by a title,
        // alone on its line.
        Regex::new(r"(?m)^\s*(?i:chapter)\s+(?:\d{1,3}|[IVXLC]{1,7})\b[^\n]*$")
            .expect("chapter heading pattern is valid")
    })
}

/// Split thesis text on chapter headings.
///
/// Returns `None` when fewer than two headings are found; a single
/// heading is indistinguishable from a stray mention in prose, so the
/// caller falls back to whole-document chunking.
pub fn detect_chapters(text: &str) -> Option<ThesisOutline> {
    let matches: Vec<_> = heading_pattern().find_iter(text).collect();
    if matches.len() < 2 {
        return None;
    }

    // Text before the first heading belongs to no chapter but is still
    // part of the document
    let front = text[..matches[0].start()].trim();
    let front_matter = (!front.is_empty()).then(|| front.to_string());

    let mut chapters = Vec::with_capacity(matches.len());
    for (i, m) in matches.iter().enumerate() {
        let body_start = m.end();
        let body_end = matches
            .get(i + 1)
            .map(|next| next.start())
            .unwrap_or(text.len());
        let body = text[body_start..body_end].trim();
        if body.is_empty() {
            continue;
        }
        chapters.push(Chapter {
            title: m.as_str().trim().to_string(),
            text: body.to_string(),
        });
    }

    if chapters.len() < 2 {
        None
    } else {
        Some(ThesisOutline {
            front_matter,
            chapters,
        })
    }
}
