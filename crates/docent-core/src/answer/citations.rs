//! Citation extraction and validation
//!
//! Generated answers must ground every claim in a prompt source. A
//! marker that does not resolve to a source actually shown to the
//! model is treated as fabrication.

use super::{Citation, PromptSource};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

static MARKER_RE: OnceLock<Regex> = OnceLock::new();

fn marker_re() -> &'static Regex {
    MARKER_RE.get_or_init(|| Regex::new(r"\[S(\d{1,3})\]").unwrap())
}

/// Outcome of resolving an answer's citation markers
#[derive(Debug, Clone)]
pub struct CitationCheck {
    /// Citations for markers that resolved, deduplicated, in marker order
    pub citations: Vec<Citation>,
    /// False if any marker referenced a source not in the prompt
    pub all_resolved: bool,
    /// False if the answer contained no citation markers at all
    pub any_found: bool,
}

impl CitationCheck {
    /// An answer is grounded only if it cites, and cites validly
    pub fn is_grounded(&self) -> bool {
        self.any_found && self.all_resolved
    }
}

/// Extract [Sn] markers from `text` and resolve them against the
/// sources that were actually included in the prompt.
pub fn resolve_citations(text: &str, sources: &[PromptSource]) -> CitationCheck {
    let mut seen: BTreeSet<usize> = BTreeSet::new();
    let mut any_found = false;
    let mut all_resolved = true;

    for cap in marker_re().captures_iter(text) {
        any_found = true;
        let n: usize = match cap[1].parse() {
            Ok(n) => n,
            Err(_) => {
                all_resolved = false;
                continue;
            }
        };
        if n == 0 || n > sources.len() {
            all_resolved = false;
            continue;
        }
        seen.insert(n);
    }

    let citations = seen
        .into_iter()
        .map(|n| {
            let src = &sources[n - 1];
            Citation {
                document_id: src.doc_id,
                chunk_index: src.chunk_index,
                chapter: src.chapter.clone(),
            }
        })
        .collect();

    CitationCheck {
        citations,
        all_resolved,
        any_found,
    }
}
