//! Word-window chunking with sentence-boundary snapping
//!
//! Chunks advance through the document in steps of ~`target_words` new
//! words, each carrying an `overlap_words` prefix copied from its
//! predecessor's tail. Step boundaries snap to the nearest sentence end
//! within `tolerance_words` of the target, so chunks never split
//! mid-sentence when a boundary is available. Stripping the overlap
//! prefix from every chunk and concatenating reconstructs the
//! normalized document exactly.

use super::chapters::detect_chapters;
use crate::config::ChunkingConfig;
use crate::db::DocType;

/// One chunk of document text
#[derive(Debug, Clone)]
pub struct TextChunk {
    /// Position within the document, continuous across chapters
    pub index: usize,
    pub text: String,
    pub word_count: usize,
    /// How many leading words are repeated from the previous chunk
    pub overlap_words: usize,
    pub chapter: Option<String>,
}

/// Result of chunking one document
#[derive(Debug)]
pub struct ChunkOutcome {
    pub chunks: Vec<TextChunk>,
    /// Set when a thesis had no detectable chapters and fell back to
    /// whole-document chunking; surfaced for human review.
    pub unstructured: bool,
}

/// Chunk a document according to its type.
///
/// Theses are split on chapter boundaries first and each chapter is
/// chunked independently, so no chunk ever spans two chapters. Front
/// matter before the first heading (abstract, acknowledgements) is
/// chunked as a leading untitled region. All other types are chunked
/// as a single body of text.
pub fn chunk_document(text: &str, doc_type: DocType, config: &ChunkingConfig) -> ChunkOutcome {
    if doc_type == DocType::Thesis {
        if let Some(outline) = detect_chapters(text) {
            let mut chunks = Vec::new();
            if let Some(front) = &outline.front_matter {
                chunks.extend(chunk_region(front, config, None, 0));
            }
            for chapter in &outline.chapters {
                let start_index = chunks.len();
                chunks.extend(chunk_region(
                    &chapter.text,
                    config,
                    Some(&chapter.title),
                    start_index,
                ));
            }
            return ChunkOutcome {
                chunks,
                unstructured: false,
            };
        }
        return ChunkOutcome {
            chunks: chunk_region(text, config, None, 0),
            unstructured: true,
        };
    }

    ChunkOutcome {
        chunks: chunk_region(text, config, None, 0),
        unstructured: false,
    }
}

/// Chunk plain text without chapter handling
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    chunk_region(text, config, None, 0)
}

fn chunk_region(
    text: &str,
    config: &ChunkingConfig,
    chapter: Option<&str>,
    start_index: usize,
) -> Vec<TextChunk> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let target = config.target_words;
    let tolerance = config.tolerance_words;
    let overlap = config.overlap_words;

    // Document shorter than one chunk: single chunk, no overlap
    if words.len() <= target + tolerance {
        return vec![make_chunk(&words, 0, words.len(), 0, start_index, chapter)];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    loop {
        let remaining = words.len() - start;
        if remaining <= target + tolerance {
            // Terminal chunk takes everything left. Because the previous
            // step consumed `target`-ish words, the remainder plus its
            // overlap prefix always exceeds the overlap size.
            let prefix = if chunks.is_empty() { 0 } else { overlap.min(start) };
            chunks.push(make_chunk(
                &words,
                start,
                words.len(),
                prefix,
                start_index + chunks.len(),
                chapter,
            ));
            break;
        }

        let end = snap_to_sentence(&words, start, start + target, tolerance);
        let prefix = if chunks.is_empty() { 0 } else { overlap.min(start) };
        chunks.push(make_chunk(
            &words,
            start,
            end,
            prefix,
            start_index + chunks.len(),
            chapter,
        ));
        start = end;
    }

    chunks
}

fn make_chunk(
    words: &[&str],
    start: usize,
    end: usize,
    overlap: usize,
    index: usize,
    chapter: Option<&str>,
) -> TextChunk {
    let text = words[start - overlap..end].join(" ");
    TextChunk {
        index,
        word_count: end - (start - overlap),
        text,
        overlap_words: overlap,
        chapter: chapter.map(str::to_string),
    }
}

/// Pick the cut point closest to `preferred` that lands just after a
/// sentence end, searching `tolerance` words either side. Falls back to
/// the preferred cut when the window holds no sentence boundary.
fn snap_to_sentence(words: &[&str], start: usize, preferred: usize, tolerance: usize) -> usize {
    let lo = preferred.saturating_sub(tolerance).max(start + 1);
    let hi = (preferred + tolerance).min(words.len());

    let mut best: Option<usize> = None;
    for cut in lo..=hi {
        if ends_sentence(words[cut - 1]) {
            let better = match best {
                None => true,
                Some(b) => {
                    let (db, dc) = (b.abs_diff(preferred), cut.abs_diff(preferred));
                    dc < db || (dc == db && cut > b)
                }
            };
            if better {
                best = Some(cut);
            }
        }
    }

    best.unwrap_or_else(|| preferred.min(words.len()))
}

/// Abbreviations whose trailing period does not end a sentence
const NON_TERMINAL: &[&str] = &["e.g.", "i.e.", "al.", "fig.", "eq.", "vs.", "cf."];

fn ends_sentence(word: &str) -> bool {
    let trimmed = word.trim_end_matches(['"', '\'', ')', ']']);
    if !trimmed.ends_with(['.', '!', '?']) {
        return false;
    }
    !NON_TERMINAL.contains(&trimmed.to_ascii_lowercase().as_str())
}
