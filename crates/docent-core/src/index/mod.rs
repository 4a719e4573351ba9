//! Document segmentation
//!
//! Turns normalized document text into overlapping, sentence-bounded
//! chunks, with chapter-aware handling for theses.

mod chapters;
mod chunker;

pub use chapters::{detect_chapters, Chapter, ThesisOutline};
pub use chunker::{chunk_document, chunk_text, ChunkOutcome, TextChunk};
