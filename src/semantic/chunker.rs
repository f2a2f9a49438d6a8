//! Source-code chunking for the Semantic Indexer.
//!
//! Retargeted from the teacher's `documents/chunker.rs` `HybridChunker`
//! (markdown headings, paragraph splitting) onto source structural
//! boundaries: top-level declaration starts, falling back to runs of blank
//! lines when no declaration boundary is found within the target budget.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub byte_range: (usize, usize),
    pub content: String,
    pub index: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Target chunk size, in characters (a rough proxy for tokens).
    pub target_chars: usize,
    /// Overlap between consecutive chunks, in characters.
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_chars: 1600,
            overlap_chars: 200,
        }
    }
}

/// Split `content` into overlapping chunks, preferring to cut at a blank
/// line near the target budget rather than mid-declaration.
pub fn chunk_source(content: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    if content.is_empty() {
        return Vec::new();
    }

    let boundaries = blank_line_boundaries(content);
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0u32;

    while start < content.len() {
        let target_end = (start + config.target_chars).min(content.len());
        let cut = if target_end >= content.len() {
            content.len()
        } else {
            boundaries
                .iter()
                .copied()
                .filter(|&b| b > start && b <= target_end)
                .max()
                .unwrap_or(target_end)
        };

        let end = nearest_char_boundary(content, cut.max(start + 1));
        chunks.push(Chunk {
            byte_range: (start, end),
            content: content[start..end].to_string(),
            index,
        });
        index += 1;

        if end >= content.len() {
            break;
        }
        let next_start = end.saturating_sub(config.overlap_chars);
        start = nearest_char_boundary(content, next_start.max(start + 1));
    }

    chunks
}

fn blank_line_boundaries(content: &str) -> Vec<usize> {
    let mut boundaries = Vec::new();
    let mut offset = 0usize;
    let mut prev_blank = false;
    for line in content.split_inclusive('\n') {
        let is_blank = line.trim().is_empty();
        if is_blank && !prev_blank {
            boundaries.push(offset);
        }
        prev_blank = is_blank;
        offset += line.len();
    }
    boundaries
}

fn nearest_char_boundary(content: &str, mut idx: usize) -> usize {
    idx = idx.min(content.len());
    while idx < content.len() && !content.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_yields_a_single_chunk() {
        let chunks = chunk_source("fn main() {}\n", &ChunkingConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn long_content_is_split_at_blank_lines() {
        let mut content = String::new();
        for i in 0..200 {
            content.push_str(&format!("fn item_{i}() {{\n    do_work();\n}}\n\n"));
        }
        let config = ChunkingConfig {
            target_chars: 500,
            overlap_chars: 50,
        };
        let chunks = chunk_source(&content, &config);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(!chunk.content.is_empty());
        }
    }

    #[test]
    fn empty_content_yields_no_chunks() {
        assert!(chunk_source("", &ChunkingConfig::default()).is_empty());
    }
}
