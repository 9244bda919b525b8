//! Semantic chunking for graph ingestion.
//!
//! Splits extracted document text into chunks no larger than the episode
//! limit, preferring natural boundaries in priority order:
//!
//! 1. Section boundaries (heading-like lines)
//! 2. Blank-line-delimited paragraphs
//! 3. Sentence / line / word boundaries
//! 4. Hard cut at the size limit
//!
//! Adjacent small units are merged up to the limit, and every chunk after
//! the first starts with the trailing `overlap` characters of its
//! predecessor so entity extraction keeps cross-chunk context.
//!
//! Oversized units are re-split through an explicit worklist, never
//! recursion, so a single pathological line cannot grow the stack.

use std::collections::VecDeque;

use once_cell::sync::Lazy;
use regex::Regex;

use factweave_core::{defaults, CodeUnit};

/// Boundary ladder for size-based splitting, in order of preference.
const SPLIT_SEPARATORS: [&str; 5] = [". ", "! ", "? ", "\n", " "];

/// Heading-like lines: Markdown headings or short all-caps lines.
static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(?:#{1,6}\s+\S|[A-Z0-9][A-Z0-9 \-]{3,}$)").unwrap());

/// Blank-line paragraph delimiter.
static PARAGRAPH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Configuration for the chunking engine.
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Maximum size of a chunk in bytes.
    pub max_size: usize,
    /// Characters carried from the end of one chunk into the next.
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_size: defaults::CHUNK_SIZE,
            overlap: defaults::CHUNK_OVERLAP,
        }
    }
}

impl ChunkerConfig {
    /// Effective overlap: capped below half the chunk size so every chunk
    /// always carries at least as much new content as duplicated context.
    fn effective_overlap(&self) -> usize {
        self.overlap.min(self.max_size / 2)
    }

    /// Largest unit fragment that fits a fresh chunk after the overlap prefix.
    fn fragment_limit(&self) -> usize {
        (self.max_size - self.effective_overlap()).max(1)
    }
}

/// Split `text` into chunks per the boundary priority ladder.
///
/// Texts at or under the limit are returned unchanged as a single chunk.
pub fn chunk_text(text: &str, config: &ChunkerConfig) -> Vec<String> {
    if text.len() <= config.max_size {
        return vec![text.to_string()];
    }

    let sections = split_sections(text);
    if sections.len() >= 2 {
        return merge_units(sections, "\n\n", config);
    }

    let paragraphs = split_paragraphs(text);
    if paragraphs.len() >= 2 {
        return merge_units(paragraphs, "\n\n", config);
    }

    // No structural boundaries; size-split the whole text as one unit and
    // let the merge pass apply overlap.
    merge_units(vec![text.to_string()], " ", config)
}

/// Split source-code units into chunks: one chunk per AST-derived unit,
/// with oversized units size-split. Returns an empty vec when no units are
/// available so the caller can fall back to text chunking.
pub fn chunk_code(units: &[CodeUnit], config: &ChunkerConfig) -> Vec<String> {
    let mut chunks = Vec::new();
    for unit in units {
        if unit.body.trim().is_empty() {
            continue;
        }
        if unit.body.len() <= config.max_size {
            chunks.push(unit.body.clone());
        } else {
            // Units are independent; no overlap carried between them.
            chunks.extend(merge_units(vec![unit.body.clone()], "\n", config));
        }
    }
    chunks
}

/// Split at heading-like lines. Returns one unit per section, headings
/// kept with the section they introduce.
fn split_sections(text: &str) -> Vec<String> {
    let mut starts: Vec<usize> = HEADING_RE.find_iter(text).map(|m| m.start()).collect();
    if starts.is_empty() {
        return vec![];
    }
    if starts[0] != 0 {
        starts.insert(0, 0);
    }

    let mut sections = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        let section = text[start..end].trim();
        if !section.is_empty() {
            sections.push(section.to_string());
        }
    }
    sections
}

/// Split on blank-line-delimited paragraphs.
fn split_paragraphs(text: &str) -> Vec<String> {
    PARAGRAPH_RE
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Merge/split pass over ordered units.
///
/// Appends units into a buffer while they fit; flushes otherwise, carrying
/// the trailing overlap of the flushed chunk into the next. Units too big
/// for a fresh chunk are split at the boundary ladder and their fragments
/// pushed back onto the worklist.
fn merge_units(units: Vec<String>, separator: &str, config: &ChunkerConfig) -> Vec<String> {
    let max = config.max_size.max(1);
    let fragment_limit = config.fragment_limit();

    let mut work: VecDeque<String> = units.into();
    let mut chunks: Vec<String> = Vec::new();
    let mut buffer = String::new();
    // Bytes of `buffer` that are carried overlap, not new content.
    let mut carry_len = 0usize;

    while let Some(unit) = work.pop_front() {
        if unit.len() > fragment_limit {
            for fragment in split_by_size(&unit, fragment_limit).into_iter().rev() {
                work.push_front(fragment);
            }
            continue;
        }

        let sep_len = if buffer.len() > carry_len {
            separator.len()
        } else {
            0
        };

        if buffer.len() + sep_len + unit.len() <= max {
            if sep_len > 0 {
                buffer.push_str(separator);
            }
            buffer.push_str(&unit);
        } else {
            // Flush and start the next chunk with the overlap carry.
            chunks.push(buffer.clone());
            let carry = overlap_tail(&buffer, config.effective_overlap()).to_string();
            buffer.clear();
            buffer.push_str(&carry);
            carry_len = buffer.len();
            buffer.push_str(&unit);
        }
    }

    if buffer.len() > carry_len {
        chunks.push(buffer);
    }

    chunks
}

/// Split one oversized unit into fragments of at most `limit` bytes,
/// preferring sentence, then line, then word boundaries, with a hard cut
/// as the last resort. Always advances by at least one character.
fn split_by_size(unit: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut fragments = Vec::new();
    let mut rest = unit;

    while rest.len() > limit {
        let window_end = floor_char_boundary(rest, limit);
        let window = &rest[..window_end];

        let cut = SPLIT_SEPARATORS
            .iter()
            .find_map(|sep| window.rfind(sep).map(|pos| pos + sep.len()))
            .filter(|&pos| pos > 0)
            .unwrap_or(window_end)
            .max(first_char_len(rest));

        fragments.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }

    if !rest.is_empty() {
        fragments.push(rest.to_string());
    }
    fragments
}

/// Trailing `overlap` characters of a chunk, at a UTF-8 boundary.
fn overlap_tail(chunk: &str, overlap: usize) -> &str {
    if overlap == 0 || chunk.len() <= overlap {
        return if overlap == 0 { "" } else { chunk };
    }
    let mut start = chunk.len() - overlap;
    while !chunk.is_char_boundary(start) {
        start += 1;
    }
    &chunk[start..]
}

/// Largest char boundary at or before `pos`, never 0 for non-empty input.
fn floor_char_boundary(text: &str, mut pos: usize) -> usize {
    pos = pos.min(text.len());
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    if pos == 0 {
        first_char_len(text)
    } else {
        pos
    }
}

fn first_char_len(text: &str) -> usize {
    text.chars().next().map_or(1, char::len_utf8)
}
