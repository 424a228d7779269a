//! Recursive character splitting with overlap.
//!
//! Text is split on the first separator that occurs in it (paragraphs, then lines, then words,
//! then single characters). Pieces that are still too long are split again with the remaining
//! separators; short pieces are packed back together up to the chunk size. When a chunk is
//! emitted, its trailing pieces (at most `chunk_overlap` characters) seed the next chunk.
//!
//! Lengths are counted in characters, not bytes.

use super::types::ChunkingError;
use std::collections::VecDeque;

/// Target chunk length in characters.
pub const CHUNK_SIZE: usize = 800;
/// Characters of the previous chunk repeated at the start of the next one.
pub const CHUNK_OVERLAP: usize = 100;
/// Separator preference, from coarsest to finest.
pub const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Splitter that prefers paragraph, line, and word boundaries over raw characters.
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for RecursiveCharacterSplitter {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            chunk_overlap: CHUNK_OVERLAP,
            separators: SEPARATORS.iter().map(|sep| sep.to_string()).collect(),
        }
    }
}

impl RecursiveCharacterSplitter {
    /// Build a splitter with explicit sizes and separators.
    pub fn new(
        chunk_size: usize,
        chunk_overlap: usize,
        separators: &[&str],
    ) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        if chunk_overlap > chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                chunk_size,
                chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: separators.iter().map(|sep| sep.to_string()).collect(),
        })
    }

    /// Split `text` into ordered chunks. Whitespace-only input yields no chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or_default();
        let mut finer: &[String] = &[];
        for (position, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate.as_str();
                finer = &separators[position + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut short_pieces: Vec<String> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(&piece) < self.chunk_size {
                short_pieces.push(piece);
                continue;
            }

            if !short_pieces.is_empty() {
                chunks.extend(self.merge_pieces(&short_pieces));
                short_pieces.clear();
            }
            if finer.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_recursive(&piece, finer));
            }
        }

        if !short_pieces.is_empty() {
            chunks.extend(self.merge_pieces(&short_pieces));
        }
        chunks
    }

    /// Pack pieces into chunks of at most `chunk_size`, carrying up to `chunk_overlap`
    /// characters of trailing pieces into the following chunk.
    fn merge_pieces(&self, pieces: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        length = total,
                        chunk_size = self.chunk_size,
                        "Created a chunk longer than the configured size"
                    );
                }
                if !window.is_empty() {
                    chunks.extend(join_window(&window));
                    while total > self.chunk_overlap
                        || (total + len > self.chunk_size && total > 0)
                    {
                        match window.pop_front() {
                            Some((_, dropped)) => total -= dropped,
                            None => break,
                        }
                    }
                }
            }
            window.push_back((piece.as_str(), len));
            total += len;
        }

        chunks.extend(join_window(&window));
        chunks
    }
}

/// Split on `separator`, attaching each separator to the start of the piece that follows it.
/// An empty separator splits into single characters. Empty pieces are dropped.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }

    let mut parts = text.split(separator);
    let first = parts.next().map(str::to_string);
    first
        .into_iter()
        .chain(parts.map(|part| format!("{separator}{part}")))
        .filter(|piece| !piece.is_empty())
        .collect()
}

fn join_window(window: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(range: std::ops::Range<usize>) -> String {
        range
            .map(|index| format!("w{index:03}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn short_text_is_a_single_trimmed_chunk() {
        let splitter = RecursiveCharacterSplitter::default();
        assert_eq!(
            splitter.split_text("\n--- Page 1 ---\nHello world\n"),
            vec!["--- Page 1 ---\nHello world"]
        );
    }

    #[test]
    fn whitespace_only_text_yields_no_chunks() {
        let splitter = RecursiveCharacterSplitter::default();
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text(" \n\n \n").is_empty());
    }

    #[test]
    fn paragraphs_are_preferred_boundaries() {
        let first = "a".repeat(500);
        let second = "b".repeat(500);
        let text = format!("{first}\n\n{second}");

        let chunks = RecursiveCharacterSplitter::default().split_text(&text);
        assert_eq!(chunks, vec![first, second]);
    }

    #[test]
    fn word_chunks_carry_trailing_overlap() {
        let text = numbered_words(0..1000);
        let chunks = RecursiveCharacterSplitter::default().split_text(&text);

        assert!(chunks.len() > 1);
        assert_eq!(chunks[0], numbered_words(0..160));
        let overlap = numbered_words(140..160);
        assert!(chunks[0].ends_with(&overlap));
        assert!(chunks[1].starts_with(&overlap));
        for chunk in &chunks {
            assert!(char_len(chunk) <= CHUNK_SIZE);
        }
        assert!(chunks.last().unwrap().ends_with("w999"));
    }

    #[test]
    fn unbroken_text_falls_back_to_characters() {
        let text = "x".repeat(2000);
        let chunks = RecursiveCharacterSplitter::default().split_text(&text);
        let lengths: Vec<usize> = chunks.iter().map(|chunk| char_len(chunk)).collect();
        assert_eq!(lengths, vec![800, 800, 600]);
    }

    #[test]
    fn oversized_paragraphs_recurse_into_finer_separators() {
        let long_paragraph = numbered_words(0..400);
        let text = format!("Title\n\n{long_paragraph}\n\nClosing words");
        let chunks = RecursiveCharacterSplitter::default().split_text(&text);

        assert!(chunks.len() >= 3);
        assert_eq!(chunks[0], "Title");
        for chunk in &chunks {
            assert!(char_len(chunk) <= CHUNK_SIZE);
        }
        assert!(chunks.iter().any(|chunk| chunk.contains("w399")));
        assert_eq!(chunks.last().unwrap(), "Closing words");
    }

    #[test]
    fn lengths_are_measured_in_characters() {
        let splitter = RecursiveCharacterSplitter::new(4, 0, &[" ", ""]).unwrap();
        assert_eq!(splitter.split_text("éééé ü"), vec!["éééé", "ü"]);
    }

    #[test]
    fn separators_stay_attached_to_following_piece() {
        assert_eq!(
            split_keeping_separator("a\nb\n", "\n"),
            vec!["a", "\nb", "\n"]
        );
        assert_eq!(split_keeping_separator("ab", ""), vec!["a", "b"]);
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        assert!(matches!(
            RecursiveCharacterSplitter::new(0, 0, &SEPARATORS),
            Err(ChunkingError::InvalidChunkSize)
        ));
        assert!(matches!(
            RecursiveCharacterSplitter::new(10, 20, &SEPARATORS),
            Err(ChunkingError::OverlapTooLarge { .. })
        ));
    }
}
