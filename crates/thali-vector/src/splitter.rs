//! Recursive character text splitter.
//!
//! Splits document text into windows of at most `chunk_size` characters with
//! `chunk_overlap` characters carried between neighbours. Boundaries are tried
//! in order: paragraph, line, sentence, word, and finally single characters,
//! so a word is only cut when it alone exceeds the window.

use std::collections::VecDeque;

use thali_core::error::ThaliError;
use tracing::debug;

/// Boundaries tried from coarsest to finest. The empty separator splits
/// into characters.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " ", ""];

/// Splits text into overlapping chunks along the coarsest boundary that fits.
#[derive(Debug, Clone)]
pub struct RecursiveTextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveTextSplitter {
    /// Create a splitter with the default separator hierarchy.
    ///
    /// Fails if `chunk_size` is zero or the overlap is not smaller than it.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ThaliError> {
        if chunk_size == 0 {
            return Err(ThaliError::Config("chunk_size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(ThaliError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into trimmed, non-empty chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let chunks = self.split_recursive(text, &self.separators);
        debug!(
            chars = text.chars().count(),
            chunks = chunks.len(),
            "Split text into chunks"
        );
        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        // Pick the coarsest separator present in the text.
        let mut separator = "";
        let mut finer: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = "";
                break;
            }
            if text.contains(sep.as_str()) {
                separator = sep;
                finer = &separators[i + 1..];
                break;
            }
        }

        let splits: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).filter(|s| !s.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for piece in splits {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge_splits(&pending, separator));
                pending.clear();
            }
            if finer.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge_splits(&pending, separator));
        }
        chunks
    }

    /// Greedily pack small splits into windows, keeping up to
    /// `chunk_overlap` characters of the previous window at the start of
    /// the next.
    fn merge_splits(&self, splits: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in splits {
            let len = char_len(piece);
            let joiner = if current.is_empty() { 0 } else { sep_len };
            if total + len + joiner > self.chunk_size && !current.is_empty() {
                push_joined(&mut chunks, &current, separator);
                while total > self.chunk_overlap
                    || (total > 0
                        && total + len + if current.is_empty() { 0 } else { sep_len }
                            > self.chunk_size)
                {
                    let Some(front) = current.pop_front() else {
                        break;
                    };
                    total -= char_len(front);
                    if !current.is_empty() {
                        total -= sep_len;
                    }
                }
            }
            if !current.is_empty() {
                total += sep_len;
            }
            current.push_back(piece);
            total += len;
        }
        push_joined(&mut chunks, &current, separator);
        chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_joined(chunks: &mut Vec<String>, parts: &VecDeque<&str>, separator: &str) {
    let joined = parts.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(n: usize) -> String {
        (0..n)
            .map(|i| format!("w{:03}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(RecursiveTextSplitter::new(0, 0).is_err());
        assert!(RecursiveTextSplitter::new(50, 50).is_err());
        assert!(RecursiveTextSplitter::new(50, 80).is_err());
        assert!(RecursiveTextSplitter::new(50, 0).is_ok());
    }

    #[test]
    fn test_empty_text() {
        let splitter = RecursiveTextSplitter::new(500, 50).unwrap();
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text("   \n\n  ").is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let splitter = RecursiveTextSplitter::new(500, 50).unwrap();
        let chunks = splitter.split_text("Chicken Biryani .... Rs 450\nNaan - 80");
        assert_eq!(chunks, vec!["Chicken Biryani .... Rs 450\nNaan - 80"]);
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let p1 = "Chicken Biryani Rs 450. Mutton Pulao Rs 500.";
        let p2 = "Mango Lassi Rs 250. Sweet Lassi Rs 200 each.";
        let text = format!("{}\n\n{}", p1, p2);
        let splitter = RecursiveTextSplitter::new(60, 0).unwrap();
        let chunks = splitter.split_text(&text);
        assert_eq!(chunks, vec![p1.to_string(), p2.to_string()]);
    }

    #[test]
    fn test_chunks_respect_size() {
        let text = (0..40)
            .map(|i| format!("Dish number {} with a fairly long description - {}", i, 100 + i))
            .collect::<Vec<_>>()
            .join("\n");
        let splitter = RecursiveTextSplitter::new(120, 20).unwrap();
        let chunks = splitter.split_text(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 120, "chunk too long: {}", chunk);
        }
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let splitter = RecursiveTextSplitter::new(50, 10).unwrap();
        let chunks = splitter.split_text(&numbered_words(40));
        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            let first_word = pair[1].split(' ').next().unwrap();
            assert!(
                pair[0].contains(first_word),
                "{:?} does not carry into {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_does_not_split_words() {
        let splitter = RecursiveTextSplitter::new(50, 10).unwrap();
        let chunks = splitter.split_text(&numbered_words(40));
        for chunk in &chunks {
            for word in chunk.split(' ') {
                assert_eq!(word.len(), 4, "word was cut: {:?}", word);
            }
        }
    }

    #[test]
    fn test_oversized_word_falls_back_to_characters() {
        let splitter = RecursiveTextSplitter::new(10, 2).unwrap();
        let chunks = splitter.split_text(&"x".repeat(25));
        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 10);
        }
    }

    #[test]
    fn test_multibyte_text() {
        let splitter = RecursiveTextSplitter::new(10, 0).unwrap();
        let chunks = splitter.split_text("jalapeño jalapeño jalapeño");
        assert_eq!(chunks, vec!["jalapeño", "jalapeño", "jalapeño"]);
    }
}
