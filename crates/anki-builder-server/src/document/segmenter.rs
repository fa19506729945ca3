use std::ops::Range;
use std::sync::Arc;
use tiktoken_rs::CoreBPE;
use tracing::debug;

use crate::utils::error::SegmentError;

/// Deterministic, reversible text <-> token mapping.
pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Vec<u32>;
    fn decode(&self, tokens: &[u32]) -> Result<String, SegmentError>;
}

/// BPE tokenizer backed by the tiktoken vocabularies.
pub struct TiktokenTokenizer {
    bpe: CoreBPE,
}

impl TiktokenTokenizer {
    pub fn new(encoding: &str) -> Result<Self, SegmentError> {
        let bpe = match encoding {
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "o200k_base" => tiktoken_rs::o200k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "r50k_base" => tiktoken_rs::r50k_base(),
            other => {
                return Err(SegmentError::Tokenizer(format!(
                    "Unknown encoding: {}",
                    other
                )))
            }
        }
        .map_err(|e| SegmentError::Tokenizer(e.to_string()))?;

        Ok(Self { bpe })
    }

    pub fn cl100k() -> Result<Self, SegmentError> {
        Self::new("cl100k_base")
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        // Special-token markers in the document are plain text here.
        self.bpe.encode_ordinary(text)
    }

    /// Windows may start or end inside a multi-byte character; only the
    /// invalid bytes at the edges become U+FFFD.
    fn decode(&self, tokens: &[u32]) -> Result<String, SegmentError> {
        let bytes: Vec<u8> = self
            .bpe
            ._decode_native_and_split(tokens.to_vec())
            .flatten()
            .collect();

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// One token window of the document, decoded back to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    pub token_count: usize,
    /// Position of this window in the document's token sequence.
    pub token_range: Range<usize>,
}

#[derive(Debug, Clone)]
pub struct Segmentation {
    pub chunks: Vec<Chunk>,
    pub total_tokens: usize,
}

impl Segmentation {
    pub fn chunk_texts(&self) -> Vec<&str> {
        self.chunks.iter().map(|c| c.text.as_str()).collect()
    }
}

/// Splits text into fixed, non-overlapping token windows. Boundaries may fall
/// mid-word; they only bound completion-service input size.
#[derive(Clone)]
pub struct ChunkSegmenter {
    tokenizer: Arc<dyn Tokenizer>,
}

impl ChunkSegmenter {
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }

    pub fn segment(&self, text: &str, max_tokens: usize) -> Result<Segmentation, SegmentError> {
        if text.is_empty() {
            return Err(SegmentError::EmptyText);
        }
        if max_tokens == 0 {
            return Err(SegmentError::InvalidMaxTokens);
        }

        let tokens = self.tokenizer.encode(text);
        let total_tokens = tokens.len();

        let mut chunks = Vec::with_capacity(total_tokens.div_ceil(max_tokens));
        for (index, window) in tokens.chunks(max_tokens).enumerate() {
            let start = index * max_tokens;
            chunks.push(Chunk {
                index,
                text: self.tokenizer.decode(window)?,
                token_count: window.len(),
                token_range: start..start + window.len(),
            });
        }

        debug!(
            "Segmented {} tokens into {} chunks (max {} tokens)",
            total_tokens,
            chunks.len(),
            max_tokens
        );

        Ok(Segmentation {
            chunks,
            total_tokens,
        })
    }
}

/// One token per `char`; exact token counts for tests.
#[cfg(test)]
pub(crate) struct CharTokenizer;

#[cfg(test)]
impl Tokenizer for CharTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        text.chars().map(u32::from).collect()
    }

    fn decode(&self, tokens: &[u32]) -> Result<String, SegmentError> {
        Ok(tokens
            .iter()
            .map(|t| char::from_u32(*t).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect())
    }
}
