pub mod extractor;
pub mod segmenter;

pub use extractor::{PdfExtractor, SourceDocument, SourceLocator, TextExtractor, WebPageExtractor};
pub use segmenter::{Chunk, ChunkSegmenter, Segmentation, TiktokenTokenizer, Tokenizer};
