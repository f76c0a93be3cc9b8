//! Document ingestion: page-oriented PDF loading and token-bounded splitting

pub mod pdf_reader;
pub mod splitter;

pub use pdf_reader::{DocumentIter, PageTextFormatter, PdfPageReader};
pub use splitter::{count_tokens, TokenTextSplitter};
