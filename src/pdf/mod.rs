//! PDF assembly module

pub mod assemble;
pub mod dedup;
pub mod graph;
pub mod metadata;
pub mod output;

// Re-export commonly used items
pub use assemble::{AssembleOptions, DocumentAssembler, PageMerge};
pub use dedup::{ImageDecision, ImageDeduplicator, ImageDigest};
pub use metadata::{inspect_pdf, DocumentMetadata, PdfSummary};
pub use output::{document_bytes, save_document, OutputDocument};
