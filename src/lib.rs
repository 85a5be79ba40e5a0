//! Deck Export Library
//!
//! Exports a paginated presentation into a single compact PDF.
//! This library provides functionality to:
//! - Drive a navigator and a page renderer through every slide
//! - Assemble the rendered one-page PDFs into one document
//! - Deduplicate repeated embedded images by content digest
//! - Consolidate font subsets of the same logical font into one program
//! - Inspect assembled files
//!
//! # Example
//!
//! ```no_run
//! use deck_export::export::{run, ExportOptions};
//! use deck_export::playback::playback;
//! use std::path::PathBuf;
//!
//! # async fn export() -> deck_export::Result<()> {
//! let (mut navigator, mut renderer) = playback(vec![
//!     PathBuf::from("slides/01.pdf"),
//!     PathBuf::from("slides/02.pdf"),
//! ]);
//! let options = ExportOptions::new("deck.pdf");
//!
//! let summary = run(&mut navigator, &mut renderer, &options).await?;
//! println!("Exported {} slides", summary.exported_slides);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod export;
pub mod font;
pub mod pdf;
pub mod playback;

// Re-export commonly used items
pub use error::{Error, Result};
