//! Error types for the deck export library

use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the deck export library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error, surfaced verbatim
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No navigator is compatible with the loaded presentation
    #[error("{}", incompatible_message(.navigator))]
    NavigationIncompatible { navigator: Option<String> },

    /// A navigator operation failed
    #[error("{navigator} navigator failed: {message}")]
    Navigation { navigator: String, message: String },

    /// The page renderer failed
    #[error("Renderer error: {0}")]
    Render(String),

    /// The renderer did not produce a page buffer in time
    #[error("Slide capture timed out after {0:?}")]
    CaptureTimeout(Duration),

    /// A navigator operation did not complete in time
    #[error("Navigator {operation} timed out after {after:?}")]
    NavigationTimeout { operation: &'static str, after: Duration },

    /// An embedded font program could not be parsed
    #[error("Malformed font program for {font}: {reason}")]
    MalformedFontProgram { font: String, reason: String },

    /// A reference in the object graph could not be resolved
    #[error("Object graph inconsistency: {0}")]
    ObjectGraphInconsistency(String),

    /// The rendered buffer contains no page
    #[error("Rendered PDF has no pages")]
    EmptyPage,

    /// Invalid viewport size expression
    #[error("Invalid size: {0} (expected <width>x<height>, e.g. 1280x720)")]
    InvalidSize(String),

    /// Invalid slide range expression
    #[error("Invalid slide range: {0} (expected indexes and ranges, e.g. '1-3,5,8')")]
    InvalidRange(String),

    /// General error
    #[error("{0}")]
    General(String),
}

fn incompatible_message(navigator: &Option<String>) -> String {
    match navigator {
        Some(name) => format!("Unable to activate the {name} navigator for this presentation"),
        None => "No compatible navigator found for this presentation".to_string(),
    }
}

impl Error {
    /// Whether the error only affects one resource and the run can continue
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::MalformedFontProgram { .. })
    }
}
