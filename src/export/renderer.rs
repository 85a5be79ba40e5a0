//! The page-rendering collaborator

use async_trait::async_trait;

use super::options::{ImageFormat, ViewportSize};
use crate::error::Result;

/// Renders the presentation's current state
///
/// Implementations wrap a browser page or anything else able to print the
/// slide currently shown.
#[async_trait]
pub trait PageRenderer: Send {
    /// Print the current slide as a standalone one-page PDF, background included
    async fn render_pdf(&mut self, size: ViewportSize) -> Result<Vec<u8>>;

    /// Rasterize the current viewport
    async fn render_raster(&mut self, size: ViewportSize, format: ImageFormat) -> Result<Vec<u8>>;

    async fn set_viewport(&mut self, size: ViewportSize) -> Result<()>;

    async fn current_url(&mut self) -> Result<String>;
}
