//! Slide traversal and export

pub mod context;
pub mod driver;
pub mod generic;
pub mod navigator;
pub mod options;
pub mod renderer;

// Re-export commonly used items
pub use context::RunContext;
pub use driver::{run, Driver, DriverState, ExportSummary};
pub use generic::{GenericNavigator, KeyboardSurface};
pub use navigator::{Capabilities, Navigator, NavigatorRegistry};
pub use options::{ExportOptions, ImageFormat, ScreenshotOptions, SlideRange, ViewportSize};
pub use renderer::PageRenderer;
