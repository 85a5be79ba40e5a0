//! Traversal driver: walk the slides, capture each one, assemble the output
//!
//! The driver issues one step at a time and awaits the navigator or
//! renderer before issuing the next, so pages reach the assembler strictly
//! in traversal order. Any failure aborts the run before the output file
//! is written.

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use tokio::time::{sleep, timeout};

use super::context::RunContext;
use super::navigator::{Capabilities, Navigator};
use super::options::{ExportOptions, ScreenshotOptions, ViewportSize};
use super::renderer::PageRenderer;
use crate::error::{Error, Result};
use crate::pdf::assemble::{AssembleOptions, DocumentAssembler};
use crate::pdf::output::save_document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Configuring,
    Exporting,
    Finalizing,
    Done,
    Failed,
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub output_path: PathBuf,
    /// Slides captured into the output
    pub exported_slides: u32,
    /// Slides traversed, captured or not
    pub visited_slides: u32,
    pub distinct_images: usize,
    pub distinct_fonts: usize,
}

/// One export run over a navigator and a renderer
pub struct Driver<'a> {
    navigator: &'a mut dyn Navigator,
    renderer: &'a mut dyn PageRenderer,
    options: &'a ExportOptions,
    state: DriverState,
}

impl<'a> Driver<'a> {
    pub fn new(
        navigator: &'a mut dyn Navigator,
        renderer: &'a mut dyn PageRenderer,
        options: &'a ExportOptions,
    ) -> Self {
        Self {
            navigator,
            renderer,
            options,
            state: DriverState::Idle,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Export every slide and write the assembled PDF
    pub async fn run(&mut self) -> Result<ExportSummary> {
        match self.export().await {
            Ok(summary) => {
                self.transition(DriverState::Done);
                Ok(summary)
            }
            Err(e) => {
                self.transition(DriverState::Failed);
                Err(e)
            }
        }
    }

    fn transition(&mut self, state: DriverState) {
        debug!("Driver {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    async fn export(&mut self) -> Result<ExportSummary> {
        let options = self.options;
        let limit = options.navigation_timeout;

        if !options.load_pause.is_zero() {
            sleep(options.load_pause).await;
        }

        self.transition(DriverState::Configuring);
        let capabilities: Capabilities = self.navigator.capabilities();
        if capabilities.configure {
            navigation("configure", limit, self.navigator.configure()).await?;
        }

        let size = match options.size {
            Some(size) => size,
            None if capabilities.preferred_viewport => {
                navigation("preferred viewport size", limit, self.navigator.preferred_viewport_size())
                    .await?
                    .unwrap_or_default()
            }
            None => ViewportSize::default(),
        };
        capture(options.capture_timeout, self.renderer.set_viewport(size)).await?;

        let mut ctx = RunContext::new();
        ctx.total_slides = navigation("slide count", limit, self.navigator.slide_count()).await?;
        debug!(
            "Exporting with the {} navigator at {} ({:?} slides)",
            self.navigator.name(),
            size,
            ctx.total_slides
        );

        let mut assembler = DocumentAssembler::new(
            options.metadata.clone(),
            AssembleOptions { copy_links: options.copy_links },
        );
        let max_index = options.max_index();
        let mut screenshots = Vec::new();

        self.transition(DriverState::Exporting);
        loop {
            let label = navigation("current slide label", limit, self.navigator.current_slide_label()).await?;

            if options.includes(ctx.current_slide) {
                info!("Printing slide #{} ({}) ...", label, ctx.progress());
                if !options.pause.is_zero() {
                    sleep(options.pause).await;
                }
                let buffer = capture(options.capture_timeout, self.renderer.render_pdf(size)).await?;
                assembler.append_page(&mut ctx, &buffer)?;
                ctx.exported_slides += 1;

                if let Some(settings) = &options.screenshots {
                    let shots = self.capture_screenshots(settings, size, ctx.current_slide).await?;
                    screenshots.extend(shots);
                }
            } else {
                info!("Skipping slide #{} ({}) ...", label, ctx.progress());
            }

            let has_next = if capabilities.has_next_slide {
                navigation("has next slide", limit, self.navigator.has_next_slide()).await?
            } else {
                ctx.total_slides.is_some_and(|total| ctx.current_slide < total)
            };
            if !has_next || max_index.is_some_and(|max| ctx.current_slide >= max) {
                break;
            }

            navigation("advance", limit, self.navigator.advance()).await?;
            ctx.current_slide += 1;
        }

        self.transition(DriverState::Finalizing);
        let fonts = std::mem::take(&mut ctx.fonts);
        let summary = ExportSummary {
            output_path: options.output_path.clone(),
            exported_slides: ctx.exported_slides,
            visited_slides: ctx.current_slide,
            distinct_images: ctx.images.len(),
            distinct_fonts: fonts.len(),
        };
        let mut document = assembler.into_output().finalize(fonts)?;
        save_document(&mut document, &options.output_path)?;
        write_screenshots(&screenshots)?;

        info!(
            "Printed {} slide(s) to {}",
            summary.exported_slides,
            summary.output_path.display()
        );
        Ok(summary)
    }

    /// Rasterize the current slide at every configured resolution
    ///
    /// Images are held in memory and written once the PDF is saved, so a
    /// failed run leaves no screenshots behind.
    async fn capture_screenshots(
        &mut self,
        screenshots: &ScreenshotOptions,
        size: ViewportSize,
        slide: u32,
    ) -> Result<Vec<(PathBuf, Vec<u8>)>> {
        let limit = self.options.capture_timeout;
        let sizes = if screenshots.sizes.is_empty() {
            vec![size]
        } else {
            screenshots.sizes.clone()
        };

        let mut shots = Vec::with_capacity(sizes.len());
        for resolution in sizes {
            capture(limit, self.renderer.set_viewport(resolution)).await?;
            sleep(screenshots.settle).await;
            let image = capture(limit, self.renderer.render_raster(resolution, screenshots.format)).await?;
            shots.push((screenshot_path(&self.options.output_path, screenshots, slide, resolution), image));

            capture(limit, self.renderer.set_viewport(size)).await?;
            sleep(screenshots.settle).await;
        }
        Ok(shots)
    }
}

fn write_screenshots(shots: &[(PathBuf, Vec<u8>)]) -> Result<()> {
    for (path, image) in shots {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, image)?;
        debug!("Wrote screenshot {}", path.display());
    }
    Ok(())
}

/// `<directory>/<output stem>_<slide>_<width>x<height>.<ext>`
fn screenshot_path(output: &Path, screenshots: &ScreenshotOptions, slide: u32, size: ViewportSize) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "slides".to_string());
    screenshots
        .directory
        .join(format!("{}_{}_{}.{}", stem, slide, size, screenshots.format.extension()))
}

/// Await a navigator operation, bounded by the navigation timeout
async fn navigation<T>(
    operation: &'static str,
    after: Duration,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout(after, future).await {
        Ok(result) => result,
        Err(_) => Err(Error::NavigationTimeout { operation, after }),
    }
}

/// Await a renderer operation, bounded by the capture timeout
async fn capture<T>(after: Duration, future: impl Future<Output = Result<T>>) -> Result<T> {
    match timeout(after, future).await {
        Ok(result) => result,
        Err(_) => Err(Error::CaptureTimeout(after)),
    }
}

/// Export every slide the navigator reaches into `options.output_path`
pub async fn run(
    navigator: &mut dyn Navigator,
    renderer: &mut dyn PageRenderer,
    options: &ExportOptions,
) -> Result<ExportSummary> {
    Driver::new(navigator, renderer, options).run().await
}
