//! Export configuration

use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;
use crate::pdf::metadata::DocumentMetadata;

/// Viewport size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for ViewportSize {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl fmt::Display for ViewportSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for ViewportSize {
    type Err = Error;

    /// Parse `<width>x<height>`, e.g. `1280x720`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidSize(s.to_string());

        let (width, height) = s.trim().split_once('x').ok_or_else(invalid)?;
        let width: u32 = width.parse().map_err(|_| invalid())?;
        let height: u32 = height.parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self::new(width, height))
    }
}

/// Set of 1-based slide indexes to export, kept as inclusive spans
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideRange {
    spans: Vec<RangeInclusive<u32>>,
}

impl SlideRange {
    pub fn contains(&self, slide: u32) -> bool {
        self.spans.iter().any(|span| span.contains(&slide))
    }

    /// Highest index in the range; traversal stops there
    pub fn max(&self) -> Option<u32> {
        self.spans.iter().map(|span| *span.end()).max()
    }
}

impl FromStr for SlideRange {
    type Err = Error;

    /// Parse a combination of indexes and inclusive ranges, e.g. `1-3,5,8`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidRange(s.to_string());
        let index = |part: &str| -> Result<u32, Error> {
            match part.trim().parse::<u32>() {
                Ok(0) | Err(_) => Err(invalid()),
                Ok(n) => Ok(n),
            }
        };

        let mut spans = Vec::new();
        for part in s.split(',') {
            match part.split_once('-') {
                Some((start, end)) => {
                    let (start, end) = (index(start)?, index(end)?);
                    if start > end {
                        return Err(invalid());
                    }
                    spans.push(start..=end);
                }
                None => {
                    let slide = index(part)?;
                    spans.push(slide..=slide);
                }
            }
        }
        Ok(Self { spans })
    }
}

/// Raster format of screenshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Png,
    Jpg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpg",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpg),
            other => Err(Error::General(format!("Unsupported screenshot format: {other}"))),
        }
    }
}

/// Screenshot side-output settings
#[derive(Debug, Clone)]
pub struct ScreenshotOptions {
    /// Directory the screenshots are written to
    pub directory: PathBuf,
    /// Resolutions to capture; the export viewport when empty
    pub sizes: Vec<ViewportSize>,
    pub format: ImageFormat,
    /// Delay after each viewport change
    pub settle: Duration,
}

impl Default for ScreenshotOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("screenshots"),
            sizes: Vec::new(),
            format: ImageFormat::Png,
            settle: Duration::from_millis(1000),
        }
    }
}

/// Options for an export run
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Path of the assembled PDF
    pub output_path: PathBuf,
    /// Viewport override; else the navigator's preferred size, else 1280x720
    pub size: Option<ViewportSize>,
    /// Settle delay before each capture
    pub pause: Duration,
    /// Delay before the navigator is configured
    pub load_pause: Duration,
    /// Only these slides are captured
    pub slides: Option<SlideRange>,
    /// Hard maximum slide index
    pub max_slides: Option<u32>,
    pub capture_timeout: Duration,
    pub navigation_timeout: Duration,
    pub screenshots: Option<ScreenshotOptions>,
    pub metadata: DocumentMetadata,
    /// Keep link annotations of rendered slides
    pub copy_links: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("slides.pdf"),
            size: None,
            pause: Duration::from_millis(1000),
            load_pause: Duration::ZERO,
            slides: None,
            max_slides: None,
            capture_timeout: Duration::from_secs(30),
            navigation_timeout: Duration::from_secs(30),
            screenshots: None,
            metadata: DocumentMetadata::default(),
            copy_links: true,
        }
    }
}

impl ExportOptions {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            ..Default::default()
        }
    }

    /// Whether slide `index` is captured (rather than only traversed)
    pub fn includes(&self, index: u32) -> bool {
        self.slides.as_ref().map_or(true, |range| range.contains(index))
    }

    /// Index at which traversal stops, if bounded
    pub fn max_index(&self) -> Option<u32> {
        match (self.slides.as_ref().and_then(SlideRange::max), self.max_slides) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}
