//! Per-run state shared by the driver and the assembler

use crate::font::FontConsolidator;
use crate::pdf::dedup::ImageDeduplicator;

/// Mutable state of one export run
///
/// Owned by the run and threaded through every page merge; nothing here is
/// global, so concurrent runs stay independent.
#[derive(Debug, Default)]
pub struct RunContext {
    /// 1-based index of the slide currently shown
    pub current_slide: u32,
    /// Slides captured and merged so far
    pub exported_slides: u32,
    /// Total slide count, when the navigator knows it
    pub total_slides: Option<u32>,
    pub images: ImageDeduplicator,
    pub fonts: FontConsolidator,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            current_slide: 1,
            ..Default::default()
        }
    }

    /// `<current>/<total>` progress label, with `?` for an unknown total
    pub fn progress(&self) -> String {
        match self.total_slides {
            Some(total) => format!("{}/{}", self.current_slide, total),
            None => format!("{}/?", self.current_slide),
        }
    }
}
