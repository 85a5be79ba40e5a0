//! Glyph table model: per-glyph outlines with their horizontal metrics

use super::sfnt::{read_i16, read_u16, read_u32};
use super::FontError;

/// The kind of outline a glyph carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphKind {
    /// No outline (e.g. space, or a glyph dropped by subsetting)
    Empty,
    /// One or more contours
    Simple,
    /// References to other glyph ids
    Composite,
}

/// One glyph: its raw `glyf` record and its `hmtx` metrics
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Glyph {
    /// Raw glyph description as stored in `glyf` (may be empty)
    pub outline: Vec<u8>,
    pub advance_width: u16,
    pub left_side_bearing: i16,
}

impl Glyph {
    /// Placeholder used to pad a table: no contours, zero advance, zero bearing
    pub fn placeholder() -> Self {
        Self::default()
    }

    pub fn kind(&self) -> GlyphKind {
        match read_i16(&self.outline, 0) {
            Some(contours) if contours > 0 => GlyphKind::Simple,
            Some(contours) if contours < 0 => GlyphKind::Composite,
            _ => GlyphKind::Empty,
        }
    }

    /// Whether the glyph carries outline or compound data
    pub fn is_populated(&self) -> bool {
        self.kind() != GlyphKind::Empty
    }
}

/// Glyphs ordered by glyph id
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlyphTable {
    glyphs: Vec<Glyph>,
}

impl GlyphTable {
    pub fn new(glyphs: Vec<Glyph>) -> Self {
        Self { glyphs }
    }

    /// Decode glyphs from the `loca`, `glyf` and `hmtx` tables
    ///
    /// `long_offsets` is `head.indexToLocFormat == 1`, `num_h_metrics` is
    /// `hhea.numberOfHMetrics`.
    pub fn parse(
        num_glyphs: u16,
        long_offsets: bool,
        num_h_metrics: u16,
        loca: &[u8],
        glyf: &[u8],
        hmtx: &[u8],
    ) -> Result<Self, FontError> {
        let num_glyphs = num_glyphs as usize;
        let num_h_metrics = num_h_metrics as usize;
        if num_h_metrics == 0 && num_glyphs > 0 {
            return Err(FontError::Invalid("hhea declares no horizontal metrics".to_string()));
        }

        let location = |index: usize| -> Option<usize> {
            if long_offsets {
                read_u32(loca, index * 4).map(|v| v as usize)
            } else {
                read_u16(loca, index * 2).map(|v| v as usize * 2)
            }
        };

        let mut glyphs = Vec::with_capacity(num_glyphs);
        let mut last_advance = 0;
        for id in 0..num_glyphs {
            let start = location(id).ok_or(FontError::Truncated("loca"))?;
            let end = location(id + 1).ok_or(FontError::Truncated("loca"))?;
            let outline = if end > start {
                glyf.get(start..end)
                    .ok_or(FontError::Truncated("glyf"))?
                    .to_vec()
            } else {
                Vec::new()
            };

            let (advance_width, left_side_bearing) = if id < num_h_metrics {
                let advance = read_u16(hmtx, id * 4).ok_or(FontError::Truncated("hmtx"))?;
                let bearing = read_i16(hmtx, id * 4 + 2).ok_or(FontError::Truncated("hmtx"))?;
                last_advance = advance;
                (advance, bearing)
            } else {
                let at = num_h_metrics * 4 + (id - num_h_metrics) * 2;
                (last_advance, read_i16(hmtx, at).ok_or(FontError::Truncated("hmtx"))?)
            };

            glyphs.push(Glyph { outline, advance_width, left_side_bearing });
        }

        Ok(Self { glyphs })
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&Glyph> {
        self.glyphs.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Glyph> {
        self.glyphs.iter()
    }

    /// Merge one incoming glyph at `id`, returning whether it was adopted
    ///
    /// A missing slot always takes the incoming glyph; an existing slot only
    /// takes it when the slot is empty and the incoming glyph is populated.
    /// Slots between the current end and `id` are filled with placeholders.
    pub fn merge_glyph(&mut self, id: usize, glyph: &Glyph) -> bool {
        if id >= self.glyphs.len() {
            self.glyphs.resize_with(id, Glyph::placeholder);
            self.glyphs.push(glyph.clone());
            return glyph.is_populated();
        }

        let existing = &mut self.glyphs[id];
        if !existing.is_populated() && glyph.is_populated() {
            *existing = glyph.clone();
            return true;
        }
        false
    }

    /// Merge every glyph of `other`, returning the number of outlines adopted
    pub fn merge(&mut self, other: &GlyphTable) -> usize {
        other
            .glyphs
            .iter()
            .enumerate()
            .filter(|(id, glyph)| self.merge_glyph(*id, glyph))
            .count()
    }

    /// Encode as `(glyf, loca, hmtx)` with long `loca` offsets and one full
    /// metric per glyph
    pub fn encode(&self) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        let mut glyf = Vec::new();
        let mut loca = Vec::with_capacity((self.glyphs.len() + 1) * 4);
        let mut hmtx = Vec::with_capacity(self.glyphs.len() * 4);

        for glyph in &self.glyphs {
            loca.extend_from_slice(&(glyf.len() as u32).to_be_bytes());
            glyf.extend_from_slice(&glyph.outline);
            glyf.resize((glyf.len() + 3) & !3, 0);

            hmtx.extend_from_slice(&glyph.advance_width.to_be_bytes());
            hmtx.extend_from_slice(&glyph.left_side_bearing.to_be_bytes());
        }
        loca.extend_from_slice(&(glyf.len() as u32).to_be_bytes());

        (glyf, loca, hmtx)
    }
}
