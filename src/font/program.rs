//! Parsed TrueType programs embedded as `FontFile2` streams

use std::collections::BTreeMap;

use ttf_parser::name::name_id;

use super::glyf::GlyphTable;
use super::sfnt::{self, read_u16, write_u16, Tag};
use super::FontError;

const HEAD_INDEX_TO_LOC_FORMAT: usize = 50;
const HHEA_NUMBER_OF_H_METRICS: usize = 34;
const MAXP_NUM_GLYPHS: usize = 4;
/// `maxp` version 1.0 limit fields span bytes 6..32
const MAXP_LIMITS: std::ops::Range<usize> = 6..32;

/// Tables whose contents are indexed by glyph count and cannot survive a merge
const GLYPH_COUNT_TABLES: [&Tag; 3] = [b"hdmx", b"LTSH", b"VDMX"];

/// Name table fields making up the fingerprint, in order
const FINGERPRINT_FIELDS: [(&str, u16); 6] = [
    ("family", name_id::FAMILY),
    ("subfamily", name_id::SUBFAMILY),
    ("fullName", name_id::FULL_NAME),
    ("preferredFamily", name_id::TYPOGRAPHIC_FAMILY),
    ("preferredSubFamily", name_id::TYPOGRAPHIC_SUBFAMILY),
    ("uniqueSubFamily", name_id::UNIQUE_ID),
];

/// A TrueType program split into its glyphs and its remaining tables
#[derive(Debug, Clone)]
pub struct FontProgram {
    /// Every table except `glyf`, `loca` and `hmtx`
    tables: BTreeMap<Tag, Vec<u8>>,
    glyphs: GlyphTable,
    fingerprint: String,
}

impl FontProgram {
    pub fn parse(data: &[u8]) -> Result<Self, FontError> {
        let face = ttf_parser::Face::parse(data, 0)?;
        let fingerprint = fingerprint(&face);

        let mut tables = sfnt::read_tables(data)?;
        let glyf = tables.remove(b"glyf").ok_or(FontError::MissingTable("glyf"))?;
        let loca = tables.remove(b"loca").ok_or(FontError::MissingTable("loca"))?;
        let hmtx = tables.remove(b"hmtx").ok_or(FontError::MissingTable("hmtx"))?;

        let head = tables.get(b"head").ok_or(FontError::MissingTable("head"))?;
        let hhea = tables.get(b"hhea").ok_or(FontError::MissingTable("hhea"))?;
        let maxp = tables.get(b"maxp").ok_or(FontError::MissingTable("maxp"))?;

        let long_offsets = read_u16(head, HEAD_INDEX_TO_LOC_FORMAT).ok_or(FontError::Truncated("head"))? == 1;
        let num_h_metrics = read_u16(hhea, HHEA_NUMBER_OF_H_METRICS).ok_or(FontError::Truncated("hhea"))?;
        let num_glyphs = read_u16(maxp, MAXP_NUM_GLYPHS).ok_or(FontError::Truncated("maxp"))?;

        let glyphs = GlyphTable::parse(num_glyphs, long_offsets, num_h_metrics, &loca, &glyf, &hmtx)?;

        Ok(Self { tables, glyphs, fingerprint })
    }

    /// Deterministic summary of the program's own naming, e.g.
    /// `family=Arial,subfamily=Bold`
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn glyphs(&self) -> &GlyphTable {
        &self.glyphs
    }

    /// Merge another subset of the same font, returning the number of
    /// glyph outlines adopted from it
    pub fn merge(&mut self, other: &FontProgram) -> usize {
        if let (Some(ours), Some(theirs)) = (self.tables.get_mut(b"maxp"), other.tables.get(b"maxp")) {
            if ours.len() >= MAXP_LIMITS.end && theirs.len() >= MAXP_LIMITS.end {
                for offset in MAXP_LIMITS.step_by(2) {
                    let a = read_u16(ours, offset).unwrap_or(0);
                    let b = read_u16(theirs, offset).unwrap_or(0);
                    write_u16(ours, offset, a.max(b));
                }
            }
        }
        self.glyphs.merge(&other.glyphs)
    }

    /// Serialize the program with the current glyph table
    pub fn to_bytes(&self) -> Vec<u8> {
        let (glyf, loca, hmtx) = self.glyphs.encode();
        let num_glyphs = self.glyphs.len() as u16;

        let mut tables = self.tables.clone();
        for tag in GLYPH_COUNT_TABLES {
            tables.remove(tag);
        }
        if let Some(head) = tables.get_mut(b"head") {
            if head.len() >= HEAD_INDEX_TO_LOC_FORMAT + 2 {
                write_u16(head, HEAD_INDEX_TO_LOC_FORMAT, 1);
            }
        }
        if let Some(hhea) = tables.get_mut(b"hhea") {
            if hhea.len() >= HHEA_NUMBER_OF_H_METRICS + 2 {
                write_u16(hhea, HHEA_NUMBER_OF_H_METRICS, num_glyphs);
            }
        }
        if let Some(maxp) = tables.get_mut(b"maxp") {
            if maxp.len() >= MAXP_NUM_GLYPHS + 2 {
                write_u16(maxp, MAXP_NUM_GLYPHS, num_glyphs);
            }
        }
        // glyph names in post 2.0 are indexed by glyph id
        if let Some(post) = tables.get_mut(b"post") {
            if post.len() >= 32 && post[..4] == [0, 2, 0, 0] {
                post.truncate(32);
                post[..4].copy_from_slice(&[0, 3, 0, 0]);
            }
        }

        tables.insert(*b"glyf", glyf);
        tables.insert(*b"loca", loca);
        tables.insert(*b"hmtx", hmtx);
        sfnt::write_tables(&tables)
    }
}

fn fingerprint(face: &ttf_parser::Face<'_>) -> String {
    let mut values: [Option<String>; FINGERPRINT_FIELDS.len()] = Default::default();

    for entry in face.names() {
        let Some(slot) = FINGERPRINT_FIELDS.iter().position(|(_, id)| *id == entry.name_id) else {
            continue;
        };
        if values[slot].is_some() {
            continue;
        }
        if let Some(value) = entry.to_string() {
            values[slot] = Some(value);
        }
    }

    FINGERPRINT_FIELDS
        .iter()
        .zip(values.iter())
        .filter_map(|((field, _), value)| value.as_ref().map(|v| format!("{field}={v}")))
        .collect::<Vec<_>>()
        .join(",")
}
