//! Font consolidation across slides
//!
//! Composite fonts whose descendant is TrueType based are keyed by their
//! declared name plus the program's own name table fingerprint. The first
//! occurrence of a key becomes the canonical program object; later
//! occurrences contribute the glyphs the canonical program lacks and have
//! their page references redirected to it.

use std::collections::BTreeMap;

use lopdf::ObjectId;

use super::program::FontProgram;
use crate::error::{Error, Result};

/// Identity of a logical font: `declaredName-fingerprint`
///
/// Declared names alone are unreliable because some platforms drop the
/// sub-family from them.
pub fn font_key(declared_name: &str, program: &FontProgram) -> String {
    format!("{}-{}", declared_name, program.fingerprint())
}

/// One logical font seen during the run
#[derive(Debug, Clone)]
pub struct FontEntry {
    canonical: ObjectId,
    program: FontProgram,
    occurrences: usize,
}

impl FontEntry {
    /// Output object that will hold the merged program
    pub fn canonical(&self) -> ObjectId {
        self.canonical
    }

    pub fn program(&self) -> &FontProgram {
        &self.program
    }

    /// Number of embedded programs merged into this entry, including the first
    pub fn occurrences(&self) -> usize {
        self.occurrences
    }
}

/// Outcome of offering an embedded program to the consolidator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consolidation {
    /// First sighting: the offered object is now canonical
    Registered { canonical: ObjectId },
    /// The key was already known; `adopted` glyph outlines were merged in
    Merged { canonical: ObjectId, adopted: usize },
}

impl Consolidation {
    pub fn canonical(&self) -> ObjectId {
        match self {
            Consolidation::Registered { canonical } | Consolidation::Merged { canonical, .. } => *canonical,
        }
    }
}

/// Index of logical fonts, keyed by [`font_key`]
///
/// Entries are never evicted during a run.
#[derive(Debug, Default)]
pub struct FontConsolidator {
    entries: BTreeMap<String, FontEntry>,
}

impl FontConsolidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer the program stored in `object_id`, declared as `declared_name`
    ///
    /// Returns [`Error::MalformedFontProgram`] when the program cannot be
    /// parsed; the index is left untouched in that case.
    pub fn consolidate(
        &mut self,
        declared_name: &str,
        program_bytes: &[u8],
        object_id: ObjectId,
    ) -> Result<Consolidation> {
        let program = FontProgram::parse(program_bytes).map_err(|e| Error::MalformedFontProgram {
            font: declared_name.to_string(),
            reason: e.to_string(),
        })?;
        let key = font_key(declared_name, &program);

        match self.entries.get_mut(&key) {
            Some(entry) => {
                let adopted = entry.program.merge(&program);
                entry.occurrences += 1;
                log::debug!(
                    "Merged {} glyph(s) of {} into object {:?}",
                    adopted, key, entry.canonical
                );
                Ok(Consolidation::Merged { canonical: entry.canonical, adopted })
            }
            None => {
                log::debug!("Registered font {} as object {:?}", key, object_id);
                self.entries.insert(
                    key,
                    FontEntry { canonical: object_id, program, occurrences: 1 },
                );
                Ok(Consolidation::Registered { canonical: object_id })
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&FontEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FontEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    /// Serialize every merged program, consuming the index
    ///
    /// Returns `(canonical object, program bytes)` pairs in key order.
    pub fn finalize(self) -> Vec<(ObjectId, Vec<u8>)> {
        self.entries
            .into_values()
            .map(|entry| (entry.canonical, entry.program.to_bytes()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::glyf::tests::{empty, outline};
    use crate::font::program::tests::build_font;
    use crate::font::Glyph;
    use ttf_parser::name::name_id;

    fn arial_bold(glyphs: &[Glyph]) -> Vec<u8> {
        build_font(&[(name_id::FAMILY, "Arial"), (name_id::SUBFAMILY, "Bold")], glyphs)
    }

    #[test]
    fn test_key_combines_declared_name_and_fingerprint() {
        let program = FontProgram::parse(&arial_bold(&[empty(0)])).unwrap();
        assert_eq!(font_key("Arial", &program), "Arial-family=Arial,subfamily=Bold");
    }

    #[test]
    fn test_first_sighting_registers_offered_object() {
        let mut fonts = FontConsolidator::new();
        let outcome = fonts.consolidate("Arial", &arial_bold(&[empty(0)]), (7, 0)).unwrap();

        assert_eq!(outcome, Consolidation::Registered { canonical: (7, 0) });
        assert_eq!(fonts.len(), 1);
    }

    #[test]
    fn test_later_sighting_merges_into_first() {
        let a = outline(65, 0);
        let exclam = outline(33, 0);
        let b = outline(66, 0);

        let mut fonts = FontConsolidator::new();
        fonts.consolidate("Arial", &arial_bold(&[empty(0), a.clone()]), (7, 0)).unwrap();
        let outcome = fonts
            .consolidate("Arial", &arial_bold(&[exclam.clone(), empty(0), b.clone()]), (31, 0))
            .unwrap();

        assert_eq!(outcome, Consolidation::Merged { canonical: (7, 0), adopted: 2 });

        let entry = fonts.get("Arial-family=Arial,subfamily=Bold").unwrap();
        let glyphs = entry.program().glyphs();
        assert_eq!(entry.occurrences(), 2);
        assert_eq!(glyphs.len(), 3);
        assert_eq!(glyphs.get(0).map(|g| &g.outline[..19]), Some(&exclam.outline[..]));
        assert_eq!(glyphs.get(1).map(|g| &g.outline[..19]), Some(&a.outline[..]));
        assert_eq!(glyphs.get(2).map(|g| &g.outline[..19]), Some(&b.outline[..]));
    }

    #[test]
    fn test_different_subfamily_is_a_different_font() {
        let regular = build_font(&[(name_id::FAMILY, "Arial"), (name_id::SUBFAMILY, "Regular")], &[empty(0)]);

        let mut fonts = FontConsolidator::new();
        fonts.consolidate("Arial", &arial_bold(&[empty(0)]), (7, 0)).unwrap();
        let outcome = fonts.consolidate("Arial", &regular, (9, 0)).unwrap();

        assert_eq!(outcome, Consolidation::Registered { canonical: (9, 0) });
        assert_eq!(fonts.len(), 2);
    }

    #[test]
    fn test_malformed_program_leaves_index_untouched() {
        let mut fonts = FontConsolidator::new();
        let err = fonts.consolidate("Fallback", b"\0\x01\0\0garbage", (3, 0)).unwrap_err();

        assert!(matches!(err, Error::MalformedFontProgram { ref font, .. } if font == "Fallback"));
        assert!(fonts.is_empty());
    }

    #[test]
    fn test_finalize_serializes_merged_programs() {
        let mut fonts = FontConsolidator::new();
        fonts.consolidate("Arial", &arial_bold(&[empty(0), outline(65, 0)]), (7, 0)).unwrap();
        fonts.consolidate("Arial", &arial_bold(&[outline(33, 0)]), (31, 0)).unwrap();

        let programs = fonts.finalize();

        assert_eq!(programs.len(), 1);
        assert_eq!(programs[0].0, (7, 0));
        let merged = FontProgram::parse(&programs[0].1).unwrap();
        assert!(merged.glyphs().iter().all(Glyph::is_populated));
    }
}
