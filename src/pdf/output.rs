//! The output document and its finalization
//!
//! Pages are moved into a single lopdf arena as they are assembled. The page
//! tree, catalog and Info dictionary are only built when the run finalizes,
//! after the consolidated font programs have been written into their
//! canonical objects.

use std::collections::BTreeSet;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId};

use super::graph::collect_references;
use super::metadata::DocumentMetadata;
use crate::error::{Error, Result};
use crate::font::FontConsolidator;

/// The assembled PDF being built
pub struct OutputDocument {
    doc: Document,
    page_ids: Vec<ObjectId>,
    metadata: DocumentMetadata,
}

impl OutputDocument {
    pub fn new(metadata: DocumentMetadata) -> Self {
        Self {
            doc: Document::with_version("1.5"),
            page_ids: Vec::new(),
            metadata,
        }
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    /// Pages merged so far, in traversal order
    pub fn page_ids(&self) -> &[ObjectId] {
        &self.page_ids
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn object_count(&self) -> usize {
        self.doc.objects.len()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.doc.objects.contains_key(&id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.doc.objects.get(&id)
    }

    /// First object number not yet used by the output
    pub(crate) fn next_free_id(&self) -> u32 {
        self.doc.max_id + 1
    }

    pub(crate) fn insert(&mut self, id: ObjectId, object: Object) {
        self.doc.max_id = self.doc.max_id.max(id.0);
        self.doc.objects.insert(id, object);
    }

    pub(crate) fn remove(&mut self, id: ObjectId) -> Option<Object> {
        self.doc.objects.remove(&id)
    }

    pub(crate) fn push_page(&mut self, page_id: ObjectId) {
        self.page_ids.push(page_id);
    }

    /// Check that every reference held by `ids` resolves to a live object
    pub(crate) fn verify_references(&self, ids: &BTreeSet<ObjectId>) -> Result<()> {
        let mut references = Vec::new();
        for id in ids {
            if let Some(object) = self.doc.objects.get(id) {
                references.clear();
                collect_references(object, &mut references);
                if let Some(missing) = references.iter().find(|r| !self.doc.objects.contains_key(r)) {
                    return Err(Error::ObjectGraphInconsistency(format!(
                        "object {} {} R references deleted object {} {} R",
                        id.0, id.1, missing.0, missing.1
                    )));
                }
            }
        }
        Ok(())
    }

    /// Flush consolidated fonts and build the document structure
    ///
    /// Every font entry's merged program is written into its canonical
    /// object, then the page tree, catalog and Info dictionary are created.
    /// Objects left unreachable by deduplication are pruned.
    pub fn finalize(mut self, fonts: FontConsolidator) -> Result<Document> {
        for (id, program) in fonts.finalize() {
            match self.doc.objects.get_mut(&id) {
                Some(Object::Stream(stream)) => {
                    let length = program.len() as i64;
                    stream.set_plain_content(program);
                    stream.dict.set("Length1", Object::Integer(length));
                }
                _ => {
                    return Err(Error::ObjectGraphInconsistency(format!(
                        "canonical font object {} {} R is missing",
                        id.0, id.1
                    )));
                }
            }
        }

        let mut doc = self.doc;
        let pages_id = doc.new_object_id();

        let kids: Vec<Object> = self.page_ids
            .iter()
            .map(|&id| Object::Reference(id))
            .collect();

        let mut pages_object = Dictionary::new();
        pages_object.set("Type", Object::Name(b"Pages".to_vec()));
        pages_object.set("Count", Object::Integer(self.page_ids.len() as i64));
        pages_object.set("Kids", Object::Array(kids));

        let catalog_id = doc.new_object_id();
        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));

        doc.objects.insert(catalog_id, Object::Dictionary(catalog));
        doc.objects.insert(pages_id, Object::Dictionary(pages_object));

        let info_id = doc.add_object(Object::Dictionary(self.metadata.to_info_dictionary()));

        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc.trailer.set("Info", Object::Reference(info_id));

        for &page_id in &self.page_ids {
            if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(page_id) {
                dict.set("Parent", Object::Reference(pages_id));
            }
        }

        let pruned = doc.prune_objects();
        if !pruned.is_empty() {
            log::debug!("Pruned {} unreachable object(s)", pruned.len());
        }

        doc.compress();
        Ok(doc)
    }
}

/// Serialize a finalized document to `path`
///
/// Missing parent directories are created. The document is written to a
/// sibling temporary file first and renamed into place, so a failed write
/// never leaves a file at `path`.
pub fn save_document(doc: &mut Document, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let partial = partial_path(path);
    let mut buffer = Vec::new();
    doc.save_to(&mut Cursor::new(&mut buffer))?;
    if let Err(e) = fs::write(&partial, &buffer).and_then(|_| fs::rename(&partial, path)) {
        let _ = fs::remove_file(&partial);
        return Err(Error::Io(e));
    }
    Ok(())
}

/// Serialize a finalized document into memory
pub fn document_bytes(doc: &mut Document) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    doc.save_to(&mut Cursor::new(&mut buffer))?;
    Ok(buffer)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::metadata::inspect_document;
    use tempfile::TempDir;

    fn blank_page(output: &mut OutputDocument) -> ObjectId {
        let id = (output.next_free_id(), 0);
        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("MediaBox", Object::Array(vec![
            Object::Integer(0), Object::Integer(0), Object::Integer(1280), Object::Integer(720),
        ]));
        output.insert(id, Object::Dictionary(page));
        output.push_page(id);
        id
    }

    #[test]
    fn test_finalize_builds_page_tree_in_order() {
        let mut output = OutputDocument::new(DocumentMetadata::default());
        let first = blank_page(&mut output);
        let second = blank_page(&mut output);

        let doc = output.finalize(FontConsolidator::new()).unwrap();

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        assert_eq!(pages, vec![first, second]);
        let summary = inspect_document(&doc).unwrap();
        assert_eq!(summary.page_count, 2);
        assert_eq!(summary.creator.as_deref(), Some("deck-export"));
    }

    #[test]
    fn test_finalize_prunes_unreachable_objects() {
        let mut output = OutputDocument::new(DocumentMetadata::default());
        blank_page(&mut output);
        let orphan = (output.next_free_id(), 0);
        output.insert(orphan, Object::Integer(7));

        let doc = output.finalize(FontConsolidator::new()).unwrap();
        assert!(!doc.objects.contains_key(&orphan));
    }

    #[test]
    fn test_verify_references_reports_deleted_target() {
        let mut output = OutputDocument::new(DocumentMetadata::default());
        let page = blank_page(&mut output);
        if let Some(Object::Dictionary(dict)) = output.doc.objects.get_mut(&page) {
            dict.set("Contents", Object::Reference((99, 0)));
        }

        let err = output.verify_references(&BTreeSet::from([page])).unwrap_err();
        assert!(matches!(err, Error::ObjectGraphInconsistency(_)));
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("nested").join("deck.pdf");

        let mut output = OutputDocument::new(DocumentMetadata::default());
        blank_page(&mut output);
        let mut doc = output.finalize(FontConsolidator::new()).unwrap();
        save_document(&mut doc, &path).unwrap();

        assert!(path.exists());
        assert!(!partial_path(&path).exists());
        let reloaded = Document::load(&path).unwrap();
        assert_eq!(reloaded.get_pages().len(), 1);
    }
}
