//! Document metadata: what we write into the Info dictionary, and what we
//! read back when inspecting an assembled file

use std::collections::BTreeSet;
use std::path::Path;

use chrono::Local;
use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{Error, Result};

/// Caller-configurable Info dictionary fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub creator: String,
    pub author: Option<String>,
    pub title: Option<String>,
    pub subject: Option<String>,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            creator: "deck-export".to_string(),
            author: None,
            title: None,
            subject: None,
        }
    }
}

impl DocumentMetadata {
    /// Build the Info dictionary, stamping producer and creation date
    pub fn to_info_dictionary(&self) -> Dictionary {
        let mut info = Dictionary::new();
        info.set("Creator", Object::string_literal(self.creator.as_str()));
        info.set(
            "Producer",
            Object::string_literal(format!("deck-export {}", env!("CARGO_PKG_VERSION"))),
        );
        info.set(
            "CreationDate",
            Object::string_literal(Local::now().format("D:%Y%m%d%H%M%S").to_string()),
        );
        for (key, value) in [("Author", &self.author), ("Title", &self.title), ("Subject", &self.subject)] {
            if let Some(value) = value {
                info.set(key, Object::string_literal(value.as_str()));
            }
        }
        info
    }
}

/// Count pages by reading the Count field from the Pages dictionary
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog_ref = doc.trailer.get(b"Root")
        .map_err(|_| Error::General("No Root in trailer".to_string()))?;

    let catalog_id = match catalog_ref {
        Object::Reference(id) => *id,
        _ => return Err(Error::General("Root is not a reference".to_string())),
    };

    let catalog_dict = match doc.get_object(catalog_id)? {
        Object::Dictionary(dict) => dict,
        _ => return Err(Error::General("Catalog is not a dictionary".to_string())),
    };

    let pages_id = match catalog_dict.get(b"Pages") {
        Ok(Object::Reference(id)) => *id,
        _ => return Err(Error::General("Pages is not a reference".to_string())),
    };

    let pages_dict = match doc.get_object(pages_id)? {
        Object::Dictionary(dict) => dict,
        _ => return Err(Error::General("Pages is not a dictionary".to_string())),
    };

    match pages_dict.get(b"Count") {
        Ok(Object::Integer(n)) => Ok(*n as usize),
        _ => Err(Error::General("Count is not an integer".to_string())),
    }
}

/// Summary of an assembled PDF
#[derive(Debug, Clone)]
pub struct PdfSummary {
    /// Number of pages in the PDF
    pub page_count: usize,
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    /// Number of image XObject streams
    pub image_count: usize,
    /// Number of distinct embedded font program streams
    pub font_program_count: usize,
}

/// Summarize a PDF file
pub fn inspect_pdf(path: &Path) -> Result<PdfSummary> {
    if !path.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File not found: {}", path.display()),
        )));
    }
    let doc = Document::load(path)?;
    inspect_document(&doc)
}

/// Summarize a loaded PDF document
pub fn inspect_document(doc: &Document) -> Result<PdfSummary> {
    let page_count = count_pages_from_catalog(doc)?;

    let mut title = None;
    let mut author = None;
    let mut creator = None;
    if let Ok(Object::Reference(info_id)) = doc.trailer.get(b"Info") {
        if let Ok(Object::Dictionary(info)) = doc.get_object(*info_id) {
            title = text_entry(info, b"Title");
            author = text_entry(info, b"Author");
            creator = text_entry(info, b"Creator");
        }
    }

    let mut image_count = 0;
    let mut font_programs: BTreeSet<ObjectId> = BTreeSet::new();
    for object in doc.objects.values() {
        let dict = match object {
            Object::Stream(stream) => &stream.dict,
            Object::Dictionary(dict) => dict,
            _ => continue,
        };
        if matches!(object, Object::Stream(_)) && matches!(dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Image") {
            image_count += 1;
        }
        for key in [&b"FontFile"[..], b"FontFile2", b"FontFile3"] {
            if let Ok(Object::Reference(id)) = dict.get(key) {
                font_programs.insert(*id);
            }
        }
    }

    Ok(PdfSummary {
        page_count,
        title,
        author,
        creator,
        image_count,
        font_program_count: font_programs.len(),
    })
}

fn text_entry(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key) {
        Ok(Object::String(bytes, _)) => Some(decode_text(bytes)),
        _ => None,
    }
}

fn decode_text(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    String::from_utf8_lossy(bytes).into_owned()
}
