//! Synthesized slides for the integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use deck_export::font::sfnt::write_tables;
use deck_export::font::{Glyph, GlyphTable};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// A one-point simple glyph, distinguishable by its coordinates
pub fn outline(x: i16, y: i16) -> Glyph {
    let mut data = Vec::new();
    data.extend_from_slice(&1i16.to_be_bytes());
    data.extend_from_slice(&[0; 8]);
    data.extend_from_slice(&0u16.to_be_bytes());
    data.extend_from_slice(&0u16.to_be_bytes());
    data.push(0x01);
    data.extend_from_slice(&x.to_be_bytes());
    data.extend_from_slice(&y.to_be_bytes());
    Glyph { outline: data, advance_width: 500, left_side_bearing: 10 }
}

pub fn empty() -> Glyph {
    Glyph::placeholder()
}

/// A minimal TrueType program named `family`/`subfamily`
pub fn truetype(family: &str, subfamily: &str, glyphs: &[Glyph]) -> Vec<u8> {
    let count = glyphs.len() as u16;

    let mut head = vec![0u8; 54];
    head[0..4].copy_from_slice(&[0, 1, 0, 0]);
    head[12..16].copy_from_slice(&0x5F0F_3CF5u32.to_be_bytes());
    head[18..20].copy_from_slice(&1000u16.to_be_bytes());
    head[50..52].copy_from_slice(&1u16.to_be_bytes());

    let mut hhea = vec![0u8; 36];
    hhea[0..4].copy_from_slice(&[0, 1, 0, 0]);
    hhea[34..36].copy_from_slice(&count.to_be_bytes());

    let mut maxp = vec![0u8; 32];
    maxp[0..4].copy_from_slice(&[0, 1, 0, 0]);
    maxp[4..6].copy_from_slice(&count.to_be_bytes());

    let (glyf, loca, hmtx) = GlyphTable::new(glyphs.to_vec()).encode();

    let mut tables = BTreeMap::new();
    tables.insert(*b"head", head);
    tables.insert(*b"hhea", hhea);
    tables.insert(*b"maxp", maxp);
    tables.insert(*b"name", name_table(&[(1, family), (2, subfamily)]));
    tables.insert(*b"glyf", glyf);
    tables.insert(*b"loca", loca);
    tables.insert(*b"hmtx", hmtx);
    write_tables(&tables)
}

fn name_table(names: &[(u16, &str)]) -> Vec<u8> {
    let mut records = Vec::new();
    let mut strings = Vec::new();
    for (id, value) in names {
        let encoded: Vec<u8> = value.encode_utf16().flat_map(|u| u.to_be_bytes()).collect();
        for field in [3u16, 1, 0x0409, *id, encoded.len() as u16, strings.len() as u16] {
            records.extend_from_slice(&field.to_be_bytes());
        }
        strings.extend_from_slice(&encoded);
    }
    let mut table = Vec::new();
    table.extend_from_slice(&0u16.to_be_bytes());
    table.extend_from_slice(&(names.len() as u16).to_be_bytes());
    table.extend_from_slice(&(6 + records.len() as u16).to_be_bytes());
    table.extend_from_slice(&records);
    table.extend_from_slice(&strings);
    table
}

/// Content of a synthesized slide
#[derive(Default)]
pub struct Slide<'a> {
    pub marker: &'a str,
    pub images: Vec<&'a [u8]>,
    /// `(declared name, program bytes)`
    pub fonts: Vec<(&'a str, Vec<u8>)>,
    /// Annotation subtypes, e.g. `Link`
    pub annotations: Vec<&'a str>,
}

impl Slide<'_> {
    pub fn to_pdf(&self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut xobjects = Dictionary::new();
        for (i, bytes) in self.images.iter().enumerate() {
            let mut dict = Dictionary::new();
            dict.set("Type", Object::Name(b"XObject".to_vec()));
            dict.set("Subtype", Object::Name(b"Image".to_vec()));
            dict.set("Width", Object::Integer(1));
            dict.set("Height", Object::Integer(1));
            let id = doc.add_object(Stream::new(dict, bytes.to_vec()));
            xobjects.set(format!("Im{i}"), Object::Reference(id));
        }

        let mut fonts = Dictionary::new();
        for (i, (name, program)) in self.fonts.iter().enumerate() {
            let font_id = type0_font(&mut doc, name, program);
            fonts.set(format!("F{i}"), Object::Reference(font_id));
        }

        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));
        resources.set("Font", Object::Dictionary(fonts));

        let annotations: Vec<Object> = self
            .annotations
            .iter()
            .map(|subtype| {
                Object::Reference(doc.add_object(Dictionary::from_iter(vec![
                    ("Type", Object::Name(b"Annot".to_vec())),
                    ("Subtype", Object::Name(subtype.as_bytes().to_vec())),
                    ("Rect", Object::Array(vec![
                        Object::Integer(0), Object::Integer(0), Object::Integer(10), Object::Integer(10),
                    ])),
                ])))
            })
            .collect();

        let contents = doc.add_object(Stream::new(Dictionary::new(), format!("% {}", self.marker).into_bytes()));
        let mut page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(contents)),
            ("Resources", Object::Dictionary(resources)),
            ("MediaBox", Object::Array(vec![
                Object::Integer(0), Object::Integer(0), Object::Integer(1280), Object::Integer(720),
            ])),
        ]);
        if !annotations.is_empty() {
            page.set("Annots", Object::Array(annotations));
        }
        let page_id = doc.add_object(page);

        doc.objects.insert(pages_id, Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(1)),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
        ])));
        let catalog_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).expect("Failed to serialize slide");
        buffer
    }

    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.to_pdf()).expect("Failed to write slide");
        path
    }
}

/// Type0 font over a CIDFontType2 descendant embedding `program`
fn type0_font(doc: &mut Document, name: &str, program: &[u8]) -> ObjectId {
    let mut file = Stream::new(Dictionary::new(), program.to_vec());
    file.dict.set("Length1", Object::Integer(program.len() as i64));
    let file_id = doc.add_object(file);

    let descriptor_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"FontDescriptor".to_vec())),
        ("FontName", Object::Name(name.as_bytes().to_vec())),
        ("FontFile2", Object::Reference(file_id)),
    ]));
    let descendant_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"CIDFontType2".to_vec())),
        ("BaseFont", Object::Name(name.as_bytes().to_vec())),
        ("FontDescriptor", Object::Reference(descriptor_id)),
    ]));
    doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type0".to_vec())),
        ("BaseFont", Object::Name(name.as_bytes().to_vec())),
        ("Encoding", Object::Name(b"Identity-H".to_vec())),
        ("DescendantFonts", Object::Array(vec![Object::Reference(descendant_id)])),
    ]))
}

/// Every reference in `doc` that points at no object
pub fn dangling_references(doc: &Document) -> Vec<ObjectId> {
    fn collect(object: &Object, out: &mut Vec<ObjectId>) {
        match object {
            Object::Reference(id) => out.push(*id),
            Object::Array(items) => items.iter().for_each(|item| collect(item, out)),
            Object::Dictionary(dict) => dict.iter().for_each(|(_, value)| collect(value, out)),
            Object::Stream(stream) => stream.dict.iter().for_each(|(_, value)| collect(value, out)),
            _ => {}
        }
    }

    let mut references = Vec::new();
    doc.objects.values().for_each(|object| collect(object, &mut references));
    doc.trailer.iter().for_each(|(_, value)| collect(value, &mut references));
    references.retain(|id| !doc.objects.contains_key(id));
    references
}

/// `FontFile2` stream ids referenced by font descriptors, per page in order
pub fn font_files_by_page(doc: &Document) -> Vec<Vec<ObjectId>> {
    doc.get_pages()
        .values()
        .map(|page_id| page_font_files(doc, *page_id).unwrap_or_default())
        .collect()
}

fn page_font_files(doc: &Document, page_id: ObjectId) -> Option<Vec<ObjectId>> {
    let page = doc.get_object(page_id).ok()?.as_dict().ok()?;
    let resources = resolve_dict(doc, page.get(b"Resources").ok()?)?;
    let fonts = resolve_dict(doc, resources.get(b"Font").ok()?)?;
    Some(
        fonts
            .iter()
            .filter_map(|(_, font)| font_file(doc, resolve_dict(doc, font)?))
            .collect(),
    )
}

fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn font_file(doc: &Document, font: &Dictionary) -> Option<ObjectId> {
    let descendants = match font.get(b"DescendantFonts").ok()? {
        Object::Array(items) => items.clone(),
        Object::Reference(id) => doc.get_object(*id).ok()?.as_array().ok()?.clone(),
        _ => return None,
    };
    let descendant = resolve_dict(doc, descendants.first()?)?;
    let descriptor = resolve_dict(doc, descendant.get(b"FontDescriptor").ok()?)?;
    descriptor.get(b"FontFile2").ok()?.as_reference().ok()
}
