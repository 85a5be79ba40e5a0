//! Page assembly: merging rendered single-page PDFs into the output
//!
//! Each incoming buffer is parsed on its own and renumbered above the
//! output's highest object id (as lopdf's merge example does), so source and
//! output ids never collide. For one page we then:
//!
//! 1. walk its resources, deduplicating images and consolidating fonts, which
//!    yields a set of reference rewrites and a list of subsumed objects,
//! 2. move the page and everything it references into the output, applying
//!    the rewrites as objects land,
//! 3. delete the subsumed objects and check nothing still points at them.

use std::collections::{BTreeMap, BTreeSet};

use lopdf::{Document, Object, ObjectId, Stream};

use super::graph::{self, INHERITABLE_PAGE_KEYS};
use super::metadata::DocumentMetadata;
use super::output::OutputDocument;
use crate::error::{Error, Result};
use crate::export::context::RunContext;
use crate::font::Consolidation;
use crate::pdf::dedup::ImageDecision;

/// Options for page assembly
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// Keep link annotations of the rendered page
    pub copy_links: bool,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self { copy_links: true }
    }
}

/// What happened while merging one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMerge {
    pub page_id: ObjectId,
    /// Objects moved into the output and kept
    pub copied_objects: usize,
    /// Image occurrences redirected to an earlier canonical image
    pub images_reused: usize,
    /// Font programs merged into an earlier canonical program
    pub fonts_merged: usize,
    /// Font programs left as-is because they could not be parsed
    pub fonts_skipped: usize,
    /// Subsumed objects deleted after the copy
    pub deleted_objects: usize,
}

/// Rewrites and deletions decided while walking one page's resources
#[derive(Debug, Default)]
struct PagePlan {
    rewrites: BTreeMap<ObjectId, ObjectId>,
    to_delete: BTreeSet<ObjectId>,
    images_reused: usize,
    fonts_merged: usize,
    fonts_skipped: usize,
}

impl PagePlan {
    /// Point references to `id` at `canonical` and schedule `id` for
    /// deletion, unless they are the same object
    fn redirect(&mut self, id: ObjectId, canonical: ObjectId) {
        if id == canonical {
            return;
        }
        self.rewrites.insert(id, canonical);
        self.to_delete.insert(id);
    }
}

/// Recursive visitor over a page's `Resources`
struct ResourceWalk<'a> {
    source: &'a Document,
    visited_forms: BTreeSet<ObjectId>,
    visited_fonts: BTreeSet<ObjectId>,
    plan: PagePlan,
}

impl<'a> ResourceWalk<'a> {
    fn new(source: &'a Document) -> Self {
        Self {
            source,
            visited_forms: BTreeSet::new(),
            visited_fonts: BTreeSet::new(),
            plan: PagePlan::default(),
        }
    }

    fn visit_resources(&mut self, resources: &Object, ctx: &mut RunContext) -> Result<()> {
        let source = self.source;
        let resources = graph::resolve_dict(source, resources)?;

        if let Ok(xobjects) = resources.get(b"XObject") {
            for (_, xobject) in graph::resolve_dict(source, xobjects)?.iter() {
                // image and form XObjects are always indirect streams
                if let Object::Reference(id) = xobject {
                    self.visit_xobject(*id, ctx)?;
                }
            }
        }

        if let Ok(fonts) = resources.get(b"Font") {
            for (_, font) in graph::resolve_dict(source, fonts)?.iter() {
                self.visit_font(font, ctx)?;
            }
        }

        Ok(())
    }

    fn visit_xobject(&mut self, id: ObjectId, ctx: &mut RunContext) -> Result<()> {
        let source = self.source;
        let stream = graph::resolve_stream(source, id)?;

        match graph::name(&stream.dict, b"Subtype") {
            Some(b"Image") => {
                // hash the encoded bytes, decoding is never needed
                if let ImageDecision::Duplicate { canonical } = ctx.images.classify(&stream.content, id) {
                    self.plan.redirect(id, canonical);
                    self.plan.images_reused += 1;
                }
            }
            Some(b"Form") => {
                if self.visited_forms.insert(id) {
                    if let Ok(resources) = stream.dict.get(b"Resources") {
                        self.visit_resources(resources, ctx)?;
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn visit_font(&mut self, font: &Object, ctx: &mut RunContext) -> Result<()> {
        let source = self.source;
        let font = graph::resolve_dict(source, font)?;
        if !matches!(graph::name(font, b"Subtype"), Some(b"Type0")) {
            return Ok(());
        }

        let Ok(descendants) = font.get(b"DescendantFonts") else {
            return Ok(());
        };
        let Object::Array(descendants) = graph::resolve(source, descendants)? else {
            return Ok(());
        };
        // Only the first descendant is considered. Composite fonts with
        // several descendants are not consolidated beyond it.
        let Some(descendant) = descendants.first() else {
            return Ok(());
        };
        let descendant = graph::resolve_dict(source, descendant)?;
        if !matches!(graph::name(descendant, b"Subtype"), Some(b"CIDFontType2")) {
            return Ok(());
        }

        let Ok(descriptor) = descendant.get(b"FontDescriptor") else {
            return Ok(());
        };
        let descriptor = graph::resolve_dict(source, descriptor)?;
        let Some(font_name) = graph::name(descriptor, b"FontName") else {
            return Ok(());
        };
        let Ok(Object::Reference(file_id)) = descriptor.get(b"FontFile2") else {
            return Ok(());
        };
        let file_id = *file_id;
        if !self.visited_fonts.insert(file_id) {
            return Ok(());
        }

        let font_name = String::from_utf8_lossy(font_name);
        let stream = graph::resolve_stream(source, file_id)?;
        let outcome = font_program_bytes(&font_name, stream)
            .and_then(|program| ctx.fonts.consolidate(&font_name, &program, file_id));

        match outcome {
            Ok(Consolidation::Registered { .. }) => {}
            Ok(Consolidation::Merged { canonical, .. }) => {
                self.plan.redirect(file_id, canonical);
                self.plan.fonts_merged += 1;
            }
            Err(e) if e.is_recoverable() => {
                log::warn!("Leaving font {} unconsolidated: {}", font_name, e);
                self.plan.fonts_skipped += 1;
            }
            Err(e) => return Err(e),
        }

        Ok(())
    }
}

/// Decoded TrueType program bytes of a `FontFile2` stream
fn font_program_bytes(font_name: &str, stream: &Stream) -> Result<Vec<u8>> {
    let mut program = if stream.dict.has(b"Filter") {
        stream.decompressed_content().map_err(|e| Error::MalformedFontProgram {
            font: font_name.to_string(),
            reason: format!("cannot decode font stream: {e}"),
        })?
    } else {
        stream.content.clone()
    };

    if let Ok(Object::Integer(length)) = stream.dict.get(b"Length1") {
        if *length > 0 && (*length as usize) < program.len() {
            program.truncate(*length as usize);
        }
    }
    Ok(program)
}

/// Copies rendered pages into one output document
pub struct DocumentAssembler {
    output: OutputDocument,
    options: AssembleOptions,
}

impl DocumentAssembler {
    pub fn new(metadata: DocumentMetadata, options: AssembleOptions) -> Self {
        Self {
            output: OutputDocument::new(metadata),
            options,
        }
    }

    pub fn output(&self) -> &OutputDocument {
        &self.output
    }

    pub fn into_output(self) -> OutputDocument {
        self.output
    }

    /// Merge one rendered single-page PDF into the output
    ///
    /// Only the first page of the buffer is used.
    pub fn append_page(&mut self, ctx: &mut RunContext, buffer: &[u8]) -> Result<PageMerge> {
        let mut source = Document::load_mem(buffer)?;
        source.renumber_objects_with(self.output.next_free_id());

        let pages = source.get_pages();
        let page_id = *pages.values().next().ok_or(Error::EmptyPage)?;
        if pages.len() > 1 {
            log::warn!("Rendered PDF has {} pages, keeping the first", pages.len());
        }

        materialize_inherited_attributes(&mut source, page_id)?;

        let plan = {
            let mut walk = ResourceWalk::new(&source);
            if let Ok(resources) = graph::object_dict(&source, page_id)?.get(b"Resources") {
                walk.visit_resources(resources, ctx)?;
            }
            walk.plan
        };

        self.prepare_annotations(&mut source, page_id)?;

        let copied = graph::reachable_from(&source, page_id, &[b"Parent"])?;
        for id in &copied {
            let Some(mut object) = source.objects.remove(id) else {
                continue;
            };
            graph::rewrite_references(&mut object, &plan.rewrites);
            if *id == page_id {
                if let Object::Dictionary(page) = &mut object {
                    page.remove(b"Parent");
                }
            }
            self.output.insert(*id, object);
        }

        // subsumed objects may only go once the whole page has landed
        let mut deleted_objects = 0;
        for id in &plan.to_delete {
            if self.output.remove(*id).is_some() {
                deleted_objects += 1;
            }
        }

        let kept: BTreeSet<ObjectId> = copied.difference(&plan.to_delete).copied().collect();
        self.output.verify_references(&kept)?;
        self.output.push_page(page_id);

        let merge = PageMerge {
            page_id,
            copied_objects: kept.len(),
            images_reused: plan.images_reused,
            fonts_merged: plan.fonts_merged,
            fonts_skipped: plan.fonts_skipped,
            deleted_objects,
        };
        log::debug!("Merged page {:?}: {:?}", page_id, merge);
        Ok(merge)
    }

    /// Keep only link annotations on the page (or none)
    fn prepare_annotations(&self, source: &mut Document, page_id: ObjectId) -> Result<()> {
        let kept = {
            let page = graph::object_dict(source, page_id)?;
            let Ok(annotations) = page.get(b"Annots") else {
                return Ok(());
            };
            let mut kept = Vec::new();
            if self.options.copy_links {
                if let Object::Array(annotations) = graph::resolve(source, annotations)? {
                    for annotation in annotations {
                        let dict = graph::resolve_dict(source, annotation)?;
                        if matches!(graph::name(dict, b"Subtype"), Some(b"Link")) {
                            kept.push(annotation.clone());
                        }
                    }
                }
            }
            kept
        };

        if let Ok(Object::Dictionary(page)) = source.get_object_mut(page_id) {
            if kept.is_empty() {
                page.remove(b"Annots");
            } else {
                page.set("Annots", Object::Array(kept));
            }
        }
        Ok(())
    }
}

/// Copy inheritable attributes from the source page tree onto the page,
/// since the source page tree itself is not copied
fn materialize_inherited_attributes(source: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut inherited = Vec::new();
    {
        let page = graph::object_dict(source, page_id)?;
        for key in INHERITABLE_PAGE_KEYS {
            if page.get(key).is_err() {
                if let Some(value) = graph::inherited_attribute(source, page, key)? {
                    inherited.push((key, value));
                }
            }
        }
    }

    if let Ok(Object::Dictionary(page)) = source.get_object_mut(page_id) {
        for (key, value) in inherited {
            page.set(key.to_vec(), value);
        }
    }
    Ok(())
}
