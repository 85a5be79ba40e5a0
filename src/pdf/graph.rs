//! Typed helpers over lopdf's object arena
//!
//! Objects live in `Document::objects` keyed by id; references are resolved
//! lazily through [`resolve`]. Failing to resolve a reference is an
//! [`Error::ObjectGraphInconsistency`], never a silent skip.

use std::collections::{BTreeMap, BTreeSet};

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};

/// Longest chain of references-to-references we follow
const MAX_INDIRECTION: usize = 32;

/// Page attributes a page may inherit from its ancestors in the page tree
pub const INHERITABLE_PAGE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Resolve an object, following references until a direct object is found
pub fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object> {
    let mut current = object;
    for _ in 0..MAX_INDIRECTION {
        match current {
            Object::Reference(id) => {
                current = doc.objects.get(id).ok_or_else(|| {
                    Error::ObjectGraphInconsistency(format!("object {} {} R does not exist", id.0, id.1))
                })?;
            }
            _ => return Ok(current),
        }
    }
    Err(Error::ObjectGraphInconsistency("reference chain too long".to_string()))
}

pub fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Dictionary> {
    match resolve(doc, object)? {
        Object::Dictionary(dict) => Ok(dict),
        Object::Stream(stream) => Ok(&stream.dict),
        other => Err(Error::ObjectGraphInconsistency(format!(
            "expected a dictionary, found {}",
            other.enum_variant()
        ))),
    }
}

/// The dictionary stored in object `id` (or a stream's dictionary)
pub fn object_dict(doc: &Document, id: ObjectId) -> Result<&Dictionary> {
    match doc.objects.get(&id) {
        Some(Object::Dictionary(dict)) => Ok(dict),
        Some(Object::Stream(stream)) => Ok(&stream.dict),
        Some(other) => Err(Error::ObjectGraphInconsistency(format!(
            "object {} {} R is a {}, expected a dictionary",
            id.0,
            id.1,
            other.enum_variant()
        ))),
        None => Err(Error::ObjectGraphInconsistency(format!("object {} {} R does not exist", id.0, id.1))),
    }
}

pub fn resolve_stream(doc: &Document, id: ObjectId) -> Result<&Stream> {
    match doc.objects.get(&id) {
        Some(Object::Stream(stream)) => Ok(stream),
        Some(other) => Err(Error::ObjectGraphInconsistency(format!(
            "object {} {} R is a {}, expected a stream",
            id.0,
            id.1,
            other.enum_variant()
        ))),
        None => Err(Error::ObjectGraphInconsistency(format!("object {} {} R does not exist", id.0, id.1))),
    }
}

/// The name stored under `key`, if it is a name
pub fn name<'a>(dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
    match dict.get(key) {
        Ok(Object::Name(name)) => Some(name.as_slice()),
        _ => None,
    }
}

/// Push every reference contained in `object` (not following them)
pub fn collect_references(object: &Object, out: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => out.push(*id),
        Object::Array(items) => items.iter().for_each(|item| collect_references(item, out)),
        Object::Dictionary(dict) => dict.iter().for_each(|(_, value)| collect_references(value, out)),
        Object::Stream(stream) => stream.dict.iter().for_each(|(_, value)| collect_references(value, out)),
        _ => {}
    }
}

/// Redirect every reference found in `id_map` to its mapped id, in place
pub fn rewrite_references(object: &mut Object, id_map: &BTreeMap<ObjectId, ObjectId>) {
    match object {
        Object::Reference(id) => {
            if let Some(new_id) = id_map.get(id) {
                *id = *new_id;
            }
        }
        Object::Array(items) => items.iter_mut().for_each(|item| rewrite_references(item, id_map)),
        Object::Dictionary(dict) => dict.iter_mut().for_each(|(_, value)| rewrite_references(value, id_map)),
        Object::Stream(stream) => stream
            .dict
            .iter_mut()
            .for_each(|(_, value)| rewrite_references(value, id_map)),
        _ => {}
    }
}

/// Ids of every object reachable from `root` (included)
///
/// Dictionary entries named in `skip_keys` are not followed from `root`
/// itself, e.g. a page's `Parent`.
pub fn reachable_from(doc: &Document, root: ObjectId, skip_keys: &[&[u8]]) -> Result<BTreeSet<ObjectId>> {
    let mut seen = BTreeSet::new();
    let mut pending = Vec::new();

    let root_object = doc.objects.get(&root).ok_or_else(|| {
        Error::ObjectGraphInconsistency(format!("object {} {} R does not exist", root.0, root.1))
    })?;
    seen.insert(root);
    match root_object {
        Object::Dictionary(dict) => {
            for (key, value) in dict.iter() {
                if !skip_keys.contains(&key.as_slice()) {
                    collect_references(value, &mut pending);
                }
            }
        }
        other => collect_references(other, &mut pending),
    }

    while let Some(id) = pending.pop() {
        if !seen.insert(id) {
            continue;
        }
        let object = doc.objects.get(&id).ok_or_else(|| {
            Error::ObjectGraphInconsistency(format!("object {} {} R does not exist", id.0, id.1))
        })?;
        collect_references(object, &mut pending);
    }

    Ok(seen)
}

/// Look up an inheritable attribute on the ancestors of a page
pub fn inherited_attribute(doc: &Document, page: &Dictionary, key: &[u8]) -> Result<Option<Object>> {
    let mut parent = match page.get(b"Parent") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };
    let mut depth = 0;

    while let Some(parent_id) = parent {
        depth += 1;
        if depth > MAX_INDIRECTION {
            return Err(Error::ObjectGraphInconsistency("page tree too deep".to_string()));
        }
        let node = object_dict(doc, parent_id)?;
        if let Ok(value) = node.get(key) {
            return Ok(Some(value.clone()));
        }
        parent = match node.get(b"Parent") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        };
    }

    Ok(None)
}
