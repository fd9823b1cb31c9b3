//! Page extraction
//!
//! Builds a new document out of selected pages of a source document. Each
//! requested page becomes its own page object in the output (so a page may
//! be requested more than once), while objects shared between pages, such
//! as fonts and images, are copied only once.

use crate::document::{Document, INHERITABLE_KEYS, inherited_attribute};
use crate::types::*;
use lopdf::{Dictionary, Object, ObjectId, Stream};
use std::collections::HashMap;

/// Page dictionary entries that point back into the source document's
/// structure and must not be followed when copying.
const EXCLUDED_PAGE_KEYS: [&[u8]; 5] = [b"Parent", b"Annots", b"B", b"StructParents", b"PieceInfo"];

/// Extract pages into a new document.
///
/// `page_numbers` are 1-indexed and may repeat; the output contains exactly
/// those pages in the given order with their geometry unchanged.
pub fn extract_pages(source: &Document, page_numbers: &[usize]) -> Result<Document> {
    if page_numbers.is_empty() {
        return Err(GalleryError::InvalidInput(
            "No pages requested for extraction".to_string(),
        ));
    }

    let page_ids = page_numbers
        .iter()
        .map(|&n| source.page_id(n))
        .collect::<Result<Vec<_>>>()?;

    let mut output = lopdf::Document::with_version("1.7");
    let pages_id = output.new_object_id();
    let mut cache: HashMap<ObjectId, ObjectId> = HashMap::new();

    let mut kids = Vec::with_capacity(page_ids.len());
    for page_id in page_ids {
        let page = copy_page(&mut output, source.pdf(), page_id, pages_id, &mut cache)?;
        kids.push(Object::Reference(output.add_object(page)));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(kids.len() as i64)),
        ("Kids", Object::Array(kids)),
    ]);
    output.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = output.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    output.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    output.save_to(&mut bytes)?;
    Document::from_bytes(bytes)
}

/// Extract a single page into its own one-page document
pub fn extract_page(source: &Document, page_number: usize) -> Result<Document> {
    extract_pages(source, &[page_number])
}

/// Build the output page dictionary for one source page
fn copy_page(
    output: &mut lopdf::Document,
    source: &lopdf::Document,
    page_id: ObjectId,
    parent_id: ObjectId,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Dictionary> {
    let page_dict = source.get_dictionary(page_id)?;

    let mut new_dict = Dictionary::new();
    for (key, value) in page_dict.iter() {
        if EXCLUDED_PAGE_KEYS.contains(&key.as_slice()) {
            continue;
        }
        new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
    }

    // Pin inherited attributes onto the page, since it gets a new parent
    for key in INHERITABLE_KEYS {
        if new_dict.has(key) {
            continue;
        }
        if let Some(value) = inherited_attribute(source, page_id, key) {
            new_dict.set(key.to_vec(), copy_object_deep(output, source, value, cache)?);
        }
    }

    new_dict.set("Type", Object::Name(b"Page".to_vec()));
    new_dict.set("Parent", Object::Reference(parent_id));
    Ok(new_dict)
}

/// Deep copy an object from source to output document, following references.
///
/// Uses a cache to avoid copying the same object multiple times.
pub(crate) fn copy_object_deep(
    output: &mut lopdf::Document,
    source: &lopdf::Document,
    obj: &Object,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object> {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }

            // Reserve the id before descending so reference cycles terminate
            let new_id = output.new_object_id();
            cache.insert(*id, new_id);

            let copied = match source.get_object(*id) {
                Ok(referenced) => copy_object_deep(output, source, referenced, cache)?,
                // Dangling references resolve to null
                Err(_) => Object::Null,
            };
            output.objects.insert(new_id, copied);

            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => Ok(Object::Dictionary(copy_dictionary(
            output, source, dict, cache,
        )?)),
        Object::Array(arr) => {
            let new_arr: Result<Vec<_>> = arr
                .iter()
                .map(|item| copy_object_deep(output, source, item, cache))
                .collect();
            Ok(Object::Array(new_arr?))
        }
        Object::Stream(stream) => Ok(Object::Stream(Stream {
            dict: copy_dictionary(output, source, &stream.dict, cache)?,
            content: stream.content.clone(),
            allows_compression: stream.allows_compression,
            start_position: None,
        })),
        _ => Ok(obj.clone()),
    }
}

fn copy_dictionary(
    output: &mut lopdf::Document,
    source: &lopdf::Document,
    dict: &Dictionary,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Dictionary> {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
    }
    Ok(new_dict)
}
