//! Page box resolution
//!
//! Page attributes such as MediaBox, Resources and Rotate may be declared on
//! the page itself or on any ancestor node of the page tree.

use crate::constants::DEFAULT_PAGE_DIMENSIONS;
use crate::types::PageGeometry;
use lopdf::{Document, Object, ObjectId};

/// Deepest page tree we are willing to walk before assuming a cycle
const MAX_TREE_DEPTH: usize = 64;

/// Attributes a page inherits from its ancestors in the page tree
pub(crate) const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Follow a reference to the object it points at. Non-references are
/// returned unchanged.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Look up a page attribute, walking up the page tree when the page
/// doesn't declare it itself.
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(resolve(doc, value));
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

/// Extract numeric value from a PDF object
pub(crate) fn extract_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// The page's MediaBox as `[x0, y0, x1, y1]`, if one is declared anywhere
/// in its ancestry and well formed.
pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> Option<[f32; 4]> {
    let array = inherited_attribute(doc, page_id, b"MediaBox")?.as_array().ok()?;
    if array.len() != 4 {
        return None;
    }
    let mut rect = [0.0; 4];
    for (slot, obj) in rect.iter_mut().zip(array) {
        *slot = extract_number(resolve(doc, obj))?;
    }
    Some(rect)
}

/// The page's rotation in degrees, normalized to 0, 90, 180 or 270
pub(crate) fn rotation(doc: &Document, page_id: ObjectId) -> i64 {
    let degrees = inherited_attribute(doc, page_id, b"Rotate")
        .and_then(|obj| obj.as_i64().ok())
        .unwrap_or(0);
    let normalized = degrees.rem_euclid(360);
    // Only quarter turns are meaningful
    normalized - normalized % 90
}

/// Displayed page geometry in points.
///
/// Falls back to US Letter when no usable MediaBox is declared, and swaps
/// width and height for pages rotated a quarter turn.
pub fn page_geometry(doc: &Document, page_id: ObjectId) -> PageGeometry {
    let (width, height) = match media_box(doc, page_id) {
        Some([x0, y0, x1, y1]) if (x1 - x0).abs() > 0.0 && (y1 - y0).abs() > 0.0 => {
            ((x1 - x0).abs(), (y1 - y0).abs())
        }
        Some(_) => {
            log::warn!(
                "Page object {:?} has a degenerate MediaBox, assuming US Letter",
                page_id
            );
            DEFAULT_PAGE_DIMENSIONS
        }
        None => DEFAULT_PAGE_DIMENSIONS,
    };

    match rotation(doc, page_id) {
        90 | 270 => PageGeometry::new(height, width),
        _ => PageGeometry::new(width, height),
    }
}
