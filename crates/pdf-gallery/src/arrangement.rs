//! Page arrangement
//!
//! The user-controlled display and export order of a document's pages: a
//! permutation of zero-based indices into its preview sequence. Reordering
//! produces a new arrangement and never touches the previews themselves.

use crate::types::*;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Arrangement(Vec<usize>);

impl Arrangement {
    /// Pages in their original order
    pub fn identity(page_count: usize) -> Self {
        Self((0..page_count).collect())
    }

    /// Validate a proposed order: every index in `0..len` exactly once
    pub fn from_indices(indices: Vec<usize>) -> Result<Self> {
        let len = indices.len();
        let mut seen = vec![false; len];
        for &index in &indices {
            if index >= len {
                return Err(GalleryError::InvalidInput(format!(
                    "Arrangement index {} is out of range for {} pages",
                    index, len
                )));
            }
            if std::mem::replace(&mut seen[index], true) {
                return Err(GalleryError::InvalidInput(format!(
                    "Arrangement lists page index {} more than once",
                    index
                )));
            }
        }
        Ok(Self(indices))
    }

    /// Move the page at display position `from` to display position `to`,
    /// shifting the pages in between.
    pub fn move_page(&self, from: usize, to: usize) -> Result<Self> {
        let len = self.0.len();
        if from >= len || to >= len {
            return Err(GalleryError::InvalidInput(format!(
                "Cannot move position {} to {} in an arrangement of {} pages",
                from, to, len
            )));
        }
        let mut order = self.0.clone();
        let index = order.remove(from);
        order.insert(to, index);
        Ok(Self(order))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Items reordered by this arrangement.
    ///
    /// `items` must have exactly as many entries as the arrangement.
    pub fn apply<'a, T>(&self, items: &'a [T]) -> Result<Vec<&'a T>> {
        if items.len() != self.0.len() {
            return Err(GalleryError::InvalidInput(format!(
                "Arrangement covers {} pages but {} were given",
                self.0.len(),
                items.len()
            )));
        }
        Ok(self.0.iter().map(|&index| &items[index]).collect())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Arrangement {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let indices = Vec::<usize>::deserialize(deserializer)?;
        Arrangement::from_indices(indices).map_err(serde::de::Error::custom)
    }
}

impl std::str::FromStr for Arrangement {
    type Err = GalleryError;

    /// Parse a comma separated list such as `2,0,1`
    fn from_str(s: &str) -> Result<Self> {
        let indices = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<usize>().map_err(|_| {
                    GalleryError::InvalidInput(format!("Invalid arrangement index: {}", part))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_indices(indices)
    }
}
