//! The line list: candidate sky-line wavelengths, always sorted ascending.
//!
//! "No list loaded" is `Option::<LineList>::None`; an empty `LineList` is a loaded
//! list with zero entries. The session treats both as nothing to fit.

use crate::error::CalibError;

/// Token the user must type to confirm clearing the whole list.
pub const CLEAR_CONFIRM_TOKEN: &str = "CONFIRM";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineList {
    values: Vec<f64>,
}

/// Issued by [`LineList::request_clear`]; consumed by [`LineList::confirm_clear`].
#[derive(Debug)]
#[must_use]
pub struct ClearRequest {
    _private: (),
}

impl LineList {
    /// Build a list from arbitrary values (sorted on construction).
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut list = Self {
            values: values.into_iter().collect(),
        };
        list.sort();
        list
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Merge `new_values` into `list`, creating the list if absent.
    pub fn insert(list: Option<LineList>, new_values: &[f64]) -> LineList {
        let mut list = list.unwrap_or_default();
        list.values.extend_from_slice(new_values);
        list.sort();
        list
    }

    /// Remove the entry at a 1-based position.
    ///
    /// On an out-of-range index the list is left untouched.
    pub fn remove_at(&mut self, one_based_index: usize) -> Result<f64, CalibError> {
        if one_based_index == 0 || one_based_index > self.values.len() {
            return Err(CalibError::Index {
                index: one_based_index,
                len: self.values.len(),
            });
        }
        Ok(self.values.remove(one_based_index - 1))
    }

    /// First step of clearing: nothing is discarded yet.
    pub fn request_clear(&self) -> ClearRequest {
        ClearRequest { _private: () }
    }

    /// Second step of clearing. Returns whether the list was discarded.
    pub fn confirm_clear(list: &mut Option<LineList>, _request: ClearRequest, token: &str) -> bool {
        if token == CLEAR_CONFIRM_TOKEN {
            *list = None;
            true
        } else {
            false
        }
    }

    fn sort(&mut self) {
        self.values.sort_by(f64::total_cmp);
    }
}

/// Whether `list` holds at least one line.
pub fn has_lines(list: Option<&LineList>) -> bool {
    list.is_some_and(|l| !l.is_empty())
}
