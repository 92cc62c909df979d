//! Foreign-layout buffers for prediction calls.
//!
//! The batch entry point takes a `float**` (per-document row pointers into
//! dense storage) and a `char***` (per-document arrays of NUL-terminated
//! strings). The builders below own every allocation they hand out: the
//! raw pointers stay valid exactly as long as the builder value, and drop
//! releases everything on success and error paths alike. Buffers are
//! call-scoped; they must not be retained or reused across calls.

use std::ffi::{CString, NulError};
use std::os::raw::c_char;

/// Row-major `float**` view over a batch of numeric feature rows.
pub struct FloatMatrix {
    // One contiguous buffer; `rows` points into it and must not outlive it.
    storage: Vec<f32>,
    rows: Vec<*const f32>,
}

impl FloatMatrix {
    /// Pack `rows` into one contiguous buffer addressed by per-row
    /// pointers.
    ///
    /// Row widths are not validated against the model here; the native
    /// library reports a mismatch through its error channel. An empty row
    /// still gets a valid (possibly dangling, never dereferenced at width
    /// zero) pointer.
    pub fn from_rows(rows: &[Vec<f32>]) -> Self {
        let mut storage = Vec::with_capacity(rows.iter().map(Vec::len).sum());
        let mut offsets = Vec::with_capacity(rows.len());
        for row in rows {
            offsets.push(storage.len());
            storage.extend_from_slice(row);
        }
        // Pointers are taken only after storage stops growing.
        let rows = offsets
            .into_iter()
            .map(|off| unsafe { storage.as_ptr().add(off) })
            .collect();
        Self { storage, rows }
    }

    /// Row-pointer array for `CalcModelPrediction`.
    pub fn as_ptr(&self) -> *const *const f32 {
        self.rows.as_ptr()
    }

    pub fn doc_count(&self) -> usize {
        self.rows.len()
    }

    pub fn value_count(&self) -> usize {
        self.storage.len()
    }
}

/// `char***` view over a batch of categorical feature rows.
pub struct CatMatrix {
    // Owned NUL-terminated copies of every value; the pointer arrays below
    // borrow from these.
    _strings: Vec<CString>,
    row_ptrs: Vec<Vec<*const c_char>>,
    docs: Vec<*const *const c_char>,
}

impl CatMatrix {
    /// Duplicate every value into foreign-compatible storage and build the
    /// per-document pointer arrays.
    ///
    /// A value with an interior NUL byte cannot cross the boundary; the
    /// error path drops whatever was already duplicated.
    pub fn from_rows(rows: &[Vec<String>]) -> Result<Self, NulError> {
        let mut strings = Vec::with_capacity(rows.iter().map(Vec::len).sum());
        let mut row_ptrs = Vec::with_capacity(rows.len());
        for row in rows {
            let mut ptrs = Vec::with_capacity(row.len());
            for value in row {
                let s = CString::new(value.as_str())?;
                ptrs.push(s.as_ptr());
                strings.push(s);
            }
            row_ptrs.push(ptrs);
        }
        let docs = row_ptrs.iter().map(|r| r.as_ptr()).collect();
        Ok(Self {
            _strings: strings,
            row_ptrs,
            docs,
        })
    }

    /// Document-pointer array for `CalcModelPrediction`.
    pub fn as_ptr(&self) -> *const *const *const c_char {
        self.docs.as_ptr()
    }

    pub fn doc_count(&self) -> usize {
        self.row_ptrs.len()
    }
}

/// `char**` view over a single document's categorical features, for
/// `CalcModelPredictionSingle`.
pub struct CatRow {
    _strings: Vec<CString>,
    ptrs: Vec<*const c_char>,
}

impl CatRow {
    pub fn from_row(row: &[String]) -> Result<Self, NulError> {
        let mut strings = Vec::with_capacity(row.len());
        let mut ptrs = Vec::with_capacity(row.len());
        for value in row {
            let s = CString::new(value.as_str())?;
            ptrs.push(s.as_ptr());
            strings.push(s);
        }
        Ok(Self {
            _strings: strings,
            ptrs,
        })
    }

    pub fn as_ptr(&self) -> *const *const c_char {
        self.ptrs.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.ptrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ptrs.is_empty()
    }
}
