//! Runtime bindings to the CatBoost model-evaluation shared library.
//!
//! Goals:
//! - Locate and open `libcatboostmodel` once per process
//! - Resolve the fixed C-API symbol set into a typed, write-once table
//! - Expose the library's out-of-band error channel
//! - Build the 2D float/string buffers the batch calls expect
//!
//! Nothing here keeps per-model state; the safe model API lives in the
//! `catboost` crate.

mod error;
mod locate;
mod marshal;
mod table;

pub use error::{call_exclusive, last_error, parse_error_message, FfiError};
pub use locate::{resolve_library_path, set_library_path, LIBRARY_PATH_ENV};
pub use marshal::{CatMatrix, CatRow, FloatMatrix};
pub use table::{table, FnTable, ModelCalcerHandle};
