//! Inference over CatBoost models through the runtime-loaded evaluation
//! library.
//!
//! The native `libcatboostmodel` is discovered at runtime (explicit path,
//! `CATBOOST_LIBRARY_PATH`, or the platform default) and its C API bound
//! once per process; see the `catboost-ffi` crate. This crate owns the
//! evaluator handles and the marshaling around every call.
//!
//! ```no_run
//! use catboost::{Model, PredictionType};
//!
//! # fn main() -> Result<(), catboost::CatBoostError> {
//! let mut model = Model::load_file("model.cbm")?;
//! model.set_prediction_type(PredictionType::Probability)?;
//!
//! let floats = vec![vec![2.0, 4.0, 6.0, 8.0, 5.0], vec![1.0, 4.0, 50.0, 60.0, 5.0]];
//! let cats = vec![
//!     vec!["a".to_string(), "b".to_string()],
//!     vec!["a".to_string(), "d".to_string()],
//! ];
//! let flat = model.predict(&floats, &cats)?;
//! for row in model.transform(&flat) {
//!     println!("{row:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Concurrency contract: the native error channel is one global slot, so
//! fallible calls are serialized process-wide behind an advisory lock. A
//! `Model` is `Send` but not `Sync`; changing its prediction type requires
//! `&mut` and therefore cannot race its own predictions.

mod error;
mod model;

pub use catboost_ffi::{
    last_error, resolve_library_path, set_library_path, FfiError, LIBRARY_PATH_ENV,
};
pub use error::CatBoostError;
pub use model::{
    EvaluatorType, Model, ModelInfo, PredictionType, META_MODEL_GUID, META_OUTPUT_OPTIONS,
    META_PARAMS, META_TRAINING, META_TRAIN_FINISH_TIME, META_VERSION_INFO, VERSION,
};
