//! The process-wide symbol table.
//!
//! Every entry point the binding may invoke is resolved up front and bound
//! to a typed function pointer; a missing symbol fails the whole load.
//! The table is written once and read-only afterwards, and the `dlopen`
//! handle is owned by it for the lifetime of the process.

use std::os::raw::{c_char, c_int, c_void};
use std::sync::OnceLock;

use libloading::{Library, Symbol};

use crate::error::FfiError;
use crate::locate::resolve_library_path;

/// Opaque native evaluator handle; one per loaded model.
pub type ModelCalcerHandle = *mut c_void;

/// The fixed C-API surface this binding depends on.
///
/// Renaming or dropping any of these symbols in the native library is a
/// breaking change for the binding.
pub struct FnTable {
    // Keeps the dlopen handle alive; every pointer below was resolved from
    // it and dies with it.
    _lib: Library,

    pub get_error_string: unsafe extern "C" fn() -> *const c_char,
    pub model_calcer_create: unsafe extern "C" fn() -> ModelCalcerHandle,
    pub model_calcer_delete: unsafe extern "C" fn(ModelCalcerHandle),
    pub load_full_model_from_buffer:
        unsafe extern "C" fn(ModelCalcerHandle, *const c_void, usize) -> bool,
    pub calc_model_prediction_single: unsafe extern "C" fn(
        ModelCalcerHandle,
        *const f32,
        usize,
        *const *const c_char,
        usize,
        *mut f64,
        usize,
    ) -> bool,
    pub calc_model_prediction: unsafe extern "C" fn(
        ModelCalcerHandle,
        usize,
        *const *const f32,
        usize,
        *const *const *const c_char,
        usize,
        *mut f64,
        usize,
    ) -> bool,
    pub get_float_features_count: unsafe extern "C" fn(ModelCalcerHandle) -> usize,
    pub get_cat_features_count: unsafe extern "C" fn(ModelCalcerHandle) -> usize,
    pub get_dimensions_count: unsafe extern "C" fn(ModelCalcerHandle) -> usize,
    pub set_prediction_type_string:
        unsafe extern "C" fn(ModelCalcerHandle, *const c_char) -> bool,
    pub get_model_used_features_names:
        unsafe extern "C" fn(ModelCalcerHandle, *mut *mut *mut c_char, *mut usize) -> bool,
    pub get_model_info_value:
        unsafe extern "C" fn(ModelCalcerHandle, *const c_char, usize) -> *const c_char,
    pub get_float_feature_indices:
        unsafe extern "C" fn(ModelCalcerHandle, *mut *mut usize, *mut usize) -> bool,
    pub get_cat_feature_indices:
        unsafe extern "C" fn(ModelCalcerHandle, *mut *mut usize, *mut usize) -> bool,
    pub get_supported_evaluator_types:
        unsafe extern "C" fn(ModelCalcerHandle, *mut *mut usize, *mut usize) -> bool,
    pub enable_gpu_evaluation: unsafe extern "C" fn(ModelCalcerHandle, c_int) -> bool,
}

static TABLE: OnceLock<FnTable> = OnceLock::new();

/// Bind the symbol table, loading the shared library on first use.
///
/// The first successful load wins and is cached for the process lifetime.
/// A failed load is returned to the caller and may be retried, e.g. after
/// [`crate::set_library_path`]. Callers must let this complete before
/// issuing any model-level call.
pub fn table() -> Result<&'static FnTable, FfiError> {
    if let Some(t) = TABLE.get() {
        return Ok(t);
    }
    let loaded = FnTable::load()?;
    // Two racing loaders may both succeed; the loser's handle is dropped
    // here and everyone sees the winner's table.
    Ok(TABLE.get_or_init(|| loaded))
}

impl FnTable {
    fn load() -> Result<Self, FfiError> {
        let path = resolve_library_path()?;
        let lib = unsafe { Library::new(&path) }.map_err(|e| FfiError::LoadLibrary {
            path: path.clone(),
            detail: e.to_string(),
        })?;

        unsafe {
            Ok(Self {
                get_error_string: resolve(&lib, "GetErrorString")?,
                model_calcer_create: resolve(&lib, "ModelCalcerCreate")?,
                model_calcer_delete: resolve(&lib, "ModelCalcerDelete")?,
                load_full_model_from_buffer: resolve(&lib, "LoadFullModelFromBuffer")?,
                calc_model_prediction_single: resolve(&lib, "CalcModelPredictionSingle")?,
                calc_model_prediction: resolve(&lib, "CalcModelPrediction")?,
                get_float_features_count: resolve(&lib, "GetFloatFeaturesCount")?,
                get_cat_features_count: resolve(&lib, "GetCatFeaturesCount")?,
                get_dimensions_count: resolve(&lib, "GetDimensionsCount")?,
                set_prediction_type_string: resolve(&lib, "SetPredictionTypeString")?,
                get_model_used_features_names: resolve(&lib, "GetModelUsedFeaturesNames")?,
                get_model_info_value: resolve(&lib, "GetModelInfoValue")?,
                get_float_feature_indices: resolve(&lib, "GetFloatFeatureIndices")?,
                get_cat_feature_indices: resolve(&lib, "GetCatFeatureIndices")?,
                get_supported_evaluator_types: resolve(&lib, "GetSupportedEvaluatorTypes")?,
                enable_gpu_evaluation: resolve(&lib, "EnableGPUEvaluation")?,
                _lib: lib,
            })
        }
    }
}

/// Resolve one entry point into a bare function pointer.
///
/// The pointer is copied out of the `Symbol` guard; it stays valid because
/// the `Library` lives in the same `FnTable`.
unsafe fn resolve<T: Copy>(lib: &Library, symbol: &'static str) -> Result<T, FfiError> {
    let sym: Symbol<T> = lib.get(symbol.as_bytes()).map_err(|e| FfiError::MissingSymbol {
        symbol,
        detail: e.to_string(),
    })?;
    Ok(*sym)
}
