//! The model handle wrapper and its operations.
//!
//! Every fallible operation follows the same shape: marshal the request,
//! invoke the bound entry point, read the error channel on a `false`
//! return, release the marshaled buffers. The call plus the channel read
//! run under the process-wide lock from `catboost_ffi::call_exclusive`,
//! since the channel is one global slot shared by every model.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};
use std::path::Path;
use std::time::Instant;

use catboost_ffi::{
    call_exclusive, last_error, table, CatMatrix, CatRow, FloatMatrix, FnTable, ModelCalcerHandle,
};
use serde::Serialize;

use crate::error::CatBoostError;

/// libcatboostmodel release line this binding tracks.
pub const VERSION: &str = "v1.2.7";

/// Well-known model metadata keys. All optional; absent keys resolve to
/// an empty string.
pub const META_VERSION_INFO: &str = "catboost_version_info";
pub const META_MODEL_GUID: &str = "model_guid";
pub const META_PARAMS: &str = "params";
pub const META_TRAIN_FINISH_TIME: &str = "train_finish_time";
pub const META_TRAINING: &str = "training";
pub const META_OUTPUT_OPTIONS: &str = "output_options";

/// Interpretation of the values a model emits per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionType {
    /// Raw formula value (the default after load).
    RawFormulaVal,
    Probability,
    Class,
    /// Mean prediction plus estimated uncertainty.
    RMSEWithUncertainty,
    /// Exponentiated raw value (survival/ranking objectives).
    Exponent,
}

impl PredictionType {
    /// Token passed verbatim to the native prediction-type setter.
    pub fn as_str(self) -> &'static str {
        match self {
            PredictionType::RawFormulaVal => "RawFormulaVal",
            PredictionType::Probability => "Probability",
            PredictionType::Class => "Class",
            PredictionType::RMSEWithUncertainty => "RMSEWithUncertainty",
            PredictionType::Exponent => "Exponent",
        }
    }

    fn as_c_str(self) -> &'static CStr {
        match self {
            PredictionType::RawFormulaVal => c"RawFormulaVal",
            PredictionType::Probability => c"Probability",
            PredictionType::Class => c"Class",
            PredictionType::RMSEWithUncertainty => c"RMSEWithUncertainty",
            PredictionType::Exponent => c"Exponent",
        }
    }
}

/// Device kind a model formula can be evaluated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluatorType {
    Cpu,
    Gpu,
}

impl EvaluatorType {
    fn from_raw(raw: usize) -> Option<Self> {
        match raw {
            0 => Some(EvaluatorType::Cpu),
            1 => Some(EvaluatorType::Gpu),
            _ => None,
        }
    }
}

/// Serializable metadata snapshot of a loaded model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub guid: String,
    pub version_info: String,
    pub train_finish_time: String,
    pub float_features_count: usize,
    pub cat_features_count: usize,
    pub dimensions_count: usize,
}

/// One loaded evaluator handle plus the currently selected prediction
/// type.
///
/// Exclusive ownership: the handle is released when the value drops.
pub struct Model {
    handle: ModelCalcerHandle,
    prediction_type: PredictionType,
}

// The native calcer can move across threads. Concurrent use from several
// threads is not safe (one global error channel, and the prediction type
// changes the meaning of result widths), hence Send without Sync.
unsafe impl Send for Model {}

impl Drop for Model {
    fn drop(&mut self) {
        if self.handle.is_null() {
            return;
        }
        // A model only exists after the table bound, so this is a cache hit.
        if let Ok(t) = table() {
            unsafe { (t.model_calcer_delete)(self.handle) };
        }
        self.handle = std::ptr::null_mut();
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("handle", &self.handle)
            .field("prediction_type", &self.prediction_type)
            .finish()
    }
}

impl Model {
    /// Load a serialized model from an in-memory buffer.
    ///
    /// Locates and binds the shared library on first use.
    pub fn load_buffer(buffer: &[u8]) -> Result<Self, CatBoostError> {
        if buffer.is_empty() {
            return Err(CatBoostError::LoadModel(Some("empty model buffer".into())));
        }
        let t = table().map_err(CatBoostError::Init)?;

        let model = call_exclusive(|| {
            let handle = unsafe { (t.model_calcer_create)() };
            if handle.is_null() {
                return Err(CatBoostError::LoadModel(Some(
                    "ModelCalcerCreate returned a null handle".into(),
                )));
            }
            let ok = unsafe {
                (t.load_full_model_from_buffer)(
                    handle,
                    buffer.as_ptr() as *const c_void,
                    buffer.len(),
                )
            };
            if !ok {
                let detail = last_error();
                unsafe { (t.model_calcer_delete)(handle) };
                return Err(CatBoostError::LoadModel(detail));
            }
            Ok(Self {
                handle,
                prediction_type: PredictionType::RawFormulaVal,
            })
        })?;

        metrics::counter!("catboost_model_load_total").increment(1);
        Ok(model)
    }

    /// Read a model file fully into memory and load it.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, CatBoostError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| CatBoostError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load_buffer(&bytes)
    }

    // Infallible per the C API; no channel check involved.
    fn table(&self) -> &'static FnTable {
        table().expect("symbol table bound before any model was constructed")
    }

    /// Number of float features the model expects per document.
    pub fn float_features_count(&self) -> usize {
        unsafe { (self.table().get_float_features_count)(self.handle) }
    }

    /// Number of categorical features the model expects per document.
    pub fn cat_features_count(&self) -> usize {
        unsafe { (self.table().get_cat_features_count)(self.handle) }
    }

    /// Total feature slots across float and categorical inputs.
    pub fn features_count(&self) -> usize {
        self.float_features_count() + self.cat_features_count()
    }

    /// Output dimensions declared by the model, independent of the
    /// prediction type.
    pub fn dimensions_count(&self) -> usize {
        unsafe { (self.table().get_dimensions_count)(self.handle) }
    }

    pub fn prediction_type(&self) -> PredictionType {
        self.prediction_type
    }

    /// Select how subsequent predictions are interpreted.
    ///
    /// The stored type only changes after the native call succeeds; a
    /// rejected token leaves the previous interpretation in effect.
    pub fn set_prediction_type(
        &mut self,
        prediction_type: PredictionType,
    ) -> Result<(), CatBoostError> {
        let t = self.table();
        call_exclusive(|| {
            let ok = unsafe {
                (t.set_prediction_type_string)(self.handle, prediction_type.as_c_str().as_ptr())
            };
            if ok {
                Ok(())
            } else {
                Err(CatBoostError::SetPredictionType(last_error()))
            }
        })?;
        self.prediction_type = prediction_type;
        Ok(())
    }

    /// Values produced per document under the current prediction type.
    ///
    /// `Class` collapses output to a single label; every other type yields
    /// one value per model dimension. Recomputed on each call so a type
    /// change is observed by the very next prediction.
    pub fn row_result_size(&self) -> usize {
        row_result_size(self.prediction_type, self.dimensions_count())
    }

    /// Batch prediction over dense float rows and categorical string rows.
    ///
    /// The document count is the larger of the two row counts, so models
    /// with only float or only categorical features take an empty slice on
    /// the other side. The flat result carries `row_result_size()` values
    /// per document in document order; [`Model::transform`] regroups it.
    pub fn predict(
        &self,
        floats: &[Vec<f32>],
        cats: &[Vec<String>],
    ) -> Result<Vec<f64>, CatBoostError> {
        let t = self.table();
        let doc_count = floats.len().max(cats.len());
        if doc_count == 0 {
            return Ok(Vec::new());
        }
        let float_count = self.float_features_count();
        let cat_count = self.cat_features_count();
        let mut preds = vec![0f64; doc_count * self.row_result_size()];

        let float_matrix = FloatMatrix::from_rows(floats);
        let cat_matrix = CatMatrix::from_rows(cats).map_err(CatBoostError::InvalidCatValue)?;

        let started = Instant::now();
        call_exclusive(|| {
            let ok = unsafe {
                (t.calc_model_prediction)(
                    self.handle,
                    doc_count,
                    float_matrix.as_ptr(),
                    float_count,
                    cat_matrix.as_ptr(),
                    cat_count,
                    preds.as_mut_ptr(),
                    preds.len(),
                )
            };
            if ok {
                Ok(())
            } else {
                Err(CatBoostError::Prediction(last_error()))
            }
        })?;
        metrics::histogram!("catboost_predict_us").record(started.elapsed().as_micros() as f64);

        Ok(preds)
    }

    /// Single-document prediction.
    ///
    /// Agrees value-for-value with [`Model::predict`] over a one-row
    /// batch. A model with zero float features takes an empty slice; the
    /// call still receives a valid (zero-length) buffer pointer.
    pub fn predict_single(
        &self,
        floats: &[f32],
        cats: &[String],
    ) -> Result<Vec<f64>, CatBoostError> {
        let t = self.table();
        let mut preds = vec![0f64; self.row_result_size()];
        let cat_row = CatRow::from_row(cats).map_err(CatBoostError::InvalidCatValue)?;

        let started = Instant::now();
        call_exclusive(|| {
            let ok = unsafe {
                (t.calc_model_prediction_single)(
                    self.handle,
                    floats.as_ptr(),
                    floats.len(),
                    cat_row.as_ptr(),
                    cat_row.len(),
                    preds.as_mut_ptr(),
                    preds.len(),
                )
            };
            if ok {
                Ok(())
            } else {
                Err(CatBoostError::Prediction(last_error()))
            }
        })?;
        metrics::histogram!("catboost_predict_us").record(started.elapsed().as_micros() as f64);

        Ok(preds)
    }

    /// Regroup a flat prediction buffer into one row per document.
    pub fn transform(&self, preds: &[f64]) -> Vec<Vec<f64>> {
        chunk_rows(preds, self.row_result_size())
    }

    /// Names of the features the model uses, in model order.
    pub fn used_features_names(&self) -> Result<Vec<String>, CatBoostError> {
        let t = self.table();
        let mut names_ptr: *mut *mut c_char = std::ptr::null_mut();
        let mut count = self.features_count();

        call_exclusive(|| {
            let ok = unsafe {
                (t.get_model_used_features_names)(self.handle, &mut names_ptr, &mut count)
            };
            if ok {
                Ok(())
            } else {
                Err(CatBoostError::GetUsedFeaturesNames(last_error()))
            }
        })?;

        if names_ptr.is_null() {
            return Ok(Vec::new());
        }

        // The native side allocates the array and every string; copy them
        // into owned memory and free the originals.
        let mut names = Vec::with_capacity(count);
        unsafe {
            for i in 0..count {
                let p = *names_ptr.add(i);
                if p.is_null() {
                    continue;
                }
                names.push(CStr::from_ptr(p).to_string_lossy().into_owned());
                libc::free(p as *mut c_void);
            }
            libc::free(names_ptr as *mut c_void);
        }
        Ok(names)
    }

    /// Column indices of the float features.
    pub fn float_feature_indices(&self) -> Result<Vec<usize>, CatBoostError> {
        self.feature_indices(self.table().get_float_feature_indices)
    }

    /// Column indices of the categorical features.
    pub fn cat_feature_indices(&self) -> Result<Vec<usize>, CatBoostError> {
        self.feature_indices(self.table().get_cat_feature_indices)
    }

    fn feature_indices(
        &self,
        get: unsafe extern "C" fn(ModelCalcerHandle, *mut *mut usize, *mut usize) -> bool,
    ) -> Result<Vec<usize>, CatBoostError> {
        let mut indices_ptr: *mut usize = std::ptr::null_mut();
        let mut count = 0usize;

        call_exclusive(|| {
            let ok = unsafe { get(self.handle, &mut indices_ptr, &mut count) };
            if ok {
                Ok(())
            } else {
                Err(CatBoostError::GetFeatureIndices(last_error()))
            }
        })?;

        if indices_ptr.is_null() {
            return Ok(Vec::new());
        }
        let indices = unsafe { std::slice::from_raw_parts(indices_ptr, count) }.to_vec();
        unsafe { libc::free(indices_ptr as *mut c_void) };
        Ok(indices)
    }

    /// Model metadata for `key`; empty string when the key is absent.
    pub fn model_info_value(&self, key: &str) -> String {
        let t = self.table();
        let Ok(key_c) = CString::new(key) else {
            return String::new();
        };
        let raw = unsafe { (t.get_model_info_value)(self.handle, key_c.as_ptr(), key.len()) };
        if raw.is_null() {
            return String::new();
        }
        // Borrowed from the model's metadata store; copy, do not free.
        unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned()
    }

    /// Metadata snapshot suitable for logging or JSON export.
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            guid: self.model_info_value(META_MODEL_GUID),
            version_info: self.model_info_value(META_VERSION_INFO),
            train_finish_time: self.model_info_value(META_TRAIN_FINISH_TIME),
            float_features_count: self.float_features_count(),
            cat_features_count: self.cat_features_count(),
            dimensions_count: self.dimensions_count(),
        }
    }

    /// Training parameters recorded in the model, when present and
    /// parseable as JSON.
    pub fn training_params(&self) -> Option<serde_json::Value> {
        let raw = self.model_info_value(META_PARAMS);
        if raw.is_empty() {
            return None;
        }
        serde_json::from_str(&raw).ok()
    }

    /// Device kinds the model formula can be evaluated on. Codes this
    /// binding does not know are skipped.
    pub fn supported_evaluator_types(&self) -> Result<Vec<EvaluatorType>, CatBoostError> {
        let t = self.table();
        let mut types_ptr: *mut usize = std::ptr::null_mut();
        let mut count = 0usize;

        call_exclusive(|| {
            let ok = unsafe {
                (t.get_supported_evaluator_types)(self.handle, &mut types_ptr, &mut count)
            };
            if ok {
                Ok(())
            } else {
                Err(CatBoostError::GetSupportedEvaluatorTypes(last_error()))
            }
        })?;

        if types_ptr.is_null() {
            return Ok(Vec::new());
        }
        let raw = unsafe { std::slice::from_raw_parts(types_ptr, count) }.to_vec();
        unsafe { libc::free(types_ptr as *mut c_void) };
        Ok(raw.into_iter().filter_map(EvaluatorType::from_raw).collect())
    }

    /// Route formula evaluation to a GPU device.
    ///
    /// Only the Linux build of the native library ships GPU evaluation;
    /// other platforms fail before any native call, as does a model whose
    /// formula only supports CPU.
    pub fn enable_gpu_evaluation(&mut self, device_id: i32) -> Result<(), CatBoostError> {
        if !cfg!(target_os = "linux") {
            return Err(CatBoostError::GpuUnsupportedPlatform);
        }
        if !self.supported_evaluator_types()?.contains(&EvaluatorType::Gpu) {
            return Err(CatBoostError::GpuUnsupportedDevice);
        }

        let t = self.table();
        call_exclusive(|| {
            let ok = unsafe { (t.enable_gpu_evaluation)(self.handle, device_id) };
            if ok {
                Ok(())
            } else {
                Err(CatBoostError::EnableGpu(last_error()))
            }
        })
    }
}

fn row_result_size(prediction_type: PredictionType, dimensions: usize) -> usize {
    if prediction_type == PredictionType::Class {
        1
    } else {
        dimensions
    }
}

/// Partition `flat` into consecutive `width`-sized rows, one per document.
///
/// `width` must divide the length evenly; a remainder means the producer
/// and the declared output width disagree, which is a bug in the call
/// chain rather than a recoverable input error.
fn chunk_rows(flat: &[f64], width: usize) -> Vec<Vec<f64>> {
    assert!(width > 0, "output width must be positive");
    assert_eq!(
        flat.len() % width,
        0,
        "flat prediction length {} is not a multiple of output width {}",
        flat.len(),
        width
    );
    flat.chunks_exact(width).map(<[f64]>::to_vec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_type_collapses_row_width() {
        assert_eq!(row_result_size(PredictionType::Class, 3), 1);
        assert_eq!(row_result_size(PredictionType::Probability, 3), 3);
        assert_eq!(row_result_size(PredictionType::RawFormulaVal, 1), 1);
        assert_eq!(row_result_size(PredictionType::Exponent, 2), 2);
    }

    #[test]
    fn chunk_rows_preserves_document_order() {
        let flat = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(
            chunk_rows(&flat, 3),
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]
        );
        assert_eq!(
            chunk_rows(&flat, 1),
            vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0], vec![5.0], vec![6.0]]
        );
        assert!(chunk_rows(&[], 4).is_empty());
    }

    #[test]
    #[should_panic(expected = "not a multiple")]
    fn chunk_rows_rejects_uneven_length() {
        let _ = chunk_rows(&[1.0, 2.0, 3.0], 2);
    }

    #[test]
    fn prediction_type_tokens_match_the_native_contract() {
        assert_eq!(PredictionType::RawFormulaVal.as_str(), "RawFormulaVal");
        assert_eq!(PredictionType::Probability.as_str(), "Probability");
        assert_eq!(PredictionType::Class.as_str(), "Class");
        assert_eq!(PredictionType::RMSEWithUncertainty.as_str(), "RMSEWithUncertainty");
        assert_eq!(PredictionType::Exponent.as_str(), "Exponent");

        for ty in [
            PredictionType::RawFormulaVal,
            PredictionType::Probability,
            PredictionType::Class,
            PredictionType::RMSEWithUncertainty,
            PredictionType::Exponent,
        ] {
            assert_eq!(ty.as_c_str().to_str().unwrap(), ty.as_str());
        }
    }

    #[test]
    fn evaluator_type_codes() {
        assert_eq!(EvaluatorType::from_raw(0), Some(EvaluatorType::Cpu));
        assert_eq!(EvaluatorType::from_raw(1), Some(EvaluatorType::Gpu));
        assert_eq!(EvaluatorType::from_raw(7), None);
    }

    #[test]
    fn empty_buffer_is_rejected_before_any_native_call() {
        match Model::load_buffer(&[]) {
            Err(CatBoostError::LoadModel(Some(d))) => assert!(d.contains("empty")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn missing_file_reports_read_failure() {
        match Model::load_file("definitely-not-here.cbm") {
            Err(CatBoostError::ReadFile { path, .. }) => {
                assert_eq!(path, std::path::PathBuf::from("definitely-not-here.cbm"))
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
