//! Error taxonomy for model operations.
//!
//! Initialization failures (`Init`) mean no model can be constructed;
//! operation failures leave previously constructed models usable. None of
//! these are retried here: buffers are call-scoped, so a retry has to
//! re-marshal from the caller's data anyway.

use std::ffi::NulError;
use std::path::PathBuf;

use catboost_ffi::FfiError;

/// Everything a model operation can fail with.
///
/// Operation variants carry the native error channel's message when one
/// was recorded for the failing call.
#[derive(Debug)]
pub enum CatBoostError {
    /// Locating/loading the shared library or resolving its symbols
    /// failed.
    Init(FfiError),
    /// Reading a model file from disk failed.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// The native library rejected the model bytes.
    LoadModel(Option<String>),
    /// The native library rejected the prediction-type token.
    SetPredictionType(Option<String>),
    /// Fetching the used-feature name list failed.
    GetUsedFeaturesNames(Option<String>),
    /// Fetching float/categorical feature indices failed.
    GetFeatureIndices(Option<String>),
    /// Querying supported evaluator devices failed.
    GetSupportedEvaluatorTypes(Option<String>),
    /// The native GPU-enable call failed.
    EnableGpu(Option<String>),
    /// GPU evaluation is not built into the native library on this
    /// platform; no native call was made.
    GpuUnsupportedPlatform,
    /// The model's formula does not support GPU evaluation; no native
    /// call was made.
    GpuUnsupportedDevice,
    /// Model inference failed.
    Prediction(Option<String>),
    /// A categorical value contains an interior NUL byte and cannot cross
    /// the foreign boundary.
    InvalidCatValue(NulError),
}

fn with_detail(
    f: &mut std::fmt::Formatter<'_>,
    what: &str,
    detail: &Option<String>,
) -> std::fmt::Result {
    match detail {
        Some(d) => write!(f, "{what}: {d}"),
        None => write!(f, "{what}"),
    }
}

impl std::fmt::Display for CatBoostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatBoostError::Init(e) => write!(f, "{e}"),
            CatBoostError::ReadFile { path, source } => {
                write!(f, "failed load model from file `{}`: {source}", path.display())
            }
            CatBoostError::LoadModel(d) => with_detail(f, "failed load model from bytes", d),
            CatBoostError::SetPredictionType(d) => with_detail(f, "failed set prediction type", d),
            CatBoostError::GetUsedFeaturesNames(d) => {
                with_detail(f, "failed get used features names", d)
            }
            CatBoostError::GetFeatureIndices(d) => with_detail(f, "failed get feature indices", d),
            CatBoostError::GetSupportedEvaluatorTypes(d) => {
                with_detail(f, "failed get supported evaluator types", d)
            }
            CatBoostError::EnableGpu(d) => with_detail(f, "failed enable GPU evaluation", d),
            CatBoostError::GpuUnsupportedPlatform => {
                write!(f, "GPU evaluation is not supported by the native library on this platform")
            }
            CatBoostError::GpuUnsupportedDevice => {
                write!(f, "model formula does not support GPU evaluation")
            }
            CatBoostError::Prediction(d) => with_detail(f, "failed inference model", d),
            CatBoostError::InvalidCatValue(_) => {
                write!(f, "categorical value contains an interior NUL byte")
            }
        }
    }
}

impl std::error::Error for CatBoostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatBoostError::Init(e) => Some(e),
            CatBoostError::ReadFile { source, .. } => Some(source),
            CatBoostError::InvalidCatValue(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_channel_detail_when_present() {
        let e = CatBoostError::Prediction(Some("catboost.git/calcer.cpp:1: mismatch".into()));
        assert_eq!(e.to_string(), "failed inference model: catboost.git/calcer.cpp:1: mismatch");

        let e = CatBoostError::Prediction(None);
        assert_eq!(e.to_string(), "failed inference model");
    }

    #[test]
    fn read_file_keeps_io_source() {
        use std::error::Error;
        let e = CatBoostError::ReadFile {
            path: PathBuf::from("fake.cbm"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(e.to_string().contains("fake.cbm"));
        assert!(e.source().is_some());
    }
}
