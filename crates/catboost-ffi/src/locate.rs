//! Shared-library location.
//!
//! Resolution order: explicit override, then `CATBOOST_LIBRARY_PATH`, then
//! the platform default under `/usr/local/lib`. The existence check is
//! check-then-use racy; the library is static infrastructure, not
//! something that gets swapped under a running process.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::FfiError;

/// Environment variable consulted when no explicit override was set.
pub const LIBRARY_PATH_ENV: &str = "CATBOOST_LIBRARY_PATH";

const DEFAULT_STEM: &str = "/usr/local/lib/libcatboostmodel";

static OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Set the shared-library path for this process.
///
/// Takes effect on the next symbol-table load; once the table is bound the
/// library is never re-opened.
pub fn set_library_path(path: impl AsRef<Path>) {
    let mut slot = OVERRIDE.lock().unwrap_or_else(|e| e.into_inner());
    *slot = Some(path.as_ref().to_path_buf());
}

/// Resolve the shared-library path and verify it exists on disk.
pub fn resolve_library_path() -> Result<PathBuf, FfiError> {
    let path = match explicit_or_env() {
        Some(p) => p,
        None => default_path()?,
    };
    if !path.exists() {
        return Err(FfiError::LibraryNotFound(path));
    }
    Ok(path)
}

fn explicit_or_env() -> Option<PathBuf> {
    {
        let slot = OVERRIDE.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(p) = slot.as_ref() {
            return Some(p.clone());
        }
    }

    match std::env::var_os(LIBRARY_PATH_ENV) {
        Some(v) if !v.is_empty() => Some(PathBuf::from(v)),
        _ => None,
    }
}

fn default_path() -> Result<PathBuf, FfiError> {
    let ext = if cfg!(target_os = "linux") {
        "so"
    } else if cfg!(target_os = "macos") {
        "dylib"
    } else {
        return Err(FfiError::UnsupportedPlatform);
    };
    Ok(PathBuf::from(format!("{DEFAULT_STEM}.{ext}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, b"").unwrap();
        path
    }

    // One test covers the whole chain: the override slot is process-global
    // and sticky, so the steps must run in this order.
    #[test]
    fn resolution_order() {
        std::env::remove_var(LIBRARY_PATH_ENV);

        // Nothing configured: platform default, which on a test machine is
        // normally absent.
        match resolve_library_path() {
            Ok(p) => assert!(p.to_string_lossy().contains("libcatboostmodel")),
            Err(FfiError::LibraryNotFound(p)) => {
                assert!(p.to_string_lossy().contains("libcatboostmodel"))
            }
            Err(FfiError::UnsupportedPlatform) => {}
            Err(e) => panic!("unexpected: {e}"),
        }

        // Env var pointing at a missing file fails with that path.
        std::env::set_var(LIBRARY_PATH_ENV, "/definitely/not/here.so");
        match resolve_library_path() {
            Err(FfiError::LibraryNotFound(p)) => {
                assert_eq!(p, PathBuf::from("/definitely/not/here.so"))
            }
            other => panic!("unexpected: {other:?}"),
        }

        // Env var pointing at an existing file resolves to it.
        let env_lib = touch("cb-locate-env.so");
        std::env::set_var(LIBRARY_PATH_ENV, &env_lib);
        assert_eq!(resolve_library_path().unwrap(), env_lib);

        // Explicit override beats the env var.
        let override_lib = touch("cb-locate-override.so");
        set_library_path(&override_lib);
        assert_eq!(resolve_library_path().unwrap(), override_lib);

        std::env::remove_var(LIBRARY_PATH_ENV);
        let _ = std::fs::remove_file(env_lib);
        let _ = std::fs::remove_file(override_lib);
    }
}
