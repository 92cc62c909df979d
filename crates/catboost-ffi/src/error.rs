//! Initialization errors and the library-global error channel.
//!
//! Most native calls return a success boolean; the failure detail lives in
//! one global slot read through `GetErrorString`. That slot is shared by
//! every model in the process, so a fallible call and its follow-up
//! channel read must be serialized against all other fallible calls (see
//! [`call_exclusive`]).

use std::ffi::CStr;
use std::path::PathBuf;
use std::sync::Mutex;

/// Marker the native library embeds in its error reports; the usable
/// payload starts at this marker.
const ERROR_MARKER: &str = "catboost.git";

/// Failure while binding the shared library.
///
/// All of these are fatal for model construction: no `Model` can exist in
/// this process until the cause is fixed and the load retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FfiError {
    /// The running platform has no known library layout (only Linux and
    /// macOS builds of the native library exist).
    UnsupportedPlatform,
    /// The resolved path does not exist on disk.
    LibraryNotFound(PathBuf),
    /// The dynamic loader rejected the library.
    LoadLibrary { path: PathBuf, detail: String },
    /// A required entry point is absent; the symbol table is never left
    /// partially populated.
    MissingSymbol { symbol: &'static str, detail: String },
}

impl std::fmt::Display for FfiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FfiError::UnsupportedPlatform => {
                write!(f, "catboost shared library is only supported on Linux and macOS")
            }
            FfiError::LibraryNotFound(path) => {
                write!(f, "catboost shared library not found at `{}`", path.display())
            }
            FfiError::LoadLibrary { path, detail } => {
                write!(f, "failed to load catboost shared library `{}`: {detail}", path.display())
            }
            FfiError::MissingSymbol { symbol, detail } => {
                write!(f, "symbol `{symbol}` missing from catboost shared library: {detail}")
            }
        }
    }
}

impl std::error::Error for FfiError {}

static CALL_LOCK: Mutex<()> = Mutex::new(());

/// Run `f` while holding the process-wide native-call lock.
///
/// Keeps a failing call and its channel read atomic with respect to every
/// other fallible call; without it a concurrent failure could overwrite
/// the message before it is read.
pub fn call_exclusive<T>(f: impl FnOnce() -> T) -> T {
    let _guard = CALL_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    f()
}

/// Read the library-global error channel.
///
/// `None` means no error is currently recorded (or the message does not
/// carry the library's report marker). Only meaningful right after a
/// native call signalled failure.
pub fn last_error() -> Option<String> {
    let table = crate::table::table().ok()?;
    let raw = unsafe { (table.get_error_string)() };
    if raw.is_null() {
        return None;
    }
    let message = unsafe { CStr::from_ptr(raw) }.to_string_lossy();
    parse_error_message(&message)
}

/// Extract the payload of a raw channel message: the suffix starting at
/// the `catboost.git` marker, `None` when the marker is absent.
pub fn parse_error_message(message: &str) -> Option<String> {
    message.find(ERROR_MARKER).map(|i| message[i..].to_string())
}
