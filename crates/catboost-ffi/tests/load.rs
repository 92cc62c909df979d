use catboost_ffi::{resolve_library_path, table};

// Binding the table only succeeds when a real libcatboostmodel resolves;
// either way the outcome must be a clean result, never a crash.
#[test]
fn table_load_matches_library_presence() {
    match resolve_library_path() {
        Ok(_) => {
            // Library present on this machine: the full symbol set must bind.
            assert!(table().is_ok());
        }
        Err(expected) => match table() {
            Ok(_) => panic!("no library on disk, table must not bind"),
            // Locator failures pass through unchanged.
            Err(err) => assert_eq!(err, expected),
        },
    }
}
