//! Shared-library plugins.
#![allow(unsafe_code)]

use std::path::Path;

use dbzmq_core::ffi::{table_from_raw, PluginEntry, ENTRY_SYMBOL};
use dbzmq_core::OperationTable;
use libloading::{Library, Symbol};

use crate::error::GatewayError;

/// Opens `path` and reads the operation table its entry point returns.
///
/// The returned table calls into `Library`; the caller must drop the table
/// before the library.
///
/// # Errors
///
/// [`GatewayError::Load`] if the file cannot be opened as a shared library,
/// [`GatewayError::Symbol`] if it does not export the entry point.
pub fn load_library(path: &Path) -> Result<(Library, OperationTable), GatewayError> {
    // SAFETY: loading runs the library's initializers. The operator named this
    // artifact as the plugin to serve.
    let library = unsafe { Library::new(path) }.map_err(|source| GatewayError::Load {
        path: path.to_path_buf(),
        source,
    })?;

    let table = {
        // SAFETY: the plugin contract fixes the entry point's signature.
        let entry: Symbol<PluginEntry> =
            unsafe { library.get(ENTRY_SYMBOL.as_bytes()) }.map_err(|source| {
                GatewayError::Symbol {
                    path: path.to_path_buf(),
                    symbol: ENTRY_SYMBOL,
                    source,
                }
            })?;
        // SAFETY: the entry point takes no arguments and returns a pointer to
        // a sentinel-terminated array that lives as long as the library, which
        // outlives the table per the ownership rule above.
        unsafe { table_from_raw(entry()) }
    };

    Ok((library, table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_load_error() {
        let err = load_library(Path::new("/nonexistent/libdbzmq_nothing.so")).unwrap_err();
        assert!(matches!(err, GatewayError::Load { .. }));
        assert!(err.to_string().contains("/nonexistent/libdbzmq_nothing.so"));
    }

    #[test]
    fn non_library_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-plugin.so");
        std::fs::write(&path, b"plain text, not an object file").unwrap();
        assert!(matches!(load_library(&path), Err(GatewayError::Load { .. })));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn library_without_entry_point_is_a_symbol_error() {
        let err = load_library(Path::new("libc.so.6")).unwrap_err();
        match err {
            GatewayError::Symbol { symbol, .. } => assert_eq!(symbol, "i_speak_db"),
            other => panic!("expected Symbol, got {other:?}"),
        }
    }
}
