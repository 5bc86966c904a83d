//! Selecting and holding the backend a gateway serves.
//!
//! A plugin is either a shared library exporting `i_speak_db` or one of the
//! backends compiled into the gateway, named as `builtin:<name>`. Either way
//! the result is an operation table; the gateway never sees anything else.

pub mod builtin;
pub mod loader;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use dbzmq_core::{Backend, OperationTable};
use libloading::Library;
use tracing::{info, warn};

use crate::backends::BackendConfig;
use crate::error::GatewayError;

pub use builtin::BuiltinRegistry;

/// Prefix selecting a compiled-in backend instead of a library path.
pub const BUILTIN_PREFIX: &str = "builtin:";

/// Where a plugin comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSource {
    /// A compiled-in backend.
    Builtin(String),
    /// A shared library on disk.
    Library(PathBuf),
}

impl PluginSource {
    /// Interprets a command-line plugin argument.
    #[must_use]
    pub fn parse(arg: &str) -> Self {
        match arg.strip_prefix(BUILTIN_PREFIX) {
            Some(name) => Self::Builtin(name.to_string()),
            None => Self::Library(PathBuf::from(arg)),
        }
    }
}

impl fmt::Display for PluginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(name) => write!(f, "{BUILTIN_PREFIX}{name}"),
            Self::Library(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A loaded backend: its operation table plus whatever keeps it callable.
pub struct Plugin {
    source: PluginSource,
    // Declared before `library`: the table's callbacks point into it.
    table: OperationTable,
    library: Option<Library>,
}

impl Plugin {
    /// Loads `source`, reading built-in backend settings from the
    /// environment.
    ///
    /// # Errors
    ///
    /// Anything [`load_library`](loader::load_library) or
    /// [`BuiltinRegistry::create`] returns, or [`GatewayError::Config`] for a
    /// bad environment.
    pub fn open(source: PluginSource) -> Result<Self, GatewayError> {
        match &source {
            PluginSource::Builtin(name) => {
                let config = BackendConfig::from_env()?;
                let backend = BuiltinRegistry::with_defaults().create(name, &config)?;
                Ok(Self::from_backend(source, backend))
            }
            PluginSource::Library(path) => {
                let (library, table) = loader::load_library(path)?;
                let plugin = Self {
                    source,
                    table,
                    library: Some(library),
                };
                plugin.log_loaded();
                Ok(plugin)
            }
        }
    }

    /// Wraps an in-process backend.
    #[must_use]
    pub fn from_backend(source: PluginSource, backend: Arc<dyn Backend>) -> Self {
        let table = backend.operations();
        let plugin = Self {
            source,
            table,
            library: None,
        };
        plugin.log_loaded();
        plugin
    }

    /// Wraps a ready-made table, e.g. one assembled by an embedding
    /// application.
    #[must_use]
    pub fn from_table(name: &str, table: OperationTable) -> Self {
        Self {
            source: PluginSource::Builtin(name.to_string()),
            table,
            library: None,
        }
    }

    #[must_use]
    pub fn source(&self) -> &PluginSource {
        &self.source
    }

    #[must_use]
    pub fn table(&self) -> &OperationTable {
        &self.table
    }

    /// Multi-line listing of every operation, for diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = format!("Operations exported by {}:\n", self.source);
        for op in self.table.iter() {
            let mut flags = Vec::new();
            if op.reply_capable() {
                flags.push("replies");
            }
            if op.callback().is_none() {
                flags.push("unbindable");
            }
            if flags.is_empty() {
                out.push_str(&format!("\t{}\n", op.name()));
            } else {
                out.push_str(&format!("\t{} [{}]\n", op.name(), flags.join(", ")));
            }
        }
        out
    }

    /// Releases the table, then the library behind it.
    pub fn unload(self) {
        let Self {
            source,
            table,
            library,
        } = self;
        drop(table);
        if let Some(library) = library {
            if let Err(err) = library.close() {
                warn!(plugin = %source, error = %err, "plugin unload failed");
                return;
            }
        }
        info!(plugin = %source, "plugin unloaded");
    }

    fn log_loaded(&self) {
        info!(
            plugin = %self.source,
            operations = self.table.count(),
            "plugin loaded"
        );
        let missing = self.table.missing_required();
        if !missing.is_empty() {
            warn!(plugin = %self.source, ?missing, "plugin lacks required operations");
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("source", &self.source)
            .field("table", &self.table)
            .field("dynamic", &self.library.is_some())
            .finish()
    }
}
