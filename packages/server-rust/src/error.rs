//! Startup and run-time errors of the gateway.

use std::path::PathBuf;

use crate::backends::ConfigError;

/// Errors raised while loading a plugin, binding its operations, or polling.
///
/// Every variant is fatal at startup. Failures inside an operation callback
/// never surface here; backends report them through their byte counts.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("cannot load plugin {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("plugin {} does not export `{symbol}`: {source}", path.display())]
    Symbol {
        path: PathBuf,
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },
    #[error("unknown built-in backend `{name}` (available: {available})")]
    UnknownBuiltin { name: String, available: String },
    #[error("cannot initialize backend `{name}`: {source:#}")]
    BackendInit {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("invalid backend configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("binding `{arg}` is not of the form name=scheme@address")]
    InvalidBinding { arg: String },
    #[error("unknown operation `{name}`")]
    UnknownOperation { name: String },
    #[error("unknown transport scheme in `{spec}` (expected pull@ or rep@)")]
    UnknownScheme { spec: String },
    #[error("operation `{name}` has no callback")]
    MissingCallback { name: String },
    #[error("operation `{name}` is already bound")]
    AlreadyBound { name: String },
    #[error("cannot bind `{address}`: {message}")]
    Bind { address: String, message: String },
    #[error("no operations bound")]
    NoBindings,
    #[error("{failed} of {total} bindings failed")]
    BindFailures { failed: usize, total: usize },
    #[error("poll failed: {0}")]
    Poll(#[source] zmq::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_error_carries_transport_text() {
        let err = GatewayError::Bind {
            address: "tcp://127.0.0.1:1".to_string(),
            message: zmq::Error::EACCES.to_string(),
        };
        let text = err.to_string();
        assert!(text.starts_with("cannot bind `tcp://127.0.0.1:1`: "));
        assert!(text.len() > "cannot bind `tcp://127.0.0.1:1`: ".len());
    }

    #[test]
    fn unknown_scheme_names_offending_spec() {
        let err = GatewayError::UnknownScheme {
            spec: "bogus@tcp://127.0.0.1:9".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unknown transport scheme in `bogus@tcp://127.0.0.1:9` (expected pull@ or rep@)"
        );
    }

    #[test]
    fn backend_init_includes_cause_chain() {
        let err = GatewayError::BackendInit {
            name: "redb".to_string(),
            source: anyhow::anyhow!("disk full").context("cannot open file"),
        };
        assert_eq!(
            err.to_string(),
            "cannot initialize backend `redb`: cannot open file: disk full"
        );
    }
}
