//! Resolving `name=scheme@address` arguments into bound sockets.

use std::fmt;
use std::str::FromStr;

use dbzmq_core::OperationTable;
use tracing::{error, info, warn};

use super::{Scheme, TransportHandle};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::registry::Registry;

/// One `name=scheme@address` command-line argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingSpec {
    /// Operation name to look up in the plugin's table.
    pub operation: String,
    /// Everything after the first `=`, e.g. `rep@tcp://127.0.0.1:17700`.
    pub endpoint: String,
}

impl BindingSpec {
    /// Splits `arg` at its first `=`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidBinding`] if there is no `=` or either
    /// side is empty.
    pub fn parse(arg: &str) -> Result<Self, GatewayError> {
        match arg.split_once('=') {
            Some((operation, endpoint)) if !operation.is_empty() && !endpoint.is_empty() => {
                Ok(Self {
                    operation: operation.to_string(),
                    endpoint: endpoint.to_string(),
                })
            }
            _ => Err(GatewayError::InvalidBinding {
                arg: arg.to_string(),
            }),
        }
    }
}

impl FromStr for BindingSpec {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BindingSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.operation, self.endpoint)
    }
}

/// Resolves `spec` against `table`, binds a socket, and attaches it.
///
/// Nothing is bound unless the operation exists, has a callback, is not
/// bound yet, and the scheme is known. Returns the operation's index.
///
/// # Errors
///
/// [`GatewayError::UnknownOperation`], [`GatewayError::MissingCallback`],
/// [`GatewayError::UnknownScheme`], [`GatewayError::InvalidBinding`] for a
/// missing address, [`GatewayError::AlreadyBound`], or
/// [`GatewayError::Bind`] with the transport's error text.
pub fn bind(
    context: &zmq::Context,
    table: &OperationTable,
    registry: &mut Registry,
    spec: &BindingSpec,
    config: &GatewayConfig,
) -> Result<usize, GatewayError> {
    let index = table
        .position(&spec.operation)
        .ok_or_else(|| GatewayError::UnknownOperation {
            name: spec.operation.clone(),
        })?;
    let Some(operation) = table.get(index).filter(|op| op.callback().is_some()) else {
        return Err(GatewayError::MissingCallback {
            name: spec.operation.clone(),
        });
    };
    let (scheme, address) = Scheme::parse(&spec.endpoint)?;
    if registry.is_bound(index) {
        return Err(GatewayError::AlreadyBound {
            name: spec.operation.clone(),
        });
    }

    let bind_error = |err: zmq::Error| GatewayError::Bind {
        address: address.to_string(),
        message: err.to_string(),
    };
    let socket = context.socket(scheme.socket_type()).map_err(bind_error)?;
    socket.set_linger(config.linger_ms()).map_err(bind_error)?;
    socket.bind(address).map_err(bind_error)?;

    if scheme.expects_reply() != operation.reply_capable() {
        warn!(
            op = operation.key(),
            %scheme,
            reply_capable = operation.reply_capable(),
            "binding scheme does not match the operation's declared reply behavior"
        );
    }

    registry.attach(
        index,
        TransportHandle::new(socket, scheme, address, operation.key()),
    )?;
    info!(op = operation.key(), %scheme, address, "operation bound");
    Ok(index)
}

/// Parses and binds every argument, reporting each failure.
///
/// Every argument is attempted even after a failure so the log lists all of
/// them. Returns the number of bound operations.
///
/// # Errors
///
/// [`GatewayError::NoBindings`] if `args` is empty, otherwise
/// [`GatewayError::BindFailures`] if any argument failed.
pub fn bind_all<S: AsRef<str>>(
    context: &zmq::Context,
    table: &OperationTable,
    registry: &mut Registry,
    args: &[S],
    config: &GatewayConfig,
) -> Result<usize, GatewayError> {
    if args.is_empty() {
        return Err(GatewayError::NoBindings);
    }
    let mut failed = 0;
    for arg in args {
        let arg = arg.as_ref();
        let result = BindingSpec::parse(arg)
            .and_then(|spec| bind(context, table, registry, &spec, config));
        if let Err(err) = result {
            error!(binding = arg, error = %err, "binding failed");
            failed += 1;
        }
    }
    if failed > 0 {
        return Err(GatewayError::BindFailures {
            failed,
            total: args.len(),
        });
    }
    Ok(registry.bound_count())
}

#[cfg(test)]
mod tests {
    use dbzmq_core::{emit, Operation};

    use super::*;

    fn table() -> OperationTable {
        OperationTable::new(vec![
            Operation::new("put (k++v) -> k++v", false, |input, cont| {
                emit(cont, input);
                input.len()
            }),
            Operation::new("get (k) -> k++v", true, |input, cont| {
                emit(cont, input);
                input.len()
            }),
            Operation::without_callback("stat", true),
        ])
    }

    fn spec(arg: &str) -> BindingSpec {
        BindingSpec::parse(arg).unwrap()
    }

    #[test]
    fn parses_name_and_endpoint() {
        let spec = spec("get=rep@tcp://127.0.0.1:17700");
        assert_eq!(spec.operation, "get");
        assert_eq!(spec.endpoint, "rep@tcp://127.0.0.1:17700");
        assert_eq!(spec.to_string(), "get=rep@tcp://127.0.0.1:17700");
    }

    #[test]
    fn splits_at_first_equals_only() {
        let spec: BindingSpec = "put=pull@ipc:///tmp/a=b".parse().unwrap();
        assert_eq!(spec.operation, "put");
        assert_eq!(spec.endpoint, "pull@ipc:///tmp/a=b");
    }

    #[test]
    fn rejects_malformed_arguments() {
        for arg in ["get", "=rep@tcp://x:1", "get=", ""] {
            assert!(
                matches!(BindingSpec::parse(arg), Err(GatewayError::InvalidBinding { .. })),
                "{arg}"
            );
        }
    }

    #[test]
    fn binds_known_operation() {
        let ctx = zmq::Context::new();
        let table = table();
        let mut registry = Registry::new(table.count());
        let index = bind(
            &ctx,
            &table,
            &mut registry,
            &spec("get=rep@inproc://binder-get"),
            &GatewayConfig::default(),
        )
        .unwrap();
        assert_eq!(index, 1);
        let handle = registry.get(1).unwrap();
        assert_eq!(handle.op(), "get");
        assert_eq!(handle.scheme(), Scheme::Rep);
        assert_eq!(handle.address(), "inproc://binder-get");
        registry.close_all();
    }

    #[test]
    fn unknown_operation_binds_nothing() {
        let ctx = zmq::Context::new();
        let table = table();
        let mut registry = Registry::new(table.count());
        let err = bind(
            &ctx,
            &table,
            &mut registry,
            &spec("ge=rep@inproc://binder-ge"),
            &GatewayConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::UnknownOperation { ref name } if name == "ge"));
        assert_eq!(registry.bound_count(), 0);
    }

    #[test]
    fn operation_without_callback_cannot_bind() {
        let ctx = zmq::Context::new();
        let table = table();
        let mut registry = Registry::new(table.count());
        let err = bind(
            &ctx,
            &table,
            &mut registry,
            &spec("stat=rep@inproc://binder-stat"),
            &GatewayConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::MissingCallback { .. }));
    }

    #[test]
    fn unknown_scheme_is_rejected_before_binding() {
        let ctx = zmq::Context::new();
        let table = table();
        let mut registry = Registry::new(table.count());
        let err = bind(
            &ctx,
            &table,
            &mut registry,
            &spec("get=bogus@inproc://binder-bogus"),
            &GatewayConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::UnknownScheme { .. }));
        assert_eq!(registry.bound_count(), 0);
    }

    #[test]
    fn second_binding_of_same_operation_is_rejected() {
        let ctx = zmq::Context::new();
        let table = table();
        let mut registry = Registry::new(table.count());
        let config = GatewayConfig::default();
        bind(&ctx, &table, &mut registry, &spec("get=rep@inproc://binder-one"), &config).unwrap();
        let err = bind(&ctx, &table, &mut registry, &spec("get=rep@inproc://binder-two"), &config)
            .unwrap_err();
        assert!(matches!(err, GatewayError::AlreadyBound { .. }));
        registry.close_all();
    }

    #[test]
    fn address_in_use_reports_transport_error() {
        let ctx = zmq::Context::new();
        let table = table();
        let mut registry = Registry::new(table.count());
        let config = GatewayConfig::default();
        bind(&ctx, &table, &mut registry, &spec("put=pull@inproc://binder-taken"), &config)
            .unwrap();
        let err = bind(&ctx, &table, &mut registry, &spec("get=rep@inproc://binder-taken"), &config)
            .unwrap_err();
        match err {
            GatewayError::Bind { address, message } => {
                assert_eq!(address, "inproc://binder-taken");
                assert!(!message.is_empty());
            }
            other => panic!("expected Bind, got {other:?}"),
        }
        assert!(!registry.is_bound(1));
        registry.close_all();
    }

    #[test]
    fn unsupported_transport_reports_transport_error() {
        let ctx = zmq::Context::new();
        let table = table();
        let mut registry = Registry::new(table.count());
        let err = bind(
            &ctx,
            &table,
            &mut registry,
            &spec("get=rep@nosuchproto://x"),
            &GatewayConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Bind { .. }));
    }

    #[test]
    fn bind_all_attempts_every_argument() {
        let ctx = zmq::Context::new();
        let table = table();
        let mut registry = Registry::new(table.count());
        let args = [
            "nope=rep@inproc://binder-all-a",
            "get=rep@inproc://binder-all-b",
            "malformed",
        ];
        let err = bind_all(&ctx, &table, &mut registry, &args, &GatewayConfig::default())
            .unwrap_err();
        assert!(matches!(err, GatewayError::BindFailures { failed: 2, total: 3 }));
        assert!(registry.is_bound(1));
        registry.close_all();
    }

    #[test]
    fn bind_all_without_arguments_is_an_error() {
        let ctx = zmq::Context::new();
        let table = table();
        let mut registry = Registry::new(table.count());
        let args: [&str; 0] = [];
        let err = bind_all(&ctx, &table, &mut registry, &args, &GatewayConfig::default())
            .unwrap_err();
        assert!(matches!(err, GatewayError::NoBindings));
    }
}
