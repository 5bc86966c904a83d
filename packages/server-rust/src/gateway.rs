//! The single-threaded dispatch loop.
//!
//! Lifecycle:
//! 1. `new()` creates the messaging context and an empty slot per operation
//! 2. `bind()` / `bind_all()` attach sockets to operations
//! 3. `run()` polls until shutdown is requested
//! 4. `close()` closes sockets, destroys the context, then unloads the plugin
//!
//! Each loop iteration waits up to the configured poll interval for any bound
//! socket to become readable, then reads at most one message from every
//! ready socket and hands it to that socket's operation with a
//! [`ReplySink`] as continuation. Operations run to completion on the loop
//! thread.

use std::sync::Arc;

use dbzmq_core::Operation;
use tracing::{debug, info, trace, warn};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::lifecycle::ShutdownController;
use crate::plugin::Plugin;
use crate::registry::Registry;
use crate::transport::{binder, BindingSpec, ReplySink, ReplyTracer, TransportHandle, TransportStats};

/// Final counters of one binding, as returned by [`Gateway::close`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationStats {
    pub op: String,
    pub stats: TransportStats,
}

/// Serves one plugin's operations over ZeroMQ.
pub struct Gateway {
    config: GatewayConfig,
    registry: Registry,
    context: zmq::Context,
    plugin: Plugin,
    shutdown: Arc<ShutdownController>,
}

impl Gateway {
    /// Creates a gateway for `plugin` with nothing bound yet.
    #[must_use]
    pub fn new(plugin: Plugin, config: GatewayConfig) -> Self {
        let registry = Registry::new(plugin.table().count());
        Self {
            config,
            registry,
            context: zmq::Context::new(),
            plugin,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    #[must_use]
    pub fn plugin(&self) -> &Plugin {
        &self.plugin
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The messaging context, for connecting in-process peers over
    /// `inproc://` endpoints.
    #[must_use]
    pub fn context(&self) -> &zmq::Context {
        &self.context
    }

    /// Returns a shared reference to the shutdown controller.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Binds one operation.
    ///
    /// # Errors
    ///
    /// See [`binder::bind`].
    pub fn bind(&mut self, spec: &BindingSpec) -> Result<(), GatewayError> {
        binder::bind(
            &self.context,
            self.plugin.table(),
            &mut self.registry,
            spec,
            &self.config,
        )
        .map(|_| ())
    }

    /// Binds every `name=scheme@address` argument, logging each failure.
    ///
    /// # Errors
    ///
    /// See [`binder::bind_all`].
    pub fn bind_all<S: AsRef<str>>(&mut self, args: &[S]) -> Result<usize, GatewayError> {
        binder::bind_all(
            &self.context,
            self.plugin.table(),
            &mut self.registry,
            args,
            &self.config,
        )
    }

    /// Number of operations with a socket attached.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.registry.bound_count()
    }

    /// Current counters of every bound operation, in table order.
    #[must_use]
    pub fn stats(&self) -> Vec<OperationStats> {
        self.registry
            .stats()
            .into_iter()
            .map(|(op, stats)| OperationStats { op, stats })
            .collect()
    }

    /// Runs the loop until shutdown is requested.
    ///
    /// The run flag is checked at the top of every iteration, so a request
    /// made before `run()` returns immediately. Returns the number of
    /// shutdown requests seen.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Poll`] if polling fails for a reason other than an
    /// interrupted system call.
    pub fn run(&mut self) -> Result<u64, GatewayError> {
        self.shutdown.set_ready();
        info!(
            bound = self.registry.bound_count(),
            poll_interval_ms = self.config.poll_timeout_ms(),
            "gateway loop started"
        );
        while self.shutdown.is_running() {
            self.poll_once()?;
        }
        let requests = self.shutdown.shutdown_requests();
        info!(shutdown_requests = requests, "gateway loop stopped");
        Ok(requests)
    }

    /// One loop iteration: poll, then dispatch at most one message per
    /// ready socket. Returns the number of messages dispatched.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub fn poll_once(&mut self) -> Result<usize, GatewayError> {
        let ready = self.poll_ready()?;
        let mut dispatched = 0;
        for index in ready {
            let (Some(transport), Some(operation)) =
                (self.registry.get_mut(index), self.plugin.table().get(index))
            else {
                continue;
            };
            let message = match transport.try_recv() {
                Ok(Some(message)) => message,
                Ok(None) => continue,
                Err(err) => {
                    warn!(op = transport.op(), error = %err, "receive failed");
                    continue;
                }
            };
            transport.record_inbound(message.len());
            dispatch(operation, transport, &message, self.config.trace_replies);
            dispatched += 1;
        }
        Ok(dispatched)
    }

    /// Indices of bound operations whose socket is readable.
    fn poll_ready(&self) -> Result<Vec<usize>, GatewayError> {
        let (indices, mut items): (Vec<usize>, Vec<zmq::PollItem<'_>>) = self
            .registry
            .bound()
            .map(|(index, transport)| (index, transport.poll_item()))
            .unzip();
        match zmq::poll(&mut items, self.config.poll_timeout_ms()) {
            Ok(0) => Ok(Vec::new()),
            Ok(_) => Ok(indices
                .into_iter()
                .zip(&items)
                .filter(|(_, item)| item.is_readable())
                .map(|(index, _)| index)
                .collect()),
            Err(zmq::Error::EINTR) => {
                trace!("poll interrupted");
                Ok(Vec::new())
            }
            Err(err) => Err(GatewayError::Poll(err)),
        }
    }

    /// Closes every socket in table order, destroys the context, and
    /// unloads the plugin. Returns each binding's final counters.
    pub fn close(self) -> Vec<OperationStats> {
        let Self {
            mut registry,
            context,
            plugin,
            shutdown,
            ..
        } = self;

        let stats: Vec<OperationStats> = registry
            .close_all()
            .into_iter()
            .map(|(op, stats)| OperationStats { op, stats })
            .collect();
        for entry in &stats {
            info!(
                op = %entry.op,
                calls = entry.stats.calls,
                bytes_in = entry.stats.bytes_in,
                bytes_out = entry.stats.bytes_out,
                "binding closed"
            );
        }

        // Terminating the context blocks until every socket is closed.
        drop(context);
        debug!("messaging context terminated");
        plugin.unload();
        shutdown.set_stopped();
        stats
    }
}

/// Runs `operation` on one received message, replying through `transport`.
fn dispatch(
    operation: &Operation,
    transport: &mut TransportHandle,
    message: &[u8],
    trace_replies: bool,
) -> usize {
    let expects_reply = transport.scheme().expects_reply();
    let mut tracer = ReplyTracer::new(operation.key());
    let mut sink = ReplySink::new(transport);
    if trace_replies {
        sink = sink.chain(&mut tracer);
    }
    let processed = operation.invoke(message, Some(&mut sink));
    let replies = sink.replies();

    debug!(
        op = operation.key(),
        len = message.len(),
        processed,
        replies,
        "dispatched"
    );
    if expects_reply && replies == 0 {
        warn!(
            op = operation.key(),
            len = message.len(),
            "request/reply operation produced no reply, answering with an empty frame"
        );
        if let Err(err) = transport.release() {
            warn!(op = operation.key(), error = %err, "empty reply failed");
        }
    }
    processed
}
