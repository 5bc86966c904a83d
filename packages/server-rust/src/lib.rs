//! `dbzmq` Server: serves a key-value backend's operations on per-operation
//! ZeroMQ sockets from a single-threaded poll loop.

pub mod backends;
pub mod config;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod plugin;
pub mod registry;
pub mod transport;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::{Gateway, OperationStats};
pub use lifecycle::{HealthState, ShutdownController};
pub use plugin::{Plugin, PluginSource};
pub use transport::{BindingSpec, Scheme, TransportStats};
