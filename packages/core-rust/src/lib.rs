//! `dbzmq` Core: the operation calling convention shared by backends, the
//! gateway, and embedded drivers.

pub mod continuation;
pub mod ffi;
pub mod framing;
pub mod operation;
pub mod traits;

pub use continuation::{emit, ByteCounter, Continuation, Recorder};
pub use framing::KeyFraming;
pub use operation::{leading_token, names, Callback, Operation, OperationTable};
pub use traits::Backend;
