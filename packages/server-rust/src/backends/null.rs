//! Backend that stores nothing and echoes every input.
//!
//! Useful for measuring transport and dispatch overhead in isolation: every
//! operation returns its input unchanged, so a `get` over request/reply
//! answers with the key it was sent.

use std::sync::Arc;

use dbzmq_core::{emit, names, Backend, Continuation, Operation, OperationTable};

/// Echo-only backend.
pub struct NullBackend;

fn echo(input: &[u8], cont: Option<&mut dyn Continuation>) -> usize {
    if input.is_empty() {
        return 0;
    }
    emit(cont, input);
    input.len()
}

impl Backend for NullBackend {
    fn name(&self) -> &str {
        "null"
    }

    fn operations(self: Arc<Self>) -> OperationTable {
        [
            (names::PUT, false),
            (names::GET, true),
            (names::DEL, false),
            (names::WALK, true),
        ]
        .into_iter()
        .map(|(name, reply_capable)| Operation::new(name, reply_capable, echo))
        .collect()
    }
}
