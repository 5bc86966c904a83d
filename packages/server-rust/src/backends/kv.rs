//! The key-value operation set, implemented once over any [`KvEngine`].
//!
//! | op    | input       | result                                   | returns          |
//! |-------|-------------|------------------------------------------|------------------|
//! | put   | `k ++ v`    | `k ++ v`, or `k` if the write failed     | result length    |
//! | get   | `k`         | `k ++ v`, or `k` if absent               | result length    |
//! | del   | `k`         | `k`                                      | `len(k)`         |
//! | walk  | `k`         | next `k' ++ v'`, or `k` if none follows   | result length    |
//! | flush | anything    | the input, echoed                        | `len(input)`     |
//!
//! A `put` whose payload is not longer than the key width, or a `get`, `del`
//! or `flush` with empty input, is malformed: it returns 0 and produces no
//! result. A `walk` from the empty key starts at the first entry and yields
//! nothing on an empty store.

use std::sync::Arc;

use dbzmq_core::{emit, names, Backend, Continuation, KeyFraming, Operation, OperationTable};
use tracing::{debug, warn};

use super::engine::KvEngine;

/// Exposes a [`KvEngine`] as the standard operation table.
pub struct KvBackend<E> {
    name: &'static str,
    engine: E,
    framing: KeyFraming,
}

impl<E: KvEngine> KvBackend<E> {
    /// Wraps `engine` under the log name `name`.
    #[must_use]
    pub fn new(name: &'static str, engine: E, framing: KeyFraming) -> Self {
        Self {
            name,
            engine,
            framing,
        }
    }

    fn put(&self, input: &[u8], cont: Option<&mut dyn Continuation>) -> usize {
        let Some((key, value)) = self.framing.split_pair(input) else {
            debug!(
                backend = self.name,
                len = input.len(),
                key_size = self.framing.key_size(),
                "put payload not longer than key"
            );
            return 0;
        };
        match self.engine.put(key, value) {
            Ok(()) => {
                emit(cont, input);
                input.len()
            }
            Err(err) => {
                warn!(backend = self.name, error = %err, "put failed");
                emit(cont, key);
                key.len()
            }
        }
    }

    fn get(&self, key: &[u8], cont: Option<&mut dyn Continuation>) -> usize {
        if key.is_empty() {
            return 0;
        }
        match self.engine.get(key) {
            Ok(Some(value)) => reply_pair(key, &value, cont),
            Ok(None) => {
                emit(cont, key);
                key.len()
            }
            Err(err) => {
                warn!(backend = self.name, error = %err, "get failed");
                emit(cont, key);
                key.len()
            }
        }
    }

    fn del(&self, key: &[u8], cont: Option<&mut dyn Continuation>) -> usize {
        if key.is_empty() {
            return 0;
        }
        if let Err(err) = self.engine.remove(key) {
            warn!(backend = self.name, error = %err, "del failed");
        }
        emit(cont, key);
        key.len()
    }

    fn walk(&self, key: &[u8], cont: Option<&mut dyn Continuation>) -> usize {
        let next = self.engine.successor(key).unwrap_or_else(|err| {
            warn!(backend = self.name, error = %err, "walk failed");
            None
        });
        match next {
            Some((next_key, value)) => reply_pair(&next_key, &value, cont),
            None if key.is_empty() => 0,
            None => {
                emit(cont, key);
                key.len()
            }
        }
    }

    fn flush(&self, input: &[u8], cont: Option<&mut dyn Continuation>) -> usize {
        if let Err(err) = self.engine.flush() {
            warn!(backend = self.name, error = %err, "flush failed");
        }
        if input.is_empty() {
            return 0;
        }
        emit(cont, input);
        input.len()
    }
}

/// Emits `key ++ value`, building the buffer only when someone listens.
fn reply_pair(key: &[u8], value: &[u8], cont: Option<&mut dyn Continuation>) -> usize {
    if let Some(cont) = cont {
        cont.resume(&KeyFraming::join(key, value));
    }
    key.len() + value.len()
}

impl<E: KvEngine> Backend for KvBackend<E> {
    fn name(&self) -> &str {
        self.name
    }

    fn operations(self: Arc<Self>) -> OperationTable {
        let put = Arc::clone(&self);
        let get = Arc::clone(&self);
        let del = Arc::clone(&self);
        let walk = Arc::clone(&self);
        let flush = self;
        OperationTable::new(vec![
            Operation::new(
                format!("{} (k++v) -> k++v || k", names::PUT),
                false,
                move |input, cont| put.put(input, cont),
            ),
            Operation::new(
                format!("{} (k) -> k++v || k", names::GET),
                true,
                move |input, cont| get.get(input, cont),
            ),
            Operation::new(
                format!("{} (k) -> k", names::DEL),
                false,
                move |input, cont| del.del(input, cont),
            ),
            Operation::new(
                format!("{} (k) -> k'++v' || k", names::WALK),
                true,
                move |input, cont| walk.walk(input, cont),
            ),
            Operation::new(
                format!("{} (x) -> x", names::FLUSH),
                false,
                move |input, cont| flush.flush(input, cont),
            ),
        ])
    }
}
