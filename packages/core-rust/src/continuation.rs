//! Continuation protocol: what an operation does with its result.
//!
//! An operation receives its input and an optional continuation. When it has a
//! result to report it hands the bytes to the continuation at most once; not
//! calling it at all means "no result". The same operation therefore runs in
//! two regimes:
//!
//! - **Embedded**: a driver passes `None` or a pure aggregator such as
//!   [`ByteCounter`], and no I/O happens.
//! - **Served**: the gateway passes a continuation that writes the result to
//!   the originating socket and may chain to further observers.
//!
//! Whatever state a continuation needs (a socket, counters, a log target) is
//! captured by the implementing type.

/// Receives the result of an operation.
///
/// Implemented for every `FnMut(&[u8]) -> usize` closure, so ad hoc observers
/// need no named type.
pub trait Continuation {
    /// Consumes one result and returns the byte count it accounts for.
    fn resume(&mut self, data: &[u8]) -> usize;
}

impl<F> Continuation for F
where
    F: FnMut(&[u8]) -> usize,
{
    fn resume(&mut self, data: &[u8]) -> usize {
        self(data)
    }
}

/// Hands `data` to `cont`, if there is one.
///
/// Takes the continuation by value so a single call site cannot resume it
/// twice. Returns the continuation's byte count, or 0 without one.
pub fn emit(cont: Option<&mut dyn Continuation>, data: &[u8]) -> usize {
    match cont {
        Some(cont) => cont.resume(data),
        None => 0,
    }
}

/// Aggregating continuation that only sums result sizes.
///
/// Used by embedded drivers that care about throughput but not content.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ByteCounter {
    /// Number of results received.
    pub results: u64,
    /// Total bytes across all results.
    pub bytes: u64,
}

impl ByteCounter {
    /// Creates a counter with both totals at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Continuation for ByteCounter {
    fn resume(&mut self, data: &[u8]) -> usize {
        self.results += 1;
        self.bytes += data.len() as u64;
        data.len()
    }
}

/// Continuation that keeps a copy of every result it receives.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Recorder {
    results: Vec<Vec<u8>>,
}

impl Recorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All results received so far, oldest first.
    #[must_use]
    pub fn results(&self) -> &[Vec<u8>] {
        &self.results
    }

    /// Number of times the recorder was resumed.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.results.len()
    }

    /// The single result, if exactly one was recorded.
    #[must_use]
    pub fn single(&self) -> Option<&[u8]> {
        match self.results.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

impl Continuation for Recorder {
    fn resume(&mut self, data: &[u8]) -> usize {
        self.results.push(data.to_vec());
        data.len()
    }
}
