//! Named operations and the ordered table a backend exports.
//!
//! An operation name may carry human-readable calling-convention notes after
//! its first whitespace, e.g. `"get (kN) -> k++vN || k"`. Lookups compare only
//! the leading token, so clients asking for `"get"` still find it.

use std::fmt;
use std::sync::Arc;

use crate::continuation::Continuation;

/// Well-known operation names.
pub mod names {
    /// Store `key ++ value`.
    pub const PUT: &str = "put";
    /// Fetch the value for a bare key.
    pub const GET: &str = "get";
    /// Remove a bare key.
    pub const DEL: &str = "del";
    /// Ordered-successor scan. Optional.
    pub const WALK: &str = "walk";
    /// Persist buffered writes. Optional.
    pub const FLUSH: &str = "flush";

    /// Operations every conformant backend exports.
    pub const REQUIRED: [&str; 3] = [PUT, GET, DEL];
}

/// Shared, thread-safe operation entry point.
///
/// Takes the input bytes and an optional continuation; returns the number of
/// bytes the operation considers processed.
pub type Callback = Arc<dyn Fn(&[u8], Option<&mut dyn Continuation>) -> usize + Send + Sync>;

/// Returns the part of `name` before the first whitespace character.
#[must_use]
pub fn leading_token(name: &str) -> &str {
    name.split(char::is_whitespace).next().unwrap_or_default()
}

/// A single named operation exported by a backend.
#[derive(Clone)]
pub struct Operation {
    name: String,
    reply_capable: bool,
    callback: Option<Callback>,
}

impl Operation {
    /// Creates an operation backed by `callback`.
    pub fn new<F>(name: impl Into<String>, reply_capable: bool, callback: F) -> Self
    where
        F: Fn(&[u8], Option<&mut dyn Continuation>) -> usize + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            reply_capable,
            callback: Some(Arc::new(callback)),
        }
    }

    /// Creates an entry with no callback.
    ///
    /// Only foreign tables produce these; such an entry is listed but can
    /// never be bound.
    #[must_use]
    pub fn without_callback(name: impl Into<String>, reply_capable: bool) -> Self {
        Self {
            name: name.into(),
            reply_capable,
            callback: None,
        }
    }

    /// Full declared name, including any signature notes.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name's leading token, which is what lookups match against.
    #[must_use]
    pub fn key(&self) -> &str {
        leading_token(&self.name)
    }

    /// Free-text notes following the leading token, if any.
    #[must_use]
    pub fn signature(&self) -> Option<&str> {
        let rest = self.name[self.key().len()..].trim();
        (!rest.is_empty()).then_some(rest)
    }

    /// Whether the backend declares this operation as producing replies.
    #[must_use]
    pub fn reply_capable(&self) -> bool {
        self.reply_capable
    }

    /// The callback, or `None` for an entry that cannot be bound.
    #[must_use]
    pub fn callback(&self) -> Option<&Callback> {
        self.callback.as_ref()
    }

    /// Runs the operation. An entry without a callback processes nothing.
    pub fn invoke(&self, input: &[u8], cont: Option<&mut dyn Continuation>) -> usize {
        match &self.callback {
            Some(callback) => callback(input, cont),
            None => 0,
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("reply_capable", &self.reply_capable)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Ordered set of operations exported by one backend.
///
/// Declaration order is preserved; lookups scan it front to back and the
/// first match wins.
#[derive(Debug, Clone, Default)]
pub struct OperationTable {
    operations: Vec<Operation>,
}

impl OperationTable {
    /// Wraps `operations` without reordering them.
    #[must_use]
    pub fn new(operations: Vec<Operation>) -> Self {
        Self { operations }
    }

    /// Appends an operation, builder style.
    #[must_use]
    pub fn with(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Finds the first operation whose leading token equals `name`.
    ///
    /// Matching is exact and case-sensitive on the token: `"get"` finds
    /// `"get (kN) -> k++vN"`, `"ge"` finds nothing.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Operation> {
        self.position(name).map(|index| &self.operations[index])
    }

    /// Index of the operation [`lookup`](Self::lookup) would return.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }
        self.operations.iter().position(|op| op.key() == name)
    }

    /// Operation at `index` in declaration order.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Operation> {
        self.operations.get(index)
    }

    /// Number of operations in the table.
    #[must_use]
    pub fn count(&self) -> usize {
        self.operations.len()
    }

    /// Whether the table exports nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Iterates operations in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    /// Required operation names this table does not export.
    #[must_use]
    pub fn missing_required(&self) -> Vec<&'static str> {
        names::REQUIRED
            .into_iter()
            .filter(|name| self.lookup(name).is_none())
            .collect()
    }
}

impl FromIterator<Operation> for OperationTable {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::continuation::{emit, Recorder};

    fn echo(name: &str) -> Operation {
        Operation::new(name, true, |input, cont| {
            emit(cont, input);
            input.len()
        })
    }

    fn documented_table() -> OperationTable {
        OperationTable::new(vec![
            echo("put (kNvN) -> k++v || k"),
            echo("get (kN) -> k++vN"),
            echo("del"),
        ])
    }

    #[test]
    fn lookup_matches_leading_token() {
        let table = documented_table();
        let op = table.lookup("get").expect("get should resolve");
        assert_eq!(op.name(), "get (kN) -> k++vN");
        assert_eq!(op.signature(), Some("(kN) -> k++vN"));
    }

    #[test]
    fn lookup_rejects_partial_token() {
        let table = documented_table();
        assert!(table.lookup("ge").is_none());
        assert!(table.lookup("gets").is_none());
        assert!(table.lookup("").is_none());
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert!(documented_table().lookup("GET").is_none());
    }

    #[test]
    fn lookup_follows_declaration_order() {
        let table = OperationTable::new(vec![echo("get first"), echo("get second")]);
        assert_eq!(table.lookup("get").map(Operation::name), Some("get first"));
        assert_eq!(table.position("get"), Some(0));
    }

    #[test]
    fn bare_name_has_no_signature() {
        assert_eq!(echo("del").signature(), None);
        assert_eq!(echo("del").key(), "del");
    }

    #[test]
    fn count_excludes_nothing_but_entries() {
        assert_eq!(documented_table().count(), 3);
        assert_eq!(OperationTable::default().count(), 0);
    }

    #[test]
    fn missing_required_reports_absent_names() {
        let table = OperationTable::new(vec![echo("get"), echo("walk")]);
        assert_eq!(table.missing_required(), vec![names::PUT, names::DEL]);
        assert!(documented_table().missing_required().is_empty());
    }

    #[test]
    fn invoke_without_callback_processes_nothing() {
        let op = Operation::without_callback("flush", false);
        let mut recorder = Recorder::new();
        assert_eq!(op.invoke(b"key", Some(&mut recorder)), 0);
        assert_eq!(recorder.calls(), 0);
        assert!(op.callback().is_none());
    }

    #[test]
    fn invoke_runs_callback_with_continuation() {
        let op = echo("get");
        let mut recorder = Recorder::new();
        assert_eq!(op.invoke(b"abc", Some(&mut recorder)), 3);
        assert_eq!(recorder.single(), Some(&b"abc"[..]));
    }

    proptest! {
        #[test]
        fn leading_token_never_contains_whitespace(name in ".{0,40}") {
            let token = leading_token(&name);
            prop_assert!(!token.chars().any(char::is_whitespace));
            prop_assert!(name.starts_with(token));
        }

        #[test]
        fn documented_name_resolves_by_token(
            token in "[a-z]{1,8}",
            notes in "[ -~]{0,20}",
        ) {
            let table = OperationTable::new(vec![echo(&format!("{token} {notes}"))]);
            prop_assert!(table.lookup(&token).is_some());
        }
    }
}
