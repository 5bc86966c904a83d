use std::sync::Arc;

use crate::operation::OperationTable;

/// A key-value backend that exports its functionality as an operation table.
///
/// The gateway never sees the backend type itself, only the table. Callbacks
/// capture an `Arc` of the backend, so its resources live exactly as long as
/// the last table referring to it.
pub trait Backend: Send + Sync + 'static {
    /// Short identifier used in logs (e.g. `"memory"`).
    fn name(&self) -> &str;

    /// Builds the table of operations this backend exports.
    fn operations(self: Arc<Self>) -> OperationTable;
}
