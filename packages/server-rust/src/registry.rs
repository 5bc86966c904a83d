//! Transport attachments for a plugin's operations.
//!
//! The registry does not own the operations; the plugin's table does. It
//! keeps one slot per table entry, by position, holding the socket bound for
//! that entry if any. Closing happens in slot order.

use crate::error::GatewayError;
use crate::transport::{TransportHandle, TransportStats};

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Per-operation transport slots, aligned with an operation table.
#[derive(Debug, Default)]
pub struct Registry {
    slots: Vec<Option<TransportHandle>>,
}

impl Registry {
    /// Creates `count` empty slots.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            slots: (0..count).map(|_| None).collect(),
        }
    }

    /// Number of slots, equal to the table's operation count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether the operation at `index` already has a transport.
    #[must_use]
    pub fn is_bound(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Some(_)))
    }

    /// Attaches `handle` to the operation at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::AlreadyBound`] if the slot is taken and
    /// [`GatewayError::UnknownOperation`] if `index` is out of range. The
    /// handle is dropped (and its socket closed) in both cases.
    pub fn attach(&mut self, index: usize, handle: TransportHandle) -> Result<(), GatewayError> {
        let Some(slot) = self.slots.get_mut(index) else {
            return Err(GatewayError::UnknownOperation {
                name: handle.op().to_string(),
            });
        };
        if slot.is_some() {
            return Err(GatewayError::AlreadyBound {
                name: handle.op().to_string(),
            });
        }
        *slot = Some(handle);
        Ok(())
    }

    /// Number of operations with a transport.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Bound transports with their operation index, in slot order.
    pub fn bound(&self) -> impl Iterator<Item = (usize, &TransportHandle)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|handle| (index, handle)))
    }

    /// Transport of the operation at `index`, if bound.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TransportHandle> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut TransportHandle> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Operation name and counters of every bound transport.
    #[must_use]
    pub fn stats(&self) -> Vec<(String, TransportStats)> {
        self.bound()
            .map(|(_, handle)| (handle.op().to_string(), handle.stats()))
            .collect()
    }

    /// Closes every socket in slot order and returns their final counters.
    pub fn close_all(&mut self) -> Vec<(String, TransportStats)> {
        let mut closed = Vec::new();
        for handle in self.slots.iter_mut().filter_map(Option::take) {
            tracing::debug!(op = handle.op(), address = handle.address(), "closing socket");
            closed.push((handle.op().to_string(), handle.stats()));
            drop(handle);
        }
        closed
    }
}
