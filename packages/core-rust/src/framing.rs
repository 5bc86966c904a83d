//! Fixed-width key framing shared by backends and clients.
//!
//! ```text
//! +-----------+-----------+
//! | KEY[size] | VALUE[n]  |
//! +-----------+-----------+
//! ```
//!
//! The key width is a deployment-wide setting; messages carry no length
//! prefix beyond what the transport provides per message.

/// Key width used when `DBZMQ_KEYSIZE` is not set.
pub const DEFAULT_KEY_SIZE: usize = 20;

/// Largest key width a deployment may configure.
pub const MAX_KEY_SIZE: usize = 255;

/// Environment variable holding the key width.
pub const KEY_SIZE_ENV: &str = "DBZMQ_KEYSIZE";

/// Splits and joins `key ++ value` payloads of a fixed key width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyFraming {
    key_size: usize,
}

impl KeyFraming {
    /// Returns `None` unless `1 <= key_size <= MAX_KEY_SIZE`.
    #[must_use]
    pub fn new(key_size: usize) -> Option<Self> {
        (1..=MAX_KEY_SIZE)
            .contains(&key_size)
            .then_some(Self { key_size })
    }

    /// Configured key width in bytes.
    #[must_use]
    pub fn key_size(&self) -> usize {
        self.key_size
    }

    /// Splits a `put` payload into key and value.
    ///
    /// Returns `None` when the payload is not longer than the key, which
    /// makes the call malformed.
    #[must_use]
    pub fn split_pair<'a>(&self, input: &'a [u8]) -> Option<(&'a [u8], &'a [u8])> {
        (input.len() > self.key_size).then(|| input.split_at(self.key_size))
    }

    /// Concatenates `key ++ value` into one reply payload.
    #[must_use]
    pub fn join(key: &[u8], value: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(key.len() + value.len());
        out.extend_from_slice(key);
        out.extend_from_slice(value);
        out
    }
}

impl Default for KeyFraming {
    fn default() -> Self {
        Self {
            key_size: DEFAULT_KEY_SIZE,
        }
    }
}
