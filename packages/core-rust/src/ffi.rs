//! C ABI for backends shipped as shared libraries.
//!
//! A plugin exports one zero-argument function named [`ENTRY_SYMBOL`] that
//! returns a pointer to an array of [`RawOperation`] entries terminated by an
//! entry whose name is null or empty. Every callback has the signature
//!
//! ```c
//! size_t op(const void* data, size_t len, const void* cb, void* token);
//! ```
//!
//! where `cb`, when non-null, is a function of the same signature that the
//! operation calls at most once as `cb(result, result_len, NULL, token)`.
//!
//! [`table_from_raw`] converts such an array into an [`OperationTable`]. Rust
//! continuations cross the boundary through a trampoline: the host passes the
//! trampoline as `cb` and a pointer to the continuation as `token`.
#![allow(unsafe_code)]

use std::ffi::{c_char, c_int, c_void, CStr};
use std::ptr;
use std::slice;

use crate::continuation::Continuation;
use crate::operation::{Operation, OperationTable};

/// Name of the factory symbol every plugin exports.
pub const ENTRY_SYMBOL: &str = "i_speak_db";

/// C signature shared by operations and continuations.
pub type RawOpFn =
    unsafe extern "C" fn(data: *const c_void, len: usize, cb: *const c_void, token: *mut c_void) -> usize;

/// Signature of the exported factory.
pub type PluginEntry = unsafe extern "C" fn() -> *const RawOperation;

/// One entry of a plugin's operation array.
#[repr(C)]
#[derive(Debug)]
pub struct RawOperation {
    /// NUL-terminated name, optionally followed by signature notes.
    pub name: *const c_char,
    /// 1 if the operation produces replies, 0 otherwise.
    pub reply_capable: c_int,
    /// Entry point; null entries are listed but never bound.
    pub callback: Option<RawOpFn>,
    /// Unused by the host.
    pub reserved: *mut c_void,
}

// SAFETY: the host only reads `name` and `callback`; `reserved` is never
// dereferenced. Plugins keep their tables in immutable statics.
unsafe impl Sync for RawOperation {}

impl RawOperation {
    /// Terminating entry.
    pub const SENTINEL: Self = Self {
        name: ptr::null(),
        reply_capable: 0,
        callback: None,
        reserved: ptr::null_mut(),
    };

    /// Builds an entry suitable for a `static` table.
    #[must_use]
    pub const fn new(name: &'static CStr, reply_capable: bool, callback: RawOpFn) -> Self {
        Self {
            name: name.as_ptr(),
            reply_capable: if reply_capable { 1 } else { 0 },
            callback: Some(callback),
            reserved: ptr::null_mut(),
        }
    }
}

/// Converts a plugin's null-terminated operation array.
///
/// Names are copied (lossily, for non-UTF-8 bytes). A null `entries` pointer
/// yields an empty table.
///
/// # Safety
///
/// `entries` must be null or point to an array terminated by an entry with a
/// null or empty name, and every callback must stay callable for as long as
/// the returned table (or any clone of it) is alive.
#[must_use]
pub unsafe fn table_from_raw(entries: *const RawOperation) -> OperationTable {
    let mut operations = Vec::new();
    let mut cursor = entries;
    while !cursor.is_null() {
        // SAFETY: the caller guarantees every entry up to the sentinel is valid.
        let entry = unsafe { &*cursor };
        if entry.name.is_null() {
            break;
        }
        // SAFETY: non-null names are NUL-terminated per the plugin contract.
        let raw_name = unsafe { CStr::from_ptr(entry.name) };
        if raw_name.is_empty() {
            break;
        }
        let name = raw_name.to_string_lossy().into_owned();
        if raw_name.to_str().is_err() {
            tracing::warn!(name = %name, "plugin operation name is not valid UTF-8");
        }
        let reply_capable = entry.reply_capable != 0;
        operations.push(match entry.callback {
            Some(raw) => Operation::new(name, reply_capable, move |input, cont| {
                // SAFETY: the caller keeps the library loaded while the table lives.
                unsafe { invoke_raw(raw, input, cont) }
            }),
            None => Operation::without_callback(name, reply_capable),
        });
        // SAFETY: the sentinel has not been reached, so the next entry exists.
        cursor = unsafe { cursor.add(1) };
    }
    OperationTable::new(operations)
}

/// Calls a raw operation, bridging an optional Rust continuation.
///
/// # Safety
///
/// `raw` must be a live function honoring the plugin calling convention.
pub unsafe fn invoke_raw(raw: RawOpFn, input: &[u8], cont: Option<&mut dyn Continuation>) -> usize {
    let data = input.as_ptr().cast::<c_void>();
    match cont {
        None => unsafe { raw(data, input.len(), ptr::null(), ptr::null_mut()) },
        Some(cont) => {
            let mut slot: &mut dyn Continuation = cont;
            let token: *mut &mut dyn Continuation = &mut slot;
            let trampoline = resume_trampoline as RawOpFn as *const c_void;
            unsafe { raw(data, input.len(), trampoline, token.cast::<c_void>()) }
        }
    }
}

/// Resumes a C continuation from plugin code.
///
/// Returns 0 without calling anything when `cb` is null, which is how an
/// embedded caller says it wants no result.
///
/// # Safety
///
/// `cb` must be null or the continuation pointer the host passed to the
/// operation, and `token` the matching token.
pub unsafe fn resume_raw(cb: *const c_void, data: &[u8], token: *mut c_void) -> usize {
    if cb.is_null() {
        return 0;
    }
    // SAFETY: a non-null `cb` is a `RawOpFn` per the calling convention.
    let cb = unsafe { std::mem::transmute::<*const c_void, RawOpFn>(cb) };
    // SAFETY: forwarded verbatim from the host.
    unsafe { cb(data.as_ptr().cast::<c_void>(), data.len(), ptr::null(), token) }
}

unsafe extern "C" fn resume_trampoline(
    data: *const c_void,
    len: usize,
    _next: *const c_void,
    token: *mut c_void,
) -> usize {
    if token.is_null() {
        return 0;
    }
    // SAFETY: `invoke_raw` passes a pointer to a continuation slot that
    // outlives the raw call.
    let cont = unsafe { &mut *token.cast::<&mut dyn Continuation>() };
    let data = if data.is_null() || len == 0 {
        &[][..]
    } else {
        // SAFETY: the plugin hands back `len` readable bytes at `data`.
        unsafe { slice::from_raw_parts(data.cast::<u8>(), len) }
    };
    cont.resume(data)
}
