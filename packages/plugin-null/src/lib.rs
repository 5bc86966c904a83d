//! Minimal shared-library plugin: every operation echoes its input.
//!
//! Build with `cargo build -p dbzmq-plugin-null` and serve with
//!
//! ```text
//! dbzmq target/debug/libdbzmq_plugin_null.so get=rep@tcp://127.0.0.1:17700
//! ```
#![allow(unsafe_code)]

use std::ffi::c_void;
use std::slice;

use dbzmq_core::ffi::{resume_raw, RawOperation};

unsafe extern "C" fn echo(data: *const c_void, len: usize, cb: *const c_void, token: *mut c_void) -> usize {
    if data.is_null() || len == 0 {
        return 0;
    }
    // SAFETY: the host passes `len` readable bytes at `data`.
    let input = unsafe { slice::from_raw_parts(data.cast::<u8>(), len) };
    // SAFETY: `cb` and `token` are forwarded unchanged from the host.
    unsafe { resume_raw(cb, input, token) };
    len
}

static OPERATIONS: [RawOperation; 5] = [
    RawOperation::new(c"put", false, echo),
    RawOperation::new(c"get", true, echo),
    RawOperation::new(c"del", false, echo),
    RawOperation::new(c"walk", true, echo),
    RawOperation::SENTINEL,
];

/// Plugin entry point.
#[no_mangle]
pub extern "C" fn i_speak_db() -> *const RawOperation {
    OPERATIONS.as_ptr()
}
