//! C ABI over [`EngineHandle`].
//!
//! Handles cross the boundary as opaque tokens, not as pointers to Rust
//! memory. Each token maps to an entry in a process-wide registry; freeing
//! removes the entry, so a stale or forged token is answered with
//! `InvalidHandle` rather than a dereference.
//!
//! All async work runs on one shared multi-thread runtime created on first
//! use. Strings returned to the caller must be released with
//! [`truth_core_free_string`].

use std::collections::HashMap;
use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use tokio::runtime::Runtime;
use tracing::{debug, error, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, ErrorKind};
use crate::handle::{self, EngineHandle};
use crate::logging;

/// Status returned by [`truth_core_sync_with_peer`] on success.
pub const STATUS_OK: i32 = 0;

static RUNTIME: Lazy<Option<Runtime>> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("truth-kernel")
        .build()
        .map_err(|e| error!(error = %e, "failed to start runtime"))
        .ok()
});

static HANDLES: Lazy<RwLock<HashMap<u64, Arc<EngineHandle>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read a `*const c_char` into a `&str`. Returns `None` if null or invalid UTF-8.
unsafe fn cstr_to_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// Allocate a C string. Caller must free via `truth_core_free_string`.
fn to_c_string(bytes: Vec<u8>) -> *mut c_char {
    CString::new(bytes).unwrap_or_default().into_raw()
}

fn error_json(error: &EngineError) -> *mut c_char {
    to_c_string(error.to_json().to_string().into_bytes())
}

fn token_of(core: *mut c_void) -> u64 {
    core as usize as u64
}

fn lookup(core: *mut c_void) -> Option<Arc<EngineHandle>> {
    if core.is_null() {
        return None;
    }
    let handles = HANDLES.read().unwrap_or_else(|e| e.into_inner());
    handles.get(&token_of(core)).cloned()
}

// ---------------------------------------------------------------------------
// FFI functions
// ---------------------------------------------------------------------------

/// Create an engine and return its handle.
///
/// Configuration comes from `TRUTH_KERNEL_*` environment variables. The
/// first call also installs the log subscriber. Never returns null.
#[no_mangle]
pub extern "C" fn truth_core_init() -> *mut c_void {
    logging::init();

    let handle = Arc::new(EngineHandle::init(EngineConfig::from_env()));
    let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
    HANDLES
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .insert(token, handle);

    debug!(token, "engine created");
    token as usize as *mut c_void
}

/// Release an engine. Null and already-freed handles are ignored.
///
/// # Safety
///
/// `core` must be null or a value returned by [`truth_core_init`]. Other
/// values are treated as unknown tokens and ignored.
#[no_mangle]
pub unsafe extern "C" fn truth_core_free(core: *mut c_void) {
    if core.is_null() {
        return;
    }
    let removed = HANDLES
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .remove(&token_of(core));
    match removed {
        Some(handle) => {
            handle.free();
        }
        None => debug!(token = token_of(core), "free of unknown handle ignored"),
    }
}

/// Normalize a record document.
///
/// Returns the normalized JSON on success or `{"error": {...}}` on failure,
/// as a NUL-terminated string owned by the caller.
///
/// # Safety
///
/// `json` must be null or point to at least `json_len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn truth_core_process_json(json: *const c_char, json_len: usize) -> *mut c_char {
    if json.is_null() {
        return error_json(&EngineError::InvalidArgument("json is null".into()));
    }
    let text = std::slice::from_raw_parts(json.cast::<u8>(), json_len);
    match handle::process_json(text) {
        Ok(normalized) => to_c_string(normalized),
        Err(e) => {
            debug!(error = %e, "process_json failed");
            error_json(&e)
        }
    }
}

/// Release a string returned by this library. Null is ignored.
///
/// # Safety
///
/// `s` must be null or a pointer returned by this library that has not
/// been freed yet.
#[no_mangle]
pub unsafe extern "C" fn truth_core_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Verify `signature` over the bytes of `message` with `public_key`.
///
/// Signature and key are hex or base64 text. Any null argument, or text
/// that does not decode, yields `false`.
///
/// # Safety
///
/// Every non-null argument must point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn truth_core_verify_signature(
    message: *const c_char,
    signature: *const c_char,
    public_key: *const c_char,
) -> bool {
    if message.is_null() {
        return false;
    }
    let message = CStr::from_ptr(message).to_bytes();
    let (Some(signature), Some(public_key)) = (cstr_to_str(signature), cstr_to_str(public_key))
    else {
        return false;
    };
    handle::verify_signature(message, signature, public_key)
}

/// Run one blocking sync round with `peer_url`.
///
/// Returns 0 on success, otherwise a negative status code:
/// -1 network error, -2 timeout, -3 invalid handle, -4 peer unreachable,
/// -5 invalid argument, -7 internal error.
///
/// # Safety
///
/// `peer_url` must be null or point to a NUL-terminated string. Calls made
/// from inside an async runtime run the round on a separate thread and
/// block the caller until it completes.
#[no_mangle]
pub unsafe extern "C" fn truth_core_sync_with_peer(core: *mut c_void, peer_url: *const c_char) -> i32 {
    let Some(handle) = lookup(core) else {
        return ErrorKind::InvalidHandle.status_code();
    };
    let Some(peer_url) = cstr_to_str(peer_url) else {
        return ErrorKind::InvalidArgument.status_code();
    };
    let Some(runtime) = RUNTIME.as_ref() else {
        return ErrorKind::Internal.status_code();
    };

    let round = || runtime.block_on(handle.sync_with_peer(peer_url));
    // block_on panics on a thread that already drives a runtime.
    let outcome = if tokio::runtime::Handle::try_current().is_ok() {
        match std::thread::scope(|scope| scope.spawn(round).join()) {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(peer = peer_url, "sync thread panicked");
                return ErrorKind::Internal.status_code();
            }
        }
    } else {
        round()
    };

    match outcome {
        Ok(_) => STATUS_OK,
        Err(e) => {
            warn!(peer = peer_url, error = %e, "sync_with_peer failed");
            e.status_code()
        }
    }
}

/// Number of peers contacted at least once, or -3 for an invalid handle.
///
/// # Safety
///
/// `core` must be null or a value returned by [`truth_core_init`].
#[no_mangle]
pub unsafe extern "C" fn truth_core_get_peer_count(core: *mut c_void) -> i32 {
    let count = lookup(core)
        .ok_or(EngineError::InvalidHandle)
        .and_then(|handle| handle.peer_count());
    match count {
        Ok(n) => i32::try_from(n).unwrap_or(i32::MAX),
        Err(e) => e.status_code(),
    }
}
