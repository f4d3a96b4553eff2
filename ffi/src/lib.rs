//! C-ABI wrapper around the `todo-sync` engine.
//!
//! # Overview
//! Lets a native host (which owns networking and connectivity detection)
//! drive the sync engine: `todo_sync_begin` either resolves a request from
//! the local store or returns the HTTP request to execute, and
//! `todo_sync_complete` reconciles the store with the host's response.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Todo records and results cross as JSON in the service's schema.
//! - The C caller owns all returned pointers and must call the matching
//!   `todo_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use todo_sync::{
    filter_by_status, HttpResponse, NetworkState, PageRequest, Reconciler, SyncError, SyncMethod,
    SyncRequest, Target, Todo, TodoClient, TodoStore,
};

use types::*;

/// Borrow a C string as `&str`, treating invalid UTF-8 as empty.
///
/// # Safety
/// `s` must be non-null and point to a NUL-terminated string that outlives
/// the returned reference.
unsafe fn borrow_str<'a>(s: *const c_char) -> &'a str {
    unsafe { CStr::from_ptr(s) }.to_str().unwrap_or("")
}

/// `catch_unwind` for FFI bodies; the store's lock is not `RefUnwindSafe`.
fn guarded<R>(f: impl FnOnce() -> R) -> std::thread::Result<R> {
    catch_unwind(AssertUnwindSafe(f))
}

// ---------------------------------------------------------------------------
// Handle lifecycle
// ---------------------------------------------------------------------------

/// Create a sync handle with an empty store, bound to `base_url`.
///
/// Returns null if `base_url` is null or if an internal panic occurs.
/// The caller must free the returned pointer with `todo_sync_free`.
#[unsafe(no_mangle)]
pub extern "C" fn todo_sync_new(base_url: *const c_char) -> *mut FfiSyncHandle {
    guarded(|| {
        if base_url.is_null() {
            return std::ptr::null_mut();
        }
        let url = unsafe { borrow_str(base_url) };
        let inner = Reconciler::new(TodoClient::new(url), TodoStore::new());
        Box::into_raw(Box::new(FfiSyncHandle { inner }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a handle created by `todo_sync_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn todo_sync_free(handle: *mut FfiSyncHandle) {
    if !handle.is_null() {
        let _ = guarded(|| {
            drop(unsafe { Box::from_raw(handle) });
        });
    }
}

/// True while a remote call issued by this handle is outstanding.
#[unsafe(no_mangle)]
pub extern "C" fn todo_sync_is_pending(handle: *const FfiSyncHandle) -> bool {
    if handle.is_null() {
        return false;
    }
    guarded(|| unsafe { &*handle }.inner.is_pending()).unwrap_or(false)
}

/// True when `generation` belongs to the most recently begun request.
#[unsafe(no_mangle)]
pub extern "C" fn todo_sync_is_latest(handle: *const FfiSyncHandle, generation: u64) -> bool {
    if handle.is_null() {
        return false;
    }
    guarded(|| {
        let handle = unsafe { &*handle };
        handle.inner.is_latest(todo_sync::Generation(generation))
    })
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Sync operations
// ---------------------------------------------------------------------------

/// Translate an `FfiSyncRequest` into a core `SyncRequest`.
fn core_request(req: &FfiSyncRequest) -> Result<SyncRequest, String> {
    let method = SyncMethod::from(req.method);
    let payload = if req.payload_json.is_null() {
        None
    } else {
        let json = unsafe { borrow_str(req.payload_json) };
        let todo: Todo = serde_json::from_str(json).map_err(|e| format!("invalid payload: {e}"))?;
        Some(todo)
    };

    let target = match method {
        SyncMethod::List => {
            let limit = if req.limit == 0 {
                PageRequest::DEFAULT_LIMIT
            } else {
                req.limit
            };
            Target::Page(PageRequest {
                limit,
                skip: req.skip,
            })
        }
        SyncMethod::Create => Target::Add,
        SyncMethod::Update | SyncMethod::Delete => match (u64::try_from(req.item_id), &payload) {
            (Ok(id), _) => Target::Item(id),
            (Err(_), Some(todo)) => Target::Item(todo.id),
            // No id and no record: the reconciler refuses it, as unsupported
            // offline or as an invalid request online.
            (Err(_), None) => Target::Add,
        },
    };

    Ok(SyncRequest::new(method, target, payload))
}

/// Start a sync operation.
///
/// When the device is offline (`is_connected && is_internet_reachable` is
/// false) the step is `Done` and the local store has already been updated.
/// Otherwise the step is `Remote`: execute `step->request` and hand
/// `step->call` to `todo_sync_complete`.
///
/// Returns null if `handle` or `request` is null.
/// The caller must free the returned pointer with `todo_free_step`.
#[unsafe(no_mangle)]
pub extern "C" fn todo_sync_begin(
    handle: *const FfiSyncHandle,
    request: *const FfiSyncRequest,
    is_connected: bool,
    is_internet_reachable: bool,
) -> *mut FfiSyncStep {
    guarded(|| {
        if handle.is_null() || request.is_null() {
            return std::ptr::null_mut();
        }
        let handle = unsafe { &*handle };
        let request = match core_request(unsafe { &*request }) {
            Ok(r) => r,
            Err(msg) => {
                let err = SyncError::InvalidRequest(msg);
                return FfiSyncStep::done_with(FfiFetchResult::error(
                    FfiErrorCode::InvalidRequest,
                    &err.to_string(),
                    0,
                    0,
                    FfiOrigin::Remote,
                ));
            }
        };
        let network = NetworkState {
            is_connected,
            is_internet_reachable,
        };
        match handle.inner.begin(request, network) {
            todo_sync::SyncStep::Done(result) => FfiSyncStep::done(result),
            todo_sync::SyncStep::Remote(call) => FfiSyncStep::remote(call),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Finish a remote step.
///
/// Pass the server's answer in `response`, or set `response` to null and
/// describe the failed round-trip in `transport_error`. Always consumes
/// `call`, including when another argument is null.
/// The caller must free the returned pointer with `todo_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn todo_sync_complete(
    handle: *const FfiSyncHandle,
    call: *mut FfiRemoteCall,
    response: *const FfiHttpResponse,
    transport_error: *const c_char,
) -> *mut FfiFetchResult {
    guarded(|| {
        if call.is_null() {
            return FfiFetchResult::null_arg("call");
        }
        let call = unsafe { Box::from_raw(call) };
        if handle.is_null() {
            return FfiFetchResult::null_arg("handle");
        }
        let handle = unsafe { &*handle };

        let outcome = if !response.is_null() {
            let resp = unsafe { &*response };
            let body = if resp.body.is_null() {
                String::new()
            } else {
                unsafe { borrow_str(resp.body) }.to_string()
            };
            Ok(HttpResponse::new(resp.status, body))
        } else if !transport_error.is_null() {
            Err(unsafe { borrow_str(transport_error) }.to_string())
        } else {
            return FfiFetchResult::null_arg("response");
        };

        FfiFetchResult::from_core(handle.inner.complete(call.inner, outcome))
    })
    .unwrap_or_else(|_| FfiFetchResult::panic("panic in todo_sync_complete"))
}

// ---------------------------------------------------------------------------
// Store access
// ---------------------------------------------------------------------------

fn todos_json(todos: &[Todo]) -> *mut c_char {
    match serde_json::to_string(todos) {
        Ok(json) => c_string(json),
        Err(_) => std::ptr::null_mut(),
    }
}

/// JSON array of every record in the local store, in order.
///
/// Returns null if `handle` is null. Free with `todo_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn todo_store_snapshot_json(handle: *const FfiSyncHandle) -> *mut c_char {
    guarded(|| {
        if handle.is_null() {
            return std::ptr::null_mut();
        }
        let handle = unsafe { &*handle };
        todos_json(&handle.inner.store().snapshot())
    })
    .unwrap_or(std::ptr::null_mut())
}

/// JSON array of the completed (or pending) records in the local store.
///
/// Returns null if `handle` is null. Free with `todo_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn todo_store_filter_json(
    handle: *const FfiSyncHandle,
    completed: bool,
) -> *mut c_char {
    guarded(|| {
        if handle.is_null() {
            return std::ptr::null_mut();
        }
        let handle = unsafe { &*handle };
        let split = filter_by_status(&handle.inner.store().snapshot());
        if completed {
            todos_json(&split.completed)
        } else {
            todos_json(&split.pending)
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

fn free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let req = unsafe { Box::from_raw(req) };
    if !req.path.is_null() {
        drop(unsafe { CString::from_raw(req.path) });
    }
    if !req.body.is_null() {
        drop(unsafe { CString::from_raw(req.body) });
    }
    if !req.headers.is_null() && req.headers_len > 0 {
        let headers = unsafe {
            Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                req.headers,
                req.headers_len as usize,
            ))
        };
        for h in headers.iter() {
            if !h.key.is_null() {
                drop(unsafe { CString::from_raw(h.key) });
            }
            if !h.value.is_null() {
                drop(unsafe { CString::from_raw(h.value) });
            }
        }
    }
}

fn free_result(result: *mut FfiFetchResult) {
    if result.is_null() {
        return;
    }
    let result = unsafe { Box::from_raw(result) };
    if !result.error_message.is_null() {
        drop(unsafe { CString::from_raw(result.error_message) });
    }
    if !result.data_json.is_null() {
        drop(unsafe { CString::from_raw(result.data_json) });
    }
}

/// Free an `FfiSyncStep` with its `result` and `request`. Does not free
/// `call`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn todo_free_step(step: *mut FfiSyncStep) {
    if step.is_null() {
        return;
    }
    let _ = guarded(|| {
        let step = unsafe { Box::from_raw(step) };
        free_request(step.request);
        free_result(step.result);
    });
}

/// Abandon a remote call without completing it. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn todo_free_call(call: *mut FfiRemoteCall) {
    if !call.is_null() {
        let _ = guarded(|| {
            drop(unsafe { Box::from_raw(call) });
        });
    }
}

/// Free an `FfiFetchResult` returned by `todo_sync_complete`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn todo_free_result(result: *mut FfiFetchResult) {
    let _ = guarded(|| free_result(result));
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn todo_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = guarded(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    const MILK: &str = r#"{"id":7,"todo":"buy milk","completed":false,"userId":3}"#;

    fn handle() -> *mut FfiSyncHandle {
        let url = CString::new("http://localhost:3000").unwrap();
        todo_sync_new(url.as_ptr())
    }

    fn request(method: FfiSyncMethod, payload: Option<&CString>) -> FfiSyncRequest {
        FfiSyncRequest {
            method,
            item_id: -1,
            limit: 0,
            skip: 0,
            payload_json: payload.map_or(std::ptr::null(), |p| p.as_ptr()),
        }
    }

    fn take_string(s: *mut c_char) -> String {
        assert!(!s.is_null());
        let out = unsafe { CStr::from_ptr(s) }.to_str().unwrap().to_string();
        todo_free_string(s);
        out
    }

    fn snapshot(h: *const FfiSyncHandle) -> serde_json::Value {
        serde_json::from_str(&take_string(todo_store_snapshot_json(h))).unwrap()
    }

    #[test]
    fn handle_new_and_free() {
        let h = handle();
        assert!(!h.is_null());
        todo_sync_free(h);
    }

    #[test]
    fn handle_new_null_returns_null() {
        assert!(todo_sync_new(std::ptr::null()).is_null());
    }

    #[test]
    fn handle_free_null_is_safe() {
        todo_sync_free(std::ptr::null_mut());
    }

    #[test]
    fn begin_null_args_return_null() {
        let h = handle();
        let req = request(FfiSyncMethod::List, None);
        assert!(todo_sync_begin(std::ptr::null(), &req, true, true).is_null());
        assert!(todo_sync_begin(h, std::ptr::null(), true, true).is_null());
        todo_sync_free(h);
    }

    #[test]
    fn offline_create_is_done_locally() {
        let h = handle();
        let payload = CString::new(MILK).unwrap();
        let req = request(FfiSyncMethod::Create, Some(&payload));

        let step = todo_sync_begin(h, &req, false, false);
        let s = unsafe { &*step };
        assert_eq!(s.kind, FfiStepKind::Done);
        assert!(s.call.is_null());
        assert!(s.request.is_null());
        let r = unsafe { &*s.result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert_eq!(r.origin, FfiOrigin::Local);
        let data: serde_json::Value =
            serde_json::from_str(unsafe { CStr::from_ptr(r.data_json) }.to_str().unwrap()).unwrap();
        assert_eq!(data["id"], 7);
        todo_free_step(step);

        assert_eq!(snapshot(h).as_array().unwrap().len(), 1);
        todo_sync_free(h);
    }

    #[test]
    fn offline_mutation_without_payload_is_unsupported() {
        let h = handle();
        let mut req = request(FfiSyncMethod::Delete, None);
        req.item_id = 4;

        let step = todo_sync_begin(h, &req, true, false);
        let r = unsafe { &*(*step).result };
        assert_eq!(r.error_code, FfiErrorCode::UnsupportedOffline);
        assert!(r.data_json.is_null());
        let msg = unsafe { CStr::from_ptr(r.error_message) }.to_str().unwrap();
        assert_eq!(msg, "operation not supported offline");

        todo_free_step(step);
        todo_sync_free(h);
    }

    #[test]
    fn offline_mutation_without_id_or_payload_is_unsupported() {
        let h = handle();
        for method in [FfiSyncMethod::Update, FfiSyncMethod::Delete] {
            let req = request(method, None);
            let step = todo_sync_begin(h, &req, false, false);
            let r = unsafe { &*(*step).result };
            assert_eq!(r.error_code, FfiErrorCode::UnsupportedOffline);
            assert_eq!(r.origin, FfiOrigin::Local);
            let msg = unsafe { CStr::from_ptr(r.error_message) }.to_str().unwrap();
            assert_eq!(msg, "operation not supported offline");
            todo_free_step(step);
        }
        assert!(!todo_sync_is_pending(h));
        todo_sync_free(h);
    }

    #[test]
    fn online_mutation_without_id_or_payload_is_invalid_request() {
        let h = handle();
        let req = request(FfiSyncMethod::Update, None);
        let step = todo_sync_begin(h, &req, true, true);
        let s = unsafe { &*step };
        assert_eq!(s.kind, FfiStepKind::Done);
        assert!(s.call.is_null());
        let r = unsafe { &*s.result };
        assert_eq!(r.error_code, FfiErrorCode::InvalidRequest);
        assert_eq!(r.origin, FfiOrigin::Remote);
        assert!(!todo_sync_is_pending(h));
        todo_free_step(step);
        todo_sync_free(h);
    }

    #[test]
    fn invalid_payload_is_invalid_request() {
        let h = handle();
        let payload = CString::new(r#"{"id":"x"}"#).unwrap();
        let req = request(FfiSyncMethod::Create, Some(&payload));

        let step = todo_sync_begin(h, &req, true, true);
        let s = unsafe { &*step };
        assert_eq!(s.kind, FfiStepKind::Done);
        assert_eq!(unsafe { &*s.result }.error_code, FfiErrorCode::InvalidRequest);

        todo_free_step(step);
        todo_sync_free(h);
    }

    #[test]
    fn online_list_builds_paged_request() {
        let h = handle();
        let mut req = request(FfiSyncMethod::List, None);
        req.skip = 20;

        let step = todo_sync_begin(h, &req, true, true);
        let s = unsafe { &*step };
        assert_eq!(s.kind, FfiStepKind::Remote);
        assert!(!s.call.is_null());
        let http = unsafe { &*s.request };
        assert_eq!(http.method, FfiHttpMethod::Get);
        let path = unsafe { CStr::from_ptr(http.path) }.to_str().unwrap();
        assert_eq!(path, "http://localhost:3000/todos?limit=10&skip=20");
        assert_eq!(http.headers_len, 1);
        assert!(todo_sync_is_pending(h));

        let call = s.call;
        todo_free_step(step);
        todo_free_call(call);
        assert!(!todo_sync_is_pending(h));
        todo_sync_free(h);
    }

    #[test]
    fn online_create_round_trip_keeps_request_id() {
        let h = handle();
        let payload = CString::new(MILK).unwrap();
        let req = request(FfiSyncMethod::Create, Some(&payload));

        let step = todo_sync_begin(h, &req, true, true);
        let s = unsafe { &*step };
        assert_eq!(s.kind, FfiStepKind::Remote);
        let http = unsafe { &*s.request };
        assert_eq!(http.method, FfiHttpMethod::Post);
        let body_str = unsafe { CStr::from_ptr(http.body) }.to_str().unwrap();
        let body: serde_json::Value = serde_json::from_str(body_str).unwrap();
        assert!(body.get("id").is_none());
        assert_eq!(body["todo"], "buy milk");

        let call = s.call;
        let generation = s.generation;
        todo_free_step(step);

        let server_body =
            CString::new(r#"{"id":255,"todo":"buy milk","completed":false,"userId":3}"#).unwrap();
        let resp = FfiHttpResponse {
            status: 201,
            body: server_body.as_ptr(),
        };
        let result = todo_sync_complete(h, call, &resp, std::ptr::null());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert_eq!(r.generation, generation);
        assert!(todo_sync_is_latest(h, generation));
        let data: serde_json::Value =
            serde_json::from_str(unsafe { CStr::from_ptr(r.data_json) }.to_str().unwrap()).unwrap();
        assert_eq!(data["id"], 7);
        todo_free_result(result);

        assert_eq!(snapshot(h)[0]["id"], 7);
        todo_sync_free(h);
    }

    #[test]
    fn complete_with_error_status_is_fetch_failed() {
        let h = handle();
        let payload = CString::new(MILK).unwrap();
        let req = request(FfiSyncMethod::Update, Some(&payload));

        let step = todo_sync_begin(h, &req, true, true);
        let call = unsafe { &*step }.call;
        todo_free_step(step);

        let body = CString::new("").unwrap();
        let resp = FfiHttpResponse {
            status: 500,
            body: body.as_ptr(),
        };
        let result = todo_sync_complete(h, call, &resp, std::ptr::null());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::FetchFailed);
        assert_eq!(r.http_status, 500);
        let msg = unsafe { CStr::from_ptr(r.error_message) }.to_str().unwrap();
        assert_eq!(msg, "failed to fetch data");

        todo_free_result(result);
        todo_sync_free(h);
    }

    #[test]
    fn complete_with_transport_error() {
        let h = handle();
        let req = request(FfiSyncMethod::List, None);
        let step = todo_sync_begin(h, &req, true, true);
        let call = unsafe { &*step }.call;
        todo_free_step(step);

        let err = CString::new("Network request failed").unwrap();
        let result = todo_sync_complete(h, call, std::ptr::null(), err.as_ptr());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Transport);
        let msg = unsafe { CStr::from_ptr(r.error_message) }.to_str().unwrap();
        assert_eq!(msg, "Network request failed");

        todo_free_result(result);
        todo_sync_free(h);
    }

    #[test]
    fn complete_null_call_returns_null_arg() {
        let h = handle();
        let result = todo_sync_complete(h, std::ptr::null_mut(), std::ptr::null(), std::ptr::null());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::NullArg);
        todo_free_result(result);
        todo_sync_free(h);
    }

    #[test]
    fn filter_splits_store() {
        let h = handle();
        for json in [
            r#"{"id":1,"todo":"a","completed":true,"userId":1}"#,
            r#"{"id":2,"todo":"b","completed":false,"userId":1}"#,
            r#"{"id":3,"todo":"c","completed":true,"userId":1}"#,
        ] {
            let payload = CString::new(json).unwrap();
            let req = request(FfiSyncMethod::Create, Some(&payload));
            todo_free_step(todo_sync_begin(h, &req, false, false));
        }

        let completed: serde_json::Value =
            serde_json::from_str(&take_string(todo_store_filter_json(h, true))).unwrap();
        let pending: serde_json::Value =
            serde_json::from_str(&take_string(todo_store_filter_json(h, false))).unwrap();
        let ids = |v: &serde_json::Value| {
            v.as_array()
                .unwrap()
                .iter()
                .map(|t| t["id"].as_u64().unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&completed), vec![1, 3]);
        assert_eq!(ids(&pending), vec![2]);
        todo_sync_free(h);
    }

    #[test]
    fn header_is_not_written_into_sources() {
        let source_header =
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("include/todo_sync.h");
        assert!(!source_header.exists());
    }

    #[test]
    fn free_functions_accept_null() {
        todo_free_step(std::ptr::null_mut());
        todo_free_call(std::ptr::null_mut());
        todo_free_result(std::ptr::null_mut());
        todo_free_string(std::ptr::null_mut());
    }
}
