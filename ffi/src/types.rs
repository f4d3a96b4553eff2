//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Requests and responses cross as C-compatible plain data. Todo records
//! and result payloads cross as JSON strings in the service's own schema,
//! so the host can reuse whatever model it already decodes that schema
//! into. Conversion functions live here to keep `lib.rs` focused on the
//! `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use todo_sync::{FetchResult, HttpMethod, Origin, Reconciler, RemoteCall, SyncError, SyncMethod};

/// Opaque handle to a `Reconciler` and its store. C callers receive a
/// pointer to this and pass it back into every FFI function.
pub struct FfiSyncHandle {
    pub(crate) inner: Reconciler,
}

/// Opaque handle to an online request awaiting its HTTP round-trip.
/// Consumed by `todo_sync_complete` or released by `todo_free_call`.
pub struct FfiRemoteCall {
    pub(crate) inner: RemoteCall,
}

pub(crate) fn c_string(s: impl Into<Vec<u8>>) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Delete = 3,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Delete => FfiHttpMethod::Delete,
        }
    }
}

/// Sync operation requested by the host.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiSyncMethod {
    List = 0,
    Create = 1,
    Update = 2,
    Delete = 3,
}

impl From<FfiSyncMethod> for SyncMethod {
    fn from(m: FfiSyncMethod) -> Self {
        match m {
            FfiSyncMethod::List => SyncMethod::List,
            FfiSyncMethod::Create => SyncMethod::Create,
            FfiSyncMethod::Update => SyncMethod::Update,
            FfiSyncMethod::Delete => SyncMethod::Delete,
        }
    }
}

/// A sync request from the host.
///
/// `item_id < 0` means "use the payload's id". `limit`/`skip` are read for
/// `List` only; `limit == 0` selects the default page size. `payload_json`
/// may be null for `List`.
#[repr(C)]
pub struct FfiSyncRequest {
    pub method: FfiSyncMethod,
    pub item_id: i64,
    pub limit: u32,
    pub skip: u32,
    pub payload_json: *const c_char,
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request the host must execute.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub path: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: todo_sync::HttpRequest) -> *mut Self {
        let path = c_string(req.path);
        let body = match req.body {
            Some(b) => c_string(b),
            None => std::ptr::null_mut(),
        };

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: c_string(k),
                    value: c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            path,
            headers,
            headers_len,
            body,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this after executing an `FfiHttpRequest`. The
/// FFI layer reads but does not free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiFetchResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    UnsupportedOffline = 1,
    FetchFailed = 2,
    Transport = 3,
    InvalidResponse = 4,
    InvalidRequest = 5,
    Panic = 6,
    NullArg = 7,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiOrigin {
    Remote = 0,
    Local = 1,
}

impl From<Origin> for FfiOrigin {
    fn from(o: Origin) -> Self {
        match o {
            Origin::Remote => FfiOrigin::Remote,
            Origin::Local => FfiOrigin::Local,
        }
    }
}

/// Result envelope for a sync operation.
///
/// On success `error_code` is `Ok`, `error_message` is null and `data_json`
/// holds either a page (`{"todos":[...],...}`) or a single todo. On failure
/// `error_message` is set and `data_json` is null.
#[repr(C)]
pub struct FfiFetchResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub generation: u64,
    pub origin: FfiOrigin,
    pub data_json: *mut c_char,
}

impl FfiFetchResult {
    pub(crate) fn from_core(result: FetchResult) -> *mut Self {
        let generation = result.generation.0;
        let origin = result.origin.into();
        match result.outcome {
            Ok(data) => match serde_json::to_string(&data) {
                Ok(json) => Box::into_raw(Box::new(FfiFetchResult {
                    error_code: FfiErrorCode::Ok,
                    error_message: std::ptr::null_mut(),
                    http_status: 0,
                    generation,
                    origin,
                    data_json: c_string(json),
                })),
                Err(e) => Self::error(
                    FfiErrorCode::InvalidResponse,
                    &e.to_string(),
                    0,
                    generation,
                    origin,
                ),
            },
            Err(err) => {
                let (code, status) = match &err {
                    SyncError::UnsupportedOffline { .. } => (FfiErrorCode::UnsupportedOffline, 0),
                    SyncError::FetchFailed { status } => (FfiErrorCode::FetchFailed, *status),
                    SyncError::Transport(_) => (FfiErrorCode::Transport, 0),
                    SyncError::InvalidResponse(_) => (FfiErrorCode::InvalidResponse, 0),
                    SyncError::InvalidRequest(_) => (FfiErrorCode::InvalidRequest, 0),
                };
                Self::error(code, &err.to_string(), status, generation, origin)
            }
        }
    }

    pub(crate) fn error(
        error_code: FfiErrorCode,
        msg: &str,
        http_status: u16,
        generation: u64,
        origin: FfiOrigin,
    ) -> *mut Self {
        Box::into_raw(Box::new(FfiFetchResult {
            error_code,
            error_message: c_string(msg),
            http_status,
            generation,
            origin,
            data_json: std::ptr::null_mut(),
        }))
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::error(
            FfiErrorCode::NullArg,
            &format!("null argument: {name}"),
            0,
            0,
            FfiOrigin::Remote,
        )
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::error(FfiErrorCode::Panic, msg, 0, 0, FfiOrigin::Remote)
    }
}

/// Tells the host what to do with an `FfiSyncStep`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiStepKind {
    /// `result` is set; nothing to execute.
    Done = 0,
    /// Execute `request`, then pass `call` to `todo_sync_complete`.
    Remote = 1,
}

/// Outcome of `todo_sync_begin`.
///
/// `todo_free_step` releases `result` and `request` but not `call`, which
/// belongs to the host until it is completed or freed.
#[repr(C)]
pub struct FfiSyncStep {
    pub kind: FfiStepKind,
    pub generation: u64,
    pub result: *mut FfiFetchResult,
    pub request: *mut FfiHttpRequest,
    pub call: *mut FfiRemoteCall,
}

impl FfiSyncStep {
    pub(crate) fn done(result: FetchResult) -> *mut Self {
        let generation = result.generation.0;
        Box::into_raw(Box::new(FfiSyncStep {
            kind: FfiStepKind::Done,
            generation,
            result: FfiFetchResult::from_core(result),
            request: std::ptr::null_mut(),
            call: std::ptr::null_mut(),
        }))
    }

    pub(crate) fn done_with(result: *mut FfiFetchResult) -> *mut Self {
        Box::into_raw(Box::new(FfiSyncStep {
            kind: FfiStepKind::Done,
            generation: 0,
            result,
            request: std::ptr::null_mut(),
            call: std::ptr::null_mut(),
        }))
    }

    pub(crate) fn remote(call: RemoteCall) -> *mut Self {
        let generation = call.generation().0;
        let request = FfiHttpRequest::from_core(call.http().clone());
        Box::into_raw(Box::new(FfiSyncStep {
            kind: FfiStepKind::Remote,
            generation,
            result: std::ptr::null_mut(),
            request,
            call: Box::into_raw(Box::new(FfiRemoteCall { inner: call })),
        }))
    }
}
