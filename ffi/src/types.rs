//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! enums with explicit discriminants. Conversion functions live here to keep
//! `lib.rs` focused on the `extern "C"` surface.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use featureservice_core::{HttpMethod, ResponseData, ServiceError};

/// Opaque handle to a `FeatureServiceClient`. C callers receive a pointer to
/// this and pass it back into every FFI function.
pub struct FfiFeatureServiceClient {
    pub(crate) inner: featureservice_core::FeatureServiceClient,
}

/// Completion callback: `(error, data, user_data)`.
///
/// `error` is null on success, otherwise a message (or, for errors reported
/// by the service, the JSON text of its `error` value). `data` is the JSON
/// text of the parsed body, the raw body when it was not JSON, or null.
/// Both strings are only valid for the duration of the call.
pub type FfiCompletionCallback =
    extern "C" fn(error: *const c_char, data: *const c_char, user_data: *mut c_void);

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `fs_build_*` functions. The C caller executes the request and
/// hands the outcome to `fs_complete`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    /// Returns null if any string contains an interior NUL.
    pub(crate) fn from_core(req: featureservice_core::HttpRequest) -> *mut Self {
        let Some(url) = to_c_string(req.url) else {
            return std::ptr::null_mut();
        };
        let body = match req.body {
            Some(b) => match to_c_string(b) {
                Some(b) => b,
                None => {
                    free_c_string(url);
                    return std::ptr::null_mut();
                }
            },
            None => std::ptr::null_mut(),
        };

        let mut ffi_headers: Vec<FfiHeader> = Vec::with_capacity(req.headers.len());
        for (k, v) in req.headers {
            match (to_c_string(k), to_c_string(v)) {
                (Some(key), Some(value)) => ffi_headers.push(FfiHeader { key, value }),
                (key, value) => {
                    key.into_iter().chain(value).for_each(free_c_string);
                    for header in &ffi_headers {
                        free_c_string(header.key);
                        free_c_string(header.value);
                    }
                    free_c_string(url);
                    free_c_string(body);
                    return std::ptr::null_mut();
                }
            }
        }

        let headers_len = ffi_headers.len() as u32;
        let headers = if ffi_headers.is_empty() {
            std::ptr::null_mut()
        } else {
            Box::into_raw(ffi_headers.into_boxed_slice()) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url,
            headers,
            headers_len,
            body,
        }))
    }
}

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

/// Status returned by `fs_complete`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiStatus {
    /// The callback was invoked.
    Ok = 0,
    /// A required argument was null; the callback was not invoked.
    NullArg = 1,
    /// A panic was caught; the callback may not have been invoked.
    Panic = 2,
}

// ---------------------------------------------------------------------------
// Completion rendering
// ---------------------------------------------------------------------------

/// Render a completion's error for C. Service-reported string errors pass
/// through verbatim; other service errors become their JSON text.
pub(crate) fn error_text(error: &ServiceError) -> String {
    match error {
        ServiceError::Api(serde_json::Value::String(s)) => s.clone(),
        ServiceError::Api(value) => value.to_string(),
        other => other.to_string(),
    }
}

pub(crate) fn data_text(data: &ResponseData) -> String {
    match data {
        ResponseData::Json(value) => value.to_string(),
        ResponseData::Raw(body) => body.clone(),
    }
}

/// Lossy conversion used for callback arguments: interior NULs are dropped
/// rather than failing the whole completion.
pub(crate) fn lossy_c_string(s: String) -> CString {
    CString::new(s).unwrap_or_else(|e| {
        let mut bytes = e.into_vec();
        bytes.retain(|b| *b != 0);
        CString::new(bytes).unwrap_or_default()
    })
}

pub(crate) fn to_c_string(s: String) -> Option<*mut c_char> {
    CString::new(s).ok().map(CString::into_raw)
}

pub(crate) fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}
