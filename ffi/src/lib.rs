//! C-ABI wrapper around `featureservice-core`.
//!
//! # Overview
//! Exposes the feature service client through `extern "C"` functions so any
//! language with a C FFI can build requests and normalize responses without
//! linking to Rust's async runtime or serde directly. The host performs the
//! HTTP round-trip itself.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Parameters and configs cross as JSON text.
//! - `fs_complete` delivers the normalized `(error, data)` pair through a C
//!   callback exactly once per call.
//! - The C caller owns all returned pointers and must call the matching
//!   `fs_free_*` function to release them.

pub mod types;

use std::borrow::Cow;
use std::ffi::{c_void, CStr};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use featureservice_core::{normalize_parts, ClientConfig, FeatureServiceClient, HttpRequest, Parameters};

use types::*;

/// Read a nullable C string. Null and invalid UTF-8 both read as `None`.
unsafe fn read_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        None
    } else {
        unsafe { CStr::from_ptr(s) }.to_str().ok()
    }
}

/// Read a nullable C string, replacing invalid UTF-8 with U+FFFD.
unsafe fn read_lossy<'a>(s: *const c_char) -> Option<Cow<'a, str>> {
    if s.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(s) }.to_string_lossy())
    }
}

fn notify(callback: FfiCompletionCallback, user_data: *mut c_void, error: Option<String>, data: Option<String>) {
    let error = error.map(lossy_c_string);
    let data = data.map(lossy_c_string);
    callback(
        error.as_ref().map_or(std::ptr::null(), |e| e.as_ptr()),
        data.as_ref().map_or(std::ptr::null(), |d| d.as_ptr()),
        user_data,
    );
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client from a JSON config such as
/// `{"url": "..."}` or `{"catalog": "...", "service": "...", "type": "FeatureServer", "layer": 0}`.
///
/// Returns null if the config is null, not valid JSON, or does not identify
/// a feature service. In the last two cases `on_error` (if given) is invoked
/// once with the error message and a null data pointer. No network activity
/// happens here; use `fs_build_info` for the initial service request.
/// The caller must free the returned pointer with `fs_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn fs_client_new(
    config_json: *const c_char,
    on_error: Option<FfiCompletionCallback>,
    user_data: *mut c_void,
) -> *mut FfiFeatureServiceClient {
    let user_data = AssertUnwindSafe(user_data);
    catch_unwind(|| {
        let Some(raw) = (unsafe { read_str(config_json) }) else {
            return std::ptr::null_mut();
        };
        let built = serde_json::from_str::<ClientConfig>(raw)
            .map_err(|e| format!("invalid client config: {e}"))
            .and_then(|config| FeatureServiceClient::new(&config).map_err(|e| e.to_string()));
        match built {
            Ok(inner) => Box::into_raw(Box::new(FfiFeatureServiceClient { inner })),
            Err(message) => {
                if let Some(callback) = on_error {
                    notify(callback, *user_data, Some(message), None);
                }
                std::ptr::null_mut()
            }
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `fs_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fs_client_free(client: *mut FfiFeatureServiceClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

/// The client's base URL. Free the result with `fs_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn fs_client_base_url(client: *const FfiFeatureServiceClient) -> *mut c_char {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        to_c_string(client.inner.base_url().to_string()).unwrap_or(std::ptr::null_mut())
    })
    .unwrap_or(std::ptr::null_mut())
}

/// JSON text of the most recent query-style parameter mapping, or null if
/// there has been none. Free the result with `fs_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn fs_client_last_query(client: *const FfiFeatureServiceClient) -> *mut c_char {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        client
            .inner
            .last_query()
            .and_then(|params| serde_json::to_string(&params).ok())
            .and_then(to_c_string)
            .unwrap_or(std::ptr::null_mut())
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Build request functions
// ---------------------------------------------------------------------------

/// Shared body of the `fs_build_*` functions that take a parameter mapping.
/// A null `params_json` means an empty mapping.
fn build_with(
    client: *const FfiFeatureServiceClient,
    params_json: *const c_char,
    build: fn(&FeatureServiceClient, &Parameters) -> HttpRequest,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let params = if params_json.is_null() {
            Parameters::new()
        } else {
            match unsafe { read_str(params_json) }.map(serde_json::from_str::<Parameters>) {
                Some(Ok(params)) => params,
                _ => return std::ptr::null_mut(),
            }
        };
        FfiHttpRequest::from_core(build(&client.inner, &params))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build the GET request describing the service or layer itself.
///
/// Returns null if `client` is null.
/// The caller must free the returned pointer with `fs_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn fs_build_info(client: *const FfiFeatureServiceClient) -> *mut FfiHttpRequest {
    build_with(client, std::ptr::null(), |c, _| c.build_info())
}

/// Build a `query` request. A `"method"` entry selects GET or POST.
///
/// Returns null if `client` is null or `params_json` is not a JSON object.
#[unsafe(no_mangle)]
pub extern "C" fn fs_build_query(
    client: *const FfiFeatureServiceClient,
    params_json: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, params_json, FeatureServiceClient::build_query)
}

/// Build a count-only `query` request.
#[unsafe(no_mangle)]
pub extern "C" fn fs_build_count(
    client: *const FfiFeatureServiceClient,
    params_json: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, params_json, FeatureServiceClient::build_count)
}

/// Build an ids-only `query` request.
#[unsafe(no_mangle)]
pub extern "C" fn fs_build_ids(
    client: *const FfiFeatureServiceClient,
    params_json: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, params_json, FeatureServiceClient::build_ids)
}

/// Build an `addFeatures` POST.
#[unsafe(no_mangle)]
pub extern "C" fn fs_build_add(
    client: *const FfiFeatureServiceClient,
    params_json: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, params_json, FeatureServiceClient::build_add)
}

/// Build an `updateFeatures` POST.
#[unsafe(no_mangle)]
pub extern "C" fn fs_build_update(
    client: *const FfiFeatureServiceClient,
    params_json: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, params_json, FeatureServiceClient::build_update)
}

/// Build a `deleteFeatures` POST.
#[unsafe(no_mangle)]
pub extern "C" fn fs_build_remove(
    client: *const FfiFeatureServiceClient,
    params_json: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, params_json, FeatureServiceClient::build_remove)
}

/// Build an `applyEdits` POST.
#[unsafe(no_mangle)]
pub extern "C" fn fs_build_edit(
    client: *const FfiFeatureServiceClient,
    params_json: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, params_json, FeatureServiceClient::build_edit)
}

/// Build a `queryRelatedRecords` request. A `"method"` entry selects GET or
/// POST.
#[unsafe(no_mangle)]
pub extern "C" fn fs_build_query_related_records(
    client: *const FfiFeatureServiceClient,
    params_json: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, params_json, FeatureServiceClient::build_query_related_records)
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// Normalize the outcome of an executed request and invoke `callback` once.
///
/// `transport_error` is the host's transport failure message, or null.
/// `body` is the response body, or null if no response arrived. Invalid
/// UTF-8 in either is replaced rather than dropped.
/// Returns `NullArg` (without invoking the callback) if `callback` is null.
#[unsafe(no_mangle)]
pub extern "C" fn fs_complete(
    transport_error: *const c_char,
    body: *const c_char,
    callback: Option<FfiCompletionCallback>,
    user_data: *mut c_void,
) -> FfiStatus {
    let Some(callback) = callback else {
        return FfiStatus::NullArg;
    };
    let user_data = AssertUnwindSafe(user_data);
    catch_unwind(|| {
        let transport_error = unsafe { read_lossy(transport_error) };
        let body = unsafe { read_lossy(body) };
        let completion = normalize_parts(transport_error.as_deref(), body.as_deref());
        notify(
            callback,
            *user_data,
            completion.error.as_ref().map(error_text),
            completion.data.as_ref().map(data_text),
        );
        FfiStatus::Ok
    })
    .unwrap_or(FfiStatus::Panic)
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free a request returned by an `fs_build_*` function. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fs_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.url);
        free_c_string(req.body);
        if !req.headers.is_null() {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    req.headers,
                    req.headers_len as usize,
                ))
            };
            for header in headers.iter() {
                free_c_string(header.key);
                free_c_string(header.value);
            }
        }
    });
}

/// Free a string returned by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fs_free_string(s: *mut c_char) {
    let _ = catch_unwind(|| free_c_string(s));
}
