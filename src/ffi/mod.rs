use std::os::raw::c_char;
use std::ffi::CString;
use crate::ffi::error::{FFIError, ErrorCode};
use serde::Serialize;
use tokio::runtime::Runtime;

pub mod error;
pub mod permission;

/// Run an async future to completion on a freshly-spun Tokio runtime.
pub fn block_on_async<F, T, E>(future: F) -> FFIResult<T>
where
    F: std::future::Future<Output = Result<T, E>>,
    E: Into<FFIError>,
{
    let rt = Runtime::new()
        .map_err(|e| FFIError::internal(format!("Failed to create Tokio runtime: {}", e)))?;
    rt.block_on(future).map_err(Into::into)
}

/// Handles results for FFI functions that return data, serializing Ok(T) or Err(FFIError) to JSON.
/// Returns a pointer to a C string (must be freed by the caller).
pub fn handle_json_result<F, T>(func: F) -> *mut c_char
where
    F: FnOnce() -> FFIResult<T>,
    T: Serialize,
{
    let json_string = match func() {
        Ok(value) => serde_json::to_string(&value),
        Err(ffi_error) => {
            log::debug!("[FFI] Returning error: {}", ffi_error);
            serde_json::to_string(&ffi_error)
        },
    };

    let final_json = match json_string {
        Ok(s) => s,
        Err(e) => {
            // The caller must always receive parseable JSON
            log::error!("[FFI] Serialization failed: {}", e);
            serde_json::json!({
                "code": ErrorCode::InternalError,
                "message": format!("Failed to serialize result: {}", e),
                "details": null,
            })
            .to_string()
        }
    };

    match CString::new(final_json) {
        Ok(c_string) => c_string.into_raw(),
        Err(e) => {
            log::error!("[FFI] Failed to create CString: {}", e);
            let error_json = serde_json::json!({
                "code": ErrorCode::InternalError,
                "message": format!("Failed to create CString: {}", e),
                "details": null,
            })
            .to_string();
            CString::new(error_json).map_or(std::ptr::null_mut(), |cs| cs.into_raw())
        }
    }
}

pub use error::FFIResult;
