// src/ffi/permission.rs
// ============================================================================
// FFI bindings for the section permission model.
// Every function takes one JSON payload and returns one JSON string. On failure
// the returned JSON is a serialized `FFIError` ({"code", "message", "details"}).
//
// Memory ownership:
//   * Strings returned from Rust must be released with `permission_free`.
//   * Payload pointers must be valid NUL-terminated UTF-8; NULL or malformed
//     input yields an error JSON instead of a crash.
//
// The editor holds no state on the Rust side between calls. The caller keeps
// `persisted` (last stored value) and `value` (current edits) and passes both
// back in; every editor call answers with a fresh snapshot.
// ----------------------------------------------------------------------------

use crate::auth::AuthContext;
use crate::domains::permission::codec::{decode, PermissionVector};
use crate::domains::permission::editor::{EditorPart, EditorStatus, PermissionEditor};
use crate::domains::permission::navigation::{build_navigation, NavigationView};
use crate::domains::permission::registry::Part;
use crate::domains::permission::visibility::{NavigationState, VisibilityEvaluator};
use crate::domains::report::types::NavigationRequest;
use crate::ffi::error::{ErrorCode, FFIError, FFIResult};
use crate::ffi::{block_on_async, handle_json_result};
use crate::globals;
use crate::types::{ReportRole, UserRole};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helper utilities
// ---------------------------------------------------------------------------

/// Read and deserialize a JSON payload coming from the host
unsafe fn parse_payload<T: DeserializeOwned>(payload_json: *const c_char) -> FFIResult<T> {
    if payload_json.is_null() {
        return Err(FFIError::new(ErrorCode::NullPointer, "null pointer"));
    }
    let json = unsafe { CStr::from_ptr(payload_json) }
        .to_str()
        .map_err(|_| FFIError::new(ErrorCode::InvalidUtf8, "payload is not valid UTF-8"))?;
    serde_json::from_str(json).map_err(|e| FFIError::invalid_argument(&format!("json {e}")))
}

/// DTO mirroring the subset of `AuthContext` that we expect to receive from the host
#[derive(Deserialize)]
struct AuthCtxDto {
    user_id: String,
    role: String,
    device_id: String,
    offline_mode: bool,
}

impl TryFrom<AuthCtxDto> for AuthContext {
    type Error = FFIError;

    fn try_from(value: AuthCtxDto) -> Result<Self, Self::Error> {
        Ok(AuthContext::new(
            Uuid::parse_str(&value.user_id)
                .map_err(|_| FFIError::invalid_argument("invalid user_id"))?,
            UserRole::from_str(&value.role)
                .ok_or_else(|| FFIError::invalid_argument("invalid role"))?,
            value.device_id,
            value.offline_mode || globals::is_offline_mode(),
        ))
    }
}

fn parse_report_id(report_id: &str) -> FFIResult<Uuid> {
    Uuid::parse_str(report_id).map_err(|_| FFIError::invalid_argument("invalid report_id"))
}

fn parse_part(number: u8) -> FFIResult<Part> {
    Part::from_number(number).ok_or_else(|| FFIError::invalid_argument(&format!("invalid part {number}")))
}

/// Editor state as handed back to the host
#[derive(Serialize)]
struct EditorSnapshot {
    report_id: Uuid,
    persisted: i64,
    value: i64,
    status: EditorStatus,
    parts: Vec<EditorPart>,
}

impl From<&PermissionEditor> for EditorSnapshot {
    fn from(editor: &PermissionEditor) -> Self {
        Self {
            report_id: editor.report_id(),
            persisted: editor.persisted().encode(),
            value: editor.encoded(),
            status: editor.status(),
            parts: editor.tree(),
        }
    }
}

/// Editor state carried by the host between calls
#[derive(Deserialize)]
struct EditorStateDto {
    report_id: String,
    persisted: i64,
    value: i64,
}

impl EditorStateDto {
    fn into_editor(self) -> FFIResult<PermissionEditor> {
        let report_id = parse_report_id(&self.report_id)?;
        Ok(PermissionEditor::resume(report_id, self.persisted, self.value)?)
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct DecodedPermissions {
    value: i64,
    bits: PermissionVector,
    granted_sections: Vec<&'static str>,
}

/// Decode a stored permission integer
/// Expected JSON payload: { "value": 2097152 }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn permission_decode(payload_json: *const c_char) -> *mut c_char {
    handle_json_result(|| {
        #[derive(Deserialize)]
        struct Payload {
            value: i64,
        }

        let p: Payload = unsafe { parse_payload(payload_json) }?;
        let bits = decode(p.value)?;
        Ok(DecodedPermissions {
            value: p.value,
            bits,
            granted_sections: bits.granted_section_ids(),
        })
    })
}

/// Encode a permission vector, given either as 31 booleans or as granted section ids
/// Expected JSON payload: { "bits": [true, false, ...] } or { "sections": ["cover", ...] }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn permission_encode(payload_json: *const c_char) -> *mut c_char {
    handle_json_result(|| {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Payload {
            Bits { bits: PermissionVector },
            Sections { sections: Vec<String> },
        }

        #[derive(Serialize)]
        struct Encoded {
            value: i64,
        }

        let vector = match unsafe { parse_payload::<Payload>(payload_json) }? {
            Payload::Bits { bits } => bits,
            Payload::Sections { sections } => PermissionVector::from_section_ids(&sections)?,
        };
        Ok(Encoded { value: vector.encode() })
    })
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// Navigation view for an already known role and permission value
/// Expected JSON payload:
/// {
///   "role": "manager" | "consultant" | "external_advisor",
///   "permissions": 2097152,
///   "read_only": false,
///   "current": { "part": 1, "section": "mission" }   // optional
/// }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn permission_navigation(payload_json: *const c_char) -> *mut c_char {
    handle_json_result(|| {
        #[derive(Deserialize)]
        struct Payload {
            role: ReportRole,
            permissions: i64,
            #[serde(default)]
            read_only: bool,
            current: Option<NavigationRequest>,
        }

        let p: Payload = unsafe { parse_payload(payload_json) }?;
        let vector = decode(p.permissions)?;
        let evaluator = VisibilityEvaluator::new(p.role, vector, p.read_only);
        let current = p.current.and_then(NavigationRequest::into_state);
        Ok::<NavigationView, FFIError>(build_navigation(&evaluator, current.as_ref()))
    })
}

/// Navigation view of a stored report for the calling user
/// Expected JSON payload:
/// {
///   "report_id": "uuid",
///   "current": { "part": 1, "section": "mission" },   // optional
///   "auth": { AuthCtxDto }
/// }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn permission_report_navigation(payload_json: *const c_char) -> *mut c_char {
    handle_json_result(|| {
        #[derive(Deserialize)]
        struct Payload {
            report_id: String,
            current: Option<NavigationRequest>,
            auth: AuthCtxDto,
        }

        let p: Payload = unsafe { parse_payload(payload_json) }?;
        let report_id = parse_report_id(&p.report_id)?;
        let auth: AuthContext = p.auth.try_into()?;
        let current: Option<NavigationState> = p.current.and_then(NavigationRequest::into_state);
        let svc = globals::get_report_permission_service()?;
        block_on_async(svc.get_navigation(report_id, current, &auth))
    })
}

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

/// Open the editor on a stored report (managers only)
/// Expected JSON payload: { "report_id": "uuid", "auth": { AuthCtxDto } }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn permission_editor_open(payload_json: *const c_char) -> *mut c_char {
    handle_json_result(|| {
        #[derive(Deserialize)]
        struct Payload {
            report_id: String,
            auth: AuthCtxDto,
        }

        let p: Payload = unsafe { parse_payload(payload_json) }?;
        let report_id = parse_report_id(&p.report_id)?;
        let auth: AuthContext = p.auth.try_into()?;
        let svc = globals::get_report_permission_service()?;
        let editor = block_on_async(svc.open_editor(report_id, &auth))?;
        Ok(EditorSnapshot::from(&editor))
    })
}

/// Checkable tree for the given editor state
/// Expected JSON payload: { "report_id": "uuid", "persisted": 0, "value": 3 }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn permission_editor_snapshot(payload_json: *const c_char) -> *mut c_char {
    handle_json_result(|| {
        let state: EditorStateDto = unsafe { parse_payload(payload_json) }?;
        let editor = state.into_editor()?;
        Ok(EditorSnapshot::from(&editor))
    })
}

/// Toggle a whole part
/// Expected JSON payload: { "report_id": "uuid", "persisted": 0, "value": 3, "part": 2 }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn permission_editor_toggle_part(payload_json: *const c_char) -> *mut c_char {
    handle_json_result(|| {
        #[derive(Deserialize)]
        struct Payload {
            #[serde(flatten)]
            state: EditorStateDto,
            part: u8,
        }

        let p: Payload = unsafe { parse_payload(payload_json) }?;
        let part = parse_part(p.part)?;
        let mut editor = p.state.into_editor()?;
        editor.toggle_part(part);
        Ok(EditorSnapshot::from(&editor))
    })
}

/// Toggle one section
/// Expected JSON payload: { "report_id": "uuid", "persisted": 0, "value": 3, "section": "cover" }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn permission_editor_toggle_section(payload_json: *const c_char) -> *mut c_char {
    handle_json_result(|| {
        #[derive(Deserialize)]
        struct Payload {
            #[serde(flatten)]
            state: EditorStateDto,
            section: String,
        }

        let p: Payload = unsafe { parse_payload(payload_json) }?;
        let mut editor = p.state.into_editor()?;
        editor.toggle_section(&p.section)?;
        Ok(EditorSnapshot::from(&editor))
    })
}

#[derive(Serialize)]
struct SaveOutcome {
    snapshot: EditorSnapshot,
    /// Present when the write failed; `snapshot` then shows the restored value
    error: Option<FFIError>,
}

/// Persist the edited value
/// Expected JSON payload:
/// { "report_id": "uuid", "persisted": 0, "value": 3, "auth": { AuthCtxDto } }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn permission_save(payload_json: *const c_char) -> *mut c_char {
    handle_json_result(|| {
        #[derive(Deserialize)]
        struct Payload {
            #[serde(flatten)]
            state: EditorStateDto,
            auth: AuthCtxDto,
        }

        let p: Payload = unsafe { parse_payload(payload_json) }?;
        let auth: AuthContext = p.auth.try_into()?;
        let mut editor = p.state.into_editor()?;
        let svc = globals::get_report_permission_service_impl()?;

        let result = block_on_async(async { editor.save(svc.as_ref(), &auth).await });
        Ok(SaveOutcome {
            snapshot: EditorSnapshot::from(&editor),
            error: result.err(),
        })
    })
}

/// Free a string returned by any function in this module
#[unsafe(no_mangle)]
pub unsafe extern "C" fn permission_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn call(f: unsafe extern "C" fn(*const c_char) -> *mut c_char, payload: &str) -> Value {
        let input = CString::new(payload).unwrap();
        unsafe {
            let out = f(input.as_ptr());
            let json = CStr::from_ptr(out).to_str().unwrap().to_string();
            permission_free(out);
            serde_json::from_str(&json).unwrap()
        }
    }

    #[test]
    fn test_decode_and_encode() {
        let decoded = call(permission_decode, r#"{"value": 2097152}"#);
        assert_eq!(decoded["granted_sections"], serde_json::json!(["cover"]));
        assert_eq!(decoded["bits"].as_array().unwrap().len(), 31);

        let encoded = call(permission_encode, r#"{"sections": ["company-profile", "cover"]}"#);
        assert_eq!(encoded["value"], 1 + (1 << 21));

        let err = call(permission_decode, r#"{"value": -1}"#);
        assert_eq!(err["code"], "InvalidPermissionValue");

        let err = call(permission_encode, r#"{"sections": ["nope"]}"#);
        assert_eq!(err["code"], "UnknownSection");
    }

    #[test]
    fn test_navigation_repairs_selection() {
        let view = call(
            permission_navigation,
            r#"{"role": "external_advisor", "permissions": 2097152, "current": {"part": 1, "section": "mission"}}"#,
        );
        assert_eq!(view["active"]["kind"], "selected");
        assert_eq!(view["active"]["selection"]["section"], "cover");

        let view = call(permission_navigation, r#"{"role": "external_advisor", "permissions": 0}"#);
        assert_eq!(view["active"]["kind"], "no_accessible_content");

        let err = call(permission_navigation, r#"{"role": "manager", "permissions": 2147483648}"#);
        assert_eq!(err["code"], "InvalidPermissionValue");
        let err = call(permission_navigation, r#"{"role": "external_advisor", "permissions": -1}"#);
        assert_eq!(err["code"], "InvalidPermissionValue");

        let view = call(
            permission_navigation,
            r#"{"role": "manager", "permissions": 0, "current": {"part": 2, "section": "diagnostic", "subsection": "risks"}}"#,
        );
        assert_eq!(view["active"]["selection"]["section"], "diagnostic");
        assert_eq!(view["active"]["selection"]["subsection"], "risks");
    }

    #[test]
    fn test_editor_toggles() {
        let id = Uuid::new_v4();
        let snapshot = call(
            permission_editor_toggle_part,
            &format!(r#"{{"report_id": "{id}", "persisted": 0, "value": 0, "part": 1}}"#),
        );
        assert_eq!(snapshot["value"], 0b11111);
        assert_eq!(snapshot["status"], "dirty");
        assert_eq!(snapshot["parts"][0]["state"], "checked");

        let snapshot = call(
            permission_editor_toggle_section,
            &format!(r#"{{"report_id": "{id}", "persisted": 0, "value": 31, "section": "values"}}"#),
        );
        assert_eq!(snapshot["value"], 0b11011);
        assert_eq!(snapshot["parts"][0]["state"], "indeterminate");

        let err = call(
            permission_editor_toggle_section,
            &format!(r#"{{"report_id": "{id}", "persisted": 0, "value": 0, "section": "publish"}}"#),
        );
        assert_eq!(err["code"], "ValidationFailed");
    }

    #[test]
    fn test_bad_payloads() {
        let err = call(permission_editor_snapshot, "not json");
        assert_eq!(err["code"], "InvalidArgument");

        let out = unsafe { permission_decode(std::ptr::null()) };
        let json: Value = unsafe { serde_json::from_str(CStr::from_ptr(out).to_str().unwrap()).unwrap() };
        unsafe { permission_free(out) };
        assert_eq!(json["code"], "NullPointer");
    }
}
