//! Translation of backend responses into typed outcomes.
//!
//! The backend discriminates several conditions only through the wording of
//! its error messages. Each such endpoint gets exactly one interpretation
//! function here, so a future move to proper error codes touches nothing
//! else.

use coldchain_core::{ChecklistOutcome, FinalizeAck, SignatureOutcome};
use coldchain_types::{ServiceError, ServiceResult};
use serde_json::Value;

/// Resubmitted incidents checklist
const ALREADY_RECORDED_MARKER: &str = "ya fue registrado";
/// Resubmitted carrier signature
const ALREADY_EXISTS_MARKER: &str = "ya existe";
/// Finalize rejected for a missing customer signature
const CUSTOMER_SIGNATURE_MARKER: &str = "firma del cliente";

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn is_client_error(status: u16) -> bool {
    (400..500).contains(&status)
}

fn mentions(message: &str, marker: &str) -> bool {
    message.to_lowercase().contains(marker)
}

/// Pull the human-readable message out of an error body. The backend uses
/// `error` on most endpoints and `mensaje` on a few.
pub(crate) fn backend_message(body: &Value) -> String {
    body.get("error")
        .and_then(Value::as_str)
        .or_else(|| body.get("mensaje").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

/// Classify a non-success response that carries no recognized conflict.
pub(crate) fn backend_error(status: u16, message: &str) -> ServiceError {
    let message = if message.is_empty() {
        format!("HTTP {status}")
    } else {
        message.to_string()
    };
    match status {
        401 | 403 => ServiceError::Authentication(message),
        404 => ServiceError::NotFound(message),
        _ => ServiceError::Backend { status, message },
    }
}

/// Map a transport-level failure onto the shared error taxonomy.
pub(crate) fn map_transport_error(error: reqwest::Error) -> ServiceError {
    if error.is_timeout() {
        ServiceError::Network("Request timed out".to_string())
    } else if error.is_connect() {
        ServiceError::Network(format!("Connection error: {error}"))
    } else if error.is_decode() {
        ServiceError::Serialization(error.to_string())
    } else {
        ServiceError::Network(error.to_string())
    }
}

/// The incidents checklist may legitimately have been recorded in a prior
/// session; the backend's conflict is success, not an error.
pub fn incidents_checklist_outcome(status: u16, message: &str) -> ServiceResult<ChecklistOutcome> {
    if is_success(status) {
        return Ok(ChecklistOutcome::Recorded);
    }
    if is_client_error(status) && mentions(message, ALREADY_RECORDED_MARKER) {
        return Ok(ChecklistOutcome::AlreadyRecorded);
    }
    Err(backend_error(status, message))
}

/// A carrier signature the backend already holds counts as stored: the UI
/// may retry after an ambiguous network failure that actually landed.
pub fn carrier_signature_outcome(status: u16, message: &str) -> ServiceResult<SignatureOutcome> {
    if is_success(status) {
        return Ok(SignatureOutcome::Stored);
    }
    if is_client_error(status) && mentions(message, ALREADY_EXISTS_MARKER) {
        return Ok(SignatureOutcome::AlreadyExists);
    }
    Err(backend_error(status, message))
}

/// A finalize rejection naming the customer signature is the backend's
/// authoritative "not signed yet", not a generic failure.
pub fn finalize_outcome(status: u16, message: &str) -> ServiceResult<FinalizeAck> {
    if is_success(status) {
        return Ok(FinalizeAck::Completed);
    }
    if is_client_error(status) && mentions(message, CUSTOMER_SIGNATURE_MARKER) {
        return Ok(FinalizeAck::CustomerSignatureMissing);
    }
    Err(backend_error(status, message))
}
