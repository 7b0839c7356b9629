use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The two parties that sign off on a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Signer {
    /// The shipment recipient; signs out-of-band via a scanned code
    Customer,
    /// The operator; signs on-device
    Carrier,
}

impl fmt::Display for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signer::Customer => f.write_str("customer"),
            Signer::Carrier => f.write_str("carrier"),
        }
    }
}

/// One signature for one assignment.
///
/// Once `captured` is true no further submission is attempted for that
/// signer; a backend "already exists" conflict counts as capture, the same
/// as an initial success.
#[derive(Debug, Clone, Default)]
pub struct SignatureRecord {
    /// Whether the backend holds (or has confirmed) this signature
    pub captured: bool,
    /// Raw image bytes; only populated for the carrier's own capture
    pub payload: Option<Vec<u8>>,
    /// One submission at a time
    pub submission_in_flight: bool,
}

/// Customer-facing scannable signing code issued by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningCode {
    /// Base64-encoded code image for on-screen display
    pub image_data: String,
    /// When this code was issued
    pub requested_at: DateTime<Utc>,
}
