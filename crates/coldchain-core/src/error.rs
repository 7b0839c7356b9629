use coldchain_types::{AssignmentState, ChecklistKind, ServiceError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// A checklist still has unanswered questions; no network call was made
    #[error("Checklist incomplete: the {0} checklist still has unanswered questions")]
    ChecklistIncomplete(ChecklistKind),

    /// The question key is not part of the checklist's fixed set
    #[error("Unknown checklist question: {0}")]
    UnknownQuestion(String),

    /// The capture surface reported no strokes
    #[error("Empty signature: nothing was drawn on the capture surface")]
    EmptySignature,

    /// Clearing or restaging a confirmed signature is not supported
    #[error("Signature already captured")]
    SignatureAlreadyCaptured,

    /// A signature submission is already in flight for this signer
    #[error("Signature submission already in flight")]
    SubmissionInFlight,

    /// Another state transition is already in flight
    #[error("Another transition is already in flight")]
    OperationInFlight,

    /// The assignment's current state does not allow the requested action
    #[error("Cannot {action} while the assignment is \"{from}\"")]
    InvalidTransition {
        from: AssignmentState,
        action: &'static str,
    },

    /// Remote call failure; retried at the operator's discretion
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Result type alias using DeliveryError
pub type DeliveryResult<T> = Result<T, DeliveryError>;
