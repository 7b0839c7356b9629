use async_trait::async_trait;
use coldchain_types::{Assignment, Checklist, ServiceResult, Session, SigningCode};

/// Outcome of submitting the incidents checklist.
///
/// The backend answers a resubmission with a conflict; the conflict is
/// folded into `AlreadyRecorded` here so callers never see it as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecklistOutcome {
    Recorded,
    AlreadyRecorded,
}

/// Outcome of submitting the carrier signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureOutcome {
    Stored,
    AlreadyExists,
}

/// Backend acknowledgement of a finalize request.
///
/// `CustomerSignatureMissing` is the backend's authoritative rejection when
/// it holds no customer signature, however the local view got there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeAck {
    Completed,
    CustomerSignatureMissing,
}

/// Remote contract the delivery workflow depends on, one method per
/// backend call. Implemented over HTTP by `coldchain-remote` and in memory
/// by [`crate::memory::MemoryDeliveryService`] for tests.
#[async_trait]
pub trait DeliveryService: Send + Sync {
    /// Fetch the current assignment record. `ServiceError::NotFound` when
    /// the id is not in the carrier's assignment list.
    async fn fetch_assignment(&self, session: &Session, assignment_id: u64) -> ServiceResult<Assignment>;

    /// Persist the pre-trip conditions checklist.
    async fn submit_conditions_checklist(
        &self,
        session: &Session,
        assignment_id: u64,
        checklist: &Checklist,
    ) -> ServiceResult<()>;

    /// Request the pending → in-transit transition.
    async fn start_trip(&self, session: &Session, assignment_id: u64) -> ServiceResult<()>;

    /// Persist the post-trip incidents checklist.
    async fn submit_incidents_checklist(
        &self,
        session: &Session,
        assignment_id: u64,
        checklist: &Checklist,
    ) -> ServiceResult<ChecklistOutcome>;

    /// Obtain a customer-facing scannable signing code. Issuing the code is
    /// also what lets the backend accept a customer signature, and it is
    /// re-requestable without further side effects.
    async fn request_signing_code(&self, session: &Session, assignment_id: u64) -> ServiceResult<SigningCode>;

    /// Whether the backend holds a customer signature for the assignment.
    async fn customer_signature_present(&self, session: &Session, assignment_id: u64) -> ServiceResult<bool>;

    /// Persist the carrier's signature image.
    async fn submit_carrier_signature(
        &self,
        session: &Session,
        assignment_id: u64,
        payload: &[u8],
    ) -> ServiceResult<SignatureOutcome>;

    /// Whether the backend holds a carrier signature for the assignment.
    async fn carrier_signature_present(&self, session: &Session, assignment_id: u64) -> ServiceResult<bool>;

    /// Request the in-transit → delivered transition.
    async fn finalize(&self, session: &Session, assignment_id: u64) -> ServiceResult<FinalizeAck>;
}
