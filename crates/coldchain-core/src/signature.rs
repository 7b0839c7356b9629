use std::sync::Arc;

use coldchain_types::{Assignment, Session, SignatureRecord, Signer, SigningCode};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{DeliveryError, DeliveryResult};
use crate::service::{DeliveryService, SignatureOutcome};

/// Owns the two signature sub-processes for one assignment.
///
/// The customer record is confirmed out-of-band: the polling engine holds a
/// handle on it and marks it captured when the backend reports the
/// signature. The carrier record is captured on-device and submitted
/// synchronously, with a single-submission guard.
pub struct SignatureCoordinator {
    customer: Arc<RwLock<SignatureRecord>>,
    carrier: Arc<RwLock<SignatureRecord>>,
}

impl SignatureCoordinator {
    pub fn new() -> Self {
        Self {
            customer: Arc::new(RwLock::new(SignatureRecord::default())),
            carrier: Arc::new(RwLock::new(SignatureRecord::default())),
        }
    }

    /// Shared handle on the customer record, for the polling engine.
    pub fn customer_record(&self) -> Arc<RwLock<SignatureRecord>> {
        Arc::clone(&self.customer)
    }

    pub async fn customer_captured(&self) -> bool {
        self.customer.read().await.captured
    }

    pub async fn carrier_captured(&self) -> bool {
        self.carrier.read().await.captured
    }

    /// Seed both records from a fetched snapshot. A signature the backend
    /// already holds is a capture, not something to resubmit.
    pub async fn adopt_remote_state(&self, assignment: &Assignment) {
        if assignment.customer_signed {
            self.customer.write().await.captured = true;
        }
        if assignment.carrier_signed {
            self.carrier.write().await.captured = true;
        }
    }

    pub async fn mark_carrier_captured(&self) {
        self.carrier.write().await.captured = true;
    }

    /// The backend authoritatively reported no customer signature; drop the
    /// stale local view so the gate asks for it again.
    pub async fn mark_customer_uncaptured(&self) {
        self.customer.write().await.captured = false;
    }

    /// Obtain a fresh customer-facing signing code.
    pub async fn request_code<S: DeliveryService>(
        &self,
        service: &S,
        session: &Session,
        assignment_id: u64,
    ) -> DeliveryResult<SigningCode> {
        let code = service.request_signing_code(session, assignment_id).await?;
        info!(assignment = assignment_id, signer = %Signer::Customer, "signing code issued");
        Ok(code)
    }

    /// Stage the carrier's drawn signature for submission.
    pub async fn stage_carrier_payload(&self, payload: Vec<u8>) -> DeliveryResult<()> {
        if payload.is_empty() {
            return Err(DeliveryError::EmptySignature);
        }
        let mut record = self.carrier.write().await;
        if record.captured {
            return Err(DeliveryError::SignatureAlreadyCaptured);
        }
        record.payload = Some(payload);
        Ok(())
    }

    /// Reset the capture surface. Not available once the signature is
    /// confirmed.
    pub async fn clear_carrier_payload(&self) -> DeliveryResult<()> {
        let mut record = self.carrier.write().await;
        if record.captured {
            return Err(DeliveryError::SignatureAlreadyCaptured);
        }
        record.payload = None;
        Ok(())
    }

    /// Submit the staged carrier signature. A backend "already exists"
    /// conflict marks the record captured exactly like a first-time store:
    /// the UI may retry after an ambiguous network failure that actually
    /// succeeded server-side.
    pub async fn submit_carrier<S: DeliveryService>(
        &self,
        service: &S,
        session: &Session,
        assignment_id: u64,
    ) -> DeliveryResult<()> {
        let payload = {
            let mut record = self.carrier.write().await;
            if record.captured {
                debug!(assignment = assignment_id, signer = %Signer::Carrier, "signature already captured, nothing to submit");
                return Ok(());
            }
            if record.submission_in_flight {
                return Err(DeliveryError::SubmissionInFlight);
            }
            let payload = record.payload.clone().ok_or(DeliveryError::EmptySignature)?;
            record.submission_in_flight = true;
            payload
        };

        let outcome = service.submit_carrier_signature(session, assignment_id, &payload).await;

        let mut record = self.carrier.write().await;
        record.submission_in_flight = false;
        match outcome {
            Ok(SignatureOutcome::Stored) => {
                record.captured = true;
                info!(assignment = assignment_id, signer = %Signer::Carrier, "signature stored");
                Ok(())
            }
            Ok(SignatureOutcome::AlreadyExists) => {
                record.captured = true;
                info!(assignment = assignment_id, signer = %Signer::Carrier, "signature already on record, treating as success");
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }
}

impl Default for SignatureCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::memory::{sample_assignment, MemoryDeliveryService};
    use coldchain_types::AssignmentState;

    fn service() -> MemoryDeliveryService {
        MemoryDeliveryService::with_assignment(sample_assignment(5, AssignmentState::InTransit))
    }

    #[tokio::test]
    async fn test_empty_payload_is_rejected() {
        let coordinator = SignatureCoordinator::new();
        assert_eq!(
            coordinator.stage_carrier_payload(Vec::new()).await,
            Err(DeliveryError::EmptySignature)
        );
    }

    #[tokio::test]
    async fn test_submit_without_staged_payload_is_rejected() {
        let service = service();
        let coordinator = SignatureCoordinator::new();
        let session = Session::new("tok");

        let result = coordinator.submit_carrier(&service, &session, 5).await;
        assert_eq!(result, Err(DeliveryError::EmptySignature));
        assert_eq!(service.calls("carrier_signature_submit"), 0);
    }

    #[tokio::test]
    async fn test_submit_marks_captured_and_second_submit_is_a_no_op() {
        let service = service();
        let coordinator = SignatureCoordinator::new();
        let session = Session::new("tok");

        coordinator.stage_carrier_payload(vec![1, 2, 3]).await.unwrap();
        coordinator.submit_carrier(&service, &session, 5).await.unwrap();
        assert!(coordinator.carrier_captured().await);

        coordinator.submit_carrier(&service, &session, 5).await.unwrap();
        assert_eq!(service.calls("carrier_signature_submit"), 1);
        assert_eq!(service.carrier_signature(), Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_already_exists_conflict_counts_as_capture() {
        let service = service();
        service.seed_carrier_signature(vec![9, 9]);
        let coordinator = SignatureCoordinator::new();
        let session = Session::new("tok");

        coordinator.stage_carrier_payload(vec![1]).await.unwrap();
        coordinator.submit_carrier(&service, &session, 5).await.unwrap();

        assert!(coordinator.carrier_captured().await);
        // the original payload on the backend is untouched
        assert_eq!(service.carrier_signature(), Some(vec![9, 9]));
    }

    #[tokio::test]
    async fn test_clear_after_capture_is_rejected() {
        let service = service();
        let coordinator = SignatureCoordinator::new();
        let session = Session::new("tok");

        coordinator.stage_carrier_payload(vec![1]).await.unwrap();
        coordinator.submit_carrier(&service, &session, 5).await.unwrap();

        assert_eq!(
            coordinator.clear_carrier_payload().await,
            Err(DeliveryError::SignatureAlreadyCaptured)
        );
        assert_eq!(
            coordinator.stage_carrier_payload(vec![2]).await,
            Err(DeliveryError::SignatureAlreadyCaptured)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_submissions_are_guarded() {
        let service = service();
        service.delay("carrier_signature_submit", Duration::from_millis(50));
        let coordinator = SignatureCoordinator::new();
        let session = Session::new("tok");

        coordinator.stage_carrier_payload(vec![1]).await.unwrap();
        let (first, second) = tokio::join!(
            coordinator.submit_carrier(&service, &session, 5),
            coordinator.submit_carrier(&service, &session, 5),
        );

        let outcomes = [first, second];
        assert_eq!(
            outcomes.iter().filter(|r| **r == Err(DeliveryError::SubmissionInFlight)).count(),
            1
        );
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(coordinator.carrier_captured().await);
        assert_eq!(service.calls("carrier_signature_submit"), 1);
    }

    #[tokio::test]
    async fn test_adopt_remote_state() {
        let coordinator = SignatureCoordinator::new();
        let mut assignment = sample_assignment(5, AssignmentState::InTransit);
        assignment.customer_signed = true;

        coordinator.adopt_remote_state(&assignment).await;
        assert!(coordinator.customer_captured().await);
        assert!(!coordinator.carrier_captured().await);
    }
}
