use std::sync::Arc;

use coldchain_types::{Assignment, AssignmentState, ChecklistKind, Session, SigningCode};
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{DeliveryError, DeliveryResult};
use crate::gate::ChecklistGate;
use crate::poll::{start_customer_signature_poll, DeliveryEvent, PollConfig, PollSession};
use crate::service::{DeliveryService, FinalizeAck};
use crate::signature::SignatureCoordinator;

/// The single gating condition the presentation layer renders.
///
/// Exactly one of these is current at any time; the UI maps it to whatever
/// dialog it wants. This replaces per-dialog boolean flags, so two
/// contradictory dialogs can never both be "true".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryCondition {
    /// Nothing to report
    Idle,
    /// The named checklist still has unanswered questions
    ChecklistIncomplete(ChecklistKind),
    /// The customer has not signed yet; (re)issue the signing code
    CustomerSignatureRequired,
    /// The carrier has not signed yet
    CarrierSignatureRequired,
    /// The trip is underway
    TripStarted,
    /// The assignment is delivered
    Finalized,
    /// A remote call failed; retry at the operator's discretion
    Failed(String),
}

const EVENT_CHANNEL_CAPACITY: usize = 8;

/// Sequences the delivery-confirmation workflow for one assignment.
///
/// User actions flow top-down (start trip, finalize); background events
/// (poll ticks, signature confirmations) flow bottom-up. This is the single
/// point where the two directions are reconciled. The assignment snapshot
/// is a single-writer cache: only a successful fetch replaces it, always
/// wholesale, never field by field.
pub struct DeliveryOrchestrator<S: DeliveryService> {
    service: Arc<S>,
    session: Session,
    assignment_id: u64,
    snapshot: Arc<RwLock<Option<Assignment>>>,
    local_state: RwLock<AssignmentState>,
    gate: ChecklistGate,
    signatures: SignatureCoordinator,
    poll_config: PollConfig,
    poll: Mutex<Option<PollSession>>,
    events_tx: mpsc::Sender<DeliveryEvent>,
    events_rx: Mutex<mpsc::Receiver<DeliveryEvent>>,
    condition: RwLock<DeliveryCondition>,
    transition_guard: Mutex<()>,
}

impl<S: DeliveryService + 'static> DeliveryOrchestrator<S> {
    pub fn new(service: Arc<S>, session: Session, assignment_id: u64) -> Self {
        Self::with_poll_config(service, session, assignment_id, PollConfig::default())
    }

    pub fn with_poll_config(
        service: Arc<S>,
        session: Session,
        assignment_id: u64,
        poll_config: PollConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            service,
            session,
            assignment_id,
            snapshot: Arc::new(RwLock::new(None)),
            local_state: RwLock::new(AssignmentState::default()),
            gate: ChecklistGate::new(),
            signatures: SignatureCoordinator::new(),
            poll_config,
            poll: Mutex::new(None),
            events_tx,
            events_rx: Mutex::new(events_rx),
            condition: RwLock::new(DeliveryCondition::Idle),
            transition_guard: Mutex::new(()),
        }
    }

    pub fn checklists(&self) -> &ChecklistGate {
        &self.gate
    }

    pub fn signatures(&self) -> &SignatureCoordinator {
        &self.signatures
    }

    pub async fn assignment(&self) -> Option<Assignment> {
        self.snapshot.read().await.clone()
    }

    pub async fn local_state(&self) -> AssignmentState {
        self.local_state.read().await.clone()
    }

    /// The current gating condition for the presentation layer.
    pub async fn condition(&self) -> DeliveryCondition {
        self.condition.read().await.clone()
    }

    pub async fn poll_active(&self) -> bool {
        match self.poll.lock().await.as_ref() {
            Some(poll) => !poll.is_finished(),
            None => false,
        }
    }

    /// Initial load: fetch the assignment snapshot and adopt whatever
    /// signature state the backend already holds.
    pub async fn load(&self) -> DeliveryResult<Assignment> {
        let assignment = self.service.fetch_assignment(&self.session, self.assignment_id).await?;
        self.signatures.adopt_remote_state(&assignment).await;
        match self.service.carrier_signature_present(&self.session, self.assignment_id).await {
            Ok(true) => self.signatures.mark_carrier_captured().await,
            Ok(false) => {}
            // best-effort probe; an unreadable record is treated as absent
            Err(error) => {
                debug!(assignment = self.assignment_id, error = %error, "carrier signature probe failed");
            }
        }
        self.apply_snapshot(assignment.clone()).await;
        Ok(assignment)
    }

    /// Start the trip: submit the conditions checklist, then request the
    /// pending → in-transit transition, strictly in that order.
    ///
    /// An incomplete checklist is rejected locally before any network call.
    /// If the checklist lands but the transition call fails, the checklist
    /// is not rolled back; only the transition is retried.
    pub async fn start_trip(&self) -> DeliveryResult<DeliveryCondition> {
        let _in_flight = self
            .transition_guard
            .try_lock()
            .map_err(|_| DeliveryError::OperationInFlight)?;

        let state = self.local_state().await;
        if state != AssignmentState::Pending {
            return Err(DeliveryError::InvalidTransition { from: state, action: "start the trip" });
        }
        if !self.gate.is_complete(ChecklistKind::Conditions).await {
            return Ok(self
                .settle(DeliveryCondition::ChecklistIncomplete(ChecklistKind::Conditions))
                .await);
        }

        if let Err(error) = self
            .gate
            .submit_conditions(self.service.as_ref(), &self.session, self.assignment_id)
            .await
        {
            return Err(self.fail(error).await);
        }
        if let Err(error) = self.service.start_trip(&self.session, self.assignment_id).await {
            return Err(self.fail(error.into()).await);
        }

        self.advance_state(AssignmentState::InTransit).await;
        info!(assignment = self.assignment_id, "trip started");
        self.refresh_after_transition().await;
        Ok(self.settle(DeliveryCondition::TripStarted).await)
    }

    /// Issue a customer signing code and (re)start the signature poll. Any
    /// previously active poll session for this assignment is cancelled
    /// first.
    pub async fn request_customer_code(&self) -> DeliveryResult<SigningCode> {
        let state = self.local_state().await;
        if !state.is_in_transit() {
            return Err(DeliveryError::InvalidTransition { from: state, action: "request a signing code" });
        }

        let code = match self
            .signatures
            .request_code(self.service.as_ref(), &self.session, self.assignment_id)
            .await
        {
            Ok(code) => code,
            Err(error) => return Err(self.fail(error).await),
        };
        self.restart_poll().await;
        Ok(code)
    }

    /// The code-display view was dismissed; stop watching for the
    /// signature.
    pub async fn dismiss_code_view(&self) {
        self.cancel_poll().await;
    }

    /// Submit the carrier's staged signature. Independent of the customer
    /// flow; both may run concurrently.
    pub async fn submit_carrier_signature(&self) -> DeliveryResult<()> {
        let state = self.local_state().await;
        if !state.is_in_transit() {
            return Err(DeliveryError::InvalidTransition { from: state, action: "submit the carrier signature" });
        }
        match self
            .signatures
            .submit_carrier(self.service.as_ref(), &self.session, self.assignment_id)
            .await
        {
            Ok(()) => Ok(()),
            Err(error) => Err(self.fail(error).await),
        }
    }

    /// Finalize the delivery.
    ///
    /// Preconditions are checked in a fixed priority order (incidents
    /// checklist, customer signature, carrier signature) and only the
    /// first missing one is reported. The backend stays authoritative on
    /// the customer signature: a finalize rejection naming it re-enters
    /// the customer-signature-required condition instead of surfacing a
    /// generic failure.
    pub async fn finalize(&self) -> DeliveryResult<DeliveryCondition> {
        let _in_flight = self
            .transition_guard
            .try_lock()
            .map_err(|_| DeliveryError::OperationInFlight)?;

        let state = self.local_state().await;
        if !state.is_in_transit() {
            return Err(DeliveryError::InvalidTransition { from: state, action: "finalize the delivery" });
        }

        if !self.gate.is_complete(ChecklistKind::Incidents).await {
            return Ok(self
                .settle(DeliveryCondition::ChecklistIncomplete(ChecklistKind::Incidents))
                .await);
        }
        if !self.signatures.customer_captured().await {
            return Ok(self.settle(DeliveryCondition::CustomerSignatureRequired).await);
        }
        if !self.signatures.carrier_captured().await {
            return Ok(self.settle(DeliveryCondition::CarrierSignatureRequired).await);
        }

        if let Err(error) = self
            .gate
            .submit_incidents(self.service.as_ref(), &self.session, self.assignment_id)
            .await
        {
            return Err(self.fail(error).await);
        }

        match self.service.finalize(&self.session, self.assignment_id).await {
            Ok(FinalizeAck::Completed) => {
                self.cancel_poll().await;
                self.advance_state(AssignmentState::Delivered).await;
                info!(assignment = self.assignment_id, "delivery finalized");
                self.refresh_after_transition().await;
                Ok(self.settle(DeliveryCondition::Finalized).await)
            }
            Ok(FinalizeAck::CustomerSignatureMissing) => {
                warn!(
                    assignment = self.assignment_id,
                    "backend reports the customer signature is missing"
                );
                self.signatures.mark_customer_uncaptured().await;
                Ok(self.settle(DeliveryCondition::CustomerSignatureRequired).await)
            }
            Err(error) => Err(self.fail(error.into()).await),
        }
    }

    /// Drain one background event, if any is waiting.
    pub async fn try_recv_event(&self) -> Option<DeliveryEvent> {
        self.events_rx.lock().await.try_recv().ok()
    }

    /// Wait for the next background event.
    pub async fn next_event(&self) -> Option<DeliveryEvent> {
        self.events_rx.lock().await.recv().await
    }

    /// Fold a background event into the current condition.
    pub async fn apply_event(&self, event: DeliveryEvent) {
        match event {
            DeliveryEvent::CustomerSignatureVerified => {
                let mut condition = self.condition.write().await;
                if *condition == DeliveryCondition::CustomerSignatureRequired {
                    *condition = DeliveryCondition::Idle;
                }
            }
        }
    }

    async fn cancel_poll(&self) {
        let mut slot = self.poll.lock().await;
        if let Some(poll) = slot.take() {
            poll.cancel();
        }
    }

    async fn restart_poll(&self) {
        let mut slot = self.poll.lock().await;
        if let Some(previous) = slot.take() {
            debug!(
                assignment = self.assignment_id,
                poll = %previous.id(),
                "replacing active signature poll"
            );
            previous.cancel();
        }
        *slot = Some(start_customer_signature_poll(
            Arc::clone(&self.service),
            self.session.clone(),
            self.assignment_id,
            self.signatures.customer_record(),
            self.events_tx.clone(),
            self.poll_config.clone(),
        ));
    }

    /// Replace the snapshot wholesale. Local state only ever moves forward;
    /// a stale or unrecognized snapshot state never regresses it.
    async fn apply_snapshot(&self, assignment: Assignment) {
        {
            let mut state = self.local_state.write().await;
            forward(&mut state, assignment.state.clone(), self.assignment_id);
        }
        *self.snapshot.write().await = Some(assignment);
    }

    async fn advance_state(&self, next: AssignmentState) {
        let mut state = self.local_state.write().await;
        forward(&mut state, next, self.assignment_id);
    }

    async fn refresh_after_transition(&self) {
        match self.service.fetch_assignment(&self.session, self.assignment_id).await {
            Ok(assignment) => {
                self.signatures.adopt_remote_state(&assignment).await;
                self.apply_snapshot(assignment).await;
            }
            // the transition itself succeeded; the display refreshes on the next fetch
            Err(error) => {
                warn!(
                    assignment = self.assignment_id,
                    error = %error,
                    "snapshot refresh failed after transition"
                );
            }
        }
    }

    async fn settle(&self, next: DeliveryCondition) -> DeliveryCondition {
        *self.condition.write().await = next.clone();
        next
    }

    async fn fail(&self, error: DeliveryError) -> DeliveryError {
        if let DeliveryError::Service(service_error) = &error {
            *self.condition.write().await = DeliveryCondition::Failed(service_error.to_string());
        }
        error
    }
}

fn forward(current: &mut AssignmentState, next: AssignmentState, assignment_id: u64) {
    match (next.rank(), current.rank()) {
        (Some(incoming), Some(held)) if incoming < held => {
            warn!(
                assignment = assignment_id,
                current = %current,
                incoming = %next,
                "refusing backward state move"
            );
        }
        (Some(_), _) => *current = next,
        (None, _) => {
            debug!(assignment = assignment_id, incoming = %next, "ignoring unrecognized state");
        }
    }
}
