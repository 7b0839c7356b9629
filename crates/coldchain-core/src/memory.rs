use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use coldchain_types::{Assignment, AssignmentState, Checklist, ServiceError, ServiceResult, Session, SigningCode};

use crate::service::{ChecklistOutcome, DeliveryService, FinalizeAck, SignatureOutcome};

/// A minimal assignment record for seeding a [`MemoryDeliveryService`].
pub fn sample_assignment(id: u64, state: AssignmentState) -> Assignment {
    Assignment {
        id,
        shipment_id: id,
        state,
        shipment_state: None,
        origin_name: Some("Cochabamba".to_string()),
        destination_name: Some("Santa Cruz".to_string()),
        origin_coords: Some([-17.39, -66.15]),
        destination_coords: Some([-17.78, -63.18]),
        transport_kind: Some("refrigerado".to_string()),
        cargo: Vec::new(),
        customer_signed: false,
        carrier_signed: false,
    }
}

#[derive(Default)]
struct MemoryState {
    assignment: Option<Assignment>,
    conditions_recorded: bool,
    incidents_recorded: bool,
    customer_signed: bool,
    carrier_signature: Option<Vec<u8>>,
    codes_issued: usize,
}

/// In-memory `DeliveryService` backing the workflow tests.
///
/// Tracks per-endpoint call counts and supports injected failures and
/// response delays. Endpoints are addressed by name: `fetch_assignment`,
/// `conditions_checklist`, `start_trip`, `incidents_checklist`,
/// `signing_code`, `customer_signature_status`, `carrier_signature_submit`,
/// `carrier_signature_status` and `finalize`.
pub struct MemoryDeliveryService {
    state: RwLock<MemoryState>,
    calls: RwLock<HashMap<&'static str, usize>>,
    failures: RwLock<HashMap<&'static str, ServiceError>>,
    delays: RwLock<HashMap<&'static str, Duration>>,
}

impl MemoryDeliveryService {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            calls: RwLock::new(HashMap::new()),
            failures: RwLock::new(HashMap::new()),
            delays: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_assignment(assignment: Assignment) -> Self {
        let service = Self::new();
        service.seed_assignment(assignment);
        service
    }

    pub fn seed_assignment(&self, assignment: Assignment) {
        self.state.write().unwrap().assignment = Some(assignment);
    }

    pub fn set_customer_signed(&self, signed: bool) {
        self.state.write().unwrap().customer_signed = signed;
    }

    pub fn seed_carrier_signature(&self, payload: Vec<u8>) {
        self.state.write().unwrap().carrier_signature = Some(payload);
    }

    pub fn mark_incidents_recorded(&self) {
        self.state.write().unwrap().incidents_recorded = true;
    }

    pub fn assignment_state(&self) -> Option<AssignmentState> {
        self.state.read().unwrap().assignment.as_ref().map(|a| a.state.clone())
    }

    pub fn carrier_signature(&self) -> Option<Vec<u8>> {
        self.state.read().unwrap().carrier_signature.clone()
    }

    pub fn codes_issued(&self) -> usize {
        self.state.read().unwrap().codes_issued
    }

    /// Number of calls made against the named endpoint.
    pub fn calls(&self, endpoint: &str) -> usize {
        self.calls.read().unwrap().get(endpoint).copied().unwrap_or(0)
    }

    /// Fail every call against `endpoint` with `error` until cleared.
    pub fn fail_with(&self, endpoint: &'static str, error: ServiceError) {
        self.failures.write().unwrap().insert(endpoint, error);
    }

    pub fn clear_failure(&self, endpoint: &str) {
        self.failures.write().unwrap().remove(endpoint);
    }

    /// Delay every response from `endpoint` by `delay`.
    pub fn delay(&self, endpoint: &'static str, delay: Duration) {
        self.delays.write().unwrap().insert(endpoint, delay);
    }

    async fn enter(&self, endpoint: &'static str) -> ServiceResult<()> {
        {
            let mut calls = self.calls.write().unwrap();
            *calls.entry(endpoint).or_insert(0) += 1;
        }
        let delay = self.delays.read().unwrap().get(endpoint).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.failures.read().unwrap().get(endpoint).cloned();
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Default for MemoryDeliveryService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryService for MemoryDeliveryService {
    async fn fetch_assignment(&self, _session: &Session, assignment_id: u64) -> ServiceResult<Assignment> {
        self.enter("fetch_assignment").await?;
        let state = self.state.read().unwrap();
        match &state.assignment {
            Some(assignment) if assignment.id == assignment_id => {
                let mut snapshot = assignment.clone();
                snapshot.customer_signed = snapshot.customer_signed || state.customer_signed;
                snapshot.carrier_signed = snapshot.carrier_signed || state.carrier_signature.is_some();
                Ok(snapshot)
            }
            _ => Err(ServiceError::NotFound(format!("assignment {assignment_id}"))),
        }
    }

    async fn submit_conditions_checklist(
        &self,
        _session: &Session,
        assignment_id: u64,
        _checklist: &Checklist,
    ) -> ServiceResult<()> {
        self.enter("conditions_checklist").await?;
        let mut state = self.state.write().unwrap();
        if state.assignment.as_ref().map(|a| a.id) != Some(assignment_id) {
            return Err(ServiceError::NotFound(format!("assignment {assignment_id}")));
        }
        state.conditions_recorded = true;
        Ok(())
    }

    async fn start_trip(&self, _session: &Session, assignment_id: u64) -> ServiceResult<()> {
        self.enter("start_trip").await?;
        let mut state = self.state.write().unwrap();
        match state.assignment.as_mut() {
            Some(assignment) if assignment.id == assignment_id => {
                assignment.state = AssignmentState::InTransit;
                Ok(())
            }
            _ => Err(ServiceError::NotFound(format!("assignment {assignment_id}"))),
        }
    }

    async fn submit_incidents_checklist(
        &self,
        _session: &Session,
        _assignment_id: u64,
        _checklist: &Checklist,
    ) -> ServiceResult<ChecklistOutcome> {
        self.enter("incidents_checklist").await?;
        let mut state = self.state.write().unwrap();
        if state.incidents_recorded {
            Ok(ChecklistOutcome::AlreadyRecorded)
        } else {
            state.incidents_recorded = true;
            Ok(ChecklistOutcome::Recorded)
        }
    }

    async fn request_signing_code(&self, _session: &Session, _assignment_id: u64) -> ServiceResult<SigningCode> {
        self.enter("signing_code").await?;
        let mut state = self.state.write().unwrap();
        state.codes_issued += 1;
        Ok(SigningCode {
            image_data: "aVZCT1JvdGVzdA==".to_string(),
            requested_at: Utc::now(),
        })
    }

    async fn customer_signature_present(&self, _session: &Session, _assignment_id: u64) -> ServiceResult<bool> {
        self.enter("customer_signature_status").await?;
        Ok(self.state.read().unwrap().customer_signed)
    }

    async fn submit_carrier_signature(
        &self,
        _session: &Session,
        _assignment_id: u64,
        payload: &[u8],
    ) -> ServiceResult<SignatureOutcome> {
        self.enter("carrier_signature_submit").await?;
        let mut state = self.state.write().unwrap();
        if state.carrier_signature.is_some() {
            Ok(SignatureOutcome::AlreadyExists)
        } else {
            state.carrier_signature = Some(payload.to_vec());
            Ok(SignatureOutcome::Stored)
        }
    }

    async fn carrier_signature_present(&self, _session: &Session, _assignment_id: u64) -> ServiceResult<bool> {
        self.enter("carrier_signature_status").await?;
        Ok(self.state.read().unwrap().carrier_signature.is_some())
    }

    async fn finalize(&self, _session: &Session, assignment_id: u64) -> ServiceResult<FinalizeAck> {
        self.enter("finalize").await?;
        let mut state = self.state.write().unwrap();
        if !state.customer_signed {
            return Ok(FinalizeAck::CustomerSignatureMissing);
        }
        match state.assignment.as_mut() {
            Some(assignment) if assignment.id == assignment_id => {
                assignment.state = AssignmentState::Delivered;
                Ok(FinalizeAck::Completed)
            }
            _ => Err(ServiceError::NotFound(format!("assignment {assignment_id}"))),
        }
    }
}
