use coldchain_types::{Answer, Checklist, ChecklistKind, Session};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{DeliveryError, DeliveryResult};
use crate::service::{ChecklistOutcome, DeliveryService};

/// Local answer state and submission gate for the two inspection checklists.
///
/// Answering is purely local; a submit that finds the checklist incomplete
/// fails before any network call is made. A checklist that the backend has
/// already accepted is never sent again.
pub struct ChecklistGate {
    conditions: RwLock<Checklist>,
    incidents: RwLock<Checklist>,
}

impl ChecklistGate {
    pub fn new() -> Self {
        Self {
            conditions: RwLock::new(Checklist::new(ChecklistKind::Conditions)),
            incidents: RwLock::new(Checklist::new(ChecklistKind::Incidents)),
        }
    }

    fn slot(&self, kind: ChecklistKind) -> &RwLock<Checklist> {
        match kind {
            ChecklistKind::Conditions => &self.conditions,
            ChecklistKind::Incidents => &self.incidents,
        }
    }

    /// Overwrite the answer for one question.
    pub async fn set_answer(&self, kind: ChecklistKind, key: &str, answer: Answer) -> DeliveryResult<()> {
        let mut checklist = self.slot(kind).write().await;
        if checklist.set_answer(key, answer) {
            Ok(())
        } else {
            Err(DeliveryError::UnknownQuestion(key.to_string()))
        }
    }

    pub async fn set_note(&self, kind: ChecklistKind, note: impl Into<String>) {
        self.slot(kind).write().await.set_note(note);
    }

    pub async fn is_complete(&self, kind: ChecklistKind) -> bool {
        self.slot(kind).read().await.is_complete()
    }

    pub async fn is_submitted(&self, kind: ChecklistKind) -> bool {
        self.slot(kind).read().await.submitted()
    }

    /// Current answer sheet, cloned for display.
    pub async fn checklist(&self, kind: ChecklistKind) -> Checklist {
        self.slot(kind).read().await.clone()
    }

    /// Submit the conditions checklist. Skipped when the backend already
    /// accepted it in this session, so a retried start transition does not
    /// resubmit.
    pub async fn submit_conditions<S: DeliveryService>(
        &self,
        service: &S,
        session: &Session,
        assignment_id: u64,
    ) -> DeliveryResult<()> {
        let snapshot = {
            let checklist = self.conditions.read().await;
            if checklist.submitted() {
                debug!(assignment = assignment_id, "conditions checklist already submitted, skipping");
                return Ok(());
            }
            if !checklist.is_complete() {
                return Err(DeliveryError::ChecklistIncomplete(ChecklistKind::Conditions));
            }
            checklist.clone()
        };

        service.submit_conditions_checklist(session, assignment_id, &snapshot).await?;
        self.conditions.write().await.mark_submitted();
        info!(assignment = assignment_id, "conditions checklist recorded");
        Ok(())
    }

    /// Submit the incidents checklist. The checklist may legitimately have
    /// been recorded in a prior session; the backend's already-recorded
    /// conflict counts as success and must not block finalization.
    pub async fn submit_incidents<S: DeliveryService>(
        &self,
        service: &S,
        session: &Session,
        assignment_id: u64,
    ) -> DeliveryResult<()> {
        let snapshot = {
            let checklist = self.incidents.read().await;
            if checklist.submitted() {
                debug!(assignment = assignment_id, "incidents checklist already submitted, skipping");
                return Ok(());
            }
            if !checklist.is_complete() {
                return Err(DeliveryError::ChecklistIncomplete(ChecklistKind::Incidents));
            }
            checklist.clone()
        };

        match service.submit_incidents_checklist(session, assignment_id, &snapshot).await? {
            ChecklistOutcome::Recorded => {
                info!(assignment = assignment_id, "incidents checklist recorded");
            }
            ChecklistOutcome::AlreadyRecorded => {
                info!(assignment = assignment_id, "incidents checklist was already recorded, continuing");
            }
        }
        self.incidents.write().await.mark_submitted();
        Ok(())
    }
}

impl Default for ChecklistGate {
    fn default() -> Self {
        Self::new()
    }
}
