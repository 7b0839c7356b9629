use std::sync::Arc;
use std::time::Duration;

use coldchain_types::{Session, SignatureRecord};
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::service::DeliveryService;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 60;

/// Timing bounds for a customer-signature poll.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between status checks
    pub interval: Duration,
    /// Checks issued before the poll gives up silently
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }
}

/// Notifications flowing from background work back to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryEvent {
    /// The customer's out-of-band signature has been confirmed
    CustomerSignatureVerified,
}

/// Handle on an active customer-signature watch.
///
/// At most one session should be live per assignment; the orchestrator
/// cancels the previous one before starting a replacement. `cancel` is safe
/// to call any number of times.
pub struct PollSession {
    id: Uuid,
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PollSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Stop the poll immediately.
    pub fn cancel(&self) {
        let _ = self.stop.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the background task to wind down.
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

/// Begin watching the backend for the customer's signature.
///
/// Each tick asks the backend whether the signature exists. A positive
/// answer marks the shared record captured, emits one
/// [`DeliveryEvent::CustomerSignatureVerified`] and stops. Individual tick
/// failures are swallowed; the next tick simply retries. After
/// `max_attempts` ticks the session stops without an error; the operator
/// can re-request a code and poll again.
pub fn start_customer_signature_poll<S>(
    service: Arc<S>,
    session: Session,
    assignment_id: u64,
    record: Arc<RwLock<SignatureRecord>>,
    events: mpsc::Sender<DeliveryEvent>,
    config: PollConfig,
) -> PollSession
where
    S: DeliveryService + 'static,
{
    let (stop, mut stopped) = watch::channel(false);
    let id = Uuid::new_v4();

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.interval);
        let mut attempts: u32 = 0;
        loop {
            tokio::select! {
                _ = stopped.changed() => {
                    debug!(poll = %id, assignment = assignment_id, "signature poll cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    attempts += 1;
                    match service.customer_signature_present(&session, assignment_id).await {
                        Ok(true) => {
                            record.write().await.captured = true;
                            info!(poll = %id, assignment = assignment_id, attempts, "customer signature verified");
                            let _ = events.send(DeliveryEvent::CustomerSignatureVerified).await;
                            break;
                        }
                        Ok(false) => {}
                        // transient tick failures do not stop the session
                        Err(error) => {
                            debug!(poll = %id, assignment = assignment_id, error = %error, "signature poll tick failed");
                        }
                    }
                    if attempts >= config.max_attempts {
                        info!(poll = %id, assignment = assignment_id, attempts, "signature poll exhausted without confirmation");
                        break;
                    }
                }
            }
        }
    });

    PollSession { id, stop, handle }
}
