/*!
 * Coldchain delivery-confirmation engine
 *
 * Coordinates one carrier assignment through its lifecycle
 * (pending → in-transit → delivered): inspection checklists gate each
 * transition, the customer signature is confirmed through a bounded
 * background poll, and the carrier signature is captured on-device with
 * idempotent submission. The remote backend sits behind the
 * [`DeliveryService`] trait; `coldchain-remote` implements it over HTTP.
 */

pub mod error;
pub mod gate;
pub mod memory;
pub mod orchestrator;
pub mod poll;
pub mod service;
pub mod signature;

#[cfg(test)]
mod tests;

pub use error::{DeliveryError, DeliveryResult};
pub use gate::ChecklistGate;
pub use memory::MemoryDeliveryService;
pub use orchestrator::{DeliveryCondition, DeliveryOrchestrator};
pub use poll::{
    start_customer_signature_poll, DeliveryEvent, PollConfig, PollSession,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_POLL_MAX_ATTEMPTS,
};
pub use service::{ChecklistOutcome, DeliveryService, FinalizeAck, SignatureOutcome};
pub use signature::SignatureCoordinator;
