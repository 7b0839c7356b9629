/*!
 * HTTP implementation of the coldchain delivery-service contract.
 *
 * `ApiClient` implements `coldchain_core::DeliveryService` against the
 * logistics backend. The backend signals several conditions only through
 * the wording of its Spanish error messages; that fragile part of the
 * contract is isolated in the `interpret` module.
 */

pub mod client;
pub mod config;
pub mod interpret;

#[cfg(test)]
mod tests;

pub use client::ApiClient;
pub use config::ApiConfig;
