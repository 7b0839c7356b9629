use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use coldchain_core::{ChecklistOutcome, DeliveryService, FinalizeAck, SignatureOutcome};
use coldchain_types::{
    Assignment, Checklist, ChecklistKind, ServiceError, ServiceResult, Session, SigningCode,
};
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::ApiConfig;
use crate::interpret::{
    backend_error, backend_message, carrier_signature_outcome, finalize_outcome,
    incidents_checklist_outcome, map_transport_error,
};

/// HTTP client for the coldchain backend.
///
/// Carries no session state of its own; the bearer token travels in the
/// [`Session`] passed into every call.
#[derive(Clone)]
pub struct ApiClient {
    http: HttpClient,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .unwrap_or_default();
        Self { http, config }
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn authorized(&self, builder: RequestBuilder, session: &Session) -> RequestBuilder {
        builder.header("Authorization", session.bearer())
    }
}

/// Drain a failed response into a classified error.
async fn read_failure(response: Response) -> ServiceError {
    let status = response.status().as_u16();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    backend_error(status, &backend_message(&body))
}

/// Status plus message for the endpoints whose 4xx bodies can mean success.
/// Non-JSON bodies read as an empty message.
async fn status_and_message(response: Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    (status, backend_message(&body))
}

/// The flat `{ <question>: bool, ..., <note field> }` body the checklist
/// endpoints expect.
fn checklist_body(checklist: &Checklist) -> Value {
    let mut body = serde_json::Map::new();
    for (key, answer) in checklist.wire_answers() {
        body.insert(key.to_string(), Value::Bool(answer));
    }
    let note_field = match checklist.kind() {
        ChecklistKind::Conditions => "observaciones",
        ChecklistKind::Incidents => "descripcion_incidente",
    };
    body.insert(note_field.to_string(), Value::String(checklist.note().to_string()));
    Value::Object(body)
}

#[async_trait]
impl DeliveryService for ApiClient {
    async fn fetch_assignment(&self, session: &Session, assignment_id: u64) -> ServiceResult<Assignment> {
        let url = format!("{}/api/envios/mis-envios-transportista", self.config.base_url);
        let response = self
            .authorized(self.http.get(&url), session)
            .send()
            .await
            .map_err(map_transport_error)?;
        if !response.status().is_success() {
            return Err(read_failure(response).await);
        }
        let assignments = response.json::<Vec<Assignment>>().await.map_err(map_transport_error)?;
        debug!(count = assignments.len(), "fetched carrier assignment list");
        assignments
            .into_iter()
            .find(|assignment| assignment.id == assignment_id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("assignment {assignment_id} is not in the carrier's list"))
            })
    }

    async fn submit_conditions_checklist(
        &self,
        session: &Session,
        assignment_id: u64,
        checklist: &Checklist,
    ) -> ServiceResult<()> {
        let url = format!("{}/api/envios/{}/checklist-condiciones", self.config.base_url, assignment_id);
        let response = self
            .authorized(self.http.post(&url), session)
            .json(&checklist_body(checklist))
            .send()
            .await
            .map_err(map_transport_error)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(read_failure(response).await)
        }
    }

    async fn start_trip(&self, session: &Session, assignment_id: u64) -> ServiceResult<()> {
        let url = format!("{}/api/envios/iniciar/{}", self.config.base_url, assignment_id);
        let response = self
            .authorized(self.http.put(&url), session)
            .send()
            .await
            .map_err(map_transport_error)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(read_failure(response).await)
        }
    }

    async fn submit_incidents_checklist(
        &self,
        session: &Session,
        assignment_id: u64,
        checklist: &Checklist,
    ) -> ServiceResult<ChecklistOutcome> {
        let url = format!("{}/api/envios/{}/checklist-incidentes", self.config.base_url, assignment_id);
        let response = self
            .authorized(self.http.post(&url), session)
            .json(&checklist_body(checklist))
            .send()
            .await
            .map_err(map_transport_error)?;
        let (status, message) = status_and_message(response).await;
        incidents_checklist_outcome(status, &message)
    }

    async fn request_signing_code(&self, session: &Session, assignment_id: u64) -> ServiceResult<SigningCode> {
        let url = format!("{}/api/qr/{}", self.config.base_url, assignment_id);
        let response = self
            .authorized(self.http.get(&url), session)
            .send()
            .await
            .map_err(map_transport_error)?;
        if !response.status().is_success() {
            return Err(read_failure(response).await);
        }
        let body = response.json::<SigningCodeBody>().await.map_err(map_transport_error)?;
        Ok(SigningCode {
            image_data: body.image,
            requested_at: Utc::now(),
        })
    }

    async fn customer_signature_present(&self, session: &Session, assignment_id: u64) -> ServiceResult<bool> {
        let url = format!("{}/api/envios/validar-firma/{}", self.config.base_url, assignment_id);
        let response = self
            .authorized(self.http.get(&url), session)
            .send()
            .await
            .map_err(map_transport_error)?;
        if !response.status().is_success() {
            return Err(read_failure(response).await);
        }
        let body = response.json::<SignatureStatusBody>().await.map_err(map_transport_error)?;
        Ok(body.signed)
    }

    async fn submit_carrier_signature(
        &self,
        session: &Session,
        assignment_id: u64,
        payload: &[u8],
    ) -> ServiceResult<SignatureOutcome> {
        let url = format!("{}/api/envios/firma-transportista/{}", self.config.base_url, assignment_id);
        let upload = CarrierSignatureUpload { image: STANDARD.encode(payload) };
        let response = self
            .authorized(self.http.post(&url), session)
            .json(&upload)
            .send()
            .await
            .map_err(map_transport_error)?;
        let (status, message) = status_and_message(response).await;
        carrier_signature_outcome(status, &message)
    }

    async fn carrier_signature_present(&self, session: &Session, assignment_id: u64) -> ServiceResult<bool> {
        let url = format!("{}/api/envios/firma-transportista/{}", self.config.base_url, assignment_id);
        let response = self
            .authorized(self.http.get(&url), session)
            .send()
            .await
            .map_err(map_transport_error)?;
        if !response.status().is_success() {
            // best-effort probe; an unreadable record reads as absent
            debug!(
                assignment = assignment_id,
                status = response.status().as_u16(),
                "carrier signature lookup did not succeed"
            );
            return Ok(false);
        }
        let body = response.json::<CarrierSignatureRecordBody>().await.map_err(map_transport_error)?;
        Ok(body.image.map(|image| !image.is_empty()).unwrap_or(false))
    }

    async fn finalize(&self, session: &Session, assignment_id: u64) -> ServiceResult<FinalizeAck> {
        let url = format!("{}/api/envios/finalizar/{}", self.config.base_url, assignment_id);
        let response = self
            .authorized(self.http.put(&url), session)
            .send()
            .await
            .map_err(map_transport_error)?;
        let (status, message) = status_and_message(response).await;
        finalize_outcome(status, &message)
    }
}

#[derive(Serialize)]
struct CarrierSignatureUpload {
    #[serde(rename = "imagenFirma")]
    image: String,
}

#[derive(Deserialize)]
struct SigningCodeBody {
    #[serde(rename = "imagenQR")]
    image: String,
}

#[derive(Deserialize, Default)]
struct SignatureStatusBody {
    #[serde(rename = "firmaRealizada", default)]
    signed: bool,
}

#[derive(Deserialize, Default)]
struct CarrierSignatureRecordBody {
    #[serde(rename = "imagenFirma", default)]
    image: Option<String>,
}
