use coldchain_core::{ChecklistOutcome, DeliveryService, FinalizeAck, SignatureOutcome};
use coldchain_types::{Answer, Checklist, ChecklistKind, ServiceError, Session};
use mockito::Matcher;
use serde_json::json;

use crate::client::ApiClient;
use crate::config::ApiConfig;

const LIST_BODY: &str = r#"[
  {"id_asignacion": 12, "id_envio": 3, "estado": "pendiente", "estado_envio": "pendiente",
   "nombre_origen": "Cochabamba", "nombre_destino": "La Paz",
   "cargas": [{"variedad": "claveles", "peso": 80.0, "cantidad": 200}],
   "firma_cliente": false, "firma_transportista": null},
  {"id_asignacion": 15, "id_envio": 4, "estado": "en curso", "firma_cliente": true}
]"#;

fn client_for(server: &mockito::ServerGuard) -> ApiClient {
    ApiClient::new(ApiConfig::with_base_url(server.url()))
}

fn session() -> Session {
    Session::new("tok-123")
}

fn answered(kind: ChecklistKind) -> Checklist {
    let mut checklist = Checklist::new(kind);
    for key in kind.question_keys() {
        checklist.set_answer(key, Answer::No);
    }
    checklist
}

#[tokio::test]
async fn test_fetch_assignment_filters_by_id_and_sends_bearer_token() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/envios/mis-envios-transportista")
        .match_header("authorization", "Bearer tok-123")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(LIST_BODY)
        .create_async()
        .await;

    let client = client_for(&server);
    let assignment = client.fetch_assignment(&session(), 15).await.unwrap();

    assert_eq!(assignment.id, 15);
    assert!(assignment.customer_signed);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_assignment_missing_from_list_is_not_found() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/api/envios/mis-envios-transportista")
        .with_status(200)
        .with_body(LIST_BODY)
        .create_async()
        .await;

    let client = client_for(&server);
    let result = client.fetch_assignment(&session(), 99).await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn test_fetch_assignment_rejected_token() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/api/envios/mis-envios-transportista")
        .with_status(401)
        .with_body(r#"{"mensaje": "token inválido"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let result = client.fetch_assignment(&session(), 12).await;
    assert_eq!(result, Err(ServiceError::Authentication("token inválido".to_string())));
}

#[tokio::test]
async fn test_conditions_checklist_posts_flat_body_with_note() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/envios/12/checklist-condiciones")
        .match_header("authorization", "Bearer tok-123")
        .match_body(Matcher::PartialJson(json!({
            "temperatura_controlada": false,
            "estado_general_aceptable": false,
            "observaciones": "cadena de frío estable"
        })))
        .with_status(201)
        .create_async()
        .await;

    let mut checklist = answered(ChecklistKind::Conditions);
    checklist.set_note("cadena de frío estable");

    let client = client_for(&server);
    client.submit_conditions_checklist(&session(), 12, &checklist).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_start_trip_uses_put() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PUT", "/api/envios/iniciar/12")
        .match_header("authorization", "Bearer tok-123")
        .with_status(200)
        .create_async()
        .await;

    let client = client_for(&server);
    client.start_trip(&session(), 12).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_incidents_checklist_conflict_is_already_recorded() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", "/api/envios/12/checklist-incidentes")
        .with_status(400)
        .with_body(r#"{"error": "El checklist de incidentes ya fue registrado"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let outcome = client
        .submit_incidents_checklist(&session(), 12, &answered(ChecklistKind::Incidents))
        .await
        .unwrap();
    assert_eq!(outcome, ChecklistOutcome::AlreadyRecorded);
}

#[tokio::test]
async fn test_incidents_checklist_other_failure_surfaces() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", "/api/envios/12/checklist-incidentes")
        .with_status(500)
        .with_body(r#"{"error": "error interno"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let result = client
        .submit_incidents_checklist(&session(), 12, &answered(ChecklistKind::Incidents))
        .await;
    assert_eq!(
        result,
        Err(ServiceError::Backend { status: 500, message: "error interno".to_string() })
    );
}

#[tokio::test]
async fn test_request_signing_code_returns_image_payload() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/api/qr/12")
        .match_header("authorization", "Bearer tok-123")
        .with_status(200)
        .with_body(r#"{"imagenQR": "data:image/png;base64,QR=="}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let code = client.request_signing_code(&session(), 12).await.unwrap();
    assert_eq!(code.image_data, "data:image/png;base64,QR==");
}

#[tokio::test]
async fn test_customer_signature_status_reads_flag() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/api/envios/validar-firma/12")
        .with_status(200)
        .with_body(r#"{"firmaRealizada": true}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    assert!(client.customer_signature_present(&session(), 12).await.unwrap());
}

#[tokio::test]
async fn test_carrier_signature_is_uploaded_as_base64() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/envios/firma-transportista/12")
        .match_body(Matcher::PartialJson(json!({"imagenFirma": "AQID"})))
        .with_status(200)
        .create_async()
        .await;

    let client = client_for(&server);
    let outcome = client.submit_carrier_signature(&session(), 12, &[1, 2, 3]).await.unwrap();
    assert_eq!(outcome, SignatureOutcome::Stored);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_carrier_signature_conflict_is_already_exists() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", "/api/envios/firma-transportista/12")
        .with_status(400)
        .with_body(r#"{"error": "Ya existe una firma registrada para esta asignación"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let outcome = client.submit_carrier_signature(&session(), 12, &[1]).await.unwrap();
    assert_eq!(outcome, SignatureOutcome::AlreadyExists);
}

#[tokio::test]
async fn test_carrier_signature_lookup() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/api/envios/firma-transportista/12")
        .with_status(200)
        .with_body(r#"{"imagenFirma": "AQID"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    assert!(client.carrier_signature_present(&session(), 12).await.unwrap());
}

#[tokio::test]
async fn test_carrier_signature_lookup_failure_reads_as_absent() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/api/envios/firma-transportista/12")
        .with_status(404)
        .create_async()
        .await;

    let client = client_for(&server);
    assert!(!client.carrier_signature_present(&session(), 12).await.unwrap());
}

#[tokio::test]
async fn test_finalize_completed() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("PUT", "/api/envios/finalizar/12")
        .with_status(200)
        .with_body(r#"{"mensaje": "envío finalizado"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let ack = client.finalize(&session(), 12).await.unwrap();
    assert_eq!(ack, FinalizeAck::Completed);
}

#[tokio::test]
async fn test_finalize_missing_customer_signature_is_not_an_error() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("PUT", "/api/envios/finalizar/12")
        .with_status(400)
        .with_body(r#"{"error": "No se puede finalizar: falta la firma del cliente"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let ack = client.finalize(&session(), 12).await.unwrap();
    assert_eq!(ack, FinalizeAck::CustomerSignatureMissing);
}

#[tokio::test]
async fn test_finalize_with_non_json_error_body() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("PUT", "/api/envios/finalizar/12")
        .with_status(502)
        .with_body("Bad Gateway")
        .create_async()
        .await;

    let client = client_for(&server);
    let result = client.finalize(&session(), 12).await;
    assert_eq!(
        result,
        Err(ServiceError::Backend { status: 502, message: "HTTP 502".to_string() })
    );
}
