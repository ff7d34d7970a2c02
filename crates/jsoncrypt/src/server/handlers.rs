//! Axum request handlers for all service endpoints.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{ErrorResponse, HealthResponse, RecordRequest, RecordResponse};
use common::ServiceError;
use jsoncrypt::record::Direction;
use tracing::{debug, warn};

use super::state::AppState;

/// `POST /encrypt` — encrypt the configured fields of a record.
///
/// The record type is identified by the value of the `X-Entity-Name` request
/// header (or the configured header name). Matched string values inside each
/// configured field are replaced with `base64(iv || ciphertext)` strings.
pub async fn encrypt(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RecordRequest>,
) -> Response {
    process(&state, &headers, &req, Direction::Encrypt)
}

/// `POST /decrypt` — reverse [`encrypt`] for a stored record.
pub async fn decrypt(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RecordRequest>,
) -> Response {
    process(&state, &headers, &req, Direction::Decrypt)
}

/// `GET /health` — liveness and readiness check.
///
/// Returns `200 OK` when at least one encrypted column is registered.
/// Returns `503 Service Unavailable` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let columns_registered = state.registry.len();

    let (status_code, status_str) = if columns_registered > 0 {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        columns_registered,
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

fn process(
    state: &AppState,
    headers: &HeaderMap,
    req: &RecordRequest,
    direction: Direction,
) -> Response {
    let entity = match entity_name(state, headers) {
        Ok(e) => e,
        Err(err) => return error_response(&err),
    };

    let result = match direction {
        Direction::Encrypt => state.registry.encrypt_entity(&entity, &req.fields),
        Direction::Decrypt => state.registry.decrypt_entity(&entity, &req.fields),
    };

    match result {
        Ok(fields) => {
            debug!(entity = %entity, ?direction, fields = fields.len(), "record processed");
            (StatusCode::OK, Json(RecordResponse { fields })).into_response()
        }
        Err(e) => {
            warn!(entity = %entity, ?direction, error = %e, "record processing failed");
            let err = match direction {
                Direction::Encrypt => ServiceError::EncryptionFailure("encryption failed".into()),
                Direction::Decrypt => {
                    ServiceError::Decryption("stored value could not be decrypted".into())
                }
            };
            error_response(&err)
        }
    }
}

/// Extract the record type from the configured header.
fn entity_name(state: &AppState, headers: &HeaderMap) -> Result<String, ServiceError> {
    match headers.get(state.entity_header_name.as_str()) {
        Some(v) => v.to_str().map(str::to_owned).map_err(|_| {
            ServiceError::BadRequest(format!(
                "{} header contains non-ASCII characters",
                state.entity_header_name
            ))
        }),
        None => Err(ServiceError::BadRequest(format!(
            "missing {} header",
            state.entity_header_name
        ))),
    }
}

fn error_response(err: &ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::new(err.code(), err.to_string()))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};
    use axum::{body::Body, http::Request, Router};
    use common::protocol::{ColumnDeclaration, EncryptDeclaration};
    use jsoncrypt::registry::ColumnRegistry;
    use std::collections::BTreeMap;
    use tower::ServiceExt;

    const KEY_256: &str = "d85117047fd06d3afa79b6e44ee3a52eb426fc24c3a2e3667732e8da0342b4da";
    const JSON_TEST: &str = r#"{"secret":"test","name":"Alice"}"#;

    fn loaded_state() -> AppState {
        let registry = ColumnRegistry::new();
        registry
            .declare(&ColumnDeclaration {
                entity: "Test".into(),
                field: "secret".into(),
                matching: vec!["secret".into()],
                encrypt: EncryptDeclaration {
                    key: Some(KEY_256.into()),
                    key_env: None,
                    algorithm: "aes-256-cbc".into(),
                    iv_length: 16,
                    loose_matching: false,
                },
            })
            .unwrap();
        AppState::new(registry, "X-Entity-Name".into())
    }

    fn test_router(state: AppState) -> Router {
        Router::new()
            .route("/encrypt", post(encrypt))
            .route("/decrypt", post(decrypt))
            .route("/health", get(health))
            .with_state(state)
    }

    fn record_request(
        uri: &str,
        entity: Option<&str>,
        fields: &BTreeMap<String, Option<String>>,
    ) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(entity) = entity {
            builder = builder.header("X-Entity-Name", entity);
        }
        let body = serde_json::to_vec(&RecordRequest {
            fields: fields.clone(),
        })
        .unwrap();
        builder.body(Body::from(body)).unwrap()
    }

    async fn read_fields(resp: Response) -> BTreeMap<String, Option<String>> {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice::<RecordResponse>(&bytes).unwrap().fields
    }

    fn fields() -> BTreeMap<String, Option<String>> {
        let mut f = BTreeMap::new();
        f.insert("secret".to_owned(), Some(JSON_TEST.to_owned()));
        f.insert("notes".to_owned(), None);
        f
    }

    #[tokio::test]
    async fn health_returns_503_when_no_columns() {
        let app = test_router(AppState::default());
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn health_returns_200_when_loaded() {
        let app = test_router(loaded_state());
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_entity_header_is_bad_request() {
        let app = test_router(loaded_state());
        let resp = app
            .oneshot(record_request("/encrypt", None, &fields()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn encrypt_then_decrypt_round_trips() {
        let state = loaded_state();

        let resp = test_router(state.clone())
            .oneshot(record_request("/encrypt", Some("Test"), &fields()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let encrypted = read_fields(resp).await;
        assert_ne!(encrypted["secret"].as_deref(), Some(JSON_TEST));
        assert!(encrypted["notes"].is_none());

        let stored: serde_json::Value =
            serde_json::from_str(encrypted["secret"].as_deref().unwrap()).unwrap();
        assert_eq!(stored["name"], "Alice");

        let resp = test_router(state)
            .oneshot(record_request("/decrypt", Some("Test"), &encrypted))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(read_fields(resp).await, fields());
    }

    #[tokio::test]
    async fn unknown_entity_is_passed_through() {
        let app = test_router(loaded_state());
        let resp = app
            .oneshot(record_request("/encrypt", Some("Unknown"), &fields()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(read_fields(resp).await, fields());
    }

    #[tokio::test]
    async fn undecryptable_value_is_unprocessable() {
        let app = test_router(loaded_state());
        let resp = app
            .oneshot(record_request("/decrypt", Some("Test"), &fields()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
