use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

/// Recipient id the mock treats as nonexistent.
pub const UNKNOWN_RECIPIENT: &str = "unknown";

/// Platforms accepted by push registration.
pub const PLATFORMS: [&str; 2] = ["ios", "android"];

/// One request as received by the mock service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    pub method: String,
    pub path: String,
    pub content_type: Option<String>,
    pub body: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientIdentity {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
}

pub type Db = Arc<RwLock<Vec<Delivery>>>;

pub fn app() -> Router {
    app_with_db(Db::default())
}

pub fn app_with_db(db: Db) -> Router {
    Router::new()
        .route("/notification/batch", post(accept))
        .route("/provider/pubsub/channel", post(accept))
        .route("/provider/email/recipient", post(accept))
        .route("/provider/email/address", post(accept))
        .route("/provider/email/recipient/batch", post(accept))
        .route("/recipients", post(update_recipient))
        .route(
            "/recipients/{id}/profiles/email",
            post(register_email).delete(unregister_email),
        )
        .route("/recipients/{id}/profiles/push/register", post(register_push))
        .route("/recipients/{id}/profiles/push/unregister", post(unregister_push))
        .route("/deliveries", get(list_deliveries))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_db(listener, Db::default()).await
}

pub async fn run_with_db(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_db(db)).await
}

async fn record(db: &Db, method: &Method, uri: &Uri, headers: &HeaderMap, body: &Bytes) -> Delivery {
    let delivery = Delivery {
        id: Uuid::new_v4(),
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: if body.is_empty() {
            None
        } else {
            serde_json::from_slice(body).ok()
        },
    };
    info!(id = %delivery.id, method = %delivery.method, path = %delivery.path, "received");
    db.write().await.push(delivery.clone());
    delivery
}

fn accepted(delivery: &Delivery) -> Response {
    (StatusCode::ACCEPTED, Json(json!({"ok": true, "id": delivery.id}))).into_response()
}

fn rejected(status: StatusCode, delivery: &Delivery, message: &str) -> Response {
    (
        status,
        [("x-request-id", delivery.id.to_string())],
        Json(json!({"error": message})),
    )
        .into_response()
}

fn str_field<'a>(body: &'a Option<Value>, key: &str) -> Option<&'a str> {
    body.as_ref()?.get(key)?.as_str()
}

async fn accept(State(db): State<Db>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let delivery = record(&db, &method, &uri, &headers, &body).await;
    if delivery.body.is_none() {
        return rejected(StatusCode::BAD_REQUEST, &delivery, "expected a JSON body");
    }
    accepted(&delivery)
}

async fn update_recipient(
    State(db): State<Db>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let delivery = record(&db, &method, &uri, &headers, &body).await;
    let identity = delivery
        .body
        .clone()
        .and_then(|b| serde_json::from_value::<RecipientIdentity>(b).ok());
    match identity {
        Some(identity) => (
            StatusCode::OK,
            Json(json!({"id": identity.id, "firstName": identity.first_name, "lastName": identity.last_name})),
        )
            .into_response(),
        None => rejected(StatusCode::UNPROCESSABLE_ENTITY, &delivery, "id, firstName and lastName are required"),
    }
}

async fn register_email(
    State(db): State<Db>,
    Path(id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let delivery = record(&db, &method, &uri, &headers, &body).await;
    if id == UNKNOWN_RECIPIENT {
        return rejected(StatusCode::NOT_FOUND, &delivery, "recipient not found");
    }
    match str_field(&delivery.body, "address") {
        Some(address) if address.contains('@') => accepted(&delivery),
        _ => rejected(StatusCode::UNPROCESSABLE_ENTITY, &delivery, "invalid address"),
    }
}

async fn unregister_email(
    State(db): State<Db>,
    Path(id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let delivery = record(&db, &method, &uri, &headers, &body).await;
    if id == UNKNOWN_RECIPIENT {
        return rejected(StatusCode::NOT_FOUND, &delivery, "recipient not found");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn register_push(
    State(db): State<Db>,
    Path(id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let delivery = record(&db, &method, &uri, &headers, &body).await;
    if id == UNKNOWN_RECIPIENT {
        return rejected(StatusCode::NOT_FOUND, &delivery, "recipient not found");
    }
    if str_field(&delivery.body, "deviceId").is_none() || str_field(&delivery.body, "token").is_none() {
        return rejected(StatusCode::UNPROCESSABLE_ENTITY, &delivery, "deviceId and token are required");
    }
    match str_field(&delivery.body, "platform") {
        Some(platform) if PLATFORMS.contains(&platform) => accepted(&delivery),
        _ => rejected(StatusCode::UNPROCESSABLE_ENTITY, &delivery, "unsupported platform"),
    }
}

async fn unregister_push(
    State(db): State<Db>,
    Path(id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let delivery = record(&db, &method, &uri, &headers, &body).await;
    if id == UNKNOWN_RECIPIENT {
        return rejected(StatusCode::NOT_FOUND, &delivery, "recipient not found");
    }
    match str_field(&delivery.body, "deviceId") {
        Some(_) => accepted(&delivery),
        None => rejected(StatusCode::UNPROCESSABLE_ENTITY, &delivery, "deviceId is required"),
    }
}

async fn list_deliveries(State(db): State<Db>) -> Json<Vec<Delivery>> {
    Json(db.read().await.clone())
}
