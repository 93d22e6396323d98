//! Project API server.
//!
//! Serves the single project document and its photo blobs over HTTP. The
//! server performs no authorization; the admin gate lives in the client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use tokio::sync::oneshot;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::db::{Database, PROJECT_DOCUMENT_ID};
use crate::error::GatewayError;
use crate::tracker::format::now;
use crate::tracker::media::{DataUrl, looks_like_data_url};
use crate::tracker::model::Project;
use crate::tracker::seed::{SERVER_INIT_MESSAGE, seed_project};
use crate::web::types::{
    DeletePhotoRequest, ErrorResponse, HealthResponse, PhotoQuery, SuccessResponse,
    UploadPhotoRequest, UploadPhotoResponse,
};

const PHOTO_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";
const DOCUMENT_CACHE_CONTROL: &str = "no-store, no-cache, must-revalidate";

/// Shared state for all API handlers.
pub struct ApiState {
    /// Document and photo storage.
    pub store: Arc<dyn Database>,
    /// Shutdown signal sender.
    pub shutdown_tx: tokio::sync::RwLock<Option<oneshot::Sender<()>>>,
    /// Server startup time for uptime calculation.
    pub startup_time: Instant,
}

impl ApiState {
    pub fn new(store: Arc<dyn Database>) -> Arc<Self> {
        Arc::new(Self {
            store,
            shutdown_tx: tokio::sync::RwLock::new(None),
            startup_time: Instant::now(),
        })
    }

    /// Signal a running server to stop accepting connections.
    pub async fn shutdown(&self) {
        if let Some(tx) = self.shutdown_tx.write().await.take() {
            let _ = tx.send(());
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message)))
}

fn bad_request_with(message: &str, details: impl std::fmt::Display) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::with_details(message, details.to_string())),
    )
}

fn not_found(message: &str) -> ApiError {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new(message)))
}

fn internal_error(context: &str, details: impl std::fmt::Display) -> ApiError {
    tracing::error!("{}: {}", context, details);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::with_details(
            "Internal server error",
            details.to_string(),
        )),
    )
}

/// Build the API router with its middleware stack.
pub fn build_router(
    state: Arc<ApiState>,
    gateway: &GatewayConfig,
) -> Result<Router, GatewayError> {
    let origins = gateway
        .allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|_| GatewayError::InvalidOrigin {
                    origin: origin.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(AllowHeaders::list([header::CONTENT_TYPE]));

    let api = Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/get-data", get(get_data_handler))
        .route("/api/save-data", post(save_data_handler))
        .route(
            "/api/upload-photo",
            post(upload_photo_handler).layer(DefaultBodyLimit::max(gateway.max_photo_bytes)),
        )
        .route("/api/get-photo", get(get_photo_handler))
        .route("/api/delete-photo", post(delete_photo_handler));

    Ok(api
        .layer(DefaultBodyLimit::max(gateway.max_body_bytes))
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Start the API server.
///
/// Returns the actual bound `SocketAddr` (useful when binding to port 0).
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<ApiState>,
    gateway: &GatewayConfig,
) -> Result<SocketAddr, GatewayError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| GatewayError::StartupFailed {
            reason: format!("Failed to bind to {}: {}", addr, e),
        })?;
    let bound_addr = listener
        .local_addr()
        .map_err(|e| GatewayError::StartupFailed {
            reason: format!("Failed to get local addr: {}", e),
        })?;

    // The bound address itself is always an allowed origin.
    let mut gateway = gateway.clone();
    gateway
        .allowed_origins
        .push(format!("http://{}", bound_addr));
    if bound_addr.ip().is_loopback() {
        gateway
            .allowed_origins
            .push(format!("http://localhost:{}", bound_addr.port()));
    }
    let app = build_router(Arc::clone(&state), &gateway)?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    *state.shutdown_tx.write().await = Some(shutdown_tx);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("API server shutting down");
            })
            .await
        {
            tracing::error!("API server error: {}", e);
        }
    });

    tracing::info!("API server listening on {}", bound_addr);
    Ok(bound_addr)
}

// --- Health ---

async fn health_handler(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_secs: state.startup_time.elapsed().as_secs(),
    })
}

// --- Project document ---

async fn get_data_handler(
    State(state): State<Arc<ApiState>>,
) -> Result<impl IntoResponse, ApiError> {
    let stored = state
        .store
        .get_project_document(PROJECT_DOCUMENT_ID)
        .await
        .map_err(|e| internal_error("Failed to load project", e))?;

    let document = match stored {
        Some(document) => document,
        None => {
            tracing::info!("No stored project, seeding defaults");
            let seed = serde_json::to_value(seed_project(SERVER_INIT_MESSAGE, &now()))
                .map_err(|e| internal_error("Failed to encode seed project", e))?;
            state
                .store
                .insert_project_document_if_absent(PROJECT_DOCUMENT_ID, &seed)
                .await
                .map_err(|e| internal_error("Failed to seed project", e))?
        }
    };

    let project: Project = serde_json::from_value(document)
        .map_err(|e| internal_error("Stored project is unreadable", e))?;

    Ok((
        [
            (header::CACHE_CONTROL, DOCUMENT_CACHE_CONTROL),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        Json(project),
    ))
}

async fn save_data_handler(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, ApiError> {
    let value: serde_json::Value =
        serde_json::from_slice(&body).map_err(|e| bad_request_with("Invalid JSON body", e))?;

    let has_phases = value.get("phases").is_some_and(|v| !v.is_null());
    let has_name = value
        .get("projectName")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|name| !name.trim().is_empty());
    if !has_phases || !has_name {
        return Err(bad_request(
            "Invalid data: 'phases' and 'projectName' are required",
        ));
    }

    let project: Project = serde_json::from_value(value)
        .map_err(|e| bad_request_with("Invalid project document", e))?;
    let document = serde_json::to_value(&project)
        .map_err(|e| internal_error("Failed to encode project", e))?;

    state
        .store
        .upsert_project_document(PROJECT_DOCUMENT_ID, &document)
        .await
        .map_err(|e| internal_error("Failed to save project", e))?;

    tracing::debug!("Project document saved");
    Ok(Json(SuccessResponse::new("Progress saved.")))
}

// --- Photos ---

async fn upload_photo_handler(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<UploadPhotoResponse>, ApiError> {
    let request: UploadPhotoRequest =
        serde_json::from_slice(&body).map_err(|e| bad_request_with("Invalid JSON body", e))?;
    let data = request
        .data
        .filter(|data| looks_like_data_url(data))
        .ok_or_else(|| bad_request("Invalid photo data: expected a base64 data URL"))?;

    let id = state
        .store
        .insert_photo(&data)
        .await
        .map_err(|e| internal_error("Failed to store photo", e))?;

    Ok(Json(UploadPhotoResponse { id: id.to_string() }))
}

async fn get_photo_handler(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<PhotoQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let raw_id = query
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| bad_request("Photo id is required"))?;
    let id = Uuid::parse_str(raw_id.trim()).map_err(|_| not_found("Photo not found"))?;

    let stored = state
        .store
        .get_photo(id)
        .await
        .map_err(|e| internal_error("Failed to load photo", e))?
        .ok_or_else(|| not_found("Photo not found"))?;

    let photo =
        DataUrl::parse(&stored).map_err(|e| internal_error("Stored photo is malformed", e))?;
    let content_type = HeaderValue::from_str(&photo.mime)
        .map_err(|e| internal_error("Stored photo has an invalid type", e))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static(PHOTO_CACHE_CONTROL),
            ),
        ],
        photo.bytes,
    ))
}

async fn delete_photo_handler(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, ApiError> {
    let request: DeletePhotoRequest =
        serde_json::from_slice(&body).map_err(|e| bad_request_with("Invalid JSON body", e))?;
    let raw_id = request
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| bad_request("Photo id is required"))?;

    // Ids that were never issued cannot be stored; deleting them is a no-op.
    if let Ok(id) = Uuid::parse_str(raw_id.trim()) {
        let removed = state
            .store
            .delete_photo(id)
            .await
            .map_err(|e| internal_error("Failed to delete photo", e))?;
        tracing::debug!("Photo {} delete (removed: {})", id, removed);
    }

    Ok(Json(SuccessResponse::new("Photo deleted.")))
}
