use crate::session_cookie::SessionCookie;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use shelf_core::{
    identity::require_identity, MessagesConfig, NewResource, RecordId, Resource, ResourcePatch,
    SessionId, ShelfConfig, ShelfError,
};
use shelf_store::ResourceStore;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, instrument};

/// Application state shared with all routes
#[derive(Clone)]
pub struct AppState {
    store: ResourceStore,
    cookie: Arc<SessionCookie>,
    messages: Arc<MessagesConfig>,
    route_prefix: Arc<str>,
}

impl AppState {
    pub fn new(store: ResourceStore, config: &ShelfConfig) -> Self {
        Self {
            store,
            cookie: Arc::new(SessionCookie::new(config.identity.clone())),
            messages: Arc::new(config.messages.clone()),
            route_prefix: Arc::from(config.server.route_prefix.trim_end_matches('/')),
        }
    }

    /// Identity the request must carry for scoped operations
    fn caller(&self, headers: &HeaderMap) -> Result<SessionId, ApiError> {
        let presented = self.cookie.presented(headers);
        require_identity(presented.as_deref()).map_err(|e| self.reject(e))
    }

    fn reject(&self, err: ShelfError) -> ApiError {
        ApiError::from_shelf(err, &self.messages)
    }
}

/// Response model for list requests
#[derive(Serialize)]
pub struct ListResponse {
    items: Vec<Resource>,
}

/// Response model for single-record requests
#[derive(Serialize)]
pub struct ItemResponse {
    item: Resource,
}

/// Response model carrying a user-facing message
#[derive(Serialize)]
pub struct MessageResponse {
    message: String,
}

/// Error type for HTTP server
#[derive(Debug)]
pub enum ApiError {
    Unauthenticated(String),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    InternalError(anyhow::Error),
}

impl ApiError {
    fn from_shelf(err: ShelfError, messages: &MessagesConfig) -> Self {
        match err {
            ShelfError::Unauthenticated => Self::Unauthenticated(messages.unauthorized.clone()),
            ShelfError::NotFound => Self::NotFound(messages.not_found.clone()),
            ShelfError::InvalidInput(msg) => Self::BadRequest(msg),
            ShelfError::Conflict(msg) => Self::Conflict(msg),
            other => Self::InternalError(other.into()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => {
                debug!(reason = %msg, "Rejected request");
                (StatusCode::BAD_REQUEST, msg)
            }
            Self::Conflict(msg) => {
                error!(record_id = %msg, "Record id collision");
                (StatusCode::CONFLICT, format!("Record already exists: {}", msg))
            }
            Self::InternalError(e) => {
                error!(error = %e, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(MessageResponse { message })).into_response()
    }
}

/// Build the router with all shelf routes mounted under the configured prefix
pub fn build_router(state: AppState) -> Router {
    let collection = state.route_prefix.to_string();
    let member = format!("{}/{{id}}", collection);

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route(&collection, get(list_resources).post(create_resource))
        .route(
            &member,
            get(get_resource).put(update_resource).delete(delete_resource),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server
pub async fn run_server(config: ShelfConfig, store: ResourceStore) -> anyhow::Result<()> {
    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address {}: {}", config.server.bind_addr, e))?;

    store
        .health_check()
        .await
        .map_err(|e| anyhow::anyhow!("Record store is not reachable: {}", e))?;

    let app = build_router(AppState::new(store, &config));

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server failed: {}", e))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}

/// Health check handler
async fn health() -> impl IntoResponse {
    "shelf is running"
}

#[instrument(skip_all)]
async fn list_resources(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListResponse>, ApiError> {
    let session = state.caller(&headers)?;
    let items = state.store.list(&session).await.map_err(|e| state.reject(e))?;
    Ok(Json(ListResponse { items }))
}

#[instrument(skip_all, fields(id = %raw_id))]
async fn get_resource(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Result<Json<ItemResponse>, ApiError> {
    let session = state.caller(&headers)?;
    let id = RecordId::parse(&raw_id).map_err(|e| state.reject(e))?;
    let item = state
        .store
        .get_one(&session, &id)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(Json(ItemResponse { item }))
}

#[instrument(skip_all)]
async fn create_resource(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<NewResource>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(fields) = body?;
    let presented = state.cookie.presented(&headers);

    let created = state
        .store
        .create(presented.as_deref(), fields)
        .await
        .map_err(|e| state.reject(e))?;

    let mut response_headers = HeaderMap::new();
    if let Some(session_id) = created.identity.issued_token() {
        state
            .cookie
            .attach(&mut response_headers, session_id)
            .map_err(|e| ApiError::InternalError(e.into()))?;
    }
    let location = format!("{}/{}", state.route_prefix, created.record_id);
    let location =
        HeaderValue::from_str(&location).map_err(|e| ApiError::InternalError(e.into()))?;
    response_headers.insert(LOCATION, location);

    Ok((StatusCode::CREATED, response_headers))
}

#[instrument(skip_all, fields(id = %raw_id))]
async fn update_resource(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    body: Result<Json<ResourcePatch>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let session = state.caller(&headers)?;
    let id = RecordId::parse(&raw_id).map_err(|e| state.reject(e))?;
    let Json(patch) = body?;

    state
        .store
        .update(&session, &id, patch)
        .await
        .map_err(|e| state.reject(e))?;

    Ok(Json(MessageResponse {
        message: state.messages.updated.clone(),
    }))
}

#[instrument(skip_all, fields(id = %raw_id))]
async fn delete_resource(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let session = state.caller(&headers)?;
    let id = RecordId::parse(&raw_id).map_err(|e| state.reject(e))?;

    state
        .store
        .delete(&session, &id)
        .await
        .map_err(|e| state.reject(e))?;

    Ok(Json(MessageResponse {
        message: state.messages.deleted.clone(),
    }))
}
