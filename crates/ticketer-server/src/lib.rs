//! Ticketer Web Server
//!
//! Axum-based REST API for receipt ingestion.
//!
//! - Receipt upload (multipart), extraction and storage
//! - Receipt listing, detail, deletion and item edits
//! - Store and product catalog reads
//! - Restrictive CORS policy, security headers, upload size limit
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use ticketer_core::models::Page;
use ticketer_core::{AIClient, Database, ReceiptService};

mod handlers;

/// Maximum file upload size (10 MB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Multipart field carrying the receipt image
pub const UPLOAD_FIELD: &str = "receipt";

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub service: ReceiptService,
    pub config: ServerConfig,
}

/// Build a page from optional query values
pub(crate) fn page_from_query(limit: Option<i64>, offset: Option<i64>) -> Result<Page, AppError> {
    let limit = limit.unwrap_or(Page::DEFAULT_LIMIT);
    let offset = offset.unwrap_or(0);
    if limit < 0 || offset < 0 {
        return Err(AppError::bad_request(
            "limit and offset must be 0 or greater",
        ));
    }
    Ok(Page::new(limit.min(MAX_PAGE_LIMIT), offset))
}

/// Create the application router
pub fn create_router(db: Database, ai: Option<AIClient>, config: ServerConfig) -> Router {
    match ai {
        Some(ref client) => info!(
            "Extraction backend configured: {} (model: {})",
            client.host(),
            client.model()
        ),
        None => info!("ℹ️  Extraction backend not configured (set GEMINI_API_KEY to enable uploads)"),
    }

    let service = ReceiptService::new(ai, Arc::new(db.clone()));
    let state = Arc::new(AppState {
        db,
        service,
        config: config.clone(),
    });

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        // Receipts
        .route(
            "/receipts/upload",
            post(handlers::upload_receipt)
                // Headroom for multipart framing around the 10 MB image
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE + 64 * 1024)),
        )
        .route("/receipts", get(handlers::list_receipts))
        .route("/receipts/range", get(handlers::list_receipts_by_date_range))
        .route(
            "/receipts/:id",
            get(handlers::get_receipt).delete(handlers::delete_receipt),
        )
        // Items
        .route("/items/:id", put(handlers::update_item))
        // Stores and products
        .route("/stores", get(handlers::list_stores))
        .route("/stores/:id", get(handlers::get_store))
        .route("/stores/:id/receipts", get(handlers::store_receipts))
        .route("/stores/:id/products", get(handlers::store_products));

    // Build CORS layer
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

/// Start the server
pub async fn serve(
    db: Database,
    ai: Option<AIClient>,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    check_ai_connection(ai.as_ref()).await;

    let checkpoint_db = db.clone();
    let app = create_router(db, ai, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    if let Err(e) = checkpoint_db.checkpoint() {
        warn!(error = %e, "Failed to checkpoint database on shutdown");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Check and log extraction backend connection status
async fn check_ai_connection(ai: Option<&AIClient>) {
    if let Some(client) = ai {
        if client.health_check().await {
            info!(
                "✅ Extraction backend connected: {} (model: {})",
                client.host(),
                client.model()
            );
        } else {
            warn!(
                "⚠️  Extraction backend configured but not responding: {}",
                client.host()
            );
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn new(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn conflict(msg: &str) -> Self {
        Self::new(StatusCode::CONFLICT, msg)
    }

    pub fn bad_gateway(msg: &str) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, msg)
    }

    pub fn service_unavailable(msg: &str) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, msg)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl From<ticketer_core::Error> for AppError {
    fn from(err: ticketer_core::Error) -> Self {
        use ticketer_core::Error;

        match err {
            Error::Validation(msg) => Self::bad_request(&msg),
            Error::NotFound(what) => Self::not_found(&format!("Not found: {}", what)),
            Error::Duplicate { .. } => Self::conflict(&err.to_string()),
            Error::Extraction(_) | Error::Http(_) => {
                warn!(error = %err, "Receipt extraction failed");
                Self::bad_gateway(&format!("Failed to process receipt: {}", err))
            }
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                // Return generic message to client
                message: "An internal error occurred".to_string(),
                // Keep full error for logging
                internal: Some(other.into()),
            },
        }
    }
}
