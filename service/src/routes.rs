//! HTTP surface for the request handler.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::handler::{HandlerOutcome, MISSING_QUESTION, RequestHandler};

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub question: Option<String>,
}

pub fn router(handler: Arc<RequestHandler>) -> Router {
    Router::new()
        .route("/query", post(query_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(handler)
}

/// A body that is not JSON, or has no `question`, counts as a missing question.
async fn query_handler(
    State(handler): State<Arc<RequestHandler>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    let question = match payload {
        Ok(Json(request)) => request.question.unwrap_or_default(),
        Err(rejection) => {
            warn!(%rejection, "unreadable query body");
            String::new()
        }
    };

    match handler.handle(&question).await {
        HandlerOutcome::MissingInput => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": MISSING_QUESTION })),
        )
            .into_response(),
        HandlerOutcome::Answered(response) => (StatusCode::OK, Json(response)).into_response(),
        HandlerOutcome::Failed(response) => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response()
        }
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Serves until ctrl-c.
pub async fn serve(handler: Arc<RequestHandler>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(handler))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(%err, "could not listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            info!("shutting down");
        })
        .await
}
