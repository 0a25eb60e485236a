//! HTTP boundary.
//!
//! `POST /api/agent/message?universityId=<id>` resolves the university's
//! tools through the tools middleware, then hands the message to the
//! dispatcher. Failures surface as a 500 with a generic `{ "message" }` body.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};

use crate::cache::ToolCache;
use crate::dispatcher::{MessageDispatcher, Reply};
use crate::tools::ToolDescriptor;

pub const TOOLS_ERROR_MESSAGE: &str = "Failed to fetch the available tools";
pub const DISPATCH_ERROR_MESSAGE: &str = "Failed to process the message";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ToolCache>,
    pub dispatcher: Arc<MessageDispatcher>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantQuery {
    pub university_id: String,
}

/// Request body for POST /api/agent/message.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    pub message: String,
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Tool set attached to a request by [`tools_middleware`].
#[derive(Debug, Clone)]
pub struct ResolvedTools(pub Arc<Vec<ToolDescriptor>>);

fn error_response(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// Resolve the university's tools and attach them to the request.
pub async fn tools_middleware(
    State(state): State<AppState>,
    Query(query): Query<TenantQuery>,
    mut request: Request,
    next: Next,
) -> Response {
    match state.cache.resolve(&query.university_id).await {
        Ok(tools) => {
            request.extensions_mut().insert(ResolvedTools(tools));
            next.run(request).await
        }
        Err(e) => {
            tracing::error!(university_id = %query.university_id, error = %e, "tools middleware failed");
            error_response(TOOLS_ERROR_MESSAGE)
        }
    }
}

/// POST /api/agent/message: run one user message through the agent.
pub async fn post_message(
    State(state): State<AppState>,
    Extension(ResolvedTools(tools)): Extension<ResolvedTools>,
    Json(body): Json<MessageRequest>,
) -> Response {
    match state
        .dispatcher
        .handle(&body.session_id, &body.message, &tools)
        .await
    {
        Ok(reply) => Json::<Reply>(reply).into_response(),
        Err(e) => {
            tracing::error!(session_id = %body.session_id, error = %e, "failed to handle message");
            error_response(DISPATCH_ERROR_MESSAGE)
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

/// Build the full axum router.
pub fn build_router(state: AppState) -> Router {
    let agent_routes = Router::new()
        .route("/api/agent/message", post(post_message))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            tools_middleware,
        ))
        .with_state(state);

    Router::new().route("/health", get(health)).merge(agent_routes)
}

/// Bind `bind_addr`, serve `router` in the background and return the bound address.
pub async fn spawn_server(router: Router, bind_addr: SocketAddr) -> std::io::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "server stopped");
        }
    });

    Ok(addr)
}
