use crate::config::Listener as ListenerConfig;
use crate::errors::{RepoApiError, Result};
use crate::permissions::{PermissionRecord, PermissionsListHandler};
use crate::update::RepoUpdateHandler;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct AppState {
    pub updates: Arc<RepoUpdateHandler>,
    pub permissions: Arc<PermissionsListHandler>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/repos/{user}", post(update_repo))
        .route("/api/security/permissions", get(list_permissions))
        .with_state(state)
}

pub async fn serve(listener: &ListenerConfig, state: AppState) -> Result<()> {
    let app = router(state);

    let listener = TcpListener::bind(listener.address()).await?;
    tracing::info!(address = ?listener.local_addr()?, "Repository API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

async fn update_repo(
    State(state): State<AppState>,
    Path(user): Path<String>,
    body: Bytes,
) -> Result<Response> {
    let location = state.updates.handle(&user, &body).await?;
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

async fn list_permissions(State(state): State<AppState>) -> Result<Json<Vec<PermissionRecord>>> {
    Ok(Json(state.permissions.list().await?))
}

#[derive(Serialize)]
struct ApiErrorResponse {
    error_message: String,
}

impl IntoResponse for RepoApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_client_error() {
            tracing::warn!(error = %self, "Rejected request");
        } else {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(ApiErrorResponse {
            error_message: self.to_string(),
        });

        (status, body).into_response()
    }
}
