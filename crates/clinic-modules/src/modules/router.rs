use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ModuleId, TenantId};
use super::gateway::ModuleGateway;
use super::service::ModuleConfigurationService;
use super::session::{SessionError, SessionId};

#[derive(Debug, Deserialize)]
pub(crate) struct ToggleRequest {
    pub(crate) module: ModuleId,
    pub(crate) enable: bool,
}

/// Router builder exposing the module configuration endpoints.
pub fn module_router<G>(service: Arc<ModuleConfigurationService<G>>) -> Router
where
    G: ModuleGateway + 'static,
{
    Router::new()
        .route("/api/v1/modules/catalog", get(catalog_handler::<G>))
        .route(
            "/api/v1/tenants/:tenant_id/modules/sessions",
            post(open_handler::<G>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/modules/sessions/:session_id",
            get(snapshot_handler::<G>).delete(close_handler::<G>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/modules/sessions/:session_id/toggle",
            post(toggle_handler::<G>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/modules/sessions/:session_id/save",
            post(save_handler::<G>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/modules/sessions/:session_id/cancel",
            post(cancel_handler::<G>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/modules/sessions/:session_id/reload",
            post(reload_handler::<G>),
        )
        .with_state(service)
}

pub(crate) async fn catalog_handler<G>(
    State(service): State<Arc<ModuleConfigurationService<G>>>,
) -> Response
where
    G: ModuleGateway + 'static,
{
    (StatusCode::OK, Json(service.catalog())).into_response()
}

pub(crate) async fn open_handler<G>(
    State(service): State<Arc<ModuleConfigurationService<G>>>,
    Path(tenant_id): Path<String>,
) -> Response
where
    G: ModuleGateway + 'static,
{
    match service.open(&TenantId(tenant_id)) {
        Ok(snapshot) => (StatusCode::CREATED, Json(snapshot)).into_response(),
        Err(err) => session_error_response(err),
    }
}

pub(crate) async fn snapshot_handler<G>(
    State(service): State<Arc<ModuleConfigurationService<G>>>,
    Path((tenant_id, session_id)): Path<(String, String)>,
) -> Response
where
    G: ModuleGateway + 'static,
{
    match service.snapshot(&TenantId(tenant_id), &SessionId(session_id)) {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => session_error_response(err),
    }
}

pub(crate) async fn toggle_handler<G>(
    State(service): State<Arc<ModuleConfigurationService<G>>>,
    Path((tenant_id, session_id)): Path<(String, String)>,
    Json(request): Json<ToggleRequest>,
) -> Response
where
    G: ModuleGateway + 'static,
{
    let tenant = TenantId(tenant_id);
    let session = SessionId(session_id);
    match service.toggle(&tenant, &session, &request.module, request.enable) {
        Ok((outcome, snapshot)) => {
            let payload = json!({
                "toggle": outcome,
                "session": snapshot,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => session_error_response(err),
    }
}

pub(crate) async fn save_handler<G>(
    State(service): State<Arc<ModuleConfigurationService<G>>>,
    Path((tenant_id, session_id)): Path<(String, String)>,
) -> Response
where
    G: ModuleGateway + 'static,
{
    match service.save(&TenantId(tenant_id), &SessionId(session_id)) {
        Ok((outcome, snapshot)) => {
            let payload = json!({
                "save": outcome,
                "session": snapshot,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => session_error_response(err),
    }
}

pub(crate) async fn cancel_handler<G>(
    State(service): State<Arc<ModuleConfigurationService<G>>>,
    Path((tenant_id, session_id)): Path<(String, String)>,
) -> Response
where
    G: ModuleGateway + 'static,
{
    match service.cancel(&TenantId(tenant_id), &SessionId(session_id)) {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => session_error_response(err),
    }
}

pub(crate) async fn reload_handler<G>(
    State(service): State<Arc<ModuleConfigurationService<G>>>,
    Path((tenant_id, session_id)): Path<(String, String)>,
) -> Response
where
    G: ModuleGateway + 'static,
{
    match service.reload(&TenantId(tenant_id), &SessionId(session_id)) {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => session_error_response(err),
    }
}

pub(crate) async fn close_handler<G>(
    State(service): State<Arc<ModuleConfigurationService<G>>>,
    Path((tenant_id, session_id)): Path<(String, String)>,
) -> Response
where
    G: ModuleGateway + 'static,
{
    match service.close(&TenantId(tenant_id), &SessionId(session_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => session_error_response(err),
    }
}

fn session_error_response(err: SessionError) -> Response {
    match err {
        SessionError::Invalid(validation) => {
            let payload = json!({
                "error": "module configuration is invalid",
                "violations": validation.messages(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        SessionError::Persistence(err) => {
            let payload = json!({
                "error": err.to_string(),
            });
            (StatusCode::SERVICE_UNAVAILABLE, Json(payload)).into_response()
        }
        SessionError::NotFound(session) => {
            let payload = json!({
                "error": format!("editing session '{session}' not found"),
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
    }
}
