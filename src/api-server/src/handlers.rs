use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use cofund_core::{ActingUser, EntityId, EntityKind, Transition};
use cofund_workflow::{NewEntity, WorkflowError};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::{ApiError, Result},
    models::*,
    state::AppState,
};

fn parse_kind(kind: &str) -> Result<EntityKind> {
    kind.parse()
        .map_err(|_| ApiError::NotFound(format!("unknown entity kind '{}'", kind)))
}

fn parse_transition(name: &str) -> Result<Transition> {
    name.parse::<Transition>()
        .map_err(|e| ApiError::Workflow(WorkflowError::from(e)))
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Prometheus metrics in text exposition format
#[utoipa::path(
    get,
    path = "/metrics",
    responses(
        (status = 200, description = "Prometheus metrics", body = String, content_type = "text/plain")
    ),
    tag = "health"
)]
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let body = match state.orchestrator.metrics() {
        Some(metrics) => metrics.render()?,
        None => String::new(),
    };

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

/// List entities of a kind visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/{kind}",
    params(("kind" = String, Path, description = "Entity kind, e.g. loan")),
    responses(
        (status = 200, description = "Visible entities", body = ListEntitiesResponse),
        (status = 403, description = "Not allowed to list this kind", body = ErrorResponse),
        (status = 404, description = "Unknown kind", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "entities"
)]
pub async fn list_entities(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActingUser>,
    Path(kind): Path<String>,
) -> Result<Json<ListEntitiesResponse>> {
    let kind = parse_kind(&kind)?;
    let items: Vec<EntityResponse> = state
        .orchestrator
        .list(kind, &actor)
        .await?
        .into_iter()
        .map(EntityResponse::from)
        .collect();

    Ok(Json(ListEntitiesResponse {
        total: items.len(),
        items,
    }))
}

/// Create an entity in its initial status
#[utoipa::path(
    post,
    path = "/api/v1/{kind}",
    params(("kind" = String, Path, description = "Entity kind")),
    request_body = CreateEntityRequest,
    responses(
        (status = 201, description = "Entity created", body = EntityResponse),
        (status = 403, description = "Not allowed to create", body = ErrorResponse),
        (status = 422, description = "Invalid details", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "entities"
)]
pub async fn create_entity(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActingUser>,
    Path(kind): Path<String>,
    Json(req): Json<CreateEntityRequest>,
) -> Result<(StatusCode, Json<EntityResponse>)> {
    let kind = parse_kind(&kind)?;
    let new = NewEntity {
        member_id: req.member_id,
        details: req.details,
    };

    let record = state.orchestrator.create(kind, &actor, new).await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

/// Get one entity
#[utoipa::path(
    get,
    path = "/api/v1/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "Entity kind"),
        ("id" = Uuid, Path, description = "Entity ID")
    ),
    responses(
        (status = 200, description = "Entity", body = EntityResponse),
        (status = 403, description = "Not allowed to view", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "entities"
)]
pub async fn get_entity(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActingUser>,
    Path((kind, id)): Path<(String, EntityId)>,
) -> Result<Json<EntityResponse>> {
    let kind = parse_kind(&kind)?;
    let record = state.orchestrator.get(kind, id, &actor).await?;
    Ok(Json(record.into()))
}

/// Replace an entity's details
#[utoipa::path(
    put,
    path = "/api/v1/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "Entity kind"),
        ("id" = Uuid, Path, description = "Entity ID")
    ),
    request_body = UpdateEntityRequest,
    responses(
        (status = 200, description = "Entity updated", body = EntityResponse),
        (status = 403, description = "Not allowed to update", body = ErrorResponse),
        (status = 409, description = "Entity is deleted", body = ErrorResponse),
        (status = 422, description = "Invalid details", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "entities"
)]
pub async fn update_entity(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActingUser>,
    Path((kind, id)): Path<(String, EntityId)>,
    Json(req): Json<UpdateEntityRequest>,
) -> Result<Json<EntityResponse>> {
    let kind = parse_kind(&kind)?;
    let record = state
        .orchestrator
        .update(kind, id, &actor, req.details)
        .await?;
    Ok(Json(record.into()))
}

/// Soft-delete an entity
#[utoipa::path(
    delete,
    path = "/api/v1/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "Entity kind"),
        ("id" = Uuid, Path, description = "Entity ID")
    ),
    responses(
        (status = 200, description = "Entity soft-deleted", body = EntityResponse),
        (status = 403, description = "Not allowed to delete", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "entities"
)]
pub async fn delete_entity(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActingUser>,
    Path((kind, id)): Path<(String, EntityId)>,
) -> Result<Json<EntityResponse>> {
    let kind = parse_kind(&kind)?;
    let record = state.orchestrator.delete(kind, id, &actor).await?;
    Ok(Json(record.into()))
}

/// Restore a soft-deleted entity
#[utoipa::path(
    post,
    path = "/api/v1/{kind}/{id}/restore",
    params(
        ("kind" = String, Path, description = "Entity kind"),
        ("id" = Uuid, Path, description = "Entity ID")
    ),
    responses(
        (status = 200, description = "Entity restored", body = EntityResponse),
        (status = 403, description = "Missing restore_records", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "entities"
)]
pub async fn restore_entity(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActingUser>,
    Path((kind, id)): Path<(String, EntityId)>,
) -> Result<Json<EntityResponse>> {
    let kind = parse_kind(&kind)?;
    let record = state.orchestrator.restore(kind, id, &actor).await?;
    Ok(Json(record.into()))
}

/// Permanently remove an entity; its audit trail is kept
#[utoipa::path(
    delete,
    path = "/api/v1/{kind}/{id}/force",
    params(
        ("kind" = String, Path, description = "Entity kind"),
        ("id" = Uuid, Path, description = "Entity ID")
    ),
    responses(
        (status = 204, description = "Entity removed"),
        (status = 403, description = "Missing force_delete_records", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "entities"
)]
pub async fn force_delete_entity(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActingUser>,
    Path((kind, id)): Path<(String, EntityId)>,
) -> Result<StatusCode> {
    let kind = parse_kind(&kind)?;
    state.orchestrator.force_delete(kind, id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Transitions the caller may execute now
#[utoipa::path(
    get,
    path = "/api/v1/{kind}/{id}/transitions",
    params(
        ("kind" = String, Path, description = "Entity kind"),
        ("id" = Uuid, Path, description = "Entity ID")
    ),
    responses(
        (status = 200, description = "Available transitions", body = TransitionsResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "transitions"
)]
pub async fn list_transitions(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActingUser>,
    Path((kind, id)): Path<(String, EntityId)>,
) -> Result<Json<TransitionsResponse>> {
    let kind = parse_kind(&kind)?;
    let record = state.orchestrator.get(kind, id, &actor).await?;
    let transitions = state.orchestrator.transitions_for(&record, &actor);

    Ok(Json(TransitionsResponse {
        entity_id: id,
        status: record.status.to_string(),
        transitions: transitions.iter().map(|t| t.to_string()).collect(),
    }))
}

/// Execute a named transition
#[utoipa::path(
    post,
    path = "/api/v1/{kind}/{id}/transitions/{name}",
    params(
        ("kind" = String, Path, description = "Entity kind"),
        ("id" = Uuid, Path, description = "Entity ID"),
        ("name" = String, Path, description = "Transition name, e.g. approve_l1")
    ),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Transition applied", body = EntityResponse),
        (status = 403, description = "Not allowed", body = ErrorResponse),
        (status = 409, description = "Not valid from the current status", body = ErrorResponse),
        (status = 422, description = "Missing or invalid payload field", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "transitions"
)]
pub async fn execute_transition(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActingUser>,
    Path((kind, id, name)): Path<(String, EntityId, String)>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<EntityResponse>> {
    let kind = parse_kind(&kind)?;
    let transition = parse_transition(&name)?;
    req.validate()?;

    let record = state
        .orchestrator
        .execute(kind, id, transition, &actor, req.into())
        .await?;
    Ok(Json(record.into()))
}

/// Audit trail of one entity
#[utoipa::path(
    get,
    path = "/api/v1/{kind}/{id}/audit",
    params(
        ("kind" = String, Path, description = "Entity kind"),
        ("id" = Uuid, Path, description = "Entity ID")
    ),
    responses(
        (status = 200, description = "Audit entries, oldest first", body = AuditTrailResponse),
        (status = 403, description = "Missing view_audit_logs", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "audit"
)]
pub async fn audit_trail(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActingUser>,
    Path((kind, id)): Path<(String, EntityId)>,
) -> Result<Json<AuditTrailResponse>> {
    let kind = parse_kind(&kind)?;
    let entries: Vec<AuditEntryResponse> = state
        .orchestrator
        .audit_trail(kind, id, &actor)
        .await?
        .into_iter()
        .map(AuditEntryResponse::from)
        .collect();

    Ok(Json(AuditTrailResponse {
        total: entries.len(),
        entries,
    }))
}

/// In-app notifications for the caller and their role
#[utoipa::path(
    get,
    path = "/api/v1/me/notifications",
    responses(
        (status = 200, description = "Notifications, oldest first", body = NotificationsResponse)
    ),
    security(("bearer" = [])),
    tag = "notifications"
)]
pub async fn my_notifications(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<ActingUser>,
) -> Json<NotificationsResponse> {
    let notifications: Vec<NotificationResponse> = state
        .inbox
        .notifications_for(&actor)
        .into_iter()
        .map(NotificationResponse::from)
        .collect();

    Json(NotificationsResponse {
        total: notifications.len(),
        notifications,
    })
}
