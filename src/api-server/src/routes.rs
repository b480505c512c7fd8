//! Route definitions for the API server
//!
//! Health, metrics and the OpenAPI document are public. Everything under
//! `/api/v1` requires a bearer token.

use crate::{handlers, middleware, state::AppState};
use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation configuration
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cofund Workflow API",
        version = "1.0.0",
        description = "Approval workflows for community-fund members, contributions, loans, health claims, cashouts and program enrollments",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    paths(
        handlers::health_check,
        handlers::metrics,
        handlers::list_entities,
        handlers::create_entity,
        handlers::get_entity,
        handlers::update_entity,
        handlers::delete_entity,
        handlers::restore_entity,
        handlers::force_delete_entity,
        handlers::list_transitions,
        handlers::execute_transition,
        handlers::audit_trail,
        handlers::my_notifications,
    ),
    components(
        schemas(
            crate::models::HealthResponse,
            crate::models::ErrorResponse,
            crate::models::CreateEntityRequest,
            crate::models::UpdateEntityRequest,
            crate::models::TransitionRequest,
            crate::models::EntityResponse,
            crate::models::ListEntitiesResponse,
            crate::models::TransitionsResponse,
            crate::models::AuditEntryResponse,
            crate::models::AuditTrailResponse,
            crate::models::NotificationResponse,
            crate::models::NotificationsResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health and monitoring endpoints"),
        (name = "entities", description = "Entity lifecycle endpoints"),
        (name = "transitions", description = "Workflow transition endpoints"),
        (name = "audit", description = "Audit trail endpoints"),
        (name = "notifications", description = "In-app notification endpoints"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/me/notifications", get(handlers::my_notifications))
        .route(
            "/:kind",
            get(handlers::list_entities).post(handlers::create_entity),
        )
        .route(
            "/:kind/:id",
            get(handlers::get_entity)
                .put(handlers::update_entity)
                .delete(handlers::delete_entity),
        )
        .route("/:kind/:id/restore", post(handlers::restore_entity))
        .route("/:kind/:id/force", delete(handlers::force_delete_entity))
        .route("/:kind/:id/transitions", get(handlers::list_transitions))
        .route(
            "/:kind/:id/transitions/:name",
            post(handlers::execute_transition),
        )
        .route("/:kind/:id/audit", get(handlers::audit_trail))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::identity_middleware,
        ));

    Router::new()
        // Health and metrics (no identity required)
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .nest("/api/v1", api_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        // Executed bottom to top
        .layer(axum_middleware::from_fn(middleware::trace_request))
        .layer(middleware::cors_layer())
        .layer(TraceLayer::new_for_http())
}
