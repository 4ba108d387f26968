//! services/api/src/web/rest.rs
//!
//! Assembles the REST router and holds the master definition for the OpenAPI
//! specification.

use crate::web::{
    bookings, laundry, leaderboard, ledger, middleware::require_auth, response::ErrorBody, rooms,
    schedules, state::AppState, tasks, users,
};
use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi, ToSchema,
};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        users::register_user_handler,
        users::me_handler,
        users::aura_history_handler,
        users::adjust_aura_handler,
        users::assign_room_handler,
        rooms::get_room_handler,
        rooms::create_room_handler,
        rooms::rename_room_handler,
        tasks::list_tasks_handler,
        tasks::create_task_handler,
        tasks::update_task_handler,
        tasks::delete_task_handler,
        laundry::get_laundry_handler,
        laundry::update_laundry_handler,
        laundry::get_timer_handler,
        laundry::timer_action_handler,
        leaderboard::leaderboard_handler,
        bookings::list_bookings_handler,
        bookings::create_booking_handler,
        bookings::delete_booking_handler,
        ledger::list_expenses_handler,
        ledger::create_expense_handler,
        ledger::delete_expense_handler,
        ledger::list_payments_handler,
        ledger::create_payment_handler,
        ledger::balances_handler,
        schedules::get_schedule_handler,
        schedules::save_schedule_handler,
        schedules::optimize_schedule_handler,
    ),
    components(schemas(HealthResponse, ErrorBody)),
    modifiers(&BearerAuth),
    tags(
        (name = "DormDuty API", description = "Chores, laundry, bills and schedules for shared rooms.")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme referenced by the protected paths.
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

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "The service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

//=========================================================================================
// Router
//=========================================================================================

/// Every route of the service. Everything under `/api` requires a bearer token.
pub fn router(app_state: Arc<AppState>) -> Router {
    let protected_routes = Router::new()
        .route("/api/registerUser", post(users::register_user_handler))
        .route("/api/user/me", get(users::me_handler))
        .route(
            "/api/user/aura",
            get(users::aura_history_handler).patch(users::adjust_aura_handler),
        )
        .route("/api/user/{id}/room", put(users::assign_room_handler))
        .route(
            "/api/rooms",
            get(rooms::get_room_handler)
                .post(rooms::create_room_handler)
                .put(rooms::rename_room_handler),
        )
        .route(
            "/api/tasks",
            get(tasks::list_tasks_handler)
                .post(tasks::create_task_handler)
                .patch(tasks::update_task_handler)
                .delete(tasks::delete_task_handler),
        )
        .route(
            "/api/laundry",
            get(laundry::get_laundry_handler).patch(laundry::update_laundry_handler),
        )
        .route(
            "/api/laundry/{machine}/timer",
            get(laundry::get_timer_handler).post(laundry::timer_action_handler),
        )
        .route("/api/leaderboard", get(leaderboard::leaderboard_handler))
        .route(
            "/api/bookings",
            get(bookings::list_bookings_handler).post(bookings::create_booking_handler),
        )
        .route("/api/bookings/{id}", delete(bookings::delete_booking_handler))
        .route(
            "/api/expenses",
            get(ledger::list_expenses_handler).post(ledger::create_expense_handler),
        )
        .route("/api/expenses/{id}", delete(ledger::delete_expense_handler))
        .route(
            "/api/payments",
            get(ledger::list_payments_handler).post(ledger::create_payment_handler),
        )
        .route("/api/balances", get(ledger::balances_handler))
        .route(
            "/api/schedules",
            get(schedules::get_schedule_handler).put(schedules::save_schedule_handler),
        )
        .route("/api/schedule/optimize", post(schedules::optimize_schedule_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .merge(protected_routes)
        .with_state(app_state)
}
