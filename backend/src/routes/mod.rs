//! Route definitions for the VRI planner

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Drawing helpers
        .nest("/geometry", geometry_routes())
        .route("/units/application-rate", post(handlers::drip_application_rate))
        // Irrigation system creation
        .nest("/systems", system_routes())
        // Cell selection and management zones
        .nest("/workspaces/:user_id/:farm_name/:system_name", workspace_routes())
        // Prescription maps
        .nest(
            "/prescriptions/:user_id/:farm_name/:system_name",
            prescription_routes(),
        )
}

/// Geometry routes
fn geometry_routes() -> Router<AppState> {
    Router::new()
        .route("/sector", post(handlers::sector_outline))
        .route("/rectangle", post(handlers::rectangle_bounds))
        .route("/bearing", post(handlers::bearing_to_point))
        .route("/dimensions", post(handlers::rectangle_dimensions))
}

/// Irrigation system routes
fn system_routes() -> Router<AppState> {
    Router::new()
        .route("/center-pivot", post(handlers::create_center_pivot))
        .route("/linear-move", post(handlers::create_linear_move))
        .route("/micro-irrigation", post(handlers::create_micro_irrigation))
        .route(
            "/sprinkler-zones/validate",
            post(handlers::validate_sprinkler_zones),
        )
}

/// Workspace routes
fn workspace_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_workspace))
        .route("/load", post(handlers::load_workspace))
        .route("/selection", delete(handlers::clear_selection))
        .route(
            "/selection/cells/:feature_id",
            post(handlers::select_cell).delete(handlers::deselect_cell),
        )
        .route(
            "/selection/cells/:feature_id/toggle",
            post(handlers::toggle_cell),
        )
        .route("/selection/region", post(handlers::select_region))
        .route("/zones", post(handlers::create_zone))
        .route("/zones/:zone_name", delete(handlers::delete_zone))
}

/// Prescription routes
fn prescription_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_prescription))
        .route("/generate", post(handlers::generate_prescription))
        .route("/rates", put(handlers::update_rates))
        .route("/export", get(handlers::export_prescription))
}
