//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{agents, auth, damage, health, items, orchestrator, payouts, rentals};

/// Register the bearer scheme the handlers refer to
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Access token issued by the auth provider"))
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Rentwise API",
        version = "0.3.0",
        description = "Peer-to-peer rental marketplace: rentals, damage verification, payouts and agents"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Session
        auth::me,
        // Items
        items::list_items,
        items::get_item,
        items::create_item,
        // Rentals
        rentals::create_rental,
        rentals::list_rentals,
        rentals::get_rental,
        rentals::accept_rental,
        rentals::cancel_rental,
        rentals::return_item,
        rentals::rental_events,
        // Damage
        damage::verify_damage,
        damage::list_damage_reports,
        // Payouts
        payouts::payout,
        // Agents
        orchestrator::orchestrate,
        agents::call_agent,
    ),
    components(
        schemas(
            crate::models::User,
            crate::models::Item,
            crate::models::item::ItemQuery,
            crate::models::item::CreateItem,
            crate::models::Rental,
            crate::models::CreateRental,
            crate::models::rental::RentalRole,
            crate::models::RentalStatus,
            crate::services::ledger::ReturnOutcome,
            rentals::ReturnForm,
            damage::VerifyDamageForm,
            crate::services::events::RentalEvent,
            crate::models::DamageReport,
            crate::models::DamageReportStatus,
            crate::models::Payment,
            crate::models::PaymentStatus,
            crate::models::PayoutRequest,
            crate::models::payment::PayoutResponse,
            crate::models::PayoutReceipt,
            orchestrator::OrchestratorRequest,
            crate::services::orchestrator::OrchestratorAction,
            crate::agents::AgentName,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Session endpoints"),
        (name = "items", description = "Rentable listings"),
        (name = "rentals", description = "Rental lifecycle"),
        (name = "damage", description = "Damage verification"),
        (name = "payouts", description = "Lender payouts"),
        (name = "agents", description = "Agent invocation")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
