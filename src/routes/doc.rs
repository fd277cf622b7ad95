use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::tables::{
        EndSessionData, PlaceOrderData, PlaceOrderRequest, StartSessionData, TableView,
    },
    models::{Establishment, EstablishmentRef, Order, Role, Session, Table, TableStatus},
    response::ApiResponse,
    routes::{health, pages, tables},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        pages::root,
        pages::sign_in,
        pages::select_role,
        pages::home,
        pages::add_establishment,
        pages::establishment,
        pages::tables_listing,
        pages::add_product,
        pages::edit_establishment,
        pages::establishment_orders,
        pages::add_waiter,
        pages::session,
        pages::session_summary,
        tables::table_page,
        tables::start_session,
        tables::end_session,
        tables::place_order,
        tables::call_waiter
    ),
    components(
        schemas(
            Role,
            Establishment,
            EstablishmentRef,
            Table,
            TableStatus,
            Session,
            Order,
            TableView,
            StartSessionData,
            EndSessionData,
            PlaceOrderRequest,
            PlaceOrderData,
            pages::SignInView,
            pages::SelectRoleView,
            pages::HomeView,
            pages::TablesListingView,
            pages::ManagementView,
            pages::SessionShellView,
            pages::SessionSummaryView,
            ApiResponse<TableView>,
            ApiResponse<Establishment>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Pages", description = "Guarded page views"),
        (name = "Tables", description = "Table sessions and orders"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
