use axum::{Router, routing::get};

use crate::state::AppState;

pub mod doc;
pub mod health;
pub mod pages;
pub mod tables;

// Build the guarded page router without binding state; the guard layer and
// state are attached at the top level.
pub fn create_page_router() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::root))
        .route("/auth/signin", get(pages::sign_in))
        .route("/select-role", get(pages::select_role))
        .route("/home", get(pages::home))
        .route("/add-establishment", get(pages::add_establishment))
        .route("/e/{establishment_id}", get(pages::establishment))
        .route("/e/{establishment_id}/tables", get(pages::tables_listing))
        .route("/e/{establishment_id}/add-product", get(pages::add_product))
        .route("/e/{establishment_id}/edit", get(pages::edit_establishment))
        .route("/e/{establishment_id}/orders", get(pages::establishment_orders))
        .route("/e/{establishment_id}/add-waiter", get(pages::add_waiter))
        .nest("/e/{establishment_id}/tables/{table_id}", tables::router())
        .route("/session/{session_id}", get(pages::session))
        .route("/session/{session_id}/summary", get(pages::session_summary))
}
