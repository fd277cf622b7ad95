//! Thin view handlers for the rest of the routing surface. Layout and
//! content are owned by the frontend; these exist to exercise the guard
//! and hand the client the data it needs to navigate.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    middleware::auth::CurrentUser,
    models::{Establishment, EstablishmentRef, Role},
    response::ApiResponse,
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignInQuery {
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignInView {
    pub callback_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SelectRoleView {
    pub options: Vec<Role>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HomeView {
    pub name: String,
    pub role: Role,
    #[serde(flatten)]
    pub panel: HomePanel,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "panel", rename_all = "snake_case")]
pub enum HomePanel {
    /// CLIENT: browse the establishment directory.
    Browse,
    Owner {
        add_establishment_path: String,
    },
    Waiter {
        establishment: Option<EstablishmentRef>,
        tables_path: Option<String>,
    },
    Admin,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TablesListingView {
    pub establishment_id: i64,
    pub establishment_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ManagementView {
    pub establishment_id: i64,
    pub section: &'static str,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionShellView {
    pub session_id: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SummaryQuery {
    pub from: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionSummaryView {
    pub session_id: i64,
    pub from: Option<String>,
}

#[utoipa::path(get, path = "/", tag = "Pages")]
pub async fn root() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(
        "Welcome",
        serde_json::json!({ "signIn": "/auth/signin" }),
    ))
}

#[utoipa::path(get, path = "/auth/signin", tag = "Pages")]
pub async fn sign_in(Query(query): Query<SignInQuery>) -> Json<ApiResponse<SignInView>> {
    let view = SignInView {
        callback_url: query.callback_url,
    };
    Json(ApiResponse::success("Sign in to continue", view))
}

#[utoipa::path(get, path = "/select-role", tag = "Pages")]
pub async fn select_role(_user: CurrentUser) -> Json<ApiResponse<SelectRoleView>> {
    let view = SelectRoleView {
        options: vec![Role::Client, Role::Owner, Role::Waiter],
    };
    Json(ApiResponse::success("Pick a role", view))
}

#[utoipa::path(
    get,
    path = "/home",
    responses(
        (status = 200, description = "Role-specific home view", body = ApiResponse<HomeView>)
    ),
    tag = "Pages"
)]
pub async fn home(user: CurrentUser) -> AppResult<Json<ApiResponse<HomeView>>> {
    let panel = match user.profile.role {
        Role::Client => HomePanel::Browse,
        Role::Owner => HomePanel::Owner {
            add_establishment_path: "/add-establishment".into(),
        },
        Role::Waiter => {
            let establishment = user.profile.establishment.clone();
            let tables_path = establishment.as_ref().map(|e| format!("/e/{}/tables", e.id));
            HomePanel::Waiter {
                establishment,
                tables_path,
            }
        }
        Role::Admin => HomePanel::Admin,
        // The guard pins PENDING users to role selection.
        Role::Pending => return Err(AppError::Forbidden),
    };

    let view = HomeView {
        name: user.profile.name.clone(),
        role: user.profile.role,
        panel,
    };
    Ok(Json(ApiResponse::success("Ok", view)))
}

#[utoipa::path(get, path = "/add-establishment", tag = "Pages")]
pub async fn add_establishment(_user: CurrentUser) -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(
        "Add establishment",
        serde_json::json!({}),
    ))
}

#[utoipa::path(
    get,
    path = "/e/{establishment_id}",
    responses(
        (status = 200, description = "Establishment details", body = ApiResponse<Establishment>)
    ),
    tag = "Pages"
)]
pub async fn establishment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(establishment_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Establishment>>> {
    let establishment = state
        .backend
        .get_establishment(&user.token, establishment_id)
        .await?;
    Ok(Json(ApiResponse::success("Ok", establishment)))
}

#[utoipa::path(
    get,
    path = "/e/{establishment_id}/tables",
    responses(
        (status = 200, description = "Tables listing shell", body = ApiResponse<TablesListingView>)
    ),
    tag = "Pages"
)]
pub async fn tables_listing(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(establishment_id): Path<i64>,
) -> AppResult<Json<ApiResponse<TablesListingView>>> {
    let establishment = state
        .backend
        .get_establishment(&user.token, establishment_id)
        .await?;
    let view = TablesListingView {
        establishment_id,
        establishment_name: establishment.name,
    };
    Ok(Json(ApiResponse::success("Ok", view)))
}

#[utoipa::path(get, path = "/e/{establishment_id}/add-product", tag = "Pages")]
pub async fn add_product(
    user: CurrentUser,
    Path(establishment_id): Path<i64>,
) -> Json<ApiResponse<ManagementView>> {
    management_view(user, establishment_id, "add-product")
}

#[utoipa::path(get, path = "/e/{establishment_id}/edit", tag = "Pages")]
pub async fn edit_establishment(
    user: CurrentUser,
    Path(establishment_id): Path<i64>,
) -> Json<ApiResponse<ManagementView>> {
    management_view(user, establishment_id, "edit")
}

#[utoipa::path(get, path = "/e/{establishment_id}/orders", tag = "Pages")]
pub async fn establishment_orders(
    user: CurrentUser,
    Path(establishment_id): Path<i64>,
) -> Json<ApiResponse<ManagementView>> {
    management_view(user, establishment_id, "orders")
}

#[utoipa::path(get, path = "/e/{establishment_id}/add-waiter", tag = "Pages")]
pub async fn add_waiter(
    user: CurrentUser,
    Path(establishment_id): Path<i64>,
) -> Json<ApiResponse<ManagementView>> {
    management_view(user, establishment_id, "add-waiter")
}

fn management_view(
    _user: CurrentUser,
    establishment_id: i64,
    section: &'static str,
) -> Json<ApiResponse<ManagementView>> {
    let view = ManagementView {
        establishment_id,
        section,
    };
    Json(ApiResponse::success("Ok", view))
}

#[utoipa::path(get, path = "/session/{session_id}", tag = "Pages")]
pub async fn session(
    _user: CurrentUser,
    Path(session_id): Path<i64>,
) -> Json<ApiResponse<SessionShellView>> {
    Json(ApiResponse::success("Ok", SessionShellView { session_id }))
}

#[utoipa::path(get, path = "/session/{session_id}/summary", tag = "Pages")]
pub async fn session_summary(
    _user: CurrentUser,
    Path(session_id): Path<i64>,
    Query(query): Query<SummaryQuery>,
) -> Json<ApiResponse<SessionSummaryView>> {
    let view = SessionSummaryView {
        session_id,
        from: query.from,
    };
    Json(ApiResponse::success("Ok", view))
}
