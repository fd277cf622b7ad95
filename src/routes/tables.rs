use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::tables::{
        EndSessionData, PlaceOrderData, PlaceOrderRequest, StartSessionData, TableView,
        TableViewKind,
    },
    error::AppResult,
    middleware::auth::CurrentUser,
    models::{Table, TableStatus},
    notify::WaiterCall,
    policy,
    response::ApiResponse,
    services::session_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(table_page))
        .route("/session/start", post(start_session))
        .route("/session/end", post(end_session))
        .route("/orders", post(place_order))
        .route("/call-waiter", post(call_waiter))
}

#[utoipa::path(
    get,
    path = "/e/{establishment_id}/tables/{table_id}",
    params(
        ("establishment_id" = i64, Path, description = "Establishment id"),
        ("table_id" = i64, Path, description = "Table id"),
    ),
    responses(
        (status = 200, description = "Table view for the caller", body = ApiResponse<TableView>)
    ),
    tag = "Tables"
)]
pub async fn table_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((establishment_id, table_id)): Path<(i64, i64)>,
) -> AppResult<Json<ApiResponse<TableView>>> {
    let table = state
        .backend
        .get_table(&user.token, establishment_id, table_id)
        .await?;
    let establishment = state
        .backend
        .get_establishment(&user.token, establishment_id)
        .await?;

    let view = match table.status {
        TableStatus::Available => TableView {
            establishment_id,
            table_id,
            status: table.status,
            view: TableViewKind::Available,
        },
        TableStatus::Occupied => {
            let occupant = table.user.as_ref().map(|u| u.id);
            if !policy::can_view_session(
                &user.profile,
                establishment_id,
                establishment.owner.id,
                occupant,
            ) {
                // Someone else's session: block the content, the route
                // itself was already permitted.
                TableView {
                    establishment_id,
                    table_id,
                    status: table.status,
                    view: TableViewKind::Blocked,
                }
            } else {
                let session_id = state
                    .backend
                    .active_session(&user.token, establishment_id, table_id)
                    .await?
                    .map(|s| s.id);
                in_session_view(establishment_id, table_id, &table, session_id)
            }
        }
    };

    Ok(Json(ApiResponse::success("Ok", view)))
}

#[utoipa::path(
    post,
    path = "/e/{establishment_id}/tables/{table_id}/session/start",
    responses(
        (status = 200, description = "Session opened", body = ApiResponse<StartSessionData>),
        (status = 409, description = "Table is already occupied")
    ),
    tag = "Tables"
)]
pub async fn start_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((establishment_id, table_id)): Path<(i64, i64)>,
) -> AppResult<Json<ApiResponse<StartSessionData>>> {
    let (session, table) = session_service::start_session(
        &state.backend,
        &user.token,
        establishment_id,
        table_id,
        user.profile.user_id,
    )
    .await?;

    let data = StartSessionData {
        session_id: session.id,
        table: in_session_view(establishment_id, table_id, &table, Some(session.id)),
    };
    Ok(Json(ApiResponse::success("Session started", data)))
}

#[utoipa::path(
    post,
    path = "/e/{establishment_id}/tables/{table_id}/session/end",
    responses(
        (status = 200, description = "Session closed", body = ApiResponse<EndSessionData>),
        (status = 409, description = "No active session")
    ),
    tag = "Tables"
)]
pub async fn end_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((establishment_id, table_id)): Path<(i64, i64)>,
) -> AppResult<Json<ApiResponse<EndSessionData>>> {
    let closed =
        session_service::end_session(&state.backend, &user.token, establishment_id, table_id)
            .await?;

    let data = EndSessionData {
        session_id: closed.id,
        summary_path: format!("/session/{}/summary?from=finalized", closed.id),
    };
    Ok(Json(ApiResponse::success("Session ended", data)))
}

#[utoipa::path(
    post,
    path = "/e/{establishment_id}/tables/{table_id}/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = ApiResponse<PlaceOrderData>),
        (status = 409, description = "No active session to attribute the order to")
    ),
    tag = "Tables"
)]
pub async fn place_order(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((establishment_id, table_id)): Path<(i64, i64)>,
    Json(payload): Json<PlaceOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<PlaceOrderData>>)> {
    let order = session_service::place_order(
        &state.backend,
        &state.notifier,
        &user.token,
        establishment_id,
        table_id,
        user.profile.user_id,
        payload.total,
    )
    .await?;

    let body = ApiResponse::success("Order placed", PlaceOrderData { order });
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    post,
    path = "/e/{establishment_id}/tables/{table_id}/call-waiter",
    responses(
        (status = 200, description = "Waiter call published")
    ),
    tag = "Tables"
)]
pub async fn call_waiter(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path((establishment_id, table_id)): Path<(i64, i64)>,
) -> AppResult<Json<ApiResponse<WaiterCall>>> {
    session_service::call_waiter(&state.notifier, establishment_id, table_id);

    let data = WaiterCall {
        table_id,
        establishment_id,
    };
    Ok(Json(ApiResponse::success("Waiter called", data)))
}

fn in_session_view(
    establishment_id: i64,
    table_id: i64,
    table: &Table,
    session_id: Option<i64>,
) -> TableView {
    TableView {
        establishment_id,
        table_id,
        status: table.status,
        view: TableViewKind::InSession {
            occupant_id: table.user.as_ref().map(|u| u.id),
            session_id,
        },
    }
}
