use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Order, TableStatus};

/// What the table page renders, depending on occupancy and access.
#[derive(Debug, Serialize, ToSchema)]
pub struct TableView {
    pub establishment_id: i64,
    pub table_id: i64,
    pub status: TableStatus,
    #[serde(flatten)]
    pub view: TableViewKind,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum TableViewKind {
    /// The table is free; the caller may start a session.
    Available,
    /// The table is occupied by someone else's session.
    Blocked,
    /// The caller belongs to the active session.
    InSession {
        occupant_id: Option<i64>,
        session_id: Option<i64>,
    },
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StartSessionData {
    pub session_id: i64,
    pub table: TableView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EndSessionData {
    pub session_id: i64,
    /// Where the client should navigate for the closing summary.
    pub summary_path: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub total: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlaceOrderData {
    pub order: Order,
}
