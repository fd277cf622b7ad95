use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role claim carried by the access credential.
///
/// `Pending` is transient: assigned at signup, replaced once the user picks
/// one of the four settled roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Client,
    Owner,
    Waiter,
    Admin,
    Pending,
}

impl Role {
    pub fn is_pending(self) -> bool {
        matches!(self, Role::Pending)
    }

    /// Staff roles that may manage an establishment's catalog and waiters.
    pub fn can_manage(self) -> bool {
        matches!(self, Role::Admin | Role::Owner)
    }
}

/// Identity resolved from a credential.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Profile {
    pub user_id: i64,
    pub name: String,
    pub role: Role,
    /// The establishment a WAITER is assigned to, when any.
    pub establishment: Option<EstablishmentRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EstablishmentRef {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Establishment {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub operating_hours: Option<String>,
    pub owner: Owner,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Available,
    Occupied,
}

/// A table as reported by the backend of record.
///
/// Invariant owned by the backend: `status == Occupied` iff `user` is set
/// iff exactly one active session exists for the table.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub status: TableStatus,
    #[serde(default)]
    pub user: Option<TableOccupant>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TableOccupant {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: i64,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[serde(alias = "tableNumber")]
    pub table_id: i64,
    pub establishment_id: i64,
    pub user_id: i64,
}

impl Session {
    pub fn phase(&self) -> SessionPhase {
        if self.is_active {
            SessionPhase::Active
        } else {
            SessionPhase::Closed
        }
    }
}

/// Lifecycle of a table's session as the gateway observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    None,
    Active,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub total: f64,
    pub date: DateTime<Utc>,
    pub establishment_id: i64,
    pub table_id: i64,
    pub user_id: i64,
    pub session_id: i64,
}
