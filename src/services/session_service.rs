//! Table/session lifecycle operations.
//!
//! A table cycles between available and occupied; its session goes from
//! none to active to closed. Every operation is a chain of sequential
//! backend calls with no atomicity across them: on partial failure nothing
//! is rolled back and the backend of record reconciles. After a mutation
//! the authoritative table state is re-fetched, never assumed. A failed
//! precondition is a legitimate race outcome (another client got there
//! first), surfaced as [`AppError::PreconditionFailed`].

use chrono::Utc;

use crate::{
    backend::{BackendClient, NewOrder, NewSession, SessionClose, TablePatch},
    error::{AppError, AppResult},
    models::{Order, Session, Table, TableStatus},
    notify::{Notifier, StaffEvent, WaiterCall},
};

/// Open a session on an available table and mark it occupied by the caller.
pub async fn start_session(
    backend: &BackendClient,
    bearer: &str,
    establishment_id: i64,
    table_id: i64,
    user_id: i64,
) -> AppResult<(Session, Table)> {
    let table = backend.get_table(bearer, establishment_id, table_id).await?;
    ensure_available(&table)?;

    let session = backend
        .create_session(
            bearer,
            &NewSession {
                start_time: Utc::now(),
                end_time: None,
                is_active: true,
                table_number: table_id,
                establishment_id,
                user_id,
            },
        )
        .await?;

    backend
        .update_table(
            bearer,
            establishment_id,
            table_id,
            &TablePatch {
                status: TableStatus::Occupied,
                user_id: Some(user_id),
            },
        )
        .await?;

    tracing::info!(establishment_id, table_id, session_id = session.id, "session started");

    let table = backend.get_table(bearer, establishment_id, table_id).await?;
    Ok((session, table))
}

/// Close the table's active session and free the table. With no active
/// session the table is left untouched and the caller gets a
/// `PreconditionFailed` it can render, never a crash.
pub async fn end_session(
    backend: &BackendClient,
    bearer: &str,
    establishment_id: i64,
    table_id: i64,
) -> AppResult<Session> {
    let Some(active) = backend
        .active_session(bearer, establishment_id, table_id)
        .await?
    else {
        return Err(AppError::PreconditionFailed(
            "no active session for this table".into(),
        ));
    };

    backend
        .close_session(
            bearer,
            active.id,
            &SessionClose {
                end_time: Utc::now(),
                is_active: false,
            },
        )
        .await?;

    backend
        .update_table(
            bearer,
            establishment_id,
            table_id,
            &TablePatch {
                status: TableStatus::Available,
                user_id: None,
            },
        )
        .await?;

    tracing::info!(establishment_id, table_id, session_id = active.id, "session ended");

    Ok(active)
}

/// Create an order attributed to the table's active session, then tell the
/// staff channel. Without an active session the order cannot be attributed
/// and nothing is created or published.
pub async fn place_order(
    backend: &BackendClient,
    notifier: &Notifier,
    bearer: &str,
    establishment_id: i64,
    table_id: i64,
    user_id: i64,
    total: f64,
) -> AppResult<Order> {
    let Some(active) = backend
        .active_session(bearer, establishment_id, table_id)
        .await?
    else {
        return Err(AppError::PreconditionFailed(
            "order cannot be attributed: no active session".into(),
        ));
    };

    let order = backend
        .create_order(
            bearer,
            &NewOrder {
                total,
                date: Utc::now(),
                establishment_id,
                table_id,
                user_id,
                session_id: active.id,
            },
        )
        .await?;

    notifier.emit(StaffEvent::NewOrder(order.clone()));
    Ok(order)
}

/// Fire-and-forget waiter call. Nothing is persisted.
pub fn call_waiter(notifier: &Notifier, establishment_id: i64, table_id: i64) {
    notifier.emit(StaffEvent::CallWaiter(WaiterCall {
        table_id,
        establishment_id,
    }));
}

fn ensure_available(table: &Table) -> AppResult<()> {
    match table.status {
        TableStatus::Available => Ok(()),
        TableStatus::Occupied => Err(AppError::PreconditionFailed(
            "table is already occupied".into(),
        )),
    }
}
