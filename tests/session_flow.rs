use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use mesa_gateway::{
    backend::BackendClient,
    error::AppError,
    models::{Order, Session, TableStatus},
    notify::{Notifier, StaffEvent},
    services::session_service,
};

const BEARER: &str = "stub-bearer";

// In-memory backend of record. It owns the table/session uniqueness
// invariant the same way the real backend does, so the tests can check it
// after every transition.
#[derive(Default)]
struct Db {
    tables: HashMap<(i64, i64), (TableStatus, Option<i64>)>,
    sessions: Vec<Session>,
    orders: Vec<Order>,
    next_id: i64,
}

impl Db {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn active_for(&self, establishment_id: i64, table_id: i64) -> Option<&Session> {
        self.sessions
            .iter()
            .find(|s| s.is_active && s.establishment_id == establishment_id && s.table_id == table_id)
    }
}

type Shared = Arc<Mutex<Db>>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewSessionBody {
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    is_active: bool,
    table_number: i64,
    establishment_id: i64,
    user_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TablePatchBody {
    status: TableStatus,
    user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionCloseBody {
    end_time: DateTime<Utc>,
    is_active: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewOrderBody {
    total: f64,
    date: DateTime<Utc>,
    establishment_id: i64,
    table_id: i64,
    user_id: i64,
    session_id: i64,
}

fn stub_router(db: Shared) -> Router {
    Router::new()
        .route(
            "/tables/{e}/{t}",
            get(
                |State(db): State<Shared>, Path((e, t)): Path<(i64, i64)>| async move {
                    let db = db.lock().unwrap();
                    let (status, user) = db
                        .tables
                        .get(&(e, t))
                        .copied()
                        .unwrap_or((TableStatus::Available, None));
                    Json(json!({
                        "status": status,
                        "user": user.map(|id| json!({ "id": id })),
                    }))
                },
            )
            .patch(
                |State(db): State<Shared>,
                 Path((e, t)): Path<(i64, i64)>,
                 Json(body): Json<TablePatchBody>| async move {
                    let mut db = db.lock().unwrap();
                    db.tables.insert((e, t), (body.status, body.user_id));
                    StatusCode::OK
                },
            ),
        )
        .route(
            "/establishments/{id}",
            get(|Path(id): Path<i64>| async move {
                Json(json!({ "id": id, "name": "Stub Bar", "owner": { "id": 10 } }))
            }),
        )
        .route(
            "/sessions",
            post(
                |State(db): State<Shared>, Json(body): Json<NewSessionBody>| async move {
                    let mut db = db.lock().unwrap();
                    let session = Session {
                        id: db.id(),
                        start_time: body.start_time,
                        end_time: body.end_time,
                        is_active: body.is_active,
                        table_id: body.table_number,
                        establishment_id: body.establishment_id,
                        user_id: body.user_id,
                    };
                    db.sessions.push(session.clone());
                    (StatusCode::CREATED, Json(session))
                },
            ),
        )
        .route(
            "/sessions/active/{e}/{t}",
            get(
                |State(db): State<Shared>, Path((e, t)): Path<(i64, i64)>| async move {
                    let db = db.lock().unwrap();
                    Json(db.active_for(e, t).cloned())
                },
            ),
        )
        .route(
            "/sessions/{id}",
            patch(
                |State(db): State<Shared>,
                 Path(id): Path<i64>,
                 Json(body): Json<SessionCloseBody>| async move {
                    let mut db = db.lock().unwrap();
                    match db.sessions.iter_mut().find(|s| s.id == id) {
                        Some(session) => {
                            session.end_time = Some(body.end_time);
                            session.is_active = body.is_active;
                            StatusCode::OK
                        }
                        None => StatusCode::NOT_FOUND,
                    }
                },
            ),
        )
        .route(
            "/orders",
            post(
                |State(db): State<Shared>, Json(body): Json<NewOrderBody>| async move {
                    let mut db = db.lock().unwrap();
                    let order = Order {
                        id: db.id(),
                        total: body.total,
                        date: body.date,
                        establishment_id: body.establishment_id,
                        table_id: body.table_id,
                        user_id: body.user_id,
                        session_id: body.session_id,
                    };
                    db.orders.push(order.clone());
                    (StatusCode::CREATED, Json(order))
                },
            ),
        )
        .with_state(db)
}

async fn setup() -> (BackendClient, Shared, Notifier, tokio::sync::mpsc::Receiver<StaffEvent>) {
    let db: Shared = Arc::new(Mutex::new(Db::default()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = stub_router(db.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    let backend =
        BackendClient::new(&format!("http://{addr}"), Duration::from_secs(2)).expect("client");
    let (notifier, rx) = Notifier::channel(8);
    (backend, db, notifier, rx)
}

/// status == Occupied iff exactly one active session exists for the table.
fn assert_invariant(db: &Shared) {
    let db = db.lock().unwrap();
    for (&(e, t), &(status, user)) in &db.tables {
        let active = db
            .sessions
            .iter()
            .filter(|s| s.is_active && s.establishment_id == e && s.table_id == t)
            .count();
        match status {
            TableStatus::Occupied => {
                assert_eq!(active, 1, "occupied table ({e},{t}) must have one active session");
                assert!(user.is_some(), "occupied table ({e},{t}) must have an occupant");
            }
            TableStatus::Available => {
                assert_eq!(active, 0, "available table ({e},{t}) must have no active session");
                assert!(user.is_none(), "available table ({e},{t}) must have no occupant");
            }
        }
    }
}

#[tokio::test]
async fn start_session_occupies_the_table() -> anyhow::Result<()> {
    let (backend, db, _notifier, _rx) = setup().await;

    let (session, table) = session_service::start_session(&backend, BEARER, 1, 5, 42).await?;
    assert!(session.is_active);
    assert_eq!(session.user_id, 42);

    assert_eq!(table.status, TableStatus::Occupied);
    assert_eq!(table.user.map(|u| u.id), Some(42));

    let fetched = backend.get_table(BEARER, 1, 5).await?;
    assert_eq!(fetched.status, TableStatus::Occupied);
    assert_eq!(fetched.user.map(|u| u.id), Some(42));

    assert_invariant(&db);
    Ok(())
}

#[tokio::test]
async fn start_then_end_returns_to_available() -> anyhow::Result<()> {
    let (backend, db, _notifier, _rx) = setup().await;

    let (session, _) = session_service::start_session(&backend, BEARER, 1, 5, 42).await?;
    assert_invariant(&db);

    let closed = session_service::end_session(&backend, BEARER, 1, 5).await?;
    assert_eq!(closed.id, session.id);

    let table = backend.get_table(BEARER, 1, 5).await?;
    assert_eq!(table.status, TableStatus::Available);
    assert!(table.user.is_none());

    {
        let db = db.lock().unwrap();
        let row = db.sessions.iter().find(|s| s.id == session.id).unwrap();
        assert!(!row.is_active);
        assert!(row.end_time.is_some());
    }
    assert_invariant(&db);
    Ok(())
}

#[tokio::test]
async fn end_without_active_session_leaves_table_alone() {
    let (backend, db, _notifier, _rx) = setup().await;
    db.lock()
        .unwrap()
        .tables
        .insert((1, 6), (TableStatus::Available, None));

    let result = session_service::end_session(&backend, BEARER, 1, 6).await;
    match result {
        Err(AppError::PreconditionFailed(_)) => {}
        other => panic!("expected PreconditionFailed, got {other:?}"),
    }

    let db = db.lock().unwrap();
    assert_eq!(db.tables[&(1, 6)], (TableStatus::Available, None));
    assert!(db.sessions.is_empty());
}

#[tokio::test]
async fn start_on_occupied_table_is_a_race_outcome() -> anyhow::Result<()> {
    let (backend, db, _notifier, _rx) = setup().await;

    session_service::start_session(&backend, BEARER, 1, 5, 99).await?;

    let result = session_service::start_session(&backend, BEARER, 1, 5, 42).await;
    match result {
        Err(AppError::PreconditionFailed(_)) => {}
        other => panic!("expected PreconditionFailed, got {other:?}"),
    }

    // The loser changed nothing.
    assert_invariant(&db);
    let db = db.lock().unwrap();
    assert_eq!(db.sessions.iter().filter(|s| s.is_active).count(), 1);
    assert_eq!(db.tables[&(1, 5)].1, Some(99));
    Ok(())
}

#[tokio::test]
async fn place_order_requires_an_active_session() {
    let (backend, db, notifier, mut rx) = setup().await;

    let result =
        session_service::place_order(&backend, &notifier, BEARER, 1, 5, 42, 12.5).await;
    match result {
        Err(AppError::PreconditionFailed(_)) => {}
        other => panic!("expected PreconditionFailed, got {other:?}"),
    }

    assert!(db.lock().unwrap().orders.is_empty());
    assert!(rx.try_recv().is_err(), "no event may be published");
}

#[tokio::test]
async fn place_order_attributes_and_notifies() -> anyhow::Result<()> {
    let (backend, db, notifier, mut rx) = setup().await;

    let (session, _) = session_service::start_session(&backend, BEARER, 1, 5, 42).await?;
    let order =
        session_service::place_order(&backend, &notifier, BEARER, 1, 5, 42, 12.5).await?;

    assert_eq!(order.session_id, session.id);
    assert_eq!(order.total, 12.5);
    {
        let db = db.lock().unwrap();
        assert_eq!(db.orders.len(), 1);
        assert_eq!(db.orders[0].id, order.id);
    }

    match rx.try_recv().expect("newOrder event") {
        StaffEvent::NewOrder(published) => assert_eq!(published.id, order.id),
        other => panic!("unexpected event: {other:?}"),
    }

    // Orders survive the session's closure.
    session_service::end_session(&backend, BEARER, 1, 5).await?;
    assert_eq!(db.lock().unwrap().orders.len(), 1);
    assert_invariant(&db);
    Ok(())
}

#[tokio::test]
async fn call_waiter_only_publishes() {
    let (_backend, db, notifier, mut rx) = setup().await;

    session_service::call_waiter(&notifier, 1, 5);

    match rx.try_recv().expect("callWaiter event") {
        StaffEvent::CallWaiter(call) => {
            assert_eq!(call.establishment_id, 1);
            assert_eq!(call.table_id, 5);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    // Nothing is persisted for a waiter call.
    let db = db.lock().unwrap();
    assert!(db.sessions.is_empty());
    assert!(db.orders.is_empty());
}
