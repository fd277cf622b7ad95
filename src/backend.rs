//! Typed client for the backend of record.
//!
//! The backend owns every entity lifecycle; this client only reads and
//! drives transitions, forwarding the caller's bearer credential on each
//! call. All calls share one bounded timeout; expiry and transport errors
//! surface as [`AppError::Upstream`].

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use crate::{
    dto::auth::RefreshTokenResponse,
    error::{AppError, AppResult},
    models::{Establishment, Order, Session, Table, TableStatus},
};

const IDEMPOTENCY_HEADER: &str = "idempotency-key";

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub table_number: i64,
    pub establishment_id: i64,
    pub user_id: i64,
}

/// `user_id: None` serializes as an explicit `userId: null`, which is how
/// the backend disassociates a freed table.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePatch {
    pub status: TableStatus,
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClose {
    pub end_time: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub total: f64,
    pub date: DateTime<Utc>,
    pub establishment_id: i64,
    pub table_id: i64,
    pub user_id: i64,
    pub session_id: i64,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get_table(
        &self,
        bearer: &str,
        establishment_id: i64,
        table_id: i64,
    ) -> AppResult<Table> {
        let table = self
            .http
            .get(self.url(&format!("/tables/{establishment_id}/{table_id}")))
            .bearer_auth(bearer)
            .send()
            .await?
            .error_for_status()
            .map_err(map_status)?
            .json()
            .await?;
        Ok(table)
    }

    pub async fn get_establishment(
        &self,
        bearer: &str,
        establishment_id: i64,
    ) -> AppResult<Establishment> {
        let establishment = self
            .http
            .get(self.url(&format!("/establishments/{establishment_id}")))
            .bearer_auth(bearer)
            .send()
            .await?
            .error_for_status()
            .map_err(map_status)?
            .json()
            .await?;
        Ok(establishment)
    }

    pub async fn create_session(&self, bearer: &str, body: &NewSession) -> AppResult<Session> {
        let session = self
            .http
            .post(self.url("/sessions"))
            .bearer_auth(bearer)
            .header(IDEMPOTENCY_HEADER, Uuid::new_v4().to_string())
            .json(body)
            .send()
            .await?
            .error_for_status()
            .map_err(map_status)?
            .json()
            .await?;
        Ok(session)
    }

    pub async fn update_table(
        &self,
        bearer: &str,
        establishment_id: i64,
        table_id: i64,
        body: &TablePatch,
    ) -> AppResult<()> {
        self.http
            .patch(self.url(&format!("/tables/{establishment_id}/{table_id}")))
            .bearer_auth(bearer)
            .json(body)
            .send()
            .await?
            .error_for_status()
            .map_err(map_status)?;
        Ok(())
    }

    /// Find the active session for a table. The backend's uniqueness
    /// invariant guarantees at most one; an empty or `null` body means none.
    pub async fn active_session(
        &self,
        bearer: &str,
        establishment_id: i64,
        table_id: i64,
    ) -> AppResult<Option<Session>> {
        let resp = self
            .http
            .get(self.url(&format!("/sessions/active/{establishment_id}/{table_id}")))
            .bearer_auth(bearer)
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = resp.error_for_status().map_err(map_status)?.text().await?;
        let body = body.trim();
        if body.is_empty() || body == "null" {
            return Ok(None);
        }
        let session = serde_json::from_str(body)
            .map_err(|err| AppError::Internal(anyhow::anyhow!("malformed session payload: {err}")))?;
        Ok(Some(session))
    }

    pub async fn close_session(
        &self,
        bearer: &str,
        session_id: i64,
        body: &SessionClose,
    ) -> AppResult<()> {
        self.http
            .patch(self.url(&format!("/sessions/{session_id}")))
            .bearer_auth(bearer)
            .json(body)
            .send()
            .await?
            .error_for_status()
            .map_err(map_status)?;
        Ok(())
    }

    /// Create an order. The backend signals success with 201 Created;
    /// anything else aborts the operation.
    pub async fn create_order(&self, bearer: &str, body: &NewOrder) -> AppResult<Order> {
        let resp = self
            .http
            .post(self.url("/orders"))
            .bearer_auth(bearer)
            .header(IDEMPOTENCY_HEADER, Uuid::new_v4().to_string())
            .json(body)
            .send()
            .await?
            .error_for_status()
            .map_err(map_status)?;
        if resp.status() != StatusCode::CREATED {
            return Err(AppError::Internal(anyhow::anyhow!(
                "order was not created (status {})",
                resp.status()
            )));
        }
        let order = resp.json().await?;
        Ok(order)
    }

    /// Exchange an expiring credential for a fresh one.
    pub async fn refresh_token(&self, bearer: &str) -> AppResult<String> {
        let resp: RefreshTokenResponse = self
            .http
            .post(self.url("/auth/refresh-token"))
            .bearer_auth(bearer)
            .send()
            .await?
            .error_for_status()
            .map_err(map_status)?
            .json()
            .await?;
        Ok(resp.access_token)
    }
}

fn map_status(err: reqwest::Error) -> AppError {
    match err.status() {
        Some(StatusCode::UNAUTHORIZED) => AppError::InvalidCredential,
        Some(StatusCode::FORBIDDEN) => AppError::Forbidden,
        Some(StatusCode::NOT_FOUND) => AppError::NotFound,
        Some(StatusCode::CONFLICT) | Some(StatusCode::PRECONDITION_FAILED) => {
            AppError::PreconditionFailed("rejected by the backend of record".into())
        }
        Some(status) if status.is_client_error() => {
            AppError::BadRequest(format!("backend rejected the request ({status})"))
        }
        _ => AppError::Upstream(err),
    }
}
