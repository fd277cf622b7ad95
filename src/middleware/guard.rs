//! Edge guard: every page request passes the access policy before its
//! handler runs. Handlers still re-derive content-level access from the
//! same policy module once data is loaded.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    error::{AppError, AppResult},
    middleware::auth::{bearer_token, resolve_profile},
    models::Role,
    policy::{self, Actor, Decision, OwnershipFacts, ParsedRoute, RouteShape},
    state::AppState,
};

pub async fn policy_guard(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let route = ParsedRoute::parse(req.uri().path(), req.uri().query());

    // A missing or undecodable credential is an anonymous request; the
    // policy sends it to sign-in.
    let (actor, token) = match bearer_token(req.headers()) {
        Ok(token) => {
            match resolve_profile(token, &state.config.jwt_secret, &state.backend).await {
                Ok((profile, resolved)) => (Actor::User(profile), Some(resolved)),
                Err(AppError::InvalidCredential) => (Actor::Anonymous, None),
                Err(err) => return err.into_response(),
            }
        }
        Err(_) => (Actor::Anonymous, None),
    };

    // When resolution refreshed the credential, the request proceeds with
    // the fresh one so handlers see the settled role.
    if let Some(token) = token.as_deref() {
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
            req.headers_mut().insert(header::AUTHORIZATION, value);
        }
    }

    let facts = match gather_facts(&state, &actor, token.as_deref(), &route).await {
        Ok(facts) => facts,
        Err(err) => return err.into_response(),
    };

    match policy::evaluate(&actor, &route, &facts) {
        Decision::Allow => next.run(req).await,
        Decision::RedirectTo(target) => {
            tracing::debug!(from = %route.path, to = %target, "policy redirect");
            Redirect::temporary(&target).into_response()
        }
    }
}

/// Fetch ownership facts only when a rule can need them: an OWNER on a
/// management or tables-listing shape. An upstream failure here fails the
/// request rather than guessing a decision.
async fn gather_facts(
    state: &AppState,
    actor: &Actor,
    token: Option<&str>,
    route: &ParsedRoute,
) -> AppResult<OwnershipFacts> {
    let Actor::User(profile) = actor else {
        return Ok(OwnershipFacts::default());
    };
    if profile.role != Role::Owner {
        return Ok(OwnershipFacts::default());
    }
    let establishment_id = match route.shape {
        RouteShape::Management { id } | RouteShape::TablesListing { id } => id,
        _ => return Ok(OwnershipFacts::default()),
    };
    let Some(token) = token else {
        return Ok(OwnershipFacts::default());
    };

    let establishment = state
        .backend
        .get_establishment(token, establishment_id)
        .await?;
    Ok(OwnershipFacts {
        establishment_owner: Some(establishment.owner.id),
    })
}
