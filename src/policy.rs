//! Access policy for the routing surface.
//!
//! One pure decision function serves both boundaries: the edge guard
//! middleware evaluates it before any handler runs, and the table page
//! re-derives session access through [`can_view_session`] once table data
//! is loaded. Identical inputs always yield identical decisions; rules are
//! evaluated in a fixed precedence order, first match wins.

use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::models::{Profile, Role};

pub mod paths {
    pub const ROOT: &str = "/";
    pub const SIGN_IN: &str = "/auth/signin";
    pub const SELECT_ROLE: &str = "/select-role";
    pub const HOME: &str = "/home";
    pub const ADD_ESTABLISHMENT: &str = "/add-establishment";
}

pub const CALLBACK_PARAM: &str = "callbackUrl";

/// The logical shapes the policy distinguishes on the routing surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteShape {
    Root,
    SignIn,
    SelectRole,
    Home,
    AddEstablishment,
    Establishment { id: i64 },
    /// add-product | edit | orders | add-waiter under an establishment.
    Management { id: i64 },
    TablesListing { id: i64 },
    Table { id: i64, table: i64 },
    Other,
}

/// A request path reduced to what the policy needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRoute {
    pub shape: RouteShape,
    pub path: String,
    /// Decoded `callbackUrl` query parameter carried by this request.
    pub callback: Option<String>,
}

impl ParsedRoute {
    pub fn parse(path: &str, query: Option<&str>) -> Self {
        let shape = parse_shape(path);
        let callback = query.and_then(callback_param);
        Self {
            shape,
            path: path.to_string(),
            callback,
        }
    }
}

fn parse_shape(path: &str) -> RouteShape {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [] => RouteShape::Root,
        ["auth", "signin"] => RouteShape::SignIn,
        ["select-role"] => RouteShape::SelectRole,
        ["home"] => RouteShape::Home,
        ["add-establishment"] => RouteShape::AddEstablishment,
        ["e", id] => match id.parse() {
            Ok(id) => RouteShape::Establishment { id },
            Err(_) => RouteShape::Other,
        },
        ["e", id, "tables"] => match id.parse() {
            Ok(id) => RouteShape::TablesListing { id },
            Err(_) => RouteShape::Other,
        },
        ["e", id, "tables", table, ..] => match (id.parse(), table.parse()) {
            (Ok(id), Ok(table)) => RouteShape::Table { id, table },
            _ => RouteShape::Other,
        },
        ["e", id, action] if is_management_action(action) => match id.parse() {
            Ok(id) => RouteShape::Management { id },
            Err(_) => RouteShape::Other,
        },
        _ => RouteShape::Other,
    }
}

fn is_management_action(segment: &str) -> bool {
    matches!(segment, "add-product" | "edit" | "orders" | "add-waiter")
}

fn callback_param(query: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key != CALLBACK_PARAM || value.is_empty() {
            return None;
        }
        Some(percent_decode_str(value).decode_utf8_lossy().into_owned())
    })
}

/// Who is making the request, as far as the credential says.
#[derive(Debug, Clone)]
pub enum Actor {
    Anonymous,
    User(Profile),
}

/// Ownership lookups the guard resolved before evaluating.
///
/// `establishment_owner` is the owner id of the route's establishment; only
/// populated when a rule can need it (OWNER on a management or
/// tables-listing shape).
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnershipFacts {
    pub establishment_owner: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectTo(String),
}

/// Evaluate the access policy for one request. First matching rule wins.
pub fn evaluate(actor: &Actor, route: &ParsedRoute, facts: &OwnershipFacts) -> Decision {
    let profile = match actor {
        // Rule 1: anonymous users go to sign-in, keeping where they came
        // from as the callback. An existing callback parameter is kept.
        Actor::Anonymous => {
            if route.shape == RouteShape::SignIn {
                return Decision::Allow;
            }
            return Decision::RedirectTo(sign_in_redirect(route));
        }
        Actor::User(profile) => profile,
    };

    // Rule 2: an authenticated user has no business on the sign-in page.
    if route.shape == RouteShape::SignIn {
        let target = route
            .callback
            .clone()
            .unwrap_or_else(|| paths::HOME.to_string());
        return Decision::RedirectTo(target);
    }

    // Rule 3
    if route.shape == RouteShape::Root {
        return Decision::RedirectTo(paths::HOME.to_string());
    }

    // Rules 4 and 5: role selection is a one-time gate.
    if profile.role.is_pending() {
        if route.shape != RouteShape::SelectRole {
            return Decision::RedirectTo(paths::SELECT_ROLE.to_string());
        }
        return Decision::Allow;
    }
    if route.shape == RouteShape::SelectRole {
        return Decision::RedirectTo(paths::HOME.to_string());
    }

    // Rule 6: clients cannot create establishments.
    if profile.role == Role::Client && route.shape == RouteShape::AddEstablishment {
        return Decision::RedirectTo(paths::HOME.to_string());
    }

    match route.shape {
        // Rules 7 and 8
        RouteShape::Management { id } => {
            if !profile.role.can_manage() {
                return Decision::RedirectTo(format!("/e/{id}"));
            }
            if profile.role == Role::Owner && !owns(profile, facts) {
                return Decision::RedirectTo(paths::HOME.to_string());
            }
            Decision::Allow
        }
        // Rules 9 and 10
        RouteShape::TablesListing { id } => {
            if profile.role == Role::Owner && !owns(profile, facts) {
                return Decision::RedirectTo(paths::HOME.to_string());
            }
            if profile.role == Role::Waiter && !assigned_to(profile, id) {
                return Decision::RedirectTo(paths::HOME.to_string());
            }
            Decision::Allow
        }
        // Rule 11
        _ => Decision::Allow,
    }
}

fn owns(profile: &Profile, facts: &OwnershipFacts) -> bool {
    facts.establishment_owner == Some(profile.user_id)
}

fn assigned_to(profile: &Profile, establishment_id: i64) -> bool {
    profile
        .establishment
        .as_ref()
        .is_some_and(|e| e.id == establishment_id)
}

fn sign_in_redirect(route: &ParsedRoute) -> String {
    let callback = route.callback.as_deref().unwrap_or(&route.path);
    let encoded = utf8_percent_encode(callback, NON_ALPHANUMERIC);
    format!("{}?{}={}", paths::SIGN_IN, CALLBACK_PARAM, encoded)
}

/// Content-level gate for an occupied table's session.
///
/// The route itself was already permitted by [`evaluate`]; failing this
/// check renders a blocked view, not a redirect.
pub fn can_view_session(
    profile: &Profile,
    establishment_id: i64,
    establishment_owner: i64,
    occupant: Option<i64>,
) -> bool {
    match profile.role {
        Role::Admin => true,
        Role::Owner => profile.user_id == establishment_owner,
        Role::Waiter => assigned_to(profile, establishment_id),
        Role::Client => occupant.is_some_and(|id| id == profile.user_id),
        Role::Pending => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EstablishmentRef;

    fn profile(role: Role, user_id: i64) -> Profile {
        Profile {
            user_id,
            name: "test".into(),
            role,
            establishment: None,
        }
    }

    fn waiter(user_id: i64, establishment_id: Option<i64>) -> Profile {
        Profile {
            user_id,
            name: "test".into(),
            role: Role::Waiter,
            establishment: establishment_id.map(|id| EstablishmentRef { id, name: None }),
        }
    }

    fn route(path: &str) -> ParsedRoute {
        ParsedRoute::parse(path, None)
    }

    fn eval(actor: &Actor, path: &str) -> Decision {
        evaluate(actor, &route(path), &OwnershipFacts::default())
    }

    #[test]
    fn parses_route_shapes() {
        assert_eq!(route("/").shape, RouteShape::Root);
        assert_eq!(route("/auth/signin").shape, RouteShape::SignIn);
        assert_eq!(route("/home").shape, RouteShape::Home);
        assert_eq!(route("/e/7").shape, RouteShape::Establishment { id: 7 });
        assert_eq!(
            route("/e/7/add-product").shape,
            RouteShape::Management { id: 7 }
        );
        assert_eq!(route("/e/7/edit").shape, RouteShape::Management { id: 7 });
        assert_eq!(route("/e/7/orders").shape, RouteShape::Management { id: 7 });
        assert_eq!(
            route("/e/7/add-waiter").shape,
            RouteShape::Management { id: 7 }
        );
        assert_eq!(route("/e/7/tables").shape, RouteShape::TablesListing { id: 7 });
        assert_eq!(
            route("/e/7/tables/5").shape,
            RouteShape::Table { id: 7, table: 5 }
        );
        assert_eq!(
            route("/e/7/tables/5/call-waiter").shape,
            RouteShape::Table { id: 7, table: 5 }
        );
        assert_eq!(route("/session/3").shape, RouteShape::Other);
        assert_eq!(route("/e/not-a-number").shape, RouteShape::Other);
    }

    #[test]
    fn anonymous_is_sent_to_sign_in_with_callback() {
        let decision = eval(&Actor::Anonymous, "/e/7/tables/5");
        assert_eq!(
            decision,
            Decision::RedirectTo("/auth/signin?callbackUrl=%2Fe%2F7%2Ftables%2F5".into())
        );
    }

    #[test]
    fn anonymous_callback_is_not_overwritten() {
        let parsed = ParsedRoute::parse("/home", Some("callbackUrl=%2Fe%2F3"));
        let decision = evaluate(&Actor::Anonymous, &parsed, &OwnershipFacts::default());
        assert_eq!(
            decision,
            Decision::RedirectTo("/auth/signin?callbackUrl=%2Fe%2F3".into())
        );
    }

    #[test]
    fn anonymous_may_reach_sign_in() {
        assert_eq!(eval(&Actor::Anonymous, "/auth/signin"), Decision::Allow);
    }

    #[test]
    fn authenticated_sign_in_returns_to_callback_or_home() {
        let actor = Actor::User(profile(Role::Client, 1));
        let parsed = ParsedRoute::parse("/auth/signin", Some("callbackUrl=%2Fe%2F3"));
        assert_eq!(
            evaluate(&actor, &parsed, &OwnershipFacts::default()),
            Decision::RedirectTo("/e/3".into())
        );
        assert_eq!(
            eval(&actor, "/auth/signin"),
            Decision::RedirectTo("/home".into())
        );
    }

    #[test]
    fn authenticated_root_goes_home() {
        let actor = Actor::User(profile(Role::Client, 1));
        assert_eq!(eval(&actor, "/"), Decision::RedirectTo("/home".into()));
    }

    #[test]
    fn pending_is_pinned_to_role_selection() {
        let actor = Actor::User(profile(Role::Pending, 1));
        assert_eq!(
            eval(&actor, "/home"),
            Decision::RedirectTo("/select-role".into())
        );
        assert_eq!(eval(&actor, "/select-role"), Decision::Allow);
    }

    #[test]
    fn settled_role_cannot_revisit_role_selection() {
        let actor = Actor::User(profile(Role::Client, 1));
        assert_eq!(
            eval(&actor, "/select-role"),
            Decision::RedirectTo("/home".into())
        );
    }

    #[test]
    fn client_cannot_add_establishment() {
        let actor = Actor::User(profile(Role::Client, 1));
        assert_eq!(
            eval(&actor, "/add-establishment"),
            Decision::RedirectTo("/home".into())
        );
    }

    #[test]
    fn client_on_management_route_falls_back_to_establishment() {
        let actor = Actor::User(profile(Role::Client, 1));
        assert_eq!(
            eval(&actor, "/e/7/add-product"),
            Decision::RedirectTo("/e/7".into())
        );
    }

    #[test]
    fn waiter_on_management_route_falls_back_to_establishment() {
        let actor = Actor::User(waiter(1, Some(7)));
        assert_eq!(
            eval(&actor, "/e/7/add-waiter"),
            Decision::RedirectTo("/e/7".into())
        );
    }

    #[test]
    fn owner_management_requires_ownership() {
        let actor = Actor::User(profile(Role::Owner, 42));
        let owned = OwnershipFacts {
            establishment_owner: Some(42),
        };
        let foreign = OwnershipFacts {
            establishment_owner: Some(9),
        };
        assert_eq!(
            evaluate(&actor, &route("/e/3/edit"), &owned),
            Decision::Allow
        );
        assert_eq!(
            evaluate(&actor, &route("/e/9/edit"), &foreign),
            Decision::RedirectTo("/home".into())
        );
    }

    #[test]
    fn owner_tables_listing_requires_ownership() {
        let actor = Actor::User(profile(Role::Owner, 42));
        let foreign = OwnershipFacts {
            establishment_owner: Some(9),
        };
        assert_eq!(
            evaluate(&actor, &route("/e/9/tables"), &foreign),
            Decision::RedirectTo("/home".into())
        );
    }

    #[test]
    fn waiter_tables_listing_requires_assignment() {
        let assigned = Actor::User(waiter(1, Some(7)));
        let elsewhere = Actor::User(waiter(1, Some(8)));
        let unassigned = Actor::User(waiter(1, None));
        assert_eq!(eval(&assigned, "/e/7/tables"), Decision::Allow);
        assert_eq!(
            eval(&elsewhere, "/e/7/tables"),
            Decision::RedirectTo("/home".into())
        );
        assert_eq!(
            eval(&unassigned, "/e/7/tables"),
            Decision::RedirectTo("/home".into())
        );
    }

    #[test]
    fn admin_passes_everywhere() {
        let actor = Actor::User(profile(Role::Admin, 1));
        assert_eq!(eval(&actor, "/e/7/add-product"), Decision::Allow);
        assert_eq!(eval(&actor, "/e/7/tables"), Decision::Allow);
        assert_eq!(eval(&actor, "/add-establishment"), Decision::Allow);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let actor = Actor::User(profile(Role::Owner, 42));
        let facts = OwnershipFacts {
            establishment_owner: Some(42),
        };
        let parsed = route("/e/3/edit");
        let first = evaluate(&actor, &parsed, &facts);
        for _ in 0..10 {
            assert_eq!(evaluate(&actor, &parsed, &facts), first);
        }
    }

    #[test]
    fn session_gate_per_role() {
        let admin = profile(Role::Admin, 1);
        let owner = profile(Role::Owner, 10);
        let client = profile(Role::Client, 42);
        let stranger = profile(Role::Client, 43);

        assert!(can_view_session(&admin, 7, 10, Some(42)));
        assert!(can_view_session(&owner, 7, 10, Some(42)));
        assert!(!can_view_session(&profile(Role::Owner, 11), 7, 10, Some(42)));
        assert!(can_view_session(&waiter(5, Some(7)), 7, 10, Some(42)));
        assert!(!can_view_session(&waiter(5, Some(8)), 7, 10, Some(42)));
        assert!(!can_view_session(&waiter(5, None), 7, 10, Some(42)));
        assert!(can_view_session(&client, 7, 10, Some(42)));
        assert!(!can_view_session(&stranger, 7, 10, Some(42)));
        assert!(!can_view_session(&client, 7, 10, None));
    }
}
