use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{EstablishmentRef, Role};

/// Claims carried by the access credential issued by the auth provider.
///
/// A token minted at signup has no settled role yet; a missing `roles`
/// claim reads as PENDING, same as the provider encodes it.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "pending_role")]
    pub roles: Role,
    #[serde(default)]
    pub establishment: Option<EstablishmentRef>,
    pub exp: usize,
}

fn pending_role() -> Role {
    Role::Pending
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
}
