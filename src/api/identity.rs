//! Identity inspection endpoints.

use axum::Json;
use serde::Serialize;

use crate::auth::{Auth, Identity, MaybeAuth};

#[derive(Serialize)]
pub struct MeResponse {
    pub authenticated: bool,
    pub identity: Option<Identity>,
}

/// Report who the caller resolved to. Anonymous callers get `identity: null`.
pub async fn me_handler(MaybeAuth(identity): MaybeAuth) -> Json<MeResponse> {
    Json(MeResponse {
        authenticated: identity.is_some(),
        identity,
    })
}

#[derive(Serialize)]
pub struct AdminResponse {
    pub level: i64,
    pub roles: Vec<String>,
}

pub async fn admin_handler(Auth(identity): Auth) -> Json<AdminResponse> {
    Json(AdminResponse {
        level: identity.level(),
        roles: identity.roles().into_iter().map(str::to_string).collect(),
    })
}
