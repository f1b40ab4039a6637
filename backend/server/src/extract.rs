use std::sync::Arc;

use axum::{
    extract::{FromRequest, FromRequestParts, Path},
    http::{header::AUTHORIZATION, request::Parts},
};
use ledger::{
    auth::{bearer_token, require_role},
    models::{Identity, Role},
};

use crate::{error::AppError, state::State};

/// JSON body whose rejections come back as `{error}` with a 400.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Payload<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct PathParams<T>(pub T);

/// Any signed-in user.
pub struct AuthUser(pub Identity);

/// A signed-in admin.
pub struct AdminUser(pub Identity);

impl FromRequestParts<Arc<State>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<State>) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let token = bearer_token(header)?;

        Ok(AuthUser(state.auth.verify(token)?))
    }
}

impl FromRequestParts<Arc<State>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<State>) -> Result<Self, Self::Rejection> {
        let AuthUser(identity) = AuthUser::from_request_parts(parts, state).await?;
        require_role(&identity, Role::Admin)?;

        Ok(AdminUser(identity))
    }
}
