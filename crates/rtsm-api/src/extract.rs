//! # Credential Extraction
//!
//! Pulls Basic-auth credentials off the request. Handlers resolve the
//! credentials to an [`rtsm_service::Identity`] per request through the
//! service — there is no session object and no cached scope.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::authorization::Basic;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;

use rtsm_core::RtsmError;
use rtsm_service::Credentials;

use crate::error::AppError;
use crate::state::AppState;

/// The submitted credentials, extracted from the `Authorization` header.
///
/// A missing or malformed header is an authentication failure; whether
/// the credentials actually verify is decided by the service per
/// operation.
pub struct ActorCredentials(pub Credentials);

impl FromRequestParts<AppState> for ActorCredentials {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(basic)) =
            TypedHeader::<Authorization<Basic>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::from(RtsmError::Authentication))?;
        Ok(Self(Credentials {
            username: basic.username().to_string(),
            password: basic.password().to_string(),
        }))
    }
}
