//! Admin authentication extractors.
//!
//! The admin is a single shared account unlocked by `ADMIN_PASSWORD`. A
//! successful login stores a [`CurrentAdmin`] in the server-side session.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentAdmin, session_keys};

/// Path unauthenticated admin requests are sent to.
pub const ADMIN_LOGIN_PATH: &str = "/admin/login";

/// Extractor that requires an admin session.
///
/// Without one the request is redirected to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn dashboard(RequireAdmin(admin): RequireAdmin) -> impl IntoResponse {
///     format!("Signed in since {}", admin.logged_in_at)
/// }
/// ```
pub struct RequireAdmin(pub CurrentAdmin);

/// Rejection for [`RequireAdmin`].
pub struct AdminRejection;

impl IntoResponse for AdminRejection {
    fn into_response(self) -> Response {
        Redirect::to(ADMIN_LOGIN_PATH).into_response()
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AdminRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_admin(parts).await.map(Self).ok_or(AdminRejection)
    }
}

/// Extractor that optionally gets the admin session.
///
/// Used by the login page to skip straight to the dashboard.
pub struct OptionalAdmin(pub Option<CurrentAdmin>);

impl<S> FromRequestParts<S> for OptionalAdmin
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_admin(parts).await))
    }
}

async fn current_admin(parts: &Parts) -> Option<CurrentAdmin> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await
        .ok()
        .flatten()
}

/// Mark the session as an admin session.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// End the admin session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be deleted.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
