//! Admin login and logout.
//!
//! There is a single admin account whose password comes from `ADMIN_PASSWORD`.
//! A correct password marks the server-side session as an admin session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use super::AdminPage;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{OptionalAdmin, RequireAdmin, clear_current_admin, set_current_admin};
use crate::models::CurrentAdmin;
use crate::state::AppState;

/// Admin login page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/login.html")]
pub struct LoginTemplate {
    pub page: AdminPage,
    pub error: Option<String>,
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub password: String,
}

/// Compare a submitted password to the configured one in constant time.
///
/// Both sides are MACed under the expected password so the comparison is over
/// equal-length tags regardless of the submitted length.
#[must_use]
pub fn password_matches(expected: &SecretString, submitted: &str) -> bool {
    let key = expected.expose_secret().as_bytes();
    let tag = |message: &[u8]| {
        Hmac::<Sha256>::new_from_slice(key).map(|mut mac| {
            mac.update(message);
            mac
        })
    };

    let (Ok(expected_mac), Ok(submitted_mac)) = (tag(key), tag(submitted.as_bytes())) else {
        return false;
    };
    submitted_mac
        .verify_slice(&expected_mac.finalize().into_bytes())
        .is_ok()
}

/// Display the login page, or go to the dashboard when already signed in.
pub async fn login_page(
    State(state): State<AppState>,
    OptionalAdmin(admin): OptionalAdmin,
) -> Response {
    if admin.is_some() {
        return Redirect::to("/admin").into_response();
    }
    LoginTemplate {
        page: AdminPage::new(&state, "Admin Login", false),
        error: None,
    }
    .into_response()
}

/// Check the password and start an admin session.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if !password_matches(&state.config().admin_password, &form.password) {
        warn!("Failed admin login attempt");
        let page = LoginTemplate {
            page: AdminPage::new(&state, "Admin Login", false),
            error: Some("Invalid password.".to_string()),
        };
        return Ok((StatusCode::UNAUTHORIZED, page).into_response());
    }

    set_current_admin(
        &session,
        &CurrentAdmin {
            logged_in_at: Utc::now(),
        },
    )
    .await?;
    info!("Admin signed in");

    Ok(Redirect::to("/admin").into_response())
}

/// End the admin session.
#[instrument(skip_all)]
pub async fn logout(_admin: RequireAdmin, session: Session) -> Result<Redirect, AppError> {
    clear_current_admin(&session).await?;
    Ok(Redirect::to("/admin/login"))
}
