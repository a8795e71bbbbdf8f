//! Admin order handlers.

use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use maison_core::{OrderId, OrderStatus};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::db::RepositoryError;
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Status change form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    #[serde(default)]
    pub status: Option<String>,
}

/// Parse a submitted status. A missing value means [`OrderStatus::New`].
fn parse_status(value: Option<&str>) -> Result<OrderStatus, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(OrderStatus::New),
        Some(value) => value
            .parse()
            .map_err(|_| AppError::BadRequest(format!("unknown order status: {value}"))),
    }
}

/// Change an order's status and return to the dashboard.
#[instrument(skip_all, fields(order_id = %id))]
pub async fn update_status(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect, AppError> {
    let status = parse_status(form.status.as_deref())?;

    match state.orders().update_status(id, status).await {
        Ok(()) => {
            info!(status = status.as_str(), "Order status updated");
            Ok(Redirect::to("/admin"))
        }
        Err(RepositoryError::NotFound) => Err(AppError::NotFound(format!("order {id}"))),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status(None).unwrap(), OrderStatus::New);
        assert_eq!(parse_status(Some(" ")).unwrap(), OrderStatus::New);
        assert_eq!(parse_status(Some("completed")).unwrap(), OrderStatus::Completed);
        assert!(matches!(
            parse_status(Some("shipped")),
            Err(AppError::BadRequest(_))
        ));
    }
}
