//! Session-related types.
//!
//! Only the admin panel uses server-side sessions; shoppers carry their cart
//! in a signed cookie instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session-stored admin identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// When the password was accepted.
    pub logged_in_at: DateTime<Utc>,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";
}
