//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Returns the content hash for a stylesheet in `static/css`.
///
/// The hashes are computed at build time from the CSS file content. Unknown
/// names yield an empty string.
///
/// Usage in templates: `{{ "main"|css_hash }}`
#[askama::filter_fn]
pub fn css_hash(name: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(stylesheet_hash(&name.to_string()))
}

fn stylesheet_hash(name: &str) -> &'static str {
    match name {
        "main" => env!("MAIN_CSS_HASH"),
        "admin" => env!("ADMIN_CSS_HASH"),
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_stylesheet_has_no_hash() {
        assert_eq!(stylesheet_hash("print"), "");
    }

    #[test]
    fn test_known_stylesheets_are_hashed_independently() {
        let main = stylesheet_hash("main");
        let admin = stylesheet_hash("admin");
        assert!(main.is_empty() || main.len() == 8);
        assert!(admin.is_empty() || admin.len() == 8);
    }
}
