use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::models::auth::AuthenticatedUser;
use crate::AppState;

/// Whether `email` is the configured administrator. Comparison ignores case and
/// surrounding whitespace; with no administrator configured nobody is one.
pub fn is_admin(email: &str, admin_email: Option<&str>) -> bool {
    match admin_email.map(str::trim).filter(|a| !a.is_empty()) {
        Some(admin) => email.trim().eq_ignore_ascii_case(admin),
        None => false,
    }
}

/// Extractor for routes only the administrator may use (the finance module).
pub struct AdminUser(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !is_admin(&user.email, state.config.admin_email.as_deref()) {
            tracing::warn!("user {} denied admin route {}", user.user_id, parts.uri.path());
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_admin_ignores_case_and_whitespace() {
        assert!(is_admin("Admin@Example.com", Some("admin@example.com")));
        assert!(is_admin(" admin@example.com ", Some("ADMIN@example.com ")));
    }

    #[test]
    fn test_is_admin_is_exact() {
        assert!(!is_admin("admin@example.com.evil", Some("admin@example.com")));
        assert!(!is_admin("someone@example.com", Some("admin@example.com")));
    }

    #[test]
    fn test_nobody_is_admin_without_configuration() {
        assert!(!is_admin("admin@example.com", None));
        assert!(!is_admin("", Some("  ")));
    }
}
