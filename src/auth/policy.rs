use axum::http::Method;

use super::types::Principal;
use crate::shared::AppError;
use crate::user::models::Role;

/// Records whose owner is looked up before an `AdminOrOwner` route runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    TranslatorProfile,
    UserProfile,
    Deposit,
    Withdrawal,
    Rating,
    Call,
}

/// Access requirement attached to a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Public,
    Authenticated,
    Admin,
    AdminOrTranslator,
    /// The `:id` path segment is a user id that must be the caller's
    AdminOrSelf,
    /// The caller must own the record named by the `:id` path segment
    AdminOrOwner(Resource),
}

/// Maps a matched route pattern to its rule. Unlisted routes need a valid token.
pub fn rule_for(method: &Method, route: &str) -> Rule {
    use Resource::*;
    use Rule::*;

    match (method.as_str(), route) {
        (_, "/auth/login" | "/auth/refresh_token" | "/health" | "/ws") => Public,
        ("POST", "/auth/logout") => Authenticated,

        ("GET" | "POST", "/api/users") => Admin,
        ("GET", "/api/users/me") => Authenticated,
        ("GET" | "PUT", "/api/users/:id") => AdminOrSelf,
        ("DELETE", "/api/users/:id") => Admin,

        ("POST", "/api/translator-profiles") => AdminOrTranslator,
        (
            "GET",
            "/api/translator-profiles"
            | "/api/translator-profiles/:id"
            | "/api/translator-profiles/available/theme/:theme_id",
        ) => Authenticated,
        (
            "PUT" | "PATCH",
            "/api/translator-profiles/:id"
            | "/api/translator-profiles/:id/availability"
            | "/api/translator-profiles/:id/online-status",
        ) => AdminOrOwner(TranslatorProfile),
        ("DELETE", "/api/translator-profiles/:id") => Admin,

        ("GET" | "POST", "/api/user-profiles") => Admin,
        ("GET" | "PUT", "/api/user-profiles/:id") => AdminOrOwner(UserProfile),
        ("DELETE", "/api/user-profiles/:id") => Admin,

        ("GET", "/api/deposits") => Admin,
        ("POST", "/api/deposits") => Authenticated,
        ("GET", "/api/deposits/:id") => AdminOrOwner(Deposit),
        ("PUT" | "DELETE", "/api/deposits/:id") => Admin,

        ("GET", "/api/withdrawals") => Admin,
        ("POST", "/api/withdrawals") => Authenticated,
        ("GET", "/api/withdrawals/:id") => AdminOrOwner(Withdrawal),
        ("PUT" | "DELETE", "/api/withdrawals/:id") => Admin,

        ("GET" | "POST", "/api/ratings") => Authenticated,
        ("GET", "/api/ratings/:id") => Authenticated,
        ("PUT" | "DELETE", "/api/ratings/:id") => AdminOrOwner(Rating),

        ("GET", "/api/calls") => Admin,
        ("POST", "/api/calls") => Authenticated,
        ("GET" | "PUT", "/api/calls/:id") => AdminOrOwner(Call),
        ("DELETE", "/api/calls/:id") => Admin,

        ("GET", "/api/languages" | "/api/themes") => Authenticated,
        ("POST", "/api/languages" | "/api/themes") => Admin,

        _ => Authenticated,
    }
}

/// Allows or denies an authenticated caller. `owners` holds the user ids that
/// satisfy `AdminOrSelf`/`AdminOrOwner`.
pub fn evaluate(rule: Rule, principal: &Principal, owners: &[i64]) -> Result<(), AppError> {
    let allowed = match rule {
        Rule::Public | Rule::Authenticated => true,
        Rule::Admin => principal.is_admin(),
        Rule::AdminOrTranslator => principal.is_admin() || principal.has_role(Role::Translator),
        Rule::AdminOrSelf | Rule::AdminOrOwner(_) => {
            principal.is_admin() || owners.contains(&principal.user_id)
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::AccessDenied("Access is denied".to_string()))
    }
}

/// The user a create request acts for: admins may name anyone, everyone else only themselves
pub fn acting_user(principal: &Principal, requested: Option<i64>) -> Result<i64, AppError> {
    match requested {
        None => Ok(principal.user_id),
        Some(id) if id == principal.user_id || principal.is_admin() => Ok(id),
        Some(_) => Err(AppError::AccessDenied(
            "Cannot act on behalf of another user".to_string(),
        )),
    }
}

/// Reads a named segment of a concrete path given its route pattern
pub fn path_param<'a>(route: &str, path: &'a str, name: &str) -> Option<&'a str> {
    route
        .split('/')
        .zip(path.split('/'))
        .find(|(segment, _)| segment.strip_prefix(':') == Some(name))
        .map(|(_, value)| value)
}
