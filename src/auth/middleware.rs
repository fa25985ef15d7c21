use axum::{
    extract::{MatchedPath, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use super::policy::{self, Resource, Rule};
use super::types::{Principal, TokenKind};
use crate::shared::{AppError, AppState};

/// Authenticates and authorizes every routed request against the access table.
/// Usage: `.route_layer(middleware::from_fn_with_state(state.clone(), auth::authorize))`.
/// Handlers behind it can extract `Extension<Principal>`.
#[instrument(skip_all, fields(method = %req.method(), path = %req.uri().path()))]
pub async fn authorize(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let rule = policy::rule_for(req.method(), &route);
    if rule == Rule::Public {
        return Ok(next.run(req).await);
    }

    let principal = {
        let token = bearer_token(req.headers())?;
        authenticate_token(&state, token)?
    };

    let path_id = policy::path_param(&route, req.uri().path(), "id")
        .and_then(|raw| raw.parse::<i64>().ok());

    let owners = match (rule, path_id) {
        (Rule::AdminOrSelf, Some(id)) => vec![id],
        (Rule::AdminOrOwner(resource), Some(id)) if !principal.is_admin() => {
            resolve_owners(&state, resource, id).await?
        }
        _ => Vec::new(),
    };

    if let Err(e) = policy::evaluate(rule, &principal, &owners) {
        warn!(user_id = principal.user_id, rule = ?rule, "Access denied");
        return Err(e);
    }

    debug!(user_id = principal.user_id, "Request authorized");
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Verifies a raw access token and turns its claims into a principal
pub fn authenticate_token(state: &AppState, token: &str) -> Result<Principal, AppError> {
    match state.token_codec.verify(token, TokenKind::Access) {
        Ok(claims) => Ok(Principal::from(claims)),
        Err(e) => {
            warn!(error = %e, "Access token rejected");
            Err(e)
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            warn!("Missing Authorization header in request");
            AppError::Unauthorized("Missing authorization header".to_string())
        })?;

    header.strip_prefix("Bearer ").ok_or_else(|| {
        warn!("Invalid Authorization header format (expected Bearer token)");
        AppError::Unauthorized("Invalid authorization header format".to_string())
    })
}

/// User ids that own the record; empty when it does not exist
async fn resolve_owners(
    state: &AppState,
    resource: Resource,
    id: i64,
) -> Result<Vec<i64>, AppError> {
    let repos = &state.repositories;
    let owners = match resource {
        Resource::TranslatorProfile => repos
            .translator_profiles
            .get_profile(id)
            .await?
            .map(|p| vec![p.user_id]),
        Resource::UserProfile => repos
            .user_profiles
            .get_profile(id)
            .await?
            .map(|p| vec![p.user_id]),
        Resource::Deposit => repos.deposits.get_deposit(id).await?.map(|d| vec![d.user_id]),
        Resource::Withdrawal => repos
            .withdrawals
            .get_withdrawal(id)
            .await?
            .map(|w| vec![w.user_id]),
        Resource::Rating => repos.ratings.get_rating(id).await?.map(|r| vec![r.user_id]),
        Resource::Call => repos
            .calls
            .get_call(id)
            .await?
            .map(|c| vec![c.caller_id, c.recipient_id]),
    };
    Ok(owners.unwrap_or_default())
}
