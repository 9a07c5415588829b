//! OAuth connect flow.
//!
//! `authorize` stores a single-use `state` (plus a PKCE verifier where the
//! provider wants one) and sends the browser to the provider. `callback`
//! consumes that state, exchanges the code and connects the account with the
//! granted tokens. The callback is reached by the provider redirect, so it
//! sits outside bearer auth and relies on the stored state instead.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Redirect,
    Extension, Json,
};
use serde::Deserialize;
use socdash_core::Platform;
use socdash_platforms::{oauth, ConnectError, Credential, NewConnection};

use crate::middleware::RequestId;

use super::accounts::AccountItem;
use super::{map_connect_error, map_db_error, parse_platform, resolve_user, ApiError, ApiResponse, AppState};

fn redirect_uri(public_base_url: &str, platform: Platform) -> String {
    format!(
        "{}/api/v1/oauth/{platform}/callback",
        public_base_url.trim_end_matches('/')
    )
}

fn require_configured(state: &AppState, req_id: &str, platform: Platform) -> Result<(), ApiError> {
    if state.clients.oauth.is_configured(platform) {
        Ok(())
    } else {
        Err(ApiError::new(
            req_id,
            "validation_error",
            format!("OAuth is not configured for {platform}"),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct AuthorizeQuery {
    pub user_id: Option<String>,
}

pub(super) async fn authorize(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(platform): Path<String>,
    Query(query): Query<AuthorizeQuery>,
) -> Result<Redirect, ApiError> {
    let rid = &req_id.0;
    let platform = parse_platform(rid, &platform)?;
    require_configured(&state, rid, platform)?;

    let user_id = query.user_id.ok_or_else(|| {
        ApiError::new(rid, "validation_error", "query parameter 'user_id' is required")
    })?;
    let user = resolve_user(&state.pool, &user_id, rid).await?;

    let csrf_state = socdash_platforms::generate_state();
    let code_verifier = oauth::provider(platform)
        .is_some_and(|p| p.pkce)
        .then(socdash_platforms::generate_code_verifier);

    let url = state
        .clients
        .oauth
        .authorize_url(
            platform,
            &redirect_uri(&state.public_base_url, platform),
            &csrf_state,
            code_verifier.as_deref(),
        )
        .map_err(|e| map_connect_error(rid, &ConnectError::from(e), platform.as_str()))?;

    socdash_db::insert_oauth_state(
        &state.pool,
        &csrf_state,
        user.id,
        platform.as_str(),
        code_verifier.as_deref(),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(request_id = %rid, user_id = %user.public_id, %platform, "oauth authorize started");
    Ok(Redirect::to(url.as_str()))
}

#[derive(Debug, Deserialize)]
pub(super) struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

pub(super) async fn callback(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(platform): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Result<(StatusCode, Json<ApiResponse<AccountItem>>), ApiError> {
    let rid = &req_id.0;
    let platform = parse_platform(rid, &platform)?;

    if let Some(error) = query.error {
        let detail = query.error_description.unwrap_or_default();
        tracing::info!(request_id = %rid, %platform, error = %error, detail = %detail, "oauth authorization denied");
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!("authorization was not granted: {error}"),
        ));
    }
    let (Some(code), Some(csrf_state)) = (query.code, query.state) else {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "query parameters 'code' and 'state' are required",
        ));
    };

    let pending = socdash_db::take_oauth_state(&state.pool, &csrf_state)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid, "validation_error", "invalid or expired state"))?;
    if pending.platform != platform.as_str() {
        tracing::warn!(request_id = %rid, expected = %pending.platform, got = %platform, "oauth state used for another platform");
        return Err(ApiError::new(rid, "validation_error", "invalid or expired state"));
    }

    let grant = state
        .clients
        .oauth
        .exchange_code(
            platform,
            &code,
            &redirect_uri(&state.public_base_url, platform),
            pending.code_verifier.as_deref(),
        )
        .await
        .map_err(|e| map_connect_error(rid, &ConnectError::from(e), platform.as_str()))?;

    let row = socdash_platforms::connect(
        &state.pool,
        &state.clients,
        pending.user_id,
        NewConnection {
            platform,
            credential: Credential::AccessToken(grant.access_token),
            refresh_token: grant.refresh_token,
            token_expires_at: grant.expires_at,
        },
    )
    .await
    .map_err(|e| map_connect_error(rid, &e, platform.as_str()))?;

    tracing::info!(request_id = %rid, account_id = %row.public_id, %platform, "account connected via oauth");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(AccountItem::from_row(row), rid)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_uri_ignores_trailing_slash() {
        assert_eq!(
            redirect_uri("https://dash.example.com/", Platform::Twitter),
            "https://dash.example.com/api/v1/oauth/twitter/callback"
        );
        assert_eq!(
            redirect_uri("http://localhost:3000", Platform::Youtube),
            "http://localhost:3000/api/v1/oauth/youtube/callback"
        );
    }
}
