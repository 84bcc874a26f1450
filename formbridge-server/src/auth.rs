//! OAuth login flow and the per-request caller extractor.

use axum::Router;
use axum::extract::{FromRequestParts, Query, State};
use axum::http::request::Parts;
use axum::response::{Json, Redirect};
use axum::routing::get;
use axum_extra::extract::cookie::CookieJar;
use formbridge::accounts::sync_current_user;
use formbridge::core::pkce::{generate_challenge_pair, generate_state, verify_state};
use formbridge::error::AuthorizationError;
use formbridge::io::oauth::AccessToken;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::error::ApiError;
use crate::session::{PendingAuthorization, removal_cookie, session_cookie, session_id};
use crate::state::AppState;

/// Routes mounted under `/api/v1/auth/airtable`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/me", get(me))
        .route("/logout", get(logout))
}

/// A request from a session holding an access token. Rejects with 401 otherwise.
pub struct Caller {
    pub session_id: String,
    pub token: AccessToken,
    user_id: Option<String>,
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let session_id = session_id(&jar).ok_or(AuthorizationError::NotLoggedIn)?;
        let session = state
            .sessions
            .get(&session_id)
            .await
            .ok_or(AuthorizationError::NotLoggedIn)?;
        let token = session.access_token.ok_or(AuthorizationError::NotLoggedIn)?;
        Ok(Self {
            session_id,
            token,
            user_id: session.user_id,
        })
    }
}

impl Caller {
    /// Local user id, syncing the remote account on first use in a session.
    pub async fn user_id(&self, state: &AppState) -> Result<String, ApiError> {
        if let Some(user_id) = &self.user_id {
            return Ok(user_id.clone());
        }
        let user = sync_current_user(&state.store, state.remote.as_ref(), &self.token).await?;
        let user_id = user.id.clone();
        state
            .sessions
            .update(&self.session_id, |session| session.user_id = Some(user.id))
            .await;
        Ok(user_id)
    }
}

/// GET /login - start an authorization and redirect to the provider.
async fn login(State(state): State<AppState>, jar: CookieJar) -> Result<(CookieJar, Redirect), ApiError> {
    let id = state.sessions.ensure(session_id(&jar).as_deref()).await;
    let pair = generate_challenge_pair();
    let oauth_state = generate_state();
    let url = state.oauth.authorization_url(&pair.challenge, &oauth_state)?;

    state
        .sessions
        .update(&id, |session| {
            session.pending = Some(PendingAuthorization {
                state: oauth_state,
                verifier: pair.verifier,
            });
        })
        .await;
    info!("redirecting to authorization endpoint");

    let jar = jar.add(session_cookie(id, state.config.server.secure_cookies));
    Ok((jar, Redirect::to(url.as_str())))
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// GET /callback - verify state, exchange the code and keep the tokens under
/// a new session id.
async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let id = session_id(&jar);
    // Taken before any check, so a pending authorization is never reused.
    let pending = match &id {
        Some(id) => state.sessions.take_pending(id).await,
        None => None,
    };

    if let Some(error) = params.error {
        return Err(AuthorizationError::Provider {
            error,
            description: params.error_description,
        }
        .into());
    }
    verify_state(
        pending.as_ref().map(|pending| pending.state.as_str()),
        params.state.as_deref(),
    )?;
    let code = params
        .code
        .filter(|code| !code.is_empty())
        .ok_or(AuthorizationError::MissingCode)?;
    let (Some(id), Some(pending)) = (id, pending) else {
        return Err(AuthorizationError::MissingVerifier.into());
    };

    let tokens = state.oauth.exchange_code(&code, &pending.verifier).await?;
    let id = state.sessions.authenticate(&id, tokens.access_token).await;
    info!("authorization completed");

    let jar = jar.add(session_cookie(id, state.config.server.secure_cookies));
    Ok((jar, Redirect::to(&state.config.server.frontend_url)))
}

/// GET /me - the account behind the session, refreshed from the provider.
async fn me(State(state): State<AppState>, caller: Caller) -> Result<Json<Value>, ApiError> {
    let user = sync_current_user(&state.store, state.remote.as_ref(), &caller.token).await?;
    let user_id = user.id.clone();
    state
        .sessions
        .update(&caller.session_id, |session| session.user_id = Some(user_id))
        .await;
    Ok(Json(json!({
        "userId": user.id,
        "airtableUserId": user.airtable_user_id,
        "email": user.email,
        "name": user.name,
    })))
}

/// GET /logout - drop every piece of session state and the cookie.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    if let Some(id) = session_id(&jar) {
        state.sessions.remove(&id).await;
    }
    (
        jar.remove(removal_cookie()),
        Json(json!({ "message": "Logged out successfully" })),
    )
}
