//! HTTP handlers for the glassfeed service.
//!
//! Browser routes resolve the signed-in user from the session cookie and
//! send anonymous visitors through the timeline OAuth flow.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use super::operations::{self, OperationForm};
use super::page::{render_index, IndexView};
use super::session;
use crate::accounts;
use crate::actions::{handle_action, ActionNotification, ActionOutcome};
use crate::crypto::SignedPurpose;
use crate::error::AppError;
use crate::providers::OAuthProvider;
use crate::store::Service;
use crate::sync::{refresh_cycle, SyncContext};
use crate::SharedState;

pub fn app_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index).post(run_operation))
        .route("/feeds", get(refresh_feeds))
        .route("/subscriptions", axum::routing::post(notifications))
        .route("/auth", get(auth_start))
        .route("/oauth2callback", get(auth_callback))
        .route("/signout", get(signout))
        .route("/status", get(status))
        .with_state(state)
}

async fn status() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "glassfeed",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// Index page
// =============================================================================

#[derive(Deserialize)]
struct IndexQuery {
    code: Option<String>,
    state: Option<String>,
}

/// GET /: show the index page, or finish connecting the feed account.
async fn index(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(q): Query<IndexQuery>,
) -> Result<Response, AppError> {
    let Some(user_id) = session::current_user(&state.crypto, &headers) else {
        return Ok(Redirect::to("/auth").into_response());
    };
    let Some(timeline) = accounts::timeline_client(&state, &user_id).await? else {
        return Ok(Redirect::to("/auth").into_response());
    };

    if let Some(code) = q.code.as_deref() {
        let signed = q.state.as_deref().ok_or(AppError::InvalidState)?;
        if state.crypto.verify(SignedPurpose::FeedState, signed)? != user_id {
            return Err(AppError::InvalidState);
        }

        let tokens = state
            .feed_auth
            .exchange_code(code, &state.config.feed_callback_url())
            .await?;
        accounts::save_tokens(state.store.as_ref(), Service::Feed, &user_id, &tokens).await?;
        info!(user_id = %user_id, "feed account connected");
        state.flash.set(&user_id, "Feed account connected.").await;
        return Ok(Redirect::to("/").into_response());
    }

    let message = state.flash.take(&user_id).await;
    let view = IndexView::load(&state, &timeline, &user_id, message).await?;
    Ok(Html(render_index(&view)).into_response())
}

/// POST /: run one form operation and bounce back to the index page.
async fn run_operation(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(form): Form<OperationForm>,
) -> Result<Response, AppError> {
    let Some(user_id) = session::current_user(&state.crypto, &headers) else {
        return Ok(Redirect::to("/auth").into_response());
    };
    let Some(timeline) = accounts::timeline_client(&state, &user_id).await? else {
        return Ok(Redirect::to("/auth").into_response());
    };

    let message = match operations::run(&state, &timeline, &user_id, &form).await {
        Ok(message) => message,
        Err(e) => {
            warn!(user_id = %user_id, operation = %form.operation, "operation failed: {e}");
            format!("Operation {} failed: {e}", form.operation)
        }
    };
    state.flash.set(&user_id, message).await;
    Ok(Redirect::to("/").into_response())
}

// =============================================================================
// Sync
// =============================================================================

/// GET /feeds: run a refresh cycle for the signed-in user.
async fn refresh_feeds(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let Some(user_id) = session::current_user(&state.crypto, &headers) else {
        return Ok(Redirect::to("/auth").into_response());
    };
    let Some(timeline) = accounts::timeline_client(&state, &user_id).await? else {
        return Ok(Redirect::to("/auth").into_response());
    };
    let Some(feed) = accounts::feed_client(&state, &user_id).await? else {
        return Ok(Json(json!({ "status": "skipped", "reason": "feed account not connected" }))
            .into_response());
    };

    let ctx = SyncContext {
        user_id: &user_id,
        timeline: &timeline,
        feed: &feed,
        store: state.store.as_ref(),
        http: &state.http,
        settings: &state.sync,
    };
    let report = refresh_cycle(&ctx).await?;

    Ok(Json(json!({
        "status": "ok",
        "subscribed": report.subscribed,
        "staleDeleted": report.stale_deleted,
        "coverId": report.sentinels.cover_id,
        "refreshId": report.sentinels.refresh_id,
        "fetched": report.import.fetched,
        "inserted": report.import.cards.success,
        "failed": report.import.cards.failure,
        "markedRead": report.import.marked_read,
    }))
    .into_response())
}

/// POST /subscriptions: action notifications from the timeline service.
///
/// Always answers 200 so the service does not retry; failures are logged.
async fn notifications(State(state): State<SharedState>, body: Bytes) -> StatusCode {
    let notification: ActionNotification = match serde_json::from_slice(&body) {
        Ok(n) => n,
        Err(e) => {
            warn!("ignoring malformed notification: {e}");
            return StatusCode::OK;
        }
    };

    if let Err(e) = dispatch(&state, &notification).await {
        error!(user_id = %notification.user_token, "notification handling failed: {e}");
    }
    StatusCode::OK
}

async fn dispatch(state: &SharedState, notification: &ActionNotification) -> Result<(), AppError> {
    let user_id = notification.user_token.as_str();
    let Some(item_id) = notification.item_id.as_deref() else {
        info!(user_id, "notification without item id, ignoring");
        return Ok(());
    };

    let (Some(timeline), Some(feed)) = (
        accounts::timeline_client(state, user_id).await?,
        accounts::feed_client(state, user_id).await?,
    ) else {
        info!(user_id, "notification for user without both accounts, ignoring");
        return Ok(());
    };

    let ctx = SyncContext {
        user_id,
        timeline: &timeline,
        feed: &feed,
        store: state.store.as_ref(),
        http: &state.http,
        settings: &state.sync,
    };

    for action in notification.actions() {
        match handle_action(&ctx, item_id, action).await {
            Ok(ActionOutcome::Ignored(reason)) => info!(user_id, item_id, reason, "action ignored"),
            Ok(outcome) => info!(user_id, item_id, ?outcome, "action handled"),
            Err(e) => error!(user_id, item_id, ?action, "action failed: {e}"),
        }
    }
    Ok(())
}

// =============================================================================
// Timeline sign-in
// =============================================================================

/// GET /auth: start the timeline OAuth flow.
async fn auth_start(State(state): State<SharedState>) -> Result<Response, AppError> {
    let signed_state = state.crypto.sign(SignedPurpose::TimelineState, "")?;
    let url = state
        .timeline_auth
        .auth_url(&signed_state, &state.config.timeline_callback_url());
    Ok(Redirect::temporary(&url).into_response())
}

#[derive(Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// GET /oauth2callback: finish sign-in and start a session.
async fn auth_callback(
    State(state): State<SharedState>,
    Query(q): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    if let Some(err) = q.error {
        return Err(AppError::FlowError(err));
    }
    let signed = q.state.as_deref().ok_or(AppError::InvalidState)?;
    state.crypto.verify(SignedPurpose::TimelineState, signed)?;
    let code = q
        .code
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("missing code".into()))?;

    let tokens = state
        .timeline_auth
        .exchange_code(code, &state.config.timeline_callback_url())
        .await?;
    let user_id = state.timeline_auth.user_id(&tokens.access_token).await?;
    accounts::save_tokens(state.store.as_ref(), Service::Timeline, &user_id, &tokens).await?;
    info!(user_id = %user_id, "timeline account connected");

    let cookie = session::session_cookie(&state.crypto, &user_id)?;
    Ok(([(SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}

/// GET /signout: drop the session cookie.
async fn signout() -> Response {
    (
        [(SET_COOKIE, session::cleared_cookie())],
        Redirect::to("/auth"),
    )
        .into_response()
}
