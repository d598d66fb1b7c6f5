use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Query, RawQuery, State, rejection::JsonRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{info, warn};
use url::form_urlencoded;

use crate::navigation::{SECONDARY_STEP, decode_error};
use crate::{
    CallbackParams, CredentialComposer, ExchangeRequest, ExchangeResponse, GoogleProvider,
    Navigation, RelayClient, RelayError, SessionStore,
};

use super::pages;

#[derive(Clone)]
pub(super) struct AppState {
    pub(super) client: Arc<RelayClient<GoogleProvider>>,
    pub(super) sessions: SessionStore,
}

impl AppState {
    fn composer(&self) -> CredentialComposer<'_, GoogleProvider> {
        CredentialComposer::new(self.client.as_ref(), &self.sessions)
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SubmitForm {
    flow: String,
    #[serde(default)]
    apify_token: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct RestartForm {
    flow: String,
}

pub(super) async fn home_handler() -> impl IntoResponse {
    Html(pages::home())
}

pub(super) async fn authorize_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Response {
    let query = query.unwrap_or_default();
    if let Some(error) = decode_error(&query) {
        return Html(pages::sign_in("", Some(&error))).into_response();
    }

    if let Some(flow_id) = secondary_flow_id(&query) {
        if let Some(response) = render_secondary(&state, &flow_id, None, StatusCode::OK) {
            return response;
        }
        return Html(pages::sign_in("", None)).into_response();
    }

    Html(pages::sign_in(&query, None)).into_response()
}

pub(super) async fn start_google_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Response {
    let query = query.unwrap_or_default();
    match state.client.authorization_url(&query) {
        Ok(request) => {
            info!("redirecting to provider consent screen");
            Redirect::to(&request.authorization_url).into_response()
        }
        Err(error) => {
            warn!(%error, "cannot start authorization");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(pages::sign_in(&query, Some(&error.user_message()))),
            )
                .into_response()
        }
    }
}

pub(super) async fn callback_handler(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    if let Some(error) = params.error {
        warn!(%error, "provider returned an authorization error");
        return redirect(Navigation::error(&error));
    }

    let original_query = params.state.clone().unwrap_or_default();
    let request = ExchangeRequest {
        code: params.code,
        state: params.state,
    };

    let navigation = match state.client.exchange(request).await {
        Ok(exchange) => match state.sessions.start(&original_query, exchange) {
            Ok(session) => Navigation::secondary_step(&session.id),
            Err(error) => Navigation::error(&error.user_message()),
        },
        Err(error) => {
            warn!(%error, "token exchange failed");
            Navigation::error(&error.user_message())
        }
    };
    redirect(navigation)
}

pub(super) async fn exchange_handler(
    State(state): State<AppState>,
    payload: Result<Json<ExchangeRequest>, JsonRejection>,
) -> Json<ExchangeResponse> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return Json(ExchangeResponse::failure(rejection.body_text())),
    };

    match state.client.exchange(request).await {
        Ok(exchange) => Json(exchange.into()),
        Err(error) => {
            warn!(%error, "token exchange failed");
            Json(ExchangeResponse::failure(error.user_message()))
        }
    }
}

pub(super) async fn submit_handler(
    State(state): State<AppState>,
    Form(form): Form<SubmitForm>,
) -> Response {
    let error = match state.composer().submit(&form.flow, &form.apify_token).await {
        Ok(navigation) => return redirect(navigation).into_response(),
        Err(error) => error,
    };

    warn!(%error, "credential submission failed");
    let status = match error {
        RelayError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::BAD_GATEWAY,
    };
    let message = error.user_message();
    render_secondary(&state, &form.flow, Some(&message), status)
        .unwrap_or_else(|| redirect(Navigation::error(&message)).into_response())
}

pub(super) async fn restart_handler(
    State(state): State<AppState>,
    Form(form): Form<RestartForm>,
) -> Redirect {
    redirect(state.composer().restart(&form.flow))
}

pub(super) async fn health_handler() -> &'static str {
    "ok"
}

pub(super) async fn fallback_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Html(pages::NOT_FOUND_HTML))
}

fn redirect(navigation: Navigation) -> Redirect {
    Redirect::to(&navigation.location)
}

fn secondary_flow_id(query: &str) -> Option<String> {
    let mut step = None;
    let mut flow = None;
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "step" => step = Some(value.into_owned()),
            "flow" => flow = Some(value.into_owned()),
            _ => {}
        }
    }
    match step.as_deref() {
        Some(SECONDARY_STEP) => flow,
        _ => None,
    }
}

fn render_secondary(
    state: &AppState,
    flow_id: &str,
    error: Option<&str>,
    status: StatusCode,
) -> Option<Response> {
    let session = state.sessions.get(flow_id)?;
    let (_, profile) = session.state.credentials()?;
    let html = pages::secondary_token(flow_id, profile, error);
    Some((status, Html(html)).into_response())
}
