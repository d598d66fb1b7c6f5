use reqwest::{
    Client, RequestBuilder,
    header::{HeaderName, HeaderValue},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::types::{BackendResponse, ProviderErrorResponse, UserInfo};
use crate::{
    AuthorizationRequest, CredentialBundle, Exchange, ExchangeRequest, OAuthProvider, Profile,
    RelayConfig, RelayError, TokenSet,
};

const MISSING_CLIENT_ID: &str =
    "Google Client ID not configured. Please check environment variables.";
const MISSING_CLIENT_SECRET: &str =
    "Google Client secret not configured. Please check environment variables.";
const MISSING_CODE: &str = "Authorization code is required";
const TOKEN_EXCHANGE_FAILED: &str = "Failed to exchange code for tokens";
const PROFILE_FETCH_FAILED: &str = "Failed to fetch user profile";
const HANDOFF_FAILED: &str = "An unknown error occurred on the server.";
const INVALID_REDIRECT: &str = "Backend returned an invalid redirect URL.";

#[derive(Debug, Clone)]
pub struct RelayClient<P: OAuthProvider> {
    provider: P,
    config: RelayConfig,
    http: Client,
}

impl<P: OAuthProvider> RelayClient<P> {
    pub fn new(provider: P, config: RelayConfig) -> Result<Self, RelayError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self {
            provider,
            config,
            http,
        })
    }

    pub fn with_http_client(provider: P, config: RelayConfig, http: Client) -> Self {
        Self {
            provider,
            config,
            http,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Builds the consent URL, carrying `original_query` through the OAuth `state`.
    pub fn authorization_url(
        &self,
        original_query: &str,
    ) -> Result<AuthorizationRequest, RelayError> {
        let client_id = self
            .config
            .client_id
            .as_deref()
            .ok_or_else(|| RelayError::Configuration(MISSING_CLIENT_ID.to_string()))?;
        let scope = self.provider.default_scope();

        let mut params: Vec<(String, String)> = vec![
            ("client_id".to_string(), client_id.to_string()),
            ("redirect_uri".to_string(), self.config.redirect_uri()),
            ("scope".to_string(), scope.to_string()),
            ("response_type".to_string(), "code".to_string()),
        ];
        params.extend(self.provider.authorize_params());
        params.push(("state".to_string(), original_query.to_string()));

        let mut url = Url::parse(self.provider.authorize_url())?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &params {
                pairs.append_pair(key, value);
            }
        }

        debug!(provider = self.provider.id(), url = %url, "built authorization url");

        Ok(AuthorizationRequest {
            authorization_url: url.to_string(),
            state: original_query.to_string(),
            scope: scope.to_string(),
        })
    }

    /// Trades an authorization code for tokens, then fetches the profile they unlock.
    pub async fn exchange(&self, request: ExchangeRequest) -> Result<Exchange, RelayError> {
        let code = request
            .code
            .filter(|code| !code.is_empty())
            .ok_or_else(|| RelayError::Validation(MISSING_CODE.to_string()))?;

        info!(provider = self.provider.id(), "exchanging authorization code for tokens");
        let tokens = self.exchange_code(&code).await?;
        info!("tokens received");

        let profile = self.fetch_profile(&tokens.access_token).await?;
        info!(sub = %profile.sub, "user profile retrieved");

        Ok(Exchange { tokens, profile })
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenSet, RelayError> {
        let client_secret = self
            .config
            .client_secret
            .as_deref()
            .ok_or_else(|| RelayError::Configuration(MISSING_CLIENT_SECRET.to_string()))?;
        let client_id = self
            .config
            .client_id
            .as_deref()
            .ok_or_else(|| RelayError::Configuration(MISSING_CLIENT_ID.to_string()))?;
        let redirect_uri = self.config.redirect_uri();

        let payload = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri.as_str()),
        ];

        let builder = self.http.post(self.provider.token_url());
        let builder = apply_headers(builder, &self.provider.token_headers())?;
        let response = builder.form(&payload[..]).send().await.map_err(exchange_failure)?;

        let status = response.status();
        let body = response.text().await.map_err(exchange_failure)?;

        if !status.is_success() {
            let error: ProviderErrorResponse = serde_json::from_str(&body).unwrap_or_default();
            warn!(
                status = status.as_u16(),
                error = error.error.as_deref().unwrap_or("unknown"),
                "token endpoint rejected the authorization code"
            );
            let message = error
                .error_description
                .unwrap_or_else(|| TOKEN_EXCHANGE_FAILED.to_string());
            return Err(RelayError::Exchange(message));
        }

        serde_json::from_str(&body).map_err(|err| {
            warn!(error = %err, "token endpoint returned an unreadable body");
            RelayError::Exchange(TOKEN_EXCHANGE_FAILED.to_string())
        })
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<Profile, RelayError> {
        let response = self
            .http
            .get(self.provider.userinfo_url())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(exchange_failure)?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "user-info endpoint returned an error");
            return Err(RelayError::Exchange(PROFILE_FETCH_FAILED.to_string()));
        }

        let info: UserInfo = response.json().await.map_err(|err| {
            warn!(error = %err, "user-info endpoint returned an unreadable body");
            RelayError::Exchange(PROFILE_FETCH_FAILED.to_string())
        })?;

        Ok(info.into())
    }

    /// Posts the bundle to the backend callback and returns the URL the backend
    /// wants the browser sent to.
    pub async fn hand_off(
        &self,
        bundle: &CredentialBundle,
        original_query: &str,
    ) -> Result<String, RelayError> {
        let mut url = Url::parse(&self.config.backend_callback_url())?;
        if !original_query.is_empty() {
            url.set_query(Some(original_query));
        }
        debug!(url = %url, "handing credential bundle to backend");

        let response = self.http.post(url).json(bundle).send().await?;
        let status = response.status();
        let body = response.text().await?;
        let reply: BackendResponse = serde_json::from_str(&body).unwrap_or_default();

        match reply {
            BackendResponse {
                success: true,
                redirect_url: Some(redirect_url),
                ..
            } if status.is_success() => checked_redirect(redirect_url),
            BackendResponse { message, .. } => {
                warn!(status = status.as_u16(), "backend rejected credential bundle");
                Err(RelayError::Handoff(
                    message.unwrap_or_else(|| HANDOFF_FAILED.to_string()),
                ))
            }
        }
    }
}

/// The redirect ends up in a `Location` header, so it must be an absolute URL
/// that is also a valid header value.
fn checked_redirect(redirect_url: String) -> Result<String, RelayError> {
    if Url::parse(&redirect_url).is_err() || HeaderValue::from_str(&redirect_url).is_err() {
        warn!("backend returned an unusable redirect url");
        return Err(RelayError::Handoff(INVALID_REDIRECT.to_string()));
    }
    Ok(redirect_url)
}

fn exchange_failure(err: reqwest::Error) -> RelayError {
    warn!(error = %err, "provider request failed");
    RelayError::Exchange(err.to_string())
}

fn apply_headers(
    mut builder: RequestBuilder,
    headers: &[(String, String)],
) -> Result<RequestBuilder, RelayError> {
    for (name, value) in headers {
        let name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| RelayError::InvalidHeader {
                name: name.clone(),
                value: value.clone(),
            })?;
        let value = HeaderValue::from_str(value).map_err(|_| RelayError::InvalidHeader {
            name: name.to_string(),
            value: value.clone(),
        })?;
        builder = builder.header(name, value);
    }
    Ok(builder)
}
