use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sent to the backend in place of a missing `expires_in`; [`TokenSet`] itself
/// keeps `None`.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub authorization_url: String,
    /// The caller's original query string, forwarded as the OAuth `state`.
    pub state: String,
    pub scope: String,
}

/// Query parameters the provider appends to the redirect URI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExchangeRequest {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

impl TokenSet {
    pub fn expires_in_or_default(&self) -> u64 {
        self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Raw user-info payload.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserInfo {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl From<UserInfo> for Profile {
    fn from(info: UserInfo) -> Self {
        Self {
            sub: info.id,
            email: info.email,
            name: info.name,
            picture: info.picture,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ProviderErrorResponse {
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Outcome of a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub tokens: TokenSet,
    pub profile: Profile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExchangeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<Exchange> for ExchangeResponse {
    fn from(exchange: Exchange) -> Self {
        Self {
            success: true,
            tokens: Some(exchange.tokens),
            profile: Some(exchange.profile),
            message: None,
        }
    }
}

impl ExchangeResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialBundle {
    pub session: BundleSession,
    pub google_credentials: GoogleCredentials,
    pub google_profile: GoogleProfile,
    pub client_metadata: Map<String, Value>,
    pub apify_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSession {
    pub access_token: String,
    pub user: BundleUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleCredentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleProfile {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl CredentialBundle {
    pub fn compose(tokens: &TokenSet, profile: &Profile, apify_token: &str) -> Self {
        Self {
            session: BundleSession {
                access_token: tokens.access_token.clone(),
                user: BundleUser {
                    id: profile.sub.clone(),
                    email: profile.email.clone(),
                },
            },
            google_credentials: GoogleCredentials {
                access_token: tokens.access_token.clone(),
                refresh_token: tokens.refresh_token.clone(),
                expires_in: tokens.expires_in_or_default(),
                scope: tokens.scope.clone(),
            },
            google_profile: GoogleProfile {
                id: profile.sub.clone(),
                email: profile.email.clone(),
                name: profile.name.clone(),
            },
            client_metadata: Map::new(),
            apify_token: apify_token.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct BackendResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(rename = "redirectUrl")]
    pub redirect_url: Option<String>,
    pub message: Option<String>,
}
