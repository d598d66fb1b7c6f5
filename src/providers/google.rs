use crate::OAuthProvider;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

const DEFAULT_SCOPE: &str = "openid email profile";

// Offline access plus forced consent so Google always issues a refresh token.
const AUTHORIZE_PARAMS: &[(&str, &str)] = &[("access_type", "offline"), ("prompt", "consent")];

#[derive(Debug, Clone)]
pub struct GoogleProvider {
    authorize_url: String,
    token_url: String,
    userinfo_url: String,
}

impl Default for GoogleProvider {
    fn default() -> Self {
        Self {
            authorize_url: AUTHORIZE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            userinfo_url: USERINFO_URL.to_string(),
        }
    }
}

impl OAuthProvider for GoogleProvider {
    fn id(&self) -> &'static str {
        "google"
    }

    fn authorize_url(&self) -> &str {
        &self.authorize_url
    }

    fn token_url(&self) -> &str {
        &self.token_url
    }

    fn userinfo_url(&self) -> &str {
        &self.userinfo_url
    }

    fn default_scope(&self) -> &'static str {
        DEFAULT_SCOPE
    }

    fn authorize_params(&self) -> Vec<(String, String)> {
        AUTHORIZE_PARAMS
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    fn token_headers(&self) -> Vec<(String, String)> {
        vec![("Accept".to_string(), "application/json".to_string())]
    }
}

impl GoogleProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points the provider at alternative endpoints, e.g. a local emulator.
    pub fn with_endpoints(
        mut self,
        authorize_url: impl Into<String>,
        token_url: impl Into<String>,
        userinfo_url: impl Into<String>,
    ) -> Self {
        self.authorize_url = authorize_url.into();
        self.token_url = token_url.into();
        self.userinfo_url = userinfo_url.into();
        self
    }
}
