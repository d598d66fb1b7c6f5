use std::time::Duration;

const CALLBACK_PATH: &str = "/oauth/callback";
const BACKEND_CALLBACK_PATH: &str = "/callback";
const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub frontend_url: String,
    pub backend_url: String,
    pub timeout: Option<Duration>,
    pub session_ttl: Duration,
}

impl RelayConfig {
    pub fn new(frontend_url: impl Into<String>, backend_url: impl Into<String>) -> Self {
        Self {
            client_id: None,
            client_secret: None,
            frontend_url: trim_trailing_slash(frontend_url.into()),
            backend_url: trim_trailing_slash(backend_url.into()),
            timeout: None,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = non_empty(client_id.into());
        self
    }

    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = non_empty(client_secret.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_session_ttl(mut self, session_ttl: Duration) -> Self {
        self.session_ttl = session_ttl;
        self
    }

    /// The redirect URI registered with the provider.
    pub fn redirect_uri(&self) -> String {
        format!("{}{}", self.frontend_url, CALLBACK_PATH)
    }

    pub fn backend_callback_url(&self) -> String {
        format!("{}{}", self.backend_url, BACKEND_CALLBACK_PATH)
    }
}

fn trim_trailing_slash(url: String) -> String {
    match url.strip_suffix('/') {
        Some(trimmed) => trimmed.to_string(),
        None => url,
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::RelayConfig;

    #[test]
    fn derives_callback_urls_without_double_slashes() {
        let config = RelayConfig::new("http://localhost:3000/", "https://gkp.example.com/");
        assert_eq!(config.redirect_uri(), "http://localhost:3000/oauth/callback");
        assert_eq!(
            config.backend_callback_url(),
            "https://gkp.example.com/callback"
        );
    }

    #[test]
    fn blank_client_id_counts_as_missing() {
        let config = RelayConfig::new("http://localhost:3000", "http://backend").with_client_id("  ");
        assert!(config.client_id.is_none());
    }
}
