pub trait OAuthProvider: Send + Sync {
    fn id(&self) -> &'static str;
    fn authorize_url(&self) -> &str;
    fn token_url(&self) -> &str;
    fn userinfo_url(&self) -> &str;
    fn default_scope(&self) -> &'static str;

    fn authorize_params(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    fn token_headers(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}
