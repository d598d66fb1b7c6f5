mod config;
mod http;
mod pages;

use std::future::Future;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tracing::info;

use crate::{GoogleProvider, RelayClient, RelayError, SessionStore};

pub use config::ServerConfig;

use http::{
    AppState, authorize_handler, callback_handler, exchange_handler, fallback_handler,
    health_handler, home_handler, restart_handler, start_google_handler, submit_handler,
};

#[derive(Clone)]
pub struct RelayServer {
    state: AppState,
}

impl RelayServer {
    pub fn new(client: RelayClient<GoogleProvider>) -> Self {
        let sessions = SessionStore::new(client.config().session_ttl);
        Self {
            state: AppState {
                client: Arc::new(client),
                sessions,
            },
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.state.sessions
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(home_handler))
            .route("/authorize", get(authorize_handler))
            .route("/authorize/google", get(start_google_handler))
            .route("/authorize/submit", post(submit_handler))
            .route("/authorize/restart", post(restart_handler))
            .route("/oauth/callback", get(callback_handler))
            .route("/api/oauth/exchange", post(exchange_handler))
            .route("/health", get(health_handler))
            .fallback(fallback_handler)
            .with_state(self.state.clone())
    }

    pub async fn bind(config: &ServerConfig) -> Result<TcpListener, RelayError> {
        TcpListener::bind(config.address())
            .await
            .map_err(RelayError::from)
    }

    /// Serves until ctrl-c.
    pub async fn serve(self, listener: TcpListener) -> Result<(), RelayError> {
        self.serve_with_shutdown(listener, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, signal: F) -> Result<(), RelayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = listener.local_addr()?;
        info!(%address, "relay listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await?;

        info!("relay stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::{Matcher, Server, ServerGuard};
    use reqwest::{Client, StatusCode, redirect::Policy};
    use serde_json::{Value, json};
    use url::Url;

    use super::*;
    use crate::RelayConfig;

    struct Harness {
        base_url: String,
        http: Client,
        sessions: SessionStore,
    }

    async fn spawn_relay(provider: &ServerGuard, client_id: Option<&str>) -> Harness {
        let google = GoogleProvider::new().with_endpoints(
            "https://accounts.google.com/o/oauth2/v2/auth",
            format!("{}/token", provider.url()),
            format!("{}/userinfo", provider.url()),
        );
        let mut config = RelayConfig::new("http://localhost:3000", provider.url())
            .with_client_secret("client-secret")
            .with_session_ttl(Duration::from_secs(60));
        if let Some(client_id) = client_id {
            config = config.with_client_id(client_id);
        }

        let server = RelayServer::new(RelayClient::new(google, config).unwrap());
        let sessions = server.sessions().clone();
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(server.serve_with_shutdown(listener, std::future::pending()));

        Harness {
            base_url,
            http: Client::builder().redirect(Policy::none()).build().unwrap(),
            sessions,
        }
    }

    fn location(response: &reqwest::Response) -> String {
        response.headers()["location"].to_str().unwrap().to_string()
    }

    async fn stub_provider(server: &mut ServerGuard) {
        server
            .mock("POST", "/token")
            .match_body(Matcher::UrlEncoded("code".into(), "abc".into()))
            .with_body(r#"{"access_token":"ya29.access","refresh_token":"1//refresh","scope":"openid email profile","token_type":"Bearer"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/userinfo")
            .with_body(r#"{"id":"1","email":"u@x.com"}"#)
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn full_flow_ends_at_backend_redirect() {
        let mut provider = Server::new_async().await;
        stub_provider(&mut provider).await;
        let backend = provider
            .mock("POST", "/callback")
            .match_query(Matcher::UrlEncoded("foo".into(), "bar".into()))
            .match_body(Matcher::PartialJson(json!({
                "session": {"user": {"id": "1", "email": "u@x.com"}},
                "google_credentials": {"refresh_token": "1//refresh", "expires_in": 3600},
                "apify_token": "apify_api_test123"
            })))
            .with_body(r#"{"success":true,"redirectUrl":"https://host/done"}"#)
            .expect(1)
            .create_async()
            .await;
        let relay = spawn_relay(&provider, Some("client-id")).await;

        let response = relay
            .http
            .get(format!("{}/authorize/google?foo=bar", relay.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let consent = Url::parse(&location(&response)).unwrap();
        assert_eq!(consent.host_str(), Some("accounts.google.com"));
        let state = consent
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned());
        assert_eq!(state.as_deref(), Some("foo=bar"));

        let response = relay
            .http
            .get(format!("{}/oauth/callback?code=abc&state=foo%3Dbar", relay.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let step = location(&response);
        assert!(step.starts_with("/authorize?step=secondary&flow="), "{step}");
        let flow_id = step.rsplit_once("flow=").unwrap().1.to_string();

        let page = relay
            .http
            .get(format!("{}{}", relay.base_url, step))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(page.contains("u@x.com"));

        let response = relay
            .http
            .post(format!("{}/authorize/submit", relay.base_url))
            .form(&[("flow", flow_id.as_str()), ("apify_token", "not-a-token")])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.text().await.unwrap().contains("Invalid Apify token format"));

        let response = relay
            .http
            .post(format!("{}/authorize/submit", relay.base_url))
            .form(&[("flow", flow_id.as_str()), ("apify_token", "apify_api_test123")])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "https://host/done");

        assert!(relay.sessions.is_empty());
        backend.assert_async().await;
    }

    #[tokio::test]
    async fn exchange_endpoint_reports_provider_errors() {
        let mut provider = Server::new_async().await;
        provider
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant","error_description":"bad code"}"#)
            .create_async()
            .await;
        let relay = spawn_relay(&provider, Some("client-id")).await;

        let response = relay
            .http
            .post(format!("{}/api/oauth/exchange", relay.base_url))
            .json(&json!({"code": "abc", "state": "foo=bar"}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"success": false, "message": "bad code"}));
    }

    #[tokio::test]
    async fn exchange_endpoint_returns_tokens_and_profile() {
        let mut provider = Server::new_async().await;
        stub_provider(&mut provider).await;
        let relay = spawn_relay(&provider, Some("client-id")).await;

        let body: Value = relay
            .http
            .post(format!("{}/api/oauth/exchange", relay.base_url))
            .json(&json!({"code": "abc", "state": "foo=bar"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["success"], json!(true));
        assert_eq!(body["profile"]["sub"], json!("1"));
        assert_eq!(body["profile"]["email"], json!("u@x.com"));
        assert_eq!(body["tokens"]["access_token"], json!("ya29.access"));
        assert!(relay.sessions.is_empty());
    }

    #[tokio::test]
    async fn missing_client_id_does_not_redirect() {
        let provider = Server::new_async().await;
        let relay = spawn_relay(&provider, None).await;

        let response = relay
            .http
            .get(format!("{}/authorize/google?foo=bar", relay.base_url))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get("location").is_none());
        assert!(response.text().await.unwrap().contains("Google Client ID not configured"));
    }

    #[tokio::test]
    async fn provider_denial_round_trips_through_authorize_page() {
        let provider = Server::new_async().await;
        let relay = spawn_relay(&provider, Some("client-id")).await;

        let response = relay
            .http
            .get(format!("{}/oauth/callback?error=access_denied&state=foo%3Dbar", relay.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let target = location(&response);
        assert_eq!(target, "/authorize?error=access_denied");

        let page = relay
            .http
            .get(format!("{}{}", relay.base_url, target))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(page.contains("access_denied"));
        assert!(relay.sessions.is_empty());
    }

    #[tokio::test]
    async fn restart_returns_to_original_query() {
        let mut provider = Server::new_async().await;
        stub_provider(&mut provider).await;
        let relay = spawn_relay(&provider, Some("client-id")).await;

        let response = relay
            .http
            .get(format!("{}/oauth/callback?code=abc&state=foo%3Dbar", relay.base_url))
            .send()
            .await
            .unwrap();
        let flow_id = location(&response).rsplit_once("flow=").unwrap().1.to_string();
        assert_eq!(relay.sessions.len(), 1);

        let response = relay
            .http
            .post(format!("{}/authorize/restart", relay.base_url))
            .form(&[("flow", flow_id.as_str())])
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/authorize?foo=bar");
        assert!(relay.sessions.is_empty());
    }
}
