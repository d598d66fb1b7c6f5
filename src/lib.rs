//! Browser OAuth 2.0 relay that connects a Google account and an Apify API
//! token to a GKP backend.
//!
//! The flow has three steps: [`RelayClient::authorization_url`] sends the
//! browser to Google's consent screen, [`RelayClient::exchange`] trades the
//! returned code for tokens and a profile, and [`CredentialComposer`] collects
//! the Apify token and hands the composed [`CredentialBundle`] to the backend.
//! Per-flow state lives in a short-lived server-side [`SessionStore`].

mod client;
mod composer;
mod config;
mod error;
pub mod navigation;
mod providers;
#[cfg(feature = "server")]
mod server;
mod session;
mod types;

pub use client::RelayClient;
pub use composer::{APIFY_TOKEN_PREFIX, CredentialComposer, FlowState, validate_secondary_token};
pub use config::RelayConfig;
pub use error::RelayError;
pub use navigation::Navigation;
pub use providers::{GoogleProvider, OAuthProvider};
#[cfg(feature = "server")]
pub use server::{RelayServer, ServerConfig};
pub use session::{FlowSession, SessionStore};
pub use types::{
    AuthorizationRequest, BundleSession, BundleUser, CallbackParams, CredentialBundle,
    DEFAULT_EXPIRES_IN_SECS, Exchange, ExchangeRequest, ExchangeResponse, GoogleCredentials,
    GoogleProfile, Profile, TokenSet,
};
