use tracing::info;

use crate::{
    CredentialBundle, Exchange, Navigation, OAuthProvider, Profile, RelayClient, RelayError,
    SessionStore, TokenSet,
};

pub const APIFY_TOKEN_PREFIX: &str = "apify_api_";

const EMPTY_TOKEN: &str =
    "Please enter your Apify API token to complete the GKP integration setup.";
const MALFORMED_TOKEN: &str = "Invalid Apify token format. Your token should start with 'apify_api_' followed by your unique identifier.";
const CREDENTIALS_LOST: &str = "Authentication data lost. Please sign in again.";
const SUBMISSION_IN_PROGRESS: &str =
    "Your setup is already being submitted. Please wait for it to finish.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    AwaitingGoogleAuth,
    AwaitingSecondaryToken { tokens: TokenSet, profile: Profile },
    /// The bundle is on its way to the backend; the flow cannot be submitted again.
    Submitting,
    Submitted,
}

impl FlowState {
    pub fn complete_exchange(self, exchange: Exchange) -> Self {
        match self {
            FlowState::AwaitingGoogleAuth | FlowState::AwaitingSecondaryToken { .. } => {
                FlowState::AwaitingSecondaryToken {
                    tokens: exchange.tokens,
                    profile: exchange.profile,
                }
            }
            state @ (FlowState::Submitting | FlowState::Submitted) => state,
        }
    }

    /// Takes the credentials out for a handoff, leaving `Submitting` behind.
    fn begin_submission(&mut self) -> Result<(TokenSet, Profile), RelayError> {
        match std::mem::replace(self, FlowState::Submitting) {
            FlowState::AwaitingSecondaryToken { tokens, profile } => Ok((tokens, profile)),
            FlowState::Submitting => {
                Err(RelayError::Validation(SUBMISSION_IN_PROGRESS.to_string()))
            }
            other => {
                *self = other;
                Err(RelayError::Validation(CREDENTIALS_LOST.to_string()))
            }
        }
    }

    /// Drops the Google credentials. Restarting from any state is allowed.
    pub fn restart(self) -> Self {
        FlowState::AwaitingGoogleAuth
    }

    pub fn credentials(&self) -> Option<(&TokenSet, &Profile)> {
        match self {
            FlowState::AwaitingSecondaryToken { tokens, profile } => Some((tokens, profile)),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FlowState::AwaitingGoogleAuth => "awaiting_google_auth",
            FlowState::AwaitingSecondaryToken { .. } => "awaiting_secondary_token",
            FlowState::Submitting => "submitting",
            FlowState::Submitted => "submitted",
        }
    }
}

/// Checks the user-supplied Apify token before anything leaves the process.
pub fn validate_secondary_token(token: &str) -> Result<&str, RelayError> {
    if token.trim().is_empty() {
        return Err(RelayError::Validation(EMPTY_TOKEN.to_string()));
    }
    if !token.starts_with(APIFY_TOKEN_PREFIX) {
        return Err(RelayError::Validation(MALFORMED_TOKEN.to_string()));
    }
    Ok(token)
}

pub struct CredentialComposer<'a, P: OAuthProvider> {
    client: &'a RelayClient<P>,
    sessions: &'a SessionStore,
}

impl<'a, P: OAuthProvider> CredentialComposer<'a, P> {
    pub fn new(client: &'a RelayClient<P>, sessions: &'a SessionStore) -> Self {
        Self { client, sessions }
    }

    /// Validates the token, hands the bundle to the backend once, and closes the
    /// flow. The flow is held in `Submitting` during the handoff so a second
    /// submit cannot send it again; on error the credentials are put back so the
    /// user can retry.
    pub async fn submit(&self, flow_id: &str, apify_token: &str) -> Result<Navigation, RelayError> {
        let apify_token = validate_secondary_token(apify_token)?;

        let (original_query, tokens, profile) = self
            .sessions
            .update(flow_id, |session| {
                let (tokens, profile) = session.state.begin_submission()?;
                Ok((session.original_query.clone(), tokens, profile))
            })
            .unwrap_or_else(|| Err(RelayError::Validation(CREDENTIALS_LOST.to_string())))?;

        let bundle = CredentialBundle::compose(&tokens, &profile, apify_token);
        let redirect_url = match self.client.hand_off(&bundle, &original_query).await {
            Ok(redirect_url) => redirect_url,
            Err(error) => {
                self.sessions.update(flow_id, |session| {
                    session.state = FlowState::AwaitingSecondaryToken { tokens, profile };
                });
                return Err(error);
            }
        };

        self.sessions.remove(flow_id);
        info!(
            flow = %flow_id,
            state = FlowState::Submitted.name(),
            "credential bundle handed off"
        );

        Ok(Navigation::to(redirect_url))
    }

    /// Forgets the Google sign-in and sends the user back to the first step.
    pub fn restart(&self, flow_id: &str) -> Navigation {
        match self.sessions.remove(flow_id) {
            Some(session) => {
                let state = session.state.restart();
                info!(flow = %session.id, state = state.name(), "flow restarted");
                Navigation::authorize(&session.original_query)
            }
            None => Navigation::authorize(""),
        }
    }
}
