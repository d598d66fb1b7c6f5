use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("os rng error: {message}")]
    OsRng { message: String },

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid header: {name}={value}")]
    InvalidHeader { name: String, value: String },

    /// Required configuration is missing; raised before any navigation happens.
    #[error("{0}")]
    Configuration(String),

    /// User input was rejected; the flow stays on the current step.
    #[error("{0}")]
    Validation(String),

    /// The provider rejected the code or the profile fetch failed.
    #[error("{0}")]
    Exchange(String),

    /// The external backend rejected the credential bundle.
    #[error("{0}")]
    Handoff(String),
}

impl RelayError {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            RelayError::Configuration(message)
            | RelayError::Validation(message)
            | RelayError::Exchange(message)
            | RelayError::Handoff(message) => message.clone(),
            other => other.to_string(),
        }
    }
}
