use url::form_urlencoded;

pub const AUTHORIZE_PATH: &str = "/authorize";
pub const SECONDARY_STEP: &str = "secondary";

/// A full-page navigation the caller should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub location: String,
}

impl Navigation {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }

    /// Back to the authorize page, replaying the caller's original query.
    pub fn authorize(original_query: &str) -> Self {
        if original_query.is_empty() {
            Self::to(AUTHORIZE_PATH)
        } else {
            Self::to(format!("{AUTHORIZE_PATH}?{original_query}"))
        }
    }

    pub fn secondary_step(flow_id: &str) -> Self {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("step", SECONDARY_STEP)
            .append_pair("flow", flow_id)
            .finish();
        Self::to(format!("{AUTHORIZE_PATH}?{query}"))
    }

    /// Carries `message` across the redirect in the `error` query parameter.
    pub fn error(message: &str) -> Self {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("error", message)
            .finish();
        Self::to(format!("{AUTHORIZE_PATH}?{query}"))
    }
}

/// Reads back the message written by [`Navigation::error`].
pub fn decode_error(query: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "error")
        .map(|(_, value)| value.into_owned())
}
