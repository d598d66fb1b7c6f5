use crate::Profile;

const HOME_HTML: &str = include_str!("html/home.html");
const AUTHORIZE_HTML: &str = include_str!("html/authorize.html");
const SECONDARY_HTML: &str = include_str!("html/secondary.html");
pub(super) const NOT_FOUND_HTML: &str = include_str!("html/not_found.html");

const GOOGLE_START_PATH: &str = "/authorize/google";

pub(super) fn home() -> &'static str {
    HOME_HTML
}

/// First step: the "Continue with Google" link replays `original_query`.
pub(super) fn sign_in(original_query: &str, error: Option<&str>) -> String {
    let sign_in_url = if original_query.is_empty() {
        GOOGLE_START_PATH.to_string()
    } else {
        format!("{GOOGLE_START_PATH}?{original_query}")
    };
    AUTHORIZE_HTML
        .replace("{{SIGN_IN_URL}}", &escape_html(&sign_in_url))
        .replace("{{ERROR}}", &error_block(error))
}

pub(super) fn secondary_token(flow_id: &str, profile: &Profile, error: Option<&str>) -> String {
    let user = profile
        .email
        .as_deref()
        .or(profile.name.as_deref())
        .unwrap_or(&profile.sub);
    SECONDARY_HTML
        .replace("{{USER}}", &escape_html(user))
        .replace("{{FLOW}}", &escape_html(flow_id))
        .replace("{{ERROR}}", &error_block(error))
}

fn error_block(error: Option<&str>) -> String {
    match error {
        Some(message) => format!(r#"<p class="error" role="alert">{}</p>"#, escape_html(message)),
        None => String::new(),
    }
}

fn escape_html(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#x27;"),
            _ => output.push(ch),
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_link_keeps_original_query() {
        let html = sign_in("client_id=mcp&state=xyz", None);
        assert!(html.contains(r#"href="/authorize/google?client_id=mcp&amp;state=xyz""#));
        assert!(!html.contains("{{ERROR}}"));
    }

    #[test]
    fn error_messages_are_escaped() {
        let html = sign_in("", Some("<script>alert('x')</script>"));
        assert!(html.contains("&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn secondary_page_shows_email_and_flow() {
        let profile = Profile {
            sub: "1".to_string(),
            email: Some("u@x.com".to_string()),
            name: None,
            picture: None,
        };
        let html = secondary_token("flow-id", &profile, None);
        assert!(html.contains("Signed in as u@x.com"));
        assert!(html.contains(r#"name="flow" value="flow-id""#));
    }
}
