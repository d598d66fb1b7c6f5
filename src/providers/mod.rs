mod google;
mod provider;

pub use google::GoogleProvider;
pub use provider::OAuthProvider;
