use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Credentials and endpoint settings for one provider
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// API key sent with every upstream call
    pub api_key: SecretString,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Attribution site, sent by providers that rank callers
    #[serde(default)]
    pub referer: Option<String>,
    /// Attribution app title
    #[serde(default)]
    pub title: Option<String>,
}
