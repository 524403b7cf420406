use thiserror::Error;

/// Errors that can occur during adapter operations
///
/// Every upstream-facing variant carries the provider name so the message
/// identifies the originating back end.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Adapter was constructed without an API key
    #[error("{provider}: missing API key")]
    MissingCredential { provider: String },

    /// No constructor is registered under this name
    #[error("unsupported provider: {provider}")]
    UnsupportedProvider { provider: String },

    /// Network failure or non-success HTTP status
    #[error("{provider}: upstream transport error: {message}")]
    UpstreamTransport { provider: String, message: String },

    /// Upstream returned a body that could not be decoded
    #[error("{provider}: upstream decode error: {message}")]
    UpstreamDecode { provider: String, message: String },

    /// Caller sent a request that violates the canonical invariants
    #[error("{provider}: invalid request: {message}")]
    InvalidRequest { provider: String, message: String },

    /// The call was cancelled before it produced a result
    #[error("request cancelled")]
    Cancelled,
}

impl LlmError {
    pub fn transport(provider: &str, message: impl Into<String>) -> Self {
        Self::UpstreamTransport {
            provider: provider.to_owned(),
            message: message.into(),
        }
    }

    pub fn invalid(provider: &str, message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            provider: provider.to_owned(),
            message: message.into(),
        }
    }

    pub fn decode(provider: &str, message: impl Into<String>) -> Self {
        Self::UpstreamDecode {
            provider: provider.to_owned(),
            message: message.into(),
        }
    }

    /// Whether this error represents a cancelled call rather than a failure
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
