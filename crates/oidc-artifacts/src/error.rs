//! Error types for the signed-artifact core.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.
//! Every validation failure is a discriminated [`ArtifactError`] so the calling layer
//! can pick a protocol-correct error code.

/// Reasons an artifact, grant exchange, or registry lookup is rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ArtifactError {
    /// Wrong segment count, undecodable base64url, or unsupported header.
    #[error("Malformed artifact: {0}")]
    MalformedArtifact(String),

    /// Integrity tag does not match the recomputed tag.
    #[error("Signature mismatch")]
    SignatureMismatch,

    /// Payload is not a valid claims object.
    #[error("Malformed claims: {0}")]
    MalformedClaims(String),

    /// `exp` is at or before the verification instant.
    #[error("Artifact expired at {exp} (now {now})")]
    Expired {
        /// Expiry of the artifact (unix seconds)
        exp: i64,
        /// Verification instant (unix seconds)
        now: i64,
    },

    /// Type discriminator is not the one the caller asked for.
    #[error("Wrong artifact type: expected {expected}, found {found}")]
    WrongArtifactType {
        /// Expected discriminator
        expected: String,
        /// Discriminator actually present
        found: String,
    },

    /// Code verifier does not match the committed challenge.
    #[error("PKCE verification failed")]
    PkceFailure,

    /// Registry miss.
    #[error("Token not found")]
    NotFound,

    /// Grant was issued to another client.
    #[error("client_id mismatch")]
    ClientMismatch,

    /// Grant was issued for another redirect URI.
    #[error("redirect_uri mismatch")]
    RedirectUriMismatch,

    /// Identity assertion was issued for another audience.
    #[error("Audience mismatch")]
    AudienceMismatch,

    /// Grant `jti` was already consumed.
    #[error("Authorization grant already redeemed")]
    GrantReplayed,

    /// Issuance arguments are inconsistent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ArtifactError {
    /// Create a malformed artifact error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedArtifact(message.into())
    }

    /// Create a malformed claims error.
    #[must_use]
    pub fn malformed_claims(message: impl Into<String>) -> Self {
        Self::MalformedClaims(message.into())
    }

    /// Create a wrong artifact type error.
    #[must_use]
    pub fn wrong_type(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::WrongArtifactType { expected: expected.into(), found: found.into() }
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Stable snake_case discriminator for structured tool results.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MalformedArtifact(_) => "malformed_artifact",
            Self::SignatureMismatch => "signature_mismatch",
            Self::MalformedClaims(_) => "malformed_claims",
            Self::Expired { .. } => "expired",
            Self::WrongArtifactType { .. } => "wrong_artifact_type",
            Self::PkceFailure => "pkce_failure",
            Self::NotFound => "not_found",
            Self::ClientMismatch => "client_mismatch",
            Self::RedirectUriMismatch => "redirect_uri_mismatch",
            Self::AudienceMismatch => "audience_mismatch",
            Self::GrantReplayed => "grant_replayed",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }

    /// OAuth 2.0 error code the protocol layer should surface (RFC 6749 §5.2, RFC 6750 §3.1).
    #[must_use]
    pub const fn oauth_error(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::ClientMismatch => "invalid_client",
            Self::NotFound | Self::AudienceMismatch => "invalid_token",
            _ => "invalid_grant",
        }
    }
}

/// Errors from reading process configuration at startup.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A required setting is absent.
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    /// A setting is present but unusable.
    #[error("Invalid setting {name}: {message}")]
    Invalid {
        /// Setting name
        name: &'static str,
        /// Why it was rejected
        message: String,
    },
}

impl ConfigError {
    /// Create an invalid setting error.
    #[must_use]
    pub fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid { name, message: message.into() }
    }
}

/// Errors from tool dispatch.
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    /// No tool is registered under this name.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Input validation failed
    #[error("Validation error: {message}")]
    Validation {
        /// Field that failed validation
        field: String,
        /// Validation error message
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Artifact failure that could not be expressed as a structured result
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),
}

impl ToolError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Convert to a caller-facing message for the JSON-RPC error.
    #[must_use]
    pub fn to_user_message(&self) -> String {
        match self {
            Self::UnknownTool(name) => format!("Unknown tool '{name}'. Call tools/list for names."),
            Self::Validation { field, message } => {
                format!("Invalid input for '{field}': {message}")
            }
            _ => self.to_string(),
        }
    }
}

/// Result type alias for artifact operations.
pub type ArtifactResult<T> = Result<T, ArtifactError>;

/// Result type alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            ArtifactError::malformed("x"),
            ArtifactError::SignatureMismatch,
            ArtifactError::malformed_claims("x"),
            ArtifactError::Expired { exp: 1, now: 2 },
            ArtifactError::wrong_type("a", "b"),
            ArtifactError::PkceFailure,
            ArtifactError::NotFound,
            ArtifactError::ClientMismatch,
            ArtifactError::RedirectUriMismatch,
            ArtifactError::AudienceMismatch,
            ArtifactError::GrantReplayed,
            ArtifactError::invalid_request("x"),
        ];
        let mut codes: Vec<_> = errors.iter().map(ArtifactError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_oauth_error_mapping() {
        assert_eq!(ArtifactError::PkceFailure.oauth_error(), "invalid_grant");
        assert_eq!(ArtifactError::Expired { exp: 1, now: 1 }.oauth_error(), "invalid_grant");
        assert_eq!(ArtifactError::ClientMismatch.oauth_error(), "invalid_client");
        assert_eq!(ArtifactError::NotFound.oauth_error(), "invalid_token");
        assert_eq!(ArtifactError::invalid_request("x").oauth_error(), "invalid_request");
    }

    #[test]
    fn test_tool_error_user_message() {
        let err = ToolError::validation("client_id", "cannot be empty");
        assert!(err.to_user_message().contains("client_id"));
        assert!(err.to_user_message().contains("cannot be empty"));

        let err = ToolError::UnknownTool("mint_money".into());
        assert!(err.to_user_message().contains("mint_money"));
    }
}
