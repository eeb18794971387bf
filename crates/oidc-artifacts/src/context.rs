//! Signing secret and issuer context.
//!
//! The secret is fixed for the lifetime of the process. The issuer may be replaced
//! per request with [`IssuerContext::with_issuer`], which returns a new context and
//! leaves the process-wide one untouched, so concurrent requests never observe each
//! other's issuer.

use std::sync::Arc;

use url::Url;

use crate::error::{ArtifactError, ArtifactResult};

/// HMAC key shared by every signed artifact and session capsule.
#[derive(Clone)]
pub struct SigningSecret(Arc<[u8]>);

impl SigningSecret {
    /// Wrap secret bytes. Empty secrets are rejected.
    pub fn new(bytes: impl AsRef<[u8]>) -> ArtifactResult<Self> {
        let bytes = bytes.as_ref();
        if bytes.is_empty() {
            return Err(ArtifactError::invalid_request("signing secret must not be empty"));
        }
        Ok(Self(Arc::from(bytes)))
    }

    /// Raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SigningSecret").field(&"<redacted>").finish()
    }
}

/// Explicit context threaded into every signing and verification call.
#[derive(Debug, Clone)]
pub struct IssuerContext {
    secret: SigningSecret,
    issuer: Arc<str>,
}

impl IssuerContext {
    /// Create the process-wide context.
    pub fn new(secret: SigningSecret, issuer: &str) -> ArtifactResult<Self> {
        Ok(Self { secret, issuer: normalize_issuer(issuer)?.into() })
    }

    /// Request-scoped copy carrying the externally visible origin as `iss`.
    pub fn with_issuer(&self, url: &str) -> ArtifactResult<Self> {
        Ok(Self { secret: self.secret.clone(), issuer: normalize_issuer(url)?.into() })
    }

    /// Issuer stamped into `iss`.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Signing secret.
    #[must_use]
    pub const fn secret(&self) -> &SigningSecret {
        &self.secret
    }
}

/// Issuers must be absolute http(s) URLs without credentials, query or fragment.
///
/// The stored value is rebuilt from the parsed URL: lowercase origin, default port
/// dropped, path kept without a trailing slash.
fn normalize_issuer(raw: &str) -> ArtifactResult<String> {
    let url = Url::parse(raw)
        .map_err(|e| ArtifactError::invalid_request(format!("issuer '{raw}' is not a URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ArtifactError::invalid_request(format!(
            "issuer '{raw}' must be an absolute http(s) URL"
        )));
    }
    if !url.username().is_empty() || url.password().is_some() || url.query().is_some() || url.fragment().is_some() {
        return Err(ArtifactError::invalid_request(format!(
            "issuer '{raw}' must not carry credentials, a query or a fragment"
        )));
    }
    Ok(format!("{}{}", url.origin().ascii_serialization(), url.path().trim_end_matches('/')))
}
