//! Signed-artifact core for an OpenID Connect provider.
//!
//! Issues and validates the security artifacts of an authorization code flow:
//! short-lived authorization grants, bearer access/refresh tokens, and signed
//! identity assertions, plus PKCE verification for public clients.
//!
//! # Features
//!
//! - **One codec**: every signed artifact is an HS256 compact token built by [`codec`]
//! - **Self-contained grants**: authorization codes carry their own bindings, with a
//!   `jti` replay guard for single use
//! - **Token registry**: opaque bearer tokens behind a swappable [`registry::TokenStore`]
//!   with a periodic expiry sweep
//! - **Session capsules**: relying-party flow state sealed into a cookie
//! - **Tool surface**: every operation callable by name over JSON-RPC
//!
//! # Example
//!
//! ```no_run
//! use oidc_artifacts::{artifacts, config::Config};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let ctx = config.issuer_context()?;
//!     let now = chrono::Utc::now().timestamp();
//!
//!     let id_token = artifacts::issue_identity_assertion(&ctx, "alice", "client-1", None, None, 3600, now)?;
//!     println!("{id_token}");
//!     Ok(())
//! }
//! ```

pub mod artifacts;
pub mod capsule;
pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod pkce;
pub mod registry;
pub mod server;
pub mod tools;

pub use config::Config;
pub use context::{IssuerContext, SigningSecret};
pub use error::{ArtifactError, ToolError};
