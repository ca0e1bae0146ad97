//! Credential relay port

use async_trait::async_trait;
use calpilot_domain::Result;

/// Supplies a bearer token for the remote calendar.
///
/// Implementations refresh on demand; callers ask again for every operation
/// rather than caching the token.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Fetch a currently valid access token.
    ///
    /// Fails with `Credential` when no token can be obtained.
    async fn access_token(&self) -> Result<String>;
}
