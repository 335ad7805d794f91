//! Best-effort identity attachment for incoming connections.

use std::sync::Arc;

use tracing::debug;

use verdant_auth::jwt::JwtDecoder;
use verdant_core::types::UserId;

/// Identity extracted from a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedConnection {
    /// User ID.
    pub user_id: UserId,
    /// Username.
    pub username: String,
}

/// Resolves connection identity from a JWT.
///
/// A missing or invalid token is not an error: the connection proceeds
/// anonymously and is never registered for presence.
#[derive(Clone)]
pub struct WsAuthenticator {
    /// JWT decoder.
    decoder: Arc<JwtDecoder>,
}

impl std::fmt::Debug for WsAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsAuthenticator").finish()
    }
}

impl WsAuthenticator {
    /// Creates a new authenticator.
    pub fn new(decoder: Arc<JwtDecoder>) -> Self {
        Self { decoder }
    }

    /// Resolve the identity carried by `token`, if any.
    pub fn authenticate(&self, token: Option<&str>) -> Option<AuthenticatedConnection> {
        let token = token.map(str::trim).filter(|t| !t.is_empty())?;

        match self.decoder.decode(token) {
            Ok(claims) => Some(AuthenticatedConnection {
                user_id: claims.user_id(),
                username: claims.username,
            }),
            Err(e) => {
                debug!(error = %e, "Connection token rejected, continuing anonymously");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_auth::jwt::JwtEncoder;
    use verdant_core::config::AuthConfig;

    fn authenticator(config: &AuthConfig) -> WsAuthenticator {
        WsAuthenticator::new(Arc::new(JwtDecoder::new(config)))
    }

    #[test]
    fn test_valid_token_attaches_identity() {
        let config = AuthConfig::default();
        let user = UserId::new();
        let token = JwtEncoder::new(&config)
            .issue(user, "bob", chrono::Duration::minutes(1))
            .unwrap();

        let identity = authenticator(&config).authenticate(Some(&token)).unwrap();
        assert_eq!(identity.user_id, user);
        assert_eq!(identity.username, "bob");
    }

    #[test]
    fn test_missing_or_bad_token_is_anonymous() {
        let auth = authenticator(&AuthConfig::default());
        assert!(auth.authenticate(None).is_none());
        assert!(auth.authenticate(Some("  ")).is_none());
        assert!(auth.authenticate(Some("garbage")).is_none());
    }
}
