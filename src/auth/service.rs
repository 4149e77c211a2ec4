/// Token Service
///
/// Issues, refreshes and revokes token pairs. The service is immutable
/// after construction and cheap to clone; the optional session store is the
/// only shared mutable state.

use std::sync::Arc;

use crate::auth::claims::{Claims, Principal, TokenKind};
use crate::auth::credentials::{CredentialStore, Credentials};
use crate::auth::jwt::{decode_token, sign_token, verify_token, JwtKeys};
use crate::auth::refresh_token::{
    generate_session_id, generate_token_id, hash_token, SessionRecord, SessionStore,
};
use crate::clock::Clock;
use crate::configuration::{JwtSettings, RotationPolicy};
use crate::error::AppError;

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub session_id: String,
    pub principal: Principal,
}

/// Result of a successful refresh
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    pub access_token: String,
    /// Set when the caller must overwrite its refresh cookie
    pub refresh_token: Option<String>,
    pub principal: Principal,
}

#[derive(Clone)]
pub struct TokenService {
    settings: Arc<JwtSettings>,
    keys: Arc<JwtKeys>,
    credentials: Arc<dyn CredentialStore>,
    sessions: Option<Arc<dyn SessionStore>>,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    /// Build the service
    ///
    /// `sessions` is only consulted under `RotationPolicy::ReuseDetection`.
    ///
    /// # Errors
    /// Returns a config error if reuse detection is requested without a store
    pub fn new(
        settings: JwtSettings,
        credentials: Arc<dyn CredentialStore>,
        sessions: Option<Arc<dyn SessionStore>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let sessions = match settings.refresh_rotation {
            RotationPolicy::ReuseDetection => Some(sessions.ok_or_else(|| {
                AppError::Config(crate::error::ConfigError::MissingRequired(
                    "session store for reuse_detection".to_string(),
                ))
            })?),
            RotationPolicy::Disabled | RotationPolicy::Advisory => None,
        };

        Ok(Self {
            keys: Arc::new(JwtKeys::from_secret(&settings.secret)),
            settings: Arc::new(settings),
            credentials,
            sessions,
            clock,
        })
    }

    pub fn settings(&self) -> &JwtSettings {
        &self.settings
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Validate credentials and mint an access/refresh pair
    ///
    /// # Errors
    /// `InvalidCredentials` when the credential store rejects the input; no
    /// token is minted in that case
    pub fn issue(&self, credentials: &Credentials) -> Result<IssuedTokens, AppError> {
        let principal = self.credentials.authenticate(credentials)?;
        let now = self.clock.now();
        let session_id = generate_session_id();

        let access_token = self.mint(&principal, TokenKind::Access, &session_id, now)?;
        let refresh_token = self.mint(&principal, TokenKind::Refresh, &session_id, now)?;

        if let Some(sessions) = &self.sessions {
            sessions.open(
                SessionRecord {
                    session_id: session_id.clone(),
                    subject: principal.id,
                    token_hash: hash_token(&refresh_token),
                    expires_at: now + self.settings.refresh_token_expiry,
                },
                now,
            );
        }

        tracing::info!(
            user_id = principal.id,
            session_id = %session_id,
            "Token pair issued"
        );

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            session_id,
            principal,
        })
    }

    /// Mint a new access token from a refresh token
    ///
    /// # Errors
    /// - `TokenInvalid`: bad signature, malformed claims, wrong kind, or a
    ///   session that is no longer tracked
    /// - `TokenExpired`: refresh token past its expiry
    /// - `TokenReused`: refresh token was already rotated away
    pub fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, AppError> {
        let now = self.clock.now();
        let claims = verify_token(
            refresh_token,
            TokenKind::Refresh,
            &self.keys,
            &self.settings.issuer,
            now,
        )?;
        let principal = claims.principal;
        // The presented refresh token shares `iat` with the access token
        // minted alongside it; the replacement must not repeat it.
        let issued_at = now.max(claims.iat + 1);

        let access_token = self.mint(&principal, TokenKind::Access, &claims.sid, issued_at)?;

        let rotated = match self.settings.refresh_rotation {
            RotationPolicy::Disabled => None,
            RotationPolicy::Advisory => {
                Some(self.mint(&principal, TokenKind::Refresh, &claims.sid, issued_at)?)
            }
            RotationPolicy::ReuseDetection => {
                let next = self.mint(&principal, TokenKind::Refresh, &claims.sid, issued_at)?;
                if let Some(sessions) = &self.sessions {
                    sessions.rotate(
                        &claims.sid,
                        &hash_token(refresh_token),
                        hash_token(&next),
                        now,
                        issued_at + self.settings.refresh_token_expiry,
                    )?;
                }
                Some(next)
            }
        };

        tracing::info!(
            user_id = principal.id,
            session_id = %claims.sid,
            rotated = rotated.is_some(),
            "Access token refreshed"
        );

        Ok(RefreshedTokens {
            access_token,
            refresh_token: rotated,
            principal,
        })
    }

    /// End the session a refresh token belongs to
    ///
    /// Expired tokens can still be revoked. Returns whether a tracked session
    /// was ended; without a session store this is always `false` and logout
    /// relies on the caller dropping its cookie.
    ///
    /// # Errors
    /// `TokenInvalid` if the token is not a refresh token signed by us
    pub fn revoke(&self, refresh_token: &str) -> Result<bool, AppError> {
        let claims = decode_token(
            refresh_token,
            TokenKind::Refresh,
            &self.keys,
            &self.settings.issuer,
        )?;

        let ended = match &self.sessions {
            Some(sessions) => sessions.revoke(&claims.sid),
            None => false,
        };

        tracing::info!(
            user_id = claims.principal.id,
            session_id = %claims.sid,
            ended,
            "Session revoked"
        );
        Ok(ended)
    }

    /// Verify an access token presented as a bearer credential
    ///
    /// # Errors
    /// `TokenInvalid` or `TokenExpired`
    pub fn verify_access(&self, access_token: &str) -> Result<Claims, AppError> {
        let claims = verify_token(
            access_token,
            TokenKind::Access,
            &self.keys,
            &self.settings.issuer,
            self.clock.now(),
        )?;
        Ok(claims)
    }

    fn mint(
        &self,
        principal: &Principal,
        kind: TokenKind,
        session_id: &str,
        issued_at: i64,
    ) -> Result<String, AppError> {
        let expiry = match kind {
            TokenKind::Access => self.settings.access_token_expiry,
            TokenKind::Refresh => self.settings.refresh_token_expiry,
        };
        let claims = Claims::new(
            principal.clone(),
            kind,
            session_id.to_string(),
            generate_token_id(),
            issued_at,
            expiry,
            self.settings.issuer.clone(),
        );
        sign_token(&claims, &self.keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::InMemoryCredentialStore;
    use crate::auth::refresh_token::InMemorySessionStore;
    use crate::clock::ManualClock;
    use crate::error::AuthError;

    const START: i64 = 1_700_000_000;

    fn settings(policy: RotationPolicy) -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
            refresh_rotation: policy,
        }
    }

    fn credential_store() -> Arc<dyn CredentialStore> {
        Arc::new(
            InMemoryCredentialStore::new()
                .with_cost(4)
                .with_user("alice", "Wonderland1", Principal::new(1, "user"))
                .expect("Failed to add user"),
        )
    }

    fn service(policy: RotationPolicy) -> (TokenService, ManualClock, Arc<InMemorySessionStore>) {
        let clock = ManualClock::new(START);
        let store = Arc::new(InMemorySessionStore::new());
        let sessions: Arc<dyn SessionStore> = store.clone();
        let service = TokenService::new(
            settings(policy),
            credential_store(),
            Some(sessions),
            Arc::new(clock.clone()),
        )
        .expect("Failed to build token service");
        (service, clock, store)
    }

    fn alice() -> Credentials {
        Credentials {
            username: "alice".to_string(),
            password: "Wonderland1".to_string(),
        }
    }

    fn auth_error<T: std::fmt::Debug>(result: Result<T, AppError>) -> AuthError {
        result
            .expect_err("expected an authentication error")
            .auth_error()
            .expect("expected AppError::Auth")
    }

    #[test]
    fn test_issue_embeds_principal() {
        let (service, _, _) = service(RotationPolicy::Disabled);
        let issued = service.issue(&alice()).unwrap();

        let claims = service.verify_access(&issued.access_token).unwrap();
        assert_eq!(claims.principal, Principal::new(1, "user"));
        assert_eq!(claims.sub, "1");
        assert_eq!(claims.iat, START);
        assert_eq!(claims.exp, START + 900);
        assert_eq!(claims.sid, issued.session_id);
    }

    #[test]
    fn test_issue_rejects_bad_credentials() {
        let (service, _, store) = service(RotationPolicy::ReuseDetection);
        let credentials = Credentials {
            username: "alice".to_string(),
            password: "nope".to_string(),
        };

        assert_eq!(auth_error(service.issue(&credentials)), AuthError::InvalidCredentials);
        assert!(store.is_empty());
    }

    #[test]
    fn test_refresh_keeps_subject() {
        let (service, clock, _) = service(RotationPolicy::Disabled);
        let issued = service.issue(&alice()).unwrap();
        let first = service.verify_access(&issued.access_token).unwrap();

        clock.advance(5);
        let refreshed = service.refresh(&issued.refresh_token).unwrap();
        let second = service.verify_access(&refreshed.access_token).unwrap();

        assert_eq!(second.sub, first.sub);
        assert_eq!(second.principal, first.principal);
        assert_eq!(second.iat, START + 5);
        assert_eq!(second.exp, START + 5 + 900);
        assert_ne!(second.jti, first.jti);
        assert!(refreshed.refresh_token.is_none());
    }

    #[test]
    fn test_immediate_refresh_gets_new_issued_at() {
        let (service, _, _) = service(RotationPolicy::ReuseDetection);
        let issued = service.issue(&alice()).unwrap();
        let first = service.verify_access(&issued.access_token).unwrap();

        let refreshed = service.refresh(&issued.refresh_token).unwrap();
        let second = service.verify_access(&refreshed.access_token).unwrap();
        assert_eq!(second.iat, START + 1);
        assert_eq!(second.exp, second.iat + 900);
        assert_ne!(second.iat, first.iat);

        // the rotated token carries the new `iat`, so the next one moves on again
        let again = service.refresh(&refreshed.refresh_token.unwrap()).unwrap();
        let third = service.verify_access(&again.access_token).unwrap();
        assert_eq!(third.iat, START + 2);
    }

    #[test]
    fn test_refresh_token_expiry_boundary() {
        let (service, clock, _) = service(RotationPolicy::Disabled);
        let issued = service.issue(&alice()).unwrap();

        clock.set(START + 604800 - 1);
        assert!(service.refresh(&issued.refresh_token).is_ok());

        clock.set(START + 604800);
        assert_eq!(auth_error(service.refresh(&issued.refresh_token)), AuthError::TokenExpired);
    }

    #[test]
    fn test_access_token_expires() {
        let (service, clock, _) = service(RotationPolicy::Disabled);
        let issued = service.issue(&alice()).unwrap();

        clock.advance(900);
        assert_eq!(
            auth_error(service.verify_access(&issued.access_token)),
            AuthError::TokenExpired
        );
    }

    #[test]
    fn test_access_token_cannot_refresh() {
        let (service, _, _) = service(RotationPolicy::Disabled);
        let issued = service.issue(&alice()).unwrap();

        assert_eq!(auth_error(service.refresh(&issued.access_token)), AuthError::TokenInvalid);
        assert_eq!(
            auth_error(service.verify_access(&issued.refresh_token)),
            AuthError::TokenInvalid
        );
    }

    #[test]
    fn test_advisory_rotation_keeps_old_token_valid() {
        let (service, _, store) = service(RotationPolicy::Advisory);
        let issued = service.issue(&alice()).unwrap();

        let refreshed = service.refresh(&issued.refresh_token).unwrap();
        let rotated = refreshed.refresh_token.expect("advisory policy rotates");

        assert_ne!(rotated, issued.refresh_token);
        assert!(service.refresh(&issued.refresh_token).is_ok());
        assert!(service.refresh(&rotated).is_ok());
        assert!(store.is_empty());
    }

    #[test]
    fn test_reuse_detection() {
        let (service, _, store) = service(RotationPolicy::ReuseDetection);
        let issued = service.issue(&alice()).unwrap();
        assert!(store.is_active(&issued.session_id));

        let refreshed = service.refresh(&issued.refresh_token).unwrap();
        let rotated = refreshed.refresh_token.expect("reuse detection rotates");

        assert_eq!(auth_error(service.refresh(&issued.refresh_token)), AuthError::TokenReused);
        // the whole session family is gone, including the legitimate successor
        assert!(!store.is_active(&issued.session_id));
        assert_eq!(auth_error(service.refresh(&rotated)), AuthError::TokenInvalid);
    }

    #[test]
    fn test_revoke_ends_tracked_session() {
        let (service, _, store) = service(RotationPolicy::ReuseDetection);
        let issued = service.issue(&alice()).unwrap();

        assert!(service.revoke(&issued.refresh_token).unwrap());
        assert!(store.is_empty());
        assert_eq!(auth_error(service.refresh(&issued.refresh_token)), AuthError::TokenInvalid);
    }

    #[test]
    fn test_revoke_is_advisory_without_store() {
        let (service, _, _) = service(RotationPolicy::Disabled);
        let issued = service.issue(&alice()).unwrap();

        assert!(!service.revoke(&issued.refresh_token).unwrap());
        assert!(service.refresh(&issued.refresh_token).is_ok());
    }

    #[test]
    fn test_revoke_accepts_expired_token() {
        let (service, clock, store) = service(RotationPolicy::ReuseDetection);
        let issued = service.issue(&alice()).unwrap();

        clock.advance(604800 + 1);
        assert!(service.revoke(&issued.refresh_token).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let (service, _, _) = service(RotationPolicy::Disabled);
        let mut other_settings = settings(RotationPolicy::Disabled);
        other_settings.secret = "another-secret-key-that-is-also-32-bytes".to_string();
        let other = TokenService::new(
            other_settings,
            credential_store(),
            None,
            Arc::new(ManualClock::new(START)),
        )
        .unwrap();

        let foreign = other.issue(&alice()).unwrap();
        assert_eq!(auth_error(service.refresh(&foreign.refresh_token)), AuthError::TokenInvalid);
        assert_eq!(
            auth_error(service.verify_access(&foreign.access_token)),
            AuthError::TokenInvalid
        );
    }

    #[test]
    fn test_reuse_detection_requires_store() {
        let result = TokenService::new(
            settings(RotationPolicy::ReuseDetection),
            credential_store(),
            None,
            Arc::new(ManualClock::new(START)),
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
