/// JWT Claims structure
///
/// Represents the payload shared by access and refresh tokens: the
/// authenticated principal plus standard JWT claims (RFC 7519).

use serde::{Deserialize, Serialize};

/// The authenticated identity embedded into every token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: u64,
    pub role: String,
}

impl Principal {
    pub fn new(id: u64, role: impl Into<String>) -> Self {
        Self {
            id,
            role: role.into(),
        }
    }
}

/// Which endpoint a token is meant for
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT Claims for access and refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (principal id as a decimal string)
    pub sub: String,
    #[serde(flatten)]
    pub principal: Principal,
    #[serde(rename = "typ")]
    pub kind: TokenKind,
    /// Session id, stable across refresh token rotations
    pub sid: String,
    /// Unique token id
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    /// Create new claims for a principal
    ///
    /// # Arguments
    /// * `principal` - Authenticated identity
    /// * `kind` - Access or refresh
    /// * `session_id` - Session the token belongs to
    /// * `token_id` - Unique id for this token
    /// * `issued_at` - Unix timestamp taken from the service clock
    /// * `expiry_seconds` - Token lifetime in seconds
    /// * `issuer` - Issuer identifier
    pub fn new(
        principal: Principal,
        kind: TokenKind,
        session_id: String,
        token_id: String,
        issued_at: i64,
        expiry_seconds: i64,
        issuer: String,
    ) -> Self {
        Self {
            sub: principal.id.to_string(),
            principal,
            kind,
            sid: session_id,
            jti: token_id,
            iat: issued_at,
            exp: issued_at + expiry_seconds,
            iss: issuer,
        }
    }

    /// Expired once `now` reaches `exp`
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp <= now
    }

    /// `sub` must agree with the embedded principal
    pub fn is_consistent(&self) -> bool {
        self.sub == self.principal.id.to_string()
    }
}
