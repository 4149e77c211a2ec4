/// JWT Token Signing and Verification
///
/// HS256 signing with the server-held secret. Expiry is not delegated to
/// `jsonwebtoken`: it is compared against the service clock so that
/// `exp == now` already counts as expired.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::{Claims, TokenKind};
use crate::error::{AppError, AuthError};

/// Signing and verification keys derived once from the secret
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Sign claims into a compact JWT
///
/// # Errors
/// Returns error if token generation fails
pub fn sign_token(claims: &Claims, keys: &JwtKeys) -> Result<String, AppError> {
    encode(&Header::new(Algorithm::HS256), claims, &keys.encoding)
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Check signature, issuer and token kind, ignoring expiry
///
/// # Errors
/// `TokenInvalid` for a bad signature, a foreign issuer, malformed claims or
/// a token of the wrong kind
pub fn decode_token(
    token: &str,
    expected: TokenKind,
    keys: &JwtKeys,
    issuer: &str,
) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    validation.validate_exp = false;
    validation.leeway = 0;

    let claims = decode::<Claims>(token, &keys.decoding, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!("JWT validation error: {}", e);
            AuthError::TokenInvalid
        })?;

    if claims.kind != expected {
        tracing::warn!(
            expected = ?expected,
            actual = ?claims.kind,
            "Token presented to the wrong endpoint"
        );
        return Err(AuthError::TokenInvalid);
    }

    if !claims.is_consistent() {
        tracing::warn!(sub = %claims.sub, "Token subject does not match principal");
        return Err(AuthError::TokenInvalid);
    }

    Ok(claims)
}

/// Full verification: `decode_token` plus expiry against `now`
///
/// # Errors
/// `TokenInvalid` as in `decode_token`, then `TokenExpired` when `exp <= now`
pub fn verify_token(
    token: &str,
    expected: TokenKind,
    keys: &JwtKeys,
    issuer: &str,
    now: i64,
) -> Result<Claims, AuthError> {
    let claims = decode_token(token, expected, keys, issuer)?;

    if claims.is_expired_at(now) {
        tracing::info!(sub = %claims.sub, exp = claims.exp, now, "Token expired");
        return Err(AuthError::TokenExpired);
    }

    Ok(claims)
}
