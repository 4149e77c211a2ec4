/// Authentication module
///
/// Handles JWT signing/verification, credential checks, refresh token
/// session tracking and the token service tying them together.

mod claims;
mod credentials;
mod jwt;
mod password;
mod refresh_token;
mod service;

pub use claims::{Claims, Principal, TokenKind};
pub use credentials::{CredentialStore, Credentials, InMemoryCredentialStore};
pub use jwt::{decode_token, sign_token, verify_token, JwtKeys};
pub use password::{hash_password, verify_password};
pub use refresh_token::{hash_token, InMemorySessionStore, SessionRecord, SessionStore};
pub use service::{IssuedTokens, RefreshedTokens, TokenService};
