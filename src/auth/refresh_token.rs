/// Refresh Token Session Tracking
///
/// Server-side state for the `reuse_detection` rotation policy.
/// - Each login opens a session keyed by its session id
/// - The session remembers the SHA-256 fingerprint of its current refresh
///   token (never the plaintext)
/// - Rotation is an atomic compare-and-swap on that fingerprint, so a given
///   refresh token is honored by at most one refresh
/// - Presenting a rotated-away token ends every session of its subject

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};

use crate::error::AuthError;

const TOKEN_ID_LENGTH: usize = 32;

/// Generate a random token id (`jti`)
pub fn generate_token_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_ID_LENGTH)
        .map(char::from)
        .collect()
}

/// Generate a new session id (`sid`)
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// SHA-256 fingerprint of a refresh token
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// One tracked session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_id: String,
    pub subject: u64,
    /// Fingerprint of the only refresh token currently honored
    pub token_hash: String,
    pub expires_at: i64,
}

/// Store of active refresh-token sessions
pub trait SessionStore: Send + Sync {
    /// Start tracking a session, dropping sessions expired at `now`
    fn open(&self, record: SessionRecord, now: i64);

    /// Atomically replace `presented_hash` with `next_hash`
    ///
    /// Sessions expired at `now` are dropped first.
    ///
    /// # Errors
    /// - `TokenInvalid` if the session is unknown or already ended
    /// - `TokenReused` if `presented_hash` is not the current token; all
    ///   sessions of the subject are ended before returning
    fn rotate(
        &self,
        session_id: &str,
        presented_hash: &str,
        next_hash: String,
        now: i64,
        expires_at: i64,
    ) -> Result<(), AuthError>;

    /// End one session; returns whether it was active
    fn revoke(&self, session_id: &str) -> bool;

    /// End every session of a subject; returns how many were active
    fn revoke_subject(&self, subject: u64) -> usize;

    fn is_active(&self, session_id: &str) -> bool;
}

/// `SessionStore` kept in process memory
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave a half-written record,
    // so a poisoned map is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionRecord>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn purge_expired(sessions: &mut HashMap<String, SessionRecord>, now: i64) {
    sessions.retain(|_, record| record.expires_at > now);
}

impl SessionStore for InMemorySessionStore {
    fn open(&self, record: SessionRecord, now: i64) {
        let mut sessions = self.lock();
        purge_expired(&mut sessions, now);
        sessions.insert(record.session_id.clone(), record);
    }

    fn rotate(
        &self,
        session_id: &str,
        presented_hash: &str,
        next_hash: String,
        now: i64,
        expires_at: i64,
    ) -> Result<(), AuthError> {
        let mut sessions = self.lock();
        purge_expired(&mut sessions, now);

        let subject = match sessions.get_mut(session_id) {
            None => {
                tracing::warn!(session_id, "Refresh for unknown or ended session");
                return Err(AuthError::TokenInvalid);
            }
            Some(record) if record.token_hash == presented_hash => {
                record.token_hash = next_hash;
                record.expires_at = expires_at;
                return Ok(());
            }
            Some(record) => record.subject,
        };

        // Released before the sweep; a rotation slipping in between is
        // swept along with the rest of the subject's sessions.
        drop(sessions);
        tracing::warn!(
            session_id,
            subject,
            "Rotated refresh token presented again, ending all sessions of subject"
        );
        self.revoke_subject(subject);
        Err(AuthError::TokenReused)
    }

    fn revoke(&self, session_id: &str) -> bool {
        self.lock().remove(session_id).is_some()
    }

    fn revoke_subject(&self, subject: u64) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, record| record.subject != subject);
        let ended = before - sessions.len();
        drop(sessions);

        tracing::info!(subject, sessions_ended = ended, "All sessions revoked for subject");
        ended
    }

    fn is_active(&self, session_id: &str) -> bool {
        self.lock().contains_key(session_id)
    }
}
