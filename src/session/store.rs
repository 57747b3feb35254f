//! Per-user session state.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;
use tracing::debug;

use super::types::{Server, SessionMode, UserId};

/// State of one user's conversation.
///
/// The uploaded file is owned here, so it is deleted from disk whenever
/// the session is reset or dropped.
#[derive(Debug)]
pub struct UserSession {
    /// Current conversation mode.
    pub mode: SessionMode,

    /// Server picked with the server keyboard.
    pub server: Option<Server>,

    /// Valid records found in the uploaded file.
    pub valid_accounts: usize,

    upload: Option<NamedTempFile>,

    /// Last time the user's events touched this session.
    last_seen: Instant,
}

impl Default for UserSession {
    fn default() -> Self {
        Self {
            mode: SessionMode::default(),
            server: None,
            valid_accounts: 0,
            upload: None,
            last_seen: Instant::now(),
        }
    }
}

impl UserSession {
    /// Creates an idle session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an accepted upload and moves on to asking for the count.
    pub fn attach_upload(&mut self, upload: NamedTempFile, valid_accounts: usize) {
        self.upload = Some(upload);
        self.valid_accounts = valid_accounts;
        self.mode = SessionMode::AwaitingCount;
    }

    /// Takes ownership of the stored upload.
    pub fn take_upload(&mut self) -> Option<NamedTempFile> {
        self.upload.take()
    }

    /// Drops the upload and returns to idle.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// A running batch never expires.
    fn is_stale(&self, idle_timeout: Duration) -> bool {
        self.mode != SessionMode::Processing && self.last_seen.elapsed() >= idle_timeout
    }
}

/// Sessions keyed by user.
///
/// Sessions left unfinished for longer than the idle timeout are dropped
/// together with their uploads.
#[derive(Debug)]
pub struct SessionStore {
    sessions: HashMap<UserId, UserSession>,
    idle_timeout: Duration,
}

impl SessionStore {
    #[must_use]
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            idle_timeout,
        }
    }

    /// Returns the user's session, creating an idle one on first contact.
    ///
    /// A stale session is replaced by a fresh one.
    pub fn entry(&mut self, user: UserId) -> &mut UserSession {
        let idle_timeout = self.idle_timeout;
        let session = self.sessions.entry(user).or_default();
        if session.is_stale(idle_timeout) {
            debug!("Session of user {} expired", user);
            session.reset();
        }
        session.last_seen = Instant::now();
        session
    }

    /// Returns the user's mode without creating a session.
    #[must_use]
    pub fn mode(&self, user: UserId) -> SessionMode {
        self.sessions
            .get(&user)
            .filter(|session| !session.is_stale(self.idle_timeout))
            .map_or(SessionMode::Idle, |session| session.mode)
    }

    /// Removes the user's session, deleting any upload it holds.
    pub fn clear(&mut self, user: UserId) {
        self.sessions.remove(&user);
    }

    /// Drops every stale session and returns how many were removed.
    pub fn expire_idle(&mut self) -> usize {
        let before = self.sessions.len();
        let idle_timeout = self.idle_timeout;
        self.sessions.retain(|_, session| !session.is_stale(idle_timeout));
        before - self.sessions.len()
    }
}
