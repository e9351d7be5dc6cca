//! Session lifecycle state
//!
//! The state a shard's connection moves through, and the session identity
//! that survives reconnects for resuming.

use super::SequenceTracker;
use std::sync::Arc;

/// Lifecycle of one logical gateway connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport handshake in progress
    Connecting,
    /// Transport open, waiting for Hello
    AwaitingHello,
    /// Identify sent, waiting for READY
    Identifying,
    /// Resume sent, replay in progress
    Resuming,
    /// Steady-state dispatch
    Connected,
    /// Teardown in progress
    Closing,
    /// Connection over; `reconnect` says whether the session survives
    Closed { reconnect: bool },
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::AwaitingHello => write!(f, "awaiting-hello"),
            Self::Identifying => write!(f, "identifying"),
            Self::Resuming => write!(f, "resuming"),
            Self::Connected => write!(f, "connected"),
            Self::Closing => write!(f, "closing"),
            Self::Closed { reconnect } => write!(f, "closed(reconnect={reconnect})"),
        }
    }
}

/// Identity of one logical session, retained across transport drops
///
/// Created empty; filled in by READY; refreshed in place by a successful
/// Resume; wiped when the server invalidates it non-resumably or the
/// client chooses a fresh Identify.
#[derive(Debug)]
pub struct Session {
    session_id: Option<String>,
    resume_gateway_url: Option<String>,
    resumable: bool,
    sequence: Arc<SequenceTracker>,
}

impl Session {
    /// A brand-new session with no identity
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_id: None,
            resume_gateway_url: None,
            resumable: false,
            sequence: Arc::new(SequenceTracker::new()),
        }
    }

    /// The server-assigned session id, if established
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// The URL the server prefers for resume connections
    #[must_use]
    pub fn resume_gateway_url(&self) -> Option<&str> {
        self.resume_gateway_url.as_deref()
    }

    /// Shared handle to the sequence latch
    #[must_use]
    pub fn sequence(&self) -> Arc<SequenceTracker> {
        Arc::clone(&self.sequence)
    }

    /// Whether the next connection attempt should Resume
    #[must_use]
    pub fn can_resume(&self) -> bool {
        self.resumable && self.session_id.is_some()
    }

    /// Record a successful Identify (READY received)
    pub fn established(&mut self, session_id: String, resume_gateway_url: Option<String>) {
        self.session_id = Some(session_id);
        self.resume_gateway_url = resume_gateway_url;
        self.resumable = true;
    }

    /// Apply an invalidation signal
    ///
    /// `resumable = true` keeps the identity for a Resume attempt;
    /// `false` wipes the id and the sequence latch so the next attempt is
    /// a fresh Identify.
    pub fn invalidate(&mut self, resumable: bool) {
        if resumable {
            self.resumable = self.session_id.is_some();
        } else {
            self.session_id = None;
            self.resume_gateway_url = None;
            self.resumable = false;
            self.sequence.reset();
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_cannot_resume() {
        let session = Session::new();
        assert!(!session.can_resume());
        assert!(session.session_id().is_none());
    }

    #[test]
    fn test_established_session_resumes() {
        let mut session = Session::new();
        session.established("abc123".to_string(), Some("ws://example/gateway".to_string()));
        session.sequence().observe(3);

        assert!(session.can_resume());
        assert_eq!(session.session_id(), Some("abc123"));
        assert_eq!(session.resume_gateway_url(), Some("ws://example/gateway"));
        assert_eq!(session.sequence().current(), Some(3));
    }

    #[test]
    fn test_resumable_invalidation_keeps_identity() {
        let mut session = Session::new();
        session.established("abc123".to_string(), None);
        session.sequence().observe(5);

        session.invalidate(true);

        assert!(session.can_resume());
        assert_eq!(session.session_id(), Some("abc123"));
        assert_eq!(session.sequence().current(), Some(5));
    }

    #[test]
    fn test_nonresumable_invalidation_wipes_everything() {
        let mut session = Session::new();
        session.established("abc123".to_string(), Some("ws://x".to_string()));
        session.sequence().observe(5);

        session.invalidate(false);

        assert!(!session.can_resume());
        assert!(session.session_id().is_none());
        assert!(session.resume_gateway_url().is_none());
        assert_eq!(session.sequence().current(), None);
    }

    #[test]
    fn test_resumable_flag_without_identity_is_inert() {
        let mut session = Session::new();
        session.invalidate(true);
        assert!(!session.can_resume());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::AwaitingHello.to_string(), "awaiting-hello");
        assert_eq!(
            SessionState::Closed { reconnect: true }.to_string(),
            "closed(reconnect=true)"
        );
    }
}
