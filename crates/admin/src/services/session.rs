//! Admin session management.
//!
//! A process holds at most one admin session. Logging in verifies the
//! credentials against the store and starts a countdown; when it elapses the
//! credentials are dropped and a [`SessionEvent::Expired`] is broadcast.
//!
//! Nothing trusts a cached "logged in" flag: [`SessionManager::require_session`]
//! re-checks the TTL and re-verifies the credentials on every call, so a
//! password rotated on the server ends the session at the next operation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{RwLock, RwLockReadGuard, broadcast};
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::db::{AdminGateway, RepositoryError};
use crate::models::{AdminCredentials, SessionEvent, SessionStatus};

const EVENT_CAPACITY: usize = 16;

/// Longest session a manager will hand out.
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(86_400);

/// Why an operation was refused.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Nobody is logged in.
    #[error("you need to login")]
    NoSession,

    /// The session outlived its TTL.
    #[error("your session has expired, login again")]
    Expired,

    /// The stored credentials no longer pass the admin check.
    #[error("wrong credentials")]
    Rejected,

    /// The credential check could not reach the store.
    #[error("store unavailable: {0}")]
    Unavailable(#[source] RepositoryError),
}

struct AdminSession {
    generation: u64,
    credentials: AdminCredentials,
    expires_at: Instant,
}

#[derive(Default)]
struct SessionState {
    session: Option<AdminSession>,
    countdown: Option<AbortHandle>,
}

impl SessionState {
    fn cancel_countdown(&mut self) {
        if let Some(countdown) = self.countdown.take() {
            countdown.abort();
        }
    }
}

/// Proof that the admin session was valid when the operation started.
///
/// Holds a read lock on the session: the countdown cannot clear the
/// credentials while an operation is using them.
pub struct ActiveSession<'a> {
    session: RwLockReadGuard<'a, AdminSession>,
}

impl ActiveSession<'_> {
    /// Credentials of the logged-in admin.
    #[must_use]
    pub fn credentials(&self) -> &AdminCredentials {
        &self.session.credentials
    }

    /// Name of the logged-in admin.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.session.credentials.username
    }

    /// Check the TTL again, for operations that waited on the admin.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Expired` once the session has outlived its TTL.
    pub fn ensure_live(&self) -> Result<(), SessionError> {
        if Instant::now() >= self.session.expires_at {
            return Err(SessionError::Expired);
        }
        Ok(())
    }
}

/// Owner of the single admin session of this process.
pub struct SessionManager<G> {
    gateway: Arc<G>,
    ttl: Duration,
    state: Arc<RwLock<SessionState>>,
    events: broadcast::Sender<SessionEvent>,
    generation: AtomicU64,
}

impl<G: AdminGateway> SessionManager<G> {
    /// Create a manager with no active session.
    ///
    /// `ttl` is capped at [`MAX_SESSION_TTL`].
    #[must_use]
    pub fn new(gateway: Arc<G>, ttl: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            gateway,
            ttl: ttl.min(MAX_SESSION_TTL),
            state: Arc::default(),
            events,
            generation: AtomicU64::new(0),
        }
    }

    /// The gateway sessions are verified against.
    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Session lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Receive session notifications (expiry, logout).
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Start a session if the credentials pass the admin check.
    ///
    /// Any previous session and its countdown are dropped first, whatever
    /// the outcome.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Unavailable` if the store cannot be reached.
    pub async fn login(&self, credentials: AdminCredentials) -> Result<bool, SessionError> {
        let verdict = self.gateway.test_admin_credentials(&credentials).await;

        let mut state = self.state.write().await;
        state.cancel_countdown();

        match verdict {
            Ok(true) => {
                let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
                let now = Instant::now();
                let expires_at = now.checked_add(self.ttl).unwrap_or(now);
                tracing::info!(
                    username = %credentials.username,
                    ttl_secs = self.ttl.as_secs(),
                    "Admin session started"
                );
                state.session = Some(AdminSession {
                    generation,
                    credentials,
                    expires_at,
                });
                state.countdown = Some(self.spawn_countdown(generation, expires_at));
                Ok(true)
            }
            Ok(false) => {
                tracing::warn!(username = %credentials.username, "Admin login rejected");
                state.session = None;
                Ok(false)
            }
            Err(e) => {
                tracing::error!(error = %e, "Admin login failed, store unavailable");
                state.session = None;
                Err(SessionError::Unavailable(e))
            }
        }
    }

    /// Drop the session, if any, and the connections it held.
    pub async fn logout(&self) {
        let mut state = self.state.write().await;
        state.cancel_countdown();
        let ended = state.session.take();
        drop(state);

        if let Some(session) = ended {
            let username = session.credentials.username;
            tracing::info!(username = %username, "Admin logged out");
            let _ = self.events.send(SessionEvent::LoggedOut { username });
        }
        self.gateway.release().await;
    }

    /// Check that an admin session is usable right now.
    ///
    /// The returned guard must be kept for the whole operation.
    ///
    /// # Errors
    ///
    /// - `SessionError::NoSession` if nobody is logged in
    /// - `SessionError::Expired` if the TTL elapsed
    /// - `SessionError::Rejected` if the credentials no longer verify
    /// - `SessionError::Unavailable` if the store cannot be reached
    pub async fn require_session(&self) -> Result<ActiveSession<'_>, SessionError> {
        let state = self.state.read().await;
        let session = RwLockReadGuard::try_map(state, |s| s.session.as_ref())
            .map_err(|_| SessionError::NoSession)?;

        let active = ActiveSession { session };
        active.ensure_live()?;

        let verdict = self
            .gateway
            .test_admin_credentials(active.credentials())
            .await;

        match verdict {
            Ok(true) => Ok(active),
            Ok(false) => {
                tracing::warn!(
                    username = %active.username(),
                    "Admin credentials no longer valid"
                );
                Err(SessionError::Rejected)
            }
            Err(e) => Err(SessionError::Unavailable(e)),
        }
    }

    /// Who is logged in and for how much longer.
    pub async fn status(&self) -> Option<SessionStatus> {
        let state = self.state.read().await;
        let session = state.session.as_ref()?;
        let remaining = session
            .expires_at
            .checked_duration_since(Instant::now())
            .filter(|remaining| !remaining.is_zero())?;

        Some(SessionStatus {
            username: session.credentials.username.clone(),
            remaining,
        })
    }

    fn spawn_countdown(&self, generation: u64, expires_at: Instant) -> AbortHandle {
        let state = Arc::clone(&self.state);
        let gateway = Arc::clone(&self.gateway);
        let events = self.events.clone();

        tokio::spawn(async move {
            tokio::time::sleep_until(expires_at).await;

            let mut state = state.write().await;
            let Some(session) = state.session.take_if(|s| s.generation == generation) else {
                return;
            };
            state.countdown = None;
            drop(state);

            let username = session.credentials.username;
            tracing::warn!(username = %username, "Admin session expired");
            let _ = events.send(SessionEvent::Expired { username });
            gateway.release().await;
        })
        .abort_handle()
    }
}
