//! Session lifecycle: login, inactivity expiry, token expiry and logout.
//!
//! ```text
//!                 establish()
//! [Unauthenticated] ─────────→ [Active] ──┐ record_activity()
//!        ▲                        │  ▲────┘ (resets timer)
//!        │                        │
//!        │      timer fire / 401 / 403
//!        │                        ▼
//!        └──── handle_logout() ─ [Expiring] ◀─┐ further triggers
//!                                      └──────┘ (absorbed)
//! ```
//!
//! A `SessionManager` lives for one "page lifetime". Once its guard flag
//! is set by a logout or an expiry it never authenticates again; the
//! shell builds a fresh manager for the next login.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use super::credentials::{CredentialRecord, CredentialStore};
use super::timer::InactivityTimer;
use crate::config::SessionConfig;

/// Notice shown when the backend rejects the bearer token.
pub const SESSION_EXPIRED_MESSAGE: &str =
    "Your backend session (JWT Token) has expired. Please log in again when ready.";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session timeout must be greater than zero")]
    InvalidTimeout,

    #[error("No async runtime available to run the inactivity timer")]
    NoRuntime,

    #[error("Session has ended - start a new session to log in again")]
    Terminated,

    #[error("Failed to persist credentials: {0}")]
    Storage(String),
}

/// What the application shell should be showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Active,
    Expiring,
}

/// Why a session is being expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirationReason {
    Inactivity,
    /// Backend answered 401 or 403.
    Unauthorized(u16),
}

/// User input that counts as "still here".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    PointerPress,
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 5] = [
        ActivityKind::PointerPress,
        ActivityKind::PointerMove,
        ActivityKind::KeyPress,
        ActivityKind::Scroll,
        ActivityKind::TouchStart,
    ];
}

/// Blocking-style user notice channel (an alert dialog in a browser, a
/// banner line in the terminal).
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

impl<F> Notifier for F
where
    F: Fn(&str) + Send + Sync,
{
    fn notify(&self, message: &str) {
        self(message)
    }
}

type LogoutListener = Box<dyn Fn() + Send + Sync>;

struct Inner {
    credentials: CredentialStore,
    timer: InactivityTimer,
    config: SessionConfig,
    notifier: Arc<dyn Notifier>,
    /// Guard flag: set by the first logout or expiry, never cleared.
    expired: AtomicBool,
    /// Set once the one-time logout notifications have gone out.
    logged_out: AtomicBool,
    listeners: Mutex<Vec<LogoutListener>>,
    state: watch::Sender<SessionState>,
}

/// Clone is cheap - every clone coordinates the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(
        config: SessionConfig,
        credentials: CredentialStore,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        // A stored session from an earlier run counts as logged in
        let initial = if credentials.is_present() {
            SessionState::Active
        } else {
            SessionState::Unauthenticated
        };
        let (state, _) = watch::channel(initial);

        Self {
            inner: Arc::new(Inner {
                credentials,
                timer: InactivityTimer::new(),
                config,
                notifier,
                expired: AtomicBool::new(false),
                logged_out: AtomicBool::new(false),
                listeners: Mutex::new(Vec::new()),
                state,
            }),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.credentials.is_present()
    }

    /// Bearer token for outgoing requests, if one is stored.
    pub fn token(&self) -> Option<String> {
        self.inner.credentials.token()
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Observe view transitions. Independently mounted views each hold
    /// their own receiver.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Whether this manager has already run its logout or expiry.
    pub fn is_expired(&self) -> bool {
        self.inner.expired.load(Ordering::SeqCst)
    }

    pub fn is_timer_armed(&self) -> bool {
        self.inner.timer.is_armed()
    }

    /// Time left before the inactivity timeout, if the timer is running.
    pub fn inactivity_remaining(&self) -> Option<Duration> {
        self.inner.timer.remaining()
    }

    /// Register a callback run once when this session logs out.
    pub fn on_logout<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    /// Record a successful login: persist credentials, publish `Active`
    /// and start the inactivity countdown. On error nothing is left
    /// stored and the state is `Unauthenticated`.
    pub fn establish(&self, record: &CredentialRecord) -> Result<(), SessionError> {
        if self.is_expired() {
            return Err(SessionError::Terminated);
        }
        // Refuse an unusable timeout or missing runtime before persisting
        InactivityTimer::check(self.timeout())?;

        if let Err(e) = self.inner.credentials.save(record) {
            self.abandon_establish();
            return Err(SessionError::Storage(format!("{:#}", e)));
        }
        self.inner.state.send_replace(SessionState::Active);
        if let Err(e) = self.arm_timer() {
            self.abandon_establish();
            return Err(e);
        }
        info!(email = %record.user.email, "Session established");
        Ok(())
    }

    fn abandon_establish(&self) {
        if let Err(e) = self.inner.credentials.clear() {
            warn!(error = %e, "Failed to roll back credentials after a failed login");
        }
        self.inner.timer.cancel();
        self.inner.state.send_replace(SessionState::Unauthenticated);
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.inner.config.timeout_seconds)
    }

    /// Mount the session into a view. Arms the inactivity timer when
    /// authenticated; dropping the binding releases it.
    pub fn bind(&self) -> Result<SessionBinding, SessionError> {
        let generation = if self.is_authenticated() && !self.is_expired() {
            Some(self.arm_timer()?)
        } else {
            None
        };
        Ok(SessionBinding {
            timer: self.inner.timer.clone(),
            generation,
        })
    }

    /// Feed a user input event. Returns whether a live timer was reset.
    pub fn record_activity(&self, kind: ActivityKind) -> bool {
        trace!(?kind, "Activity");
        self.inner.timer.reset()
    }

    /// Full reset to the logged-out view. Safe to call repeatedly: the
    /// store is cleared and the timer cancelled every time, but listeners
    /// and the view transition only run once.
    pub fn handle_logout(&self) {
        self.inner.expired.store(true, Ordering::SeqCst);

        if let Err(e) = self.inner.credentials.clear() {
            warn!(error = %e, "Failed to clear credentials during logout");
        }
        self.inner.timer.cancel();

        if self.inner.logged_out.swap(true, Ordering::SeqCst) {
            debug!("Logout already completed");
            return;
        }

        let listeners = std::mem::take(
            &mut *self
                .inner
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for listener in &listeners {
            listener();
        }

        self.inner.state.send_replace(SessionState::Unauthenticated);
        info!("Logged out");
    }

    /// Exactly-once expiry. The first caller notifies the user and runs
    /// the logout; every later call returns `false` without side effects.
    pub fn handle_token_expiration(&self, reason: ExpirationReason) -> bool {
        // Check-and-set happens before anything else, so concurrent 401s
        // and a timer fire cannot both get past here.
        if self.inner.expired.swap(true, Ordering::SeqCst) {
            debug!(?reason, "Expiration already handled");
            return false;
        }

        info!(?reason, "Session expired");
        self.inner.state.send_replace(SessionState::Expiring);

        if let Some(message) = self.expiration_notice(reason) {
            self.inner.notifier.notify(message);
        }

        self.handle_logout();
        true
    }

    fn expiration_notice(&self, reason: ExpirationReason) -> Option<&str> {
        match reason {
            ExpirationReason::Inactivity if self.inner.config.show_warning => {
                Some(self.inner.config.warning_message.as_str())
            }
            ExpirationReason::Inactivity => None,
            ExpirationReason::Unauthorized(_) => Some(SESSION_EXPIRED_MESSAGE),
        }
    }

    fn arm_timer(&self) -> Result<u64, SessionError> {
        let timeout = self.timeout();
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.timer.arm(timeout, move || {
            if let Some(inner) = weak.upgrade() {
                SessionManager { inner }.handle_token_expiration(ExpirationReason::Inactivity);
            }
        })
    }
}

/// Scoped ownership of the inactivity timer for one mounted view.
#[must_use = "dropping the binding cancels the inactivity timer"]
pub struct SessionBinding {
    timer: InactivityTimer,
    generation: Option<u64>,
}

impl SessionBinding {
    /// Whether this binding armed the timer.
    pub fn is_armed(&self) -> bool {
        self.generation.is_some()
    }
}

impl Drop for SessionBinding {
    fn drop(&mut self) {
        // A later bind() or login may own the timer now; leave it alone
        if let Some(generation) = self.generation {
            self.timer.cancel_generation(generation);
        }
    }
}
