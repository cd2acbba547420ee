//! Restartable single-shot inactivity countdown.
//!
//! One background task sleeps until the current deadline. `reset()` only
//! moves the deadline forward under a lock; the task notices the new
//! deadline when it wakes and goes back to sleep, so resetting on every
//! pointer move costs a mutex store and no task churn.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::session::SessionError;

type FireCallback = Arc<dyn Fn() + Send + Sync>;

/// Longest countdown `arm` accepts. One week.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Default)]
struct TimerState {
    /// Bumped by every arm and cancel; a task only fires for its own generation.
    generation: u64,
    armed: bool,
    timeout: Duration,
    deadline: Option<Instant>,
    on_fire: Option<FireCallback>,
    task: Option<JoinHandle<()>>,
}

/// Clone is cheap - clones share the same countdown.
#[derive(Clone, Default)]
pub struct InactivityTimer {
    state: Arc<Mutex<TimerState>>,
}

impl InactivityTimer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check that `arm(timeout, ..)` would succeed here, without touching
    /// any countdown. Returns the runtime the countdown would run on.
    pub fn check(timeout: Duration) -> Result<Handle, SessionError> {
        if timeout.is_zero() || timeout > MAX_TIMEOUT {
            return Err(SessionError::InvalidTimeout);
        }
        Handle::try_current().map_err(|_| SessionError::NoRuntime)
    }

    /// Start (or restart) the countdown. Any previous countdown is
    /// cancelled; the last caller wins. On error the timer is left as it
    /// was.
    ///
    /// Returns the generation of this arm cycle, usable with
    /// [`cancel_generation`](Self::cancel_generation).
    pub fn arm<F>(&self, timeout: Duration, on_fire: F) -> Result<u64, SessionError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let handle = Self::check(timeout)?;
        let deadline = Instant::now()
            .checked_add(timeout)
            .ok_or(SessionError::InvalidTimeout)?;

        let mut state = self.lock();
        if let Some(task) = state.task.take() {
            task.abort();
        }
        state.generation += 1;
        state.armed = true;
        state.timeout = timeout;
        state.deadline = Some(deadline);
        state.on_fire = Some(Arc::new(on_fire));

        let generation = state.generation;
        state.task = Some(handle.spawn(Self::run(self.state.clone(), generation)));
        debug!(timeout_secs = timeout.as_secs_f64(), generation, "Inactivity timer armed");
        Ok(generation)
    }

    /// Push the deadline out by the full timeout. No-op (returns false)
    /// when the timer is not armed, including after it has fired.
    pub fn reset(&self) -> bool {
        let mut state = self.lock();
        if !state.armed {
            return false;
        }
        if let Some(deadline) = Instant::now().checked_add(state.timeout) {
            state.deadline = Some(deadline);
        }
        trace!(generation = state.generation, "Inactivity timer reset");
        true
    }

    /// Disarm. Once this returns, no countdown started before the call
    /// will begin invoking its callback.
    ///
    /// The callback runs outside the timer lock. On a multi-thread
    /// runtime a fire already claimed by another worker may still be
    /// running when `cancel` returns; callers that need a hard barrier
    /// must guard the callback themselves. On a current-thread runtime
    /// the two cannot overlap.
    pub fn cancel(&self) {
        let mut state = self.lock();
        Self::disarm(&mut state);
    }

    /// Disarm only if `generation` is still the live arm cycle.
    /// Returns whether anything was cancelled.
    pub fn cancel_generation(&self, generation: u64) -> bool {
        let mut state = self.lock();
        if state.generation != generation || !state.armed {
            return false;
        }
        Self::disarm(&mut state);
        true
    }

    pub fn is_armed(&self) -> bool {
        self.lock().armed
    }

    /// Time left before firing, if armed.
    pub fn remaining(&self) -> Option<Duration> {
        let state = self.lock();
        if !state.armed {
            return None;
        }
        state
            .deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    fn disarm(state: &mut TimerState) {
        let was_armed = state.armed;
        state.generation += 1;
        state.armed = false;
        state.deadline = None;
        state.on_fire = None;
        if let Some(task) = state.task.take() {
            task.abort();
        }
        if was_armed {
            debug!("Inactivity timer cancelled");
        }
    }

    async fn run(shared: Arc<Mutex<TimerState>>, generation: u64) {
        loop {
            let deadline = {
                let state = shared.lock().unwrap_or_else(PoisonError::into_inner);
                match state.deadline {
                    Some(d) if state.armed && state.generation == generation => d,
                    _ => return,
                }
            };

            tokio::time::sleep_until(deadline).await;

            // Claim the fire under the lock so a concurrent cancel either
            // wins outright or finds the timer already disarmed.
            let on_fire = {
                let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
                if !state.armed || state.generation != generation {
                    return;
                }
                match state.deadline {
                    Some(d) if Instant::now() < d => continue,
                    _ => {}
                }
                state.armed = false;
                state.deadline = None;
                state.task = None;
                state.on_fire.take()
            };

            debug!(generation, "Inactivity timer fired");
            if let Some(callback) = on_fire {
                callback();
            }
            return;
        }
    }
}
