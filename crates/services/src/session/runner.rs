use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::warn;

use quiz_core::model::QuestionId;

use crate::error::SessionError;

use super::machine::{AttemptSession, SessionState};
use super::service::AttemptSessionService;

/// Countdown resolution for timed attempts.
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// Idle-safety re-persist interval for the answer sheet.
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(15);

/// Drives an in-progress session with the two timer loops the lifecycle
/// needs: a 1-second countdown (timed quizzes only) and a 15-second
/// autosave.
///
/// Both loops are owned tasks, not ambient timers: they stop on their own
/// once the session leaves `InProgress`, and `shutdown` (also run on drop
/// and after a successful submit) aborts them outright so nothing ever
/// fires against a stale attempt.
///
/// Spawn only for a session that is already `InProgress`.
pub struct SessionRunner {
    service: Arc<AttemptSessionService>,
    session: Arc<Mutex<AttemptSession>>,
    remaining_rx: watch::Receiver<Option<u64>>,
    countdown: Option<JoinHandle<()>>,
    autosave: Option<JoinHandle<()>>,
}

impl SessionRunner {
    /// Take ownership of `session` and spawn the timer loops.
    #[must_use]
    pub fn spawn(service: Arc<AttemptSessionService>, session: AttemptSession) -> Self {
        let initial = session.remaining_seconds(service.clock().now());
        let timed = session.deadline().is_some();
        let session = Arc::new(Mutex::new(session));
        let (remaining_tx, remaining_rx) = watch::channel(initial);

        let countdown = timed.then(|| {
            let service = Arc::clone(&service);
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(COUNTDOWN_TICK);
                loop {
                    tick.tick().await;
                    let mut guard = session.lock().await;
                    if guard.state() != SessionState::InProgress {
                        break;
                    }
                    let remaining = guard.remaining_seconds(service.clock().now());
                    let _ = remaining_tx.send(remaining);
                    if remaining == Some(0) {
                        // One auto-submit, then stop: a failed expiry submit
                        // leaves the attempt open for a manual retry rather
                        // than hammering the service every second.
                        if let Err(err) = service.expire_if_due(&mut guard).await {
                            warn!(error = %err, "auto-submit at expiry failed, attempt stays open");
                        }
                        break;
                    }
                }
            })
        });

        let autosave = {
            let service = Arc::clone(&service);
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(AUTOSAVE_INTERVAL);
                // The first interval tick resolves immediately; skip it so
                // the first write lands a full period after spawn.
                tick.tick().await;
                loop {
                    tick.tick().await;
                    let guard = session.lock().await;
                    if guard.state() != SessionState::InProgress {
                        break;
                    }
                    service.autosave_tick(&guard).await;
                }
            })
        };

        Self {
            service,
            session,
            remaining_rx,
            countdown,
            autosave: Some(autosave),
        }
    }

    /// Watch channel publishing remaining whole seconds; stays `None` for
    /// untimed quizzes.
    #[must_use]
    pub fn remaining(&self) -> watch::Receiver<Option<u64>> {
        self.remaining_rx.clone()
    }

    /// Shared handle to the underlying session.
    #[must_use]
    pub fn session(&self) -> Arc<Mutex<AttemptSession>> {
        Arc::clone(&self.session)
    }

    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state()
    }

    /// Record an answer; persisted immediately by the service.
    ///
    /// # Errors
    ///
    /// Returns the service's state/validation errors.
    pub async fn answer(
        &self,
        question: QuestionId,
        option: impl Into<String> + Send,
    ) -> Result<(), SessionError> {
        let mut guard = self.session.lock().await;
        self.service.answer(&mut guard, question, option).await
    }

    /// Explicit draft save.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the session is not in progress or the
    /// write fails.
    pub async fn save_draft(&self) -> Result<(), SessionError> {
        let guard = self.session.lock().await;
        self.service.save_draft(&guard).await
    }

    /// Manual submit; cancels both timer loops on success.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` on state violations or a failed submission
    /// (which leaves the attempt open for retry, timers still running).
    pub async fn submit(&mut self) -> Result<(), SessionError> {
        {
            let mut guard = self.session.lock().await;
            self.service.submit(&mut guard).await?;
        }
        self.shutdown();
        Ok(())
    }

    /// Abort both timer loops.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.countdown.take() {
            handle.abort();
        }
        if let Some(handle) = self.autosave.take() {
            handle.abort();
        }
    }
}

impl Drop for SessionRunner {
    fn drop(&mut self) {
        self.shutdown();
    }
}
