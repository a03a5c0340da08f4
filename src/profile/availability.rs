//! Debounced username availability checking.
//!
//! Every keystroke goes through [`UsernameChecker::input`]. The value is
//! only examined once the field has been quiet for the debounce period;
//! a value equal to the previously examined one is skipped. Local rules
//! (see [`validate_username`]) are decided without a query. Otherwise the
//! checker publishes [`UsernameStatus::Checking`] and asks the document
//! store whether the lowercase name is in use.
//!
//! Editing the field away from the examined value resets the status to
//! [`UsernameStatus::Idle`] and discards any query still in flight, so the
//! visible status always describes the current field contents. Backend
//! answers are remembered per value; returning to a value already answered
//! reuses that answer instead of querying again.

#![allow(clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::username::{normalize_username, validate_username, UsernameStatus};
use crate::backend::DocumentStore;
use crate::config::CoreConfig;
use crate::observer::{Observers, Subscription};

#[derive(Default)]
struct CheckerState {
    status: UsernameStatus,
    /// Incremented on every input; identifies the live timer.
    input_seq: u64,
    /// Incremented whenever the field leaves the examined value; identifies
    /// the live query.
    query_seq: u64,
    /// Value the published status describes or is being checked for.
    examined: Option<String>,
    /// Backend answers by examined value.
    answers: HashMap<String, UsernameStatus>,
    timer: Option<JoinHandle<()>>,
}

struct Inner {
    documents: Arc<dyn DocumentStore>,
    collection: String,
    min_length: usize,
    debounce: Duration,
    original: Option<String>,
    state: Mutex<CheckerState>,
    observers: Observers<UsernameStatus>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, CheckerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes `status` if `query_seq` is still the live query.
    fn publish(&self, status: UsernameStatus, query_seq: u64) {
        {
            let mut state = self.lock();
            if state.query_seq != query_seq {
                debug!(?status, "Discarding stale username result");
                return;
            }
            if state.status == status {
                return;
            }
            state.status = status.clone();
        }
        self.observers.notify(&status);
    }

    async fn settle(self: Arc<Self>, raw: String, input_seq: u64) {
        tokio::time::sleep(self.debounce).await;

        let (query_seq, answered) = {
            let mut state = self.lock();
            if state.input_seq != input_seq {
                return;
            }
            // Past the quiet period: later input must not cancel the query.
            state.timer = None;
            if state.examined.as_deref() == Some(raw.as_str()) {
                return;
            }
            state.examined = Some(raw.clone());
            let answered = state.answers.get(&raw).cloned();
            (state.query_seq, answered)
        };

        if let Some(status) = answered {
            debug!(?status, "Reusing username answer");
            self.publish(status, query_seq);
            return;
        }
        if let Some(status) = validate_username(&raw, self.min_length, self.original.as_deref()) {
            self.publish(status, query_seq);
            return;
        }

        self.publish(UsernameStatus::Checking, query_seq);
        let candidate = normalize_username(&raw);
        let status = match self
            .documents
            .find_by_username(&self.collection, &candidate)
            .await
        {
            Ok(true) => UsernameStatus::Taken,
            Ok(false) => UsernameStatus::Available,
            Err(err) => {
                warn!(error = %err, "Username availability query failed");
                UsernameStatus::Error(err.message().to_string())
            }
        };
        debug!(username = %candidate, ?status, "Username checked");
        if matches!(status, UsernameStatus::Available | UsernameStatus::Taken) {
            self.lock().answers.insert(raw, status.clone());
        }
        self.publish(status, query_seq);
    }
}

/// Availability checker bound to one username field.
///
/// Dropping the checker cancels a pending debounce timer.
pub struct UsernameChecker {
    inner: Arc<Inner>,
}

impl UsernameChecker {
    /// Creates a checker for the create flow (`original = None`) or the edit
    /// flow (`original` = the user's current username).
    #[must_use]
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        config: &CoreConfig,
        original: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                documents,
                collection: config.users_collection.clone(),
                min_length: config.username_min_length,
                debounce: config.username_debounce(),
                original: original.map(|name| normalize_username(&name)),
                state: Mutex::new(CheckerState::default()),
                observers: Observers::new(),
            }),
        }
    }

    /// Feeds the current field contents, restarting the debounce timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn input(&self, raw: &str) {
        let reset = {
            let mut state = self.inner.lock();
            state.input_seq += 1;
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            let moved = state.examined.as_deref() != Some(raw);
            if moved {
                // Results still in flight describe an older value.
                state.query_seq += 1;
                state.examined = None;
            }
            let reset = moved && state.status != UsernameStatus::Idle;
            if reset {
                state.status = UsernameStatus::Idle;
            }
            let task = Arc::clone(&self.inner).settle(raw.to_string(), state.input_seq);
            state.timer = Some(tokio::spawn(task));
            reset
        };
        if reset {
            self.inner.observers.notify(&UsernameStatus::Idle);
        }
    }

    /// Returns the latest published status.
    #[must_use]
    pub fn status(&self) -> UsernameStatus {
        self.inner.lock().status.clone()
    }

    /// Returns the username the edit flow started with.
    #[must_use]
    pub fn original(&self) -> Option<&str> {
        self.inner.original.as_deref()
    }

    /// Registers a callback for status changes.
    pub fn subscribe(
        &self,
        callback: impl Fn(&UsernameStatus) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.observers.subscribe(callback)
    }

    /// Cancels a pending debounce timer.
    pub fn cancel(&self) {
        if let Some(timer) = self.inner.lock().timer.take() {
            timer.abort();
        }
    }
}

impl Drop for UsernameChecker {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for UsernameChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsernameChecker")
            .field("status", &self.status())
            .field("original", &self.inner.original)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{InMemoryBackend, Operation};
    use crate::profile::ProfileDocument;

    const QUIET: Duration = Duration::from_millis(600);

    fn setup(original: Option<&str>) -> (UsernameChecker, Arc<InMemoryBackend>) {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_document(
            "users",
            "uid-taken",
            ProfileDocument {
                username: "taken1".to_string(),
                ..ProfileDocument::default()
            },
        );
        let checker = UsernameChecker::new(
            backend.clone(),
            &CoreConfig::default(),
            original.map(str::to_string),
        );
        (checker, backend)
    }

    #[tokio::test(start_paused = true)]
    async fn available_after_quiet_period() {
        let (checker, backend) = setup(None);
        checker.input("ada1815");

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(checker.status(), UsernameStatus::Idle);
        assert_eq!(backend.calls(Operation::QueryUsername), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(checker.status(), UsernameStatus::Available);
    }

    #[tokio::test(start_paused = true)]
    async fn taken_is_case_insensitive() {
        let (checker, _) = setup(None);
        checker.input("Taken1");
        tokio::time::sleep(QUIET).await;
        assert_eq!(checker.status(), UsernameStatus::Taken);
    }

    #[tokio::test(start_paused = true)]
    async fn typing_restarts_timer() {
        let (checker, backend) = setup(None);
        for partial in ["a", "ad", "ada", "ada1"] {
            checker.input(partial);
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        tokio::time::sleep(QUIET).await;

        assert_eq!(backend.calls(Operation::QueryUsername), 1);
        assert_eq!(checker.status(), UsernameStatus::Available);
    }

    #[tokio::test(start_paused = true)]
    async fn editing_resets_status_until_next_answer() {
        let (checker, backend) = setup(None);
        checker.input("ada1815");
        tokio::time::sleep(QUIET).await;
        assert_eq!(checker.status(), UsernameStatus::Available);

        checker.input("taken1");
        assert_eq!(checker.status(), UsernameStatus::Idle);
        tokio::time::sleep(QUIET).await;
        assert_eq!(checker.status(), UsernameStatus::Taken);

        checker.input("ada1815");
        tokio::time::sleep(QUIET).await;
        assert_eq!(checker.status(), UsernameStatus::Available);
        assert_eq!(backend.calls(Operation::QueryUsername), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn late_answer_is_hidden_but_remembered() {
        let (checker, backend) = setup(None);
        backend.set_latency(Operation::QueryUsername, Duration::from_millis(300));

        // Query runs from 500 ms to 800 ms; the field changes at 600 ms.
        checker.input("ada1815");
        tokio::time::sleep(QUIET).await;
        checker.input("ada18150");
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(checker.status(), UsernameStatus::Idle);

        checker.input("ada1815");
        tokio::time::sleep(QUIET).await;
        assert_eq!(checker.status(), UsernameStatus::Available);
        assert_eq!(backend.calls(Operation::QueryUsername), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn query_failure_reports_error() {
        let (checker, backend) = setup(None);
        backend.fail(Operation::QueryUsername);
        checker.input("ada1815");
        tokio::time::sleep(QUIET).await;

        assert!(matches!(checker.status(), UsernameStatus::Error(_)));
        assert!(!checker.status().is_available());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_checker_cancels_timer() {
        let (checker, backend) = setup(None);
        checker.input("ada1815");
        drop(checker);
        tokio::time::sleep(QUIET).await;

        assert_eq!(backend.calls(Operation::QueryUsername), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn edit_flow_original_is_normalized() {
        let (checker, backend) = setup(Some("Ada1"));
        assert_eq!(checker.original(), Some("ada1"));

        checker.input("ADA1");
        tokio::time::sleep(QUIET).await;
        assert_eq!(checker.status(), UsernameStatus::Unchanged);
        assert_eq!(backend.calls(Operation::QueryUsername), 0);
    }
}
