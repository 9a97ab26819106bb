//! Polling of a submitted registration until the remote side finishes it.

use std::fmt;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::client::RegistrationApi;
use crate::interrupt;

/// How many status checks to make and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_secs(2),
        }
    }
}

/// Result of polling one registration. `Display` is the text stored in the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The remote side reported a terminal state (`done` or `error`).
    Finished { state: String, description: String },
    /// A status request failed; no further attempts were made.
    Failed(String),
    /// No terminal state after every attempt.
    TimedOut { attempts: u32 },
    Interrupted,
}

impl fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollOutcome::Finished { state, description } => write!(f, "{state} - {description}"),
            PollOutcome::Failed(message) => write!(f, "{message}"),
            PollOutcome::TimedOut { attempts } => {
                write!(f, "timeout - no final status after {attempts} attempts")
            }
            PollOutcome::Interrupted => write!(f, "interrupted by user"),
        }
    }
}

/// Check a registration's status until it reaches a terminal state, a request
/// fails, the attempts run out, or `token` is cancelled.
///
/// Cancellation is observed at the start of every attempt and wakes the
/// inter-attempt wait early; a request already in flight is never aborted.
pub async fn poll_status(
    api: &impl RegistrationApi,
    phone_id: Option<&str>,
    registration_id: &str,
    policy: PollPolicy,
    token: &CancellationToken,
) -> PollOutcome {
    for attempt in 1..=policy.max_attempts {
        if token.is_cancelled() {
            return PollOutcome::Interrupted;
        }

        match api.check_status(phone_id, registration_id).await {
            Ok(reply) if reply.is_terminal() => {
                return PollOutcome::Finished {
                    state: reply.state,
                    description: reply.description,
                };
            }
            Ok(reply) => {
                debug!(%registration_id, attempt, state = %reply.state, "registration not final yet");
            }
            Err(e) => {
                warn!(%registration_id, attempt, error = %e, "status check failed");
                return PollOutcome::Failed(e.to_string());
            }
        }

        if attempt < policy.max_attempts {
            interrupt::pause(policy.interval, token).await;
        }
    }

    PollOutcome::TimedOut {
        attempts: policy.max_attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatguru::error::{RegistrationError, StatusError};
    use crate::chatguru::types::{ContactRequest, StatusReply};
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    /// Replays a fixed script of status replies; repeats `fallback` once empty.
    struct ScriptedStatus {
        script: RefCell<VecDeque<Result<StatusReply, StatusError>>>,
        fallback: String,
        calls: Cell<u32>,
        cancel_after: Option<(u32, CancellationToken)>,
    }

    impl ScriptedStatus {
        fn new(states: &[&str], fallback: &str) -> Self {
            Self {
                script: RefCell::new(states.iter().map(|s| Ok(reply(s))).collect()),
                fallback: fallback.to_string(),
                calls: Cell::new(0),
                cancel_after: None,
            }
        }
    }

    fn reply(state: &str) -> StatusReply {
        StatusReply {
            state: state.to_string(),
            description: format!("desc {state}"),
        }
    }

    impl RegistrationApi for ScriptedStatus {
        async fn submit(&self, _contact: &ContactRequest) -> Result<String, RegistrationError> {
            unreachable!("poller never submits")
        }

        async fn check_status(
            &self,
            _phone_id: Option<&str>,
            _registration_id: &str,
        ) -> Result<StatusReply, StatusError> {
            self.calls.set(self.calls.get() + 1);
            if let Some((after, token)) = &self.cancel_after {
                if self.calls.get() == *after {
                    token.cancel();
                }
            }
            self.script
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(reply(&self.fallback)))
        }
    }

    fn fast(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            max_attempts,
            interval: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn returns_terminal_result_on_third_attempt() {
        let api = ScriptedStatus::new(&["pending", "pending", "done"], "pending");
        let token = CancellationToken::new();

        let outcome = poll_status(&api, None, "reg-1", fast(10), &token).await;

        assert_eq!(outcome.to_string(), "done - desc done");
        assert_eq!(api.calls.get(), 3);
    }

    #[tokio::test]
    async fn times_out_after_max_attempts() {
        let api = ScriptedStatus::new(&[], "pending");
        let token = CancellationToken::new();

        let outcome = poll_status(&api, Some("p"), "reg-1", fast(4), &token).await;

        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 4 });
        assert_eq!(api.calls.get(), 4);
        assert_eq!(outcome.to_string(), "timeout - no final status after 4 attempts");
    }

    #[tokio::test]
    async fn error_state_is_terminal() {
        let api = ScriptedStatus::new(&["error"], "pending");
        let token = CancellationToken::new();

        let outcome = poll_status(&api, None, "reg-1", fast(10), &token).await;

        assert!(matches!(outcome, PollOutcome::Finished { ref state, .. } if state == "error"));
        assert_eq!(api.calls.get(), 1);
    }

    #[tokio::test]
    async fn failed_request_stops_immediately() {
        let api = ScriptedStatus::new(&["pending"], "pending");
        api.script
            .borrow_mut()
            .push_back(Err(StatusError::Http { status: 500 }));
        let token = CancellationToken::new();

        let outcome = poll_status(&api, None, "reg-1", fast(10), &token).await;

        assert_eq!(outcome, PollOutcome::Failed("HTTP 500".into()));
        assert_eq!(api.calls.get(), 2);
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let api = ScriptedStatus::new(&[], "pending");
        let token = CancellationToken::new();
        token.cancel();

        let outcome = poll_status(&api, None, "reg-1", fast(10), &token).await;

        assert_eq!(outcome, PollOutcome::Interrupted);
        assert_eq!(outcome.to_string(), "interrupted by user");
        assert_eq!(api.calls.get(), 0);
    }

    #[tokio::test]
    async fn cancellation_during_polling_is_seen_at_next_attempt() {
        let token = CancellationToken::new();
        let mut api = ScriptedStatus::new(&[], "pending");
        api.cancel_after = Some((2, token.clone()));

        let outcome = poll_status(&api, None, "reg-1", fast(10), &token).await;

        assert_eq!(outcome, PollOutcome::Interrupted);
        assert_eq!(api.calls.get(), 2);
    }
}
