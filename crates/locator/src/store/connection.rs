//! Connection lifecycle as an explicit state machine
//!
//! ```text
//! Disconnected -> Connecting{0} -> Connected -> Disconnected
//!                     |  ^
//!                fail |  | retry after policy delay
//!                     v  |
//!                Connecting{n} --policy gives up--> Dead{since}
//! ```
//!
//! A cycle that starts from `Dead` is a revival. While it runs, every other
//! caller fails fast instead of waiting on it.
//!
//! Everything here is synchronous and takes `now` explicitly, so the
//! transitions are testable without a network.

use crate::error::{LocatorError, Result};
use geofinder_core::retry::ReconnectPolicy;
use std::time::{Duration, Instant};

/// Where the store connection currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// `attempt` counts retries, 0 for the first try
    Connecting { attempt: u32 },
    Connected,
    /// Reconnects were exhausted; operations fail fast
    Dead { since: Instant },
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting { .. } => "connecting",
            Self::Connected => "connected",
            Self::Dead { .. } => "dead",
        }
    }
}

/// What a caller should do about a connection that is not live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Run a connect cycle
    Start,
    /// Another caller is connecting; wait for its outcome
    Wait,
}

/// Drives [`ConnectionState`] according to a [`ReconnectPolicy`]
#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionState,
    policy: ReconnectPolicy,
    revive_after: Duration,
    reviving: bool,
}

impl ConnectionMachine {
    pub fn new(policy: ReconnectPolicy, revive_after: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            policy,
            revive_after,
            reviving: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Whether the cycle in flight is reviving a dead connection
    pub fn is_reviving(&self) -> bool {
        self.reviving
    }

    /// Decide how a caller without a live connection proceeds.
    ///
    /// A dead connection refuses everything except a probe, and a probe
    /// only once `revive_after` has passed. A revival in flight refuses
    /// everyone; an ordinary connect in flight makes callers wait.
    pub fn admit(&self, now: Instant, probe: bool) -> Result<Admission> {
        match self.state {
            ConnectionState::Dead { since } => {
                let waited = now.saturating_duration_since(since);
                if probe && waited >= self.revive_after {
                    Ok(Admission::Start)
                } else {
                    Err(LocatorError::StoreUnavailable(format!(
                        "connection declared dead {}s ago",
                        waited.as_secs()
                    )))
                }
            }
            ConnectionState::Connecting { .. } if self.reviving => Err(
                LocatorError::StoreUnavailable("dead connection is being revived".to_string()),
            ),
            ConnectionState::Connecting { .. } => Ok(Admission::Wait),
            _ => Ok(Admission::Start),
        }
    }

    /// Enter `Connecting{0}`
    pub fn begin(&mut self) {
        self.reviving = matches!(self.state, ConnectionState::Dead { .. });
        self.state = ConnectionState::Connecting { attempt: 0 };
    }

    pub fn connected(&mut self) {
        self.reviving = false;
        self.state = ConnectionState::Connected;
    }

    /// Record a failed connect attempt.
    ///
    /// Returns the delay before the next attempt, or `None` once the policy
    /// gives up, at which point the state is `Dead{now}`.
    pub fn attempt_failed(&mut self, now: Instant) -> Option<Duration> {
        let retries = match self.state {
            ConnectionState::Connecting { attempt } => attempt + 1,
            _ => 1,
        };
        match self.policy.delay_for_retry(retries) {
            Some(delay) => {
                self.state = ConnectionState::Connecting { attempt: retries };
                Some(delay)
            }
            None => {
                self.reviving = false;
                self.state = ConnectionState::Dead { since: now };
                None
            }
        }
    }

    /// A live connection dropped; the next call reconnects
    pub fn lost(&mut self) {
        if self.state == ConnectionState::Connected {
            self.state = ConnectionState::Disconnected;
        }
    }

    /// Back to `Disconnected`, forgetting any death
    pub fn reset(&mut self) {
        self.reviving = false;
        self.state = ConnectionState::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> ConnectionMachine {
        ConnectionMachine::new(ReconnectPolicy::default(), Duration::from_secs(30))
    }

    #[test]
    fn test_happy_path() {
        let mut m = machine();
        assert_eq!(m.state(), ConnectionState::Disconnected);
        m.begin();
        assert_eq!(m.state(), ConnectionState::Connecting { attempt: 0 });
        m.connected();
        assert_eq!(m.state(), ConnectionState::Connected);
        m.lost();
        assert_eq!(m.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_backoff_then_dead() {
        let mut m = machine();
        let now = Instant::now();
        m.begin();

        assert_eq!(m.attempt_failed(now), Some(Duration::from_millis(1000)));
        assert_eq!(m.state(), ConnectionState::Connecting { attempt: 1 });
        assert_eq!(m.attempt_failed(now), Some(Duration::from_millis(2000)));
        assert_eq!(m.attempt_failed(now), Some(Duration::from_millis(3000)));
        assert_eq!(m.attempt_failed(now), None);
        assert_eq!(m.state(), ConnectionState::Dead { since: now });
    }

    #[test]
    fn test_dead_fails_fast_until_revive_window() {
        let mut m = ConnectionMachine::new(ReconnectPolicy::no_retry(), Duration::from_secs(30));
        let died = Instant::now();
        m.begin();
        assert_eq!(m.attempt_failed(died), None);

        assert!(matches!(
            m.admit(died, false),
            Err(LocatorError::StoreUnavailable(_))
        ));
        assert!(m.admit(died + Duration::from_secs(10), true).is_err());
        assert!(m.admit(died + Duration::from_secs(31), false).is_err());
        assert_eq!(m.admit(died + Duration::from_secs(31), true).unwrap(), Admission::Start);
    }

    #[test]
    fn test_ordinary_connect_makes_callers_wait() {
        let mut m = machine();
        assert_eq!(m.admit(Instant::now(), false).unwrap(), Admission::Start);
        m.begin();
        assert!(!m.is_reviving());
        assert_eq!(m.admit(Instant::now(), false).unwrap(), Admission::Wait);
        assert_eq!(m.admit(Instant::now(), true).unwrap(), Admission::Wait);
    }

    #[test]
    fn test_revival_refuses_everyone_else() {
        let mut m = ConnectionMachine::new(ReconnectPolicy::no_retry(), Duration::ZERO);
        m.begin();
        m.attempt_failed(Instant::now());
        assert_eq!(m.admit(Instant::now(), true).unwrap(), Admission::Start);

        m.begin();
        assert!(m.is_reviving());
        assert!(matches!(
            m.admit(Instant::now(), false),
            Err(LocatorError::StoreUnavailable(_))
        ));
        assert!(m.admit(Instant::now(), true).is_err());

        m.connected();
        assert!(!m.is_reviving());
    }

    #[test]
    fn test_lost_only_from_connected() {
        let mut m = machine();
        m.begin();
        m.lost();
        assert_eq!(m.state(), ConnectionState::Connecting { attempt: 0 });
    }

    #[test]
    fn test_reset_clears_dead() {
        let mut m = ConnectionMachine::new(ReconnectPolicy::no_retry(), Duration::from_secs(30));
        m.begin();
        m.attempt_failed(Instant::now());
        m.reset();
        assert_eq!(m.state().label(), "disconnected");
        assert!(m.admit(Instant::now(), false).is_ok());
    }
}
