//! Client-side submission rate limiting.
//!
//! The persisted absolute deadline is the source of truth. Remaining time is always
//! recomputed from the wall clock, never decremented.

use anyhow::Context;
use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub mod store;

pub use store::{CooldownStore, FileCooldownStore, MemoryCooldownStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(DateTime<Utc>);

impl Deadline {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    pub fn at(self) -> DateTime<Utc> {
        self.0
    }

    pub fn epoch_millis(self) -> i64 {
        self.0.timestamp_millis()
    }

    pub fn encode(self) -> String {
        self.epoch_millis().to_string()
    }

    pub fn decode(raw: &str) -> Option<Self> {
        let millis = raw.trim().parse::<i64>().ok()?;
        DateTime::from_timestamp_millis(millis).map(Self)
    }

    /// Whole seconds left, rounded up. Zero once `now` reaches the deadline.
    pub fn seconds_remaining(self, now: DateTime<Utc>) -> u64 {
        let millis = (self.0 - now).num_milliseconds();
        if millis <= 0 {
            0
        } else {
            ((millis + 999) / 1000) as u64
        }
    }
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn starting_at(at: DateTime<Utc>) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(at.timestamp_millis())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let by = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownState {
    Idle,
    /// The window of the pending attempt counts from `started_at`.
    Submitting { started_at: DateTime<Utc> },
    CooldownActive { deadline: Deadline },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure,
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Success => f.write_str("success"),
            AttemptOutcome::Failure => f.write_str("failure"),
        }
    }
}

/// Answer to a submit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Granted,
    CoolingDown { seconds_remaining: u64 },
    InFlight,
}

pub struct CooldownController<S, C = SystemClock> {
    store: S,
    clock: C,
    window: TimeDelta,
    state: CooldownState,
}

impl<S: CooldownStore, C: Clock> CooldownController<S, C> {
    /// Resumes from whatever deadline the store holds. A stale deadline is cleared.
    pub fn load(store: S, clock: C, window: Duration) -> anyhow::Result<Self> {
        let window = TimeDelta::from_std(window).context("cooldown window out of range")?;
        let now = clock.now();

        let state = match store.get()? {
            Some(deadline) if now < deadline.at() => {
                tracing::info!(
                    seconds_remaining = deadline.seconds_remaining(now),
                    "resuming active cooldown"
                );
                CooldownState::CooldownActive { deadline }
            }
            Some(_) => {
                store.clear()?;
                CooldownState::Idle
            }
            None => CooldownState::Idle,
        };

        Ok(Self {
            store,
            clock,
            window,
            state,
        })
    }

    pub fn state(&self) -> CooldownState {
        self.state
    }

    pub fn window(&self) -> TimeDelta {
        self.window
    }

    pub fn can_submit_now(&self) -> bool {
        match self.state {
            CooldownState::Idle => true,
            CooldownState::Submitting { .. } => false,
            CooldownState::CooldownActive { deadline } => self.clock.now() >= deadline.at(),
        }
    }

    pub fn seconds_remaining(&self) -> u64 {
        match self.state {
            CooldownState::CooldownActive { deadline } => {
                deadline.seconds_remaining(self.clock.now())
            }
            _ => 0,
        }
    }

    /// Checks the stored deadline and, if it has passed, enters `Submitting`.
    pub fn begin_submit(&mut self) -> anyhow::Result<Admission> {
        if matches!(self.state, CooldownState::Submitting { .. }) {
            return Ok(Admission::InFlight);
        }

        let now = self.clock.now();
        match self.store.get()? {
            Some(deadline) if now < deadline.at() => {
                self.state = CooldownState::CooldownActive { deadline };
                Ok(Admission::CoolingDown {
                    seconds_remaining: deadline.seconds_remaining(now),
                })
            }
            _ => {
                self.state = CooldownState::Submitting { started_at: now };
                Ok(Admission::Granted)
            }
        }
    }

    /// Starts a full window regardless of outcome, measured from when the attempt began.
    pub fn record_attempt(&mut self, outcome: AttemptOutcome) -> anyhow::Result<Deadline> {
        let started_at = match self.state {
            CooldownState::Submitting { started_at } => started_at,
            _ => self.clock.now(),
        };
        let deadline = started_at
            .checked_add_signed(self.window)
            .map(Deadline::new)
            .with_context(|| format!("cooldown window of {}s overflows the clock", self.window.num_seconds()))?;
        self.store.set(deadline)?;
        self.state = CooldownState::CooldownActive { deadline };
        tracing::info!(
            %outcome,
            deadline_ms = deadline.epoch_millis(),
            "cooldown started"
        );
        Ok(deadline)
    }

    /// Returns seconds remaining; moves to `Idle` and clears the store once expired.
    ///
    /// A later deadline written to the store by another session is adopted instead.
    pub fn on_tick(&mut self) -> anyhow::Result<u64> {
        let CooldownState::CooldownActive { deadline } = self.state else {
            return Ok(0);
        };

        let now = self.clock.now();
        if deadline.seconds_remaining(now) > 0 {
            return Ok(deadline.seconds_remaining(now));
        }

        match self.store.get()? {
            Some(stored) if now < stored.at() => {
                tracing::info!(
                    seconds_remaining = stored.seconds_remaining(now),
                    "cooldown extended by another session"
                );
                self.state = CooldownState::CooldownActive { deadline: stored };
                Ok(stored.seconds_remaining(now))
            }
            _ => {
                self.store.clear()?;
                self.state = CooldownState::Idle;
                tracing::info!("cooldown expired");
                Ok(0)
            }
        }
    }
}
