use crate::cooldown::{Clock, CooldownController, CooldownState, CooldownStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const LOADING_ROTATION_PERIOD: Duration = Duration::from_secs(5);
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// A repeating background task. Dropping the guard stops it.
#[derive(Debug)]
pub struct PeriodicTask {
    handle: JoinHandle<()>,
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Runs `f` every `period`, first after one full period.
pub fn spawn_periodic<F>(period: Duration, mut f: F) -> PeriodicTask
where
    F: FnMut() + Send + 'static,
{
    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            interval.tick().await;
            f();
        }
    });
    PeriodicTask { handle }
}

/// Status lines shown while a submission is in flight.
#[derive(Debug, Clone)]
pub struct LoadingMessages {
    messages: Arc<[&'static str]>,
    index: Arc<AtomicUsize>,
}

impl Default for LoadingMessages {
    fn default() -> Self {
        Self::new(&[
            "Analyzing your Funds...",
            "Calculating NAV Performance...",
            "Calculating Funds as per your need...",
            "Calculating your portfolio allocation...",
        ])
    }
}

impl LoadingMessages {
    pub fn new(messages: &[&'static str]) -> Self {
        Self {
            messages: messages.into(),
            index: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn current(&self) -> &'static str {
        if self.messages.is_empty() {
            return "";
        }
        self.messages[self.index.load(Ordering::SeqCst) % self.messages.len()]
    }

    pub fn advance(&self) -> &'static str {
        if !self.messages.is_empty() {
            let len = self.messages.len();
            let _ = self
                .index
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |i| Some((i + 1) % len));
        }
        self.current()
    }

    pub fn reset(&self) {
        self.index.store(0, Ordering::SeqCst);
    }

    /// Rotates the message every `period`, handing each new one to `show`.
    /// The index goes back to the first message when the returned guard drops.
    pub fn start<F>(&self, period: Duration, mut show: F) -> LoadingRotation
    where
        F: FnMut(&'static str) + Send + 'static,
    {
        self.reset();
        show(self.current());
        let messages = self.clone();
        let task = spawn_periodic(period, move || show(messages.advance()));
        LoadingRotation {
            _task: task,
            messages: self.clone(),
        }
    }
}

#[derive(Debug)]
pub struct LoadingRotation {
    _task: PeriodicTask,
    messages: LoadingMessages,
}

impl Drop for LoadingRotation {
    fn drop(&mut self) {
        self.messages.reset();
    }
}

/// Ticks `controller` every second until the cooldown is over.
///
/// Dropping the future stops the countdown; the stored deadline stays in place.
pub async fn run_countdown<S, C, F>(
    controller: &mut CooldownController<S, C>,
    tick: Duration,
    mut on_tick: F,
) -> anyhow::Result<()>
where
    S: CooldownStore,
    C: Clock,
    F: FnMut(u64),
{
    let mut interval = tokio::time::interval(tick);
    while matches!(controller.state(), CooldownState::CooldownActive { .. }) {
        interval.tick().await;
        let remaining = controller.on_tick()?;
        on_tick(remaining);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cooldown::{AttemptOutcome, ManualClock, MemoryCooldownStore};
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    #[test]
    fn loading_messages_cycle_and_reset() {
        let messages = LoadingMessages::default();
        assert_eq!(messages.current(), "Analyzing your Funds...");
        assert_eq!(messages.advance(), "Calculating NAV Performance...");
        messages.advance();
        assert_eq!(messages.advance(), "Calculating your portfolio allocation...");
        assert_eq!(messages.advance(), "Analyzing your Funds...");
        messages.advance();
        messages.reset();
        assert_eq!(messages.current(), "Analyzing your Funds...");
    }

    #[tokio::test]
    async fn periodic_task_stops_when_dropped() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let task = spawn_periodic(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(55)).await;
        drop(task);
        let seen = count.load(Ordering::SeqCst);
        assert!(seen >= 1, "task never ran");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn loading_rotation_resets_on_drop() {
        let shown = Arc::new(Mutex::new(Vec::new()));
        let sink = shown.clone();
        let messages = LoadingMessages::new(&["one", "two", "three"]);

        let rotation = messages.start(Duration::from_millis(10), move |m| {
            sink.lock().unwrap().push(m);
        });
        tokio::time::sleep(Duration::from_millis(35)).await;
        drop(rotation);

        let shown = shown.lock().unwrap().clone();
        assert_eq!(shown[0], "one");
        assert!(shown.len() >= 2);
        assert_eq!(shown[1], "two");
        assert_eq!(messages.current(), "one");
    }

    #[tokio::test]
    async fn countdown_runs_until_idle() {
        let store = MemoryCooldownStore::default();
        let clock = ManualClock::starting_at(Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap());
        let mut ctl =
            CooldownController::load(store.clone(), clock.clone(), Duration::from_secs(3)).unwrap();
        ctl.begin_submit().unwrap();
        ctl.record_attempt(AttemptOutcome::Success).unwrap();

        let mut seen = Vec::new();
        run_countdown(&mut ctl, Duration::from_millis(1), |remaining| {
            seen.push(remaining);
            clock.advance(Duration::from_secs(1));
        })
        .await
        .unwrap();

        assert_eq!(seen, vec![3, 2, 1, 0]);
        assert_eq!(ctl.state(), CooldownState::Idle);
        assert_eq!(store.get().unwrap(), None);
    }
}
