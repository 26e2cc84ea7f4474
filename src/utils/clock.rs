// rdsbackup/src/utils/clock.rs
use chrono::{DateTime, Utc};
#[cfg(test)]
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Source of wall-clock time and the only place the backup flow suspends on
/// timers.
#[async_trait::async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

#[async_trait::async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
#[derive(Debug)]
struct FakeClockState {
    t: DateTime<Utc>,
    sleeps: Vec<Duration>,
}

#[cfg(test)]
/// Clock that never blocks: `sleep` records the duration and advances `now`.
#[derive(Debug, Clone)]
pub struct FakeClock {
    state: Arc<Mutex<FakeClockState>>,
}

#[cfg(test)]
impl FakeClock {
    pub fn new_set(t: DateTime<Utc>) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeClockState {
                t,
                sleeps: Vec::new(),
            })),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeClockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        self.lock().t
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.lock();
        state.sleeps.push(duration);
        state.t += chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
    }
}
