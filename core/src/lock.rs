//! Session-scoped process lock with a sliding inactivity window.
//!
//! The lock owns its timer. Every arm, re-arm or release bumps a generation
//! counter, so an expiry notice from a superseded timer is recognised as stale
//! and ignored.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Delivered when an armed window runs out with no activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InactivityExpired {
    generation: u64,
}

#[derive(Debug)]
pub struct ProcessLock {
    locked: bool,
    deadline: Option<Instant>,
    window: Duration,
    generation: u64,
    timer: Option<JoinHandle<()>>,
    notifier: Option<mpsc::UnboundedSender<InactivityExpired>>,
}

impl ProcessLock {
    pub fn new(window: Duration) -> Self {
        Self {
            locked: false,
            deadline: None,
            window,
            generation: 0,
            timer: None,
            notifier: None,
        }
    }

    /// Route expiry notices to `tx`. Without a notifier the lock still expires,
    /// but only when [`ProcessLock::is_expired`] is polled.
    pub fn set_notifier(&mut self, tx: mpsc::UnboundedSender<InactivityExpired>) {
        self.notifier = Some(tx);
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Take the lock and arm the window. Fails if already held.
    pub fn acquire(&mut self) -> bool {
        if self.locked {
            return false;
        }
        self.locked = true;
        self.arm();
        true
    }

    /// Slide the window forward; no-op when unlocked.
    pub fn touch(&mut self) {
        if self.locked {
            self.arm();
        }
    }

    /// Unlock and cancel any pending timer.
    pub fn release(&mut self) {
        self.locked = false;
        self.deadline = None;
        self.generation = self.generation.wrapping_add(1);
        self.cancel_timer();
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.locked && self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Whether `expiry` came from the currently armed timer.
    pub fn is_current(&self, expiry: InactivityExpired) -> bool {
        self.locked && expiry.generation == self.generation
    }

    fn arm(&mut self) {
        self.cancel_timer();
        self.generation = self.generation.wrapping_add(1);
        let deadline = Instant::now() + self.window;
        self.deadline = Some(deadline);

        let Some(tx) = self.notifier.clone() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("no runtime available; inactivity expiry is poll-only");
            return;
        };
        let expiry = InactivityExpired {
            generation: self.generation,
        };
        self.timer = Some(runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = tx.send(expiry);
        }));
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn second_acquire_is_rejected() {
        let mut lock = ProcessLock::new(WINDOW);
        assert!(lock.acquire());
        assert!(!lock.acquire());
        lock.release();
        assert!(!lock.is_locked());
        assert!(lock.deadline().is_none());
        assert!(lock.acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn touch_slides_the_deadline() {
        let mut lock = ProcessLock::new(WINDOW);
        lock.acquire();
        let first = lock.deadline().unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        lock.touch();
        assert!(lock.deadline().unwrap() > first);
        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(!lock.is_expired(Instant::now()));
        tokio::time::advance(Duration::from_secs(20)).await;
        assert!(lock.is_expired(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn timer_notifies_once_window_elapses() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut lock = ProcessLock::new(WINDOW);
        lock.set_notifier(tx);
        lock.acquire();

        let expiry = rx.recv().await.unwrap();
        assert!(lock.is_current(expiry));
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_timer_is_stale() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut lock = ProcessLock::new(WINDOW);
        lock.set_notifier(tx);
        lock.acquire();
        let stale = InactivityExpired {
            generation: lock.generation,
        };
        lock.touch();
        assert!(!lock.is_current(stale));

        lock.release();
        tokio::time::advance(WINDOW * 2).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err(), "released lock must not fire");
    }

    #[test]
    fn arming_without_runtime_is_poll_only() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut lock = ProcessLock::new(WINDOW);
        lock.set_notifier(tx);
        assert!(lock.acquire());
        assert!(lock.deadline().is_some());
    }
}
