//! Cancellable timers backed by tokio tasks
//!
//! Each timer owns at most one task. Re-arming or starting again cancels the
//! previous task first, and dropping the timer cancels whatever is pending.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// A single-shot delayed action with one cancellation point
#[derive(Debug, Default)]
pub struct OneShot {
    handle: Option<JoinHandle<()>>,
}

impl OneShot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` once `delay` has elapsed, replacing any pending action.
    pub fn arm<F, Fut>(&mut self, delay: Duration, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action().await;
        }));
    }

    /// Returns true if something was pending.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                let pending = !handle.is_finished();
                handle.abort();
                pending
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for OneShot {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A fixed-period repeating action
#[derive(Debug, Default)]
pub struct Ticker {
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `on_tick` every `period`, starting one period from now.
    /// A running ticker is stopped first.
    pub fn start<F, Fut>(&mut self, period: Duration, mut on_tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop();
        self.handle = Some(tokio::spawn(async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                on_tick().await;
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
