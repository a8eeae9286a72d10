use std::future::Future;
use std::time::Duration;

use crate::timer::OneShot;

/// Stands in for a media "ended" signal that will never arrive
///
/// Armed when the response audio is blocked or missing. Holds at most one
/// pending action; `cancel` is the only way to disarm it short of firing.
#[derive(Debug)]
pub struct FallbackTimer {
    delay: Duration,
    timer: OneShot,
}

impl FallbackTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            timer: OneShot::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn arm<F, Fut>(&mut self, on_elapsed: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.timer.arm(self.delay, on_elapsed);
    }

    pub fn cancel(&mut self) -> bool {
        self.timer.cancel()
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }
}
