//! Timer scheduling for the status poller.
//!
//! The poller never sleeps directly. It asks a [`Scheduler`] for a [`Timer`]
//! and waits on it, so the poll interval and the deadline can be driven by a
//! paused tokio clock or any other time source in tests.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

type Fire = Pin<Box<dyn Future<Output = ()> + Send>>;
type CancelHook = Box<dyn FnOnce() + Send>;

/// Source of one-shot timers.
pub trait Scheduler: Send + Sync {
    /// Arm a timer that fires once `delay` has passed.
    fn after(&self, label: &'static str, delay: Duration) -> Timer;
}

/// A pending one-shot timer.
///
/// Cancelling is idempotent: the cancel hook runs at most once no matter how
/// many times [`Timer::cancel`] is called, and a cancelled timer never fires.
pub struct Timer {
    label: &'static str,
    fire: Option<Fire>,
    on_cancel: Option<CancelHook>,
    fired: bool,
}

impl Timer {
    pub fn new(label: &'static str, fire: impl Future<Output = ()> + Send + 'static) -> Self {
        Self {
            label,
            fire: Some(Box::pin(fire)),
            on_cancel: None,
            fired: false,
        }
    }

    /// Attach a hook that runs when the timer is cancelled before firing.
    pub fn on_cancel(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_cancel = Some(Box::new(hook));
        self
    }

    pub fn is_pending(&self) -> bool {
        self.fire.is_some()
    }

    /// Resolve when the timer fires. Never resolves once cancelled.
    pub async fn wait(&mut self) {
        if self.fired {
            return;
        }
        match self.fire.as_mut() {
            Some(fire) => {
                fire.await;
                self.fire = None;
                self.on_cancel = None;
                self.fired = true;
            }
            None => std::future::pending::<()>().await,
        }
    }

    pub fn cancel(&mut self) {
        if self.fire.take().is_some() {
            tracing::trace!(timer = self.label, "timer cancelled");
            if let Some(hook) = self.on_cancel.take() {
                hook();
            }
        }
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("label", &self.label)
            .field("pending", &self.is_pending())
            .field("fired", &self.fired)
            .finish()
    }
}

/// Scheduler backed by the tokio clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn after(&self, label: &'static str, delay: Duration) -> Timer {
        Timer::new(label, tokio::time::sleep(delay))
    }
}
