//! Cancellation-scoped repeating tasks
//!
//! Every periodic activity in a session (elapsed tick, level meter, slice delivery,
//! virtual playback clock) runs as a `RepeatingTask`. Cancelling is a single call and
//! dropping the task cancels it as well, so no timer can outlive its owner.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

pub struct RepeatingTask {
    name: &'static str,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl RepeatingTask {
    /// Spawn `tick` every `period`, first run one period from now.
    ///
    /// The task ends when cancelled or when `tick` returns `ControlFlow::Break`.
    pub fn spawn<F>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let child = token.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = interval.tick() => {
                        if tick().is_break() {
                            break;
                        }
                    }
                }
            }

            debug!("{} task finished", name);
        });

        Self {
            name,
            token,
            handle: Some(handle),
        }
    }

    /// Cancel and wait for the task to exit.
    pub async fn cancel(&mut self) {
        self.token.cancel();

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!("{} task panicked: {}", self.name, e);
            }
        }
    }

    /// Cancel without waiting. Used from `Drop` paths.
    pub fn cancel_now(&mut self) {
        self.token.cancel();
        self.handle.take();
    }

    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
