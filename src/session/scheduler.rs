//! Credential expiry polling, warning countdown, and safety-net deadline.
//!
//! One spawned task per schedule. The task polls the token clock on a coarse
//! interval while the credential is comfortably valid, then switches to a
//! one-second countdown that re-reads the clock each tick — never a naive
//! decrement, so a clock correction or renewal is reflected immediately. A
//! coarser safety-net deadline forces expiry even if countdown ticks are
//! starved.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use super::clock::TokenClock;
use super::SessionConfig;
use crate::auth::Credential;

/// Transitions reported by the scheduler task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// Remaining validity crossed the warning threshold.
    Warning(u64),
    /// Countdown tick while warning, with remaining seconds re-read from
    /// the clock.
    Countdown(u64),
    /// The credential ran out, or the safety net fired.
    Expired,
}

/// A scheduler event stamped with the schedule generation that produced it.
/// The monitor drops events from superseded schedules, so a countdown that
/// was cancelled by a renewal can never force a logout afterwards.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerSignal {
    pub generation: u64,
    pub event: SchedulerEvent,
}

pub struct ExpiryScheduler {
    config: SessionConfig,
    clock: TokenClock,
    events: mpsc::UnboundedSender<SchedulerSignal>,
    generation: u64,
    task: Option<(CancellationToken, JoinHandle<()>)>,
}

impl ExpiryScheduler {
    pub fn new(
        config: SessionConfig,
        clock: TokenClock,
        events: mpsc::UnboundedSender<SchedulerSignal>,
    ) -> Self {
        Self {
            config,
            clock,
            events,
            generation: 0,
            task: None,
        }
    }

    /// Generation of the most recent `start()`/`stop()`. Events carrying an
    /// older generation are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .map(|(_, handle)| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Begin watching `credential`. Any previous schedule is stopped first,
    /// so repeated starts never stack timers.
    pub async fn start(&mut self, credential: Credential) {
        self.stop().await;

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(
            credential,
            self.config.clone(),
            self.clock.clone(),
            self.events.clone(),
            self.generation,
            cancel.clone(),
        ));
        self.task = Some((cancel, handle));
    }

    /// Cancel the schedule and wait for the task to wind down. Safe to call
    /// when nothing is running; afterwards zero timers remain pending.
    pub async fn stop(&mut self) {
        self.generation += 1;
        if let Some((cancel, handle)) = self.task.take() {
            cancel.cancel();
            let _ = handle.await;
        }
    }
}

impl Drop for ExpiryScheduler {
    fn drop(&mut self) {
        if let Some((cancel, handle)) = self.task.take() {
            cancel.cancel();
            handle.abort();
        }
    }
}

/// Scheduler task body.
async fn run(
    credential: Credential,
    config: SessionConfig,
    clock: TokenClock,
    events: mpsc::UnboundedSender<SchedulerSignal>,
    generation: u64,
    cancel: CancellationToken,
) {
    let emit = |event: SchedulerEvent| {
        let _ = events.send(SchedulerSignal { generation, event });
    };

    // Active phase: coarse polling until the threshold is crossed. The first
    // interval tick fires immediately, so a credential that is already inside
    // the warning window is caught on start.
    let mut poll = time::interval(config.poll_interval);
    poll.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    let remaining = loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = poll.tick() => {
                let remaining = clock.seconds_remaining(Some(&credential));
                if remaining == 0 {
                    // Already dead: expire directly, skip the warning.
                    emit(SchedulerEvent::Expired);
                    return;
                }
                if remaining <= config.warning_threshold_secs {
                    break remaining;
                }
                tracing::trace!(remaining, "credential still comfortably valid");
            }
        }
    };

    emit(SchedulerEvent::Warning(remaining));
    tracing::debug!(remaining, "expiry warning raised");

    // Warning phase: per-second countdown plus the safety net. The net is
    // armed at remaining + margin and fires unconditionally, bounding
    // worst-case staleness even when the countdown interval is starved.
    let mut countdown = time::interval(Duration::from_secs(1));
    countdown.tick().await; // skip the immediate tick
    let mut safety_net = Box::pin(time::sleep(Duration::from_secs(
        remaining + config.safety_margin_secs,
    )));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = countdown.tick() => {
                let remaining = clock.seconds_remaining(Some(&credential));
                if remaining == 0 {
                    emit(SchedulerEvent::Expired);
                    return;
                }
                emit(SchedulerEvent::Countdown(remaining));
            }
            _ = &mut safety_net => {
                tracing::warn!("safety-net deadline reached, forcing expiry");
                emit(SchedulerEvent::Expired);
                return;
            }
        }
    }
}
