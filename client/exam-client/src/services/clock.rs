use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use crate::models::{SessionEvent, TimeExpired, TimerEvent, TimerTick};

const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Countdown owned by the session state machine. Each armed period runs as
/// one tokio task that reports ticks and a single expiry over the event channel.
#[derive(Debug)]
pub struct Clock {
    tick_interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl Clock {
    pub fn new() -> Self {
        Self::with_tick_interval(DEFAULT_TICK)
    }

    pub fn with_tick_interval(tick_interval: Duration) -> Self {
        Self {
            tick_interval,
            handle: None,
        }
    }

    /// Arms a new countdown, cancelling any previous one.
    pub fn start(&mut self, budget_seconds: u32, events: UnboundedSender<SessionEvent>) {
        self.stop();
        tracing::info!("Starting countdown: {}s", budget_seconds);
        self.handle = Some(tokio::spawn(run_countdown(
            budget_seconds,
            self.tick_interval,
            events,
        )));
    }

    /// Cancels pending ticks. Safe to call repeatedly or before `start`.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("Countdown stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_countdown(total: u32, tick: Duration, events: UnboundedSender<SessionEvent>) {
    let mut interval = interval_at(Instant::now() + tick, tick);
    let mut elapsed = 0u32;

    while elapsed < total {
        interval.tick().await;
        elapsed += 1;

        let event = TimerEvent::TimerTick(TimerTick {
            remaining_seconds: total - elapsed,
            elapsed_seconds: elapsed,
            total_seconds: total,
            timestamp: Utc::now(),
        });
        if events.send(SessionEvent::Timer(event)).is_err() {
            // Receiver is gone, nobody is listening for the expiry either
            return;
        }
    }

    let expired = TimerEvent::TimeExpired(TimeExpired {
        total_seconds: total,
        timestamp: Utc::now(),
    });
    if events.send(SessionEvent::Timer(expired)).is_ok() {
        tracing::info!("Countdown expired after {}s", total);
    }
}
