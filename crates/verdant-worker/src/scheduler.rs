//! Alert scheduler: a single serialized tick loop over wall-clock time.
//!
//! Each tick runs the due-time scan, then the reminder scan, and only
//! then lets the next tick start. Ticks never overlap, so an alert can be
//! matched by the due-time scan at most once while it is active.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{FixedOffset, NaiveDateTime};
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::Instrument;

use verdant_core::clock::{Clock, local_minute};
use verdant_core::config::SchedulerConfig;
use verdant_core::error::AppError;
use verdant_database::store::AlertRepository;
use verdant_realtime::notification::dispatcher::AlertDispatcher;
use verdant_realtime::presence::registry::PresenceRegistry;

use crate::jobs::ScanSummary;
use crate::jobs::due_time::DueTimeScan;
use crate::jobs::pre_notification::PreNotificationScan;

/// Result of one tick. A `None` scan was abandoned after a read failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Local minute the tick evaluated.
    pub instant: NaiveDateTime,
    /// Due-time scan outcome.
    pub due: Option<ScanSummary>,
    /// Reminder scan outcome.
    pub reminders: Option<ScanSummary>,
}

/// Everything one tick needs.
#[derive(Debug)]
struct TickContext {
    due: DueTimeScan,
    reminders: PreNotificationScan,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl TickContext {
    async fn tick(&self) -> TickReport {
        let instant = local_minute(self.clock.now(), self.offset);
        self.tick_at(instant)
            .instrument(tracing::info_span!("scheduler_tick", instant = %instant))
            .await
    }

    async fn tick_at(&self, instant: NaiveDateTime) -> TickReport {
        let due = abandon_on_error("due-time", self.due.run(instant).await);
        let reminders = abandon_on_error("reminder", self.reminders.run(instant).await);
        TickReport {
            instant,
            due,
            reminders,
        }
    }
}

fn abandon_on_error(scan: &str, result: Result<ScanSummary, AppError>) -> Option<ScanSummary> {
    match result {
        Ok(summary) => Some(summary),
        Err(e) if e.is_transient() => {
            tracing::warn!(scan, error = %e, "Scan abandoned, retrying next tick");
            None
        }
        Err(e) => {
            tracing::error!(scan, error = %e, "Scan abandoned");
            None
        }
    }
}

/// Drives the periodic alert scans.
#[derive(Debug)]
pub struct AlertScheduler {
    context: Arc<TickContext>,
    tick_interval: Duration,
    running: Arc<AtomicBool>,
    /// Stop signal and loop task while started.
    control: Mutex<Option<(watch::Sender<bool>, JoinHandle<()>)>>,
}

impl AlertScheduler {
    /// Create a stopped scheduler.
    pub fn new(
        repo: Arc<dyn AlertRepository>,
        dispatcher: Arc<AlertDispatcher>,
        presence: Arc<PresenceRegistry>,
        clock: Arc<dyn Clock>,
        config: &SchedulerConfig,
    ) -> Self {
        let context = TickContext {
            due: DueTimeScan::new(repo.clone(), dispatcher.clone(), presence),
            reminders: PreNotificationScan::new(repo, dispatcher, config.lead_time()),
            clock,
            offset: config.offset(),
        };

        Self {
            context: Arc::new(context),
            tick_interval: config.tick_interval(),
            running: Arc::new(AtomicBool::new(false)),
            control: Mutex::new(None),
        }
    }

    /// Start the tick loop. Starting a running scheduler is a no-op.
    pub async fn start(&self) {
        let mut control = self.control.lock().await;
        if control.is_some() {
            tracing::warn!("Alert scheduler already running");
            return;
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let context = Arc::clone(&self.context);
        let running = Arc::clone(&self.running);
        let period = self.tick_interval;

        running.store(true, Ordering::SeqCst);
        let handle = tokio::spawn(async move {
            run_loop(context, period, cancel_rx).await;
            running.store(false, Ordering::SeqCst);
        });
        *control = Some((cancel_tx, handle));

        tracing::info!(
            tick_interval_secs = period.as_secs(),
            "Alert scheduler started"
        );
    }

    /// Stop the tick loop.
    ///
    /// No new tick starts after this is called; a tick already in flight
    /// runs to completion before this returns.
    pub async fn stop(&self) {
        let Some((cancel_tx, handle)) = self.control.lock().await.take() else {
            return;
        };

        let _ = cancel_tx.send(true);
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Alert scheduler task failed");
        }
        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Alert scheduler stopped");
    }

    /// Whether the tick loop is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run one tick for the current instant of the clock.
    ///
    /// Must not be called while the loop is running.
    pub async fn run_tick(&self) -> TickReport {
        self.context.tick().await
    }

    /// Run one tick for an explicit local minute.
    pub async fn run_tick_at(&self, instant: NaiveDateTime) -> TickReport {
        self.context
            .tick_at(instant)
            .instrument(tracing::info_span!("scheduler_tick", instant = %instant))
            .await
    }
}

async fn run_loop(
    context: Arc<TickContext>,
    period: Duration,
    mut cancel: watch::Receiver<bool>,
) {
    let mut interval = time::interval(period);
    // An overrunning tick delays the next one instead of bunching them up.
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                // Awaited inline: the stop signal is not observed mid-tick.
                context.tick().await;
            }
        }
    }

    tracing::debug!("Alert scheduler loop exited");
}
