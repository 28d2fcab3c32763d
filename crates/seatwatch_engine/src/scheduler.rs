use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use engine_logging::{engine_debug, engine_info, engine_warn, redact};
use seatwatch_core::{AvailabilityTracker, Event, RegistryError, SubscriptionRegistry, SweepStatus};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{DispatchError, DispatchReport, FailureKind, NotificationDispatcher, SessionClient};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Result of one check within a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCheck {
    pub code: String,
    pub previous: u32,
    pub current: u32,
    pub failure: Option<FailureKind>,
    pub alerted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub checks: Vec<EventCheck>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    Completed(SweepReport),
    /// Another sweep was in flight; this one was dropped.
    Skipped,
}

/// Runs sweeps over the configured events and owns all shared state.
pub struct PollingScheduler {
    events: Vec<Event>,
    session: SessionClient,
    dispatcher: NotificationDispatcher,
    tracker: Mutex<AvailabilityTracker>,
    registry: Mutex<SubscriptionRegistry>,
    checking: AtomicBool,
    last_check: Mutex<Option<DateTime<Utc>>>,
    clock: Clock,
}

/// Clears the in-flight flag when the sweep ends, even by panic.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PollingScheduler {
    pub fn new(
        events: Vec<Event>,
        session: SessionClient,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self::with_clock(events, session, dispatcher, Arc::new(Utc::now))
    }

    pub fn with_clock(
        events: Vec<Event>,
        session: SessionClient,
        dispatcher: NotificationDispatcher,
        clock: Clock,
    ) -> Self {
        Self {
            events,
            session,
            dispatcher,
            tracker: Mutex::new(AvailabilityTracker::new()),
            registry: Mutex::new(SubscriptionRegistry::new()),
            checking: AtomicBool::new(false),
            last_check: Mutex::new(None),
            clock,
        }
    }

    /// Checks every event in order, alerting on new availability.
    ///
    /// Returns `Skipped` without doing anything if a sweep is already running.
    pub async fn sweep(&self) -> SweepOutcome {
        if self
            .checking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            engine_debug!("Sweep already in progress; trigger dropped");
            return SweepOutcome::Skipped;
        }
        let _in_flight = InFlight(&self.checking);

        engine_info!("Checking tickets for {} events", self.events.len());
        let mut checks = Vec::with_capacity(self.events.len());
        for event in &self.events {
            checks.push(self.check_event(event).await);
        }

        let finished_at = (self.clock)();
        *lock(&self.last_check) = Some(finished_at);
        SweepOutcome::Completed(SweepReport {
            checks,
            finished_at,
        })
    }

    async fn check_event(&self, event: &Event) -> EventCheck {
        let (current, failure) = match self.session.fetch_event_availability(&event.code).await {
            Ok(snapshot) => (snapshot.total_seats, None),
            Err(err) => {
                engine_warn!("Error checking {}: {}", event.code, err);
                (0, Some(err.kind))
            }
        };

        let transition = lock(&self.tracker).observe(&event.code, current);
        engine_info!(
            "{}: {} seats (was: {})",
            event.name,
            transition.current,
            transition.previous
        );

        let mut alerted = false;
        if transition.is_new_availability {
            let devices = lock(&self.registry).list_interested(&event.code);
            if devices.is_empty() {
                engine_warn!("New tickets for {} but no registered devices to notify", event.code);
            } else {
                engine_info!(
                    "New tickets for {}; alerting {} devices",
                    event.code,
                    devices.len()
                );
                let report = self
                    .dispatcher
                    .send_alarm_burst(&devices, event, current)
                    .await;
                if report.failed_batches() > 0 {
                    engine_warn!(
                        "{} of {} batches failed for {}",
                        report.failed_batches(),
                        report.batches.len(),
                        event.code
                    );
                }
                alerted = true;
            }
        }

        EventCheck {
            code: event.code.clone(),
            previous: transition.previous,
            current,
            failure,
            alerted,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn session_ready(&self) -> bool {
        self.session.is_ready()
    }

    pub fn status(&self) -> SweepStatus {
        SweepStatus {
            is_checking: self.checking.load(Ordering::Acquire),
            last_check_at: *lock(&self.last_check),
        }
    }

    pub fn availability(&self) -> BTreeMap<String, u32> {
        lock(&self.tracker).snapshot()
    }

    pub fn register(
        &self,
        token: &str,
        events: Option<Vec<String>>,
    ) -> Result<usize, RegistryError> {
        let total = lock(&self.registry).register(token, events, (self.clock)())?;
        engine_info!("Token registered: {} ({} total)", redact(token), total);
        Ok(total)
    }

    pub fn unregister(&self, token: &str) -> bool {
        let removed = lock(&self.registry).unregister(token);
        engine_info!("Token unregistered: {} (known: {})", redact(token), removed);
        removed
    }

    pub fn update_events(&self, token: &str, events: Vec<String>) -> bool {
        let updated = lock(&self.registry).update_events(token, events);
        if updated {
            engine_info!("Events updated for token: {}", redact(token));
        }
        updated
    }

    pub fn device_count(&self) -> usize {
        lock(&self.registry).len()
    }

    pub async fn send_test_burst(&self, token: &str) -> Result<DispatchReport, DispatchError> {
        self.dispatcher.send_test_burst(token).await
    }
}

/// Starts the polling timer: one sweep right away, then one per `interval`.
///
/// Each tick spawns its sweep so a tick landing mid-sweep hits the in-flight
/// guard and is dropped. Cancelling `shutdown` stops the timer; a running
/// sweep finishes on its own.
pub fn spawn_polling(
    scheduler: Arc<PollingScheduler>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    engine_info!("Polling stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let scheduler = scheduler.clone();
                    tokio::spawn(async move {
                        scheduler.sweep().await;
                    });
                }
            }
        }
    })
}
