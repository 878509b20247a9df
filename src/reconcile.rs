//! Keeps the selected element's status in line with the latest check run.
//!
//! While an element is selected a single background task re-derives its
//! status whenever the results change and on every tick of a fixed interval.
//! The task owns one loop, so reconciliation passes never overlap; ticks that
//! fall behind are skipped rather than queued.

use crate::check::{derive_status, AggregatedResults, ResultsStore};
use crate::model::Element;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

type Selection = Arc<Mutex<Option<Element>>>;

/// Shortest refresh period; tokio intervals cannot tick on a zero period.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

pub struct StatusReconciler {
    results: ResultsStore,
    selection: Selection,
    period: Duration,
    task: Option<(CancellationToken, JoinHandle<()>)>,
}

impl StatusReconciler {
    /// Periods shorter than [`MIN_PERIOD`] are raised to it.
    #[must_use]
    pub fn new(results: ResultsStore, period: Duration) -> Self {
        if period < MIN_PERIOD {
            tracing::warn!(?period, "Refresh period too short, using {MIN_PERIOD:?}");
        }
        Self {
            results,
            selection: Arc::new(Mutex::new(None)),
            period: period.max(MIN_PERIOD),
            task: None,
        }
    }

    /// Selects `element`, deriving its status from the current results
    /// before returning, and starts the refresh task if it is not running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn select(&mut self, element: Element) -> Element {
        let status = derive_status(&element.guid, self.results.latest().as_deref());
        let element = element.with_status(status);
        *lock(&self.selection) = Some(element.clone());
        tracing::debug!(guid = %element.guid, %status, "Selected element");
        self.start();
        element
    }

    /// Clears the selection and stops the refresh task.
    pub fn deselect(&mut self) {
        self.stop();
        *lock(&self.selection) = None;
    }

    /// Current state of the selected element.
    #[must_use]
    pub fn selected(&self) -> Option<Element> {
        lock(&self.selection).clone()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Runs one reconciliation pass on the calling thread.
    pub fn reconcile_now(&self) -> bool {
        reconcile(&self.selection, self.results.latest().as_deref())
    }

    fn start(&mut self) {
        if self.task.is_some() {
            return;
        }
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(refresh_loop(
            Arc::clone(&self.selection),
            self.results.subscribe(),
            self.period,
            shutdown.clone(),
        ));
        self.task = Some((shutdown, handle));
    }

    fn stop(&mut self) {
        if let Some((shutdown, _handle)) = self.task.take() {
            shutdown.cancel();
        }
    }
}

impl Drop for StatusReconciler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock(selection: &Selection) -> MutexGuard<'_, Option<Element>> {
    selection.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Re-derives the selected element's status. Returns true when it changed.
fn reconcile(selection: &Selection, results: Option<&AggregatedResults>) -> bool {
    let mut slot = lock(selection);
    let Some(element) = slot.as_mut() else {
        return false;
    };
    let status = derive_status(&element.guid, results);
    if element.status == status {
        return false;
    }
    tracing::debug!(guid = %element.guid, from = %element.status, to = %status, "Status changed");
    *element = element.clone().with_status(status);
    true
}

async fn refresh_loop(
    selection: Selection,
    mut results: watch::Receiver<Option<Arc<AggregatedResults>>>,
    period: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
            changed = results.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
        let latest = results.borrow_and_update().clone();
        reconcile(&selection, latest.as_deref());
    }

    tracing::debug!("Status reconciler stopped");
}
