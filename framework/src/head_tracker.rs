use std::{sync::Arc, time::Duration};

use connex_common::{
    api::thor::Head,
    config::HEAD_FRESHNESS_WINDOW_MILLIS,
    time::{get_current_time_in_millis, seconds_to_millis, TimestampMillis, TimestampSeconds},
    tokio::{spawn_task, sync::watch, task::JoinHandle, time::sleep},
};
use log::{debug, info, trace};

use crate::{
    config::FrameworkConfig,
    driver::{Driver, DriverError, HeadPolling},
    error::FrameworkError,
};

// A head replaces the current one only if it is a different block
// that doesn't go backward
pub fn is_newer_head(current: &Head, candidate: &Head) -> bool {
    candidate.id != current.id && candidate.number >= current.number
}

// Estimate how far the head is from the wall clock
// NaN means the clock or the genesis timestamp can't be trusted
pub fn compute_progress(
    head_timestamp: TimestampSeconds,
    genesis_timestamp: TimestampSeconds,
    now: TimestampMillis,
) -> f64 {
    let head = seconds_to_millis(head_timestamp) as f64;
    let genesis = seconds_to_millis(genesis_timestamp) as f64;
    let now = now as f64;

    if now - head < HEAD_FRESHNESS_WINDOW_MILLIS as f64 {
        return 1.0;
    }

    let progress = (head - genesis) / (now - genesis);
    if progress < 0.0 {
        f64::NAN
    } else {
        progress
    }
}

/// Keeps track of the chain head by polling the driver
///
/// The head lives in a watch channel owned by the poll task: an accepted head
/// is written and every ticker woken in a single step, so a ticker that
/// resolves always reads the new head.
pub struct HeadTracker {
    head: watch::Receiver<Head>,
    genesis_timestamp: TimestampSeconds,
    task: JoinHandle<()>,
}

impl HeadTracker {
    // Must be called from within a tokio runtime
    pub fn new(
        driver: Arc<dyn Driver>,
        genesis_timestamp: TimestampSeconds,
        initial_head: Head,
        config: &FrameworkConfig,
    ) -> Self {
        let polling = config
            .poll_interval()
            .map(HeadPolling::Interval)
            .unwrap_or_else(|| driver.head_polling());
        if log::log_enabled!(log::Level::Debug) {
            debug!(
                "Tracking head from #{} ({}) with {:?}",
                initial_head.number, initial_head.id, polling
            );
        }

        let (sender, head) = watch::channel(initial_head);
        let task = spawn_task(
            "head-tracker",
            poll_heads(driver, sender, polling, config.retry_delay()),
        );

        Self {
            head,
            genesis_timestamp,
            task,
        }
    }

    // Latest known head, never reaches the driver
    pub fn head(&self) -> Head {
        self.head.borrow().clone()
    }

    pub fn progress(&self) -> f64 {
        let head_timestamp = self.head.borrow().timestamp;
        compute_progress(
            head_timestamp,
            self.genesis_timestamp,
            get_current_time_in_millis(),
        )
    }

    // New ticker bound to the current head
    pub fn ticker(&self) -> Ticker {
        let mut receiver = self.head.clone();
        receiver.borrow_and_update();
        Ticker { receiver }
    }

    // false once the driver has been closed
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for HeadTracker {
    fn drop(&mut self) {
        trace!("Stopping head tracker");
        self.task.abort();
    }
}

/// Resolves once per distinct head advancement
pub struct Ticker {
    receiver: watch::Receiver<Head>,
}

impl Ticker {
    // Resolves right away if the head moved since the last call,
    // otherwise waits for the next accepted head
    pub async fn next(&mut self) -> Result<Head, FrameworkError> {
        self.receiver
            .changed()
            .await
            .map_err(|_| FrameworkError::TrackerClosed)?;

        Ok(self.receiver.borrow_and_update().clone())
    }
}

async fn poll_heads(
    driver: Arc<dyn Driver>,
    sender: watch::Sender<Head>,
    polling: HeadPolling,
    retry_delay: Duration,
) {
    info!("Head tracker started");
    loop {
        match driver.pull_head().await {
            Ok(head) => {
                sender.send_if_modified(|current| {
                    if !is_newer_head(current, &head) {
                        trace!("Ignoring head #{} ({})", head.number, head.id);
                        return false;
                    }

                    if log::log_enabled!(log::Level::Debug) {
                        debug!("New head #{} ({})", head.number, head.id);
                    }
                    *current = head;
                    true
                });

                if let HeadPolling::Interval(interval) = polling {
                    sleep(interval).await;
                }
            }
            Err(DriverError::Closed) => {
                info!("Driver is closed, head tracker stopped");
                break;
            }
            Err(e) => {
                if log::log_enabled!(log::Level::Debug) {
                    debug!(
                        "Error while pulling head, retrying in {:?}: {:#}",
                        retry_delay, e
                    );
                }
                sleep(retry_delay).await;
            }
        }
    }
}
