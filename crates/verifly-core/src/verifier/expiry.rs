//! Expiry notification
//!
//! When a task runs out of age, the queue drops it. Without a handler the
//! caller never hears about it. `ExpiryNotifier` closes that gap by posting
//! the record, still unverified, to the callback URL once.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::traits::{ExpiryHandler, Notifier, Task};

/// Posts the unverified record to its callback URL when a task expires
///
/// `verified = false` here means no attempt both found the challenge and
/// reached the callback before the age limit. A domain whose TXT record was
/// seen while every success callback failed (502) is still reported as
/// unverified, since the task payload carries no memory of earlier lookups.
pub struct ExpiryNotifier {
    notifier: Arc<dyn Notifier>,
}

impl ExpiryNotifier {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl ExpiryHandler for ExpiryNotifier {
    async fn on_expired(&self, task: &Task) {
        let mut record = match task.record() {
            Ok(record) => record,
            Err(e) => {
                warn!("Expired task {} carries an unreadable record: {}", task.name, e);
                return;
            }
        };
        record.verified = false;

        match self.notifier.notify(&record).await {
            Ok(response) => info!(
                "Notified {} of expired verification for {} (status {})",
                record.callback_url, record.domain, response.status
            ),
            Err(e) => warn!(
                "Could not notify caller of expired verification for {}: {}",
                record.domain, e
            ),
        }
    }
}
