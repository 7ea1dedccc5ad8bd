//! Minimal embedding example for verifly-core
//!
//! This example uses verifly-core as a library, without the HTTP daemon.
//! The task queue delivers checks straight to the Verifier in-process, and
//! a simulated zone starts publishing the challenge after a few lookups.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use verifly_core::traits::{CallbackResponse, Notifier, ProofChecker, Task, TaskDispatcher};
use verifly_core::{
    RetryPolicy, Result, TaskQueue, VerificationRecord, VeriflyConfig, Verifier,
};

/// Zone that publishes the challenge once `delay` lookups have happened
struct PropagatingZone {
    lookups: AtomicUsize,
    delay: usize,
}

#[async_trait]
impl ProofChecker for PropagatingZone {
    async fn check(&self, domain: &str, _challenge: &str) -> Result<bool> {
        let n = self.lookups.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Lookup #{} for {}", n, domain);
        Ok(n > self.delay)
    }

    fn strategy_name(&self) -> &'static str {
        "propagating-zone"
    }
}

/// Notifier that only logs the outcome
struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, record: &VerificationRecord) -> Result<CallbackResponse> {
        info!(
            "Callback to {}: {} verified={}",
            record.callback_url, record.domain, record.verified
        );
        Ok(CallbackResponse {
            status: 204,
            body: String::new(),
        })
    }
}

/// Delivers tasks by calling the Verifier directly
#[derive(Default)]
struct InProcessDispatcher {
    verifier: OnceLock<Weak<Verifier>>,
}

#[async_trait]
impl TaskDispatcher for InProcessDispatcher {
    async fn dispatch(&self, task: &Task) -> Result<u16> {
        let Some(verifier) = self.verifier.get().and_then(Weak::upgrade) else {
            return Ok(503);
        };

        let record = task.record()?;
        Ok(verifier.perform_check(record).await.status_code())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let dispatcher = Arc::new(InProcessDispatcher::default());
    let queue = Arc::new(TaskQueue::new(
        dispatcher.clone(),
        RetryPolicy::new(Duration::from_secs(30), Duration::from_secs(1)),
        "/challenge",
    ));

    let (verifier, mut events) = Verifier::new(
        Arc::new(PropagatingZone {
            lookups: AtomicUsize::new(0),
            delay: 3,
        }),
        queue.clone(),
        Arc::new(LogNotifier),
        &VeriflyConfig::default(),
    )?;
    let verifier = Arc::new(verifier);
    let _ = dispatcher.verifier.set(Arc::downgrade(&verifier));

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!("Event: {:?}", event);
        }
    });

    let submission = verifier
        .submit(VerificationRecord::new("example.com", "https://example.com/hooks/verified"))
        .await?;
    info!(
        "Publish TXT \"{}\" at {}",
        submission.record.challenge, submission.record.domain
    );

    while queue.pending() > 0 {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    queue.shutdown();
    info!("Done");
    Ok(())
}
