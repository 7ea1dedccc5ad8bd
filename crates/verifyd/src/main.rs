// # verifyd - Domain Verification Daemon
//
// The verifyd daemon is a thin integration layer. It is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing the runtime
// 3. Registering checker strategies and wiring the collaborators
// 4. Serving `POST /worker`, `POST /challenge` and `GET /healthz`
//
// All verification logic lives in verifly-core. Retry state lives in the
// task queue, which delivers every check back to this process over HTTP.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Server
// - `VERIFLY_LISTEN_ADDR`: Listen address (default `0.0.0.0:8080`)
// - `VERIFLY_TASK_TARGET`: Base URL tasks are delivered to (default: this listener)
//
// ### Checker
// - `VERIFLY_CHECKER`: Strategy (doh, resolver)
// - `VERIFLY_DOH_URL`: DoH JSON endpoint (for doh)
// - `VERIFLY_NAMESERVERS`: Comma-separated nameserver IPs (for resolver)
// - `VERIFLY_LOOKUP_TIMEOUT_SECS`: Per-lookup timeout
//
// ### Retry
// - `VERIFLY_AGE_LIMIT_SECS`: Total task age (default 1200)
// - `VERIFLY_MIN_BACKOFF_SECS`: Minimum delay between attempts (default 5)
// - `VERIFLY_MAX_BACKOFF_SECS`: Maximum delay between attempts (default 60)
//
// ### Callback
// - `VERIFLY_NOTIFY_TIMEOUT_SECS`: Per-callback timeout
// - `VERIFLY_NOTIFY_ON_EXPIRY`: Post the unverified record when a task expires
//
// ### Misc
// - `VERIFLY_CHALLENGE_PREFIX`: Namespace prefix of generated challenges
// - `VERIFLY_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export VERIFLY_LISTEN_ADDR=0.0.0.0:8080
// export VERIFLY_CHECKER=resolver
// export VERIFLY_NAMESERVERS=1.1.1.1,8.8.8.8
//
// verifyd
// ```

mod config;
mod dispatch;
mod routes;

use anyhow::Result;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use axum::Router;
use verifly_core::traits::{Notifier, ProofChecker, TaskDispatcher};
use verifly_core::{
    CheckerRegistry, ExpiryNotifier, RetryPolicy, TaskQueue, VeriflyConfig, Verifier,
};
use verifly_notifier_http::HttpNotifier;

use crate::config::Config;
use crate::dispatch::HttpDispatcher;

/// Time allowed for in-flight requests to finish after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Slack added on top of lookup and callback timeouts for task delivery
const DISPATCH_SLACK: Duration = Duration::from_secs(5);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum VerifydExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<VerifydExitCode> for ExitCode {
    fn from(code: VerifydExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return VerifydExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return VerifydExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return VerifydExitCode::ConfigError.into();
    }

    info!("Starting verifyd daemon");
    info!(
        "Checker: {}, listening on {}, tasks delivered to {}",
        config.checker, config.listen_addr, config.task_target
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return VerifydExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {}", e);
            VerifydExitCode::RuntimeError
        } else {
            VerifydExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let verifly_config = config.to_verifly_config();

    let registry = CheckerRegistry::new();

    #[cfg(feature = "doh")]
    {
        info!("Registering DoH checker");
        verifly_checker_doh::register(&registry);
    }

    #[cfg(feature = "resolver")]
    {
        info!("Registering resolver checker");
        verifly_checker_resolver::register(&registry);
    }

    let checker: Arc<dyn ProofChecker> = Arc::from(registry.create_checker(&verifly_config.checker)?);
    let notifier = Arc::new(HttpNotifier::from_config(&verifly_config.notifier)?);

    let dispatch_timeout = Duration::from_secs(config.lookup_timeout_secs)
        + Duration::from_secs(config.notify_timeout_secs)
        + DISPATCH_SLACK;
    let dispatcher = Arc::new(HttpDispatcher::new(
        config.task_target.clone(),
        dispatch_timeout,
    )?);

    let (app, queue) = assemble(checker, notifier, dispatcher, &verifly_config)?;

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", config.listen_addr, e))?;
    info!("Listening on {}", config.listen_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tokio::select! {
        signal = wait_for_shutdown_signal() => {
            info!("Received shutdown signal: {}", signal?);
        }
        result = &mut server => {
            queue.shutdown();
            return match result {
                Ok(Ok(())) => Err(anyhow::anyhow!("Server stopped unexpectedly")),
                Ok(Err(e)) => Err(anyhow::anyhow!("Server error: {}", e)),
                Err(e) => Err(anyhow::anyhow!("Server task failed: {}", e)),
            };
        }
    }

    info!("Shutting down daemon");
    queue.shutdown();
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server).await {
        Ok(Ok(Ok(()))) => Ok(()),
        Ok(Ok(Err(e))) => Err(anyhow::anyhow!("Server error: {}", e)),
        Ok(Err(e)) => Err(anyhow::anyhow!("Server task failed: {}", e)),
        Err(_) => Err(anyhow::anyhow!(
            "Shutdown timeout after {:?}",
            SHUTDOWN_TIMEOUT
        )),
    }
}

/// Wire the queue, the verifier and the routes together
///
/// Returns the router to serve and the queue, which the caller shuts down.
fn assemble(
    checker: Arc<dyn ProofChecker>,
    notifier: Arc<dyn Notifier>,
    dispatcher: Arc<dyn TaskDispatcher>,
    verifly_config: &VeriflyConfig,
) -> Result<(Router, Arc<TaskQueue>)> {
    let scheduler_config = &verifly_config.scheduler;
    let mut queue = TaskQueue::new(
        dispatcher,
        RetryPolicy::from_config(scheduler_config),
        scheduler_config.task_path.clone(),
    );
    if verifly_config.notifier.notify_on_expiry {
        info!("Expired verifications will be reported to their callback URL");
        queue = queue.with_expiry_handler(Arc::new(ExpiryNotifier::new(notifier.clone())));
    }
    let queue = Arc::new(queue);

    let (verifier, mut events) =
        Verifier::new(checker, queue.clone(), notifier, verifly_config)?;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Verification event: {:?}", event);
        }
    });

    let app = routes::router(Arc::new(verifier), &scheduler_config.task_path);
    Ok((app, queue))
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };

    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
