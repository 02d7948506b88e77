use super::{MonitorTask, PassSummary, Registry, Supervisor, SupervisorConfig};
use crate::lifecycle::{ComponentState, Lifecycle};
use crate::recovery::{RecoveryAction, RecoveryPolicy, RecoveryTracker};
use chrono::Utc;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckOutcome {
    Healthy,
    Recovered,
    RecoveryFailed,
    Deferred,
}

impl Supervisor {
    /// Start the background polling loop. No-op if it is already running.
    pub async fn start_monitoring(&self) {
        let mut monitor = self.monitor.lock().await;

        if let Some(task) = monitor.as_ref() {
            if !task.handle.is_finished() {
                warn!("Monitoring is already running");
                return;
            }
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(monitor_loop(
            Arc::clone(&self.registry),
            self.config,
            cancel.clone(),
        ));

        *monitor = Some(MonitorTask { cancel, handle });
        info!(
            "Started lifecycle monitoring (check interval: {:?})",
            self.config.check_interval
        );
    }

    /// Cancel the polling loop and wait until it has exited. No-op if it is
    /// not running.
    pub async fn stop_monitoring(&self) {
        let task = self.monitor.lock().await.take();

        let Some(task) = task else {
            return;
        };

        task.cancel.cancel();
        if let Err(e) = task.handle.await {
            error!("Lifecycle monitoring task ended abnormally: {}", e);
        }
        info!("Stopped lifecycle monitoring");
    }

    pub async fn is_monitoring(&self) -> bool {
        self.monitor
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Run one check pass over every registered component
    pub async fn run_check_pass(&self) -> PassSummary {
        check_components(&self.registry, &self.config.recovery, &CancellationToken::new()).await
    }
}

async fn monitor_loop(registry: Arc<Registry>, config: SupervisorConfig, cancel: CancellationToken) {
    loop {
        let summary = check_components(&registry, &config.recovery, &cancel).await;
        debug!("Check pass completed: {:?}", summary);

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(config.check_interval) => {}
        }
    }
}

/// One pass. Registry membership is snapshotted up front; each component's
/// check is isolated so a panic only affects that component. Cancellation is
/// honoured between components, never in the middle of a hook.
async fn check_components(
    registry: &Registry,
    policy: &RecoveryPolicy,
    cancel: &CancellationToken,
) -> PassSummary {
    let snapshot: Vec<(String, Arc<dyn Lifecycle>, RecoveryTracker)> = registry
        .lock()
        .iter()
        .map(|entry| {
            (
                entry.name.clone(),
                Arc::clone(&entry.component),
                entry.recovery.clone(),
            )
        })
        .collect();

    let mut summary = PassSummary::default();

    for (name, component, mut tracker) in snapshot {
        if cancel.is_cancelled() {
            debug!("Check pass cancelled before {}", name);
            break;
        }

        let checked = AssertUnwindSafe(check_component(
            &name,
            component.as_ref(),
            policy,
            &mut tracker,
        ))
        .catch_unwind()
        .await;

        summary.checked += 1;
        match checked {
            Ok(CheckOutcome::Healthy) => summary.healthy += 1,
            Ok(CheckOutcome::Recovered) => summary.recovered += 1,
            Ok(CheckOutcome::RecoveryFailed) => summary.recovery_failed += 1,
            Ok(CheckOutcome::Deferred) => summary.deferred += 1,
            Err(_) => {
                error!("Error checking component {}: check panicked", name);
                summary.faulted += 1;
            }
        }

        // Skip the write-back if the entry was removed or replaced meanwhile
        let mut entries = registry.lock();
        if let Some(entry) = entries
            .iter_mut()
            .find(|entry| entry.name == name && Arc::ptr_eq(&entry.component, &component))
        {
            entry.last_check = Utc::now();
            entry.recovery = tracker;
        }
    }

    summary
}

async fn check_component(
    name: &str,
    component: &dyn Lifecycle,
    policy: &RecoveryPolicy,
    tracker: &mut RecoveryTracker,
) -> CheckOutcome {
    // A component left in Error by a failed recovery stays a recovery
    // candidate even once its health check passes again
    let healthy = component.is_healthy().await && component.state() != ComponentState::Error;
    if healthy {
        tracker.reset();
        return CheckOutcome::Healthy;
    }

    match tracker.next_action(policy, Instant::now()) {
        RecoveryAction::Attempt => {
            warn!("Component {} is unhealthy, attempting recovery", name);
            if component.recover().await {
                info!("Successfully recovered component {}", name);
                tracker.record_success(name);
                CheckOutcome::Recovered
            } else {
                error!("Failed to recover component {}", name);
                tracker.record_failure(name, Instant::now());
                if policy.max_attempts == Some(tracker.consecutive_failures()) {
                    warn!(
                        "Maximum recovery attempts ({}) exhausted for component {}, suspending recovery",
                        tracker.consecutive_failures(),
                        name
                    );
                }
                CheckOutcome::RecoveryFailed
            }
        }
        RecoveryAction::Wait(remaining) => {
            debug!(
                "Component {} is unhealthy, next recovery attempt in {:?}",
                name, remaining
            );
            CheckOutcome::Deferred
        }
        RecoveryAction::GiveUp => {
            debug!("Component {} is unhealthy, recovery suspended", name);
            CheckOutcome::Deferred
        }
    }
}
