use super::hooks::LifecycleHooks;
use crate::error::{CasebotError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Outcome a scripted hook produces on one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// `Ok(true)` / `Ok(())`
    Pass,
    /// `Ok(false)`; treated like `Pass` by the shutdown hook
    Fail,
    /// `Err(_)`
    Raise,
    /// Never completes
    Hang,
    /// Panics inside the hook
    Panic,
}

struct Script {
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: AtomicUsize,
}

impl Script {
    fn new(steps: &[Step], fallback: Step) -> Self {
        Self {
            steps: Mutex::new(steps.iter().copied().collect()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    fn next(&self) -> Step {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.steps.lock().pop_front().unwrap_or(self.fallback)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

async fn play(step: Step, operation: &str) -> Result<bool> {
    match step {
        Step::Pass => Ok(true),
        Step::Fail => Ok(false),
        Step::Raise => Err(CasebotError::component("scripted", format!("{} raised", operation))),
        Step::Hang => std::future::pending().await,
        Step::Panic => panic!("scripted {} panicked", operation),
    }
}

/// Hooks that replay a fixed script and count invocations.
/// Once a script runs out every further call passes.
pub(crate) struct ScriptedHooks {
    initialize: Script,
    shutdown: Script,
    health: Script,
    recover: Script,
}

impl ScriptedHooks {
    pub fn new() -> Self {
        Self {
            initialize: Script::new(&[], Step::Pass),
            shutdown: Script::new(&[], Step::Pass),
            health: Script::new(&[], Step::Pass),
            recover: Script::new(&[], Step::Pass),
        }
    }

    pub fn initialize(mut self, steps: &[Step]) -> Self {
        self.initialize = Script::new(steps, Step::Pass);
        self
    }

    pub fn shutdown(mut self, steps: &[Step]) -> Self {
        self.shutdown = Script::new(steps, Step::Pass);
        self
    }

    pub fn health(mut self, steps: &[Step]) -> Self {
        self.health = Script::new(steps, Step::Pass);
        self
    }

    pub fn recover(mut self, steps: &[Step]) -> Self {
        self.recover = Script::new(steps, Step::Pass);
        self
    }

    /// Health checks fail for good once the script runs out
    pub fn health_then_fail(mut self, steps: &[Step]) -> Self {
        self.health = Script::new(steps, Step::Fail);
        self
    }

    /// Recovery keeps failing once the script runs out
    pub fn recover_then_fail(mut self, steps: &[Step]) -> Self {
        self.recover = Script::new(steps, Step::Fail);
        self
    }

    pub fn initialize_calls(&self) -> usize {
        self.initialize.calls()
    }

    pub fn shutdown_calls(&self) -> usize {
        self.shutdown.calls()
    }

    pub fn health_calls(&self) -> usize {
        self.health.calls()
    }

    pub fn recover_calls(&self) -> usize {
        self.recover.calls()
    }
}

#[async_trait]
impl LifecycleHooks for ScriptedHooks {
    async fn do_initialize(&self) -> Result<bool> {
        play(self.initialize.next(), "initialize").await
    }

    async fn do_shutdown(&self) -> Result<()> {
        play(self.shutdown.next(), "shutdown").await.map(|_| ())
    }

    async fn check_health(&self) -> Result<bool> {
        play(self.health.next(), "health check").await
    }

    async fn do_recover(&self) -> Result<bool> {
        play(self.recover.next(), "recover").await
    }
}
