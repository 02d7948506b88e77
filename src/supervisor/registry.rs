use super::{StatusRecord, Supervisor, SupervisorEntry};
use crate::error::{CasebotError, Result};
use crate::lifecycle::{ComponentStatus, Lifecycle};
use crate::recovery::RecoveryTracker;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

impl Supervisor {
    /// Register a component under `name`. An existing entry with the same
    /// name is replaced in place. Does not initialize the component.
    pub fn register_component<S: Into<String>>(&self, name: S, component: Arc<dyn Lifecycle>) {
        let name = name.into();
        let entry = SupervisorEntry {
            name: name.clone(),
            component,
            last_check: Utc::now(),
            recovery: RecoveryTracker::new(),
        };

        let mut registry = self.registry.lock();
        match registry.iter_mut().find(|existing| existing.name == name) {
            Some(existing) => {
                *existing = entry;
                info!("Replaced component {} in lifecycle monitoring", name);
            }
            None => {
                registry.push(entry);
                info!("Registered component {} for lifecycle monitoring", name);
            }
        }
    }

    /// Remove a component. Returns whether it was registered; removing an
    /// unknown name is a no-op.
    pub fn unregister_component(&self, name: &str) -> bool {
        let mut registry = self.registry.lock();
        let before = registry.len();
        registry.retain(|entry| entry.name != name);
        let removed = registry.len() != before;
        drop(registry);

        if removed {
            info!("Unregistered component {} from lifecycle monitoring", name);
        } else {
            debug!("Component {} was not registered, nothing to unregister", name);
        }
        removed
    }

    /// Status snapshot of one component
    pub async fn get_component_status(&self, name: &str) -> Result<StatusRecord> {
        let (component, last_check) = {
            let registry = self.registry.lock();
            let entry = registry
                .iter()
                .find(|entry| entry.name == name)
                .ok_or_else(|| CasebotError::ComponentNotFound {
                    name: name.to_string(),
                })?;
            (Arc::clone(&entry.component), entry.last_check)
        };

        Ok(status_record(name.to_string(), component, last_check).await)
    }

    /// Status snapshots of every component, in registration order
    pub async fn get_all_statuses(&self) -> Vec<StatusRecord> {
        let mut records = Vec::new();
        for (name, component, last_check) in self.snapshot() {
            records.push(status_record(name, component, last_check).await);
        }
        records
    }

    /// Registered names in registration order
    pub fn component_names(&self) -> Vec<String> {
        self.registry
            .lock()
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.lock().is_empty()
    }

    pub(crate) fn snapshot(&self) -> Vec<(String, Arc<dyn Lifecycle>, DateTime<Utc>)> {
        self.registry
            .lock()
            .iter()
            .map(|entry| {
                (
                    entry.name.clone(),
                    Arc::clone(&entry.component),
                    entry.last_check,
                )
            })
            .collect()
    }
}

async fn status_record(
    name: String,
    component: Arc<dyn Lifecycle>,
    last_check: DateTime<Utc>,
) -> StatusRecord {
    let status = component.status().await;
    let healthy = status == ComponentStatus::Healthy;

    StatusRecord {
        name,
        status,
        healthy,
        last_check: Some(last_check),
        last_error: component.last_error().map(|error| error.to_string()),
    }
}
