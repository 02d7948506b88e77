mod contract;
mod hooks;
mod managed;
mod scope;
mod state;

#[cfg(test)]
pub(crate) mod mock;

pub use contract::Lifecycle;
pub use hooks::LifecycleHooks;
pub use managed::ManagedComponent;
pub use scope::run_scoped;
pub use state::{ComponentState, ComponentStatus};
