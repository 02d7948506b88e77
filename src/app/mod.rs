mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod types;


pub use orchestrator::CasebotApp;
pub use types::{ShutdownReason, ShutdownTrigger};
